//! Entity resolvers
//!
//! Each operation builds a [`QuerySpec`] from its arguments and the
//! requested fields, then hands it to the [`ModelRuntime`]. Nothing here
//! knows about GraphQL values; the schema layer converts at the edges.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{AssociationDescriptor, AssociationKind, EntityDescriptor};
use crate::query::{Predicate, QueryArgs, QuerySpec, SelectionTree};
use crate::runtime::{ModelRuntime, Record};

/// Result of resolving a relation field
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Many(Vec<Record>),
    One(Option<Record>),
}

fn primary_key(entity: &EntityDescriptor) -> Result<&str> {
    entity
        .primary_key()
        .ok_or_else(|| Error::MissingPrimaryKey(entity.name.clone()))
}

/// Keep only the argument keys naming an attribute of `entity`
pub fn whitelist(entity: &EntityDescriptor, args: &Record) -> Record {
    entity
        .attributes
        .iter()
        .filter_map(|a| args.get(&a.name).map(|v| (a.name.clone(), v.clone())))
        .collect()
}

/// List read with filter, order, pagination and projection. A `base`
/// predicate supplied by the caller is merged over the translated filter.
pub async fn find_all(
    runtime: &dyn ModelRuntime,
    entity: &EntityDescriptor,
    args: &QueryArgs,
    selection: &SelectionTree,
    base: Option<Predicate>,
) -> Result<Vec<Record>> {
    let mut spec = QuerySpec::for_listing(entity, args, selection);
    if let Some(base) = base {
        spec.predicate.merge_base(base);
    }

    debug!(
        entity = %entity.name,
        limit = ?spec.limit,
        offset = ?spec.offset,
        attributes = ?spec.attributes,
        "find all"
    );
    runtime.find_all(entity, &spec).await
}

/// Single read by primary key. Not found is `Ok(None)`.
pub async fn find_one(
    runtime: &dyn ModelRuntime,
    entity: &EntityDescriptor,
    id: &Value,
    selection: &SelectionTree,
) -> Result<Option<Record>> {
    let pk = primary_key(entity)?;
    let spec =
        QuerySpec::for_single(entity, selection).predicate(Predicate::eq(pk, id.clone()));

    debug!(entity = %entity.name, id = %id, "find one");
    runtime.find_one(entity, &spec).await
}

/// Persist the known attributes among `args`; unknown keys are dropped.
pub async fn create(
    runtime: &dyn ModelRuntime,
    entity: &EntityDescriptor,
    args: &Record,
) -> Result<Record> {
    let values = whitelist(entity, args);
    debug!(entity = %entity.name, attributes = values.len(), "create");
    runtime.create(entity, values).await
}

/// Apply the known attributes among `args` to the row with primary key
/// `id`. A missing row is `Ok(None)`. The primary key itself is never
/// changed.
pub async fn update(
    runtime: &dyn ModelRuntime,
    entity: &EntityDescriptor,
    id: &Value,
    args: &Record,
) -> Result<Option<Record>> {
    let pk = primary_key(entity)?;
    let spec = QuerySpec::new().predicate(Predicate::eq(pk, id.clone()));
    let Some(instance) = runtime.find_one(entity, &spec).await? else {
        debug!(entity = %entity.name, id = %id, "update target not found");
        return Ok(None);
    };

    let mut changes = whitelist(entity, args);
    changes.remove(pk);

    debug!(entity = %entity.name, id = %id, attributes = changes.len(), "update");
    runtime.update(entity, &instance, changes).await.map(Some)
}

/// Read the row, then soft-delete by primary key. Returns the row read
/// beforehand when the delete affected anything, otherwise `Ok(None)`.
pub async fn delete(
    runtime: &dyn ModelRuntime,
    entity: &EntityDescriptor,
    id: &Value,
    selection: &SelectionTree,
) -> Result<Option<Record>> {
    let pk = primary_key(entity)?;
    let existing = find_one(runtime, entity, id, selection).await?;
    let affected = runtime
        .soft_delete(entity, &Predicate::eq(pk, id.clone()))
        .await?;

    debug!(entity = %entity.name, id = %id, affected, "delete");
    Ok(if affected > 0 { existing } else { None })
}

/// Resolve a relation field for one parent row.
///
/// To-many relations take the full list arguments. To-one relations only
/// project; they make sure the key the runtime matches on is fetched.
pub async fn resolve_association(
    runtime: &dyn ModelRuntime,
    source: &EntityDescriptor,
    association: &AssociationDescriptor,
    target: &EntityDescriptor,
    parent: &Record,
    args: &QueryArgs,
    selection: &SelectionTree,
) -> Result<Resolved> {
    match association.kind {
        AssociationKind::OneToMany | AssociationKind::ManyToMany => {
            let mut spec = QuerySpec::for_listing(target, args, selection);
            if association.kind == AssociationKind::OneToMany {
                spec.require_attribute(&association.foreign_key);
            }
            let rows = runtime
                .fetch_associated(source, association, target, parent, &spec)
                .await?;
            Ok(Resolved::Many(rows))
        }
        AssociationKind::ManyToOne | AssociationKind::OneToOne => {
            let mut spec = QuerySpec::for_single(target, selection);
            match association.kind {
                AssociationKind::ManyToOne => {
                    if let Some(target_key) = &association.target_key {
                        spec.require_attribute(target_key);
                    }
                }
                _ => spec.require_attribute(&association.foreign_key),
            }
            spec.limit = Some(1);
            let rows = runtime
                .fetch_associated(source, association, target, parent, &spec)
                .await?;
            Ok(Resolved::One(rows.into_iter().next()))
        }
    }
}
