//! GraphQL schema derivation
//!
//! The schema is assembled once at startup with `async_graphql::dynamic`
//! from a [`ModelRegistry`]. Every exposed entity gets an object type, a
//! `<Entity>Filter` input, a `<Entity>OrderBy` enum and root fields; relation
//! fields are added where their target is exposed too.

mod inputs;
mod relations;
mod root;
mod types;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql::dynamic::{ObjectAccessor, ResolverContext, Scalar, Schema, Type};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{EntityDescriptor, ModelRegistry};
use crate::query::SelectionTree;
use crate::runtime::{Record, SharedRuntime};

pub use inputs::{filter_input, filter_set, order_enum, query_args};
pub use relations::{RelationField, relation_field, relation_type_prefix};
pub use types::{DATE_SCALAR, entity_object, input_type, output_type};

/// Per-entity output options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldOptions {
    /// Make every output field nullable
    pub allow_null: bool,
    /// Attributes left out of the output type
    pub ignore: Vec<String>,
}

/// Schema-wide options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeOptions {
    /// Entities left out of the schema
    pub ignore: Vec<String>,
    /// Output options keyed by entity name
    pub fields: HashMap<String, FieldOptions>,
}

impl TypeOptions {
    pub fn field_options(&self, entity: &str) -> FieldOptions {
        self.fields.get(entity).cloned().unwrap_or_default()
    }
}

pub(crate) fn runtime(ctx: &ResolverContext<'_>) -> async_graphql::Result<SharedRuntime> {
    Ok(ctx.data::<SharedRuntime>()?.clone())
}

/// Resolver arguments as a JSON record
pub(crate) fn args_record(args: &ObjectAccessor<'_>) -> async_graphql::Result<Record> {
    let mut record = Record::new();
    for (name, value) in args.as_index_map() {
        record.insert(name.to_string(), value.clone().into_json()?);
    }
    Ok(record)
}

/// Sub-selection of the field being resolved
pub(crate) fn selection(ctx: &ResolverContext<'_>) -> SelectionTree {
    SelectionTree::from_field(ctx.field())
}

/// Build the executable schema. The runtime is stored in the schema data
/// and shared by every resolver.
pub fn build_schema(
    registry: &ModelRegistry,
    runtime: SharedRuntime,
    options: &TypeOptions,
) -> Result<Schema> {
    let entities: IndexMap<String, Arc<EntityDescriptor>> = registry
        .iter()
        .filter(|e| !options.ignore.contains(&e.name))
        .map(|e| (e.name.clone(), Arc::new(e.clone())))
        .collect();

    let mut query = async_graphql::dynamic::Object::new("Query");
    let mut mutation = async_graphql::dynamic::Object::new("Mutation");
    let mut has_mutations = false;
    let mut types: Vec<Type> = vec![
        Scalar::new(DATE_SCALAR)
            .description("Date and time values as ISO 8601 text")
            .into(),
    ];

    // entity-level names are claimed before any relation picks its types
    let mut taken: HashSet<String> = ["Query", "Mutation", DATE_SCALAR]
        .into_iter()
        .map(String::from)
        .collect();
    for name in entities.keys() {
        taken.insert(name.clone());
        taken.insert(format!("{}Filter", name));
        taken.insert(format!("{}OrderBy", name));
    }

    for entity in entities.values() {
        let mut object = entity_object(entity, &options.field_options(&entity.name));

        for association in &entity.associations {
            match relation_field(&entities, entity, association, &mut taken) {
                Ok(relation) => {
                    object = object.field(relation.field);
                    types.extend(relation.inputs);
                }
                Err(err) => {
                    debug!(
                        entity = %entity.name,
                        accessor = %association.accessor,
                        error = %err,
                        "Omitting relation field"
                    );
                }
            }
        }

        types.push(object.into());
        types.push(filter_input(&entity.name, entity).into());
        types.push(order_enum(&entity.name, entity).into());

        query = query.field(root::find_all(entity.clone()));
        if entity.primary_key().is_some() {
            query = query.field(root::find_one(entity.clone()));
            mutation = mutation
                .field(root::create(entity.clone()))
                .field(root::update(entity.clone()))
                .field(root::delete(entity.clone()));
            has_mutations = true;
        }
    }

    let mut builder =
        Schema::build("Query", has_mutations.then_some("Mutation"), None).register(query);
    if has_mutations {
        builder = builder.register(mutation);
    }
    for ty in types {
        builder = builder.register(ty);
    }

    let schema = builder
        .data(runtime)
        .finish()
        .map_err(|e| Error::Schema(e.to_string()))?;

    info!(entities = entities.len(), "Built GraphQL schema");
    Ok(schema)
}
