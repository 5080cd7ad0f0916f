//! Build a [`ModelRegistry`] from a live SQLite database.
//!
//! Every user table becomes an entity named after the table in PascalCase.
//! Foreign keys become belongs-to associations on the owning table and
//! has-many (or has-one, when the column is uniquely indexed) on the
//! referenced table. A table whose primary key is exactly two foreign key
//! columns is a junction and links its two ends with belongs-to-many.

use std::collections::HashSet;

use convert_case::{Case, Casing};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{
    AssociationDescriptor, AssociationKind, AttributeDescriptor, AttributeKind, EntityDescriptor,
    ModelRegistry, ThroughDescriptor,
};

/// Knobs for [`introspect`]
#[derive(Debug, Clone, Default)]
pub struct IntrospectOptions {
    /// Nullable timestamp column marking rows deleted, on tables that have it
    pub soft_delete_column: Option<String>,
    /// Tables left out of the registry
    pub ignore_tables: Vec<String>,
}

impl IntrospectOptions {
    pub fn soft_delete_column(mut self, column: impl Into<String>) -> Self {
        self.soft_delete_column = Some(column.into());
        self
    }

    pub fn ignore_table(mut self, table: impl Into<String>) -> Self {
        self.ignore_tables.push(table.into());
        self
    }
}

#[derive(Debug)]
struct ColumnInfo {
    name: String,
    decl: String,
    not_null: bool,
    /// 1-based position in the primary key, 0 when not part of it
    pk: i64,
}

#[derive(Debug)]
struct ForeignKey {
    table: String,
    from: String,
    to: Option<String>,
}

#[derive(Debug)]
struct TableInfo {
    name: String,
    columns: Vec<ColumnInfo>,
    foreign_keys: Vec<ForeignKey>,
    unique_columns: HashSet<String>,
}

impl TableInfo {
    fn pk_columns(&self) -> Vec<&str> {
        let mut pk: Vec<&ColumnInfo> = self.columns.iter().filter(|c| c.pk > 0).collect();
        pk.sort_by_key(|c| c.pk);
        pk.into_iter().map(|c| c.name.as_str()).collect()
    }

    /// The two foreign keys of a junction table
    fn junction(&self) -> Option<(&ForeignKey, &ForeignKey)> {
        let pk = self.pk_columns();
        if pk.len() != 2 {
            return None;
        }
        let left = self.foreign_keys.iter().find(|fk| fk.from == pk[0])?;
        let right = self.foreign_keys.iter().find(|fk| fk.from == pk[1])?;
        Some((left, right))
    }
}

/// Entity name for a table
pub fn entity_name(table: &str) -> String {
    table.to_case(Case::Pascal)
}

/// Read the catalogue and build descriptors for every user table.
pub async fn introspect(pool: &SqlitePool, options: &IntrospectOptions) -> Result<ModelRegistry> {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut infos = Vec::new();
    for (table,) in tables {
        if options.ignore_tables.contains(&table) {
            debug!(table = %table, "Skipping ignored table");
            continue;
        }
        infos.push(read_table(pool, table).await?);
    }

    let mut registry: ModelRegistry = infos.iter().map(|t| build_entity(t, options)).collect();

    for info in &infos {
        link_foreign_keys(&mut registry, info);
    }

    info!(entities = registry.len(), "Introspected database schema");
    Ok(registry)
}

async fn read_table(pool: &SqlitePool, table: String) -> Result<TableInfo> {
    let columns: Vec<(String, String, i64, i64)> = sqlx::query_as(
        r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?1) ORDER BY cid"#,
    )
    .bind(&table)
    .fetch_all(pool)
    .await?;

    let foreign_keys: Vec<(String, String, Option<String>)> = sqlx::query_as(
        r#"SELECT "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
    )
    .bind(&table)
    .fetch_all(pool)
    .await?;

    let indexes: Vec<(String,)> =
        sqlx::query_as(r#"SELECT name FROM pragma_index_list(?1) WHERE "unique" = 1"#)
            .bind(&table)
            .fetch_all(pool)
            .await?;

    let mut unique_columns = HashSet::new();
    for (index,) in indexes {
        let indexed: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT name FROM pragma_index_info(?1)")
                .bind(&index)
                .fetch_all(pool)
                .await?;
        if let [(Some(column),)] = indexed.as_slice() {
            unique_columns.insert(column.clone());
        }
    }

    debug!(
        table = %table,
        columns = columns.len(),
        foreign_keys = foreign_keys.len(),
        "Read table metadata"
    );

    let columns: Vec<ColumnInfo> = columns
        .into_iter()
        .map(|(name, decl, not_null, pk)| ColumnInfo {
            name,
            decl,
            not_null: not_null != 0,
            pk,
        })
        .collect();

    // SQLite lists foreign keys last-declared first; use column order instead
    let mut foreign_keys: Vec<ForeignKey> = foreign_keys
        .into_iter()
        .map(|(table, from, to)| ForeignKey { table, from, to })
        .collect();
    foreign_keys.sort_by_key(|fk| columns.iter().position(|c| c.name == fk.from));

    Ok(TableInfo {
        name: table,
        columns,
        foreign_keys,
        unique_columns,
    })
}

fn build_entity(info: &TableInfo, options: &IntrospectOptions) -> EntityDescriptor {
    // Composite keys are not flagged; such entities only get list reads
    let single_pk = match info.pk_columns().as_slice() {
        [pk] => Some(pk.to_string()),
        _ => None,
    };

    let mut entity = EntityDescriptor::new(entity_name(&info.name), &info.name);
    for column in &info.columns {
        let mut attribute =
            AttributeDescriptor::new(&column.name, AttributeKind::from_sqlite_decl(&column.decl));
        if single_pk.as_deref() == Some(column.name.as_str()) {
            attribute = attribute.primary_key();
        } else if column.not_null {
            attribute = attribute.not_null();
        }
        entity = entity.attribute(attribute);
    }

    if let Some(column) = &options.soft_delete_column
        && entity.has_attribute(column)
    {
        entity = entity.soft_delete(column);
    }
    entity
}

fn link_foreign_keys(registry: &mut ModelRegistry, info: &TableInfo) {
    let Some(owner) = registry.by_table(&info.name).map(|e| e.name.clone()) else {
        return;
    };

    for fk in &info.foreign_keys {
        let Some(target) = registry.by_table(&fk.table) else {
            debug!(table = %info.name, references = %fk.table, "Foreign key to unknown table");
            continue;
        };
        let target_name = target.name.clone();
        let explicit_key = fk
            .to
            .clone()
            .filter(|to| target.primary_key() != Some(to.as_str()));

        // belongs-to on the owning table
        let base = belongs_to_accessor(&fk.from, &target_name);
        let mut belongs_to = AssociationDescriptor::new(
            AssociationKind::ManyToOne,
            &owner,
            &target_name,
            &fk.from,
            base,
        );
        if let Some(key) = &explicit_key {
            belongs_to = belongs_to.with_target_key(key);
        }
        attach(registry, &owner, belongs_to);

        // has-many / has-one on the referenced table
        let kind = if info.unique_columns.contains(&fk.from) {
            AssociationKind::OneToOne
        } else {
            AssociationKind::OneToMany
        };
        let mut inverse = AssociationDescriptor::new(
            kind,
            &target_name,
            &owner,
            &fk.from,
            info.name.to_case(Case::Camel),
        );
        if let Some(key) = &explicit_key {
            inverse = inverse.with_source_key(key);
        }
        attach(registry, &target_name, inverse);
    }

    if let Some((left, right)) = info.junction() {
        link_junction(registry, info, left, right);
        link_junction(registry, info, right, left);
    }
}

fn link_junction(registry: &mut ModelRegistry, info: &TableInfo, from: &ForeignKey, to: &ForeignKey) {
    let (Some(source), Some(target)) = (registry.by_table(&from.table), registry.by_table(&to.table))
    else {
        return;
    };
    let source_name = source.name.clone();
    let explicit_key = from
        .to
        .clone()
        .filter(|key| source.primary_key() != Some(key.as_str()));

    let mut association = AssociationDescriptor::new(
        AssociationKind::ManyToMany,
        &source_name,
        &target.name,
        &from.from,
        to.table.to_case(Case::Camel),
    )
    .with_through(ThroughDescriptor {
        table: info.name.clone(),
        foreign_key: from.from.clone(),
        other_key: to.from.clone(),
    });
    if let Some(key) = explicit_key {
        association = association.with_source_key(key);
    }
    attach(registry, &source_name, association);
}

/// `author_id` → `author`; columns without an id suffix fall back to the
/// target name.
fn belongs_to_accessor(column: &str, target: &str) -> String {
    let stripped = column
        .strip_suffix("_id")
        .or_else(|| column.strip_suffix("Id"))
        .filter(|s| !s.is_empty());
    match stripped {
        Some(stripped) => stripped.to_case(Case::Camel),
        None => target.to_case(Case::Camel),
    }
}

/// Add an association, renaming its accessor until it is free on the entity.
fn attach(registry: &mut ModelRegistry, entity: &str, mut association: AssociationDescriptor) {
    let Some(entity) = registry.get_mut(entity) else {
        return;
    };
    let taken = |name: &str| entity.has_attribute(name) || entity.get_association(name).is_some();

    if taken(&association.accessor) {
        let base = format!(
            "{}By{}",
            association.accessor,
            association.foreign_key.to_case(Case::Pascal)
        );
        let mut candidate = base.clone();
        let mut n = 2;
        while taken(&candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        debug!(
            entity = %entity.name,
            accessor = %association.accessor,
            renamed = %candidate,
            "Accessor already taken"
        );
        association.accessor = candidate;
    }

    entity.associations.push(association);
}
