//! SQLite runtime
//!
//! Renders [`QuerySpec`]s into parameterised SQL (`?N` placeholders) and
//! decodes rows into [`Record`]s. Soft-deletable entities get their
//! soft-delete column checked on every read.

use std::str::FromStr;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use super::{ModelRuntime, Record};
use crate::error::{Error, Result};
use crate::model::{AssociationDescriptor, AssociationKind, AttributeKind, EntityDescriptor};
use crate::query::{Clause, Operator, Predicate, QuerySpec};

/// Represents a SQL value that can be bound to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl SqlValue {
    /// Convert a JSON scalar. Lists and objects are bound as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => SqlValue::String(s.clone()),
            other => SqlValue::String(other.to_string()),
        }
    }

    /// Bind this value to a sqlx query
    pub fn bind_to_query<'q>(
        &'q self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
            SqlValue::Null => query.bind(None::<String>),
        }
    }
}

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Accumulates bind values while rendering
#[derive(Debug, Default)]
struct SqlBuilder {
    values: Vec<SqlValue>,
}

impl SqlBuilder {
    fn param(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("?{}", self.values.len())
    }

    /// Render a predicate, joining its members with `connective`
    fn predicate(&mut self, predicate: &Predicate, connective: &str) -> Option<String> {
        let mut parts: Vec<String> = predicate
            .clauses()
            .iter()
            .filter_map(|clause| self.clause(clause))
            .collect();
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(format!("({})", parts.join(connective))),
        }
    }

    fn clause(&mut self, clause: &Clause<'_>) -> Option<String> {
        match clause {
            Clause::Field(column, conditions) => {
                let mut parts: Vec<String> = conditions
                    .iter()
                    .map(|(op, value)| self.condition(column, *op, value))
                    .collect();
                match parts.len() {
                    0 => None,
                    1 => parts.pop(),
                    _ => Some(format!("({})", parts.join(" AND "))),
                }
            }
            Clause::Or(group) => self.predicate(group, " OR "),
            Clause::And(group) => self.predicate(group, " AND "),
        }
    }

    fn condition(&mut self, column: &str, op: Operator, value: &Value) -> String {
        let column = quote_ident(column);
        match (op, value) {
            (Operator::Eq, Value::Null) => format!("{} IS NULL", column),
            (Operator::Ne, Value::Null) => format!("{} IS NOT NULL", column),
            (Operator::In | Operator::NotIn, _) => {
                let items = match value {
                    Value::Array(items) => items.clone(),
                    Value::Null => Vec::new(),
                    other => vec![other.clone()],
                };
                if items.is_empty() {
                    // IN () matches nothing, NOT IN () matches everything
                    return if op == Operator::In { "0" } else { "1" }.to_string();
                }
                let params: Vec<String> = items
                    .iter()
                    .map(|v| self.param(SqlValue::from_json(v)))
                    .collect();
                format!("{} {} ({})", column, op.to_sql(), params.join(", "))
            }
            _ => {
                let param = self.param(SqlValue::from_json(value));
                format!("{} {} {}", column, op.to_sql(), param)
            }
        }
    }
}

/// [`ModelRuntime`] backed by a sqlx SQLite pool.
#[derive(Clone)]
pub struct SqliteRuntime {
    pool: SqlitePool,
}

impl SqliteRuntime {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool, creating the database file if needed
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Predicate with the soft-delete scope applied
    fn scoped(&self, entity: &EntityDescriptor, predicate: &Predicate) -> Predicate {
        let mut predicate = predicate.clone();
        if let Some(column) = &entity.soft_delete {
            predicate.merge_base(Predicate::eq(column.clone(), Value::Null));
        }
        predicate
    }

    fn select_sql(&self, entity: &EntityDescriptor, spec: &QuerySpec) -> (String, Vec<SqlValue>) {
        let columns = if spec.attributes.is_empty() {
            "*".to_string()
        } else {
            spec.attributes
                .iter()
                .map(|a| quote_ident(a))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(&entity.table));

        let mut builder = SqlBuilder::default();
        let predicate = self.scoped(entity, &spec.predicate);
        if let Some(condition) = builder.predicate(&predicate, " AND ") {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }

        if let Some(order) = &spec.order {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                quote_ident(&order.attribute),
                order.direction.to_sql()
            ));
        }

        match (spec.limit, spec.offset.filter(|o| *o != 0)) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        (sql, builder.values)
    }

    async fn fetch_rows(&self, sql: &str, values: &[SqlValue]) -> Result<Vec<SqliteRow>> {
        tracing::debug!(sql = %sql, binds = values.len(), "Executing entity query");

        let mut query = sqlx::query(sql);
        for value in values {
            query = value.bind_to_query(query);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn execute(&self, sql: &str, values: &[SqlValue]) -> Result<u64> {
        tracing::debug!(sql = %sql, binds = values.len(), "Executing entity statement");

        let mut query = sqlx::query(sql);
        for value in values {
            query = value.bind_to_query(query);
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    /// Values of the junction's `other_key` for one source key
    async fn junction_keys(
        &self,
        association: &AssociationDescriptor,
        source_value: &Value,
    ) -> Result<Vec<Value>> {
        let through = association.through.as_ref().ok_or_else(|| {
            Error::Schema(format!(
                "{}.{} has no junction table",
                association.source, association.accessor
            ))
        })?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            quote_ident(&through.other_key),
            quote_ident(&through.table),
            quote_ident(&through.foreign_key)
        );
        let rows = self
            .fetch_rows(&sql, &[SqlValue::from_json(source_value)])
            .await?;
        rows.iter()
            .map(|row| decode_value(row, 0, false))
            .collect()
    }
}

fn is_boolean(entity: &EntityDescriptor, column: &str) -> bool {
    entity
        .get_attribute(column)
        .is_some_and(|a| a.kind == AttributeKind::Boolean)
}

/// Decode one column by its runtime storage class
fn decode_value(row: &SqliteRow, index: usize, boolean: bool) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => {
            let v: i64 = row.try_get_unchecked(index)?;
            if boolean {
                Value::Bool(v != 0)
            } else {
                Value::from(v)
            }
        }
        "REAL" => {
            let v: f64 = row.try_get_unchecked(index)?;
            serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "BLOB" => {
            let v: Vec<u8> = row.try_get_unchecked(index)?;
            Value::String(BASE64.encode(v))
        }
        _ => {
            let v: String = row.try_get_unchecked(index)?;
            Value::String(v)
        }
    };
    Ok(value)
}

fn decode_row(entity: &EntityDescriptor, row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let name = column.name();
        let value = decode_value(row, column.ordinal(), is_boolean(entity, name))?;
        record.insert(name.to_string(), value);
    }
    Ok(record)
}

fn first_row(entity: &EntityDescriptor, rows: Vec<SqliteRow>) -> Result<Option<Record>> {
    rows.first().map(|row| decode_row(entity, row)).transpose()
}

/// Key value on the parent row, `None` when missing or NULL
fn parent_value(parent: &Record, key: &str) -> Option<Value> {
    parent.get(key).filter(|v| !v.is_null()).cloned()
}

/// Scope a caller predicate to an association key
fn scope(key_predicate: Predicate, caller: &Predicate) -> Predicate {
    let mut scoped = key_predicate;
    if !caller.is_empty() {
        scoped.and = Some(Box::new(caller.clone()));
    }
    scoped
}

#[async_trait]
impl ModelRuntime for SqliteRuntime {
    async fn find_all(&self, entity: &EntityDescriptor, spec: &QuerySpec) -> Result<Vec<Record>> {
        let (sql, values) = self.select_sql(entity, spec);
        let rows = self.fetch_rows(&sql, &values).await?;
        rows.iter().map(|row| decode_row(entity, row)).collect()
    }

    async fn find_one(
        &self,
        entity: &EntityDescriptor,
        spec: &QuerySpec,
    ) -> Result<Option<Record>> {
        let spec = QuerySpec {
            limit: Some(1),
            ..spec.clone()
        };
        let (sql, values) = self.select_sql(entity, &spec);
        let rows = self.fetch_rows(&sql, &values).await?;
        first_row(entity, rows)
    }

    async fn create(&self, entity: &EntityDescriptor, values: Record) -> Result<Record> {
        let table = quote_ident(&entity.table);
        let mut builder = SqlBuilder::default();

        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table)
        } else {
            let columns: Vec<String> = values.keys().map(|k| quote_ident(k)).collect();
            let params: Vec<String> = values
                .values()
                .map(|v| builder.param(SqlValue::from_json(v)))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                table,
                columns.join(", "),
                params.join(", ")
            )
        };

        let rows = self.fetch_rows(&sql, &builder.values).await?;
        first_row(entity, rows)?.ok_or(Error::Database(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        entity: &EntityDescriptor,
        instance: &Record,
        changes: Record,
    ) -> Result<Record> {
        if changes.is_empty() {
            return Ok(instance.clone());
        }
        let pk = entity
            .primary_key()
            .ok_or_else(|| Error::MissingPrimaryKey(entity.name.clone()))?;
        let pk_value = instance.get(pk).cloned().unwrap_or(Value::Null);

        let mut builder = SqlBuilder::default();
        let assignments: Vec<String> = changes
            .iter()
            .map(|(column, value)| {
                format!(
                    "{} = {}",
                    quote_ident(column),
                    builder.param(SqlValue::from_json(value))
                )
            })
            .collect();
        let key_param = builder.param(SqlValue::from_json(&pk_value));
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {} RETURNING *",
            quote_ident(&entity.table),
            assignments.join(", "),
            quote_ident(pk),
            key_param
        );

        let rows = self.fetch_rows(&sql, &builder.values).await?;
        match first_row(entity, rows)? {
            Some(updated) => Ok(updated),
            None => {
                let mut merged = instance.clone();
                merged.extend(changes);
                Ok(merged)
            }
        }
    }

    async fn soft_delete(&self, entity: &EntityDescriptor, predicate: &Predicate) -> Result<u64> {
        let table = quote_ident(&entity.table);
        let mut builder = SqlBuilder::default();
        let condition = builder.predicate(predicate, " AND ");

        let sql = match &entity.soft_delete {
            Some(column) => {
                let column = quote_ident(column);
                let mut sql = format!(
                    "UPDATE {} SET {} = CURRENT_TIMESTAMP WHERE {} IS NULL",
                    table, column, column
                );
                if let Some(condition) = condition {
                    sql.push_str(" AND ");
                    sql.push_str(&condition);
                }
                sql
            }
            None => match condition {
                Some(condition) => format!("DELETE FROM {} WHERE {}", table, condition),
                None => format!("DELETE FROM {}", table),
            },
        };

        self.execute(&sql, &builder.values).await
    }

    async fn fetch_associated(
        &self,
        source: &EntityDescriptor,
        association: &AssociationDescriptor,
        target: &EntityDescriptor,
        parent: &Record,
        spec: &QuerySpec,
    ) -> Result<Vec<Record>> {
        let source_key = association
            .source_key
            .as_deref()
            .or(source.primary_key())
            .ok_or_else(|| Error::MissingPrimaryKey(source.name.clone()));

        let key_predicate = match association.kind {
            AssociationKind::OneToMany | AssociationKind::OneToOne => {
                let Some(value) = parent_value(parent, source_key?) else {
                    return Ok(Vec::new());
                };
                Predicate::eq(association.foreign_key.clone(), value)
            }
            AssociationKind::ManyToOne => {
                let Some(value) = parent_value(parent, &association.foreign_key) else {
                    return Ok(Vec::new());
                };
                let target_key = association
                    .target_key
                    .as_deref()
                    .or(target.primary_key())
                    .ok_or_else(|| Error::MissingPrimaryKey(target.name.clone()))?;
                Predicate::eq(target_key, value)
            }
            AssociationKind::ManyToMany => {
                let Some(value) = parent_value(parent, source_key?) else {
                    return Ok(Vec::new());
                };
                let target_key = target
                    .primary_key()
                    .ok_or_else(|| Error::MissingPrimaryKey(target.name.clone()))?;
                let keys = self.junction_keys(association, &value).await?;
                Predicate::new().condition(target_key, Operator::In, Value::Array(keys))
            }
        };

        let spec = QuerySpec {
            predicate: scope(key_predicate, &spec.predicate),
            ..spec.clone()
        };
        self.find_all(target, &spec).await
    }
}
