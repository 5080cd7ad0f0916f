//! Relational runtime seam
//!
//! Resolvers never talk to a database directly; they hand a [`QuerySpec`]
//! to a [`ModelRuntime`]. [`SqliteRuntime`] is the bundled implementation.

pub mod introspect;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AssociationDescriptor, EntityDescriptor};
use crate::query::{Predicate, QuerySpec};

pub use introspect::{IntrospectOptions, introspect};
pub use sqlite::{SqlValue, SqliteRuntime, quote_ident};

/// A loaded row (or an argument payload), keyed by attribute name
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Shared handle stored in the GraphQL schema data
pub type SharedRuntime = Arc<dyn ModelRuntime>;

/// Operations the resolvers need from the relational runtime.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// All rows selected by `spec`
    async fn find_all(&self, entity: &EntityDescriptor, spec: &QuerySpec) -> Result<Vec<Record>>;

    /// First row selected by `spec`
    async fn find_one(&self, entity: &EntityDescriptor, spec: &QuerySpec)
    -> Result<Option<Record>>;

    /// Persist a new row and return it as stored
    async fn create(&self, entity: &EntityDescriptor, values: Record) -> Result<Record>;

    /// Apply `changes` to a previously loaded instance and return it as stored
    async fn update(
        &self,
        entity: &EntityDescriptor,
        instance: &Record,
        changes: Record,
    ) -> Result<Record>;

    /// Mark matching rows deleted, returning how many were affected
    async fn soft_delete(&self, entity: &EntityDescriptor, predicate: &Predicate) -> Result<u64>;

    /// Rows of `target` associated with `parent` through `association`,
    /// further narrowed by `spec`
    async fn fetch_associated(
        &self,
        source: &EntityDescriptor,
        association: &AssociationDescriptor,
        target: &EntityDescriptor,
        parent: &Record,
        spec: &QuerySpec,
    ) -> Result<Vec<Record>>;
}
