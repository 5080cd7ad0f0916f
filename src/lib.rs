//! modelql - a GraphQL query API derived from relational model metadata
//!
//! Entity and association descriptors (usually introspected from a SQLite
//! database) drive the schema: per-entity object types, filter inputs with
//! operator-suffixed keys, order-by enums, pagination arguments and
//! find/create/update/delete resolvers backed by a [`runtime::ModelRuntime`].

pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod resolvers;
pub mod runtime;
pub mod schema;
pub mod server;

pub use error::{Error, Result, SchemaError};
pub use model::{
    AssociationDescriptor, AssociationKind, AttributeDescriptor, AttributeKind, EntityDescriptor,
    ModelRegistry,
};
pub use runtime::{ModelRuntime, Record, SharedRuntime, SqliteRuntime};
pub use schema::{FieldOptions, TypeOptions, build_schema};
