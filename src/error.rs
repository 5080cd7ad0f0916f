//! Error types
//!
//! Absent results ("not found", "deleted nothing") are not errors; resolvers
//! return `Ok(None)` for those. Everything here propagates unmodified to the
//! GraphQL caller.

use thiserror::Error;

/// Library error for runtime and resolver failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure reported by the database driver
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entity name not present in the model registry
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Operation needs a primary key but the entity declares none
    #[error("entity {0} has no primary key")]
    MissingPrimaryKey(String),

    /// Argument payload could not be interpreted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Schema could not be assembled
    #[error("schema error: {0}")]
    Schema(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure while constructing a single relation field.
///
/// These never reach the caller: the field is omitted from its type.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("target type {0} is not registered")]
    UnknownTarget(String),

    #[error("accessor {accessor} collides with an attribute of {entity}")]
    AccessorCollision { entity: String, accessor: String },

    #[error("{0} association has no junction table")]
    MissingThrough(String),
}
