//! Application configuration management

use std::env;

use anyhow::{Context, Result};

use crate::runtime::IntrospectOptions;
use crate::schema::TypeOptions;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (for generating URLs)
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// SQLite database URL
    pub database_url: String,

    /// Pool size
    pub database_max_connections: u32,

    /// Column marking rows deleted; `None` makes deletes hard deletes
    pub soft_delete_column: Option<String>,

    /// Tables kept out of the schema
    pub ignore_tables: Vec<String>,

    /// Optional YAML file with [`TypeOptions`]
    pub type_options_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // An empty SOFT_DELETE_COLUMN switches soft delete off
        let soft_delete_column = match env::var("SOFT_DELETE_COLUMN") {
            Ok(column) if column.trim().is_empty() => None,
            Ok(column) => Some(column.trim().to_string()),
            Err(_) => Some("deleted_at".to_string()),
        };

        Ok(Self {
            host: env::var("HOST").ok(),

            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("Invalid PORT")?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/modelql.db".to_string()),

            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,

            soft_delete_column,

            ignore_tables: env::var("IGNORE_TABLES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),

            type_options_path: env::var("MODELQL_TYPE_OPTIONS").ok(),
        })
    }

    /// Introspection settings derived from this configuration
    pub fn introspect_options(&self) -> IntrospectOptions {
        IntrospectOptions {
            soft_delete_column: self.soft_delete_column.clone(),
            ignore_tables: self.ignore_tables.clone(),
        }
    }

    /// Read the type options file, or defaults when none is configured
    pub fn type_options(&self) -> Result<TypeOptions> {
        let Some(path) = &self.type_options_path else {
            return Ok(TypeOptions::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read type options from {}", path))?;
        serde_yaml::from_str(&text).with_context(|| format!("Invalid type options in {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config() -> Config {
        Config {
            host: None,
            port: 3001,
            database_url: "sqlite::memory:".into(),
            database_max_connections: 1,
            soft_delete_column: Some("deleted_at".into()),
            ignore_tables: vec!["migrations".into()],
            type_options_path: None,
        }
    }

    #[test]
    fn test_type_options_default_without_file() {
        assert_eq!(config().type_options().unwrap(), TypeOptions::default());
    }

    #[test]
    fn test_type_options_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ignore: [Audit]\nfields:\n  Users:\n    ignore: [password]").unwrap();

        let config = Config {
            type_options_path: Some(file.path().display().to_string()),
            ..config()
        };
        let options = config.type_options().unwrap();

        assert_eq!(options.ignore, vec!["Audit"]);
        assert_eq!(options.field_options("Users").ignore, vec!["password"]);
    }

    #[test]
    fn test_type_options_bad_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ignore: {{ not: a list }}").unwrap();

        let config = Config {
            type_options_path: Some(file.path().display().to_string()),
            ..config()
        };
        assert!(config.type_options().is_err());
    }

    #[test]
    fn test_introspect_options_carry_settings() {
        let options = config().introspect_options();
        assert_eq!(options.soft_delete_column.as_deref(), Some("deleted_at"));
        assert_eq!(options.ignore_tables, vec!["migrations"]);
    }
}
