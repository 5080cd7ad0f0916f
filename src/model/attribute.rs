//! Attribute metadata

use serde::{Deserialize, Serialize};

/// Type tag of a model attribute, as reported by the mapping layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeKind {
    Boolean,
    Float,
    Double,
    DoublePrecision,
    Integer,
    Char,
    String,
    Text,
    Uuid,
    Date,
    DateOnly,
    Time,
    BigInt,
    Decimal,
    Virtual,
    Blob,
    /// Anything the derivation does not know about
    Other(std::string::String),
}

impl From<std::string::String> for AttributeKind {
    fn from(tag: std::string::String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<AttributeKind> for std::string::String {
    fn from(kind: AttributeKind) -> Self {
        kind.tag().to_string()
    }
}

impl AttributeKind {
    /// Parse a mapping-layer type tag (`"INTEGER"`, `"DOUBLE PRECISION"`, ...).
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "BOOLEAN" => Self::Boolean,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "DOUBLE PRECISION" => Self::DoublePrecision,
            "INTEGER" => Self::Integer,
            "CHAR" => Self::Char,
            "STRING" => Self::String,
            "TEXT" => Self::Text,
            "UUID" => Self::Uuid,
            "DATE" => Self::Date,
            "DATEONLY" => Self::DateOnly,
            "TIME" => Self::Time,
            "BIGINT" => Self::BigInt,
            "DECIMAL" => Self::Decimal,
            "VIRTUAL" => Self::Virtual,
            "BLOB" => Self::Blob,
            _ => Self::Other(tag.to_string()),
        }
    }

    /// The tag string for this kind
    pub fn tag(&self) -> &str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::DoublePrecision => "DOUBLE PRECISION",
            Self::Integer => "INTEGER",
            Self::Char => "CHAR",
            Self::String => "STRING",
            Self::Text => "TEXT",
            Self::Uuid => "UUID",
            Self::Date => "DATE",
            Self::DateOnly => "DATEONLY",
            Self::Time => "TIME",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Virtual => "VIRTUAL",
            Self::Blob => "BLOB",
            Self::Other(tag) => tag,
        }
    }

    /// Map a declared SQLite column type onto a kind using SQLite's
    /// affinity rules, refined by common declared names.
    pub fn from_sqlite_decl(decl: &str) -> Self {
        let decl = decl.trim().to_uppercase();
        let base = decl.split('(').next().unwrap_or_default().trim();

        match base {
            "BOOLEAN" | "BOOL" => return Self::Boolean,
            "DATE" => return Self::DateOnly,
            "DATETIME" | "TIMESTAMP" => return Self::Date,
            "TIME" => return Self::Time,
            "UUID" => return Self::Uuid,
            "BIGINT" => return Self::BigInt,
            "DECIMAL" | "NUMERIC" => return Self::Decimal,
            "CHAR" | "CHARACTER" => return Self::Char,
            "DOUBLE" => return Self::Double,
            "DOUBLE PRECISION" => return Self::DoublePrecision,
            "FLOAT" => return Self::Float,
            _ => {}
        }

        if base.contains("INT") {
            Self::Integer
        } else if base.contains("CHAR") || base.contains("CLOB") {
            Self::String
        } else if base.contains("TEXT") {
            Self::Text
        } else if base.contains("BLOB") || base.is_empty() {
            Self::Blob
        } else if base.contains("REAL") || base.contains("FLOA") || base.contains("DOUB") {
            Self::Float
        } else {
            Self::Other(decl.clone())
        }
    }
}

/// Read-only description of one model attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: AttributeKind,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            primary_key: false,
            comment: None,
        }
    }

    /// Mark as the primary key (implies not nullable)
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
