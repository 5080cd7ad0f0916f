//! Association metadata

use serde::{Deserialize, Serialize};

/// Cardinality of an association, seen from its source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// has-many: foreign key lives on the target
    OneToMany,
    /// belongs-to: foreign key lives on the source
    ManyToOne,
    /// belongs-to-many: foreign keys live on a junction table
    ManyToMany,
    /// has-one: foreign key lives on the target
    OneToOne,
}

impl AssociationKind {
    /// Whether the relation resolves to a list
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }
}

impl std::fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssociationKind::OneToMany => write!(f, "one-to-many"),
            AssociationKind::ManyToOne => write!(f, "many-to-one"),
            AssociationKind::ManyToMany => write!(f, "many-to-many"),
            AssociationKind::OneToOne => write!(f, "one-to-one"),
        }
    }
}

/// Junction table of a many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughDescriptor {
    pub table: String,
    /// Junction column pointing at the source
    pub foreign_key: String,
    /// Junction column pointing at the target
    pub other_key: String,
}

/// Read-only description of one association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    pub kind: AssociationKind,
    /// Source entity name
    pub source: String,
    /// Target entity name
    pub target: String,
    /// Governing foreign key (on the source for belongs-to, on the target
    /// for has-one/has-many, on the junction for belongs-to-many)
    pub foreign_key: String,
    /// Field name the relation is exposed under on the source type
    pub accessor: String,
    /// Source attribute the foreign key refers to; defaults to the source
    /// primary key
    #[serde(default)]
    pub source_key: Option<String>,
    /// Target attribute a belongs-to foreign key refers to; defaults to the
    /// target primary key
    #[serde(default)]
    pub target_key: Option<String>,
    #[serde(default)]
    pub through: Option<ThroughDescriptor>,
}

impl AssociationDescriptor {
    pub fn new(
        kind: AssociationKind,
        source: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        accessor: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            target: target.into(),
            foreign_key: foreign_key.into(),
            accessor: accessor.into(),
            source_key: None,
            target_key: None,
            through: None,
        }
    }

    pub fn with_target_key(mut self, key: impl Into<String>) -> Self {
        self.target_key = Some(key.into());
        self
    }

    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    pub fn with_through(mut self, through: ThroughDescriptor) -> Self {
        self.through = Some(through);
        self
    }
}
