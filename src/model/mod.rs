//! Model metadata
//!
//! Plain descriptors populated once at startup, either by introspecting the
//! database (see [`crate::runtime::introspect`]) or by hand. Nothing here
//! changes after the schema has been built.

mod association;
mod attribute;
mod entity;

pub use association::{AssociationDescriptor, AssociationKind, ThroughDescriptor};
pub use attribute::{AttributeDescriptor, AttributeKind};
pub use entity::EntityDescriptor;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// All entities known to the schema, keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entities: IndexMap<String, EntityDescriptor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, replacing any previous one of the same name.
    pub fn insert(&mut self, entity: EntityDescriptor) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn with(mut self, entity: EntityDescriptor) -> Self {
        self.insert(entity);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EntityDescriptor> {
        self.entities.get_mut(name)
    }

    /// Like [`get`](Self::get) but failing with [`Error::UnknownEntity`].
    pub fn entity(&self, name: &str) -> Result<&EntityDescriptor> {
        self.get(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Look an entity up by its backing table
    pub fn by_table(&self, table: &str) -> Option<&EntityDescriptor> {
        self.entities.values().find(|e| e.table == table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<EntityDescriptor> for ModelRegistry {
    fn from_iter<T: IntoIterator<Item = EntityDescriptor>>(iter: T) -> Self {
        let mut registry = Self::new();
        for entity in iter {
            registry.insert(entity);
        }
        registry
    }
}
