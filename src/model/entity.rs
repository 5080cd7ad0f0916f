//! Entity metadata

use serde::{Deserialize, Serialize};

use super::{AssociationDescriptor, AttributeDescriptor};

/// Read-only description of one modelled entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// GraphQL type name (e.g. "Post")
    pub name: String,
    /// Backing table name (e.g. "posts")
    pub table: String,
    pub attributes: Vec<AttributeDescriptor>,
    #[serde(default)]
    pub associations: Vec<AssociationDescriptor>,
    /// Column marking a row as soft-deleted, when the entity has one
    #[serde(default)]
    pub soft_delete: Option<String>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            attributes: Vec::new(),
            associations: Vec::new(),
            soft_delete: None,
        }
    }

    pub fn attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn association(mut self, association: AssociationDescriptor) -> Self {
        self.associations.push(association);
        self
    }

    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    /// Name of the primary key attribute.
    ///
    /// With several flagged attributes the last one wins.
    pub fn primary_key(&self) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.primary_key)
            .map(|a| a.name.as_str())
    }

    /// All attribute names in declaration order
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    pub fn get_association(&self, accessor: &str) -> Option<&AssociationDescriptor> {
        self.associations.iter().find(|a| a.accessor == accessor)
    }
}
