//! Field selection and attribute projection
//!
//! A [`SelectionTree`] mirrors the requested sub-fields of a resolver's field:
//! leaves are scalar fields, non-empty children are nested relations. The
//! projection derived from it is the minimal attribute list to fetch.

use async_graphql::context::SelectionField;
use indexmap::IndexMap;

use crate::model::{AssociationKind, EntityDescriptor};

/// Requested-field tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionTree(IndexMap<String, SelectionTree>);

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf field
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.entry(name.into()).or_default();
        self
    }

    /// Add a field with sub-selections
    pub fn nested(mut self, name: impl Into<String>, children: SelectionTree) -> Self {
        self.0.entry(name.into()).or_default().merge(children);
        self
    }

    /// Build from the sub-selection of a GraphQL field. Fragments are
    /// flattened; repeated selections of one field are merged.
    pub fn from_field(field: SelectionField<'_>) -> Self {
        let mut tree = Self::new();
        for child in field.selection_set() {
            tree.0
                .entry(child.name().to_string())
                .or_default()
                .merge(Self::from_field(child));
        }
        tree
    }

    fn merge(&mut self, other: SelectionTree) {
        for (name, children) in other.0 {
            self.0.entry(name).or_default().merge(children);
        }
    }

    pub fn get(&self, name: &str) -> Option<&SelectionTree> {
        self.0.get(name)
    }

    pub fn is_leaf(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectionTree)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The tree itself, or the sub-tree under `key`. A missing key selects
    /// nothing.
    fn level(&self, key: Option<&str>) -> Option<&SelectionTree> {
        match key {
            Some(key) => self.get(key),
            None => Some(self),
        }
    }
}

/// Names of the leaf fields at the selected level
pub fn scalar_fields(tree: &SelectionTree, key: Option<&str>) -> Vec<String> {
    tree.level(key)
        .map(|level| {
            level
                .iter()
                .filter(|(_, children)| children.is_leaf())
                .map(|(name, _)| name.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Names of the fields with sub-selections at the selected level
pub fn relation_fields(tree: &SelectionTree, key: Option<&str>) -> Vec<String> {
    tree.level(key)
        .map(|level| {
            level
                .iter()
                .filter(|(_, children)| !children.is_leaf())
                .map(|(name, _)| name.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Attributes to fetch for a selection.
///
/// Requested scalar attributes come first, then the primary key if it was
/// not requested, then the keys needed to resolve requested relations from
/// the loaded row: a belongs-to contributes its foreign key, the other kinds
/// their explicit source key. Leaves that are not attributes are dropped.
pub fn projection(entity: &EntityDescriptor, tree: &SelectionTree, key: Option<&str>) -> Vec<String> {
    let mut attributes: Vec<String> = scalar_fields(tree, key)
        .into_iter()
        .filter(|name| entity.has_attribute(name))
        .collect();

    if let Some(pk) = entity.primary_key() {
        push_unique(&mut attributes, pk);
    }

    for name in relation_fields(tree, key) {
        let Some(association) = entity.get_association(&name) else {
            continue;
        };
        match association.kind {
            AssociationKind::ManyToOne => push_unique(&mut attributes, &association.foreign_key),
            _ => {
                if let Some(source_key) = &association.source_key {
                    push_unique(&mut attributes, source_key);
                }
            }
        }
    }

    attributes
}

/// Append unless already present
pub fn push_unique(attributes: &mut Vec<String>, name: &str) {
    if !attributes.iter().any(|a| a == name) {
        attributes.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssociationDescriptor, AttributeDescriptor, AttributeKind};
    use pretty_assertions::assert_eq;

    fn post() -> EntityDescriptor {
        EntityDescriptor::new("Post", "posts")
            .attribute(AttributeDescriptor::new("id", AttributeKind::Integer).primary_key())
            .attribute(AttributeDescriptor::new("title", AttributeKind::String))
            .attribute(AttributeDescriptor::new("author_id", AttributeKind::Integer))
            .association(AssociationDescriptor::new(
                AssociationKind::ManyToOne,
                "Post",
                "User",
                "author_id",
                "author",
            ))
            .association(AssociationDescriptor::new(
                AssociationKind::OneToMany,
                "Post",
                "Comment",
                "post_id",
                "comments",
            ))
    }

    #[test]
    fn test_scalar_and_relation_fields_are_disjoint() {
        let tree = SelectionTree::new()
            .field("title")
            .nested("author", SelectionTree::new().field("name"))
            .field("id");

        assert_eq!(scalar_fields(&tree, None), vec!["title", "id"]);
        assert_eq!(relation_fields(&tree, None), vec!["author"]);
    }

    #[test]
    fn test_key_selects_sub_level() {
        let tree = SelectionTree::new().nested(
            "edges",
            SelectionTree::new()
                .field("cursor")
                .nested("node", SelectionTree::new().field("id")),
        );

        assert_eq!(scalar_fields(&tree, Some("edges")), vec!["cursor"]);
        assert_eq!(relation_fields(&tree, Some("edges")), vec!["node"]);
        assert!(scalar_fields(&tree, Some("missing")).is_empty());
    }

    #[test]
    fn test_projection_always_has_primary_key() {
        let tree = SelectionTree::new().field("title");
        assert_eq!(projection(&post(), &tree, None), vec!["title", "id"]);
    }

    #[test]
    fn test_projection_adds_belongs_to_foreign_key() {
        let tree = SelectionTree::new()
            .field("title")
            .nested("author", SelectionTree::new().field("name"));

        assert_eq!(
            projection(&post(), &tree, None),
            vec!["title", "id", "author_id"]
        );
    }

    #[test]
    fn test_projection_ignores_unrequested_foreign_keys() {
        let tree = SelectionTree::new()
            .field("id")
            .nested("comments", SelectionTree::new().field("body"));

        assert_eq!(projection(&post(), &tree, None), vec!["id"]);
    }

    #[test]
    fn test_projection_drops_non_attribute_leaves() {
        let tree = SelectionTree::new().field("__typename").field("title");
        assert_eq!(projection(&post(), &tree, None), vec!["title", "id"]);
    }

    #[test]
    fn test_nested_merges_repeated_selections() {
        let tree = SelectionTree::new()
            .nested("author", SelectionTree::new().field("name"))
            .nested("author", SelectionTree::new().field("email"));

        let author = tree.get("author").unwrap();
        assert_eq!(scalar_fields(author, None), vec!["name", "email"]);
    }
}
