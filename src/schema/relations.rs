//! Relation fields on entity types

use std::collections::HashSet;
use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Type, TypeRef};
use convert_case::{Case, Casing};
use indexmap::IndexMap;

use super::inputs::{filter_input, order_enum, query_args};
use super::{args_record, runtime, selection};
use crate::error::SchemaError;
use crate::model::{AssociationDescriptor, AssociationKind, EntityDescriptor};
use crate::query::QueryArgs;
use crate::resolvers::{self, Resolved};
use crate::runtime::Record;

/// A relation field plus the input types its arguments refer to
#[derive(Debug)]
pub struct RelationField {
    pub field: Field,
    pub inputs: Vec<Type>,
    /// Prefix of the `Filter`/`OrderBy` types, for to-many relations
    pub type_prefix: Option<String>,
}

/// Prefix for the filter and order types of one relation
pub fn relation_type_prefix(source: &EntityDescriptor, association: &AssociationDescriptor) -> String {
    format!("{}{}", source.name, association.accessor.to_case(Case::Pascal))
}

/// First prefix whose `Filter` and `OrderBy` names are not taken. The plain
/// prefix can equal an entity name (`Posts` + `tags` vs a `posts_tags`
/// junction), in which case a `Relation` suffix is added.
fn free_type_prefix(base: String, taken: &HashSet<String>) -> String {
    let is_free =
        |p: &str| !taken.contains(&format!("{}Filter", p)) && !taken.contains(&format!("{}OrderBy", p));
    if is_free(&base) {
        return base;
    }
    let relation = format!("{}Relation", base);
    let mut candidate = relation.clone();
    let mut n = 2;
    while !is_free(&candidate) {
        candidate = format!("{}{}", relation, n);
        n += 1;
    }
    candidate
}

/// Build the field for one association of `source`.
///
/// Fails when the target type is not part of the schema, when the accessor
/// shadows an attribute, or when a many-to-many has no junction. Callers
/// leave the field out in that case.
///
/// `taken` holds every type name already claimed in the schema; the names
/// of the relation's input types are added to it.
pub fn relation_field(
    entities: &IndexMap<String, Arc<EntityDescriptor>>,
    source: &Arc<EntityDescriptor>,
    association: &AssociationDescriptor,
    taken: &mut HashSet<String>,
) -> Result<RelationField, SchemaError> {
    let target = entities
        .get(&association.target)
        .cloned()
        .ok_or_else(|| SchemaError::UnknownTarget(association.target.clone()))?;

    if source.has_attribute(&association.accessor) {
        return Err(SchemaError::AccessorCollision {
            entity: source.name.clone(),
            accessor: association.accessor.clone(),
        });
    }
    if association.kind == AssociationKind::ManyToMany && association.through.is_none() {
        return Err(SchemaError::MissingThrough(format!(
            "{}.{}",
            source.name, association.accessor
        )));
    }

    let many = association.kind.is_multiple();
    let type_ref = if many {
        TypeRef::named_nn_list_nn(&target.name)
    } else {
        TypeRef::named(&target.name)
    };

    let captured = (source.clone(), association.clone(), target.clone());
    let mut field = Field::new(&association.accessor, type_ref, move |ctx| {
        let (source, association, target) = captured.clone();
        FieldFuture::new(async move {
            let runtime = runtime(&ctx)?;
            let parent = ctx.parent_value.try_downcast_ref::<Record>()?;
            let args = if many {
                QueryArgs::from_json(&args_record(&ctx.args)?)?
            } else {
                QueryArgs::default()
            };

            let resolved = resolvers::resolve_association(
                runtime.as_ref(),
                &source,
                &association,
                &target,
                parent,
                &args,
                &selection(&ctx),
            )
            .await?;

            Ok(match resolved {
                Resolved::Many(rows) => {
                    Some(FieldValue::list(rows.into_iter().map(FieldValue::owned_any)))
                }
                Resolved::One(row) => row.map(FieldValue::owned_any),
            })
        })
    })
    .description(format!("{} {}", association.kind, association.target));
    let mut inputs = Vec::new();
    let mut type_prefix = None;

    if many {
        let prefix = free_type_prefix(relation_type_prefix(source, association), taken);
        for argument in query_args(&prefix) {
            field = field.argument(argument);
        }
        inputs.push(filter_input(&prefix, &target).into());
        inputs.push(order_enum(&prefix, &target).into());
        taken.insert(format!("{}Filter", prefix));
        taken.insert(format!("{}OrderBy", prefix));
        type_prefix = Some(prefix);
    }

    Ok(RelationField {
        field,
        inputs,
        type_prefix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeDescriptor, AttributeKind, ThroughDescriptor};
    use assert_matches::assert_matches;

    fn entities() -> IndexMap<String, Arc<EntityDescriptor>> {
        let user = EntityDescriptor::new("User", "users")
            .attribute(AttributeDescriptor::new("id", AttributeKind::Integer).primary_key())
            .attribute(AttributeDescriptor::new("posts", AttributeKind::Text));
        let post = EntityDescriptor::new("Post", "posts")
            .attribute(AttributeDescriptor::new("id", AttributeKind::Integer).primary_key());
        [user, post]
            .into_iter()
            .map(|e| (e.name.clone(), Arc::new(e)))
            .collect()
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let entities = entities();
        let association =
            AssociationDescriptor::new(AssociationKind::ManyToOne, "Post", "Ghost", "ghost_id", "ghost");

        let result = relation_field(&entities, &entities["Post"], &association, &mut HashSet::new());

        assert_matches!(result, Err(SchemaError::UnknownTarget(name)) if name == "Ghost");
    }

    #[test]
    fn test_accessor_shadowing_attribute_is_rejected() {
        let entities = entities();
        let association =
            AssociationDescriptor::new(AssociationKind::OneToMany, "User", "Post", "author_id", "posts");

        let result = relation_field(&entities, &entities["User"], &association, &mut HashSet::new());

        assert_matches!(result, Err(SchemaError::AccessorCollision { .. }));
    }

    #[test]
    fn test_many_to_many_needs_junction() {
        let entities = entities();
        let association =
            AssociationDescriptor::new(AssociationKind::ManyToMany, "Post", "User", "post_id", "readers");

        assert_matches!(
            relation_field(&entities, &entities["Post"], &association, &mut HashSet::new()),
            Err(SchemaError::MissingThrough(_))
        );

        let association = association.with_through(ThroughDescriptor {
            table: "post_readers".into(),
            foreign_key: "post_id".into(),
            other_key: "user_id".into(),
        });
        let built = relation_field(&entities, &entities["Post"], &association, &mut HashSet::new()).unwrap();
        assert_eq!(built.inputs.len(), 2);
    }

    #[test]
    fn test_to_one_relation_has_no_inputs() {
        let entities = entities();
        let association =
            AssociationDescriptor::new(AssociationKind::ManyToOne, "Post", "User", "author_id", "author");

        let built = relation_field(&entities, &entities["Post"], &association, &mut HashSet::new()).unwrap();

        assert!(built.inputs.is_empty());
    }

    #[test]
    fn test_relation_types_avoid_taken_names() {
        let entities = entities();
        let association =
            AssociationDescriptor::new(AssociationKind::OneToMany, "User", "Post", "author_id", "blogPosts");
        let mut taken: HashSet<String> =
            ["UserBlogPostsFilter".to_string(), "UserBlogPostsRelationOrderBy".to_string()]
                .into_iter()
                .collect();

        let built = relation_field(&entities, &entities["User"], &association, &mut taken).unwrap();

        assert_eq!(built.type_prefix.as_deref(), Some("UserBlogPostsRelation2"));
        assert!(taken.contains("UserBlogPostsRelation2Filter"));
        assert!(taken.contains("UserBlogPostsRelation2OrderBy"));

        // a second relation with the same base moves on again
        let again = relation_field(&entities, &entities["User"], &association, &mut taken).unwrap();
        assert_eq!(again.type_prefix.as_deref(), Some("UserBlogPostsRelation3"));
    }

    #[test]
    fn test_free_prefix_is_kept() {
        let entities = entities();
        let association =
            AssociationDescriptor::new(AssociationKind::OneToMany, "User", "Post", "author_id", "blogPosts");

        let built =
            relation_field(&entities, &entities["User"], &association, &mut HashSet::new()).unwrap();

        assert_eq!(built.type_prefix.as_deref(), Some("UserBlogPosts"));
    }

    #[test]
    fn test_relation_type_prefix() {
        let entities = entities();
        let association =
            AssociationDescriptor::new(AssociationKind::OneToMany, "User", "Post", "author_id", "blogPosts");
        assert_eq!(
            relation_type_prefix(&entities["User"], &association),
            "UserBlogPosts"
        );
    }
}
