//! Integration tests for the SQLite runtime
//!
//! These tests run the resolvers against a seeded in-memory database:
//! - Filtering, ordering and pagination
//! - Soft and hard deletes
//! - Create and update
//! - Association traversal for every association kind

mod common;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use modelql::query::{FilterExpression, QueryArgs, SelectionTree};
use modelql::resolvers::{self, Resolved};
use modelql::{ModelRuntime, Record};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn column(rows: &[Record], name: &str) -> Vec<Value> {
    rows.iter().map(|r| r[name].clone()).collect()
}

// ============================================================================
// Reads
// ============================================================================

mod reads {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_filter_order_and_projection() {
        let (runtime, registry) = common::blog().await;
        let posts = registry.entity("Posts").unwrap();
        let args = QueryArgs::default()
            .filter(
                FilterExpression::new()
                    .field("views_gt", 10)
                    .field("title_contains", "x"),
            )
            .order_by("views_DESC");

        let rows = resolvers::find_all(
            &runtime,
            posts,
            &args,
            &SelectionTree::new().field("title"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            rows,
            vec![
                record(json!({ "title": "box", "id": 3 })),
                record(json!({ "title": "xylophone", "id": 2 })),
            ]
        );
    }

    #[tokio::test]
    async fn test_or_group() {
        let (runtime, registry) = common::blog().await;
        let posts = registry.entity("Posts").unwrap();
        let args = QueryArgs::default()
            .filter(FilterExpression::new().or(vec![
                FilterExpression::new().field("id", 1),
                FilterExpression::new().field("views_gte", 50),
            ]))
            .order_by("id_ASC");

        let rows = resolvers::find_all(&runtime, posts, &args, &SelectionTree::new(), None)
            .await
            .unwrap();

        assert_eq!(column(&rows, "id"), vec![json!(1), json!(3)]);
    }

    #[tokio::test]
    async fn test_pagination() {
        let (runtime, registry) = common::blog().await;
        let posts = registry.entity("Posts").unwrap();
        let args = QueryArgs::default().order_by("id_ASC").page(2, 2);

        let rows = resolvers::find_all(&runtime, posts, &args, &SelectionTree::new(), None)
            .await
            .unwrap();

        assert_eq!(column(&rows, "id"), vec![json!(3), json!(4)]);
    }

    #[tokio::test]
    async fn test_null_and_empty_list_filters() {
        let (runtime, registry) = common::blog().await;
        let posts = registry.entity("Posts").unwrap();

        let orphans = QueryArgs::default().filter(FilterExpression::new().field("author_id", Value::Null));
        let rows = resolvers::find_all(&runtime, posts, &orphans, &SelectionTree::new(), None)
            .await
            .unwrap();
        assert_eq!(column(&rows, "id"), vec![json!(5)]);

        let none = QueryArgs::default().filter(FilterExpression::new().field("id_in", json!([])));
        let rows = resolvers::find_all(&runtime, posts, &none, &SelectionTree::new(), None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_find_one_decodes_booleans() {
        let (runtime, registry) = common::blog().await;
        let users = registry.entity("Users").unwrap();

        let ann = resolvers::find_one(
            &runtime,
            users,
            &json!(1),
            &SelectionTree::new().field("name").field("active"),
        )
        .await
        .unwrap();

        assert_eq!(
            ann,
            Some(record(json!({ "name": "ann", "active": true, "id": 1 })))
        );
    }

    #[tokio::test]
    async fn test_find_one_missing_is_none() {
        let (runtime, registry) = common::blog().await;
        let users = registry.entity("Users").unwrap();

        let found = resolvers::find_one(&runtime, users, &json!(99), &SelectionTree::new())
            .await
            .unwrap();

        assert_eq!(found, None);
    }
}

// ============================================================================
// Writes
// ============================================================================

mod writes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_drops_unknown_arguments() {
        let (runtime, registry) = common::blog().await;
        let tags = registry.entity("Tags").unwrap();

        let created = resolvers::create(
            &runtime,
            tags,
            &record(json!({ "label": "async", "colour": "red" })),
        )
        .await
        .unwrap();

        assert_eq!(created, record(json!({ "id": 3, "label": "async" })));
    }

    #[tokio::test]
    async fn test_update_existing_and_missing() {
        let (runtime, registry) = common::blog().await;
        let posts = registry.entity("Posts").unwrap();

        let updated = resolvers::update(
            &runtime,
            posts,
            &json!(2),
            &record(json!({ "id": 2, "title": "renamed" })),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated["title"], json!("renamed"));
        assert_eq!(updated["views"], json!(20));

        let missing = resolvers::update(
            &runtime,
            posts,
            &json!(99),
            &record(json!({ "title": "nobody" })),
        )
        .await
        .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_row_but_keeps_it() {
        let (runtime, registry) = common::blog().await;
        let posts = registry.entity("Posts").unwrap();
        let selection = SelectionTree::new().field("title");

        let deleted = resolvers::delete(&runtime, posts, &json!(1), &selection)
            .await
            .unwrap();
        assert_eq!(deleted, Some(record(json!({ "title": "hello", "id": 1 }))));

        let gone = resolvers::find_one(&runtime, posts, &json!(1), &selection)
            .await
            .unwrap();
        assert_eq!(gone, None);

        let (stamp,): (Option<String>,) =
            sqlx::query_as("SELECT deleted_at FROM posts WHERE id = 1")
                .fetch_one(runtime.pool())
                .await
                .unwrap();
        assert!(stamp.is_some());

        // deleting again affects nothing
        let again = resolvers::delete(&runtime, posts, &json!(1), &selection)
            .await
            .unwrap();
        assert_eq!(again, None);
    }

    #[tokio::test]
    async fn test_delete_missing_is_none() {
        let (runtime, registry) = common::blog().await;
        let posts = registry.entity("Posts").unwrap();

        let deleted = resolvers::delete(&runtime, posts, &json!(404), &SelectionTree::new())
            .await
            .unwrap();

        assert_eq!(deleted, None);
    }

    #[tokio::test]
    async fn test_hard_delete_without_soft_delete_column() {
        let (runtime, registry) = common::blog().await;
        let tags = registry.entity("Tags").unwrap();
        let created = resolvers::create(&runtime, tags, &record(json!({ "label": "temp" })))
            .await
            .unwrap();

        let deleted = resolvers::delete(&runtime, tags, &created["id"], &SelectionTree::new())
            .await
            .unwrap();
        assert!(deleted.is_some());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags")
            .fetch_one(runtime.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}

// ============================================================================
// Associations
// ============================================================================

mod associations {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn resolve(
        runtime: &dyn ModelRuntime,
        registry: &modelql::ModelRegistry,
        source: &str,
        accessor: &str,
        parent: Record,
        args: QueryArgs,
        selection: SelectionTree,
    ) -> Resolved {
        let source = registry.entity(source).unwrap();
        let association = source.get_association(accessor).unwrap();
        let target = registry.entity(&association.target).unwrap();
        resolvers::resolve_association(
            runtime,
            source,
            association,
            target,
            &parent,
            &args,
            &selection,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_has_many_with_arguments() {
        let (runtime, registry) = common::blog().await;

        let resolved = resolve(
            &runtime,
            &registry,
            "Users",
            "posts",
            record(json!({ "id": 1 })),
            QueryArgs::default().order_by("views_DESC"),
            SelectionTree::new(),
        )
        .await;

        assert_matches!(resolved, Resolved::Many(rows) if column(&rows, "id") == vec![json!(2), json!(1)]);
    }

    #[tokio::test]
    async fn test_belongs_to() {
        let (runtime, registry) = common::blog().await;

        let resolved = resolve(
            &runtime,
            &registry,
            "Posts",
            "author",
            record(json!({ "id": 3, "author_id": 2 })),
            QueryArgs::default(),
            SelectionTree::new().field("name"),
        )
        .await;

        assert_matches!(resolved, Resolved::One(Some(user)) if user["name"] == json!("bob"));
    }

    #[tokio::test]
    async fn test_belongs_to_with_null_key() {
        let (runtime, registry) = common::blog().await;

        let resolved = resolve(
            &runtime,
            &registry,
            "Posts",
            "author",
            record(json!({ "id": 5, "author_id": null })),
            QueryArgs::default(),
            SelectionTree::new().field("name"),
        )
        .await;

        assert_eq!(resolved, Resolved::One(None));
    }

    #[tokio::test]
    async fn test_many_to_many_through_junction() {
        let (runtime, registry) = common::blog().await;

        let resolved = resolve(
            &runtime,
            &registry,
            "Posts",
            "tags",
            record(json!({ "id": 1 })),
            QueryArgs::default()
                .filter(FilterExpression::new().field("label_starts_with", "s")),
            SelectionTree::new().field("label"),
        )
        .await;

        assert_matches!(resolved, Resolved::Many(rows) if column(&rows, "label") == vec![json!("sql")]);
    }

    #[tokio::test]
    async fn test_has_one() {
        let (runtime, registry) = common::blog().await;

        let resolved = resolve(
            &runtime,
            &registry,
            "Users",
            "profiles",
            record(json!({ "id": 1 })),
            QueryArgs::default(),
            SelectionTree::new().field("bio"),
        )
        .await;

        assert_matches!(resolved, Resolved::One(Some(profile)) if profile["bio"] == json!("writes things"));
    }
}
