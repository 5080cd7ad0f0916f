//! Root query and mutation fields for one entity

use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, TypeRef};

use super::inputs::query_args;
use super::types::input_type;
use super::{args_record, runtime, selection};
use crate::error::Error;
use crate::model::{AttributeDescriptor, EntityDescriptor};
use crate::query::QueryArgs;
use crate::resolvers;

/// Primitive of the `id` argument, following the primary key
fn id_type(entity: &EntityDescriptor) -> &'static str {
    entity
        .primary_key()
        .and_then(|pk| entity.get_attribute(pk))
        .and_then(|a| input_type(&a.kind))
        .unwrap_or(TypeRef::ID)
}

fn id_argument(entity: &EntityDescriptor) -> InputValue {
    InputValue::new("id", TypeRef::named_nn(id_type(entity)))
}

/// Attributes accepted by mutations, the primary key excluded
fn writable(entity: &EntityDescriptor) -> Vec<(&AttributeDescriptor, &'static str)> {
    entity
        .attributes
        .iter()
        .filter(|a| !a.primary_key)
        .filter_map(|a| input_type(&a.kind).map(|primitive| (a, primitive)))
        .collect()
}

fn attribute_arguments(entity: &EntityDescriptor) -> Vec<InputValue> {
    writable(entity)
        .into_iter()
        .map(|(attribute, primitive)| {
            let argument = InputValue::new(&attribute.name, TypeRef::named(primitive));
            match &attribute.comment {
                Some(comment) => argument.description(comment),
                None => argument,
            }
        })
        .collect()
}

fn id_value(args: &crate::runtime::Record) -> async_graphql::Result<serde_json::Value> {
    args.get("id")
        .cloned()
        .ok_or_else(|| Error::InvalidArgument("missing id".into()).into())
}

/// `findAll<Entity>(filter, orderBy, page, paginate): [Entity!]!`
pub fn find_all(entity: Arc<EntityDescriptor>) -> Field {
    let name = format!("findAll{}", entity.name);
    let captured = entity.clone();
    let mut field = Field::new(name, TypeRef::named_nn_list_nn(&entity.name), move |ctx| {
        let entity = captured.clone();
        FieldFuture::new(async move {
            let runtime = runtime(&ctx)?;
            let args = QueryArgs::from_json(&args_record(&ctx.args)?)?;
            let rows =
                resolvers::find_all(runtime.as_ref(), &entity, &args, &selection(&ctx), None)
                    .await?;
            Ok(Some(FieldValue::list(
                rows.into_iter().map(FieldValue::owned_any),
            )))
        })
    })
    .description(format!("List {} records", entity.name));

    for argument in query_args(&entity.name) {
        field = field.argument(argument);
    }
    field
}

/// `findOne<Entity>(id): Entity`
pub fn find_one(entity: Arc<EntityDescriptor>) -> Field {
    let name = format!("findOne{}", entity.name);
    let captured = entity.clone();
    Field::new(name, TypeRef::named(&entity.name), move |ctx| {
        let entity = captured.clone();
        FieldFuture::new(async move {
            let runtime = runtime(&ctx)?;
            let id = id_value(&args_record(&ctx.args)?)?;
            let row =
                resolvers::find_one(runtime.as_ref(), &entity, &id, &selection(&ctx)).await?;
            Ok(row.map(FieldValue::owned_any))
        })
    })
    .argument(id_argument(&entity))
    .description(format!("Get one {} by primary key", entity.name))
}

/// `create<Entity>(attrs...): Entity!`
pub fn create(entity: Arc<EntityDescriptor>) -> Field {
    let name = format!("create{}", entity.name);
    let captured = entity.clone();
    let mut field = Field::new(name, TypeRef::named_nn(&entity.name), move |ctx| {
        let entity = captured.clone();
        FieldFuture::new(async move {
            let runtime = runtime(&ctx)?;
            let args = args_record(&ctx.args)?;
            let row = resolvers::create(runtime.as_ref(), &entity, &args).await?;
            Ok(Some(FieldValue::owned_any(row)))
        })
    });
    for argument in attribute_arguments(&entity) {
        field = field.argument(argument);
    }
    field
}

/// `update<Entity>(id, attrs...): Entity`
pub fn update(entity: Arc<EntityDescriptor>) -> Field {
    let name = format!("update{}", entity.name);
    let captured = entity.clone();
    let mut field = Field::new(name, TypeRef::named(&entity.name), move |ctx| {
        let entity = captured.clone();
        FieldFuture::new(async move {
            let runtime = runtime(&ctx)?;
            let args = args_record(&ctx.args)?;
            let id = id_value(&args)?;
            let row = resolvers::update(runtime.as_ref(), &entity, &id, &args).await?;
            Ok(row.map(FieldValue::owned_any))
        })
    })
    .argument(id_argument(&entity));
    for argument in attribute_arguments(&entity) {
        field = field.argument(argument);
    }
    field
}

/// `delete<Entity>(id): Entity`
pub fn delete(entity: Arc<EntityDescriptor>) -> Field {
    let name = format!("delete{}", entity.name);
    let captured = entity.clone();
    Field::new(name, TypeRef::named(&entity.name), move |ctx| {
        let entity = captured.clone();
        FieldFuture::new(async move {
            let runtime = runtime(&ctx)?;
            let id = id_value(&args_record(&ctx.args)?)?;
            let row =
                resolvers::delete(runtime.as_ref(), &entity, &id, &selection(&ctx)).await?;
            Ok(row.map(FieldValue::owned_any))
        })
    })
    .argument(id_argument(&entity))
}
