//! Output object types derived from attribute descriptors

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use async_graphql::Value;

use super::FieldOptions;
use crate::model::{AttributeDescriptor, AttributeKind, EntityDescriptor};
use crate::runtime::Record;

/// Custom scalar used for date-like attributes
pub const DATE_SCALAR: &str = "Date";

/// Output primitive for an attribute kind. `None` means the attribute is
/// left out of the type.
pub fn output_type(kind: &AttributeKind) -> Option<&'static str> {
    match kind {
        AttributeKind::Boolean => Some(TypeRef::BOOLEAN),
        AttributeKind::Float | AttributeKind::Double | AttributeKind::DoublePrecision => {
            Some(TypeRef::FLOAT)
        }
        AttributeKind::Integer => Some(TypeRef::INT),
        AttributeKind::Char | AttributeKind::String | AttributeKind::Text | AttributeKind::Uuid => {
            Some(TypeRef::STRING)
        }
        AttributeKind::Date | AttributeKind::DateOnly => Some(DATE_SCALAR),
        AttributeKind::Time
        | AttributeKind::BigInt
        | AttributeKind::Decimal
        | AttributeKind::Virtual
        | AttributeKind::Blob => Some(TypeRef::STRING),
        AttributeKind::Other(_) => None,
    }
}

/// Input primitive used for mutation arguments and `id` arguments.
/// Virtual, blob and unrecognised kinds cannot be written.
pub fn input_type(kind: &AttributeKind) -> Option<&'static str> {
    match kind {
        AttributeKind::Virtual | AttributeKind::Blob | AttributeKind::Other(_) => None,
        AttributeKind::Date | AttributeKind::DateOnly => Some(TypeRef::STRING),
        other => output_type(other),
    }
}

fn attribute_type(attribute: &AttributeDescriptor, options: &FieldOptions) -> Option<TypeRef> {
    let name = output_type(&attribute.kind)?;
    let required = !options.allow_null && (!attribute.nullable || attribute.primary_key);
    Some(if required {
        TypeRef::named_nn(name)
    } else {
        TypeRef::named(name)
    })
}

/// Coerce a stored value into the shape its output primitive expects.
fn output_value(kind: &AttributeKind, value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match (output_type(kind), value) {
        (_, Json::Null) => Json::Null,
        (Some(TypeRef::BOOLEAN), Json::Number(n)) => Json::Bool(n.as_f64() != Some(0.0)),
        (Some(TypeRef::INT), Json::Bool(b)) => Json::from(b as i64),
        (Some(TypeRef::STRING) | Some(DATE_SCALAR), Json::Number(n)) => Json::String(n.to_string()),
        (Some(TypeRef::STRING) | Some(DATE_SCALAR), Json::Bool(b)) => Json::String(b.to_string()),
        (_, other) => other,
    }
}

/// Object type for an entity: one field per attribute that has an output
/// primitive and is not ignored. Relation fields are added separately.
pub fn entity_object(entity: &EntityDescriptor, options: &FieldOptions) -> Object {
    let mut object = Object::new(&entity.name);

    for attribute in &entity.attributes {
        if options.ignore.contains(&attribute.name) {
            continue;
        }
        let Some(type_ref) = attribute_type(attribute, options) else {
            continue;
        };

        let name = attribute.name.clone();
        let kind = attribute.kind.clone();
        let mut field = Field::new(&attribute.name, type_ref, move |ctx| {
            let name = name.clone();
            let kind = kind.clone();
            FieldFuture::new(async move {
                let record = ctx.parent_value.try_downcast_ref::<Record>()?;
                let stored = record.get(&name).cloned().unwrap_or_default();
                let value = Value::from_json(output_value(&kind, stored))?;
                Ok(Some(FieldValue::value(value)))
            })
        });
        if let Some(comment) = &attribute.comment {
            field = field.description(comment);
        }
        object = object.field(field);
    }

    object
}
