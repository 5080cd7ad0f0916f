//! Filter inputs, order-by enums and list arguments

use async_graphql::dynamic::{Enum, EnumItem, InputObject, InputValue, TypeRef};

use crate::model::{AttributeKind, EntityDescriptor};
use crate::query::FilterSuffix;

const BOOLEAN_FILTERS: &[FilterSuffix] = &[FilterSuffix::Equals, FilterSuffix::Not];

const NUMBER_FILTERS: &[FilterSuffix] = &[
    FilterSuffix::Equals,
    FilterSuffix::Not,
    FilterSuffix::In,
    FilterSuffix::NotInList,
    FilterSuffix::Lt,
    FilterSuffix::Gt,
    FilterSuffix::Lte,
    FilterSuffix::Gte,
];

const STRING_FILTERS: &[FilterSuffix] = &[
    FilterSuffix::Equals,
    FilterSuffix::Not,
    FilterSuffix::In,
    FilterSuffix::NotInList,
    FilterSuffix::Contains,
    FilterSuffix::NotContains,
    FilterSuffix::StartsWith,
    FilterSuffix::EndsWith,
    FilterSuffix::NotStartsWith,
    FilterSuffix::NotEndsWith,
];

/// Filter keys offered for a kind and the primitive their values take.
/// Kinds without a filter set get no filter fields.
pub fn filter_set(kind: &AttributeKind) -> Option<(&'static str, &'static [FilterSuffix])> {
    match kind {
        AttributeKind::Boolean => Some((TypeRef::BOOLEAN, BOOLEAN_FILTERS)),
        AttributeKind::Integer => Some((TypeRef::INT, NUMBER_FILTERS)),
        AttributeKind::Float | AttributeKind::Double | AttributeKind::DoublePrecision => {
            Some((TypeRef::FLOAT, NUMBER_FILTERS))
        }
        AttributeKind::Char
        | AttributeKind::String
        | AttributeKind::Text
        | AttributeKind::Uuid
        | AttributeKind::Date
        | AttributeKind::DateOnly
        | AttributeKind::Time
        | AttributeKind::BigInt
        | AttributeKind::Decimal => Some((TypeRef::STRING, STRING_FILTERS)),
        AttributeKind::Virtual | AttributeKind::Blob | AttributeKind::Other(_) => None,
    }
}

fn describe(suffix: FilterSuffix) -> Option<&'static str> {
    match suffix {
        FilterSuffix::Equals => None,
        FilterSuffix::Not => Some("All values that are not equal to given value."),
        FilterSuffix::In => Some("All values that are contained in given list."),
        FilterSuffix::NotIn | FilterSuffix::NotInList => {
            Some("All values that are not contained in given list.")
        }
        FilterSuffix::Lt => Some("All values less than the given value."),
        FilterSuffix::Gt => Some("All values greater than the given value."),
        FilterSuffix::Lte => Some("All values less than or equal the given value."),
        FilterSuffix::Gte => Some("All values greater than or equal the given value."),
        FilterSuffix::Contains => Some("All values containing the given string."),
        FilterSuffix::NotContains => Some("All values not containing the given string."),
        FilterSuffix::StartsWith => Some("All values starting with the given string."),
        FilterSuffix::NotStartsWith => Some("All values not starting with the given string."),
        FilterSuffix::EndsWith => Some("All values ending with the given string."),
        FilterSuffix::NotEndsWith => Some("All values not ending with the given string."),
    }
}

/// `<name>Filter` input with per-attribute filter keys and recursive
/// `AND` / `OR` lists.
pub fn filter_input(name: &str, entity: &EntityDescriptor) -> InputObject {
    let type_name = format!("{}Filter", name);
    let mut input = InputObject::new(&type_name);

    for attribute in &entity.attributes {
        let Some((primitive, suffixes)) = filter_set(&attribute.kind) else {
            continue;
        };
        for suffix in suffixes {
            let type_ref = match suffix {
                FilterSuffix::In | FilterSuffix::NotIn | FilterSuffix::NotInList => {
                    TypeRef::named_list(primitive)
                }
                _ => TypeRef::named(primitive),
            };
            let mut field = InputValue::new(suffix.key(&attribute.name), type_ref);
            if let Some(description) = describe(*suffix) {
                field = field.description(description);
            }
            input = input.field(field);
        }
    }

    input
        .field(InputValue::new("OR", TypeRef::named_list(&type_name)))
        .field(InputValue::new("AND", TypeRef::named_list(&type_name)))
}

/// `<name>OrderBy` enum with `<attr>_ASC` and `<attr>_DESC` per attribute
pub fn order_enum(name: &str, entity: &EntityDescriptor) -> Enum {
    entity
        .attributes
        .iter()
        .flat_map(|a| [format!("{}_ASC", a.name), format!("{}_DESC", a.name)])
        .fold(Enum::new(format!("{}OrderBy", name)), |e, item| {
            e.item(EnumItem::new(item))
        })
        .description("Order by any model field")
}

/// `filter`, `orderBy`, `page` and `paginate` arguments
pub fn query_args(name: &str) -> Vec<InputValue> {
    vec![
        InputValue::new("filter", TypeRef::named(format!("{}Filter", name)))
            .description("Filter query parameters"),
        InputValue::new("orderBy", TypeRef::named(format!("{}OrderBy", name)))
            .description("Set order by any model attribute"),
        InputValue::new("page", TypeRef::named(TypeRef::INT))
            .description("Set number page for pagination"),
        InputValue::new("paginate", TypeRef::named(TypeRef::INT))
            .description("Set number of elements per page for pagination"),
    ]
}
