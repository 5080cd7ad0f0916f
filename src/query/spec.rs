//! Query specification handed to the runtime

use serde_json::Value;

use super::filter::{FilterExpression, FilterTranslator, Predicate};
use super::order::{Ordering, parse_order_by};
use super::pagination::Pagination;
use super::selection::{SelectionTree, projection, push_unique};
use crate::error::{Error, Result};
use crate::model::EntityDescriptor;

/// List arguments accepted by find-all and to-many relation fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    pub filter: Option<FilterExpression>,
    pub order_by: Option<String>,
    pub page: Option<i64>,
    pub paginate: Option<i64>,
}

impl QueryArgs {
    /// Read `filter`, `orderBy`, `page` and `paginate` from a JSON argument
    /// object. Other keys are ignored.
    pub fn from_json(args: &serde_json::Map<String, Value>) -> Result<Self> {
        let filter = match args.get("filter") {
            None | Some(Value::Null) => None,
            Some(value) => Some(FilterExpression::from_json(value)?),
        };
        let order_by = match args.get("orderBy") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(Error::InvalidArgument(format!(
                    "orderBy must be a string, got {}",
                    other
                )));
            }
        };
        Ok(Self {
            filter,
            order_by,
            page: int_arg(args, "page")?,
            paginate: int_arg(args, "paginate")?,
        })
    }

    pub fn filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn page(mut self, page: i64, paginate: i64) -> Self {
        self.page = Some(page);
        self.paginate = Some(paginate);
        self
    }
}

fn int_arg(args: &serde_json::Map<String, Value>, name: &str) -> Result<Option<i64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::InvalidArgument(format!("{} must be an integer", name))),
    }
}

/// Everything the runtime needs to run one read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub predicate: Predicate,
    pub order: Option<Ordering>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Attributes to fetch; empty means all
    pub attributes: Vec<String>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate filter and order arguments only
    pub fn from_args(entity: &EntityDescriptor, args: &QueryArgs) -> Self {
        let attributes = entity.attribute_names();
        let translator = FilterTranslator::new(&attributes);
        Self {
            predicate: args
                .filter
                .as_ref()
                .map(|f| translator.translate(f))
                .unwrap_or_default(),
            order: args
                .order_by
                .as_deref()
                .and_then(|o| parse_order_by(&attributes, o)),
            ..Self::default()
        }
    }

    /// Filter, order, pagination and projection for a list read
    pub fn for_listing(entity: &EntityDescriptor, args: &QueryArgs, selection: &SelectionTree) -> Self {
        let pagination = Pagination::from_args(args.page, args.paginate);
        Self {
            limit: Some(pagination.limit),
            offset: Some(pagination.offset),
            attributes: projection(entity, selection, None),
            ..Self::from_args(entity, args)
        }
    }

    /// Projection only, for single-record reads
    pub fn for_single(entity: &EntityDescriptor, selection: &SelectionTree) -> Self {
        Self {
            attributes: projection(entity, selection, None),
            ..Self::default()
        }
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Make sure `attribute` is projected
    pub fn require_attribute(&mut self, attribute: &str) {
        if !self.attributes.is_empty() {
            push_unique(&mut self.attributes, attribute);
        }
    }
}
