//! Per-request query building
//!
//! Turns resolver arguments and the requested-field tree into a
//! [`QuerySpec`]: predicate, ordering, limit/offset and projection.

pub mod filter;
pub mod order;
pub mod pagination;
pub mod selection;
mod spec;

pub use filter::{Clause, Conditions, FilterExpression, FilterSuffix, FilterTranslator, Operator, Predicate};
pub use order::{OrderDirection, Ordering, parse_order_by};
pub use pagination::{DEFAULT_PAGE_SIZE, Pagination};
pub use selection::{SelectionTree, projection, relation_fields, scalar_fields};
pub use spec::{QueryArgs, QuerySpec};
