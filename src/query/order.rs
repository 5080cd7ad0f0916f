//! `orderBy` argument parsing

use once_cell::sync::Lazy;
use regex::Regex;

static ORDER_BY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)_(ASC|DESC)$").unwrap());

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Convert to SQL order string
    pub fn to_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// A single ordering clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub attribute: String,
    pub direction: OrderDirection,
}

impl Ordering {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Parse `<attribute>_<ASC|DESC>`.
///
/// Anything malformed, or naming an attribute not in `attributes`, yields
/// `None` rather than an error.
pub fn parse_order_by<S: AsRef<str>>(attributes: &[S], value: &str) -> Option<Ordering> {
    let captures = ORDER_BY.captures(value)?;
    let attribute = captures.get(1)?.as_str();
    if !attributes.iter().any(|a| a.as_ref() == attribute) {
        return None;
    }
    let direction = match captures.get(2)?.as_str() {
        "DESC" => OrderDirection::Desc,
        _ => OrderDirection::Asc,
    };
    Some(Ordering {
        attribute: attribute.to_string(),
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTRS: &[&str] = &["id", "title", "created_at"];

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_order_by(ATTRS, "title_ASC"), Some(Ordering::asc("title")));
        assert_eq!(parse_order_by(ATTRS, "id_DESC"), Some(Ordering::desc("id")));
    }

    #[test]
    fn test_parse_attribute_with_underscore() {
        assert_eq!(
            parse_order_by(ATTRS, "created_at_DESC"),
            Some(Ordering::desc("created_at"))
        );
    }

    #[test]
    fn test_malformed_is_ignored() {
        assert_eq!(parse_order_by(ATTRS, "title"), None);
        assert_eq!(parse_order_by(ATTRS, "title_asc"), None);
        assert_eq!(parse_order_by(ATTRS, "title_ASC "), None);
        assert_eq!(parse_order_by(ATTRS, "_ASC"), None);
        assert_eq!(parse_order_by(ATTRS, ""), None);
    }

    #[test]
    fn test_unknown_attribute_is_ignored() {
        assert_eq!(parse_order_by(ATTRS, "views_DESC"), None);
    }
}
