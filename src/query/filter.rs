//! Filter translation
//!
//! Filter arguments arrive as flat objects whose keys are an attribute name
//! with an operator suffix (`views_gt`, `title_contains`, `id_in`), plus
//! optional `AND` / `OR` lists of nested filter objects. They are translated
//! into a [`Predicate`] keyed by attribute, one value per [`Operator`].

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::runtime::Record;

/// Comparison operator in a predicate tree.
///
/// Declaration order is the rendering order within one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Eq,
    Ne,
    In,
    NotIn,
    Lt,
    Gt,
    Lte,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    /// SQL spelling of the operator
    pub fn to_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

/// One filter key suffix and the comparison it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterSuffix {
    Equals,
    Not,
    In,
    NotIn,
    /// Spelling used by the derived filter input types
    NotInList,
    Lt,
    Gt,
    Lte,
    Gte,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
}

impl FilterSuffix {
    /// Evaluation order. When two suffixes target the same operator on one
    /// attribute, the later one wins.
    pub const ALL: [FilterSuffix; 15] = [
        FilterSuffix::Equals,
        FilterSuffix::Not,
        FilterSuffix::In,
        FilterSuffix::NotIn,
        FilterSuffix::NotInList,
        FilterSuffix::Lt,
        FilterSuffix::Gt,
        FilterSuffix::Lte,
        FilterSuffix::Gte,
        FilterSuffix::Contains,
        FilterSuffix::NotContains,
        FilterSuffix::StartsWith,
        FilterSuffix::NotStartsWith,
        FilterSuffix::EndsWith,
        FilterSuffix::NotEndsWith,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            FilterSuffix::Equals => "",
            FilterSuffix::Not => "_not",
            FilterSuffix::In => "_in",
            FilterSuffix::NotIn => "_nin",
            FilterSuffix::NotInList => "_not_in",
            FilterSuffix::Lt => "_lt",
            FilterSuffix::Gt => "_gt",
            FilterSuffix::Lte => "_lte",
            FilterSuffix::Gte => "_gte",
            FilterSuffix::Contains => "_contains",
            FilterSuffix::NotContains => "_not_contains",
            FilterSuffix::StartsWith => "_starts_with",
            FilterSuffix::NotStartsWith => "_not_starts_with",
            FilterSuffix::EndsWith => "_ends_with",
            FilterSuffix::NotEndsWith => "_not_ends_with",
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            FilterSuffix::Equals => Operator::Eq,
            FilterSuffix::Not => Operator::Ne,
            FilterSuffix::In => Operator::In,
            FilterSuffix::NotIn | FilterSuffix::NotInList => Operator::NotIn,
            FilterSuffix::Lt => Operator::Lt,
            FilterSuffix::Gt => Operator::Gt,
            FilterSuffix::Lte => Operator::Lte,
            FilterSuffix::Gte => Operator::Gte,
            FilterSuffix::Contains | FilterSuffix::StartsWith | FilterSuffix::EndsWith => {
                Operator::Like
            }
            FilterSuffix::NotContains
            | FilterSuffix::NotStartsWith
            | FilterSuffix::NotEndsWith => Operator::NotLike,
        }
    }

    /// Filter key for an attribute, e.g. `views_gt`
    pub fn key(&self, attribute: &str) -> String {
        format!("{}{}", attribute, self.suffix())
    }

    /// Turn the filter value into the operand stored in the predicate.
    /// Pattern suffixes wrap the value in `%` wildcards.
    pub fn operand(&self, value: &Value) -> Value {
        match self {
            FilterSuffix::Contains | FilterSuffix::NotContains => {
                Value::String(format!("%{}%", like_text(value)))
            }
            FilterSuffix::StartsWith | FilterSuffix::NotStartsWith => {
                Value::String(format!("{}%", like_text(value)))
            }
            FilterSuffix::EndsWith | FilterSuffix::NotEndsWith => {
                Value::String(format!("%{}", like_text(value)))
            }
            _ => value.clone(),
        }
    }
}

fn like_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Conditions on one attribute, implicitly ANDed
pub type Conditions = BTreeMap<Operator, Value>;

/// Predicate tree handed to the runtime.
///
/// Attribute conditions are ANDed with each other and with the groups. The
/// members of the `or` group are ORed, the members of the `and` group ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub fields: IndexMap<String, Conditions>,
    pub or: Option<Box<Predicate>>,
    pub and: Option<Box<Predicate>>,
}

/// One member of a predicate, as seen by renderers and evaluators.
#[derive(Debug, Clone, Copy)]
pub enum Clause<'a> {
    Field(&'a str, &'a Conditions),
    Or(&'a Predicate),
    And(&'a Predicate),
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicate matching a single attribute value
    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().condition(attribute, Operator::Eq, value)
    }

    /// Add (or overwrite) one condition
    pub fn condition(
        mut self,
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.fields
            .entry(attribute.into())
            .or_default()
            .insert(operator, value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.or.is_none() && self.and.is_none()
    }

    /// Members in rendering order
    pub fn clauses(&self) -> Vec<Clause<'_>> {
        let mut clauses: Vec<Clause<'_>> = self
            .fields
            .iter()
            .map(|(name, conditions)| Clause::Field(name.as_str(), conditions))
            .collect();
        if let Some(or) = &self.or {
            clauses.push(Clause::Or(or));
        }
        if let Some(and) = &self.and {
            clauses.push(Clause::And(and));
        }
        clauses
    }

    /// Merge a caller-supplied base predicate into this one.
    ///
    /// Keys missing here are taken wholesale; keys present on both sides are
    /// extended, with the base overwriting operators it shares.
    pub fn merge_base(&mut self, base: Predicate) {
        for (attribute, conditions) in base.fields {
            match self.fields.get_mut(&attribute) {
                Some(existing) => existing.extend(conditions),
                None => {
                    self.fields.insert(attribute, conditions);
                }
            }
        }
        merge_group(&mut self.or, base.or);
        merge_group(&mut self.and, base.and);
    }

    /// Evaluate against an in-memory record with SQL comparison semantics:
    /// comparisons against NULL are false, `LIKE` is case-insensitive.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses().iter().all(|c| clause_matches(c, record))
    }
}

fn merge_group(slot: &mut Option<Box<Predicate>>, base: Option<Box<Predicate>>) {
    if let Some(base) = base {
        match slot {
            Some(existing) => existing.merge_base(*base),
            None => *slot = Some(base),
        }
    }
}

fn clause_matches(clause: &Clause<'_>, record: &Record) -> bool {
    match clause {
        Clause::Field(name, conditions) => {
            let value = record.get(*name).unwrap_or(&Value::Null);
            conditions
                .iter()
                .all(|(op, operand)| condition_matches(*op, value, operand))
        }
        Clause::Or(group) => group.clauses().iter().any(|c| clause_matches(c, record)),
        Clause::And(group) => group.clauses().iter().all(|c| clause_matches(c, record)),
    }
}

fn condition_matches(op: Operator, value: &Value, operand: &Value) -> bool {
    use std::cmp::Ordering::*;

    match op {
        Operator::Eq if operand.is_null() => value.is_null(),
        Operator::Ne if operand.is_null() => !value.is_null(),
        _ if value.is_null() => false,
        Operator::Eq => compare(value, operand) == Some(Equal),
        Operator::Ne => matches!(compare(value, operand), Some(Less | Greater)),
        Operator::Lt => compare(value, operand) == Some(Less),
        Operator::Gt => compare(value, operand) == Some(Greater),
        Operator::Lte => matches!(compare(value, operand), Some(Less | Equal)),
        Operator::Gte => matches!(compare(value, operand), Some(Greater | Equal)),
        Operator::In => operand_list(operand)
            .iter()
            .any(|o| compare(value, o) == Some(Equal)),
        Operator::NotIn => operand_list(operand)
            .iter()
            .all(|o| compare(value, o) != Some(Equal)),
        Operator::Like => like_matches(value, operand),
        Operator::NotLike => !like_matches(value, operand),
    }
}

fn operand_list(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Compare two JSON scalars. Booleans compare as 0/1 like SQLite stores them.
fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    fn numeric(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::String(x), y) => numeric(y).and_then(|y| x.parse::<f64>().ok()?.partial_cmp(&y)),
        (x, Value::String(y)) => numeric(x).and_then(|x| x.partial_cmp(&y.parse::<f64>().ok()?)),
        (x, y) => numeric(x)?.partial_cmp(&numeric(y)?),
    }
}

fn like_matches(value: &Value, pattern: &Value) -> bool {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        other => other.to_string(),
    };
    let mut expr = String::from("(?is)^");
    for ch in like_text(pattern).chars() {
        match ch {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            c => expr.push_str(&regex::escape(&c.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
        .map(|re| re.is_match(&text))
        .unwrap_or(false)
}

/// A filter argument object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    /// Operator-suffixed keys in argument order
    pub fields: IndexMap<String, Value>,
    pub or: Option<Vec<FilterExpression>>,
    pub and: Option<Vec<FilterExpression>>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn or(mut self, members: Vec<FilterExpression>) -> Self {
        self.or = Some(members);
        self
    }

    pub fn and(mut self, members: Vec<FilterExpression>) -> Self {
        self.and = Some(members);
        self
    }

    /// Parse from a JSON object. An explicit `null` group counts as absent.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidArgument(format!("filter must be an object, got {}", value))
        })?;

        let mut expression = Self::new();
        for (key, value) in object {
            match key.as_str() {
                "OR" | "AND" => {
                    let members = match value {
                        Value::Null => continue,
                        Value::Array(items) => items
                            .iter()
                            .map(Self::from_json)
                            .collect::<Result<Vec<_>>>()?,
                        single => vec![Self::from_json(single)?],
                    };
                    if key == "OR" {
                        expression.or = Some(members);
                    } else {
                        expression.and = Some(members);
                    }
                }
                _ => {
                    expression.fields.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(expression)
    }

    /// Shallow-merge a list of expressions, later keys overwriting earlier.
    pub fn merged(members: &[FilterExpression]) -> Self {
        let mut merged = Self::new();
        for member in members {
            for (key, value) in &member.fields {
                merged.fields.insert(key.clone(), value.clone());
            }
            if member.or.is_some() {
                merged.or = member.or.clone();
            }
            if member.and.is_some() {
                merged.and = member.and.clone();
            }
        }
        merged
    }
}

/// Translates filter expressions for one fixed list of attributes.
///
/// Filter keys are resolved through a table built once from the attribute
/// names, so translation never assembles key strings per request.
#[derive(Debug, Clone)]
pub struct FilterTranslator {
    attributes: Vec<String>,
    keys: HashMap<String, Vec<(usize, FilterSuffix)>>,
}

impl FilterTranslator {
    pub fn new<S: AsRef<str>>(attributes: &[S]) -> Self {
        let attributes: Vec<String> = attributes.iter().map(|a| a.as_ref().to_string()).collect();
        let mut keys: HashMap<String, Vec<(usize, FilterSuffix)>> = HashMap::new();
        for (index, attribute) in attributes.iter().enumerate() {
            for suffix in FilterSuffix::ALL {
                keys.entry(suffix.key(attribute))
                    .or_default()
                    .push((index, suffix));
            }
        }
        Self { attributes, keys }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Translate a filter expression into a predicate.
    ///
    /// A top-level `OR` (or, failing that, `AND`) replaces per-attribute
    /// filtering for this level: its members are merged and translated as
    /// one group. Keys that match no attribute are ignored.
    pub fn translate(&self, filter: &FilterExpression) -> Predicate {
        let mut predicate = Predicate::new();
        if self.attributes.is_empty() {
            return predicate;
        }

        if let Some(members) = &filter.or {
            let group = self.translate(&FilterExpression::merged(members));
            predicate.or = Some(Box::new(group));
            return predicate;
        }
        if let Some(members) = &filter.and {
            let group = self.translate(&FilterExpression::merged(members));
            predicate.and = Some(Box::new(group));
            return predicate;
        }

        let mut hits: Vec<(usize, usize, FilterSuffix, &Value)> = Vec::new();
        for (key, value) in &filter.fields {
            let Some(targets) = self.keys.get(key) else {
                continue;
            };
            for (attribute, suffix) in targets {
                let rank = FilterSuffix::ALL
                    .iter()
                    .position(|s| s == suffix)
                    .unwrap_or_default();
                hits.push((*attribute, rank, *suffix, value));
            }
        }
        hits.sort_by_key(|(attribute, rank, _, _)| (*attribute, *rank));

        for (attribute, _, suffix, value) in hits {
            predicate
                .fields
                .entry(self.attributes[attribute].clone())
                .or_default()
                .insert(suffix.operator(), suffix.operand(value));
        }
        predicate
    }
}
