//! Filter predicates and ordering for composed queries
//!
//! A [`Filter`] names a typed entity field, a comparison operator and a
//! [`FieldValue`]. Filters on one query are conjoined. The Postgres store
//! renders them as a `WHERE` clause with bound parameters; the in-memory
//! store evaluates them with [`Filter::matches`] using SQL semantics
//! (comparisons against `NULL` are never true).
//!
//! # Example
//!
//! ```rust,ignore
//! use registrar::entities::CourseField;
//! use registrar::repository::Filter;
//!
//! let filters = vec![
//!     Filter::gte(CourseField::Credits, 3),
//!     Filter::like(CourseField::Title, "Intro%"),
//! ];
//! ```

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl OrderDirection {
    /// SQL keyword for this direction
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A column value: used as a filter operand, a setter value and a cell of
/// an in-memory row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integer value (all integer columns widen to i64)
    Integer(i64),
    /// Text value
    Text(String),
    /// Boolean value
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// List of integers (for IN)
    IntegerList(Vec<i64>),
    /// List of strings (for IN)
    TextList(Vec<String>),
    /// SQL NULL
    Null,
}

impl FieldValue {
    /// Whether this is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Compare two scalar values of the same type.
    ///
    /// Returns `None` for mismatched types, lists and NULL.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used when sorting rows: NULL sorts after every value,
    /// matching Postgres' default `NULLS LAST` for ascending order.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::IntegerList(_) => "integer[]",
            Self::TextList(_) => "text[]",
            Self::Null => "null",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(list: Vec<String>) -> Self {
        Self::TextList(list)
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl From<Vec<i32>> for FieldValue {
    fn from(list: Vec<i32>) -> Self {
        Self::IntegerList(list.into_iter().map(i64::from).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A single condition on one field of an entity.
///
/// `F` is the entity's field enum, so a filter can only name columns the
/// entity actually has.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter<F> {
    /// The field to filter on
    pub field: F,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FieldValue,
}

impl<F> Filter<F> {
    /// Create a new filter condition
    pub fn new(field: F, operator: FilterOperator, value: FieldValue) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    /// `field = value`
    pub fn eq(field: F, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// `field != value`
    pub fn ne(field: F, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// `field > value`
    pub fn gt(field: F, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// `field >= value`
    pub fn gte(field: F, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// `field < value`
    pub fn lt(field: F, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// `field <= value`
    pub fn lte(field: F, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// `field LIKE pattern` (`%` any run, `_` one character, `\` escapes)
    pub fn like(field: F, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FieldValue::Text(pattern.into()))
    }

    /// `field IN (values...)`
    pub fn in_list(field: F, values: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::In, values.into())
    }

    /// `field IS NULL`
    pub fn is_null(field: F) -> Self {
        Self::new(field, FilterOperator::IsNull, FieldValue::Null)
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(field: F) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FieldValue::Null)
    }

    /// Evaluate this condition against the stored value of its field.
    pub fn matches(&self, actual: &FieldValue) -> bool {
        match self.operator {
            FilterOperator::IsNull => return actual.is_null(),
            FilterOperator::IsNotNull => return !actual.is_null(),
            _ => {}
        }
        if actual.is_null() || self.value.is_null() {
            return false;
        }

        match self.operator {
            FilterOperator::Equal => actual.compare(&self.value) == Some(Ordering::Equal),
            FilterOperator::NotEqual => {
                matches!(actual.compare(&self.value), Some(o) if o != Ordering::Equal)
            }
            FilterOperator::GreaterThan => actual.compare(&self.value) == Some(Ordering::Greater),
            FilterOperator::GreaterThanOrEqual => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::LessThan => actual.compare(&self.value) == Some(Ordering::Less),
            FilterOperator::LessThanOrEqual => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::Like => match (actual, &self.value) {
                (FieldValue::Text(text), FieldValue::Text(pattern)) => like_match(text, pattern),
                _ => false,
            },
            FilterOperator::In => match (actual, &self.value) {
                (FieldValue::Integer(n), FieldValue::IntegerList(list)) => list.contains(n),
                (FieldValue::Text(s), FieldValue::TextList(list)) => list.contains(s),
                _ => false,
            },
            FilterOperator::IsNull | FilterOperator::IsNotNull => false,
        }
    }
}

/// SQL `LIKE` matching with Postgres' default escape character.
fn like_match(text: &str, pattern: &str) -> bool {
    #[derive(Clone, Copy)]
    enum Token {
        AnyRun,
        AnyOne,
        Literal(char),
    }

    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::AnyRun,
            '_' => Token::AnyOne,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // reachable[j]: the first i tokens can consume exactly text[..j]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::AnyRun => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            Token::AnyOne => {
                for j in 1..=text.len() {
                    next[j] = reachable[j - 1];
                }
            }
            Token::Literal(c) => {
                for j in 1..=text.len() {
                    next[j] = reachable[j - 1] && text[j - 1] == c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}
