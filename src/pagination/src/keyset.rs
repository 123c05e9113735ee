//! Keyset ("seek") predicate construction
//!
//! For a composite order `(f0, f1, .., fn)` and a cursor row with values
//! `(v0, v1, .., vn)`, the rows strictly after the cursor are:
//!
//! ```text
//! (f0 ⋈ v0)
//! OR (f0 = v0 AND f1 ⋈ v1)
//! OR (f0 = v0 AND f1 = v1 AND f2 ⋈ v2) ...
//! ```
//!
//! where `⋈` is `>` for ascending fields and `<` for descending ones. The
//! predicate is built as nested groups, `group(k) = (eq(0..k) AND cmp(k)) OR
//! group(k + 1)`, which is the shape query builders express with nested
//! `where` / `orWhere` closures.

use crate::cursor::{Cursor, CursorOrder, PageRow};
use crate::order::OrderDirection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Comparison operator of a leaf predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
}

impl Comparison {
    /// Strict comparison that seeks past a value in `direction`
    pub fn seek(direction: OrderDirection) -> Self {
        match direction {
            OrderDirection::Asc => Self::Gt,
            OrderDirection::Desc => Self::Lt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

/// Nested predicate tree handed to the query builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// `field <op> value`
    Compare {
        field: String,
        op: Comparison,
        value: Value,
    },
    /// Every child holds
    And(Vec<Predicate>),
    /// At least one child holds
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluate against an in-memory row
    ///
    /// Missing columns and incomparable values never match.
    pub fn matches<R: PageRow + ?Sized>(&self, row: &R) -> bool {
        match self {
            Self::Compare { field, op, value } => {
                let Some(actual) = row.column(field) else {
                    return false;
                };
                match (op, compare_values(&actual, value)) {
                    (Comparison::Eq, Some(Ordering::Equal)) => true,
                    (Comparison::Gt, Some(Ordering::Greater)) => true,
                    (Comparison::Lt, Some(Ordering::Less)) => true,
                    _ => false,
                }
            }
            Self::And(children) => children.iter().all(|p| p.matches(row)),
            Self::Or(children) => children.iter().any(|p| p.matches(row)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { field, op, value } => write!(f, "{} {} {}", field, op.as_str(), value),
            Self::And(children) => write_group(f, children, " AND "),
            Self::Or(children) => write_group(f, children, " OR "),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}

/// Order JSON scalars: numbers numerically, strings lexically, bools false < true
///
/// Values of different kinds (and nulls) are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Ordering pairs that define the seek, in order
///
/// Duplicated fields keep their first occurrence and everything after the
/// tiebreaker is dropped, since uniqueness is reached there.
pub fn seek_fields<'a>(order: &'a [CursorOrder], tiebreaker: &str) -> Vec<&'a CursorOrder> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for pair in order {
        if !seen.insert(pair.field.as_str()) {
            continue;
        }
        fields.push(pair);
        if pair.field == tiebreaker {
            break;
        }
    }

    fields
}

/// Predicate selecting the rows strictly after `cursor`
///
/// A cursor without ordering seeks on the tiebreaker id alone.
pub fn keyset_predicate(cursor: &Cursor, tiebreaker: &str) -> Predicate {
    let fields = seek_fields(&cursor.order, tiebreaker);

    if fields.is_empty() {
        return Predicate::compare(tiebreaker, Comparison::Gt, cursor.id.to_value());
    }

    seek_group(&fields, 0)
}

/// `group(index)`: equal on every field before `index`, strictly past the
/// cursor on `index`, or any later group
fn seek_group(fields: &[&CursorOrder], index: usize) -> Predicate {
    let mut terms: Vec<Predicate> = fields[..index]
        .iter()
        .map(|f| Predicate::compare(f.field.clone(), Comparison::Eq, f.value.clone()))
        .collect();

    let current = fields[index];
    terms.push(Predicate::compare(
        current.field.clone(),
        Comparison::seek(current.direction),
        current.value.clone(),
    ));

    let here = if terms.len() == 1 {
        terms.remove(0)
    } else {
        Predicate::And(terms)
    };

    if index + 1 < fields.len() {
        Predicate::Or(vec![here, seek_group(fields, index + 1)])
    } else {
        here
    }
}
