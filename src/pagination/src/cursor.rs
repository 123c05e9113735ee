//! Cursor model
//!
//! A cursor records the position of the last row of a page: its unique id
//! and, for each ordering pair, the value the row had for that field.

use crate::order::{OrderBy, OrderDirection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Prefix of select aliases used for computed ordering columns
pub const CURSOR_KEY_PREFIX: &str = "cursor_key";

/// Alias under which the `index`-th ordering value is selected
pub fn cursor_key(index: usize) -> String {
    format!("{}{}", CURSOR_KEY_PREFIX, index)
}

/// Unique row identifier carried by a cursor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Str(String),
}

impl RowId {
    /// Convert a column value into an id, if it is an integer or a string
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// JSON representation used in predicates
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

/// Ordering pair with the last row's value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorOrder {
    pub field: String,

    #[serde(alias = "dir")]
    pub direction: OrderDirection,

    #[serde(default)]
    pub value: Value,
}

impl CursorOrder {
    pub fn new(field: impl Into<String>, direction: OrderDirection, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            direction,
            value: value.into(),
        }
    }
}

/// Keyset pagination position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub id: RowId,

    #[serde(default)]
    pub order: Vec<CursorOrder>,
}

impl Cursor {
    pub fn new(id: impl Into<RowId>, order: Vec<CursorOrder>) -> Self {
        Self {
            id: id.into(),
            order,
        }
    }

    /// Build the cursor for `row` under `ordering`
    ///
    /// Values come from the `cursor_key<N>` alias when the query selected one
    /// (computed or joined columns), otherwise from the stored column. Returns
    /// `None` when the row has no usable id.
    pub fn from_row<R: PageRow + ?Sized>(ordering: &[OrderBy], row: &R, id_column: &str) -> Option<Self> {
        let id = row.column(id_column).as_ref().and_then(RowId::from_value)?;

        let order = ordering
            .iter()
            .enumerate()
            .map(|(index, order)| {
                let value = row
                    .column(&cursor_key(index))
                    .or_else(|| row.column(&order.field))
                    .unwrap_or(Value::Null);
                CursorOrder::new(order.field.clone(), order.direction, value)
            })
            .collect();

        Some(Self { id, order })
    }
}

/// Column access on a fetched row
pub trait PageRow {
    /// Value of `name`, if the row carries it
    fn column(&self, name: &str) -> Option<Value>;
}

impl PageRow for Map<String, Value> {
    fn column(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl PageRow for HashMap<String, Value> {
    fn column(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl PageRow for BTreeMap<String, Value> {
    fn column(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl PageRow for Value {
    fn column(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}
