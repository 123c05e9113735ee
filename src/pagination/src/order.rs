//! Ordering configuration for list queries
//!
//! A list exposes a set of sortable fields as enum labels mapped to columns
//! (`ID -> id`, `CREATED -> created_at`). One of them is the unique
//! tiebreaker: every resolved ordering ends on it so keyset pagination always
//! has a unique successor set.

use crate::error::{PaginationError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    /// Ascending (default)
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl OrderDirection {
    /// Wire label (`ASC` / `DESC`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderDirection {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ASC" | "asc" => Ok(Self::Asc),
            "DESC" | "desc" => Ok(Self::Desc),
            other => Err(PaginationError::UnknownOrderField(format!("direction {}", other))),
        }
    }
}

/// One `{field, direction}` ordering pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Column (or enum label before resolution)
    pub field: String,

    /// Sort direction
    #[serde(alias = "dir", default)]
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, OrderDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, OrderDirection::Desc)
    }
}

/// Sortable fields of a list, keyed by enum label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOptions {
    options: IndexMap<String, String>,
    unique: String,
}

impl OrderOptions {
    /// Label of the default unique option
    pub const ID_LABEL: &'static str = "ID";

    /// Options with only the `ID -> id` tiebreaker
    pub fn new() -> Self {
        Self::with_unique(Self::ID_LABEL, "id")
    }

    /// Options whose tiebreaker is `label -> column`
    pub fn with_unique(label: impl Into<String>, column: impl Into<String>) -> Self {
        let label = label.into();
        let mut options = IndexMap::new();
        options.insert(label.clone(), column.into());
        Self {
            options,
            unique: label,
        }
    }

    /// Add a sortable option
    pub fn option(mut self, label: impl Into<String>, column: impl Into<String>) -> Self {
        self.options.insert(label.into(), column.into());
        self
    }

    /// All options in declaration order (label, column)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Column of the unique tiebreaker
    pub fn unique_column(&self) -> &str {
        self.options
            .get(&self.unique)
            .map(String::as_str)
            .unwrap_or(self.unique.as_str())
    }

    /// Label of the unique tiebreaker
    pub fn unique_label(&self) -> &str {
        &self.unique
    }

    /// Map a label or column to its column
    pub fn column(&self, field: &str) -> Option<&str> {
        if let Some(column) = self.options.get(field) {
            return Some(column.as_str());
        }
        self.options
            .values()
            .find(|column| column.as_str() == field)
            .map(String::as_str)
    }

    /// Resolve a caller ordering into columns, appending the tiebreaker
    ///
    /// Fields may be given either as labels or as columns. When the unique
    /// column is absent it is appended ascending.
    pub fn resolve(&self, requested: &[OrderBy]) -> Result<Vec<OrderBy>> {
        let mut resolved = Vec::with_capacity(requested.len() + 1);

        for order in requested {
            let column = self
                .column(&order.field)
                .ok_or_else(|| PaginationError::UnknownOrderField(order.field.clone()))?;
            resolved.push(OrderBy::new(column, order.direction));
        }

        let unique = self.unique_column();
        if !resolved.iter().any(|o| o.field == unique) {
            resolved.push(OrderBy::asc(unique));
        }

        Ok(resolved)
    }
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> OrderOptions {
        OrderOptions::new()
            .option("CREATED", "created_at")
            .option("NAME", "name")
    }

    #[test]
    fn test_empty_ordering_gets_tiebreaker() {
        let resolved = options().resolve(&[]).unwrap();
        assert_eq!(resolved, vec![OrderBy::asc("id")]);
    }

    #[test]
    fn test_tiebreaker_appended_after_caller_ordering() {
        let resolved = options().resolve(&[OrderBy::desc("CREATED")]).unwrap();
        assert_eq!(resolved, vec![OrderBy::desc("created_at"), OrderBy::asc("id")]);
    }

    #[test]
    fn test_tiebreaker_not_duplicated() {
        let resolved = options()
            .resolve(&[OrderBy::desc("id"), OrderBy::asc("name")])
            .unwrap();
        assert_eq!(resolved, vec![OrderBy::desc("id"), OrderBy::asc("name")]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = options().resolve(&[OrderBy::asc("password")]).unwrap_err();
        assert!(matches!(err, PaginationError::UnknownOrderField(f) if f == "password"));
    }

    #[test]
    fn test_direction_wire_format() {
        let order: OrderBy = serde_json::from_str(r#"{"field":"id","dir":"DESC"}"#).unwrap();
        assert_eq!(order.direction, OrderDirection::Desc);
        assert_eq!(
            serde_json::to_string(&OrderBy::asc("id")).unwrap(),
            r#"{"field":"id","direction":"ASC"}"#
        );
    }
}
