//! In-memory [`QueryBuilder`] over JSON rows
//!
//! Reference backend for tests and fixtures. Field names may be dotted paths
//! (`stats.score`) into nested objects, which behave like computed columns:
//! they are not plain columns, so list resolution selects them under a
//! `cursor_key<N>` alias.

use crate::cursor::PageRow;
use crate::error::Result;
use crate::keyset::{compare_values, Predicate};
use crate::order::OrderDirection;
use crate::query::QueryBuilder;
use serde_json::{Map, Value};
use std::cmp::Ordering;

type Row = Map<String, Value>;

/// Row view resolving dotted paths
struct PathRow<'a>(&'a Row);

impl PageRow for PathRow<'_> {
    fn column(&self, name: &str) -> Option<Value> {
        lookup(self.0, name)
    }
}

fn lookup(row: &Row, path: &str) -> Option<Value> {
    if let Some(value) = row.get(path) {
        return Some(value.clone());
    }

    let mut parts = path.split('.');
    let mut current = row.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current.clone())
}

/// Query over a fixed set of rows
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    rows: Vec<Row>,
    conditions: Vec<Predicate>,
    order: Vec<(String, OrderDirection)>,
    aliases: Vec<(String, String)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl MemoryQuery {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// Build from JSON objects; non-object values are skipped
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::new(
            values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Where-groups pushed so far
    pub fn conditions(&self) -> &[Predicate] {
        &self.conditions
    }

    /// Select aliases pushed so far, as (expression, alias)
    pub fn aliases(&self) -> &[(String, String)] {
        &self.aliases
    }

    fn filtered(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(|row| self.conditions.iter().all(|p| p.matches(&PathRow(row))))
    }

    fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for (field, direction) in &self.order {
            let ordering = match (lookup(a, field), lookup(b, field)) {
                (Some(x), Some(y)) => compare_values(&x, &y).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = match direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl QueryBuilder for MemoryQuery {
    type Row = Row;

    fn add_order_by(&mut self, field: &str, direction: OrderDirection) {
        self.order.push((field.to_string(), direction));
    }

    fn add_where_group(&mut self, predicate: Predicate) {
        self.conditions.push(predicate);
    }

    fn add_select_alias(&mut self, expression: &str, alias: &str) {
        self.aliases.push((expression.to_string(), alias.to_string()));
    }

    fn has_column(&self, field: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(field))
    }

    fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    fn offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    fn count(&self) -> Result<u64> {
        Ok(self.filtered().count() as u64)
    }

    fn fetch(&self) -> Result<Vec<Row>> {
        let mut rows: Vec<&Row> = self.filtered().collect();
        rows.sort_by(|a, b| self.compare_rows(a, b));

        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| {
                let mut out = row.clone();
                for (expression, alias) in &self.aliases {
                    if let Some(value) = lookup(row, expression) {
                        out.insert(alias.clone(), value);
                    }
                }
                out
            })
            .collect())
    }
}
