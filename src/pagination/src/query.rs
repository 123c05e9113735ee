//! Query-building contract consumed by list resolution
//!
//! The data-access layer owns the actual query; list resolution only pushes
//! composable modifiers onto it and reads back rows and counts.

use crate::cursor::PageRow;
use crate::error::Result;
use crate::keyset::Predicate;
use crate::order::OrderDirection;

/// Opaque, mutable query handle
pub trait QueryBuilder {
    /// Row type produced by [`QueryBuilder::fetch`]
    type Row: PageRow;

    /// Append an `ORDER BY field direction`
    fn add_order_by(&mut self, field: &str, direction: OrderDirection);

    /// Append a nested where-group (ANDed with existing conditions)
    fn add_where_group(&mut self, predicate: Predicate);

    /// Select `expression` under `alias` (computed ordering columns)
    fn add_select_alias(&mut self, expression: &str, alias: &str);

    /// Whether `field` is a plain stored column of the queried row
    fn has_column(&self, field: &str) -> bool;

    /// Cap the number of returned rows
    fn limit(&mut self, limit: u64);

    /// Skip the first `offset` rows
    fn offset(&mut self, offset: u64);

    /// Count rows matching the current where-groups, ignoring
    /// ordering, limit and offset
    fn count(&self) -> Result<u64>;

    /// Execute and return the rows
    fn fetch(&self) -> Result<Vec<Self::Row>>;
}
