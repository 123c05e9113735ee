//! List-query runtime
//!
//! Applies `filters`, `order`, `skip`, `after` and `take` arguments to a
//! [`QueryBuilder`], fetches the page and computes its `listInfo`.

use crate::codec::CursorCodec;
use crate::cursor::{cursor_key, Cursor};
use crate::error::{PaginationError, Result};
use crate::keyset::keyset_predicate;
use crate::order::{OrderBy, OrderOptions};
use crate::query::QueryBuilder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Arguments of a list field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListArgs {
    /// Rows to skip
    #[serde(default)]
    pub skip: Option<u64>,

    /// Maximum rows to return (unbounded when absent)
    #[serde(default)]
    pub take: Option<u64>,

    /// End cursor of a previous page
    #[serde(default)]
    pub after: Option<String>,

    /// Caller ordering, by label or column
    #[serde(default)]
    pub order: Vec<OrderBy>,

    /// Named filter arguments
    #[serde(default)]
    pub filters: IndexMap<String, Value>,
}

impl ListArgs {
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn after(mut self, token: impl Into<String>) -> Self {
        self.after = Some(token.into());
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn filter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }
}

/// Which parts of the page the caller selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListInfoRequest {
    pub items: bool,
    pub total: bool,
    pub has_more: bool,
    pub end_cursor: bool,
}

impl ListInfoRequest {
    /// Items and every `listInfo` field
    pub const fn all() -> Self {
        Self {
            items: true,
            total: true,
            has_more: true,
            end_cursor: true,
        }
    }

    fn needs_rows(&self) -> bool {
        self.items || self.has_more || self.end_cursor
    }
}

/// `listInfo` of a page; unrequested parts stay `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
}

/// One resolved page
#[derive(Debug, Clone)]
pub struct ListPage<R> {
    pub items: Vec<R>,
    pub info: ListInfo,
    /// Ordering actually applied, tiebreaker included
    pub ordering: Vec<OrderBy>,
}

/// Filter handler: applies one named filter value to the query
pub type FilterFn<Q> = Box<dyn Fn(&mut Q, &Value) -> Result<()> + Send + Sync>;

/// Paginated list over a query builder type
pub struct ListQuery<Q: QueryBuilder> {
    name: String,
    ordering: OrderOptions,
    filters: IndexMap<String, FilterFn<Q>>,
}

impl<Q: QueryBuilder> ListQuery<Q> {
    pub fn new(name: impl Into<String>, ordering: OrderOptions) -> Self {
        Self {
            name: name.into(),
            ordering,
            filters: IndexMap::new(),
        }
    }

    /// Register a named filter, replacing any handler of the same name
    pub fn filter<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Q, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordering(&self) -> &OrderOptions {
        &self.ordering
    }

    /// Names of the registered filters
    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Apply `args` to `query`, fetch the page and build its `listInfo`
    ///
    /// Modifiers are pushed in this order: filters, ordering, skip, the
    /// keyset predicate decoded from `after`, then take. `total` counts the
    /// filtered rows without pagination; `hasMore` compares `skip + returned`
    /// against the rows remaining after the cursor (all filtered rows when
    /// there is no cursor).
    pub fn resolve(
        &self,
        query: &mut Q,
        args: &ListArgs,
        codec: &CursorCodec,
        request: ListInfoRequest,
    ) -> Result<ListPage<Q::Row>> {
        for (name, value) in &args.filters {
            if value.is_null() {
                continue;
            }
            let handler = self
                .filters
                .get(name)
                .ok_or_else(|| PaginationError::UnknownFilter(name.clone()))?;
            handler(query, value)?;
        }

        let ordering = self.ordering.resolve(&args.order)?;
        for (index, order) in ordering.iter().enumerate() {
            if order.field.contains('.') || !query.has_column(&order.field) {
                query.add_select_alias(&order.field, &cursor_key(index));
            }
            query.add_order_by(&order.field, order.direction);
        }

        let total = if request.total || request.has_more {
            Some(query.count()?)
        } else {
            None
        };

        let skip = args.skip.unwrap_or(0);
        if skip > 0 {
            query.offset(skip);
        }

        let mut remaining = total;
        if let Some(token) = &args.after {
            let cursor = codec.decode(token)?;
            query.add_where_group(keyset_predicate(&cursor, self.ordering.unique_column()));
            if request.has_more {
                remaining = Some(query.count()?);
            }
        }

        if let Some(take) = args.take {
            query.limit(take);
        }

        let items = if request.needs_rows() {
            query.fetch()?
        } else {
            Vec::new()
        };

        let end_cursor = match items.last() {
            Some(last) if request.end_cursor => {
                match Cursor::from_row(&ordering, last, self.ordering.unique_column()) {
                    Some(cursor) => Some(codec.encode(&cursor)?),
                    None => None,
                }
            }
            _ => None,
        };

        let has_more = if request.has_more {
            let returned = items.len() as u64;
            Some(match (args.take, remaining) {
                (Some(take), Some(base)) if returned >= take => skip + returned < base,
                _ => false,
            })
        } else {
            None
        };

        debug!(
            "List '{}' resolved {} rows (skip={}, take={:?}, after={})",
            self.name,
            items.len(),
            skip,
            args.take,
            args.after.is_some()
        );

        Ok(ListPage {
            items: if request.items { items } else { Vec::new() },
            info: ListInfo {
                total: if request.total { total } else { None },
                has_more,
                end_cursor,
            },
            ordering,
        })
    }
}

impl<Q: QueryBuilder> std::fmt::Debug for ListQuery<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListQuery")
            .field("name", &self.name)
            .field("ordering", &self.ordering)
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}
