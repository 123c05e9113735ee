//! # scopeql pagination
//!
//! Keyset (cursor) pagination for list queries.
//!
//! ## Features
//!
//! - **Opaque cursors** sealed with AES-256-GCM; tampering is detected
//! - **Keyset predicates** that seek strictly past the last row under a
//!   composite order
//! - **Tiebreaker guarantee**: every ordering ends on a unique field
//! - **List runtime** applying filters, ordering, skip, after and take to any
//!   [`QueryBuilder`]
//!
//! ## Example
//!
//! ```rust
//! use scopeql_pagination::{
//!     CursorCodec, ListArgs, ListInfoRequest, ListQuery, MemoryQuery, OrderBy, OrderOptions,
//! };
//! use serde_json::json;
//!
//! let codec = CursorCodec::from_secret("server-secret");
//! let list: ListQuery<MemoryQuery> =
//!     ListQuery::new("users", OrderOptions::new().option("NAME", "name"));
//!
//! let rows = (1..=5).map(|i| json!({"id": i, "name": format!("user{}", i)}));
//! let mut query = MemoryQuery::from_values(rows);
//! let args = ListArgs::default().order(OrderBy::asc("NAME")).take(2);
//!
//! let page = list.resolve(&mut query, &args, &codec, ListInfoRequest::all()).unwrap();
//! assert_eq!(page.items.len(), 2);
//! assert_eq!(page.info.has_more, Some(true));
//! assert!(page.info.end_cursor.is_some());
//! ```

pub mod cipher;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod keyset;
pub mod list;
pub mod memory;
pub mod order;
pub mod query;

pub use cipher::{AesGcmCipher, TokenCipher};
pub use codec::CursorCodec;
pub use cursor::{cursor_key, Cursor, CursorOrder, PageRow, RowId};
pub use error::{PaginationError, Result};
pub use keyset::{keyset_predicate, Comparison, Predicate};
pub use list::{FilterFn, ListArgs, ListInfo, ListInfoRequest, ListPage, ListQuery};
pub use memory::MemoryQuery;
pub use order::{OrderBy, OrderDirection, OrderOptions};
pub use query::QueryBuilder;
