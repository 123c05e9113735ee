//! # scopeql Authorization Engine
//!
//! Request-time schema authorization: prunes a declarative API schema down to
//! the operations and fields a requester's scope allows, and resolves types
//! lazily per request.
//!
//! ## Features
//!
//! - **Scope expressions** of the form `key=v1#v2|key2=v3` with set-overlap
//!   matching
//! - **Scope inheritance** from schema to type to field, cached under tags
//! - **Tag-indexed cache** with bulk invalidation by schema, type or requester
//! - **Lazy type loading** through a per-request [`SchemaContext`]
//! - **Keyset pagination** via [`scopeql_pagination`]
//!
//! ## Example
//!
//! ```rust
//! use scopeql_authz::config::EngineConfig;
//! use scopeql_authz::schema::{FieldSpec, OperationDefinition, Registry, SchemaDefinition, TypeDefinition, TypeRef};
//! use scopeql_authz::{SchemaEngine, TypeLoader};
//! use std::sync::Arc;
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_type("User", || {
//!         TypeDefinition::object("User")
//!             .field("name", FieldSpec::of("String"))
//!             .field("salary", FieldSpec::of("Int").scope("role=admin"))
//!     })
//!     .register_operation("Me", || OperationDefinition::new("me", TypeRef::named("User")));
//!
//! let config = EngineConfig::default().with_schema(
//!     SchemaDefinition::new("default").query("me", "Me").ty("User", "User"),
//! );
//! let engine = SchemaEngine::new(config, Arc::new(registry)).unwrap();
//!
//! let schema = engine.assemble(Some("default"), None, "role=staff").unwrap().unwrap();
//! let user = schema.type_loader().load_type("User").unwrap();
//! assert!(user.fields.contains_key("name"));
//! assert!(!user.fields.contains_key("salary"));
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod schema;
pub mod scope;

pub use assembler::{
    AssembledSchema, OperationSelection, RootObject, SchemaAssembler, SchemaContext, TypeInstance,
    TypeLoader,
};
pub use cache::{CacheStore, MemoryTagStore, TaggedCache};
pub use config::EngineConfig;
pub use engine::SchemaEngine;
pub use error::{AuthzError, Result};
pub use scope::{is_authorized, FieldScopeResolver, ScopeError, ScopeExpression};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
