//! Declarative schema model
//!
//! Schemas name their operations, types and sublists by reference; the
//! [`Registry`] turns references into definitions.

pub mod builtins;
mod definition;
mod list;
mod registry;

pub use definition::{
    ArgumentSpec, FieldSpec, OperationDefinition, OperationKind, SchemaDefinition, TypeDefinition,
    TypeKind, TypeRef,
};
pub use list::{synthetic_suffixes, ListDefinition, IDS_FILTER, ID_FILTER, SYNTHETIC_PREFIXES};
pub use registry::{Definition, Factory, Registry, ScopeIssue};
