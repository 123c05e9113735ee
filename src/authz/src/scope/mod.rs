/// Scope-based visibility module
///
/// This module parses scope expressions, matches requester scopes against
/// required scopes and resolves the effective scope of schema fields and
/// operations with tagged caching.
///
/// # Examples
///
/// ```
/// use scopeql_authz::scope::{is_authorized, ScopeExpression};
///
/// let requested = ScopeExpression::parse("region=EU|role=admin");
///
/// assert!(is_authorized(&requested, &ScopeExpression::parse("region=EU#US")));
/// assert!(!is_authorized(&requested, &ScopeExpression::parse("region=ASIA")));
/// ```

mod matcher;
mod resolver;
mod types;


pub use matcher::{filter_authorized, is_authorized};
pub use resolver::{
    schema_tag, scope_entity_tag, type_tag, AuthorizedOperations, FieldScopeResolver,
    ResolverStats, ScopeLookup,
};
pub use types::{ScopeError, ScopeExpression, ScopeResult, ASSIGNMENT, CLAUSE_SEPARATOR, VALUE_SEPARATOR};
