/// Field and operation scope resolution with tagged caching
///
/// The effective scope of a field is the schema's default scope overridden
/// by the field-level scope, where the field-level scope falls back from the
/// field's own declaration to its target object type, then to the enclosing
/// type. Results are cached under tags so a schema or type can be
/// invalidated in bulk.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matcher::is_authorized;
use super::types::ScopeExpression;
use crate::cache::TaggedCache;
use crate::error::Result;
use crate::schema::{FieldSpec, OperationKind, SchemaDefinition, TypeDefinition};

/// Tag of every entry derived from schema `name`
pub fn schema_tag(name: &str) -> String {
    format!("schema_name_{}", name)
}

/// Tag of every entry derived from type `name`
pub fn type_tag(name: &str) -> String {
    format!("type_name_{}", name)
}

/// Tag of every entry computed for one requester scope
pub fn scope_entity_tag(requested: &ScopeExpression) -> String {
    format!("scope_entity_{}", requested)
}

/// Declared scopes of types, looked up by name
pub trait ScopeLookup {
    /// Own scope of the object type `name`; `None` when the type has none,
    /// is not an object type or is unknown
    fn type_scope(&self, name: &str) -> Result<Option<String>>;
}

/// Operations a requester may see, per class, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedOperations {
    pub query: Vec<String>,
    pub mutation: Vec<String>,
    pub subscription: Vec<String>,
}

impl AuthorizedOperations {
    pub fn get(&self, kind: OperationKind) -> &[String] {
        match kind {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
            OperationKind::Subscription => &self.subscription,
        }
    }

    fn get_mut(&mut self, kind: OperationKind) -> &mut Vec<String> {
        match kind {
            OperationKind::Query => &mut self.query,
            OperationKind::Mutation => &mut self.mutation,
            OperationKind::Subscription => &mut self.subscription,
        }
    }

    pub fn contains(&self, kind: OperationKind, name: &str) -> bool {
        self.get(kind).iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        OperationKind::ALL.iter().all(|kind| self.get(*kind).is_empty())
    }
}

/// Statistics about resolver cache usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Field or operation lookups served from the cache
    pub hits: usize,
    /// Field or operation lookups not in the cache
    pub misses: usize,
    /// Scope computations performed
    pub computations: usize,
}

impl ResolverStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Computes and caches effective scopes
///
/// # Examples
///
/// ```
/// use scopeql_authz::cache::TaggedCache;
/// use scopeql_authz::config::CacheConfig;
/// use scopeql_authz::scope::FieldScopeResolver;
/// use std::sync::Arc;
///
/// let resolver = FieldScopeResolver::new(Arc::new(TaggedCache::in_memory(&CacheConfig::default())));
/// let scope = resolver.parse_scope("region=EU#US");
/// assert!(scope.allows("region", "EU"));
/// ```
pub struct FieldScopeResolver {
    cache: Arc<TaggedCache>,
    stats: Arc<DashMap<String, usize>>,
}

impl FieldScopeResolver {
    pub fn new(cache: Arc<TaggedCache>) -> Self {
        Self {
            cache,
            stats: Arc::new(DashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<TaggedCache> {
        &self.cache
    }

    /// Lenient parse, memoized by raw text
    pub fn parse_scope(&self, raw: &str) -> ScopeExpression {
        if raw.is_empty() {
            return ScopeExpression::new();
        }

        let key = format!("scope:{}", raw);
        if let Some(parsed) = self.cache.get::<ScopeExpression>(&key) {
            return parsed;
        }

        let parsed = ScopeExpression::parse(raw);
        self.cache.set(&key, &parsed);
        parsed
    }

    /// Effective scope of an operation with its own scope `own`
    pub fn operation_scope(&self, schema: &SchemaDefinition, own: Option<&str>) -> ScopeExpression {
        let base = self.parse_scope(&schema.scope);
        match own {
            Some(own) => base.merge_override(&self.parse_scope(own)),
            None => base,
        }
    }

    /// Effective scope of field `field_name` of `ty` in `schema`
    pub fn field_scope(
        &self,
        schema: &SchemaDefinition,
        ty: &TypeDefinition,
        field_name: &str,
        field: &FieldSpec,
        lookup: &dyn ScopeLookup,
    ) -> Result<ScopeExpression> {
        let key = format!("field:{}:{}:{}", schema.name, ty.name, field_name);
        let mut tags = vec![schema_tag(&schema.name), type_tag(&ty.name)];
        let target = field.ty.base_name();
        if target != ty.name {
            tags.push(type_tag(target));
        }

        if let Some(scope) = self.cache.get_by_tags::<ScopeExpression>(&tags, &key) {
            self.increment_stat("hits");
            return Ok(scope);
        }
        self.increment_stat("misses");

        let component = match &field.scope {
            Some(own) => Some(own.clone()),
            None => match lookup.type_scope(target)? {
                Some(target_scope) => Some(target_scope),
                None => ty.scope.clone(),
            },
        };

        let base = self.parse_scope(&schema.scope);
        let scope = match component {
            Some(component) => base.merge_override(&self.parse_scope(&component)),
            None => base,
        };
        self.increment_stat("computations");

        self.cache.set_by_tags(&tags, &key, &scope);
        Ok(scope)
    }

    /// Fields of `ty` visible to `requested`, in declaration order
    pub fn filter_fields(
        &self,
        schema: &SchemaDefinition,
        ty: &TypeDefinition,
        requested: &ScopeExpression,
        lookup: &dyn ScopeLookup,
    ) -> Result<IndexMap<String, FieldSpec>> {
        let mut visible = IndexMap::with_capacity(ty.fields.len());

        for (name, field) in &ty.fields {
            let required = self.field_scope(schema, ty, name, field, lookup)?;
            if is_authorized(requested, &required) {
                visible.insert(name.clone(), field.clone());
            } else {
                debug!("Hiding field {}.{} from scope '{}'", ty.name, name, requested);
            }
        }

        Ok(visible)
    }

    /// Every operation of `schema` visible to `requested`
    ///
    /// `own_scope` returns the own scope of an operation; it is only called
    /// when the set is not cached.
    pub fn authorized_operations<F>(
        &self,
        schema: &SchemaDefinition,
        requested: &ScopeExpression,
        mut own_scope: F,
    ) -> Result<AuthorizedOperations>
    where
        F: FnMut(OperationKind, &str) -> Result<Option<String>>,
    {
        let key = format!("operations:{}", schema.name);
        let tags = vec![schema_tag(&schema.name), scope_entity_tag(requested)];

        if let Some(authorized) = self.cache.get_by_tags::<AuthorizedOperations>(&tags, &key) {
            self.increment_stat("hits");
            return Ok(authorized);
        }
        self.increment_stat("misses");

        let mut authorized = AuthorizedOperations::default();
        for kind in OperationKind::ALL {
            for name in schema.operations(kind).keys() {
                let own = own_scope(kind, name)?;
                let required = self.operation_scope(schema, own.as_deref());
                if is_authorized(requested, &required) {
                    authorized.get_mut(kind).push(name.clone());
                }
            }
        }
        self.increment_stat("computations");

        self.cache.set_by_tags(&tags, &key, &authorized);
        Ok(authorized)
    }

    /// Drop every cached entry of schema `name`
    pub fn invalidate_schema(&self, name: &str) -> Result<()> {
        self.cache.delete_by_tags(&[schema_tag(name)])
    }

    /// Drop every cached entry of type `name`
    pub fn invalidate_type(&self, name: &str) -> Result<()> {
        self.cache.delete_by_tags(&[type_tag(name)])
    }

    /// Drop every cached entry computed for `requested`
    pub fn invalidate_requester(&self, requested: &ScopeExpression) -> Result<()> {
        self.cache.delete_by_tags(&[scope_entity_tag(requested)])
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            computations: self.get_stat("computations"),
        }
    }

    pub fn reset_stats(&self) {
        self.stats.clear();
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl std::fmt::Debug for FieldScopeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldScopeResolver")
            .field("cache", &self.cache)
            .field("stats", &self.stats())
            .finish()
    }
}
