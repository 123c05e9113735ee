//! Engine facade
//!
//! Owns the configuration, the registry and the shared scope cache, and
//! assembles a filtered schema per request.

use crate::assembler::{AssembledSchema, OperationSelection, SchemaAssembler};
use crate::cache::{CacheStore, TaggedCache};
use crate::config::EngineConfig;
use crate::error::{AuthzError, Result};
use crate::schema::Registry;
use crate::scope::{FieldScopeResolver, ResolverStats, ScopeExpression};
use parking_lot::RwLock;
use scopeql_pagination::{CursorCodec, ListInfoRequest, ListArgs, ListPage, ListQuery, QueryBuilder};
use std::sync::Arc;
use tracing::{info, warn};

/// Schema authorization and pagination engine
///
/// # Examples
///
/// ```
/// use scopeql_authz::config::EngineConfig;
/// use scopeql_authz::schema::{OperationDefinition, Registry, SchemaDefinition, TypeRef};
/// use scopeql_authz::SchemaEngine;
/// use std::sync::Arc;
///
/// let mut registry = Registry::new();
/// registry.register_operation("Users", || {
///     OperationDefinition::new("users", TypeRef::named("String")).scope("role=admin")
/// });
///
/// let config = EngineConfig::default()
///     .with_schema(SchemaDefinition::new("default").query("users", "Users"));
/// let engine = SchemaEngine::new(config, Arc::new(registry)).unwrap();
///
/// assert!(engine.assemble(Some("default"), None, "role=admin").unwrap().is_some());
/// assert!(engine.assemble(Some("default"), None, "role=guest").unwrap().is_none());
/// ```
pub struct SchemaEngine {
    registry: Arc<Registry>,
    resolver: Arc<FieldScopeResolver>,
    state: RwLock<EngineState>,
}

/// Everything swapped by [`SchemaEngine::reload`]
struct EngineState {
    config: Arc<EngineConfig>,
    assembler: SchemaAssembler,
    codec: Option<CursorCodec>,
}

impl EngineState {
    fn new(
        config: EngineConfig,
        registry: &Arc<Registry>,
        resolver: &Arc<FieldScopeResolver>,
    ) -> Result<Self> {
        let codec = match config.cursor.secret {
            Some(_) => Some(config.cursor_codec()?),
            None => None,
        };
        let config = Arc::new(config);
        let assembler =
            SchemaAssembler::new(Arc::clone(&config), Arc::clone(registry), Arc::clone(resolver));

        Ok(Self {
            config,
            assembler,
            codec,
        })
    }
}

impl SchemaEngine {
    /// Create an engine backed by an in-process cache store
    pub fn new(config: EngineConfig, registry: Arc<Registry>) -> Result<Self> {
        let cache = TaggedCache::in_memory(&config.scopes.cache);
        Self::build(config, registry, cache)
    }

    /// Create an engine backed by an external cache store
    pub fn with_store(
        config: EngineConfig,
        registry: Arc<Registry>,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self> {
        let cache = TaggedCache::new(store, &config.scopes.cache);
        Self::build(config, registry, cache)
    }

    fn build(config: EngineConfig, registry: Arc<Registry>, cache: TaggedCache) -> Result<Self> {
        Self::check(&config, &registry)?;

        let resolver = Arc::new(FieldScopeResolver::new(Arc::new(cache)));
        let state = EngineState::new(config, &registry, &resolver)?;

        info!(
            "SchemaEngine initialized with {} schemas, scopes={}, cache={}",
            state.config.schemas.len(),
            state.config.scopes.enabled,
            resolver.cache().is_enabled()
        );

        Ok(Self {
            registry,
            resolver,
            state: RwLock::new(state),
        })
    }

    fn check(config: &EngineConfig, registry: &Registry) -> Result<()> {
        match config.lint_with(registry).into_iter().next() {
            Some(issue) => Err(issue.into()),
            None => Ok(()),
        }
    }

    /// Assemble a filtered schema for one request
    ///
    /// See [`SchemaAssembler::assemble`]. Assembly holds the state read
    /// lock, so a concurrent [`SchemaEngine::reload`] waits for it.
    pub fn assemble(
        &self,
        schema_name: Option<&str>,
        selection: Option<&OperationSelection>,
        requester_scope: &str,
    ) -> Result<Option<AssembledSchema>> {
        self.state
            .read()
            .assembler
            .assemble(schema_name, selection, requester_scope)
    }

    /// Replace the configuration, dropping every cached scope
    ///
    /// The current configuration stays in place when `config` is invalid.
    /// Schemas assembled before the reload keep the configuration they were
    /// built with.
    pub fn reload(&self, config: EngineConfig) -> Result<()> {
        Self::check(&config, &self.registry)?;
        let next = EngineState::new(config, &self.registry, &self.resolver)?;

        let mut state = self.state.write();
        self.resolver.cache().flush()?;
        *state = next;

        info!("SchemaEngine reloaded with {} schemas", state.config.schemas.len());
        Ok(())
    }

    /// Drop every cached scope of schema `name`
    pub fn invalidate_schema(&self, name: &str) -> Result<()> {
        self.resolver.invalidate_schema(name)
    }

    /// Drop every cached scope of type `name`
    pub fn invalidate_type(&self, name: &str) -> Result<()> {
        self.resolver.invalidate_type(name)
    }

    /// Drop every cached operation set computed for `requester_scope`
    pub fn invalidate_requester(&self, requester_scope: &str) -> Result<()> {
        self.resolver
            .invalidate_requester(&ScopeExpression::parse(requester_scope))
    }

    /// Cursor codec keyed by `cursor.secret`
    pub fn codec(&self) -> Result<CursorCodec> {
        self.state
            .read()
            .codec
            .clone()
            .ok_or_else(|| AuthzError::Config("cursor.secret is not set".to_string()))
    }

    /// List query of the registered list `reference`, with the built-in
    /// `id`/`ids` filter handlers already registered
    pub fn list_query<Q: QueryBuilder + 'static>(&self, reference: &str) -> Result<ListQuery<Q>> {
        match self.registry.list_definition(reference)? {
            Some(list) => Ok(list.list_query()),
            None => Err(AuthzError::Config(format!("'{}' is not a list", reference))),
        }
    }

    /// Resolve one page of `list` with the engine's cursor codec
    pub fn resolve_list<Q: QueryBuilder>(
        &self,
        list: &ListQuery<Q>,
        query: &mut Q,
        args: &ListArgs,
        request: ListInfoRequest,
    ) -> Result<ListPage<Q::Row>> {
        let codec = self.codec()?;
        list.resolve(query, args, &codec, request).map_err(|e| {
            warn!("List resolution failed: {}", e);
            AuthzError::from(e)
        })
    }

    /// Configuration currently in effect
    pub fn config(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.state.read().config)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolver(&self) -> &FieldScopeResolver {
        &self.resolver
    }

    pub fn stats(&self) -> ResolverStats {
        self.resolver.stats()
    }
}

impl std::fmt::Debug for SchemaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEngine")
            .field("schemas", &self.config().schemas.keys().collect::<Vec<_>>())
            .field("resolver", &self.resolver)
            .finish()
    }
}
