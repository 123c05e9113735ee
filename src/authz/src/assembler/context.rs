//! Request-scoped type resolution
//!
//! A [`SchemaContext`] lives for one request. Types are built the first time
//! the execution engine asks for them, filtered down to the fields the
//! requester may see, and kept in the context for the rest of the request.
//! A fresh context rebuilds everything.

use crate::error::{AuthzError, Result};
use crate::schema::builtins::{self, LIST_SUFFIX};
use crate::schema::{
    synthetic_suffixes, ListDefinition, OperationKind, Registry, SchemaDefinition, TypeDefinition,
    TypeKind,
};
use crate::scope::{is_authorized, FieldScopeResolver, ScopeExpression, ScopeLookup};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A built, visibility-filtered type
pub type TypeInstance = Arc<TypeDefinition>;

/// Callback handed to the execution engine to resolve type names lazily
pub trait TypeLoader: Send + Sync {
    /// Resolve `name`, failing with [`AuthzError::TypeNotFound`]
    fn load_type(&self, name: &str) -> Result<TypeInstance>;
}

/// Per-request type cache and loader
pub struct SchemaContext {
    schema: Arc<SchemaDefinition>,
    requested: ScopeExpression,
    global_types: Arc<IndexMap<String, String>>,
    registry: Arc<Registry>,
    resolver: Arc<FieldScopeResolver>,
    enforce_scopes: bool,
    /// Built instances by name
    instances: Mutex<HashMap<String, TypeInstance>>,
    /// Unfiltered declared definitions by name; `None` caches a miss
    definitions: Mutex<HashMap<String, Option<Arc<TypeDefinition>>>>,
}

impl SchemaContext {
    pub fn new(
        schema: Arc<SchemaDefinition>,
        requested: ScopeExpression,
        global_types: Arc<IndexMap<String, String>>,
        registry: Arc<Registry>,
        resolver: Arc<FieldScopeResolver>,
        enforce_scopes: bool,
    ) -> Self {
        Self {
            schema,
            requested,
            global_types,
            registry,
            resolver,
            enforce_scopes,
            instances: Mutex::new(HashMap::new()),
            definitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn requested(&self) -> &ScopeExpression {
        &self.requested
    }

    /// Whether `name` has been built in this context
    pub fn is_loaded(&self, name: &str) -> bool {
        self.instances.lock().contains_key(name)
    }

    /// Number of instances built so far
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Declared types of the schema, or the global types when it declares none
    pub fn declared_types(&self) -> &IndexMap<String, String> {
        if self.schema.types.is_empty() {
            &self.global_types
        } else {
            &self.schema.types
        }
    }

    /// Registry reference declared for type `name`
    fn reference(&self, name: &str) -> Option<&str> {
        self.schema
            .types
            .get(name)
            .or_else(|| self.global_types.get(name))
            .map(String::as_str)
    }

    /// Unfiltered definition of a declared or built-in type
    pub fn definition(&self, name: &str) -> Result<Option<Arc<TypeDefinition>>> {
        if let Some(cached) = self.definitions.lock().get(name) {
            return Ok(cached.clone());
        }

        let definition = match self.reference(name) {
            Some(reference) => {
                let mut ty = self.registry.type_definition(reference)?;
                // the configured key names the type
                ty.name = name.to_string();
                Some(Arc::new(ty))
            }
            None => builtins::builtin(name).map(Arc::new),
        };

        self.definitions
            .lock()
            .insert(name.to_string(), definition.clone());
        Ok(definition)
    }

    fn memoize(&self, instance: TypeDefinition) -> TypeInstance {
        let mut instances = self.instances.lock();
        Arc::clone(
            instances
                .entry(instance.name.clone())
                .or_insert_with(|| Arc::new(instance)),
        )
    }

    fn build_declared(&self, definition: &TypeDefinition) -> Result<TypeInstance> {
        let filterable = matches!(definition.kind, TypeKind::Object | TypeKind::Input);
        if !self.enforce_scopes || !filterable {
            return Ok(self.memoize(definition.clone()));
        }

        let fields = self
            .resolver
            .filter_fields(&self.schema, definition, &self.requested, self)?;
        Ok(self.memoize(definition.with_fields(fields)))
    }

    /// Whether the requester may see `list` and the types it generates
    fn list_visible(&self, list: &ListDefinition) -> bool {
        if !self.enforce_scopes {
            return true;
        }
        let required = self.resolver.operation_scope(&self.schema, list.scope.as_deref());
        is_authorized(&self.requested, &required)
    }

    /// Lists reachable from the schema and visible to the requester:
    /// sublists, then list queries
    pub fn lists(&self) -> Result<Vec<ListDefinition>> {
        let mut lists = Vec::new();
        let references = self
            .schema
            .sublists
            .values()
            .chain(self.schema.operations(OperationKind::Query).values());

        for reference in references {
            if let Some(list) = self.registry.list_definition(reference)? {
                if self.list_visible(&list) {
                    lists.push(list);
                }
            }
        }
        Ok(lists)
    }

    fn find_list(&self, suffix: &str) -> Result<Option<ListDefinition>> {
        Ok(self
            .lists()?
            .into_iter()
            .find(|list| list.matches_suffix(suffix)))
    }

    /// Build every synthetic type of `list` into this context
    fn build_list_types(&self, list: &ListDefinition) {
        debug!("Building synthetic types of list '{}'", list.name);
        for ty in list.synthetic_types() {
            self.memoize(ty);
        }
    }

    /// Build every declared type and every list's synthetic types
    pub fn materialize_all(&self) -> Result<Vec<TypeInstance>> {
        let names: Vec<String> = self.declared_types().keys().cloned().collect();
        let mut built = Vec::with_capacity(names.len());
        for name in names {
            built.push(self.load_type(&name)?);
        }

        for list in self.lists()? {
            self.build_list_types(&list);
        }

        Ok(built)
    }
}

impl TypeLoader for SchemaContext {
    fn load_type(&self, name: &str) -> Result<TypeInstance> {
        if let Some(instance) = self.instances.lock().get(name) {
            return Ok(Arc::clone(instance));
        }

        if let Some(definition) = self.definition(name)? {
            return self.build_declared(&definition);
        }

        if let Some(item) = name.strip_suffix(LIST_SUFFIX) {
            if !item.is_empty() && self.definition(item)?.is_some() {
                return Ok(self.memoize(builtins::list_type(item)));
            }
        }

        for suffix in synthetic_suffixes(name) {
            if let Some(list) = self.find_list(suffix)? {
                self.build_list_types(&list);
                if let Some(instance) = self.instances.lock().get(name) {
                    return Ok(Arc::clone(instance));
                }
            }
        }

        Err(AuthzError::TypeNotFound(name.to_string()))
    }
}

impl ScopeLookup for SchemaContext {
    fn type_scope(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .definition(name)?
            .filter(|ty| ty.kind == TypeKind::Object)
            .and_then(|ty| ty.scope.clone()))
    }
}

impl std::fmt::Debug for SchemaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaContext")
            .field("schema", &self.schema.name)
            .field("requested", &self.requested.to_string())
            .field("instances", &self.instance_count())
            .finish()
    }
}
