//! Per-request schema assembly
//!
//! Prunes a schema's operations down to those the requester may see and hands
//! the execution engine a lazily resolving [`TypeLoader`].
//!
//! ```text
//! (schema, scope, selection) → authorized operations → RootObject per class
//!                                                    ↓
//!                                   SchemaContext ← load_type(name)
//! ```

mod context;
mod selection;

pub use context::{SchemaContext, TypeInstance, TypeLoader};
pub use selection::OperationSelection;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::schema::{OperationDefinition, OperationKind, Registry};
use crate::scope::{AuthorizedOperations, FieldScopeResolver};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Root object of one operation class
#[derive(Debug, Clone)]
pub struct RootObject {
    pub kind: OperationKind,
    /// `Query`, `Mutation` or `Subscription`
    pub name: String,
    /// Visible operations keyed by their schema name
    pub operations: IndexMap<String, OperationDefinition>,
}

impl RootObject {
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }
}

/// Filtered schema handed to the execution engine
#[derive(Debug)]
pub struct AssembledSchema {
    pub name: String,
    pub query: Option<RootObject>,
    pub mutation: Option<RootObject>,
    pub subscription: Option<RootObject>,
    /// Middleware identifiers of the schema, passed through
    pub middleware: Vec<String>,
    context: Arc<SchemaContext>,
}

impl AssembledSchema {
    pub fn root(&self, kind: OperationKind) -> Option<&RootObject> {
        match kind {
            OperationKind::Query => self.query.as_ref(),
            OperationKind::Mutation => self.mutation.as_ref(),
            OperationKind::Subscription => self.subscription.as_ref(),
        }
    }

    /// Type-loader callback for the execution engine
    pub fn type_loader(&self) -> Arc<dyn TypeLoader> {
        self.context.clone()
    }

    pub fn context(&self) -> &SchemaContext {
        &self.context
    }

    pub fn load_type(&self, name: &str) -> Result<TypeInstance> {
        self.context.load_type(name)
    }

    /// Eagerly build every declared type and list type
    pub fn materialize_all(&self) -> Result<Vec<TypeInstance>> {
        self.context.materialize_all()
    }
}

/// Builds an [`AssembledSchema`] per request
pub struct SchemaAssembler {
    config: Arc<EngineConfig>,
    registry: Arc<Registry>,
    resolver: Arc<FieldScopeResolver>,
}

impl SchemaAssembler {
    pub fn new(
        config: Arc<EngineConfig>,
        registry: Arc<Registry>,
        resolver: Arc<FieldScopeResolver>,
    ) -> Self {
        Self {
            config,
            registry,
            resolver,
        }
    }

    /// Assemble schema `schema_name` (or the default schema) for a requester
    ///
    /// Returns `Ok(None)` when the requester may see no operation at all.
    /// A non-empty `selection` restricts every class to the named operations.
    pub fn assemble(
        &self,
        schema_name: Option<&str>,
        selection: Option<&OperationSelection>,
        requester_scope: &str,
    ) -> Result<Option<AssembledSchema>> {
        let schema = Arc::new(self.config.schema(schema_name)?.clone());
        let requested = self.resolver.parse_scope(requester_scope);
        let enforce = self.config.scopes.enabled;

        let authorized = if enforce {
            self.resolver
                .authorized_operations(&schema, &requested, |kind, name| {
                    match schema.operations(kind).get(name) {
                        Some(reference) => Ok(self.registry.operation_definition(reference)?.scope),
                        None => Ok(None),
                    }
                })?
        } else {
            let declared = |kind: OperationKind| -> Vec<String> {
                schema.operations(kind).keys().cloned().collect()
            };
            AuthorizedOperations {
                query: declared(OperationKind::Query),
                mutation: declared(OperationKind::Mutation),
                subscription: declared(OperationKind::Subscription),
            }
        };

        let introspection = selection.map(|s| s.introspection).unwrap_or(false);
        let selection = selection.filter(|s| !s.is_empty());

        let mut roots: Vec<Option<RootObject>> = Vec::with_capacity(3);
        for kind in OperationKind::ALL {
            let mut operations = IndexMap::new();
            for name in authorized.get(kind) {
                if let Some(selection) = selection {
                    if !selection.contains(kind, name) {
                        continue;
                    }
                }
                let Some(reference) = schema.operations(kind).get(name) else {
                    continue;
                };
                let mut operation = self.registry.operation_definition(reference)?;
                operation.name = name.clone();
                operations.insert(name.clone(), operation);
            }

            roots.push(if operations.is_empty() {
                None
            } else {
                Some(RootObject {
                    kind,
                    name: kind.root_name().to_string(),
                    operations,
                })
            });
        }

        if roots.iter().all(Option::is_none) {
            debug!(
                "No operation of schema '{}' visible to scope '{}'",
                schema.name, requested
            );
            return Ok(None);
        }

        let context = Arc::new(SchemaContext::new(
            Arc::clone(&schema),
            requested,
            Arc::new(self.config.types.clone()),
            Arc::clone(&self.registry),
            Arc::clone(&self.resolver),
            enforce,
        ));

        let mut roots = roots.into_iter();
        let assembled = AssembledSchema {
            name: schema.name.clone(),
            query: roots.next().flatten(),
            mutation: roots.next().flatten(),
            subscription: roots.next().flatten(),
            middleware: schema.middleware.clone(),
            context,
        };

        if introspection {
            let built = assembled.materialize_all()?;
            debug!("Introspection built {} declared types", built.len());
        }

        info!(
            "Assembled schema '{}': {} queries, {} mutations, {} subscriptions",
            assembled.name,
            count(&assembled.query),
            count(&assembled.mutation),
            count(&assembled.subscription),
        );

        Ok(Some(assembled))
    }
}

fn count(root: &Option<RootObject>) -> usize {
    root.as_ref().map(|r| r.operations.len()).unwrap_or(0)
}
