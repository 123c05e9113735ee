//! Registry of definition factories keyed by reference
//!
//! Configuration names types, operations and lists by reference string; the
//! registry maps each reference to a factory producing the definition.

use super::definition::{OperationDefinition, TypeDefinition};
use super::list::ListDefinition;
use crate::error::{AuthzError, Result};
use crate::scope::{ScopeError, ScopeExpression};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a factory produces
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Type(TypeDefinition),
    Operation(OperationDefinition),
    List(ListDefinition),
}

impl Definition {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Operation(_) => "operation",
            Self::List(_) => "list",
        }
    }
}

pub type Factory = Arc<dyn Fn() -> Definition + Send + Sync>;

/// A scope string that failed strict validation, with where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeIssue {
    pub location: String,
    pub expression: String,
    pub error: ScopeError,
}

impl fmt::Display for ScopeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}': {}", self.location, self.expression, self.error)
    }
}

/// Reference → factory
#[derive(Clone, Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw factory, replacing any earlier one
    pub fn register<F>(&mut self, reference: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Definition + Send + Sync + 'static,
    {
        self.factories.insert(reference.into(), Arc::new(factory));
        self
    }

    pub fn register_type<F>(&mut self, reference: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> TypeDefinition + Send + Sync + 'static,
    {
        self.register(reference, move || Definition::Type(factory()))
    }

    pub fn register_operation<F>(&mut self, reference: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> OperationDefinition + Send + Sync + 'static,
    {
        self.register(reference, move || Definition::Operation(factory()))
    }

    pub fn register_list<F>(&mut self, reference: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> ListDefinition + Send + Sync + 'static,
    {
        self.register(reference, move || Definition::List(factory()))
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.factories.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered references, sorted
    pub fn references(&self) -> Vec<&str> {
        let mut references: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        references.sort_unstable();
        references
    }

    /// Run the factory registered under `reference`
    pub fn build(&self, reference: &str) -> Result<Definition> {
        self.factories
            .get(reference)
            .map(|factory| factory())
            .ok_or_else(|| AuthzError::UnknownReference(reference.to_string()))
    }

    pub fn type_definition(&self, reference: &str) -> Result<TypeDefinition> {
        match self.build(reference)? {
            Definition::Type(ty) => Ok(ty),
            other => Err(mismatch(reference, "type", &other)),
        }
    }

    /// Operation behind `reference`; list references yield their query operation
    pub fn operation_definition(&self, reference: &str) -> Result<OperationDefinition> {
        match self.build(reference)? {
            Definition::Operation(op) => Ok(op),
            Definition::List(list) => Ok(list.operation()),
            other => Err(mismatch(reference, "operation", &other)),
        }
    }

    /// List behind `reference`, `None` when it is not a list
    pub fn list_definition(&self, reference: &str) -> Result<Option<ListDefinition>> {
        match self.build(reference)? {
            Definition::List(list) => Ok(Some(list)),
            _ => Ok(None),
        }
    }

    /// Strictly validate every scope string in every registered definition
    pub fn lint_scopes(&self) -> Vec<ScopeIssue> {
        let mut issues = Vec::new();

        for reference in self.references() {
            let Ok(definition) = self.build(reference) else {
                continue;
            };

            let mut scopes: Vec<(String, &str)> = Vec::new();
            match &definition {
                Definition::Type(ty) => {
                    if let Some(scope) = &ty.scope {
                        scopes.push((reference.to_string(), scope));
                    }
                    for (name, field) in &ty.fields {
                        if let Some(scope) = &field.scope {
                            scopes.push((format!("{}.{}", reference, name), scope));
                        }
                    }
                }
                Definition::Operation(op) => {
                    if let Some(scope) = &op.scope {
                        scopes.push((reference.to_string(), scope));
                    }
                }
                Definition::List(list) => {
                    if let Some(scope) = &list.scope {
                        scopes.push((reference.to_string(), scope));
                    }
                }
            }

            for (location, expression) in scopes {
                for error in ScopeExpression::lint(expression) {
                    issues.push(ScopeIssue {
                        location: location.clone(),
                        expression: expression.to_string(),
                        error,
                    });
                }
            }
        }

        issues
    }
}

fn mismatch(reference: &str, expected: &str, found: &Definition) -> AuthzError {
    AuthzError::Config(format!(
        "Reference '{}' is a {}, expected a {}",
        reference,
        found.kind_name(),
        expected
    ))
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("references", &self.references())
            .finish()
    }
}
