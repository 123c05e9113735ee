//! Top-level operations named by an incoming request

use crate::schema::OperationKind;
use indexmap::IndexSet;

/// Marker the execution engine's introspection query carries
const INTROSPECTION_MARKERS: [&str; 2] = ["IntrospectionQuery", "__schema"];

/// Operation names per class plus the introspection flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSelection {
    query: IndexSet<String>,
    mutation: IndexSet<String>,
    subscription: IndexSet<String>,
    /// Build every declared type eagerly
    pub introspection: bool,
}

impl OperationSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection flagged as introspection when `document` looks like an
    /// introspection query
    pub fn for_document(document: &str) -> Self {
        Self {
            introspection: INTROSPECTION_MARKERS.iter().any(|m| document.contains(m)),
            ..Self::default()
        }
    }

    pub fn select(mut self, kind: OperationKind, name: impl Into<String>) -> Self {
        self.names_mut(kind).insert(name.into());
        self
    }

    pub fn query(self, name: impl Into<String>) -> Self {
        self.select(OperationKind::Query, name)
    }

    pub fn mutation(self, name: impl Into<String>) -> Self {
        self.select(OperationKind::Mutation, name)
    }

    pub fn subscription(self, name: impl Into<String>) -> Self {
        self.select(OperationKind::Subscription, name)
    }

    pub fn introspection(mut self) -> Self {
        self.introspection = true;
        self
    }

    pub fn names(&self, kind: OperationKind) -> &IndexSet<String> {
        match kind {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
            OperationKind::Subscription => &self.subscription,
        }
    }

    fn names_mut(&mut self, kind: OperationKind) -> &mut IndexSet<String> {
        match kind {
            OperationKind::Query => &mut self.query,
            OperationKind::Mutation => &mut self.mutation,
            OperationKind::Subscription => &mut self.subscription,
        }
    }

    /// Whether no operation name is selected in any class
    pub fn is_empty(&self) -> bool {
        OperationKind::ALL.iter().all(|kind| self.names(*kind).is_empty())
    }

    pub fn contains(&self, kind: OperationKind, name: &str) -> bool {
        self.names(kind).contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let selection = OperationSelection::new().query("users").mutation("createUser");
        assert!(selection.contains(OperationKind::Query, "users"));
        assert!(!selection.contains(OperationKind::Query, "createUser"));
        assert!(!selection.is_empty());
        assert!(OperationSelection::new().is_empty());
    }

    #[test]
    fn test_introspection_detection() {
        assert!(OperationSelection::for_document("query IntrospectionQuery { __schema { types { name } } }").introspection);
        assert!(!OperationSelection::for_document("{ users { items { id } } }").introspection);
    }
}
