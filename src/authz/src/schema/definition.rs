//! Schema, type and field definitions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Reference to a type, possibly wrapped in list or non-null modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn list_of(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Name of the innermost named type
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{}", name),
            Self::List(inner) => write!(f, "[{}]", inner),
            Self::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// Argument of a field or operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl ArgumentSpec {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            description: None,
            default_value: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Field of an object or input type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Explicit required scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Resolver handle passed through to the execution engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, ArgumentSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl FieldSpec {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            description: None,
            scope: None,
            resolver: None,
            args: IndexMap::new(),
            default_value: None,
        }
    }

    /// Field of a named type
    pub fn of(name: impl Into<String>) -> Self {
        Self::new(TypeRef::named(name))
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn resolver(mut self, resolver: impl Into<String>) -> Self {
        self.resolver = Some(resolver.into());
        self
    }

    pub fn arg(mut self, name: impl Into<String>, arg: ArgumentSpec) -> Self {
        self.args.insert(name.into(), arg);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Scalar,
    Object,
    Input,
    Enum,
    Union,
}

/// A named type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,

    pub kind: TypeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Own required scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,

    /// Enum labels and their internal values
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub values: IndexMap<String, Value>,

    /// Union members
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_types: Vec<String>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            scope: None,
            fields: IndexMap::new(),
            values: IndexMap::new(),
            possible_types: Vec::new(),
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Scalar)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Object)
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Input)
    }

    /// Enum whose values are the labels themselves
    pub fn enumeration<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ty = Self::new(name, TypeKind::Enum);
        for label in labels {
            let label = label.into();
            ty.values.insert(label.clone(), Value::String(label));
        }
        ty
    }

    pub fn union<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ty = Self::new(name, TypeKind::Union);
        ty.possible_types = members.into_iter().map(Into::into).collect();
        ty
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldSpec) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn value(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(label.into(), value.into());
        self
    }

    /// Copy of this type with its field map replaced
    pub fn with_fields(&self, fields: IndexMap<String, FieldSpec>) -> Self {
        Self {
            fields,
            ..self.clone()
        }
    }
}

/// Operation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [Self::Query, Self::Mutation, Self::Subscription];

    /// Name of the root object type for this class
    pub fn root_name(&self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::Subscription => "Subscription",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top-level query, mutation or subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Own required scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, ArgumentSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
}

impl OperationDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            scope: None,
            args: IndexMap::new(),
            resolver: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn arg(mut self, name: impl Into<String>, arg: ArgumentSpec) -> Self {
        self.args.insert(name.into(), arg);
        self
    }

    pub fn resolver(mut self, resolver: impl Into<String>) -> Self {
        self.resolver = Some(resolver.into());
        self
    }

    /// Field view of this operation on its root object
    pub fn as_field(&self) -> FieldSpec {
        FieldSpec {
            ty: self.ty.clone(),
            description: self.description.clone(),
            scope: self.scope.clone(),
            resolver: self.resolver.clone(),
            args: self.args.clone(),
            default_value: None,
        }
    }
}

/// A named schema: operations, types and sublists by registry reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Filled from the configuration key when loaded from a file
    #[serde(default)]
    pub name: String,

    /// Default required scope for everything in the schema
    #[serde(default)]
    pub scope: String,

    /// Middleware identifiers, passed through untouched
    #[serde(default)]
    pub middleware: Vec<String>,

    #[serde(default)]
    pub query: IndexMap<String, String>,

    #[serde(default)]
    pub mutation: IndexMap<String, String>,

    #[serde(default)]
    pub subscription: IndexMap<String, String>,

    /// Declared types; empty means the global type list applies
    #[serde(default)]
    pub types: IndexMap<String, String>,

    #[serde(default)]
    pub sublists: IndexMap<String, String>,
}

impl SchemaDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn middleware(mut self, middleware: impl Into<String>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    pub fn operation(mut self, kind: OperationKind, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.operations_mut(kind).insert(name.into(), reference.into());
        self
    }

    pub fn query(self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.operation(OperationKind::Query, name, reference)
    }

    pub fn mutation(self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.operation(OperationKind::Mutation, name, reference)
    }

    pub fn subscription(self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.operation(OperationKind::Subscription, name, reference)
    }

    pub fn ty(mut self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.types.insert(name.into(), reference.into());
        self
    }

    pub fn sublist(mut self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.sublists.insert(name.into(), reference.into());
        self
    }

    /// Declared operations of one class, name → reference
    pub fn operations(&self, kind: OperationKind) -> &IndexMap<String, String> {
        match kind {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
            OperationKind::Subscription => &self.subscription,
        }
    }

    fn operations_mut(&mut self, kind: OperationKind) -> &mut IndexMap<String, String> {
        match kind {
            OperationKind::Query => &mut self.query,
            OperationKind::Mutation => &mut self.mutation,
            OperationKind::Subscription => &mut self.subscription,
        }
    }

    /// Whether no operation of any class is declared
    pub fn has_no_operations(&self) -> bool {
        OperationKind::ALL
            .iter()
            .all(|kind| self.operations(*kind).is_empty())
    }
}
