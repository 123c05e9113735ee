//! List-query definitions and the synthetic types they generate
//!
//! A list named `users` over items of type `User` produces:
//!
//! - `UserList` wrapper with `items` and `listInfo`
//! - `OrderFieldUsers` enum mapping order labels to columns
//! - `OrderUsers` input (`field`, `dir` defaulting to `ASC`)
//! - `FiltersUsers` input, when the list has filters
//!
//! Every list starts with the `id` and `ids` filters over its unique column;
//! [`ListDefinition::without_default_filters`] drops them.

use super::builtins::{self, ucfirst, ORDER_DIRECTION};
use super::definition::{
    ArgumentSpec, FieldSpec, OperationDefinition, TypeDefinition, TypeKind, TypeRef,
};
use indexmap::IndexMap;
use scopeql_pagination::{
    Comparison, ListQuery, OrderDirection, OrderOptions, PaginationError, Predicate, QueryBuilder,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ORDER_FIELD_PREFIX: &str = "OrderField";
pub const ORDER_PREFIX: &str = "Order";
pub const FILTERS_PREFIX: &str = "Filters";

/// Synthetic prefixes, longest first
pub const SYNTHETIC_PREFIXES: [&str; 3] = [ORDER_FIELD_PREFIX, FILTERS_PREFIX, ORDER_PREFIX];

pub const ID_FILTER: &str = "id";
pub const IDS_FILTER: &str = "ids";

/// Candidate list suffixes of a synthetic type name, longest prefix first
///
/// `OrderFieldNotes` yields `Notes` (the order enum of `notes`) and then
/// `FieldNotes` (the order input of `fieldNotes`).
pub fn synthetic_suffixes(name: &str) -> impl Iterator<Item = &str> {
    SYNTHETIC_PREFIXES
        .iter()
        .filter_map(move |prefix| name.strip_prefix(prefix))
        .filter(|suffix| !suffix.is_empty())
}

fn default_filters() -> IndexMap<String, ArgumentSpec> {
    let mut filters = IndexMap::new();
    filters.insert(
        ID_FILTER.to_string(),
        ArgumentSpec::new(TypeRef::named("ID")).description("Filter by an ID"),
    );
    filters.insert(
        IDS_FILTER.to_string(),
        ArgumentSpec::new(TypeRef::list_of(TypeRef::named("ID"))).description("Filter by multiple ids"),
    );
    filters
}

/// Paginated list exposed as a query or as a sublist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDefinition {
    pub name: String,

    /// Item type name
    pub item: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default)]
    pub ordering: OrderOptions,

    #[serde(default = "default_filters")]
    pub filters: IndexMap<String, ArgumentSpec>,
}

impl ListDefinition {
    pub fn new(name: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item: item.into(),
            description: None,
            scope: None,
            ordering: OrderOptions::new(),
            filters: default_filters(),
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

    pub fn ordering(mut self, ordering: OrderOptions) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn order_option(mut self, label: impl Into<String>, column: impl Into<String>) -> Self {
        self.ordering = self.ordering.option(label, column);
        self
    }

    pub fn filter(mut self, name: impl Into<String>, arg: ArgumentSpec) -> Self {
        self.filters.insert(name.into(), arg);
        self
    }

    /// Drop the built-in `id` and `ids` filters
    pub fn without_default_filters(mut self) -> Self {
        self.filters.shift_remove(ID_FILTER);
        self.filters.shift_remove(IDS_FILTER);
        self
    }

    /// Suffix shared by the synthetic type names
    pub fn suffix(&self) -> String {
        ucfirst(&self.name)
    }

    pub fn order_field_type_name(&self) -> String {
        format!("{}{}", ORDER_FIELD_PREFIX, self.suffix())
    }

    pub fn order_type_name(&self) -> String {
        format!("{}{}", ORDER_PREFIX, self.suffix())
    }

    pub fn filters_type_name(&self) -> String {
        format!("{}{}", FILTERS_PREFIX, self.suffix())
    }

    pub fn list_type_name(&self) -> String {
        builtins::list_type_name(&self.item)
    }

    /// Whether `suffix` (a synthetic name minus its prefix) names this list
    pub fn matches_suffix(&self, suffix: &str) -> bool {
        self.suffix() == suffix
    }

    /// Every type this list generates
    pub fn synthetic_types(&self) -> Vec<TypeDefinition> {
        let mut types = vec![builtins::list_type(&self.item)];

        let mut order_field = TypeDefinition::new(self.order_field_type_name(), TypeKind::Enum);
        for (label, column) in self.ordering.iter() {
            order_field = order_field.value(label, column);
        }
        types.push(order_field.description("Field responsible for sorting the list"));

        types.push(
            TypeDefinition::input(self.order_type_name())
                .field(
                    "field",
                    FieldSpec::new(TypeRef::non_null(TypeRef::named(self.order_field_type_name())))
                        .description("Field to sort by"),
                )
                .field(
                    "dir",
                    FieldSpec::of(ORDER_DIRECTION)
                        .description("Sorting direction (ASC/DESC). Default is ASC")
                        .default_value(OrderDirection::Asc.as_str()),
                ),
        );

        if !self.filters.is_empty() {
            let mut filters = TypeDefinition::input(self.filters_type_name());
            for (name, arg) in &self.filters {
                let mut field = FieldSpec::new(arg.ty.clone());
                field.description = arg.description.clone();
                field.default_value = arg.default_value.clone();
                filters = filters.field(name.clone(), field);
            }
            types.push(filters);
        }

        types
    }

    /// Query operation serving this list
    pub fn operation(&self) -> OperationDefinition {
        let mut op = OperationDefinition::new(self.name.clone(), TypeRef::named(self.list_type_name()))
            .arg("skip", ArgumentSpec::new(TypeRef::named("Int")).description("Rows to skip"))
            .arg("take", ArgumentSpec::new(TypeRef::named("Int")).description("Rows to return"))
            .arg(
                "after",
                ArgumentSpec::new(TypeRef::named("String")).description("End cursor of the previous page"),
            )
            .arg(
                "order",
                ArgumentSpec::new(TypeRef::list_of(TypeRef::named(self.order_type_name())))
                    .description("Sorting list"),
            );

        if !self.filters.is_empty() {
            op = op.arg(
                "filters",
                ArgumentSpec::new(TypeRef::named(self.filters_type_name())).description("List filters"),
            );
        }

        op.description = self.description.clone();
        op.scope = self.scope.clone();
        op
    }

    /// Runtime list query over `Q`
    ///
    /// Handlers of the built-in `id` and `ids` filters are registered here;
    /// the caller registers every other declared filter.
    pub fn list_query<Q: QueryBuilder + 'static>(&self) -> ListQuery<Q> {
        let mut query = ListQuery::new(self.name.clone(), self.ordering.clone());
        let column = self.ordering.unique_column().to_string();

        if self.filters.contains_key(ID_FILTER) {
            let column = column.clone();
            query = query.filter(ID_FILTER, move |q: &mut Q, id: &Value| {
                q.add_where_group(Predicate::compare(column.as_str(), Comparison::Eq, id.clone()));
                Ok(())
            });
        }

        if self.filters.contains_key(IDS_FILTER) {
            query = query.filter(IDS_FILTER, move |q: &mut Q, ids: &Value| {
                let ids = ids
                    .as_array()
                    .ok_or_else(|| PaginationError::InvalidFilter(IDS_FILTER.to_string()))?;
                q.add_where_group(Predicate::Or(
                    ids.iter()
                        .map(|id| Predicate::compare(column.as_str(), Comparison::Eq, id.clone()))
                        .collect(),
                ));
                Ok(())
            });
        }

        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> ListDefinition {
        ListDefinition::new("users", "User")
            .order_option("NAME", "name")
            .filter("active", ArgumentSpec::new(TypeRef::named("Boolean")))
    }

    #[test]
    fn test_synthetic_names() {
        let list = users();
        let names: Vec<_> = list.synthetic_types().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["UserList", "OrderFieldUsers", "OrderUsers", "FiltersUsers"]);
    }

    #[test]
    fn test_order_types() {
        let types = users().synthetic_types();

        let order_field = &types[1];
        assert_eq!(order_field.kind, TypeKind::Enum);
        assert_eq!(order_field.values["ID"], "id");
        assert_eq!(order_field.values["NAME"], "name");

        let order = &types[2];
        assert_eq!(order.kind, TypeKind::Input);
        assert_eq!(order.fields["field"].ty.to_string(), "OrderFieldUsers!");
        assert_eq!(order.fields["dir"].default_value, Some("ASC".into()));
    }

    #[test]
    fn test_operation_args() {
        let op = users().operation();
        assert_eq!(op.ty.to_string(), "UserList");
        let args: Vec<_> = op.args.keys().map(String::as_str).collect();
        assert_eq!(args, vec!["skip", "take", "after", "order", "filters"]);

        let op = ListDefinition::new("posts", "Post").operation();
        assert!(op.args.contains_key("filters"));

        let op = ListDefinition::new("posts", "Post").without_default_filters().operation();
        assert!(!op.args.contains_key("filters"));
    }

    #[test]
    fn test_default_filters() {
        let types = ListDefinition::new("posts", "Post").synthetic_types();
        let filters = types.iter().find(|t| t.name == "FiltersPosts").unwrap();
        let names: Vec<_> = filters.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "ids"]);
        assert_eq!(filters.fields["id"].ty.to_string(), "ID");
        assert_eq!(filters.fields["ids"].ty.to_string(), "[ID]");

        let names: Vec<_> = users().filters.keys().cloned().collect();
        assert_eq!(names, vec!["id", "ids", "active"]);

        let bare = ListDefinition::new("posts", "Post").without_default_filters();
        assert!(bare.synthetic_types().iter().all(|t| t.name != "FiltersPosts"));
    }

    #[test]
    fn test_default_filters_survive_deserialization() {
        let list: ListDefinition =
            serde_json::from_value(serde_json::json!({"name": "posts", "item": "Post"})).unwrap();
        assert!(list.filters.contains_key("ids"));

        let list: ListDefinition = serde_json::from_value(
            serde_json::json!({"name": "posts", "item": "Post", "filters": {}}),
        )
        .unwrap();
        assert!(list.filters.is_empty());
    }

    #[test]
    fn test_synthetic_suffixes() {
        let suffixes = |name| synthetic_suffixes(name).collect::<Vec<_>>();
        assert_eq!(suffixes("OrderFieldUsers"), vec!["Users", "FieldUsers"]);
        assert_eq!(suffixes("OrderUsers"), vec!["Users"]);
        assert_eq!(suffixes("FiltersUsers"), vec!["Users"]);
        assert!(suffixes("Order").is_empty());
        assert!(suffixes("User").is_empty());
    }
}
