//! Schema assembly tests: operation pruning, lazy type loading, synthetic
//! list types and per-request contexts

mod common;

use common::{config, directory_schema, engine, engine_with, registry, ADMIN, OUTSIDER, STAFF};
use scopeql_authz::schema::{ListDefinition, OperationKind, SchemaDefinition, TypeKind};
use scopeql_authz::{AuthzError, OperationSelection, SchemaEngine, TypeLoader};
use std::sync::Arc;

/// Directory schema plus an admin-only `payroll` list and a `fieldNotes` list
fn extended_engine() -> SchemaEngine {
    let mut registry = registry();
    registry
        .register_list("Payroll", || {
            ListDefinition::new("payroll", "User")
                .scope("role=admin")
                .order_option("SALARY", "salary")
        })
        .register_list("FieldNotes", || {
            ListDefinition::new("fieldNotes", "User").order_option("NAME", "name")
        });

    let config = config().with_schema(
        directory_schema()
            .query("payroll", "Payroll")
            .query("fieldNotes", "FieldNotes"),
    );
    SchemaEngine::new(config, Arc::new(registry)).unwrap()
}

fn field_names(ty: &scopeql_authz::TypeInstance) -> Vec<&str> {
    ty.fields.keys().map(String::as_str).collect()
}

// ============================================================================
// SCHEMA LOOKUP
// ============================================================================

#[test]
fn test_unknown_schema_is_an_error() {
    let engine = engine();
    let result = engine.assemble(Some("missing"), None, ADMIN);
    assert!(matches!(result, Err(AuthzError::SchemaNotFound(name)) if name == "missing"));
}

#[test]
fn test_default_schema_used_when_unnamed() {
    let engine = engine();
    let schema = engine.assemble(None, None, ADMIN).unwrap().unwrap();
    assert_eq!(schema.name, "default");
    assert_eq!(schema.middleware, vec!["auth".to_string()]);
}

#[test]
fn test_no_visible_operation_yields_no_schema() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, OUTSIDER).unwrap();
    assert!(schema.is_none(), "schema scope region=EU must hide everything");
}

// ============================================================================
// OPERATION PRUNING
// ============================================================================

#[test]
fn test_staff_sees_queries_only() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let query = schema.query.as_ref().expect("query root");
    assert_eq!(query.name, "Query");
    assert_eq!(query.operations.keys().collect::<Vec<_>>(), vec!["users", "me"]);
    assert!(schema.mutation.is_none());
    assert!(schema.subscription.is_none());
}

#[test]
fn test_admin_sees_every_class() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, ADMIN).unwrap().unwrap();

    assert!(schema.root(OperationKind::Query).unwrap().contains("me"));
    assert!(schema.root(OperationKind::Mutation).unwrap().contains("createUser"));
    assert_eq!(schema.root(OperationKind::Subscription).unwrap().name, "Subscription");
}

#[test]
fn test_selection_restricts_candidates() {
    let engine = engine();
    let selection = OperationSelection::new().query("me");
    let schema = engine
        .assemble(Some("default"), Some(&selection), ADMIN)
        .unwrap()
        .unwrap();

    let query = schema.query.as_ref().unwrap();
    assert_eq!(query.operations.len(), 1);
    assert!(query.contains("me"));
    assert!(schema.mutation.is_none(), "unselected classes are empty");
}

#[test]
fn test_selection_of_hidden_operation_yields_no_schema() {
    let engine = engine();
    let selection = OperationSelection::new().mutation("createUser");
    let schema = engine.assemble(Some("default"), Some(&selection), STAFF).unwrap();
    assert!(schema.is_none());
}

#[test]
fn test_empty_selection_means_everything() {
    let engine = engine();
    let selection = OperationSelection::new();
    let schema = engine
        .assemble(Some("default"), Some(&selection), ADMIN)
        .unwrap()
        .unwrap();
    assert_eq!(schema.query.as_ref().unwrap().operations.len(), 2);
}

#[test]
fn test_operations_carry_schema_names() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let users = &schema.query.as_ref().unwrap().operations["users"];
    assert_eq!(users.name, "users");
    assert_eq!(users.ty.to_string(), "UserList");
    let args: Vec<&str> = users.args.keys().map(String::as_str).collect();
    assert_eq!(args, vec!["skip", "take", "after", "order", "filters"]);

    let me = &schema.query.as_ref().unwrap().operations["me"];
    assert_eq!(me.resolver.as_deref(), Some("user.me"));
}

// ============================================================================
// FIELD VISIBILITY
// ============================================================================

#[test]
fn test_fields_filtered_by_scope() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let user = schema.load_type("User").unwrap();
    assert_eq!(field_names(&user), vec!["id", "name"]);
    assert_eq!(user.description.as_deref(), Some("Directory user"));
}

#[test]
fn test_admin_sees_every_field_in_order() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, ADMIN).unwrap().unwrap();

    let user = schema.load_type("User").unwrap();
    assert_eq!(field_names(&user), vec!["id", "name", "salary", "department"]);
}

#[test]
fn test_field_inherits_target_type_scope() {
    let engine = engine();
    let schema = engine
        .assemble(Some("default"), None, "region=EU|role=manager")
        .unwrap()
        .unwrap();

    let user = schema.load_type("User").unwrap();
    assert!(user.fields.contains_key("department"));
    assert!(!user.fields.contains_key("salary"));
}

#[test]
fn test_fields_fall_back_to_enclosing_type_scope() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let department = schema.load_type("Department").unwrap();
    assert!(department.fields.is_empty());
}

#[test]
fn test_scopes_disabled_shows_everything() {
    let mut config = config();
    config.scopes.enabled = false;
    let engine = engine_with(config);

    let schema = engine.assemble(Some("default"), None, OUTSIDER).unwrap().unwrap();
    assert!(schema.mutation.is_some());
    let user = schema.load_type("User").unwrap();
    assert_eq!(user.fields.len(), 4);
}

// ============================================================================
// TYPE LOADING
// ============================================================================

#[test]
fn test_unknown_type_not_found() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let err = schema.load_type("Nope").unwrap_err();
    assert!(matches!(err, AuthzError::TypeNotFound(ref name) if name == "Nope"));
    assert_eq!(err.to_string(), "Type Nope not found.");
}

#[test]
fn test_builtins_always_available() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();
    let loader = schema.type_loader();

    let info = loader.load_type("ListInfo").unwrap();
    assert_eq!(field_names(&info), vec!["total", "endCursor", "hasMore"]);

    let direction = loader.load_type("EnumsOrderDirection").unwrap();
    assert_eq!(direction.kind, TypeKind::Enum);
    assert!(direction.values.contains_key("ASC"));
    assert!(direction.values.contains_key("DESC"));

    assert_eq!(loader.load_type("String").unwrap().kind, TypeKind::Scalar);
}

#[test]
fn test_list_wrapper_type() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let list = schema.load_type("UserList").unwrap();
    assert_eq!(field_names(&list), vec!["items", "listInfo"]);
    assert_eq!(list.fields["items"].ty.to_string(), "[User]");

    assert!(matches!(
        schema.load_type("NopeList"),
        Err(AuthzError::TypeNotFound(_))
    ));
}

#[test]
fn test_synthetic_list_types_built_together() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();
    let context = schema.context();

    let order_field = schema.load_type("OrderFieldUsers").unwrap();
    assert_eq!(order_field.kind, TypeKind::Enum);
    assert!(order_field.values.contains_key("NAME"));

    assert!(context.is_loaded("OrderUsers"));
    assert!(context.is_loaded("FiltersUsers"));

    let order = schema.load_type("OrderUsers").unwrap();
    assert_eq!(order.kind, TypeKind::Input);
    assert_eq!(order.fields["field"].ty.to_string(), "OrderFieldUsers!");
    assert_eq!(order.fields["dir"].default_value, Some(serde_json::json!("ASC")));

    let filters = schema.load_type("FiltersUsers").unwrap();
    let names: Vec<&str> = filters.fields.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["id", "ids", "name"]);
}

#[test]
fn test_synthetic_types_of_sublists() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let order = schema.load_type("OrderDepartments").unwrap();
    assert_eq!(order.fields["field"].ty.to_string(), "OrderFieldDepartments!");
    assert!(matches!(
        schema.load_type("FiltersDepartments"),
        Err(AuthzError::TypeNotFound(_))
    ));
    assert!(matches!(
        schema.load_type("OrderFieldNobody"),
        Err(AuthzError::TypeNotFound(_))
    ));
}

#[test]
fn test_hidden_list_types_not_loadable() {
    let engine = extended_engine();

    let staff = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();
    assert!(!staff.query.as_ref().unwrap().contains("payroll"));
    for name in ["OrderFieldPayroll", "OrderPayroll", "FiltersPayroll"] {
        assert!(
            matches!(staff.load_type(name), Err(AuthzError::TypeNotFound(_))),
            "{} leaked to staff",
            name
        );
    }

    let admin = engine.assemble(Some("default"), None, ADMIN).unwrap().unwrap();
    let order_field = admin.load_type("OrderFieldPayroll").unwrap();
    assert!(order_field.values.contains_key("SALARY"));
}

#[test]
fn test_introspection_skips_hidden_lists() {
    let engine = extended_engine();
    let selection = OperationSelection::for_document("{ __schema { types { name } } }");
    let schema = engine
        .assemble(Some("default"), Some(&selection), STAFF)
        .unwrap()
        .unwrap();

    assert!(schema.context().is_loaded("OrderUsers"));
    assert!(!schema.context().is_loaded("OrderPayroll"));
}

#[test]
fn test_list_name_overlapping_a_prefix() {
    let engine = extended_engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    // `OrderFieldNotes` is the order input of `fieldNotes`, not an enum of `notes`
    let order = schema.load_type("OrderFieldNotes").unwrap();
    assert_eq!(order.kind, TypeKind::Input);
    assert_eq!(order.fields["field"].ty.to_string(), "OrderFieldFieldNotes!");

    let order_field = schema.load_type("OrderFieldFieldNotes").unwrap();
    assert_eq!(order_field.kind, TypeKind::Enum);
    assert!(order_field.values.contains_key("NAME"));
}

#[test]
fn test_instances_memoized_per_context() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();

    let first = schema.load_type("User").unwrap();
    let second = schema.type_loader().load_type("User").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_fresh_context_rebuilds_from_cache() {
    let engine = engine();

    let first = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();
    let user_first = first.load_type("User").unwrap();
    let computations = engine.stats().computations;

    let second = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();
    assert!(!second.context().is_loaded("User"));
    let user_second = second.load_type("User").unwrap();

    assert!(!Arc::ptr_eq(&user_first, &user_second));
    assert_eq!(user_first.fields, user_second.fields);
    assert_eq!(engine.stats().computations, computations, "second request served from cache");
}

#[test]
fn test_global_types_used_when_schema_declares_none() {
    let mut config = config();
    config.types.insert("User".to_string(), "User".to_string());
    config.types.insert("Department".to_string(), "Department".to_string());
    let config = config.with_schema(SchemaDefinition::new("lean").query("me", "Me"));
    let engine = engine_with(config);

    let schema = engine.assemble(Some("lean"), None, "role=admin").unwrap().unwrap();
    let user = schema.load_type("User").unwrap();
    assert_eq!(user.fields.len(), 4);
    assert_eq!(schema.context().declared_types().len(), 2);
}

// ============================================================================
// INTROSPECTION
// ============================================================================

#[test]
fn test_introspection_materializes_everything() {
    let engine = engine();
    let selection =
        OperationSelection::for_document("query IntrospectionQuery { __schema { types { name } } }");
    let schema = engine
        .assemble(Some("default"), Some(&selection), STAFF)
        .unwrap()
        .unwrap();
    let context = schema.context();

    for name in ["User", "Department", "UserList", "OrderFieldUsers", "OrderDepartments"] {
        assert!(context.is_loaded(name), "{} should be built", name);
    }
    assert!(schema.query.is_some(), "introspection alone selects no operation");
}

#[test]
fn test_lazy_by_default() {
    let engine = engine();
    let schema = engine.assemble(Some("default"), None, STAFF).unwrap().unwrap();
    assert_eq!(schema.context().instance_count(), 0);
}
