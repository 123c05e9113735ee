//! Shared fixture: a small user directory schema

#![allow(dead_code)]

use scopeql_authz::config::EngineConfig;
use scopeql_authz::schema::{
    ArgumentSpec, FieldSpec, ListDefinition, OperationDefinition, Registry, SchemaDefinition,
    TypeDefinition, TypeRef,
};
use scopeql_authz::SchemaEngine;
use std::sync::Arc;

pub const STAFF: &str = "region=EU|role=staff";
pub const ADMIN: &str = "region=EU|role=admin";
pub const OUTSIDER: &str = "region=ASIA|role=admin";

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_type("User", || {
            TypeDefinition::object("User")
                .description("Directory user")
                .field("id", FieldSpec::new(TypeRef::non_null(TypeRef::named("ID"))))
                .field("name", FieldSpec::of("String"))
                .field("salary", FieldSpec::of("Int").scope("role=admin"))
                .field("department", FieldSpec::of("Department"))
        })
        .register_type("Department", || {
            TypeDefinition::object("Department")
                .scope("role=manager#admin")
                .field("name", FieldSpec::of("String"))
        })
        .register_list("Users", || {
            ListDefinition::new("users", "User")
                .order_option("NAME", "name")
                .filter("name", ArgumentSpec::new(TypeRef::named("String")))
        })
        .register_list("Departments", || {
            ListDefinition::new("departments", "Department")
                .order_option("NAME", "name")
                .without_default_filters()
        })
        .register_operation("Me", || {
            OperationDefinition::new("me", TypeRef::named("User")).resolver("user.me")
        })
        .register_operation("CreateUser", || {
            OperationDefinition::new("createUser", TypeRef::named("User"))
                .scope("role=admin")
                .arg("name", ArgumentSpec::new(TypeRef::non_null(TypeRef::named("String"))))
        })
        .register_operation("OnUserCreated", || {
            OperationDefinition::new("userCreated", TypeRef::named("User")).scope("role=admin")
        });
    registry
}

pub fn directory_schema() -> SchemaDefinition {
    SchemaDefinition::new("default")
        .scope("region=EU")
        .middleware("auth")
        .query("users", "Users")
        .query("me", "Me")
        .mutation("createUser", "CreateUser")
        .subscription("userCreated", "OnUserCreated")
        .ty("User", "User")
        .ty("Department", "Department")
        .sublist("departments", "Departments")
}

pub fn config() -> EngineConfig {
    let mut config = EngineConfig::default().with_schema(directory_schema());
    config.default_schema = Some("default".to_string());
    config.cursor.secret = Some("fixture-secret".to_string());
    config
}

pub fn engine() -> SchemaEngine {
    engine_with(config())
}

pub fn engine_with(config: EngineConfig) -> SchemaEngine {
    SchemaEngine::new(config, Arc::new(registry())).expect("fixture engine")
}
