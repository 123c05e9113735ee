//! Types every schema can reference without declaring them

use super::definition::{FieldSpec, TypeDefinition, TypeRef};
use scopeql_pagination::OrderDirection;

pub const LIST_INFO: &str = "ListInfo";
pub const ORDER_DIRECTION: &str = "EnumsOrderDirection";
pub const LIST_SUFFIX: &str = "List";

/// Scalars understood by the execution engine; `Password` is a string that
/// resolvers never echo back
pub const SCALARS: [&str; 6] = ["Int", "Float", "String", "Boolean", "ID", "Password"];

/// `listInfo` of a paginated list
pub fn list_info() -> TypeDefinition {
    TypeDefinition::object(LIST_INFO)
        .description("Pagination metadata of a list")
        .field("total", FieldSpec::of("Int").description("Rows matching the filters"))
        .field(
            "endCursor",
            FieldSpec::of("String").description("Cursor of the last returned row"),
        )
        .field(
            "hasMore",
            FieldSpec::of("Boolean").description("Whether rows remain after this page"),
        )
}

pub fn order_direction() -> TypeDefinition {
    TypeDefinition::enumeration(
        ORDER_DIRECTION,
        [OrderDirection::Asc.as_str(), OrderDirection::Desc.as_str()],
    )
    .description("Sorting direction")
}

/// Name of the list wrapper type for `item`
pub fn list_type_name(item: &str) -> String {
    format!("{}{}", ucfirst(item), LIST_SUFFIX)
}

/// `<Item>List`: `items` plus `listInfo`
pub fn list_type(item: &str) -> TypeDefinition {
    TypeDefinition::object(list_type_name(item))
        .field("items", FieldSpec::new(TypeRef::list_of(TypeRef::named(item))))
        .field("listInfo", FieldSpec::of(LIST_INFO))
}

/// Built-in type by name; list wrappers are not included
pub fn builtin(name: &str) -> Option<TypeDefinition> {
    match name {
        LIST_INFO => Some(list_info()),
        ORDER_DIRECTION => Some(order_direction()),
        _ if SCALARS.contains(&name) => Some(TypeDefinition::scalar(name)),
        _ => None,
    }
}

/// Upper-case the first character
pub fn ucfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
