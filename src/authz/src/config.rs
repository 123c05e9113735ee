//! Engine configuration loading and validation

use crate::error::{AuthzError, Result};
use crate::schema::{OperationKind, Registry, SchemaDefinition, ScopeIssue};
use crate::scope::ScopeExpression;
use indexmap::IndexMap;
use scopeql_pagination::CursorCodec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Schema used when a request names none
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Global types, used by schemas that declare none
    #[serde(default)]
    pub types: IndexMap<String, String>,

    #[serde(default)]
    pub schemas: IndexMap<String, SchemaDefinition>,

    #[serde(default)]
    pub scopes: ScopesSection,

    #[serde(default)]
    pub cursor: CursorSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScopesSection {
    /// When false every operation and field is visible
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for ScopesSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache name, added to the tags of every entry
    #[serde(default = "default_cache_name")]
    pub name: String,

    /// Extra tags added to every entry
    #[serde(default)]
    pub tags: Vec<String>,

    /// Entry lifetime; 0 keeps entries until invalidated
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_cache_name(),
            tags: Vec::new(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CursorSection {
    /// Server secret the cursor key is derived from
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_cache_name() -> String {
    "graphql".to_string()
}

fn default_ttl_secs() -> u64 {
    600
}

/// Problem found by [`EngineConfig::lint`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    InvalidScope(ScopeIssue),
    MissingDefaultSchema(String),
    UnknownReference { location: String, reference: String },
    EmptySecret,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScope(issue) => write!(f, "{}", issue),
            Self::MissingDefaultSchema(name) => {
                write!(f, "default_schema: schema '{}' is not configured", name)
            }
            Self::UnknownReference { location, reference } => {
                write!(f, "{}: no factory registered for '{}'", location, reference)
            }
            Self::EmptySecret => write!(f, "cursor.secret: must not be empty"),
        }
    }
}

impl From<ConfigIssue> for AuthzError {
    fn from(issue: ConfigIssue) -> Self {
        match issue {
            ConfigIssue::InvalidScope(issue) => AuthzError::InvalidScopeFormat {
                expression: issue.expression,
                source: issue.error,
            },
            ConfigIssue::UnknownReference { reference, .. } => AuthzError::UnknownReference(reference),
            other => AuthzError::Config(other.to_string()),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: EngineConfig = toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse configuration: {}", e)))?;

        for (name, schema) in config.schemas.iter_mut() {
            schema.name = name.clone();
        }

        Ok(config)
    }

    /// Add a schema, keyed by its name
    pub fn with_schema(mut self, schema: SchemaDefinition) -> Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// Schema by name, or the default schema when `name` is `None`
    pub fn schema(&self, name: Option<&str>) -> Result<&SchemaDefinition> {
        let name = match name.or(self.default_schema.as_deref()) {
            Some(name) => name,
            None => return Err(AuthzError::SchemaNotFound("<default>".to_string())),
        };

        self.schemas
            .get(name)
            .ok_or_else(|| AuthzError::SchemaNotFound(name.to_string()))
    }

    /// Cursor codec keyed by `cursor.secret`
    pub fn cursor_codec(&self) -> Result<CursorCodec> {
        match self.cursor.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(CursorCodec::from_secret(secret)),
            _ => Err(AuthzError::Config("cursor.secret is not set".to_string())),
        }
    }

    /// Validate configuration, failing on the first issue
    pub fn validate(&self) -> Result<()> {
        match self.lint().into_iter().next() {
            Some(issue) => Err(issue.into()),
            None => Ok(()),
        }
    }

    /// Every issue found in the configuration itself
    pub fn lint(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if let Some(name) = &self.default_schema {
            if !self.schemas.contains_key(name) {
                issues.push(ConfigIssue::MissingDefaultSchema(name.clone()));
            }
        }

        for (name, schema) in &self.schemas {
            for error in ScopeExpression::lint(&schema.scope) {
                issues.push(ConfigIssue::InvalidScope(ScopeIssue {
                    location: format!("schemas.{}.scope", name),
                    expression: schema.scope.clone(),
                    error,
                }));
            }
        }

        if self.cursor.secret.as_deref() == Some("") {
            issues.push(ConfigIssue::EmptySecret);
        }

        issues
    }

    /// [`lint`](Self::lint) plus every reference missing from `registry` and
    /// every invalid scope inside registered definitions
    pub fn lint_with(&self, registry: &Registry) -> Vec<ConfigIssue> {
        let mut issues = self.lint();

        let mut check = |location: String, reference: &str| {
            if !registry.contains(reference) {
                issues.push(ConfigIssue::UnknownReference {
                    location,
                    reference: reference.to_string(),
                });
            }
        };

        for (name, reference) in &self.types {
            check(format!("types.{}", name), reference);
        }

        for (schema_name, schema) in &self.schemas {
            for kind in OperationKind::ALL {
                for (name, reference) in schema.operations(kind) {
                    check(format!("schemas.{}.{}.{}", schema_name, kind, name), reference);
                }
            }
            for (name, reference) in &schema.types {
                check(format!("schemas.{}.types.{}", schema_name, name), reference);
            }
            for (name, reference) in &schema.sublists {
                check(format!("schemas.{}.sublists.{}", schema_name, name), reference);
            }
        }

        issues.extend(registry.lint_scopes().into_iter().map(ConfigIssue::InvalidScope));
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeError;

    const SAMPLE: &str = r#"
default_schema = "default"

[types]
User = "types.user"

[schemas.default]
scope = "tenant=acme"
middleware = ["auth"]

[schemas.default.query]
users = "lists.users"

[schemas.admin]
scope = "role=admin"

[schemas.admin.mutation]
deleteUser = "mutations.delete_user"

[scopes]
enabled = true

[scopes.cache]
name = "scopeql"
tags = ["app"]
ttl_secs = 0

[cursor]
secret = "s3cret"
"#;

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.schemas.len(), 2);
        assert_eq!(config.schemas["admin"].name, "admin");
        assert_eq!(config.schema(None).unwrap().name, "default");
        assert_eq!(config.schema(Some("admin")).unwrap().mutation["deleteUser"], "mutations.delete_user");
        assert_eq!(config.scopes.cache.name, "scopeql");
        assert_eq!(config.scopes.cache.ttl(), None);
        assert!(config.cursor_codec().is_ok());
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert!(config.scopes.enabled);
        assert!(config.scopes.cache.enabled);
        assert_eq!(config.scopes.cache.ttl(), Some(Duration::from_secs(600)));
        assert!(matches!(config.schema(None), Err(AuthzError::SchemaNotFound(_))));
        assert!(config.cursor_codec().is_err());
    }

    #[test]
    fn test_lint_collects_every_issue() {
        let config = EngineConfig::from_toml_str(
            r#"
default_schema = "missing"

[schemas.a]
scope = "region=EU||role"

[cursor]
secret = ""
"#,
        )
        .unwrap();

        let issues = config.lint();
        assert_eq!(issues.len(), 4);
        assert_eq!(issues[0], ConfigIssue::MissingDefaultSchema("missing".to_string()));
        assert!(matches!(
            &issues[1],
            ConfigIssue::InvalidScope(ScopeIssue { error: ScopeError::EmptyClause(2), .. })
        ));
        assert!(matches!(
            &issues[2],
            ConfigIssue::InvalidScope(ScopeIssue { error: ScopeError::MissingAssignment(_), .. })
        ));
        assert_eq!(issues[3], ConfigIssue::EmptySecret);
    }

    #[test]
    fn test_validate_reports_invalid_scope() {
        let config = EngineConfig::default().with_schema(SchemaDefinition::new("s").scope("=x"));
        assert!(matches!(
            config.validate(),
            Err(AuthzError::InvalidScopeFormat { source: ScopeError::EmptyKey(_), .. })
        ));
    }

    #[test]
    fn test_lint_with_registry() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        let mut registry = Registry::new();
        registry.register_type("types.user", || crate::schema::TypeDefinition::object("User"));

        let issues = config.lint_with(&registry);
        let locations: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(issues.len(), 2, "{:?}", locations);
        assert!(locations[0].starts_with("schemas.default.query.users"));
        assert!(locations[1].starts_with("schemas.admin.mutation.deleteUser"));
    }
}
