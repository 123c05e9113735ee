/// Scope expression type and validation
///
/// A scope expression maps keys to sets of allowed values and is written as
/// `key1=v1#v2|key2=v3`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Separator between clauses
pub const CLAUSE_SEPARATOR: char = '|';
/// Separator between a key and its values
pub const ASSIGNMENT: char = '=';
/// Separator between values of one key
pub const VALUE_SEPARATOR: char = '#';

/// Result type for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Problems reported by the strict parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// Empty clause between separators (1-based position)
    EmptyClause(usize),
    /// Clause without `=`
    MissingAssignment(String),
    /// Clause with nothing before `=`
    EmptyKey(String),
    /// Empty value in a key's value list
    EmptyValue(String),
    /// Same key declared by two clauses
    DuplicateKey(String),
    /// Leading or trailing whitespace around a key or value
    UnexpectedWhitespace(String),
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyClause(position) => write!(f, "Clause {} is empty", position),
            Self::MissingAssignment(clause) => {
                write!(f, "Clause '{}' has no '{}'", clause, ASSIGNMENT)
            }
            Self::EmptyKey(clause) => write!(f, "Clause '{}' has an empty key", clause),
            Self::EmptyValue(key) => write!(f, "Key '{}' has an empty value", key),
            Self::DuplicateKey(key) => write!(f, "Key '{}' is declared more than once", key),
            Self::UnexpectedWhitespace(token) => {
                write!(f, "'{}' has surrounding whitespace", token)
            }
        }
    }
}

impl std::error::Error for ScopeError {}

/// Parsed scope expression: key → set of allowed values
///
/// An empty expression places no restriction. Keys are combined with AND,
/// values of one key with OR (see [`is_authorized`](super::is_authorized)).
///
/// # Examples
///
/// ```
/// use scopeql_authz::scope::ScopeExpression;
///
/// let scope = ScopeExpression::parse("region=EU#US|role=admin");
/// assert_eq!(scope.len(), 2);
/// assert!(scope.allows("region", "US"));
/// assert_eq!(scope.to_string(), "region=EU#US|role=admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScopeExpression {
    clauses: BTreeMap<String, BTreeSet<String>>,
}

impl ScopeExpression {
    /// Expression with no restriction
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient parse used on requester scopes at request time
    ///
    /// Clauses without `=` or with an empty key are ignored. Empty value
    /// segments are dropped; a key left with no values keeps an empty set,
    /// which nothing can satisfy. A repeated key replaces the earlier clause.
    pub fn parse(expression: &str) -> Self {
        let mut clauses = BTreeMap::new();

        for clause in expression.split(CLAUSE_SEPARATOR) {
            let Some((key, values)) = clause.split_once(ASSIGNMENT) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }

            let values: BTreeSet<String> = values
                .split(VALUE_SEPARATOR)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();

            clauses.insert(key.to_string(), values);
        }

        Self { clauses }
    }

    /// Strict parse for configuration-time validation
    ///
    /// Returns the first problem [`lint`](Self::lint) would report.
    pub fn parse_strict(expression: &str) -> ScopeResult<Self> {
        match Self::lint(expression).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(Self::parse(expression)),
        }
    }

    /// Every problem in `expression`, in source order
    pub fn lint(expression: &str) -> Vec<ScopeError> {
        let mut problems = Vec::new();
        if expression.is_empty() {
            return problems;
        }

        let mut seen = BTreeSet::new();
        for (index, clause) in expression.split(CLAUSE_SEPARATOR).enumerate() {
            if clause.is_empty() {
                problems.push(ScopeError::EmptyClause(index + 1));
                continue;
            }

            let Some((key, values)) = clause.split_once(ASSIGNMENT) else {
                problems.push(ScopeError::MissingAssignment(clause.to_string()));
                continue;
            };

            if key.is_empty() {
                problems.push(ScopeError::EmptyKey(clause.to_string()));
                continue;
            }
            if key.trim() != key {
                problems.push(ScopeError::UnexpectedWhitespace(key.to_string()));
            }
            if !seen.insert(key) {
                problems.push(ScopeError::DuplicateKey(key.to_string()));
            }

            for value in values.split(VALUE_SEPARATOR) {
                if value.is_empty() {
                    problems.push(ScopeError::EmptyValue(key.to_string()));
                } else if value.trim() != value {
                    problems.push(ScopeError::UnexpectedWhitespace(value.to_string()));
                }
            }
        }

        problems
    }

    /// Builder: require `key` to be one of `values`
    pub fn with<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.clauses
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Whether this expression places no restriction
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.clauses.contains_key(key)
    }

    /// Allowed values of `key`
    pub fn values(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.clauses.get(key)
    }

    /// Whether `value` is among the values of `key`
    pub fn allows(&self, key: &str, value: &str) -> bool {
        self.clauses.get(key).is_some_and(|values| values.contains(value))
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.clauses.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys of `overlay` replace same-named keys of `self`
    pub fn merge_override(&self, overlay: &ScopeExpression) -> ScopeExpression {
        let mut clauses = self.clauses.clone();
        for (key, values) in &overlay.clauses {
            clauses.insert(key.clone(), values.clone());
        }
        Self { clauses }
    }
}

/// Canonical form: keys and values sorted
impl fmt::Display for ScopeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, values)) in self.clauses.iter().enumerate() {
            if index > 0 {
                write!(f, "{}", CLAUSE_SEPARATOR)?;
            }
            write!(f, "{}{}", key, ASSIGNMENT)?;
            for (position, value) in values.iter().enumerate() {
                if position > 0 {
                    write!(f, "{}", VALUE_SEPARATOR)?;
                }
                write!(f, "{}", value)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ScopeExpression {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_strict(s)
    }
}

impl Serialize for ScopeExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScopeExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
