//! Violations and the report produced by a check.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::usage::Usage;

/// A single recorded non-conformance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Stable message key, e.g. `resource.undefined`.
    pub key: String,
    /// Rendered, human-readable message.
    pub message: String,
    /// Structured detail, e.g. the JSON pointer of a schema error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Value>,
}

impl Violation {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: Value) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Put a context prefix in front of the message, keeping key and cause.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.message = format!("{}: {}", prefix, self.message);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered violation collection. Insertion order is check order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Number of violations recorded under `key`.
    pub fn count_key(&self, key: &str) -> usize {
        self.0.iter().filter(|v| v.key == key).count()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.count_key(key) > 0
    }

    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.message.as_str()).collect()
    }

    /// Prefix every message with the same context.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self(self.0.into_iter().map(|v| v.prefixed(prefix)).collect())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Violation> for Violations {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Violation> for Violations {
    fn from(violation: Violation) -> Self {
        Self(vec![violation])
    }
}

/// Which list of a report a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Request,
    Response,
    Validation,
}

/// Where in the contract a violation was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Api,
    Resource {
        uri: String,
    },
    Action {
        verb: String,
        uri: String,
    },
    Response {
        verb: String,
        uri: String,
        code: String,
    },
    SecurityScheme {
        name: String,
    },
}

impl Locator {
    pub fn resource(uri: impl Into<String>) -> Self {
        Locator::Resource { uri: uri.into() }
    }

    pub fn action(verb: impl Into<String>, uri: impl Into<String>) -> Self {
        Locator::Action {
            verb: verb.into(),
            uri: uri.into(),
        }
    }

    pub fn response(verb: impl Into<String>, uri: impl Into<String>, code: impl Into<String>) -> Self {
        Locator::Response {
            verb: verb.into(),
            uri: uri.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Api => write!(f, "api"),
            Locator::Resource { uri } => write!(f, "resource({})", uri),
            Locator::Action { verb, uri } => write!(f, "action({} {})", verb, uri),
            Locator::Response { verb, uri, code } => {
                write!(f, "response({}) of action({} {})", code, verb, uri)
            }
            Locator::SecurityScheme { name } => write!(f, "securityScheme({})", name),
        }
    }
}

/// Outcome of one check: three independent violation lists plus the usage
/// recorded while checking.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub request: Violations,
    pub response: Violations,
    /// Findings about the contract itself, not about the traffic.
    pub validation: Violations,
    pub usage: Usage,
}

impl Report {
    /// True when the traffic conformed (contract findings are not counted).
    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty()
    }

    pub fn violations(&self, category: Category) -> &Violations {
        match category {
            Category::Request => &self.request,
            Category::Response => &self.response,
            Category::Validation => &self.validation,
        }
    }

    pub(crate) fn violations_mut(&mut self, category: Category) -> &mut Violations {
        match category {
            Category::Request => &mut self.request,
            Category::Response => &mut self.response,
            Category::Validation => &mut self.validation,
        }
    }

    /// Request, response and validation violations in that order.
    pub fn all(&self) -> impl Iterator<Item = &Violation> {
        self.request
            .iter()
            .chain(self.response.iter())
            .chain(self.validation.iter())
    }
}
