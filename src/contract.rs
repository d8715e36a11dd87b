//! The read-only contract tree checked against.
//!
//! The tree is built once by the loader and shared by every check. Resources
//! own their children; nothing points back up, so traversals that need the
//! ancestor chain carry it along themselves.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Named parameter declarations in declaration order.
pub type Declarations = IndexMap<String, TypeDeclaration>;

/// Root of a contract.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Api {
    pub title: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: Option<String>,
    pub base_uri: Option<String>,
    pub protocols: Vec<String>,
    pub base_uri_parameters: Declarations,
    pub secured_by: Vec<SecurityRef>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
    #[serde(deserialize_with = "schema_map")]
    pub schemas: IndexMap<String, String>,
    pub resources: Vec<Resource>,
}

impl Api {
    /// Look up a declared security scheme by name.
    pub fn security_scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.security_schemes.get(name)
    }

    /// Flatten the resource hierarchy into `(full uri, resource)` pairs,
    /// parents before children.
    pub fn resource_paths(&self) -> Vec<(String, &Resource)> {
        let mut out = Vec::new();
        for resource in &self.resources {
            collect_paths(resource, "", &mut out);
        }
        out
    }
}

fn collect_paths<'a>(resource: &'a Resource, prefix: &str, out: &mut Vec<(String, &'a Resource)>) {
    let uri = format!("{}{}", prefix, resource.relative_uri);
    out.push((uri.clone(), resource));
    for child in &resource.resources {
        collect_paths(child, &uri, out);
    }
}

/// A node in the URI hierarchy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    pub relative_uri: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub uri_parameters: Declarations,
    pub base_uri_parameters: Declarations,
    pub secured_by: Vec<SecurityRef>,
    /// Methods keyed by lowercase verb.
    pub methods: IndexMap<String, Method>,
    pub resources: Vec<Resource>,
}

impl Resource {
    /// Find the method for a verb, ignoring case.
    pub fn method(&self, verb: &str) -> Option<&Method> {
        self.methods
            .values()
            .find(|m| m.verb.eq_ignore_ascii_case(verb))
    }
}

/// An HTTP verb handler declared on a resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Method {
    /// Uppercase verb, filled in by the loader from the map key.
    #[serde(skip)]
    pub verb: String,
    pub description: Option<String>,
    pub protocols: Vec<String>,
    pub query_parameters: Declarations,
    pub headers: Declarations,
    pub body: IndexMap<String, Body>,
    pub responses: IndexMap<String, Response>,
    pub secured_by: Vec<SecurityRef>,
}

/// A body definition for one media type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    /// Media type key, filled in by the loader.
    #[serde(skip)]
    pub media_type: String,
    /// Schema text (JSON Schema, XSD, ...), already resolved from named schemas.
    #[serde(alias = "type", deserialize_with = "schema_text")]
    pub schema: Option<String>,
    #[serde(alias = "properties")]
    pub form_parameters: Declarations,
    #[serde(deserialize_with = "scalar_string")]
    pub example: Option<String>,
}

/// A declared response for one status code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Response {
    /// Status code key, filled in by the loader.
    #[serde(skip)]
    pub code: String,
    pub description: Option<String>,
    pub headers: Declarations,
    pub body: IndexMap<String, Body>,
}

/// Scalar type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Date,
    File,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Date => "date",
            ParamKind::File => "file",
        }
    }
}

/// A typed parameter declaration with its constraints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeDeclaration {
    /// Declared name, filled in by the loader from the map key. May contain
    /// a single `{?}` wildcard token.
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub repeat: bool,
    pub pattern: Option<String>,
    #[serde(rename = "enum", deserialize_with = "scalar_strings")]
    pub enum_values: Option<Vec<String>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    #[serde(deserialize_with = "scalar_string")]
    pub example: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub default: Option<String>,
}

impl TypeDeclaration {
    /// Create a declaration of the given kind with no constraints.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn has_range(&self) -> bool {
        self.minimum.is_some() || self.maximum.is_some()
    }
}

/// Reference to a security scheme from `securedBy`.
///
/// A `null` entry means the element may also be called unsecured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRef {
    pub name: Option<String>,
}

impl SecurityRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn unsecured() -> Self {
        Self { name: None }
    }

    /// Display name used in messages.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("null")
    }
}

impl<'de> Deserialize<'de> for SecurityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Unsecured(()),
            Name(String),
            Parameterized(IndexMap<String, Value>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Unsecured(()) => Ok(SecurityRef::unsecured()),
            Raw::Name(name) => Ok(SecurityRef::named(name)),
            Raw::Parameterized(map) => match map.keys().next() {
                Some(name) if map.len() == 1 => Ok(SecurityRef::named(name.clone())),
                _ => Err(serde::de::Error::custom(
                    "parameterized securedBy entry must have exactly one key",
                )),
            },
        }
    }
}

/// Kind of a security scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeKind {
    OAuth1,
    OAuth2,
    Basic,
    Digest,
    PassThrough,
    Custom(String),
    Unknown(String),
}

impl SchemeKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "OAuth 1.0" => SchemeKind::OAuth1,
            "OAuth 2.0" => SchemeKind::OAuth2,
            "Basic Authentication" => SchemeKind::Basic,
            "Digest Authentication" => SchemeKind::Digest,
            "Pass Through" => SchemeKind::PassThrough,
            other if other.starts_with("x-") => SchemeKind::Custom(other.to_string()),
            other => SchemeKind::Unknown(other.to_string()),
        }
    }
}

/// A named authentication mechanism.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityScheme {
    /// Scheme name, filled in by the loader from the map key.
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub settings: IndexMap<String, Value>,
    pub described_by: DescribedBy,
}

impl SecurityScheme {
    pub fn scheme_kind(&self) -> SchemeKind {
        SchemeKind::parse(&self.kind)
    }
}

/// Extra headers, query parameters and responses a scheme contributes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescribedBy {
    pub headers: Declarations,
    pub query_parameters: Declarations,
    pub responses: IndexMap<String, Response>,
}

/// Accept strings, numbers and booleans where the contract means a string.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    value.map(scalar_to_string).transpose().map_err(serde::de::Error::custom)
}

fn scalar_strings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    values
        .map(|vs| vs.into_iter().map(scalar_to_string).collect())
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn scalar_to_string(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected a scalar value, got {}", other)),
    }
}

/// Schemas may be given as text or inline as a JSON object.
fn schema_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(value_to_schema_text))
}

fn schema_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<IndexMap<String, String>, D::Error> {
    let map = IndexMap::<String, Value>::deserialize(deserializer)?;
    Ok(map
        .into_iter()
        .map(|(k, v)| (k, value_to_schema_text(v)))
        .collect())
}

fn value_to_schema_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secured_by_forms() {
        let refs: Vec<SecurityRef> =
            serde_json::from_value(json!([null, "basic", {"oauth": {"scopes": ["x"]}}])).unwrap();
        assert_eq!(refs[0], SecurityRef::unsecured());
        assert_eq!(refs[1], SecurityRef::named("basic"));
        assert_eq!(refs[2], SecurityRef::named("oauth"));
        assert_eq!(refs[0].label(), "null");
    }

    #[test]
    fn declaration_scalars_become_strings() {
        let decl: TypeDeclaration = serde_json::from_value(json!({
            "type": "integer",
            "enum": [1, 2],
            "example": 5,
            "maximum": 666
        }))
        .unwrap();
        assert_eq!(decl.kind, ParamKind::Integer);
        assert_eq!(decl.enum_values, Some(vec!["1".to_string(), "2".to_string()]));
        assert_eq!(decl.example.as_deref(), Some("5"));
        assert_eq!(decl.maximum, Some(666.0));
        assert!(!decl.is_required());
    }

    #[test]
    fn inline_schema_object_becomes_text() {
        let body: Body =
            serde_json::from_value(json!({"schema": {"type": "object"}})).unwrap();
        assert_eq!(body.schema.as_deref(), Some(r#"{"type":"object"}"#));
    }

    #[test]
    fn scheme_kinds() {
        assert_eq!(SchemeKind::parse("OAuth 2.0"), SchemeKind::OAuth2);
        assert_eq!(
            SchemeKind::parse("x-token"),
            SchemeKind::Custom("x-token".into())
        );
        assert_eq!(
            SchemeKind::parse("Kerberos"),
            SchemeKind::Unknown("Kerberos".into())
        );
    }

    #[test]
    fn resource_paths_are_full_uris() {
        let api: Api = serde_json::from_value(json!({
            "resources": [
                {"relativeUri": "/users", "resources": [{"relativeUri": "/{id}"}]}
            ]
        }))
        .unwrap();
        let paths: Vec<String> = api.resource_paths().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["/users", "/users/{id}"]);
    }
}
