//! Contract linting - static analysis of a loaded contract.
//!
//! Validates the contract itself, independent of any traffic:
//! - resource templates and duplicate siblings
//! - media type keys, response codes and JSON schemas
//! - parameter constraints, examples and defaults
//! - security scheme references, kinds and required settings

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::contract::{Api, Body, Declarations, Method, Resource, SchemeKind, SecurityRef};
use crate::error::LoadError;
use crate::loader::load_contract;
use crate::media::MediaType;
use crate::messages::violation;
use crate::params::check_value;
use crate::pattern;
use crate::report::{Locator, Violation, Violations};
use crate::uri::UriTemplate;
use crate::validator::{check_json_schema, JsonSchemaValidator, SchemaValidator};

/// Grants that never redirect the user to an authorization endpoint.
const NON_INTERACTIVE_GRANTS: &[&str] = &["client_credentials", "password", "credentials", "owner"];

const KNOWN_GRANTS: &[&str] = &[
    "authorization_code",
    "implicit",
    "client_credentials",
    "password",
    "code",
    "token",
    "owner",
    "credentials",
];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Message key, e.g. `template.invalid`.
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    fn from_violation(v: Violation) -> Self {
        let severity = match v.key.as_str() {
            "example.invalid" | "default.invalid" => Severity::Warning,
            _ => Severity::Error,
        };
        Self {
            severity,
            code: v.key,
            message: v.message,
        }
    }

    pub fn to_violation(&self) -> Violation {
        Violation::new(self.code.clone(), self.message.clone())
    }
}

/// Result of linting one contract file.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub errors: usize,
    pub warnings: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl LintResult {
    /// Returns true if there are no errors. In strict mode warnings count too.
    pub fn is_ok(&self, strict: bool) -> bool {
        self.errors == 0 && (!strict || self.warnings == 0)
    }
}

/// Load and lint a contract file.
///
/// # Errors
///
/// Returns the load error when the file cannot be read or parsed.
pub fn lint_file(path: &Path) -> Result<LintResult, LoadError> {
    let api = load_contract(path)?;
    let diagnostics = lint(&api);
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    Ok(LintResult {
        path: path.to_path_buf(),
        errors,
        warnings: diagnostics.len() - errors,
        diagnostics,
    })
}

/// Lint a loaded contract.
pub fn lint(api: &Api) -> Vec<Diagnostic> {
    let mut found = Violations::new();

    check_declarations(&api.base_uri_parameters, "Base URI parameter", &Locator::Api, &mut found);

    for r in &api.secured_by {
        if let Some(name) = undefined_ref(api, r) {
            found.push(violation("securityScheme.global.undefined", &[&name]));
        }
    }
    for (name, scheme) in &api.security_schemes {
        let locator = Locator::SecurityScheme { name: name.clone() };
        check_scheme_settings(name, scheme.scheme_kind(), &scheme.kind, &scheme.settings, &mut found);
        check_declarations(&scheme.described_by.headers, "Header", &locator, &mut found);
        check_declarations(&scheme.described_by.query_parameters, "Query parameter", &locator, &mut found);
        for (code, response) in &scheme.described_by.responses {
            check_response_code(code, &locator, &mut found);
            check_declarations(&response.headers, "Header", &locator, &mut found);
        }
    }

    check_resources(api, &api.resources, "", &mut found);

    found.into_iter().map(Diagnostic::from_violation).collect()
}

/// Lint findings as violations, for a report's validation list.
pub fn lint_violations(api: &Api) -> Violations {
    lint(api).iter().map(Diagnostic::to_violation).collect()
}

fn undefined_ref(api: &Api, r: &SecurityRef) -> Option<String> {
    r.name
        .as_ref()
        .filter(|name| api.security_scheme(name).is_none())
        .cloned()
}

fn check_resources(api: &Api, resources: &[Resource], prefix: &str, found: &mut Violations) {
    for (i, resource) in resources.iter().enumerate() {
        let uri = format!("{}{}", prefix, resource.relative_uri);
        let locator = Locator::resource(uri.as_str());

        if !resource.relative_uri.starts_with('/') {
            found.push(violation("resource.uri.invalid", &[&uri]));
        }
        if let Err(e) = UriTemplate::parse(&resource.relative_uri) {
            found.push(violation("template.invalid", &[&uri, &e]));
        }
        let first = resources
            .iter()
            .position(|r| r.relative_uri == resource.relative_uri);
        if first.is_some_and(|first| first < i) {
            found.push(violation("resource.duplicate", &[&uri]));
        }

        check_declarations(&resource.uri_parameters, "URI parameter", &locator, found);
        check_declarations(&resource.base_uri_parameters, "Base URI parameter", &locator, found);
        check_refs(api, &resource.secured_by, &locator, found);

        for method in resource.methods.values() {
            check_method(api, method, &uri, found);
        }
        check_resources(api, &resource.resources, &uri, found);
    }
}

fn check_method(api: &Api, method: &Method, uri: &str, found: &mut Violations) {
    let locator = Locator::action(method.verb.as_str(), uri);
    check_refs(api, &method.secured_by, &locator, found);
    check_declarations(&method.query_parameters, "Query parameter", &locator, found);
    check_declarations(&method.headers, "Header", &locator, found);
    for body in method.body.values() {
        check_body(body, &locator, found);
    }
    for (code, response) in &method.responses {
        let response_locator = Locator::response(method.verb.as_str(), uri, code.as_str());
        check_response_code(code, &locator, found);
        check_declarations(&response.headers, "Header", &response_locator, found);
        for body in response.body.values() {
            check_body(body, &response_locator, found);
        }
    }
}

fn check_refs(api: &Api, refs: &[SecurityRef], locator: &Locator, found: &mut Violations) {
    for r in refs {
        if let Some(name) = undefined_ref(api, r) {
            found.push(violation("securityScheme.local.undefined", &[&name, locator]));
        }
    }
}

fn check_response_code(code: &str, locator: &Locator, found: &mut Violations) {
    let valid = code
        .parse::<u16>()
        .map(|c| (100..=599).contains(&c))
        .unwrap_or(false);
    if !valid {
        found.push(violation("responseCode.invalid", &[&code, locator]));
    }
}

fn check_body(body: &Body, locator: &Locator, found: &mut Violations) {
    let media_type = match MediaType::parse(&body.media_type) {
        Ok(mt) => mt,
        Err(e) => {
            found.push(violation("mediaType.illegal", &[&body.media_type, locator, &e]));
            return;
        }
    };
    if let Some(schema) = &body.schema {
        if JsonSchemaValidator.supports(&media_type) {
            if let Err(e) = check_json_schema(schema) {
                found.push(violation("schema.invalid", &[&body.media_type, locator, &e]));
            }
        }
    }
    check_declarations(&body.form_parameters, "Form parameter", locator, found);
}

fn check_declarations(declarations: &Declarations, label: &str, locator: &Locator, found: &mut Violations) {
    for decl in declarations.values() {
        let prefix = format!("{} '{}' on {}", label, decl.name, locator);

        if let Some(p) = &decl.pattern {
            if let Err(e) = pattern::translate(p) {
                found.push(violation("pattern.invalid", &[p, &e.message]).prefixed(&prefix));
            }
        }
        if let (Some(min), Some(max)) = (decl.minimum, decl.maximum) {
            if min > max {
                found.push(violation("range.invalid", &[&min, &max]).prefixed(&prefix));
            }
        }
        if let (Some(min), Some(max)) = (decl.min_length, decl.max_length) {
            if min > max {
                found.push(violation("length.invalid", &[&min, &max]).prefixed(&prefix));
            }
        }

        for (key, value) in [("example.invalid", &decl.example), ("default.invalid", &decl.default)] {
            if let Some(value) = value {
                let problems = check_value(decl, Some(value));
                if !problems.is_empty() {
                    let detail = problems.messages().join("; ");
                    found.push(violation(key, &[&detail]).prefixed(&prefix));
                }
            }
        }
    }
}

fn absolute_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:\S+$").expect("static regex"))
}

fn setting_present(settings: &indexmap::IndexMap<String, Value>, name: &str) -> bool {
    match settings.get(name) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn check_scheme_settings(
    name: &str,
    kind: SchemeKind,
    declared_kind: &str,
    settings: &indexmap::IndexMap<String, Value>,
    found: &mut Violations,
) {
    let required: Vec<&str> = match &kind {
        SchemeKind::Unknown(_) => {
            found.push(violation("securityScheme.type.invalid", &[&name, &declared_kind]));
            return;
        }
        SchemeKind::OAuth1 => vec!["requestTokenUri", "authorizationUri", "tokenCredentialsUri"],
        SchemeKind::OAuth2 => {
            let grants: Vec<&str> = match settings.get("authorizationGrants") {
                Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
                Some(Value::String(one)) => vec![one.as_str()],
                _ => Vec::new(),
            };
            for grant in &grants {
                if !KNOWN_GRANTS.contains(grant) && !absolute_uri_regex().is_match(grant) {
                    found.push(violation("securityScheme.grant.invalid", &[&name, grant]));
                }
            }
            let interactive = grants.is_empty()
                || grants.iter().any(|g| !NON_INTERACTIVE_GRANTS.contains(g));
            if interactive {
                vec!["accessTokenUri", "authorizationUri"]
            } else {
                vec!["accessTokenUri"]
            }
        }
        _ => Vec::new(),
    };

    for setting in required {
        if !setting_present(settings, setting) {
            found.push(violation("securityScheme.setting.missing", &[&name, &declared_kind, &setting]));
        }
    }
}
