//! Contract and exchange loading from files, strings, and HTTP URLs.
//!
//! The loader is the only place that knows about contract dialects. It
//! accepts a resolved contract document in JSON or YAML, with either the
//! older (`schema`, `formParameters`) or newer (`type`, `properties`) key
//! spelling, and hands the checker a normalized [`Api`] tree.

use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::contract::{Api, Body, Declarations, Resource, Response, SecurityScheme};
use crate::error::LoadError;
use crate::http::Exchange;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Verbs a resource may declare.
pub const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Document syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a file extension, falling back to sniffing.
    pub fn detect(path: Option<&Path>, content: &str) -> Self {
        let ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Format::Json,
            Some("yaml" | "yml" | "raml") => Format::Yaml,
            _ => Self::sniff(content),
        }
    }

    /// JSON documents start with `{` or `[`; everything else is read as YAML.
    pub fn sniff(content: &str) -> Self {
        match content.trim_start().chars().next() {
            Some('{' | '[') => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// Parse a document in the given format.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::InvalidYaml`.
pub fn parse_document<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, LoadError> {
    match format {
        Format::Json => serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source }),
        Format::Yaml => serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source }),
    }
}

/// Read a file, distinguishing a missing file from other IO failures.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` or `LoadError::ReadError`.
pub fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a contract from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, a parse
/// error if it isn't valid JSON/YAML, or `LoadError::InvalidContract` if
/// the tree cannot be normalized.
pub fn load_contract(path: &Path) -> Result<Api, LoadError> {
    let content = read_file(path)?;
    let mut api: Api = parse_document(&content, Format::detect(Some(path), &content))?;
    normalize(&mut api)?;
    debug!(path = %path.display(), resources = api.resources.len(), "contract loaded");
    Ok(api)
}

/// Load a contract from a JSON or YAML string.
///
/// # Errors
///
/// Returns a parse error or `LoadError::InvalidContract`.
pub fn load_contract_str(content: &str) -> Result<Api, LoadError> {
    let mut api: Api = parse_document(content, Format::sniff(content))?;
    normalize(&mut api)?;
    Ok(api)
}

/// Load a contract from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or a parse error
/// if the body isn't a valid contract.
#[cfg(feature = "remote")]
pub fn load_contract_url(url: &str) -> Result<Api, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let response = client.get(url).send().map_err(network)?;

    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network)?;
    let content = response.text().map_err(network)?;

    debug!(url, bytes = content.len(), "contract fetched");
    load_contract_str(&content)
}

/// Load from a URL or a file path, depending on what `source` looks like.
///
/// # Errors
///
/// See [`load_contract`] and `load_contract_url`.
pub fn load_contract_auto(source: &str) -> Result<Api, LoadError> {
    #[cfg(feature = "remote")]
    if is_url(source) {
        return load_contract_url(source);
    }
    load_contract(Path::new(source))
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load captured exchanges. A file holds either one exchange or a list.
///
/// # Errors
///
/// Returns an IO or parse error.
pub fn load_exchanges(path: &Path) -> Result<Vec<Exchange>, LoadError> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Exchange>),
        One(Box<Exchange>),
    }

    let content = read_file(path)?;
    let parsed: OneOrMany = parse_document(&content, Format::detect(Some(path), &content))?;
    Ok(match parsed {
        OneOrMany::Many(list) => list,
        OneOrMany::One(one) => vec![*one],
    })
}

/// Fill in what the document only implies: names from map keys, uppercase
/// verbs, required URI parameters, and named schema references.
///
/// # Errors
///
/// Returns `LoadError::InvalidContract` for a method key that is not an
/// HTTP verb.
pub fn normalize(api: &mut Api) -> Result<(), LoadError> {
    name_declarations(&mut api.base_uri_parameters, true);
    for (name, scheme) in api.security_schemes.iter_mut() {
        normalize_scheme(name, scheme);
    }

    let schemas = api.schemas.clone();
    for resource in &mut api.resources {
        normalize_resource(resource, &schemas)?;
    }
    Ok(())
}

fn normalize_scheme(name: &str, scheme: &mut SecurityScheme) {
    scheme.name = name.to_string();
    name_declarations(&mut scheme.described_by.headers, false);
    name_declarations(&mut scheme.described_by.query_parameters, false);
    for (code, response) in scheme.described_by.responses.iter_mut() {
        normalize_response(code, response, &IndexMap::new());
    }
}

fn normalize_resource(resource: &mut Resource, schemas: &IndexMap<String, String>) -> Result<(), LoadError> {
    name_declarations(&mut resource.uri_parameters, true);
    name_declarations(&mut resource.base_uri_parameters, true);

    for (key, method) in resource.methods.iter_mut() {
        let verb = key.to_ascii_uppercase();
        if !HTTP_METHODS.contains(&verb.as_str()) {
            return Err(LoadError::InvalidContract {
                message: format!("unknown method '{}' on resource '{}'", key, resource.relative_uri),
            });
        }
        method.verb = verb;
        name_declarations(&mut method.query_parameters, false);
        name_declarations(&mut method.headers, false);
        normalize_bodies(&mut method.body, schemas);
        for (code, response) in method.responses.iter_mut() {
            normalize_response(code, response, schemas);
        }
    }

    for child in &mut resource.resources {
        normalize_resource(child, schemas)?;
    }
    Ok(())
}

fn normalize_response(code: &str, response: &mut Response, schemas: &IndexMap<String, String>) {
    response.code = code.to_string();
    name_declarations(&mut response.headers, false);
    normalize_bodies(&mut response.body, schemas);
}

fn normalize_bodies(bodies: &mut IndexMap<String, Body>, schemas: &IndexMap<String, String>) {
    for (media_type, body) in bodies.iter_mut() {
        body.media_type = media_type.clone();
        name_declarations(&mut body.form_parameters, false);
        if let Some(named) = body.schema.as_deref().and_then(|s| schemas.get(s.trim())) {
            body.schema = Some(named.clone());
        }
    }
}

fn name_declarations(declarations: &mut Declarations, required_by_default: bool) {
    for (name, decl) in declarations.iter_mut() {
        decl.name = name.clone();
        if required_by_default && decl.required.is_none() {
            decl.required = Some(true);
        }
    }
}
