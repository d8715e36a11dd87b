//! API Contract Conformance Checker
//!
//! Checks captured HTTP traffic against a declarative API contract.
//!
//! A contract is a tree of resources, methods, parameters, media types and
//! security schemes. Each [`ContractChecker::check`] call takes one request
//! (and optionally its response) and returns a [`Report`] with request,
//! response and contract-validation violations, plus the [`Usage`] of
//! contract elements exercised by that exchange.
//!
//! # Example
//!
//! ```
//! use api_conformance::{load_contract_str, ContractChecker, SimpleRequest};
//!
//! let api = load_contract_str(r#"{
//!     "resources": [{
//!         "relativeUri": "/users",
//!         "methods": {
//!             "get": {
//!                 "queryParameters": { "page": { "type": "integer", "maximum": 666 } }
//!             }
//!         }
//!     }]
//! }"#).unwrap();
//!
//! let checker = ContractChecker::new(api);
//! let report = checker.check_request(&SimpleRequest::get("/users?page=667")).unwrap();
//!
//! assert_eq!(report.request.len(), 1);
//! assert!(report.request.has_key("value.tooBig"));
//! ```
//!
//! # Violation keys
//!
//! Every violation carries a stable key such as `resource.undefined`,
//! `mediaType.ambiguous`, `integer.invalid` or `required.missing`. Tests
//! should assert on keys; rendered messages may change.
//!
//! # Security schemes
//!
//! A method secured by several schemes is checked once per scheme. Only the
//! schemes with the fewest violations are reported; when more than one
//! ties, each violation is prefixed with `Assuming security scheme '<name>'`.

mod checker;
mod config;
mod contract;
mod error;
mod http;
mod linter;
mod loader;
mod media;
mod messages;
mod params;
mod pattern;
mod report;
mod security;
mod uri;
mod usage;
mod validator;

pub use checker::ContractChecker;
pub use config::CheckerConfig;
pub use contract::{
    Api, Body, Declarations, DescribedBy, Method, ParamKind, Resource, Response, SchemeKind,
    SecurityRef, SecurityScheme, TypeDeclaration,
};
pub use error::{
    BodyIssue, CheckError, LoadError, MediaTypeError, PatternError, SchemaError, TemplateError,
};
pub use http::{
    parse_query, parse_urlencoded, percent_decode, split_url, Exchange, FormValue, HttpRequest,
    HttpResponse, ParamValue, SimpleRequest, SimpleResponse, UrlParts, Values,
    STANDARD_REQUEST_HEADERS, STANDARD_RESPONSE_HEADERS,
};
pub use linter::{lint, lint_file, lint_violations, Diagnostic, LintResult, Severity};
pub use loader::{
    is_url, load_contract, load_contract_auto, load_contract_str, load_exchanges, normalize,
    Format,
};
pub use media::{
    find_best, negotiate, parse_accept, AcceptEntry, BestMatch, MediaType, Negotiation,
};
pub use messages::render;
pub use params::{check_parameters, check_value, name_matches, FileContext, ParamContext, ParamOutcome};
pub use pattern::translate as translate_pattern;
pub use report::{Category, Locator, Report, Violation, Violations};
pub use security::{select as select_schemes, SchemeOutcome};
pub use uri::{resolve_resource, MatchResult, ResourceMatch, Unresolved, UriTemplate};
pub use usage::{ActionUsage, Coverage, Counters, ResourceUsage, ResponseUsage, SharedUsage, Usage};
pub use validator::{validate_against_schema, JsonSchemaValidator, SchemaValidator};

#[cfg(feature = "remote")]
pub use loader::load_contract_url;
