//! The conformance check driver.
//!
//! A check walks one request (and optionally its response) through the
//! contract: base URI, resource, action, URI parameters, then the request
//! and response checks once per security scheme candidate, then content
//! negotiation. Each stage returns its violations; the driver decides
//! whether to keep going.

use indexmap::{IndexMap, IndexSet};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::CheckerConfig;
use crate::contract::{Api, Body, Declarations, Method, Response};
use crate::error::{BodyIssue, CheckError};
use crate::http::{
    percent_decode, split_url, FormValue, HttpRequest, HttpResponse, Values,
    STANDARD_REQUEST_HEADERS, STANDARD_RESPONSE_HEADERS,
};
use crate::linter::lint_violations;
use crate::media::{decode_content, find_best, negotiate, parse_accept, BestMatch, MediaType, Negotiation};
use crate::messages::violation;
use crate::params::{check_parameters, check_value, FileContext, ParamContext};
use crate::report::{Category, Locator, Report, Violation, Violations};
use crate::security::{applicable_refs, candidates, select, SchemeCandidate, SchemeOutcome};
use crate::uri::{resolve_resource, ResourceMatch, Unresolved, UriTemplate};
use crate::usage::{touch, Usage};
use crate::validator::{JsonSchemaValidator, SchemaValidator};

/// Checks traffic against one contract.
///
/// The checker is immutable after construction and can be shared by
/// reference across threads; every [`check`](Self::check) builds its own
/// report.
pub struct ContractChecker {
    api: Api,
    config: CheckerConfig,
    validators: Vec<Box<dyn SchemaValidator>>,
    contract_violations: Violations,
    zero_usage: Usage,
}

impl std::fmt::Debug for ContractChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractChecker")
            .field("api", &self.api.title)
            .field("config", &self.config)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Why a check stopped early.
enum Abort {
    /// Resolution failed; the report is complete as it stands.
    Structural,
    FailFast,
}

/// Report under construction.
struct Run {
    report: Report,
    fail_fast: bool,
}

impl Run {
    fn record(&mut self, category: Category, violations: Violations) -> Result<(), Abort> {
        if violations.is_empty() {
            return Ok(());
        }
        if self.fail_fast {
            if let Some(first) = violations.into_iter().next() {
                self.report.violations_mut(category).push(first);
            }
            return Err(Abort::FailFast);
        }
        self.report.violations_mut(category).extend(violations);
        Ok(())
    }

    fn abort(&mut self, category: Category, v: Violation) -> Abort {
        self.report.violations_mut(category).push(v);
        if self.fail_fast {
            Abort::FailFast
        } else {
            Abort::Structural
        }
    }
}

/// Declared names a scheme run used, before usage is recorded.
#[derive(Debug, Default)]
struct Touched {
    query: IndexSet<String>,
    headers: IndexSet<String>,
    form: IndexSet<String>,
    response_headers: IndexSet<String>,
}

/// A message body as the body check sees it.
struct Message<'m> {
    content_type: Option<String>,
    content: &'m [u8],
    form: Option<Values<FormValue>>,
}

impl ContractChecker {
    /// Checker with the default configuration.
    pub fn new(api: Api) -> Self {
        Self::with_config(api, CheckerConfig::default())
    }

    pub fn with_config(api: Api, config: CheckerConfig) -> Self {
        let contract_violations = if config.validate_contract {
            lint_violations(&api)
        } else {
            Violations::new()
        };
        if !contract_violations.is_empty() {
            warn!(count = contract_violations.len(), "contract has validation findings");
        }
        let zero_usage = Usage::from_contract(&api);
        Self {
            api,
            config,
            validators: vec![Box::new(JsonSchemaValidator)],
            contract_violations,
            zero_usage,
        }
    }

    /// Add a body schema validator. Later validators are consulted after
    /// the built-in JSON one.
    pub fn with_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Findings about the contract itself, attached to every report.
    pub fn contract_violations(&self) -> &Violations {
        &self.contract_violations
    }

    /// All-zero usage for this contract, the starting point for
    /// aggregating usage across checks.
    pub fn empty_usage(&self) -> Usage {
        self.zero_usage.clone()
    }

    /// Check a request without a response.
    ///
    /// # Errors
    ///
    /// See [`check`](Self::check).
    pub fn check_request(&self, request: &dyn HttpRequest) -> Result<Report, CheckError> {
        self.check(request, None)
    }

    /// Check a request and its optional response.
    ///
    /// Non-conformance is reported in the returned [`Report`].
    ///
    /// # Errors
    ///
    /// Returns `CheckError::FailFast` with the partial report when fail-fast
    /// mode is on and a violation was found.
    pub fn check(
        &self,
        request: &dyn HttpRequest,
        response: Option<&dyn HttpResponse>,
    ) -> Result<Report, CheckError> {
        let mut run = Run {
            report: Report {
                validation: self.contract_violations.clone(),
                usage: self.zero_usage.clone(),
                ..Default::default()
            },
            fail_fast: self.config.fail_fast,
        };

        match self.run(&mut run, request, response) {
            Ok(()) | Err(Abort::Structural) => Ok(run.report),
            Err(Abort::FailFast) => Err(CheckError::FailFast {
                report: Box::new(run.report),
            }),
        }
    }

    fn run(
        &self,
        run: &mut Run,
        request: &dyn HttpRequest,
        response: Option<&dyn HttpResponse>,
    ) -> Result<(), Abort> {
        let url = request.request_url();
        let parts = split_url(url);

        let (path, base_variables) = self.match_base_uri(run, url, parts.scheme.is_some(), parts.path)?;

        let matched = match resolve_resource(&self.api.resources, &path) {
            Ok(m) => m,
            Err(Unresolved::Undefined) => {
                return Err(run.abort(Category::Request, violation("resource.undefined", &[&path])));
            }
            Err(Unresolved::Ambiguous(uris)) => {
                let v = violation("resource.ambiguous", &[&path, &uris.join(", ")]);
                return Err(run.abort(Category::Request, v));
            }
        };
        if let Some(r) = run.report.usage.resource_mut(&matched.uri) {
            r.uses += 1;
        }

        let verb = request.method().to_ascii_uppercase();
        let Some(method) = matched.resource.method(&verb) else {
            let v = violation("action.undefined", &[&verb, &Locator::resource(matched.uri.as_str())]);
            return Err(run.abort(Category::Request, v));
        };
        if let Some(a) = run.report.usage.action_mut(&matched.uri, &verb) {
            a.uses += 1;
        }
        let action = Locator::action(verb.as_str(), matched.uri.as_str());
        debug!(%action, "action resolved");

        if let Some(scheme) = &parts.scheme {
            run.record(Category::Request, self.check_protocol(scheme, method, &action))?;
        }
        run.record(Category::Request, self.check_uri_parameters(&matched))?;
        run.record(Category::Request, self.check_base_uri_parameters(&matched, &base_variables))?;

        let refs = applicable_refs(&self.api, method, matched.chain());
        let mut outcomes = Vec::new();
        let mut touched = Touched::default();
        for candidate in candidates(&self.api, refs) {
            let mut outcome = SchemeOutcome::new(candidate.label.clone());
            outcome.request = self.check_request_in(request, method, &candidate, &action, &mut touched);
            if let Some(response) = response {
                outcome.response =
                    self.check_response_in(response, method, &candidate, &matched.uri, &mut touched);
            }
            outcomes.push(outcome);
        }
        let (request_violations, response_violations) = select(outcomes);

        self.record_usage(&mut run.report.usage, &matched.uri, &verb, method, response, &touched);
        run.record(Category::Request, request_violations)?;
        run.record(Category::Response, response_violations)?;

        if let Some(response) = response {
            let (request_side, response_side) = self.check_negotiation(request, response, method, &matched.uri);
            run.record(Category::Request, request_side)?;
            run.record(Category::Response, response_side)?;
        }
        Ok(())
    }

    /// Strip the base URI from the request URL. Returns the resource path
    /// and the base URI variables.
    fn match_base_uri(
        &self,
        run: &mut Run,
        url: &str,
        absolute: bool,
        path: &str,
    ) -> Result<(String, Vec<(String, String)>), Abort> {
        let Some(base) = self.config.base_uri.as_deref().or(self.api.base_uri.as_deref()) else {
            return Ok((path.to_string(), Vec::new()));
        };
        let base = base.trim_end_matches('/');
        let (base_template, target) = if absolute {
            (base, split_url(url).without_query)
        } else {
            (base_path(base), path)
        };
        if base_template.is_empty() {
            return Ok((path.to_string(), Vec::new()));
        }

        let template = match UriTemplate::parse(base_template) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "ignoring unparsable base URI");
                return Ok((path.to_string(), Vec::new()));
            }
        };
        let m = template.best_match(target);
        if !m.matched || !m.has_boundary() {
            let v = violation("baseUri.unmatched", &[&url, &base]);
            return Err(run.abort(Category::Request, v));
        }
        let rest = if m.suffix.is_empty() { "/".to_string() } else { m.suffix };
        Ok((rest, m.variables))
    }

    fn check_protocol(&self, scheme: &str, method: &Method, action: &Locator) -> Violations {
        let declared = if method.protocols.is_empty() {
            &self.api.protocols
        } else {
            &method.protocols
        };
        if declared.is_empty() || declared.iter().any(|p| p.eq_ignore_ascii_case(scheme)) {
            Violations::new()
        } else {
            violation("protocol.undefined", &[&scheme.to_ascii_uppercase(), action]).into()
        }
    }

    /// Validate template variables, looking each name up from the resource
    /// outwards.
    fn check_uri_parameters(&self, matched: &ResourceMatch<'_>) -> Violations {
        let locator = Locator::resource(matched.uri.as_str());
        let mut out = Violations::new();
        for (name, raw) in &matched.variables {
            let Some(decl) = matched.chain().find_map(|r| r.uri_parameters.get(name)) else {
                continue;
            };
            let value = percent_decode(raw);
            let prefix = format!("URI parameter '{}' on {}", name, locator);
            out.extend(check_value(decl, Some(&value)).prefixed(&prefix));
        }
        out
    }

    fn check_base_uri_parameters(&self, matched: &ResourceMatch<'_>, variables: &[(String, String)]) -> Violations {
        let mut out = Violations::new();
        for (name, raw) in variables {
            let decl = matched
                .chain()
                .find_map(|r| r.base_uri_parameters.get(name))
                .or_else(|| self.api.base_uri_parameters.get(name));
            let value = percent_decode(raw);
            match (decl, &self.api.version) {
                (Some(decl), _) => {
                    let prefix = format!("Base URI parameter '{}' on {}", name, Locator::Api);
                    out.extend(check_value(decl, Some(&value)).prefixed(&prefix));
                }
                (None, Some(version)) if name == "version" && value != *version => {
                    out.push(violation("baseUri.version.mismatch", &[&value, version]));
                }
                _ => {}
            }
        }
        out
    }

    fn check_request_in(
        &self,
        request: &dyn HttpRequest,
        method: &Method,
        candidate: &SchemeCandidate<'_>,
        action: &Locator,
        touched: &mut Touched,
    ) -> Violations {
        let mut out = Violations::new();

        let declared = candidate.query_parameters(&method.query_parameters);
        let ctx = ParamContext::new("Query parameter", action);
        let query = check_parameters(&declared, &request.query_values(), &ctx);
        out.extend(query.violations);
        for name in query.undeclared {
            out.push(violation("queryParam.undefined", &[&name, action]));
        }
        touched.query.extend(query.used);

        let declared = candidate.headers(&method.headers);
        let ctx = ParamContext::new("Header", action).case_insensitive();
        let headers = check_parameters(&declared, &request.header_values(), &ctx);
        out.extend(headers.violations);
        for name in headers.undeclared {
            let implicit_auth = candidate.scheme.is_some() && name.eq_ignore_ascii_case("authorization");
            if !implicit_auth
                && !self.header_ignored(&name, STANDARD_REQUEST_HEADERS, &self.config.ignored_request_headers)
            {
                out.push(violation("headerParam.undefined", &[&name, action]));
            }
        }
        touched.headers.extend(headers.used);

        let content = request.content();
        if method.body.is_empty() {
            if !content.is_empty() {
                out.push(violation("body.superfluous", &[action]));
            }
            return out;
        }
        let message = Message {
            content_type: request.content_type(),
            content,
            form: Some(request.form_values()),
        };
        out.extend(self.check_body(&method.body, &message, action, &mut touched.form));
        out
    }

    fn check_response_in(
        &self,
        response: &dyn HttpResponse,
        method: &Method,
        candidate: &SchemeCandidate<'_>,
        uri: &str,
        touched: &mut Touched,
    ) -> Violations {
        let code = response.status().to_string();
        let Some(declared) = candidate.response(method, &code) else {
            return violation("responseCode.undefined", &[&code, &Locator::action(method.verb.as_str(), uri)]).into();
        };
        let locator = Locator::response(method.verb.as_str(), uri, code.as_str());
        let mut out = Violations::new();

        let headers_declared = candidate.response_headers(declared, &code);
        let ctx = ParamContext::new("Header", &locator).case_insensitive();
        let headers = check_parameters(&headers_declared, &response.header_values(), &ctx);
        out.extend(headers.violations);
        for name in headers.undeclared {
            if !self.header_ignored(&name, STANDARD_RESPONSE_HEADERS, &self.config.ignored_response_headers) {
                out.push(violation("responseHeader.undefined", &[&name, &locator]));
            }
        }
        touched.response_headers.extend(headers.used);

        let content = response.content();
        if declared.body.is_empty() {
            if !content.is_empty() {
                out.push(violation("body.superfluous", &[&locator]));
            }
            return out;
        }
        let message = Message {
            content_type: response.content_type(),
            content,
            form: None,
        };
        let mut unused_form = IndexSet::new();
        out.extend(self.check_body(&declared.body, &message, &locator, &mut unused_form));
        out
    }

    fn header_ignored(&self, name: &str, standard: &[&str], configured: &[String]) -> bool {
        let lower = name.to_ascii_lowercase();
        standard.contains(&lower.as_str())
            || configured.iter().any(|c| c.eq_ignore_ascii_case(name))
            || (self.config.ignore_x_headers && lower.starts_with("x-"))
    }

    /// Pick the declared body for the message and validate its content.
    fn check_body(
        &self,
        bodies: &IndexMap<String, Body>,
        message: &Message<'_>,
        locator: &Locator,
        used_form: &mut IndexSet<String>,
    ) -> Violations {
        let Some(content_type) = &message.content_type else {
            let schemaless = bodies.values().any(|b| b.schema.is_none());
            if !message.content.is_empty() || !schemaless {
                return violation("contentType.missing", &[locator]).into();
            }
            return Violations::new();
        };
        let media_type = match MediaType::parse(content_type) {
            Ok(mt) => mt,
            Err(e) => return violation("mediaType.illegal", &[content_type, locator, &e]).into(),
        };
        let body = match find_best(&media_type, bodies.iter().map(|(k, b)| (k.as_str(), b))) {
            BestMatch::Found(body) => body,
            BestMatch::Undefined => return violation("mediaType.undefined", &[content_type, locator]).into(),
            BestMatch::Ambiguous(keys) => {
                return violation("mediaType.ambiguous", &[content_type, locator, &keys.join(", ")]).into();
            }
        };

        match &message.form {
            Some(form) if media_type.is_form() => {
                self.check_form(&body.form_parameters, form, &media_type, locator, used_form)
            }
            _ => self.check_content(body, &media_type, message.content, locator),
        }
    }

    fn check_form(
        &self,
        declared: &Declarations,
        form: &Values<FormValue>,
        media_type: &MediaType,
        locator: &Locator,
        used_form: &mut IndexSet<String>,
    ) -> Violations {
        let files = if media_type.is_multipart_form() {
            FileContext::Allowed
        } else {
            FileContext::NotAllowed
        };
        let ctx = ParamContext::new("Form parameter", locator).files(files);
        let outcome = check_parameters(declared, form, &ctx);
        let mut out = outcome.violations;
        if !declared.is_empty() {
            for name in outcome.undeclared {
                out.push(violation("formParam.undefined", &[&name, locator]));
            }
        }
        used_form.extend(outcome.used);
        out
    }

    fn check_content(&self, body: &Body, media_type: &MediaType, content: &[u8], locator: &Locator) -> Violations {
        let text = match decode_content(content, media_type) {
            Ok(text) => text,
            Err(charset) => return violation("charset.invalid", &[&charset, locator]).into(),
        };
        let Some(schema) = &body.schema else {
            return Violations::new();
        };
        if text.trim().is_empty() {
            return Violations::new();
        }
        let Some(validator) = self.validators.iter().find(|v| v.supports(media_type)) else {
            warn!(media_type = %body.media_type, "no schema validator for media type");
            return Violations::new();
        };

        match validator.validate(&text, schema) {
            Ok(()) => Violations::new(),
            Err(BodyIssue::InvalidContent(e)) => {
                violation("body.invalid", &[locator, &body.media_type, &e]).into()
            }
            Err(BodyIssue::InvalidSchema(e)) => {
                violation("schema.invalid", &[&body.media_type, locator, &e]).into()
            }
            Err(BodyIssue::Mismatch(errors)) => errors
                .into_iter()
                .map(|e| {
                    violation("schema.mismatch", &[locator, &body.media_type, &e])
                        .with_cause(json!({ "path": e.path, "message": e.message }))
                })
                .collect(),
        }
    }

    /// Compare the response media type with the request's Accept header.
    /// Returns request-side and response-side violations.
    fn check_negotiation(
        &self,
        request: &dyn HttpRequest,
        response: &dyn HttpResponse,
        method: &Method,
        uri: &str,
    ) -> (Violations, Violations) {
        let none = (Violations::new(), Violations::new());
        let code = response.status().to_string();
        let Some(declared) = method.responses.get(&code) else {
            return none;
        };
        if declared.body.is_empty() {
            return none;
        }
        let headers = request.header_values();
        let accept_values = headers.get_ignore_case("accept");
        if accept_values.is_empty() {
            return none;
        }
        let accept_header = accept_values
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let Some(actual) = response.content_type().and_then(|ct| MediaType::parse(&ct).ok()) else {
            return none;
        };

        let action = Locator::action(method.verb.as_str(), uri);
        let accept = match parse_accept(&accept_header) {
            Ok(accept) => accept,
            Err(e) => {
                let v = violation("mediaType.illegal", &[&accept_header, &action, &e]);
                return (v.into(), Violations::new());
            }
        };
        let declared_types = declared_media_types(declared);
        let locator = Locator::response(method.verb.as_str(), uri, code.as_str());
        let response_side = match negotiate(&accept, &declared_types, &actual) {
            Negotiation::Acceptable => Violations::new(),
            Negotiation::NotAccepted => {
                violation("contentType.mismatch", &[&actual, &locator, &accept_header]).into()
            }
            Negotiation::Better(better) => violation("mediaType.better", &[&actual, &locator, &better]).into(),
        };
        (Violations::new(), response_side)
    }

    fn record_usage(
        &self,
        usage: &mut Usage,
        uri: &str,
        verb: &str,
        method: &Method,
        response: Option<&dyn HttpResponse>,
        touched: &Touched,
    ) {
        let Some(action) = usage.action_mut(uri, verb) else {
            return;
        };
        for name in &touched.query {
            touch(&mut action.query_parameters, name);
        }
        for name in &touched.headers {
            touch(&mut action.request_headers, name);
        }
        for name in &touched.form {
            touch(&mut action.form_parameters, name);
        }
        let Some(response) = response else {
            return;
        };
        let code = response.status().to_string();
        if !method.responses.contains_key(&code) {
            return;
        }
        if let Some(r) = action.responses.get_mut(&code) {
            r.uses += 1;
            for name in &touched.response_headers {
                touch(&mut r.headers, name);
            }
        }
    }
}

fn declared_media_types(response: &Response) -> Vec<MediaType> {
    response
        .body
        .keys()
        .filter_map(|k| MediaType::parse(k).ok())
        .collect()
}

/// Path part of an absolute base URI, or the base itself when it has no
/// scheme.
fn base_path(base: &str) -> &str {
    match base.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or(""),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{SimpleRequest, SimpleResponse};
    use crate::loader::load_contract_str;

    fn checker(contract: &str) -> ContractChecker {
        ContractChecker::new(load_contract_str(contract).unwrap())
    }

    fn request_keys(report: &Report) -> Vec<&str> {
        report.request.iter().map(|v| v.key.as_str()).collect()
    }

    const USERS: &str = r#"{
        "baseUri": "http://api.example.com/{version}",
        "version": "v1",
        "resources": [{
            "relativeUri": "/users",
            "methods": {"get": {
                "queryParameters": {"page": {"type": "integer", "minimum": 1}},
                "responses": {"200": {"body": {"application/json": {}}}}
            }},
            "resources": [{
                "relativeUri": "/{id}",
                "uriParameters": {"id": {"type": "integer"}},
                "methods": {"delete": {}}
            }]
        }]
    }"#;

    #[test]
    fn conforming_request() {
        let report = checker(USERS)
            .check_request(&SimpleRequest::get("http://api.example.com/v1/users?page=2"))
            .unwrap();
        assert!(report.is_empty(), "{:?}", report.request);
    }

    #[test]
    fn bare_path_matches_base_path() {
        let report = checker(USERS)
            .check_request(&SimpleRequest::get("/v1/users/12").header("Host", "x"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["action.undefined"]);
    }

    #[test]
    fn base_uri_problems() {
        let c = checker(USERS);
        let report = c.check_request(&SimpleRequest::get("http://other.example.com/v1/users")).unwrap();
        assert_eq!(request_keys(&report), vec!["baseUri.unmatched"]);

        let report = c.check_request(&SimpleRequest::get("http://api.example.com/v2/users")).unwrap();
        assert_eq!(request_keys(&report), vec!["baseUri.version.mismatch"]);
    }

    #[test]
    fn base_uri_override() {
        let api = load_contract_str(USERS).unwrap();
        let c = ContractChecker::with_config(api, CheckerConfig::new().base_uri("http://localhost:8080/{version}"));
        let report = c.check_request(&SimpleRequest::get("http://localhost:8080/v1/users")).unwrap();
        assert!(report.is_empty(), "{:?}", report.request);
    }

    #[test]
    fn uri_parameter_is_validated() {
        let report = checker(USERS)
            .check_request(&SimpleRequest::new("DELETE", "http://api.example.com/v1/users/abc"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["integer.invalid"]);
        assert!(report.request.messages()[0].starts_with("URI parameter 'id' on resource(/users/{id}): "));
    }

    #[test]
    fn undeclared_query_parameter() {
        let report = checker(USERS)
            .check_request(&SimpleRequest::get("http://api.example.com/v1/users?pg=1"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["queryParam.undefined"]);
    }

    #[test]
    fn fail_fast_keeps_first_violation() {
        let api = load_contract_str(USERS).unwrap();
        let c = ContractChecker::with_config(api, CheckerConfig::new().fail_fast(true));
        let err = c
            .check_request(&SimpleRequest::get("http://api.example.com/v1/users?page=0&x=1"))
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        let report = err.into_report();
        assert_eq!(request_keys(&report), vec!["value.tooSmall"]);
    }

    #[test]
    fn response_checks() {
        let c = checker(USERS);
        let request = SimpleRequest::get("http://api.example.com/v1/users").header("Accept", "text/html");
        let response = SimpleResponse::new(200).body("application/json", "[]");
        let report = c.check(&request, Some(&response)).unwrap();
        let keys: Vec<&str> = report.response.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["contentType.mismatch"]);

        let response = SimpleResponse::new(404);
        let report = c.check(&request, Some(&response)).unwrap();
        let keys: Vec<&str> = report.response.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["responseCode.undefined"]);
    }

    #[test]
    fn usage_is_recorded() {
        let c = checker(USERS);
        let request = SimpleRequest::get("http://api.example.com/v1/users?page=1");
        let response = SimpleResponse::new(200).body("application/json", "[]");
        let report = c.check(&request, Some(&response)).unwrap();
        let action = &report.usage.resources["/users"].actions["GET"];
        assert_eq!(action.uses, 1);
        assert_eq!(action.query_parameters["page"], 1);
        assert_eq!(action.responses["200"].uses, 1);
    }

    #[test]
    fn base_path_of_absolute_uri() {
        assert_eq!(base_path("http://h.com/api/{version}"), "/api/{version}");
        assert_eq!(base_path("http://h.com"), "");
        assert_eq!(base_path("/api"), "/api");
    }
}
