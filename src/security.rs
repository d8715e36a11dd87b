//! Security scheme resolution.
//!
//! A method is checked once per applicable scheme, each run seeing the
//! base declarations merged with that scheme's `describedBy` extras. The
//! runs with the fewest violations survive: a single survivor is reported
//! as is, ties are reported with an "Assuming security scheme" prefix per
//! violation.

use std::borrow::Cow;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::contract::{Api, Declarations, Method, Resource, Response, SecurityRef, SecurityScheme};
use crate::messages::render;
use crate::report::Violations;

/// One interpretation under which a request is checked.
#[derive(Debug, Clone)]
pub struct SchemeCandidate<'a> {
    /// Scheme name, or `null` for the unsecured candidate.
    pub label: String,
    pub scheme: Option<&'a SecurityScheme>,
}

impl<'a> SchemeCandidate<'a> {
    pub fn unsecured() -> Self {
        Self {
            label: "null".to_string(),
            scheme: None,
        }
    }

    pub fn query_parameters<'b>(&self, base: &'b Declarations) -> Cow<'b, Declarations>
    where
        'a: 'b,
    {
        merged(base, self.scheme.map(|s| &s.described_by.query_parameters))
    }

    pub fn headers<'b>(&self, base: &'b Declarations) -> Cow<'b, Declarations>
    where
        'a: 'b,
    {
        merged(base, self.scheme.map(|s| &s.described_by.headers))
    }

    /// Response declared for `code`, by the method or else by the scheme.
    pub fn response<'b>(&self, method: &'b Method, code: &str) -> Option<&'b Response>
    where
        'a: 'b,
    {
        method.responses.get(code).or_else(|| {
            self.scheme
                .and_then(|s| s.described_by.responses.get(code))
        })
    }

    /// Response headers for `code`, merged with the scheme's own response
    /// declaration for the same code.
    pub fn response_headers<'b>(&self, base: &'b Response, code: &str) -> Cow<'b, Declarations>
    where
        'a: 'b,
    {
        let extension = self
            .scheme
            .and_then(|s| s.described_by.responses.get(code))
            .map(|r| &r.headers);
        merged(&base.headers, extension)
    }
}

/// Combine base declarations with an extension set. Base declarations win
/// on name clashes.
pub fn merged<'a>(base: &'a Declarations, extension: Option<&'a Declarations>) -> Cow<'a, Declarations> {
    match extension {
        Some(ext) if !ext.is_empty() => {
            let mut all: IndexMap<_, _> = base.clone();
            for (name, decl) in ext {
                all.entry(name.clone()).or_insert_with(|| decl.clone());
            }
            Cow::Owned(all)
        }
        _ => Cow::Borrowed(base),
    }
}

/// The `securedBy` list in effect for a method: the method's own, else the
/// nearest resource's, else the api's.
pub fn applicable_refs<'a>(
    api: &'a Api,
    method: &'a Method,
    chain: impl IntoIterator<Item = &'a Resource>,
) -> &'a [SecurityRef] {
    if !method.secured_by.is_empty() {
        return &method.secured_by;
    }
    chain
        .into_iter()
        .find(|r| !r.secured_by.is_empty())
        .map(|r| r.secured_by.as_slice())
        .unwrap_or(&api.secured_by)
}

/// Resolve references into candidates. Unknown scheme names are skipped;
/// contract validation reports them. Without any candidate the method is
/// checked once, unsecured.
pub fn candidates<'a>(api: &'a Api, refs: &[SecurityRef]) -> Vec<SchemeCandidate<'a>> {
    let mut out = Vec::new();
    for r in refs {
        match &r.name {
            None => out.push(SchemeCandidate::unsecured()),
            Some(name) => match api.security_scheme(name) {
                Some(scheme) => out.push(SchemeCandidate {
                    label: name.clone(),
                    scheme: Some(scheme),
                }),
                None => warn!(scheme = %name, "skipping undefined security scheme"),
            },
        }
    }
    if out.is_empty() {
        out.push(SchemeCandidate::unsecured());
    }
    out
}

/// Violations produced by one scheme run.
#[derive(Debug, Clone, Default)]
pub struct SchemeOutcome {
    pub label: String,
    pub request: Violations,
    pub response: Violations,
}

impl SchemeOutcome {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.request.len() + self.response.len()
    }
}

/// Keep the outcomes with the fewest violations and flatten them into
/// request and response violations.
pub fn select(outcomes: Vec<SchemeOutcome>) -> (Violations, Violations) {
    let Some(min) = outcomes.iter().map(SchemeOutcome::count).min() else {
        return (Violations::new(), Violations::new());
    };
    let survivors: Vec<SchemeOutcome> = outcomes.into_iter().filter(|o| o.count() == min).collect();

    if survivors.len() == 1 {
        let mut survivors = survivors;
        let winner = survivors.remove(0);
        debug!(scheme = %winner.label, violations = min, "security scheme selected");
        return (winner.request, winner.response);
    }

    debug!(count = survivors.len(), violations = min, "security schemes tied");
    let mut request = Violations::new();
    let mut response = Violations::new();
    for outcome in survivors {
        let prefix = render("securityScheme.assuming", &[&outcome.label]);
        request.extend(outcome.request.prefixed(&prefix));
        response.extend(outcome.response.prefixed(&prefix));
    }
    (request, response)
}
