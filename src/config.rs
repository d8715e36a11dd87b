//! Checker configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::loader::{parse_document, read_file, Format};

/// Options for conformance checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckerConfig {
    /// Abort the check at the first violation.
    pub fail_fast: bool,
    /// Do not report undeclared `x-*` headers.
    pub ignore_x_headers: bool,
    /// Base URI used instead of the contract's own, for traffic captured
    /// against another host.
    pub base_uri: Option<String>,
    /// Run contract validation once and attach its findings to reports.
    pub validate_contract: bool,
    /// Request headers never reported as undeclared, on top of the
    /// standard ones.
    pub ignored_request_headers: Vec<String>,
    pub ignored_response_headers: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            ignore_x_headers: false,
            base_uri: None,
            validate_contract: true,
            ignored_request_headers: Vec::new(),
            ignored_response_headers: Vec::new(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file in JSON or YAML.
    ///
    /// # Errors
    ///
    /// Returns an IO or parse error.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = read_file(path)?;
        parse_document(&content, Format::detect(Some(path), &content))
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn ignore_x_headers(mut self, ignore: bool) -> Self {
        self.ignore_x_headers = ignore;
        self
    }

    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn validate_contract(mut self, validate: bool) -> Self {
        self.validate_contract = validate;
        self
    }

    pub fn ignore_request_header(mut self, name: impl Into<String>) -> Self {
        self.ignored_request_headers.push(name.into());
        self
    }

    pub fn ignore_response_header(mut self, name: impl Into<String>) -> Self {
        self.ignored_response_headers.push(name.into());
        self
    }
}
