//! Error types for contract loading and conformance checking.

use std::path::PathBuf;
use thiserror::Error;

use crate::report::Report;

/// Errors while loading a contract or a captured exchange.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid contract: {message}")]
    InvalidContract { message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// A URI template that cannot be parsed.
///
/// This is an authoring error in the contract, distinct from a path that
/// simply does not match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated variable in template '{template}' at offset {offset}")]
    Unterminated { template: String, offset: usize },

    #[error("empty variable name in template '{template}' at offset {offset}")]
    EmptyVariable { template: String, offset: usize },
}

/// A media type string that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaTypeError {
    #[error("media type is empty")]
    Empty,

    #[error("missing subtype in '{0}'")]
    MissingSubtype(String),

    #[error("malformed parameter '{parameter}' in '{media_type}'")]
    MalformedParameter {
        media_type: String,
        parameter: String,
    },

    #[error("duplicate parameter '{parameter}' in '{media_type}'")]
    DuplicateParameter {
        media_type: String,
        parameter: String,
    },

    #[error("invalid quality value '{0}'")]
    InvalidQuality(String),
}

/// A contract pattern that the host regex engine rejects.
#[derive(Debug, Clone, Error)]
#[error("invalid pattern '{pattern}': {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// Why a body failed validation against its declared schema.
#[derive(Debug, Clone, Error)]
pub enum BodyIssue {
    /// The content does not parse in its media type.
    #[error("{0}")]
    InvalidContent(String),

    /// The declared schema itself is unusable.
    #[error("{0}")]
    InvalidSchema(String),

    #[error("{}", join_errors(.0))]
    Mismatch(Vec<SchemaError>),
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Single schema validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors escaping a conformance check.
///
/// Ordinary non-conformance never shows up here; it is recorded in the
/// [`Report`]. The only escaping condition is a fail-fast abort, which still
/// carries everything gathered up to that point.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("check aborted on first violation: {}", first_violation(report))]
    FailFast { report: Box<Report> },
}

fn first_violation(report: &Report) -> String {
    report
        .all()
        .next()
        .map(|v| v.message.clone())
        .unwrap_or_default()
}

impl CheckError {
    /// The partial report gathered before the abort.
    pub fn report(&self) -> &Report {
        match self {
            CheckError::FailFast { report } => report,
        }
    }

    /// Consume the error and return the partial report.
    pub fn into_report(self) -> Report {
        match self {
            CheckError::FailFast { report } => *report,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
