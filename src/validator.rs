//! Body validation against declared schemas.
//!
//! Schema validation is pluggable: the checker holds a list of
//! [`SchemaValidator`]s and hands each body to the first one that supports
//! its media type. Bodies nobody supports are accepted without a schema check.

use serde_json::Value;

use crate::error::{BodyIssue, SchemaError};
use crate::media::MediaType;

/// Validates body text against schema text for some family of media types.
pub trait SchemaValidator: Send + Sync {
    fn supports(&self, media_type: &MediaType) -> bool;

    /// # Errors
    ///
    /// Returns a [`BodyIssue`] describing why the body does not conform.
    fn validate(&self, content: &str, schema: &str) -> Result<(), BodyIssue>;
}

/// JSON Schema validation for `application/json` and `*+json` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn supports(&self, media_type: &MediaType) -> bool {
        media_type.subtype().eq_ignore_ascii_case("json")
            || media_type
                .suffix()
                .is_some_and(|s| s.eq_ignore_ascii_case("json"))
    }

    fn validate(&self, content: &str, schema: &str) -> Result<(), BodyIssue> {
        let schema: Value =
            serde_json::from_str(schema).map_err(|e| BodyIssue::InvalidSchema(e.to_string()))?;
        let payload: Value =
            serde_json::from_str(content).map_err(|e| BodyIssue::InvalidContent(e.to_string()))?;
        validate_against_schema(&schema, &payload)
    }
}

/// Validate a payload against an already-parsed JSON schema.
///
/// # Errors
///
/// Returns `BodyIssue::InvalidSchema` if the schema does not compile, or
/// `BodyIssue::Mismatch` with every error the validator reports.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), BodyIssue> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| BodyIssue::InvalidSchema(e.to_string()))?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BodyIssue::Mismatch(errors))
    }
}

/// Check that schema text compiles, for contract validation.
///
/// # Errors
///
/// Returns the parse or compile error message.
pub fn check_json_schema(schema: &str) -> Result<(), String> {
    let schema: Value = serde_json::from_str(schema).map_err(|e| e.to_string())?;
    jsonschema::validator_for(&schema)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
