//! Message catalog.
//!
//! Keys are stable identifiers that conformance tests assert on. Templates
//! use positional `{0}`, `{1}`, ... placeholders.

use std::fmt::Display;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::report::Violation;

const CATALOG: &[(&str, &str)] = &[
    // resolution
    ("resource.undefined", "Resource '{0}' is not defined"),
    ("resource.ambiguous", "Resource '{0}' is ambiguous, it matches {1}"),
    ("action.undefined", "Action {0} is not defined on {1}"),
    ("baseUri.unmatched", "Request URL '{0}' does not match base URI '{1}'"),
    (
        "baseUri.version.mismatch",
        "Base URI variable 'version' is '{0}' but the contract version is '{1}'",
    ),
    ("protocol.undefined", "Protocol '{0}' is not defined on {1}"),
    // parameter values
    ("value.empty", "Empty value is not allowed"),
    ("boolean.invalid", "Value '{0}' is not a valid boolean"),
    ("date.invalid", "Value '{0}' is not a valid RFC 1123 date"),
    ("integer.invalid", "Value '{0}' is not a valid integer"),
    ("number.invalid", "Value '{0}' is not a valid number"),
    ("unbound", "Value '{0}' is unbound but a range is declared"),
    ("value.tooSmall", "Value '{0}' is less than minimum {1}"),
    ("value.tooBig", "Value '{0}' is bigger than maximum {1}"),
    ("length.tooSmall", "Value '{0}' is shorter than minimum length {1}"),
    ("length.tooBig", "Value '{0}' is longer than maximum length {1}"),
    ("enum.invalid", "Value '{0}' is not a member of enum {1}"),
    ("pattern.mismatch", "Value '{0}' does not match pattern '{1}'"),
    ("pattern.invalid", "Pattern '{0}' is invalid: {1}"),
    ("file.invalid", "File values are only allowed in multipart form bodies"),
    ("file.superfluous", "File given where a plain value is expected"),
    ("repeat.superfluous", "Given {0} times but is not repeatable"),
    ("required.missing", "Is required but not given"),
    // undeclared names
    ("queryParam.undefined", "Query parameter '{0}' on {1} is not defined"),
    ("headerParam.undefined", "Header '{0}' on {1} is not defined"),
    ("formParam.undefined", "Form parameter '{0}' on {1} is not defined"),
    ("responseHeader.undefined", "Header '{0}' on {1} is not defined"),
    // bodies and media types
    ("mediaType.illegal", "Media type '{0}' on {1} is illegal: {2}"),
    ("mediaType.undefined", "Media type '{0}' is not defined on {1}"),
    ("mediaType.ambiguous", "Media type '{0}' on {1} is ambiguous, it matches {2}"),
    ("contentType.missing", "No Content-Type given on {0}"),
    ("body.superfluous", "Body given but none is defined on {0}"),
    ("body.invalid", "Body on {0} cannot be parsed as '{1}': {2}"),
    ("charset.invalid", "Content on {1} is not valid in charset '{0}'"),
    ("schema.mismatch", "Body on {0} does not match schema for '{1}': {2}"),
    ("schema.invalid", "Schema for '{0}' on {1} is invalid: {2}"),
    // responses
    ("responseCode.undefined", "Response code {0} is not defined on {1}"),
    (
        "mediaType.better",
        "Response media type '{0}' on {1} is accepted, but '{2}' would be a better match for the Accept header",
    ),
    (
        "contentType.mismatch",
        "Response media type '{0}' on {1} does not match the Accept header '{2}'",
    ),
    // security
    ("securityScheme.assuming", "Assuming security scheme '{0}'"),
    (
        "securityScheme.local.undefined",
        "Security scheme '{0}' referenced on {1} is not defined",
    ),
    (
        "securityScheme.global.undefined",
        "Security scheme '{0}' referenced by the api is not defined",
    ),
    ("securityScheme.type.invalid", "Security scheme '{0}' has unknown type '{1}'"),
    (
        "securityScheme.setting.missing",
        "Security scheme '{0}' of type '{1}' is missing setting '{2}'",
    ),
    ("securityScheme.grant.invalid", "Security scheme '{0}' declares unknown grant '{1}'"),
    // contract validation
    ("template.invalid", "Resource template '{0}' is invalid: {1}"),
    ("resource.uri.invalid", "Resource template '{0}' must start with '/'"),
    ("resource.duplicate", "Resource '{0}' is declared more than once"),
    ("responseCode.invalid", "Response code '{0}' on {1} is not a valid status code"),
    ("range.invalid", "Minimum {0} is bigger than maximum {1}"),
    ("length.invalid", "minLength {0} is bigger than maxLength {1}"),
    ("example.invalid", "Example is invalid: {0}"),
    ("default.invalid", "Default value is invalid: {0}"),
];

fn template(key: &str) -> Option<&'static str> {
    CATALOG.iter().find(|(k, _)| *k == key).map(|(_, t)| *t)
}

/// Render the message for `key` with positional arguments.
pub fn render(key: &str, args: &[&dyn Display]) -> String {
    let Some(template) = template(key) else {
        debug_assert!(false, "message key '{}' missing from catalog", key);
        return key.to_string();
    };

    placeholder()
        .replace_all(template, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .map(|arg| arg.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("static regex"))
}

/// Build a violation for `key` with positional arguments.
pub fn violation(key: &str, args: &[&dyn Display]) -> Violation {
    Violation::new(key, render(key, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_positional_arguments() {
        assert_eq!(
            render("value.tooBig", &[&"667", &666]),
            "Value '667' is bigger than maximum 666"
        );
    }

    #[test]
    fn arguments_are_not_rendered_twice() {
        assert_eq!(
            render("enum.invalid", &[&"{1}", &"a, b"]),
            "Value '{1}' is not a member of enum a, b"
        );
    }

    #[test]
    fn keys_are_unique() {
        for (i, (key, _)) in CATALOG.iter().enumerate() {
            assert!(
                CATALOG[i + 1..].iter().all(|(k, _)| k != key),
                "duplicate key {}",
                key
            );
        }
    }

    #[test]
    fn violation_carries_key() {
        let v = violation("resource.undefined", &[&"/nope"]);
        assert_eq!(v.key, "resource.undefined");
        assert_eq!(v.message, "Resource '/nope' is not defined");
    }
}
