//! Parameter validation against typed declarations.
//!
//! [`check_value`] validates one raw value and is a pure function of the
//! declaration and the value. [`check_parameters`] validates a whole set of
//! observed values against a set of declarations: name matching, wildcard
//! names, multiplicity and required parameters.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::contract::{Declarations, ParamKind, TypeDeclaration};
use crate::http::{ParamValue, Values};
use crate::messages::violation;
use crate::pattern;
use crate::report::{Locator, Violations};

/// Wildcard token in declared parameter names, as in `x-{?}`.
pub const WILDCARD: &str = "{?}";

const RFC_1123: &str = "%a, %d %b %Y %H:%M:%S GMT";

fn integer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(0|-?[1-9][0-9]*)$").expect("static regex"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][-+]?[0-9]+)?$").expect("static regex")
    })
}

/// Where file values are structurally expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileContext {
    /// Multipart form bodies.
    Allowed,
    NotAllowed,
}

/// How a set of parameters is checked.
#[derive(Debug, Clone)]
pub struct ParamContext<'a> {
    /// Human label, e.g. "Query parameter".
    pub label: &'a str,
    pub locator: &'a Locator,
    pub case_sensitive: bool,
    pub files: FileContext,
}

impl<'a> ParamContext<'a> {
    pub fn new(label: &'a str, locator: &'a Locator) -> Self {
        Self {
            label,
            locator,
            case_sensitive: true,
            files: FileContext::NotAllowed,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn files(mut self, files: FileContext) -> Self {
        self.files = files;
        self
    }

    fn prefix(&self, name: &str) -> String {
        format!("{} '{}' on {}", self.label, name, self.locator)
    }
}

/// Result of checking a parameter set.
#[derive(Debug, Clone, Default)]
pub struct ParamOutcome {
    pub violations: Violations,
    /// Declared names that matched at least one observed name.
    pub used: Vec<String>,
    /// Observed names without a declaration, in observation order.
    pub undeclared: Vec<String>,
}

/// Match an observed name against a declared one, honoring a single `{?}`
/// wildcard token in the declared name.
pub fn name_matches(declared: &str, actual: &str, case_sensitive: bool) -> bool {
    let (declared, actual) = if case_sensitive {
        (declared.to_string(), actual.to_string())
    } else {
        (declared.to_ascii_lowercase(), actual.to_ascii_lowercase())
    };

    match declared.split_once(WILDCARD) {
        Some((prefix, suffix)) => {
            actual.len() >= prefix.len() + suffix.len()
                && actual.starts_with(prefix)
                && actual.ends_with(suffix)
        }
        None => declared == actual,
    }
}

/// Find the declaration for an observed name. Exact names win over
/// wildcard names.
pub fn find_declaration<'a>(
    declared: &'a Declarations,
    name: &str,
    case_sensitive: bool,
) -> Option<&'a TypeDeclaration> {
    let exact = declared.values().find(|d| {
        !d.name.contains(WILDCARD)
            && if case_sensitive {
                d.name == name
            } else {
                d.name.eq_ignore_ascii_case(name)
            }
    });
    exact.or_else(|| {
        declared
            .values()
            .find(|d| d.name.contains(WILDCARD) && name_matches(&d.name, name, case_sensitive))
    })
}

/// Validate observed values against declarations.
pub fn check_parameters<V: ParamValue>(
    declared: &Declarations,
    values: &Values<V>,
    context: &ParamContext<'_>,
) -> ParamOutcome {
    let mut outcome = ParamOutcome::default();

    for (name, items) in group_by_name(values, context.case_sensitive) {
        let Some(decl) = find_declaration(declared, name, context.case_sensitive) else {
            outcome.undeclared.push(name.to_string());
            continue;
        };
        if !outcome.used.contains(&decl.name) {
            outcome.used.push(decl.name.clone());
        }

        let prefix = context.prefix(name);
        if items.len() > 1 && !decl.repeat {
            outcome
                .violations
                .push(violation("repeat.superfluous", &[&items.len()]).prefixed(&prefix));
        }
        if decl.kind == ParamKind::File && context.files == FileContext::NotAllowed {
            outcome
                .violations
                .push(violation("file.invalid", &[]).prefixed(&prefix));
            continue;
        }
        for item in items {
            if item.is_file() {
                if decl.kind != ParamKind::File {
                    outcome
                        .violations
                        .push(violation("file.superfluous", &[]).prefixed(&prefix));
                }
                continue;
            }
            outcome
                .violations
                .extend(check_value(decl, item.text()).prefixed(&prefix));
        }
    }

    for decl in declared.values().filter(|d| d.is_required()) {
        let given = values
            .iter()
            .any(|(name, _)| name_matches(&decl.name, name, context.case_sensitive));
        if !given {
            outcome
                .violations
                .push(violation("required.missing", &[]).prefixed(&context.prefix(&decl.name)));
        }
    }

    outcome
}

/// Observed values grouped by name. Names that differ only in case share
/// the group of the first spelling seen unless matching is case-sensitive.
fn group_by_name<V>(values: &Values<V>, case_sensitive: bool) -> Vec<(&str, Vec<&V>)> {
    let mut groups: Vec<(&str, Vec<&V>)> = Vec::new();
    for (name, items) in values.iter() {
        let existing = groups
            .iter_mut()
            .find(|(seen, _)| !case_sensitive && seen.eq_ignore_ascii_case(name));
        match existing {
            Some((_, group)) => group.extend(items),
            None => groups.push((name, items.iter().collect())),
        }
    }
    groups
}

/// Validate a single value. A missing value counts as the empty string for
/// string parameters and is a violation for every other type.
pub fn check_value(decl: &TypeDeclaration, value: Option<&str>) -> Violations {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ if decl.kind == ParamKind::String => value.unwrap_or(""),
        _ => return violation("value.empty", &[]).into(),
    };

    match decl.kind {
        ParamKind::Boolean => check_boolean(value),
        ParamKind::Date => check_date(value),
        ParamKind::Integer => check_integer(decl, value),
        ParamKind::Number => check_number(decl, value),
        ParamKind::File => Violations::new(),
        ParamKind::String => check_string(decl, value),
    }
}

fn check_boolean(value: &str) -> Violations {
    if value == "true" || value == "false" {
        Violations::new()
    } else {
        violation("boolean.invalid", &[&value]).into()
    }
}

fn check_date(value: &str) -> Violations {
    let strict = NaiveDateTime::parse_from_str(value, RFC_1123)
        .map(|dt| dt.format(RFC_1123).to_string() == value)
        .unwrap_or(false);
    if strict {
        Violations::new()
    } else {
        violation("date.invalid", &[&value]).into()
    }
}

fn check_integer(decl: &TypeDeclaration, value: &str) -> Violations {
    if !integer_regex().is_match(value) {
        return violation("integer.invalid", &[&value]).into();
    }
    match value.parse::<i128>() {
        Ok(n) => check_integer_range(decl, value, n),
        Err(_) => match value.parse::<f64>() {
            Ok(n) => check_range(decl, value, n),
            Err(_) => violation("integer.invalid", &[&value]).into(),
        },
    }
}

/// Exact bounds for whole numbers: `n < min` iff `n < ceil(min)`.
fn check_integer_range(decl: &TypeDeclaration, value: &str, n: i128) -> Violations {
    let mut out = Violations::new();
    if let Some(min) = decl.minimum {
        if n < min.ceil() as i128 {
            out.push(violation("value.tooSmall", &[&value, &min]));
        }
    }
    if let Some(max) = decl.maximum {
        if n > max.floor() as i128 {
            out.push(violation("value.tooBig", &[&value, &max]));
        }
    }
    out
}

fn check_number(decl: &TypeDeclaration, value: &str) -> Violations {
    if matches!(value, "inf" | "-inf" | "nan") {
        return if decl.has_range() {
            violation("unbound", &[&value]).into()
        } else {
            Violations::new()
        };
    }
    if !number_regex().is_match(value) {
        return violation("number.invalid", &[&value]).into();
    }
    match value.parse::<f64>() {
        Ok(n) => check_range(decl, value, n),
        Err(_) => violation("number.invalid", &[&value]).into(),
    }
}

fn check_range(decl: &TypeDeclaration, value: &str, n: f64) -> Violations {
    let mut out = Violations::new();
    if let Some(min) = decl.minimum {
        if n < min {
            out.push(violation("value.tooSmall", &[&value, &min]));
        }
    }
    if let Some(max) = decl.maximum {
        if n > max {
            out.push(violation("value.tooBig", &[&value, &max]));
        }
    }
    out
}

fn check_string(decl: &TypeDeclaration, value: &str) -> Violations {
    let mut out = Violations::new();

    if let Some(allowed) = &decl.enum_values {
        if !allowed.iter().any(|a| a == value) {
            out.push(violation("enum.invalid", &[&value, &allowed.join(", ")]));
        }
    }

    if let Some(p) = &decl.pattern {
        match pattern::is_match(p, value) {
            Ok(true) => {}
            Ok(false) => out.push(violation("pattern.mismatch", &[&value, p])),
            Err(e) => out.push(violation("pattern.invalid", &[p, &e.message])),
        }
    }

    let length = value.chars().count() as u64;
    if let Some(min) = decl.min_length {
        if length < min {
            out.push(violation("length.tooSmall", &[&value, &min]));
        }
    }
    if let Some(max) = decl.max_length {
        if length > max {
            out.push(violation("length.tooBig", &[&value, &max]));
        }
    }

    out
}
