//! URI template matching and resource resolution.
//!
//! Templates use `{name}`, `{+name}`, `{#name}` and the other one-letter
//! operators of RFC 6570. Matching is exhaustive: a variable followed by
//! more template tries every split point, so several variables may share a
//! path segment (`{a}-{b}`).

use tracing::{debug, warn};

use crate::contract::Resource;
use crate::error::TemplateError;

/// Expansion operator of a template variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    PathSegment,
    PathParameter,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Reserved),
            '#' => Some(Operator::Fragment),
            '.' => Some(Operator::Label),
            '/' => Some(Operator::PathSegment),
            ';' => Some(Operator::PathParameter),
            '?' => Some(Operator::Query),
            '&' => Some(Operator::QueryContinuation),
            _ => None,
        }
    }

    /// Literal text the expansion starts with.
    fn prefix(&self, name: &str) -> String {
        match self {
            Operator::Simple | Operator::Reserved => String::new(),
            Operator::Fragment => "#".to_string(),
            Operator::Label => ".".to_string(),
            Operator::PathSegment => "/".to_string(),
            Operator::PathParameter => format!(";{}=", name),
            Operator::Query => format!("?{}=", name),
            Operator::QueryContinuation => format!("&{}=", name),
        }
    }

    fn allows_reserved(&self) -> bool {
        matches!(self, Operator::Reserved | Operator::Fragment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Variable { name: String, operator: Operator },
}

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    template: String,
    tokens: Vec<Token>,
}

/// One way a template matched a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    /// The whole value was consumed.
    pub complete: bool,
    /// Unconsumed remainder for partial matches.
    pub suffix: String,
    /// Extracted variables in template order.
    pub variables: Vec<(String, String)>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self::default()
    }

    /// First value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// A partial match is only usable when the remainder starts a new path
    /// segment.
    pub fn has_boundary(&self) -> bool {
        self.complete || self.suffix.starts_with('/')
    }
}

impl UriTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` for an unterminated `{` or an empty variable
    /// name.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = template;
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                return Err(TemplateError::Unterminated {
                    template: template.to_string(),
                    offset: offset + open,
                });
            };

            let expression = &after[..close];
            let (operator, name) = match expression.chars().next().and_then(Operator::from_char) {
                Some(op) => (op, &expression[1..]),
                None => (Operator::Simple, expression),
            };
            if name.is_empty() {
                return Err(TemplateError::EmptyVariable {
                    template: template.to_string(),
                    offset: offset + open,
                });
            }

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Variable {
                name: name.to_string(),
                operator,
            });

            let consumed = open + 1 + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            template: template.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Names of all variables in template order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Variable { name, .. } => Some(name.as_str()),
                Token::Literal(_) => None,
            })
            .collect()
    }

    /// All ways this template matches a prefix of `value`.
    pub fn matches(&self, value: &str) -> Vec<MatchResult> {
        let mut results = Vec::new();
        let mut variables = Vec::new();
        self.match_from(0, value, &mut variables, &mut results);
        results
    }

    /// The most useful match: complete first, then partial matches ending
    /// on a segment boundary, then any other partial match.
    pub fn best_match(&self, value: &str) -> MatchResult {
        let results = self.matches(value);
        let rank = |m: &MatchResult| {
            if m.complete {
                0
            } else if m.has_boundary() {
                1
            } else {
                2
            }
        };
        results
            .into_iter()
            .min_by_key(|m| (rank(m), m.variables.len()))
            .unwrap_or_else(MatchResult::no_match)
    }

    fn match_from(
        &self,
        index: usize,
        value: &str,
        variables: &mut Vec<(String, String)>,
        results: &mut Vec<MatchResult>,
    ) {
        let Some(token) = self.tokens.get(index) else {
            results.push(MatchResult {
                matched: true,
                complete: value.is_empty(),
                suffix: value.to_string(),
                variables: variables.clone(),
            });
            return;
        };

        match token {
            Token::Literal(literal) => {
                if let Some(rest) = value.strip_prefix(literal.as_str()) {
                    self.match_from(index + 1, rest, variables, results);
                }
            }
            Token::Variable { name, operator } => {
                let prefix = operator.prefix(name);
                let Some(rest) = value.strip_prefix(prefix.as_str()) else {
                    return;
                };
                let limit = if operator.allows_reserved() {
                    rest.len()
                } else {
                    rest.find('/').unwrap_or(rest.len())
                };
                if limit == 0 {
                    return;
                }

                if index + 1 == self.tokens.len() {
                    // Nothing left to anchor a split on: take the whole run.
                    variables.push((name.clone(), rest[..limit].to_string()));
                    self.match_from(index + 1, &rest[limit..], variables, results);
                    variables.pop();
                    return;
                }

                for end in (1..=limit).filter(|&end| rest.is_char_boundary(end)) {
                    variables.push((name.clone(), rest[..end].to_string()));
                    self.match_from(index + 1, &rest[end..], variables, results);
                    variables.pop();
                }
            }
        }
    }
}

/// A resource resolved from a request path.
#[derive(Debug, Clone)]
pub struct ResourceMatch<'a> {
    pub resource: &'a Resource,
    /// Enclosing resources, outermost first.
    pub ancestors: Vec<&'a Resource>,
    /// Full template of the resource, e.g. `/users/{id}`.
    pub uri: String,
    /// Variables extracted along the way, outermost first.
    pub variables: Vec<(String, String)>,
}

impl<'a> ResourceMatch<'a> {
    /// The resource followed by its ancestors, innermost first.
    pub fn chain(&self) -> impl Iterator<Item = &'a Resource> + '_ {
        std::iter::once(self.resource).chain(self.ancestors.iter().rev().copied())
    }
}

/// Why a path could not be resolved to a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    Undefined,
    /// Full templates of the equally specific candidates.
    Ambiguous(Vec<String>),
}

/// Resolve `path` against a resource tree.
///
/// Sibling candidates are ranked by the number of variables they bind;
/// fewer variables is more specific. A tie at the top is ambiguous. A
/// partial best match descends into the children with the remaining path.
pub fn resolve_resource<'a>(
    resources: &'a [Resource],
    path: &str,
) -> Result<ResourceMatch<'a>, Unresolved> {
    let mut ancestors = Vec::new();
    let mut variables = Vec::new();
    let mut prefix = String::new();
    let mut siblings = resources;
    let mut remaining = path.to_string();

    loop {
        let mut candidates: Vec<(&Resource, MatchResult)> = Vec::new();
        for resource in siblings {
            let template = match UriTemplate::parse(&resource.relative_uri) {
                Ok(t) => t,
                Err(e) => {
                    warn!(error = %e, "skipping resource with invalid template");
                    continue;
                }
            };
            let best = template
                .matches(&remaining)
                .into_iter()
                .filter(MatchResult::has_boundary)
                .min_by_key(|m| (!m.complete, m.variables.len()));
            if let Some(m) = best {
                candidates.push((resource, m));
            }
        }
        candidates.sort_by_key(|(_, m)| m.variables.len());

        let Some((_, first)) = candidates.first() else {
            return Err(Unresolved::Undefined);
        };
        let fewest = first.variables.len();
        let top: Vec<_> = candidates
            .iter()
            .take_while(|(_, m)| m.variables.len() == fewest)
            .collect();
        if top.len() > 1 {
            return Err(Unresolved::Ambiguous(
                top.iter()
                    .map(|(r, _)| format!("{}{}", prefix, r.relative_uri))
                    .collect(),
            ));
        }

        let (resource, matched) = candidates.swap_remove(0);
        prefix.push_str(&resource.relative_uri);
        variables.extend(matched.variables);
        debug!(uri = %prefix, complete = matched.complete, "resource candidate selected");

        if matched.complete {
            return Ok(ResourceMatch {
                resource,
                ancestors,
                uri: prefix,
                variables,
            });
        }

        ancestors.push(resource);
        siblings = &resource.resources;
        remaining = matched.suffix;
    }
}
