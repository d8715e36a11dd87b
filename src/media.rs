//! Media type parsing, compatibility and negotiation.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use crate::error::MediaTypeError;

/// A parsed `type/subtype;param=value` descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    kind: String,
    subtype: String,
    parameters: IndexMap<String, String>,
}

impl MediaType {
    /// Parse a media type. A lone `*` means `*/*`.
    ///
    /// # Errors
    ///
    /// Returns `MediaTypeError` for an empty string, a missing subtype or a
    /// malformed or repeated parameter.
    pub fn parse(input: &str) -> Result<Self, MediaTypeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let mut parts = trimmed.split(';');
        let essence = parts.next().unwrap_or_default().trim();
        let (kind, subtype) = if essence == "*" {
            ("*", "*")
        } else {
            match essence.split_once('/') {
                Some((k, s)) if !k.trim().is_empty() && !s.trim().is_empty() => (k.trim(), s.trim()),
                Some((k, _)) if k.trim().is_empty() => return Err(MediaTypeError::Empty),
                _ => return Err(MediaTypeError::MissingSubtype(input.to_string())),
            }
        };

        let mut parameters = IndexMap::new();
        for raw in parts {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let Some((name, value)) = raw.split_once('=') else {
                return Err(MediaTypeError::MalformedParameter {
                    media_type: input.to_string(),
                    parameter: raw.to_string(),
                });
            };
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return Err(MediaTypeError::MalformedParameter {
                    media_type: input.to_string(),
                    parameter: raw.to_string(),
                });
            }
            let value = value.trim().trim_matches('"').to_string();
            if parameters.insert(name.clone(), value).is_some() {
                return Err(MediaTypeError::DuplicateParameter {
                    media_type: input.to_string(),
                    parameter: name,
                });
            }
        }

        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parameters,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Structured syntax suffix, `xml` for `vnd.foo+xml`.
    pub fn suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, s)| s)
    }

    pub fn is_wildcard_type(&self) -> bool {
        self.kind == "*"
    }

    /// `*` or a suffix wildcard like `*+xml`.
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == "*" || self.subtype.starts_with("*+")
    }

    /// The `q` parameter, 1.0 when absent.
    ///
    /// # Errors
    ///
    /// Returns `MediaTypeError::InvalidQuality` for values outside 0..=1.
    pub fn quality(&self) -> Result<f64, MediaTypeError> {
        match self.parameter("q") {
            None => Ok(1.0),
            Some(q) => match q.parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
                _ => Err(MediaTypeError::InvalidQuality(q.to_string())),
            },
        }
    }

    pub fn is_form_urlencoded(&self) -> bool {
        self.kind == "application" && self.subtype == "x-www-form-urlencoded"
    }

    pub fn is_multipart_form(&self) -> bool {
        self.kind == "multipart" && self.subtype == "form-data"
    }

    pub fn is_form(&self) -> bool {
        self.is_form_urlencoded() || self.is_multipart_form()
    }

    /// Whether the two types can describe the same content.
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.kind != other.kind {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        wildcard_covers(self, other) || wildcard_covers(other, self)
    }

    /// How specific a compatible match between `self` and `target` is;
    /// `None` when they are not compatible. Exact type and subtype agreement
    /// ranks above suffix wildcards, which rank above plain wildcards.
    /// Matching parameters break remaining ties.
    pub fn specificity(&self, target: &MediaType) -> Option<u32> {
        if !self.is_compatible_with(target) {
            return None;
        }

        let mut score = 0;
        if self.kind == target.kind && !self.is_wildcard_type() {
            score += 100;
        }
        if self.subtype == target.subtype && !self.is_wildcard_subtype() {
            score += 20;
        } else if self.suffix().is_some() && target.suffix().is_some() {
            score += 10;
        }
        let matching_parameters = self
            .parameters
            .iter()
            .filter(|(k, v)| k.as_str() != "q" && target.parameter(k) == Some(v.as_str()))
            .count() as u32;
        Some(score + matching_parameters.min(9))
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }
}

fn wildcard_covers(wildcard: &MediaType, other: &MediaType) -> bool {
    if !wildcard.is_wildcard_subtype() {
        return false;
    }
    match wildcard.suffix() {
        None => true,
        Some(suffix) => other.suffix() == Some(suffix) || other.subtype == suffix,
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (k, v) in &self.parameters {
            write!(f, ";{}={}", k, v)?;
        }
        Ok(())
    }
}

/// Result of picking the declared definition for a content type.
#[derive(Debug, Clone, PartialEq)]
pub enum BestMatch<T> {
    Found(T),
    Undefined,
    /// Keys of the equally specific candidates.
    Ambiguous(Vec<String>),
}

/// Pick the most specific declared media type for `target`.
///
/// Candidate keys that do not parse are skipped; contract validation reports
/// them separately.
pub fn find_best<'a, T>(
    target: &MediaType,
    candidates: impl IntoIterator<Item = (&'a str, T)>,
) -> BestMatch<T> {
    let mut scored: Vec<(u32, &'a str, T)> = candidates
        .into_iter()
        .filter_map(|(key, value)| {
            let declared = MediaType::parse(key).ok()?;
            declared.specificity(target).map(|s| (s, key, value))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let Some(top) = scored.first().map(|(s, _, _)| *s) else {
        return BestMatch::Undefined;
    };
    let tied: Vec<String> = scored
        .iter()
        .take_while(|(s, _, _)| *s == top)
        .map(|(_, k, _)| k.to_string())
        .collect();
    if tied.len() > 1 {
        return BestMatch::Ambiguous(tied);
    }
    match scored.into_iter().next() {
        Some((_, _, value)) => BestMatch::Found(value),
        None => BestMatch::Undefined,
    }
}

/// One entry of an Accept header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    pub media_type: MediaType,
    pub quality: f64,
}

/// Parse an Accept header, ordered by descending quality. Entries with
/// equal quality keep their header order.
///
/// # Errors
///
/// Returns the first entry that does not parse.
pub fn parse_accept(header: &str) -> Result<Vec<AcceptEntry>, MediaTypeError> {
    let mut entries = header
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let media_type = MediaType::parse(part)?;
            let quality = media_type.quality()?;
            Ok(AcceptEntry {
                media_type,
                quality,
            })
        })
        .collect::<Result<Vec<_>, MediaTypeError>>()?;
    entries.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
    Ok(entries)
}

/// Outcome of comparing a response's media type with the request's Accept
/// header.
#[derive(Debug, Clone, PartialEq)]
pub enum Negotiation {
    Acceptable,
    /// No Accept entry covers the response type.
    NotAccepted,
    /// A declared type would have matched the Accept header better.
    Better(MediaType),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Preference {
    quality: f64,
    specificity: u32,
}

impl Preference {
    fn beats(&self, other: &Preference) -> bool {
        self.quality > other.quality
            || (self.quality == other.quality && self.specificity > other.specificity)
    }
}

fn preference(accept: &[AcceptEntry], media_type: &MediaType) -> Option<Preference> {
    let mut best: Option<Preference> = None;
    for entry in accept {
        if entry.quality <= 0.0 {
            continue;
        }
        if let Some(specificity) = entry.media_type.specificity(media_type) {
            let candidate = Preference {
                quality: entry.quality,
                specificity,
            };
            if best.map_or(true, |b| candidate.beats(&b)) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Compare the actual response type against the Accept header and the
/// response types the contract declares.
pub fn negotiate(accept: &[AcceptEntry], declared: &[MediaType], actual: &MediaType) -> Negotiation {
    let Some(actual_preference) = preference(accept, actual) else {
        return Negotiation::NotAccepted;
    };

    let mut best: Option<(Preference, &MediaType)> = None;
    for candidate in declared {
        if let Some(p) = preference(accept, candidate) {
            if best.as_ref().map_or(true, |(b, _)| p.beats(b)) {
                best = Some((p, candidate));
            }
        }
    }

    match best {
        Some((p, candidate))
            if p.beats(&actual_preference) && !candidate.is_compatible_with(actual) =>
        {
            Negotiation::Better(candidate.clone())
        }
        _ => Negotiation::Acceptable,
    }
}

/// Decode body bytes using the charset of the content type.
///
/// # Errors
///
/// Returns the charset name when it is not supported or the content is not
/// valid in it.
pub fn decode_content(content: &[u8], media_type: &MediaType) -> Result<String, String> {
    let charset = media_type.charset().unwrap_or("utf-8").to_ascii_lowercase();
    match charset.as_str() {
        "utf-8" | "utf8" => String::from_utf8(content.to_vec()).map_err(|_| charset),
        "us-ascii" | "ascii" if content.is_ascii() => Ok(content.iter().map(|&b| b as char).collect()),
        "iso-8859-1" | "latin1" | "latin-1" => Ok(content.iter().map(|&b| b as char).collect()),
        _ => Err(charset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(s: &str) -> MediaType {
        MediaType::parse(s).unwrap()
    }

    #[test]
    fn parse_with_parameters() {
        let m = mt("Application/JSON; charset=\"UTF-8\"; q=0.5");
        assert_eq!(m.kind(), "application");
        assert_eq!(m.subtype(), "json");
        assert_eq!(m.charset(), Some("UTF-8"));
        assert_eq!(m.quality().unwrap(), 0.5);
    }

    #[test]
    fn parse_failures() {
        assert_eq!(MediaType::parse(""), Err(MediaTypeError::Empty));
        assert!(matches!(
            MediaType::parse("text"),
            Err(MediaTypeError::MissingSubtype(_))
        ));
        assert!(matches!(
            MediaType::parse("text/plain;charset"),
            Err(MediaTypeError::MalformedParameter { .. })
        ));
        assert!(matches!(
            MediaType::parse("text/plain;a=1;A=2"),
            Err(MediaTypeError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn lone_star_is_full_wildcard() {
        let m = mt("*");
        assert!(m.is_wildcard_type());
        assert!(m.is_compatible_with(&mt("image/png")));
    }

    #[test]
    fn suffix_wildcard_compatibility() {
        let xml = mt("application/*+xml");
        assert!(xml.is_compatible_with(&mt("application/vnd.foo+xml")));
        assert!(!xml.is_compatible_with(&mt("application/json")));
        assert!(xml.is_compatible_with(&mt("application/xml")));
        assert!(!xml.is_compatible_with(&mt("text/vnd.foo+xml")));
    }

    #[test]
    fn specificity_prefers_exact_types() {
        let target = mt("application/json");
        let exact = mt("application/json").specificity(&target).unwrap();
        let sub = mt("application/*").specificity(&target).unwrap();
        let any = mt("*/*").specificity(&target).unwrap();
        assert!(exact > sub && sub > any);
        assert_eq!(mt("text/plain").specificity(&target), None);
    }

    #[test]
    fn best_match_selection() {
        let target = mt("application/json");
        let declared = vec![("application/*", 1), ("application/json", 2), ("text/xml", 3)];
        assert_eq!(find_best(&target, declared), BestMatch::Found(2));

        let declared = vec![("text/xml", 1)];
        assert_eq!(find_best(&target, declared), BestMatch::<i32>::Undefined);

        let declared = vec![("application/*", 1), ("*/json", 2)];
        // a wildcard type ranks below an exact type with a wildcard subtype
        assert_eq!(find_best(&target, declared), BestMatch::Found(1));

        let declared = vec![("application/json", 1), ("application/json;v=1", 2)];
        assert_eq!(
            find_best(&target, declared),
            BestMatch::Ambiguous(vec![
                "application/json".to_string(),
                "application/json;v=1".to_string()
            ])
        );
    }

    #[test]
    fn accept_is_sorted_by_quality() {
        let entries = parse_accept("text/html;q=0.5, application/json, */*;q=0.1").unwrap();
        let order: Vec<String> = entries.iter().map(|e| e.media_type.essence()).collect();
        assert_eq!(order, vec!["application/json", "text/html", "*/*"]);
        assert!(parse_accept("application/json;q=2").is_err());
    }

    #[test]
    fn negotiation_outcomes() {
        let declared = vec![mt("application/json"), mt("text/xml")];

        let accept = parse_accept("application/json").unwrap();
        assert_eq!(
            negotiate(&accept, &declared, &mt("application/json")),
            Negotiation::Acceptable
        );
        assert_eq!(
            negotiate(&accept, &declared, &mt("text/xml")),
            Negotiation::NotAccepted
        );

        let accept = parse_accept("text/xml;q=0.5, application/json").unwrap();
        assert_eq!(
            negotiate(&accept, &declared, &mt("text/xml")),
            Negotiation::Better(mt("application/json"))
        );
    }

    #[test]
    fn decode_charsets() {
        assert_eq!(
            decode_content(&[0xe9], &mt("text/plain;charset=iso-8859-1")).unwrap(),
            "é"
        );
        assert_eq!(decode_content(b"ok", &mt("text/plain")).unwrap(), "ok");
        assert_eq!(
            decode_content(b"ok", &mt("text/plain;charset=ebcdic")).unwrap_err(),
            "ebcdic"
        );
    }

    #[test]
    fn decode_rejects_invalid_bytes() {
        assert_eq!(
            decode_content(b"\xff\xfe", &mt("application/json")).unwrap_err(),
            "utf-8"
        );
        assert_eq!(
            decode_content("é".as_bytes(), &mt("text/plain;charset=US-ASCII")).unwrap_err(),
            "us-ascii"
        );
        assert_eq!(decode_content(b"plain", &mt("text/plain;charset=us-ascii")).unwrap(), "plain");
    }
}
