//! The minimal request/response abstraction a check consumes, plus a simple
//! owned implementation that also serves as the captured-exchange format.

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Request headers that never need to be declared.
pub const STANDARD_REQUEST_HEADERS: &[&str] = &[
    "accept",
    "accept-charset",
    "accept-encoding",
    "accept-language",
    "cache-control",
    "connection",
    "content-length",
    "content-md5",
    "content-type",
    "cookie",
    "date",
    "expect",
    "from",
    "host",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-range",
    "if-unmodified-since",
    "max-forwards",
    "origin",
    "pragma",
    "range",
    "referer",
    "te",
    "upgrade",
    "user-agent",
    "via",
    "warning",
];

/// Response headers that never need to be declared.
pub const STANDARD_RESPONSE_HEADERS: &[&str] = &[
    "accept-ranges",
    "age",
    "allow",
    "cache-control",
    "connection",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-md5",
    "content-range",
    "content-type",
    "date",
    "etag",
    "expires",
    "last-modified",
    "link",
    "location",
    "pragma",
    "retry-after",
    "server",
    "set-cookie",
    "trailer",
    "transfer-encoding",
    "vary",
    "via",
    "warning",
    "www-authenticate",
];

/// Ordered multimap of named values.
#[derive(Debug, Clone, PartialEq)]
pub struct Values<V = String> {
    entries: IndexMap<String, Vec<V>>,
}

impl<V> Default for Values<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> Values<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`.
    pub fn add(&mut self, name: impl Into<String>, value: V) {
        self.entries.entry(name.into()).or_default().push(value);
    }

    /// Builder form of [`Values::add`].
    pub fn with(mut self, name: impl Into<String>, value: V) -> Self {
        self.add(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&[V]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// All values whose name equals `name` ignoring ASCII case.
    pub fn get_ignore_case(&self, name: &str) -> Vec<&V> {
        self.entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .flat_map(|(_, vs)| vs.iter())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for Values<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut values = Values::new();
        for (k, v) in iter {
            values.add(k, v);
        }
        values
    }
}

impl<'de> Deserialize<'de> for Values<String> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(Value),
            Many(Vec<Value>),
        }

        let raw = IndexMap::<String, OneOrMany>::deserialize(deserializer)?;
        let mut values = Values::new();
        for (name, entry) in raw {
            let items = match entry {
                OneOrMany::Many(items) => items,
                OneOrMany::One(item) => vec![item],
            };
            for item in items {
                let text = match item {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                values.add(name.clone(), text);
            }
        }
        Ok(values)
    }
}

/// A value of a form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        filename: Option<String>,
        content: Vec<u8>,
    },
}

/// Anything a parameter value can be read from.
pub trait ParamValue {
    /// Text of the value; `None` for files.
    fn text(&self) -> Option<&str>;

    fn is_file(&self) -> bool {
        self.text().is_none()
    }
}

impl ParamValue for String {
    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl ParamValue for FormValue {
    fn text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            FormValue::File { .. } => None,
        }
    }
}

/// A captured HTTP request.
pub trait HttpRequest {
    /// HTTP verb.
    fn method(&self) -> &str;

    /// Absolute URL, or an absolute path when the base is assumed.
    fn request_url(&self) -> &str;

    fn query_values(&self) -> Values;

    fn header_values(&self) -> Values;

    fn content_type(&self) -> Option<String>;

    fn content(&self) -> &[u8];

    /// Form fields of form-encoded or multipart bodies.
    fn form_values(&self) -> Values<FormValue>;
}

/// A captured HTTP response.
pub trait HttpResponse {
    fn status(&self) -> u16;

    fn header_values(&self) -> Values;

    fn content_type(&self) -> Option<String>;

    fn content(&self) -> &[u8];
}

/// Owned request built in code or loaded from an exchange file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimpleRequest {
    pub method: String,
    pub url: String,
    pub headers: Values,
    /// Explicit query values; parsed from the URL when absent.
    pub query: Option<Values>,
    /// Explicit content type; taken from the headers when absent.
    pub content_type: Option<String>,
    #[serde(deserialize_with = "body_bytes")]
    pub body: Vec<u8>,
    #[serde(deserialize_with = "text_form")]
    pub form: Option<Values<FormValue>>,
}

impl SimpleRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value.into());
        self
    }

    /// Add an explicit query value. Once used, the URL query is ignored.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Values::new)
            .add(name, value.into());
        self
    }

    pub fn body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(Values::new)
            .add(name, FormValue::Text(value.into()));
        self
    }

    pub fn form_file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.form.get_or_insert_with(Values::new).add(
            name,
            FormValue::File {
                filename: Some(filename.into()),
                content: content.into(),
            },
        );
        self
    }
}

impl HttpRequest for SimpleRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn request_url(&self) -> &str {
        &self.url
    }

    fn query_values(&self) -> Values {
        match &self.query {
            Some(q) => q.clone(),
            None => split_url(&self.url)
                .query
                .map(parse_query)
                .unwrap_or_default(),
        }
    }

    fn header_values(&self) -> Values {
        self.headers.clone()
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone().or_else(|| {
            self.headers
                .get_ignore_case("content-type")
                .first()
                .map(|s| s.to_string())
        })
    }

    fn content(&self) -> &[u8] {
        &self.body
    }

    fn form_values(&self) -> Values<FormValue> {
        if let Some(form) = &self.form {
            return form.clone();
        }
        let urlencoded = self.content_type().is_some_and(|ct| {
            ct.to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        });
        if urlencoded {
            parse_urlencoded(&self.body)
                .iter()
                .flat_map(|(k, vs)| {
                    vs.iter()
                        .map(move |v| (k.to_string(), FormValue::Text(v.clone())))
                })
                .collect()
        } else {
            Values::new()
        }
    }
}

/// Owned response built in code or loaded from an exchange file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimpleResponse {
    pub status: u16,
    pub headers: Values,
    pub content_type: Option<String>,
    #[serde(deserialize_with = "body_bytes")]
    pub body: Vec<u8>,
}

impl SimpleResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value.into());
        self
    }

    pub fn body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }
}

impl HttpResponse for SimpleResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn header_values(&self) -> Values {
        self.headers.clone()
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone().or_else(|| {
            self.headers
                .get_ignore_case("content-type")
                .first()
                .map(|s| s.to_string())
        })
    }

    fn content(&self) -> &[u8] {
        &self.body
    }
}

/// A captured request with its optional response.
#[derive(Debug, Clone, Deserialize)]
pub struct Exchange {
    pub request: SimpleRequest,
    #[serde(default)]
    pub response: Option<SimpleResponse>,
}

/// Bodies may be given as text or inline as any JSON value.
fn body_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.into_bytes(),
        Some(other) => other.to_string().into_bytes(),
    })
}

fn text_form<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Values<FormValue>>, D::Error> {
    let values = Option::<Values>::deserialize(deserializer)?;
    Ok(values.map(|vs| {
        vs.iter()
            .flat_map(|(k, items)| {
                items
                    .iter()
                    .map(move |v| (k.to_string(), FormValue::Text(v.clone())))
            })
            .collect()
    }))
}

/// Pieces of a request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts<'a> {
    /// Lowercase scheme when the URL is absolute.
    pub scheme: Option<String>,
    /// Everything before `?`.
    pub without_query: &'a str,
    /// The path component.
    pub path: &'a str,
    pub query: Option<&'a str>,
}

/// Split a URL without validating it.
pub fn split_url(url: &str) -> UrlParts<'_> {
    let url = url.split('#').next().unwrap_or_default();
    let (without_query, query) = match url.split_once('?') {
        Some((before, q)) => (before, Some(q)),
        None => (url, None),
    };

    let (scheme, path) = match without_query.split_once("://") {
        Some((scheme, rest)) => {
            let path = rest.find('/').map(|i| &rest[i..]).unwrap_or("");
            (Some(scheme.to_ascii_lowercase()), path)
        }
        None => (None, without_query),
    };

    UrlParts {
        scheme,
        without_query,
        path,
        query,
    }
}

/// Parse `a=1&b=2&b=3` into values; `+` decodes to a space and a name
/// without `=` gets an empty value.
pub fn parse_query(query: &str) -> Values {
    parse_urlencoded(query.as_bytes())
}

/// Parse an `application/x-www-form-urlencoded` payload, keeping repeated
/// names.
pub fn parse_urlencoded(input: &[u8]) -> Values {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(input) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            debug!(error = %e, "unparsable urlencoded data");
            Values::new()
        }
    }
}

/// Decode `%XX` escapes in a path segment; malformed escapes are kept
/// verbatim and `+` stays literal.
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_absolute_url() {
        let parts = split_url("HTTPS://api.example.com/v1/users?page=2#top");
        assert_eq!(parts.scheme.as_deref(), Some("https"));
        assert_eq!(parts.without_query, "HTTPS://api.example.com/v1/users");
        assert_eq!(parts.path, "/v1/users");
        assert_eq!(parts.query, Some("page=2"));
    }

    #[test]
    fn split_bare_path() {
        let parts = split_url("/users");
        assert_eq!(parts.scheme, None);
        assert_eq!(parts.path, "/users");
        assert_eq!(parts.query, None);
    }

    #[test]
    fn query_parsing() {
        let q = parse_query("a=1&b=x+y&b=%2F&flag");
        assert_eq!(q.get("a"), Some(&["1".to_string()][..]));
        assert_eq!(q.get("b").unwrap(), &["x y".to_string(), "/".to_string()]);
        assert_eq!(q.get("flag").unwrap(), &[String::new()]);
    }

    #[test]
    fn percent_decoding_keeps_malformed_escapes() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("a+b"), "a+b");
    }

    #[test]
    fn request_derives_query_and_content_type() {
        let req = SimpleRequest::get("http://h/x?page=1").header("Content-Type", "text/plain");
        assert_eq!(req.query_values().get("page").unwrap(), &["1".to_string()]);
        assert_eq!(req.content_type().as_deref(), Some("text/plain"));
    }

    #[test]
    fn urlencoded_body_becomes_form_values() {
        let req = SimpleRequest::post("/x").body("application/x-www-form-urlencoded", "a=1&b=2");
        let form = req.form_values();
        assert_eq!(form.get("a").unwrap(), &[FormValue::Text("1".into())]);
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn exchange_from_json() {
        let exchange: Exchange = serde_json::from_value(json!({
            "request": {
                "method": "POST",
                "url": "http://api.example.com/users",
                "headers": {"Content-Type": "application/json", "X-Tag": ["a", "b"]},
                "body": {"name": "x"}
            },
            "response": {"status": 201}
        }))
        .unwrap();
        assert_eq!(exchange.request.body, br#"{"name":"x"}"#.to_vec());
        assert_eq!(exchange.request.headers.get("X-Tag").unwrap().len(), 2);
        assert_eq!(exchange.response.unwrap().status, 201);
    }
}
