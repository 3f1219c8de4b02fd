use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde_json::{Map, Value};

use crate::error::Error;

/// The transport-neutral request the pipeline consumes.
///
/// Query parameters are already nested: `filter[author][name]=x` is stored
/// as `{"filter": {"author": {"name": "x"}}}`.
#[derive(Debug, Clone)]
pub struct JsonApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: Map<String, Value>,
    pub body: Option<Value>,
}

impl JsonApiRequest {
    /// `target` is a path with an optional query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, qs)) => (path, parse_query(qs)),
            None => (target, Map::new()),
        };
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            query,
            body: None,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn patch(target: &str) -> Self {
        Self::new(Method::PATCH, target)
    }

    pub fn delete(target: &str) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn accept(self, value: &'static str) -> Self {
        self.with_header(ACCEPT, HeaderValue::from_static(value))
    }

    pub fn content_type(self, value: &'static str) -> Self {
        self.with_header(CONTENT_TYPE, HeaderValue::from_static(value))
    }

    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Header value as text; non-UTF-8 values read as absent.
    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Adapt an `http::Request`. A non-empty body must be JSON.
    pub fn from_http<B: AsRef<[u8]>>(request: http::Request<B>) -> Result<Self, Error> {
        let (parts, body) = request.into_parts();
        let bytes = body.as_ref();
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(serde_json::from_slice(bytes).map_err(|e| {
                Error::bad_request(format!("Request body is not valid JSON: {e}"))
            })?)
        };

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            query: parts.uri.query().map(parse_query).unwrap_or_default(),
            body,
        })
    }
}

/// Decode a query string into nested maps. `key[]` appends to a list;
/// repeated plain keys keep the last value.
pub fn parse_query(qs: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in url::form_urlencoded::parse(qs.as_bytes()) {
        let segments = split_key(&key);
        insert(&mut out, &segments, value.into_owned());
    }
    out
}

fn split_key(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };
    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        match inner.find(']') {
            Some(close) => {
                segments.push(&inner[..close]);
                rest = &inner[close + 1..];
            }
            None => return vec![key],
        }
    }
    if rest.is_empty() {
        segments
    } else {
        vec![key]
    }
}

fn insert(map: &mut Map<String, Value>, segments: &[&str], value: String) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };
    match tail.first() {
        None => {
            map.insert(head.to_string(), Value::String(value));
        }
        Some(&"") => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(items) = entry {
                items.push(Value::String(value));
            }
        }
        Some(_) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert(child, tail, value);
            }
        }
    }
}

/// Inverse of [`parse_query`]: brackets stay literal, segments and values
/// are form-encoded.
pub fn encode_query(query: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in query {
        flatten(encode(key), value, &mut pairs);
    }
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten(format!("{prefix}[{}]", encode(k)), v, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten(format!("{prefix}[]"), item, out);
            }
        }
        Value::String(s) => out.push((prefix, encode(s))),
        Value::Null => out.push((prefix, String::new())),
        other => out.push((prefix, encode(&other.to_string()))),
    }
}

fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
