use crate::{Error, Result};

pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// A single media type with its parameters, e.g.
/// `application/vnd.api+json; ext="https://a https://b"`.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaType {
    /// Lowercased `type/subtype`.
    pub essence: String,
    /// Parameter names are lowercased; values are unquoted.
    pub params: Vec<(String, String)>,
}

impl MediaType {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = split_unquoted(raw, ';').into_iter();
        let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

        match essence.split_once('/') {
            Some((t, s)) if !t.is_empty() && !s.is_empty() => {}
            _ => return Err(Error::InvalidMediaType(raw.trim().to_string())),
        }

        let mut params = Vec::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| Error::InvalidMediaType(raw.trim().to_string()))?;
            params.push((name.trim().to_ascii_lowercase(), unquote(value.trim())));
        }

        Ok(Self { essence, params })
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_json_api(&self) -> bool {
        self.essence == JSON_API_MEDIA_TYPE
    }

    pub fn is_wildcard(&self) -> bool {
        self.essence == "*/*" || self.essence == "application/*"
    }

    /// True when every parameter name is one of `allowed`.
    pub fn has_only_params(&self, allowed: &[&str]) -> bool {
        self.params.iter().all(|(k, _)| allowed.contains(&k.as_str()))
    }

    /// Space-separated URIs of the `ext` parameter.
    pub fn extensions(&self) -> Vec<String> {
        split_uris(self.param("ext"))
    }

    pub fn profiles(&self) -> Vec<String> {
        split_uris(self.param("profile"))
    }

    /// `q` weight; missing or malformed weights count as 1.
    pub fn quality(&self) -> f32 {
        self.param("q")
            .and_then(|q| q.parse::<f32>().ok())
            .map(|q| q.clamp(0.0, 1.0))
            .unwrap_or(1.0)
    }

    /// Render the JSON:API media type, carrying `ext` when non-empty.
    pub fn json_api(extensions: &[&str]) -> String {
        if extensions.is_empty() {
            JSON_API_MEDIA_TYPE.to_string()
        } else {
            format!("{JSON_API_MEDIA_TYPE}; ext=\"{}\"", extensions.join(" "))
        }
    }
}

/// The entries of an `Accept` header, ordered by descending `q` (stable).
/// Entries with `q=0` are dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaTypeList(pub Vec<MediaType>);

impl MediaTypeList {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut items = split_unquoted(raw, ',')
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| MediaType::parse(&s))
            .collect::<Result<Vec<_>>>()?;

        items.retain(|m| m.quality() > 0.0);
        items.sort_by(|a, b| {
            b.quality()
                .partial_cmp(&a.quality())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Self(items))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaType> {
        self.0.iter()
    }
}

fn split_uris(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map(|v| v.replace("\\\"", "\""))
        .unwrap_or_else(|| value.to_string())
}

fn split_unquoted(raw: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c == sep && !quoted => out.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    out.push(current);
    out
}
