use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, Version};
use once_cell::unsync::OnceCell;
use url::Url;

use super::{FormDataItem, ParamVec};
use crate::ids::RequestId;

/// Case-insensitive header map with last-write-wins semantics for repeated
/// field names.
///
/// Names are stored lowercased; lookups accept any casing per RFC 7230.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header. A repeated field name replaces the earlier value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lowercased-name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Structured form of the request target, resolved against the `Host`
/// header for origin-form targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestUrl {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    /// Decoded query parameters in order of appearance.
    pub query_params: ParamVec,
}

impl RequestUrl {
    /// Parse a request target. Origin-form targets (`/path?q`) are joined
    /// onto a base built from the `Host` header; absolute-form targets are
    /// parsed as-is.
    pub fn parse(target: &str, host_header: Option<&str>) -> Result<Self, url::ParseError> {
        let url = if target.starts_with('/') {
            let base = Url::parse(&format!("http://{}/", host_header.unwrap_or("localhost")))?;
            base.join(target)?
        } else {
            Url::parse(target)?
        };
        Ok(Self::from_url(&url))
    }

    fn from_url(url: &Url) -> Self {
        let query_params: ParamVec = url
            .query_pairs()
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect();
        Self {
            scheme: url.scheme().to_string(),
            host: url.host_str().unwrap_or_default().to_string(),
            port: url.port(),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
            query_params,
        }
    }
}

/// One part of a multipart body: its sub-headers plus the opaque payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiPart {
    pub headers: HeaderMap,
    pub data: Vec<u8>,
}

/// A fully parsed HTTP request.
///
/// Exactly one `Request` is live per connection at a time; [`Request::reset`]
/// clears it for reuse on a keep-alive connection instead of reallocating.
#[derive(Debug)]
pub struct Request {
    pub id: RequestId,
    pub method: Method,
    pub version: Version,
    pub url: RequestUrl,
    pub headers: HeaderMap,
    /// Raw body bytes. Empty when the body was consumed by the multipart
    /// sub-parser.
    pub body: Vec<u8>,
    /// Boundary string, present only for multipart content types.
    pub multipart_boundary: Option<String>,
    /// Raw multipart parts in original order.
    pub parts: Vec<MultiPart>,
    /// Form-data items derived from `parts` via the upload policy.
    pub form_data: Vec<FormDataItem>,
    /// Path parameters bound by the matching route, in pattern order.
    pub path_params: ParamVec,
    /// Literal remainder of the URL after a prefix-table match. The prefix
    /// strategy binds no named parameters.
    pub route_suffix: Option<String>,
    pub keep_alive: bool,
    pub upgrade: bool,
    cookies: OnceCell<HashMap<String, String>>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            id: RequestId::new(),
            method: Method::GET,
            version: Version::HTTP_11,
            url: RequestUrl::default(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            multipart_boundary: None,
            parts: Vec::new(),
            form_data: Vec::new(),
            path_params: ParamVec::new(),
            route_suffix: None,
            keep_alive: true,
            upgrade: false,
            cookies: OnceCell::new(),
        }
    }
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the request for reuse on a keep-alive connection, retaining
    /// allocations where the containers allow it.
    pub fn reset(&mut self) {
        self.id = RequestId::new();
        self.method = Method::GET;
        self.version = Version::HTTP_11;
        self.url = RequestUrl::default();
        self.headers.clear();
        self.body.clear();
        self.multipart_boundary = None;
        self.parts.clear();
        self.form_data.clear();
        self.path_params.clear();
        self.route_suffix = None;
        self.keep_alive = true;
        self.upgrade = false;
        self.cookies = OnceCell::new();
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Cookies parsed lazily from the `Cookie` header on first access.
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies
            .get_or_init(|| parse_cookie_header(self.headers.get("cookie")))
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }

    /// Get a path parameter by name, last occurrence winning when a name
    /// repeats at different path depths.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name, last occurrence winning.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.url
            .query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a `Cookie` header into name/value pairs.
fn parse_cookie_header(raw: Option<&str>) -> HashMap<String, String> {
    raw.map(|c| {
        c.split(';')
            .filter_map(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let name = parts.next()?.trim();
                if name.is_empty() {
                    return None;
                }
                let value = parts.next().unwrap_or("").trim();
                Some((name.to_string(), value.to_string()))
            })
            .collect()
    })
    .unwrap_or_default()
}
