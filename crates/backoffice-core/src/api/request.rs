//! Request options and header assembly for authenticated requests.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Url};

use super::ApiError;

/// Body of an outgoing request.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Multipart form data; the transport sets the content type and boundary.
    Multipart(Form),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }
}

/// Method, body and extra headers for a request.
#[derive(Debug)]
pub struct RequestOptions {
    pub method: Method,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Add a header that takes precedence over the defaults
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Build the request on `client`, attaching the already merged headers
    pub(crate) fn into_request(
        self,
        client: &Client,
        url: Url,
        headers: HeaderMap,
    ) -> RequestBuilder {
        let builder = client.request(self.method, url).headers(headers);
        match self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(form) => builder.multipart(form),
        }
    }
}

/// Merge the default headers with the caller's.
///
/// JSON is always requested. A bearer token is attached when one is held, and
/// every non-multipart body is declared as JSON. Caller headers win on
/// conflicting keys.
pub fn build_headers(
    token: Option<&str>,
    body: &RequestBody,
    overrides: &HeaderMap,
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }

    if !body.is_multipart() {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in overrides {
        headers.insert(name.clone(), value.clone());
    }

    Ok(headers)
}

/// Resolve a request target against the backend base URL.
///
/// Absolute URLs are used as given. Paths are appended to the base URL's
/// path, so a backend mounted under a prefix (`https://host/backend`) keeps
/// it even for targets written with a leading slash.
pub fn resolve_url(base: &Url, target: &str) -> Result<Url, ApiError> {
    if let Ok(absolute) = Url::parse(target) {
        return Ok(absolute);
    }

    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(target.trim_start_matches('/'))
        .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", target, e)))
}
