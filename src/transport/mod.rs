//! HTTP transport
//!
//! The registry and storage clients speak HTTP through the [`Transport`]
//! trait. Production uses [`HttpTransport`] (reqwest); tests use
//! [`MockServer`](crate::mock::MockServer) in-process.

mod http;

pub use http::HttpTransport;

use std::fmt;

use url::Url;

/// HTTP methods used against the registry and content store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// An outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn put(url: Url, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            method: Method::Put,
            url,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name` (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, cut to `max` characters for error messages
    pub fn body_excerpt(&self, max: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.chars().count() <= max {
            text.to_string()
        } else {
            let cut: String = text.chars().take(max).collect();
            format!("{}...", cut)
        }
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("{method} {url} timed out")]
    Timeout { method: Method, url: String },

    #[error("{method} {url} failed: {message}")]
    Request {
        method: Method,
        url: String,
        message: String,
    },
}

/// Sends HTTP requests
pub trait Transport: Send + Sync {
    /// Send `request` and return the response, whatever its status.
    ///
    /// Returns `Err` only when no response was received.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers() {
        let url = Url::parse("https://dist.example.com/hk-linux-amd64.json").unwrap();
        let req = HttpRequest::put(url, "application/json", b"{}".to_vec())
            .header("Date", "Mon, 02 Jan 2006 15:04:05 GMT");

        assert_eq!(req.method, Method::Put);
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert_eq!(req.header_value("DATE"), Some("Mon, 02 Jan 2006 15:04:05 GMT"));
        assert_eq!(req.header_value("Authorization"), None);
    }

    #[test]
    fn test_body_excerpt_truncates() {
        let resp = HttpResponse::new(500, "x".repeat(300));
        assert!(!resp.is_success());
        assert_eq!(resp.body_excerpt(10), "xxxxxxxxxx...");
        assert_eq!(HttpResponse::new(201, " created\n").body_excerpt(10), "created");
    }
}
