//! reqwest-backed transport

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// Blocking HTTP client with connect and overall timeouts
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(concat!("distkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, bytes = request.body.len(), "http request");

        let mut builder = match request.method {
            Method::Get => self.client.get(request.url.clone()),
            Method::Put => self.client.put(request.url.clone()).body(request.body.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    method: request.method,
                    url: request.url.to_string(),
                }
            } else {
                TransportError::Request {
                    method: request.method,
                    url: request.url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = builder.send().map_err(to_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(to_error)?.to_vec();

        debug!(status, bytes = body.len(), "http response");
        Ok(HttpResponse { status, body })
    }
}
