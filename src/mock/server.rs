//! In-memory registry and content store
//!
//! Behaves like the release registry and the blob store together:
//!
//! - `GET` returns the stored object or 404
//! - `PUT` of a release record is create-only: 201, or 409 if present
//! - `PUT` of a current-version pointer upserts and returns 200
//! - any other `PUT` stores the body and returns 200
//!
//! Objects are keyed by the last path segment of the URL, which is the
//! flat key the publisher builds. Every request is recorded, including
//! ones that hit an injected failure.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use distkit_protocol::{CurrentVersionPointer, ReleaseRecord};

use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

use super::failure::{FailureConfig, FailureInjector, FailureKind, MockOp};

#[derive(Debug, Default)]
struct ServerState {
    objects: BTreeMap<String, Vec<u8>>,
    requests: Vec<HttpRequest>,
}

/// Mock HTTP endpoint for registry and storage traffic
#[derive(Debug, Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<ServerState>>,
    failures: Arc<Mutex<FailureInjector>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing request handling
    pub fn seed(&self, key: &str, body: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(key.to_string(), body.into());
    }

    /// Store `value` as JSON
    pub fn seed_json<T: Serialize>(&self, key: &str, value: &T) {
        let body = serde_json::to_vec(value).unwrap();
        self.seed(key, body);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    /// Stored object decoded as JSON
    pub fn json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.object(key)
            .and_then(|body| serde_json::from_slice(&body).ok())
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests of kind `op`
    pub fn requests_for(&self, op: MockOp) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| classify(r) == op)
            .collect()
    }

    pub fn inject(&self, op: MockOp, config: FailureConfig) {
        self.failures.lock().unwrap().inject(op, config);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    fn handle(&self, op: MockOp, key: String, request: &HttpRequest) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        match op {
            MockOp::Get => match state.objects.get(&key) {
                Some(body) => HttpResponse::new(200, body.clone()),
                None => HttpResponse::new(404, "not found"),
            },
            MockOp::Register => {
                if state.objects.contains_key(&key) {
                    HttpResponse::new(409, "release already exists")
                } else {
                    state.objects.insert(key, request.body.clone());
                    HttpResponse::new(201, "")
                }
            }
            MockOp::SetPointer | MockOp::Upload => {
                state.objects.insert(key, request.body.clone());
                HttpResponse::new(200, "")
            }
        }
    }
}

impl Transport for MockServer {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.state.lock().unwrap().requests.push(request.clone());

        let op = classify(request);
        if let Some(kind) = self.failures.lock().unwrap().check(op) {
            return match kind {
                FailureKind::Status(status) => {
                    Ok(HttpResponse::new(status, format!("injected failure ({})", status)))
                }
                FailureKind::Transport(message) => Err(TransportError::Request {
                    method: request.method,
                    url: request.url.to_string(),
                    message,
                }),
            };
        }

        let key = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
        Ok(self.handle(op, key, request))
    }
}

fn classify(request: &HttpRequest) -> MockOp {
    if request.method == Method::Get {
        return MockOp::Get;
    }
    if serde_json::from_slice::<ReleaseRecord>(&request.body).is_ok() {
        MockOp::Register
    } else if serde_json::from_slice::<CurrentVersionPointer>(&request.body).is_ok() {
        MockOp::SetPointer
    } else {
        MockOp::Upload
    }
}
