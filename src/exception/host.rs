//! Request metadata captured for diagnostics.

use crate::error::{FilterError, Result};
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, header, request::Parts},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Immutable copy of the request a failure escaped from.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    method: Method,
    uri: String,
    headers: Vec<(String, Vec<String>)>,
    arguments: Vec<(String, Value)>,
}

impl RequestSnapshot {
    /// Copy method, display URI and headers. Arguments start empty.
    pub fn capture<B>(request: &Request<B>) -> Self {
        let map = request.headers();
        let headers = map
            .keys()
            .map(|name| {
                let values = map
                    .get_all(name)
                    .iter()
                    .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                    .collect();
                (name.as_str().to_string(), values)
            })
            .collect();

        Self {
            method: request.method().clone(),
            uri: display_uri(request),
            headers,
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<(String, Value)>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &[(String, Vec<String>)] {
        &self.headers
    }

    pub fn arguments(&self) -> &[(String, Value)] {
        &self.arguments
    }
}

/// Absolute URI as a client would have typed it.
fn display_uri<B>(request: &Request<B>) -> String {
    let uri = request.uri();
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let scheme = uri.scheme_str().unwrap_or("http");

    let host = uri.authority().map(|a| a.as_str()).or_else(|| {
        request
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
    });

    match host {
        Some(host) => format!("{}://{}{}", scheme, host, path),
        None => path.to_string(),
    }
}

/// Per-request recorder for the arguments a handler acted on.
///
/// The interceptor inserts one into every request's extensions; handlers
/// extract it and record what they received so a failure can report it.
///
/// ```rust,ignore
/// async fn get_value(Path(id): Path<i32>, host: ArgumentsHost) -> Result<String, Exception> {
///     host.record("id", &id)?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArgumentsHost {
    arguments: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ArgumentsHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an argument. Recording a name twice replaces its value in place.
    pub fn record<T: Serialize + ?Sized>(&self, name: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let name = name.into();

        let mut arguments = self.lock();
        match arguments.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => arguments.push((name, value)),
        }
        Ok(())
    }

    /// Freeze the recorded arguments.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.lock().clone()
    }

    // A handler that panicked mid-record still leaves a usable list.
    fn lock(&self) -> MutexGuard<'_, Vec<(String, Value)>> {
        self.arguments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> FromRequestParts<S> for ArgumentsHost
where
    S: Send + Sync,
{
    type Rejection = FilterError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ArgumentsHost>()
            .cloned()
            .ok_or(FilterError::MissingArgumentsHost)
    }
}
