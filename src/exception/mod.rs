//! Exceptions escaping request handlers and the filters that absorb them.
//!
//! A handler "raises" by returning `Err(Exception)`; any `std::error::Error`
//! converts with `?`. Errors from the wrapped tower service and panics are
//! turned into exceptions by [`Next`](crate::interceptor::Next) as well.

use crate::common::ResponseDecision;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::any::{Any, TypeId, type_name};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

pub mod composer;
pub mod dispatch;
pub mod host;
pub mod http;

pub use composer::{CANCELLED_MESSAGE, HandlerIntent, ResponseComposer, UNHANDLED_MESSAGE, shape_body};
pub use dispatch::{
    Cancellation, DispatchTable, DispatchTableBuilder, ErrorOf, ExceptionCategory, HandlerEntry,
    Predicate, Universal,
};
pub use host::{ArgumentsHost, RequestSnapshot};
pub use http::{CancellationFilter, UnhandledExceptionFilter};

/// A type-erased error, as produced by tower services.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The operation was aborted before it completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Operation was cancelled: {reason}")]
pub struct Cancelled {
    reason: String,
}

impl Cancelled {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A handler panicked instead of returning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Handler panicked: {message}")]
pub struct Panicked {
    message: String,
}

impl Panicked {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An error that escaped a request handler.
pub struct Exception {
    error: BoxError,
    type_name: &'static str,
    backtrace: Backtrace,
}

impl Exception {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::with_type_name(Box::new(error), type_name::<E>())
    }

    /// Wrap an already boxed error. Well-known concrete types keep their name.
    pub fn from_boxed(error: BoxError) -> Self {
        let name = boxed_type_name(error.as_ref());
        Self::with_type_name(error, name)
    }

    /// Wrap the error of a tower service, named after the service's error type.
    pub fn from_service_error<E>(error: E) -> Self
    where
        E: Into<BoxError> + 'static,
    {
        if TypeId::of::<E>() == TypeId::of::<BoxError>() {
            Self::from_boxed(error.into())
        } else {
            Self::with_type_name(error.into(), type_name::<E>())
        }
    }

    /// The trace points at the unwind boundary, not the panic site.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let panicked = Panicked::new(panic_message(payload.as_ref()));
        Self::with_type_name(Box::new(panicked), type_name::<Panicked>())
    }

    // Captured regardless of RUST_BACKTRACE; symbols are resolved only in `detail`.
    fn with_type_name(error: BoxError, type_name: &'static str) -> Self {
        Self {
            error,
            type_name,
            backtrace: Backtrace::force_capture(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The error followed by its `source()` chain.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn Error + 'static)> {
        let head: &(dyn Error + 'static) = self.error.as_ref();
        std::iter::successors(Some(head), |e| (*e).source())
    }

    /// "Is-a" test: true when the error, or anything it wraps, is an `E`.
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.chain().any(|e| e.is::<E>())
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.chain().find_map(|e| e.downcast_ref::<E>())
    }

    pub fn detail(&self) -> ExceptionDetail {
        ExceptionDetail {
            type_name: self.type_name.to_string(),
            message: self.error.to_string(),
            causes: self.chain().skip(1).map(|e| e.to_string()).collect(),
            stack_trace: match self.backtrace.status() {
                BacktraceStatus::Captured => Some(self.backtrace.to_string()),
                _ => None,
            },
        }
    }
}

impl<E> From<E> for Exception
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Exception::new(error)
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("type_name", &self.type_name)
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// Response extension carrying an exception out of the handler.
#[derive(Clone)]
pub(crate) struct RaisedException(pub(crate) Arc<Exception>);

impl IntoResponse for Exception {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(RaisedException(Arc::new(self)));
        response
    }
}

/// Serializable view of an exception, for log sinks and non-production bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetail {
    pub type_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// An exception together with the request it escaped from.
#[derive(Debug, Clone)]
pub struct Failure {
    pub exception: Arc<Exception>,
    pub snapshot: Option<RequestSnapshot>,
}

impl Failure {
    pub fn new(exception: impl Into<Arc<Exception>>, snapshot: RequestSnapshot) -> Self {
        Self {
            exception: exception.into(),
            snapshot: Some(snapshot),
        }
    }

    /// A failure observed outside of any HTTP request.
    pub fn detached(exception: impl Into<Arc<Exception>>) -> Self {
        Self {
            exception: exception.into(),
            snapshot: None,
        }
    }
}

/// The result of awaiting a wrapped handler.
#[derive(Debug)]
pub enum ExecutionOutcome {
    Success(Response),
    Failure(Failure),
}

/// Converts a matched failure into a response decision, logging as it goes.
pub trait ExceptionFilter: Send + Sync + 'static {
    fn catch(&self, failure: &Failure) -> ResponseDecision;
}

impl<F> ExceptionFilter for F
where
    F: Fn(&Failure) -> ResponseDecision + Send + Sync + 'static,
{
    fn catch(&self, failure: &Failure) -> ResponseDecision {
        self(failure)
    }
}

fn boxed_type_name(error: &(dyn Error + 'static)) -> &'static str {
    if error.is::<Cancelled>() {
        type_name::<Cancelled>()
    } else if error.is::<Panicked>() {
        type_name::<Panicked>()
    } else if error.is::<tower::timeout::error::Elapsed>() {
        type_name::<tower::timeout::error::Elapsed>()
    } else if error.is::<tokio::time::error::Elapsed>() {
        type_name::<tokio::time::error::Elapsed>()
    } else if error.is::<std::io::Error>() {
        type_name::<std::io::Error>()
    } else {
        type_name::<BoxError>()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("query failed")]
    struct QueryFailed {
        #[source]
        source: Cancelled,
    }

    #[test]
    fn test_is_walks_the_source_chain() {
        let exception = Exception::new(QueryFailed {
            source: Cancelled::new("client went away"),
        });

        assert!(exception.is::<QueryFailed>());
        assert!(exception.is::<Cancelled>());
        assert!(!exception.is::<Panicked>());
        assert_eq!(
            exception.downcast_ref::<Cancelled>().map(Cancelled::reason),
            Some("client went away")
        );
    }

    #[test]
    fn test_detail_captures_type_and_causes() {
        let exception = Exception::new(QueryFailed {
            source: Cancelled::new("timeout"),
        });
        let detail = exception.detail();

        assert_eq!(detail.type_name, type_name::<QueryFailed>());
        assert_eq!(detail.message, "query failed");
        assert_eq!(detail.causes, vec!["Operation was cancelled: timeout"]);
    }

    #[test]
    fn test_from_boxed_keeps_known_type_names() {
        let exception = Exception::from_boxed(Box::new(Cancelled::new("x")));
        assert_eq!(exception.type_name(), type_name::<Cancelled>());
        assert!(exception.is::<Cancelled>());

        let exception = Exception::from_boxed("plain message".into());
        assert_eq!(exception.type_name(), type_name::<BoxError>());
        assert_eq!(exception.to_string(), "plain message");
    }

    #[test]
    fn test_from_panic_payloads() {
        let exception = Exception::from_panic(Box::new("static str"));
        assert_eq!(exception.to_string(), "Handler panicked: static str");

        let exception = Exception::from_panic(Box::new(String::from("owned")));
        assert_eq!(
            exception.downcast_ref::<Panicked>().map(Panicked::message),
            Some("owned")
        );
        assert!(exception.detail().stack_trace.is_some());
    }

    #[test]
    fn test_stack_trace_captured_without_env() {
        // RUST_BACKTRACE is not consulted.
        let detail = Exception::new(Cancelled::new("x")).detail();
        assert!(detail.stack_trace.is_some_and(|trace| !trace.is_empty()));
    }

    #[test]
    fn test_from_service_error_names_concrete_type() {
        let exception = Exception::from_service_error(std::io::Error::other("refused"));
        assert_eq!(exception.type_name(), type_name::<std::io::Error>());

        let boxed: BoxError = Box::new(Cancelled::new("x"));
        let exception = Exception::from_service_error(boxed);
        assert_eq!(exception.type_name(), type_name::<Cancelled>());

        let boxed: BoxError = "plain".into();
        let exception = Exception::from_service_error(boxed);
        assert_eq!(exception.type_name(), type_name::<BoxError>());
    }

    #[test]
    fn test_into_response_stashes_exception() {
        let response = Exception::new(Cancelled::new("x")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let raised = response.extensions().get::<RaisedException>().unwrap();
        assert!(raised.0.is::<Cancelled>());
    }
}
