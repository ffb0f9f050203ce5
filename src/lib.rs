//! # Meshestra Filters
//!
//! Unhandled exception filtering for axum services.
//!
//! Every request passes through an interceptor that awaits the handler and, only
//! when something escaped, classifies it with an ordered dispatch table and
//! writes a deterministic response plus one structured log entry.
//!
//! ## Features
//!
//! - **Ordered dispatch**: first matching category wins, a universal fallback is always last
//! - **Cancellation handling**: timeouts and aborts become a bare `400` with a warning
//! - **Environment-gated detail**: exception internals reach clients only outside Production
//! - **Diagnostic context**: method, URI, headers and recorded arguments in the error log
//! - **Panic capture**: a panicking handler is handled like any other failure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshestra_filters::prelude::*;
//! use axum::routing::get;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("key {0} not found")]
//! struct KeyNotFound(i32);
//!
//! async fn get_value(Path(id): Path<i32>, host: ArgumentsHost) -> std::result::Result<String, Exception> {
//!     host.record("id", &id)?;
//!     Err(KeyNotFound(id).into())
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     tracing_subscriber::fmt::init();
//!
//!     let filter = ExceptionFilterBuilder::from_config(ConfigService::new())?.layer()?;
//!     let app: Router = Router::new()
//!         .route("/api/values/{id}", get(get_value))
//!         .layer(filter);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod config;
pub mod error;
pub mod exception;
pub mod interceptor;
pub mod testing;

// Re-export core types
pub use common::{ApiErrorResponse, JsonSerializer, ResponseBody, ResponseDecision};
pub use config::{ConfigService, EnvironmentClassifier, EnvironmentMode};
pub use error::{FilterError, Result};
pub use exception::{ArgumentsHost, Cancelled, Exception, ExceptionFilter, Failure};
pub use interceptor::{ExceptionFilterBuilder, ExceptionFilterLayer, UnhandledExceptionsInterceptor};

// Re-export commonly used types from dependencies
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_filters::prelude::*;
/// ```
pub mod prelude {
    pub use crate::common::{ApiErrorResponse, JsonSerializer, ResponseBody, ResponseDecision, SerializerSettings};
    pub use crate::config::{ConfigService, EnvironmentClassifier, EnvironmentMode};
    pub use crate::error::{FilterError, Result};
    pub use crate::exception::{
        ArgumentsHost, Cancellation, Cancelled, DispatchTable, ErrorOf, Exception, ExceptionCategory,
        ExceptionFilter, Failure, Predicate, RequestSnapshot, ResponseComposer, Universal,
    };
    pub use crate::interceptor::{
        ExceptionFilterBuilder, ExceptionFilterLayer, LogSink, Next, TracingLogSink,
        UnhandledExceptionsInterceptor,
    };
    pub use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
