use crate::common::{JsonSerializer, ResponseDecision};
use crate::exception::{DispatchTable, ExecutionOutcome, Failure};
use crate::interceptor::Next;
use axum::{body::Body, http::Request, response::Response};
use std::sync::Arc;

/// Wraps handler execution and turns escaped exceptions into responses.
///
/// Built once at startup (see [`ExceptionFilterBuilder`](crate::interceptor::ExceptionFilterBuilder))
/// and shared read-only by every request.
pub struct UnhandledExceptionsInterceptor {
    table: DispatchTable,
    serializer: Arc<JsonSerializer>,
}

impl UnhandledExceptionsInterceptor {
    pub fn new(table: DispatchTable, serializer: Arc<JsonSerializer>) -> Self {
        Self { table, serializer }
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Await the handler; only a failure goes through dispatch.
    pub async fn intercept(&self, request: Request<Body>, next: Next) -> Response {
        match next.run(request).await {
            ExecutionOutcome::Success(response) => response,
            ExecutionOutcome::Failure(failure) => self
                .decide(&failure)
                .into_response_with(&self.serializer),
        }
    }

    /// Exactly one filter fires; its decision is always handled.
    pub fn decide(&self, failure: &Failure) -> ResponseDecision {
        self.table.dispatch(failure)
    }
}
