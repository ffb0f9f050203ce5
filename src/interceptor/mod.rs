use crate::exception::{
    ArgumentsHost, Exception, ExecutionOutcome, Failure, RaisedException, RequestSnapshot,
};
use axum::{body::Body, http::Request, response::Response};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

pub mod builder;
pub mod layer;
pub mod logging;
pub mod unhandled;

pub use builder::ExceptionFilterBuilder;
pub use layer::{ExceptionFilterLayer, ExceptionFilterMiddleware};
pub use logging::{LogEntry, LogLevel, LogSink, TracingLogSink};
pub use unhandled::UnhandledExceptionsInterceptor;

/// What the wrapped handler hands back before classification.
pub type HandlerResult = Result<Response, Exception>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Represents the wrapped handler
pub struct Next {
    run: Box<dyn FnOnce(Request<Body>) -> HandlerFuture + Send>,
}

impl Next {
    /// Create a new Next handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> HandlerFuture + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the handler and classify how it finished.
    ///
    /// Request metadata is copied before the request is handed over; the
    /// recorded arguments are frozen at the moment a failure is observed.
    pub async fn run(self, mut request: Request<Body>) -> ExecutionOutcome {
        let host = request
            .extensions()
            .get::<ArgumentsHost>()
            .cloned()
            .unwrap_or_default();
        request.extensions_mut().insert(host.clone());
        let snapshot = RequestSnapshot::capture(&request);

        let run = self.run;
        let result = AssertUnwindSafe(async move { run(request).await })
            .catch_unwind()
            .await;

        let exception = match result {
            Ok(Ok(mut response)) => match response.extensions_mut().remove::<RaisedException>() {
                Some(RaisedException(exception)) => exception,
                None => return ExecutionOutcome::Success(response),
            },
            Ok(Err(exception)) => Arc::new(exception),
            Err(payload) => Arc::new(Exception::from_panic(payload)),
        };

        ExecutionOutcome::Failure(Failure::new(
            exception,
            snapshot.with_arguments(host.snapshot()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{Cancelled, Panicked};
    use axum::response::IntoResponse;
    use serde_json::json;

    fn request() -> Request<Body> {
        Request::get("/api/values/1")
            .header("host", "localhost")
            .body(Body::empty())
            .unwrap()
    }

    fn expect_failure(outcome: ExecutionOutcome) -> Failure {
        match outcome {
            ExecutionOutcome::Failure(failure) => failure,
            ExecutionOutcome::Success(response) => {
                panic!("expected failure, got {}", response.status())
            }
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let next = Next::new(|_req| -> HandlerFuture { Box::pin(async { Ok("ok".into_response()) }) });
        match next.run(request()).await {
            ExecutionOutcome::Success(response) => assert!(response.status().is_success()),
            ExecutionOutcome::Failure(failure) => panic!("unexpected failure: {}", failure.exception),
        }
    }

    #[tokio::test]
    async fn test_raised_exception_carries_recorded_arguments() {
        let next = Next::new(|req: Request<Body>| -> HandlerFuture {
            Box::pin(async move {
                let host = req.extensions().get::<ArgumentsHost>().cloned().unwrap();
                host.record("id", &-1).unwrap();
                Ok(Exception::new(Cancelled::new("gone")).into_response())
            })
        });

        let failure = expect_failure(next.run(request()).await);
        assert!(failure.exception.is::<Cancelled>());

        let snapshot = failure.snapshot.unwrap();
        assert_eq!(snapshot.uri(), "http://localhost/api/values/1");
        assert_eq!(snapshot.arguments(), &[("id".to_string(), json!(-1))]);
    }

    #[tokio::test]
    async fn test_service_error_becomes_failure() {
        let next = Next::new(|_req| -> HandlerFuture {
            Box::pin(async { Err(Exception::from_boxed("upstream refused".into())) })
        });
        let failure = expect_failure(next.run(request()).await);
        assert_eq!(failure.exception.to_string(), "upstream refused");
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        async fn explode() -> HandlerResult {
            panic!("handler exploded")
        }

        let next = Next::new(|_req| -> HandlerFuture { Box::pin(explode()) });
        let failure = expect_failure(next.run(request()).await);
        assert!(failure.exception.is::<Panicked>());
        assert_eq!(
            failure.exception.to_string(),
            "Handler panicked: handler exploded"
        );
    }
}
