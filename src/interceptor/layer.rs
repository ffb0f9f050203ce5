use crate::exception::{BoxError, Exception};
use crate::interceptor::{HandlerFuture, Next, UnhandledExceptionsInterceptor};
use axum::{body::Body, http::Request, response::Response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Tower Layer installing the unhandled exception interceptor.
///
/// The produced service never fails, so it can go straight into
/// `axum::Router::layer`.
#[derive(Clone)]
pub struct ExceptionFilterLayer {
    interceptor: Arc<UnhandledExceptionsInterceptor>,
}

impl ExceptionFilterLayer {
    pub fn new(interceptor: UnhandledExceptionsInterceptor) -> Self {
        Self {
            interceptor: Arc::new(interceptor),
        }
    }

    pub fn interceptor(&self) -> &UnhandledExceptionsInterceptor {
        &self.interceptor
    }
}

impl<S> Layer<S> for ExceptionFilterLayer {
    type Service = ExceptionFilterMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionFilterMiddleware {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ExceptionFilterMiddleware<S> {
    inner: S,
    interceptor: Arc<UnhandledExceptionsInterceptor>,
}

impl<S> Service<Request<Body>> for ExceptionFilterMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    // Readiness is driven per request inside `call`, so a readiness failure is
    // classified like any other handler failure.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let interceptor = self.interceptor.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let next = Next::new(move |req: Request<Body>| -> HandlerFuture {
                Box::pin(async move {
                    inner.oneshot(req).await.map_err(Exception::from_service_error)
                })
            });
            Ok(interceptor.intercept(request, next).await)
        })
    }
}
