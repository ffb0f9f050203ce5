use crate::common::ResponseDecision;
use crate::exception::{ExceptionFilter, Failure, HandlerIntent, ResponseComposer};
use std::sync::Arc;

/// Absorbs aborted requests: warning log, bare 400.
pub struct CancellationFilter {
    composer: Arc<ResponseComposer>,
}

impl CancellationFilter {
    pub fn new(composer: Arc<ResponseComposer>) -> Self {
        Self { composer }
    }
}

impl ExceptionFilter for CancellationFilter {
    fn catch(&self, failure: &Failure) -> ResponseDecision {
        self.composer.emit(HandlerIntent::Cancelled, failure)
    }
}

/// The catch-all filter: error log with full diagnostics, 500.
pub struct UnhandledExceptionFilter {
    composer: Arc<ResponseComposer>,
}

impl UnhandledExceptionFilter {
    pub fn new(composer: Arc<ResponseComposer>) -> Self {
        Self { composer }
    }
}

impl ExceptionFilter for UnhandledExceptionFilter {
    fn catch(&self, failure: &Failure) -> ResponseDecision {
        self.composer.emit(HandlerIntent::Unhandled, failure)
    }
}
