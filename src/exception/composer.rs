use crate::common::{ApiErrorResponse, JsonSerializer, ResponseBody, ResponseDecision};
use crate::config::{EnvironmentClassifier, EnvironmentMode};
use crate::exception::{Exception, Failure, RequestSnapshot};
use crate::interceptor::logging::{LogEntry, LogSink};
use axum::http::StatusCode;
use std::sync::Arc;
use strum_macros::Display;

pub const UNHANDLED_MESSAGE: &str = "Unhandled exception has occurred";
pub const CANCELLED_MESSAGE: &str = "Request was cancelled";

/// What the matched filter wants done with the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HandlerIntent {
    Cancelled,
    Unhandled,
}

/// Builds the log entry and response decision for a failed request.
pub struct ResponseComposer {
    serializer: Arc<JsonSerializer>,
    environment: Arc<dyn EnvironmentClassifier>,
    sink: Arc<dyn LogSink>,
}

impl ResponseComposer {
    pub fn new(
        serializer: Arc<JsonSerializer>,
        environment: Arc<dyn EnvironmentClassifier>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            serializer,
            environment,
            sink,
        }
    }

    pub fn serializer(&self) -> &JsonSerializer {
        &self.serializer
    }

    /// Compose without side effects.
    pub fn compose(
        &self,
        intent: HandlerIntent,
        snapshot: Option<&RequestSnapshot>,
        exception: &Exception,
        mode: EnvironmentMode,
    ) -> (LogEntry, ResponseDecision) {
        match intent {
            HandlerIntent::Cancelled => (
                LogEntry::Warning {
                    message: CANCELLED_MESSAGE.to_string(),
                },
                ResponseDecision::status_only(StatusCode::BAD_REQUEST),
            ),
            HandlerIntent::Unhandled => (
                LogEntry::Error {
                    message: self.diagnostic_message(snapshot),
                    exception: exception.detail(),
                },
                ResponseDecision::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    shape_body(mode, exception),
                ),
            ),
        }
    }

    /// Compose for the current environment and write the single log entry.
    pub fn emit(&self, intent: HandlerIntent, failure: &Failure) -> ResponseDecision {
        let mode = self.environment.environment_mode();
        let (entry, decision) = self.compose(
            intent,
            failure.snapshot.as_ref(),
            &failure.exception,
            mode,
        );
        tracing::debug!(
            intent = %intent,
            level = %entry.level(),
            status = decision.status_code(),
            "Composed exception response"
        );
        entry.write_to(self.sink.as_ref());
        decision
    }

    /// The multi-line diagnostic text. The exception itself is never part of it.
    pub fn diagnostic_message(&self, snapshot: Option<&RequestSnapshot>) -> String {
        let mut lines = vec![UNHANDLED_MESSAGE.to_string()];

        if let Some(snapshot) = snapshot {
            lines.push(format!("Method: {}", snapshot.method()));
            lines.push(format!("Uri: {}", snapshot.uri()));

            if !snapshot.headers().is_empty() {
                lines.push("Headers:".to_string());
                for (name, values) in snapshot.headers() {
                    lines.push(format!("\t{}:{}", name, values.join(",")));
                }
            }

            if !snapshot.arguments().is_empty() {
                lines.push("Parameters:".to_string());
                for (name, value) in snapshot.arguments() {
                    lines.push(format!("\t{}:", name));
                    lines.push(self.serializer.value_to_text(value));
                }
            }
        }

        lines.join("\n")
    }
}

/// Body for an unhandled exception. Production never sees exception internals.
pub fn shape_body(mode: EnvironmentMode, exception: &Exception) -> ResponseBody {
    if mode.exposes_exception_detail() {
        ResponseBody::StructuredError(ApiErrorResponse::new(
            UNHANDLED_MESSAGE,
            Some(exception.detail()),
        ))
    } else {
        ResponseBody::PlainMessage(UNHANDLED_MESSAGE.to_string())
    }
}
