use crate::exception::ExceptionDetail;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LogLevel {
    Warning,
    Error,
}

/// One diagnostic log write. Errors always carry their exception.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Warning {
        message: String,
    },
    Error {
        message: String,
        exception: ExceptionDetail,
    },
}

impl LogEntry {
    pub fn level(&self) -> LogLevel {
        match self {
            LogEntry::Warning { .. } => LogLevel::Warning,
            LogEntry::Error { .. } => LogLevel::Error,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LogEntry::Warning { message } | LogEntry::Error { message, .. } => message,
        }
    }

    pub fn exception(&self) -> Option<&ExceptionDetail> {
        match self {
            LogEntry::Warning { .. } => None,
            LogEntry::Error { exception, .. } => Some(exception),
        }
    }

    pub fn write_to(&self, sink: &dyn LogSink) {
        match self {
            LogEntry::Warning { message } => sink.warn(message),
            LogEntry::Error { message, exception } => sink.error(message, exception),
        }
    }
}

/// Structured logging primitives used by the exception filters.
///
/// Sinks are infallible by signature; a sink that panics takes the request
/// down with it.
pub trait LogSink: Send + Sync + 'static {
    fn warn(&self, message: &str);

    /// The exception travels as structured data, separate from the message.
    fn error(&self, message: &str, exception: &ExceptionDetail);
}

/// Default sink backed by `tracing`.
#[derive(Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str, exception: &ExceptionDetail) {
        tracing::error!(
            exception_type = exception.type_name.as_str(),
            exception_message = exception.message.as_str(),
            exception_causes = ?exception.causes,
            stack_trace = exception.stack_trace.as_deref(),
            "{}",
            message
        );
    }
}
