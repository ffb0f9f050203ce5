//! Test doubles for code that installs the exception filter.

use crate::exception::ExceptionDetail;
use crate::interceptor::logging::{LogEntry, LogLevel, LogSink};
use std::any::type_name;
use std::sync::{Arc, Mutex, PoisonError};

/// A [`LogSink`] that records every entry for later assertions.
///
/// Clones share the same record, so keep one clone and hand another to the
/// builder.
#[derive(Clone, Default)]
pub struct MockLogSink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MockLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.at_level(LogLevel::Error)
    }

    pub fn warnings(&self) -> Vec<LogEntry> {
        self.at_level(LogLevel::Warning)
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn verify_no_errors_logged(&self) -> &Self {
        let errors = self.errors();
        assert!(errors.is_empty(), "expected no errors, got {:?}", errors);
        self
    }

    pub fn verify_no_warnings_logged(&self) -> &Self {
        let warnings = self.warnings();
        assert!(warnings.is_empty(), "expected no warnings, got {:?}", warnings);
        self
    }

    pub fn verify_warning_logged(&self) -> &Self {
        assert!(!self.warnings().is_empty(), "expected a warning to be logged");
        self
    }

    /// Assert an error was logged for an exception of type `E`.
    pub fn verify_error_logged<E: 'static>(&self) -> &Self {
        let expected = type_name::<E>();
        let errors = self.errors();
        assert!(
            errors
                .iter()
                .filter_map(LogEntry::exception)
                .any(|detail| detail.type_name == expected),
            "expected an error for {}, got {:?}",
            expected,
            errors
        );
        self
    }

    fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level() == level)
            .collect()
    }

    fn push(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl LogSink for MockLogSink {
    fn warn(&self, message: &str) {
        self.push(LogEntry::Warning {
            message: message.to_string(),
        });
    }

    fn error(&self, message: &str, exception: &ExceptionDetail) {
        self.push(LogEntry::Error {
            message: message.to_string(),
            exception: exception.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_verifies() {
        let sink = MockLogSink::new();
        sink.verify_no_errors_logged().verify_no_warnings_logged();

        sink.warn("Request was cancelled");
        sink.error(
            "Unhandled exception has occurred",
            &ExceptionDetail {
                type_name: type_name::<std::io::Error>().to_string(),
                message: "disk full".to_string(),
                causes: vec![],
                stack_trace: None,
            },
        );

        sink.verify_warning_logged()
            .verify_error_logged::<std::io::Error>();
        assert_eq!(sink.entries().len(), 2);

        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    #[should_panic(expected = "expected an error for")]
    fn test_verify_error_logged_checks_type() {
        let sink = MockLogSink::new();
        sink.verify_error_logged::<std::io::Error>();
    }
}
