//! Ordered category → filter dispatch.
//!
//! Entries are tested in registration order and the first whose category
//! contains the exception wins. Specificity comes from ordering alone: register
//! narrow categories first and the universal fallback last.

use crate::common::ResponseDecision;
use crate::error::{FilterError, Result};
use crate::exception::{Cancelled, Exception, ExceptionFilter, Failure};
use std::any::type_name;
use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;

/// A class of exceptions, tested with "is-a" semantics.
pub trait ExceptionCategory: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn contains(&self, exception: &Exception) -> bool;

    /// Whether this category contains every exception.
    fn is_universal(&self) -> bool {
        false
    }
}

/// Every exception.
#[derive(Debug, Clone, Copy, Default)]
pub struct Universal;

impl ExceptionCategory for Universal {
    fn name(&self) -> &str {
        "Universal"
    }

    fn contains(&self, _exception: &Exception) -> bool {
        true
    }

    fn is_universal(&self) -> bool {
        true
    }
}

/// Aborted operations: explicit [`Cancelled`] and elapsed timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cancellation;

impl ExceptionCategory for Cancellation {
    fn name(&self) -> &str {
        "Cancellation"
    }

    fn contains(&self, exception: &Exception) -> bool {
        exception.is::<Cancelled>()
            || exception.is::<tower::timeout::error::Elapsed>()
            || exception.is::<tokio::time::error::Elapsed>()
    }
}

/// Exceptions that are, or wrap, an `E`.
pub struct ErrorOf<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E: Error + 'static> ErrorOf<E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E: Error + 'static> Default for ErrorOf<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Error + 'static> ExceptionCategory for ErrorOf<E> {
    fn name(&self) -> &str {
        type_name::<E>()
    }

    fn contains(&self, exception: &Exception) -> bool {
        exception.is::<E>()
    }
}

/// A named closure category.
pub struct Predicate<F> {
    name: String,
    predicate: F,
}

impl<F> Predicate<F>
where
    F: Fn(&Exception) -> bool + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> ExceptionCategory for Predicate<F>
where
    F: Fn(&Exception) -> bool + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, exception: &Exception) -> bool {
        (self.predicate)(exception)
    }
}

pub struct HandlerEntry {
    category: Box<dyn ExceptionCategory>,
    filter: Arc<dyn ExceptionFilter>,
}

impl HandlerEntry {
    pub fn new(category: impl ExceptionCategory, filter: impl ExceptionFilter) -> Self {
        Self {
            category: Box::new(category),
            filter: Arc::new(filter),
        }
    }

    pub fn category(&self) -> &dyn ExceptionCategory {
        self.category.as_ref()
    }

    pub fn filter(&self) -> &dyn ExceptionFilter {
        self.filter.as_ref()
    }

    pub fn matches(&self, exception: &Exception) -> bool {
        self.category.contains(exception)
    }
}

/// Immutable, validated dispatch table. Always ends with a universal entry.
pub struct DispatchTable {
    entries: Vec<HandlerEntry>,
    fallback: HandlerEntry,
}

impl DispatchTable {
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::new()
    }

    /// First entry whose category contains the exception, else the fallback.
    pub fn match_exception(&self, exception: &Exception) -> &HandlerEntry {
        self.entries
            .iter()
            .find(|entry| entry.matches(exception))
            .unwrap_or(&self.fallback)
    }

    /// Run exactly one filter for the failure.
    pub fn dispatch(&self, failure: &Failure) -> ResponseDecision {
        let entry = self.match_exception(&failure.exception);
        tracing::debug!(
            category = entry.category().name(),
            exception_type = failure.exception.type_name(),
            "Dispatching exception"
        );
        entry.filter().catch(failure)
    }

    /// Entries in dispatch order, fallback included.
    pub fn entries(&self) -> impl Iterator<Item = &HandlerEntry> {
        self.entries.iter().chain(std::iter::once(&self.fallback))
    }
}

/// Collects entries in order and validates totality on `build`.
#[derive(Default)]
pub struct DispatchTableBuilder {
    entries: Vec<HandlerEntry>,
}

impl DispatchTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(self, category: impl ExceptionCategory, filter: impl ExceptionFilter) -> Self {
        self.entry(HandlerEntry::new(category, filter))
    }

    pub fn entry(mut self, entry: HandlerEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Register the universal catch-all. Must come last.
    pub fn fallback(self, filter: impl ExceptionFilter) -> Self {
        self.register(Universal, filter)
    }

    pub fn build(mut self) -> Result<DispatchTable> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.category.is_universal())
            .ok_or(FilterError::MissingFallback)?;

        if let Some(unreachable) = self.entries.get(position + 1) {
            return Err(FilterError::UnreachableEntry {
                category: unreachable.category.name().to_string(),
            });
        }

        let fallback = self.entries.swap_remove(position);
        Ok(DispatchTable {
            entries: self.entries,
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ResponseBody, ResponseDecision};
    use axum::http::StatusCode;

    #[derive(Debug, thiserror::Error)]
    #[error("key {0} not found")]
    struct KeyNotFound(i32);

    #[derive(Debug, thiserror::Error)]
    #[error("lookup failed")]
    struct LookupFailed(#[source] KeyNotFound);

    fn tagged(tag: &'static str) -> impl ExceptionFilter {
        move |_: &Failure| {
            ResponseDecision::new(StatusCode::OK, ResponseBody::PlainMessage(tag.to_string()))
        }
    }

    fn tag_of(decision: ResponseDecision) -> String {
        match decision.body() {
            ResponseBody::PlainMessage(tag) => tag.clone(),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    fn standard_table() -> DispatchTable {
        DispatchTable::builder()
            .register(Cancellation, tagged("cancelled"))
            .register(ErrorOf::<KeyNotFound>::new(), tagged("key"))
            .fallback(tagged("fallback"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_registered_category_wins_for_itself_and_wrappers() {
        let table = standard_table();

        let direct = Exception::new(KeyNotFound(2));
        assert_eq!(table.match_exception(&direct).category().name(), type_name::<KeyNotFound>());

        let wrapped = Exception::new(LookupFailed(KeyNotFound(2)));
        assert_eq!(tag_of(table.dispatch(&Failure::detached(wrapped))), "key");
    }

    #[test]
    fn test_cancellation_category_covers_timeouts() {
        let table = standard_table();

        for exception in [
            Exception::new(Cancelled::new("disconnect")),
            Exception::from_boxed(Box::new(tower::timeout::error::Elapsed::new())),
        ] {
            assert_eq!(table.match_exception(&exception).category().name(), "Cancellation");
        }
    }

    #[tokio::test]
    async fn test_cancellation_category_covers_tokio_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();

        let table = standard_table();
        let exception = Exception::new(elapsed);
        assert_eq!(tag_of(table.dispatch(&Failure::detached(exception))), "cancelled");
    }

    #[test]
    fn test_unknown_exceptions_reach_fallback() {
        let table = standard_table();
        let unknown = Exception::new(std::io::Error::other("disk full"));
        let entry = table.match_exception(&unknown);
        assert!(entry.category().is_universal());
    }

    #[test]
    fn test_first_match_wins_over_later_overlap() {
        let table = DispatchTable::builder()
            .register(
                Predicate::new("anything-with-key", |e: &Exception| e.to_string().contains("key")),
                tagged("predicate"),
            )
            .register(ErrorOf::<KeyNotFound>::new(), tagged("specific"))
            .fallback(tagged("fallback"))
            .build()
            .unwrap();

        let exception = Exception::new(KeyNotFound(7));
        assert_eq!(tag_of(table.dispatch(&Failure::detached(exception))), "predicate");
    }

    #[test]
    fn test_entries_end_with_fallback() {
        let table = standard_table();
        let names: Vec<_> = table.entries().map(|e| e.category().name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "Cancellation".to_string(),
                type_name::<KeyNotFound>().to_string(),
                "Universal".to_string()
            ]
        );
    }

    #[test]
    fn test_missing_fallback_is_rejected() {
        let result = DispatchTable::builder()
            .register(Cancellation, tagged("cancelled"))
            .build();
        assert!(matches!(result, Err(FilterError::MissingFallback)));

        assert!(matches!(
            DispatchTable::builder().build(),
            Err(FilterError::MissingFallback)
        ));
    }

    #[test]
    fn test_entry_after_fallback_is_rejected() {
        let result = DispatchTable::builder()
            .fallback(tagged("fallback"))
            .register(Cancellation, tagged("cancelled"))
            .build();
        assert!(matches!(
            result,
            Err(FilterError::UnreachableEntry { category }) if category == "Cancellation"
        ));
    }
}
