use crate::common::JsonSerializer;
use crate::config::{ConfigService, EnvironmentClassifier, EnvironmentMode};
use crate::error::Result;
use crate::exception::{
    Cancellation, CancellationFilter, DispatchTable, ExceptionCategory, ExceptionFilter,
    HandlerEntry, ResponseComposer, UnhandledExceptionFilter,
};
use crate::interceptor::{ExceptionFilterLayer, LogSink, TracingLogSink, UnhandledExceptionsInterceptor};
use std::sync::Arc;

/// Startup configuration for the unhandled exception interceptor.
///
/// Custom entries registered with [`handle`](Self::handle) are tested before
/// the built-in cancellation entry, which is tested before the universal
/// fallback.
///
/// # Example
///
/// ```rust,ignore
/// let layer = ExceptionFilterBuilder::from_config(ConfigService::new())?
///     .log_sink(TracingLogSink)
///     .layer()?;
///
/// let app = Router::new().route("/api/values", get(list)).layer(layer);
/// ```
pub struct ExceptionFilterBuilder {
    sink: Arc<dyn LogSink>,
    environment: Arc<dyn EnvironmentClassifier>,
    serializer: JsonSerializer,
    entries: Vec<HandlerEntry>,
}

impl Default for ExceptionFilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionFilterBuilder {
    /// Tracing sink, Production environment, compact JSON.
    pub fn new() -> Self {
        Self {
            sink: Arc::new(TracingLogSink),
            environment: Arc::new(EnvironmentMode::Production),
            serializer: JsonSerializer::default(),
            entries: Vec::new(),
        }
    }

    /// Environment and serializer settings from configuration, validated now.
    pub fn from_config(config: ConfigService) -> Result<Self> {
        let mode = config.try_environment_mode()?;
        let settings = config.serializer_settings()?;
        tracing::info!("Exception filter environment: {}", mode);

        Ok(Self::new()
            .environment(config)
            .serializer(JsonSerializer::new(settings)))
    }

    pub fn log_sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn environment(mut self, environment: impl EnvironmentClassifier) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    pub fn serializer(mut self, serializer: JsonSerializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Register an entry ahead of the built-in ones.
    pub fn handle(mut self, category: impl ExceptionCategory, filter: impl ExceptionFilter) -> Self {
        self.entries.push(HandlerEntry::new(category, filter));
        self
    }

    pub fn build(self) -> Result<UnhandledExceptionsInterceptor> {
        let serializer = Arc::new(self.serializer);
        let composer = Arc::new(ResponseComposer::new(
            serializer.clone(),
            self.environment,
            self.sink,
        ));

        let table = self
            .entries
            .into_iter()
            .fold(DispatchTable::builder(), |table, entry| table.entry(entry))
            .register(Cancellation, CancellationFilter::new(composer.clone()))
            .fallback(UnhandledExceptionFilter::new(composer))
            .build()?;

        let categories: Vec<&str> = table.entries().map(|e| e.category().name()).collect();
        tracing::debug!("Exception dispatch order: {:?}", categories);

        Ok(UnhandledExceptionsInterceptor::new(table, serializer))
    }

    pub fn layer(self) -> Result<ExceptionFilterLayer> {
        Ok(ExceptionFilterLayer::new(self.build()?))
    }
}
