use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Dispatch table has no universal fallback entry")]
    MissingFallback,

    #[error("Entry for category '{category}' is registered after the universal fallback")]
    UnreachableEntry { category: String },

    #[error("Invalid environment '{value}': expected Development, Staging or Production")]
    InvalidEnvironment { value: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ArgumentsHost is missing from request extensions")]
    MissingArgumentsHost,
}

impl axum::response::IntoResponse for FilterError {
    fn into_response(self) -> axum::response::Response {
        // Every variant is a server-side fault.
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            self.to_string(),
        )
            .into_response()
    }
}
