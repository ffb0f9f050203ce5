use crate::common::JsonSerializer;
use crate::exception::ExceptionDetail;
use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Structured error payload returned outside Production.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionDetail>,
}

impl ApiErrorResponse {
    pub fn new(message: impl Into<String>, exception: Option<ExceptionDetail>) -> Self {
        Self {
            message: message.into(),
            exception,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    None,
    PlainMessage(String),
    StructuredError(ApiErrorResponse),
}

/// What the framework must write to the outgoing response.
///
/// Every constructor marks the decision as handled, so a fired filter always
/// absorbs its exception.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDecision {
    status: StatusCode,
    body: ResponseBody,
    handled: bool,
}

impl ResponseDecision {
    pub fn new(status: StatusCode, body: ResponseBody) -> Self {
        Self {
            status,
            body,
            handled: true,
        }
    }

    /// A bare status code with no body.
    pub fn status_only(status: StatusCode) -> Self {
        Self::new(status, ResponseBody::None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Apply the decision verbatim to an HTTP response.
    pub fn into_response_with(self, serializer: &JsonSerializer) -> Response {
        match self.body {
            ResponseBody::None => self.status.into_response(),
            ResponseBody::PlainMessage(message) => (
                self.status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                message,
            )
                .into_response(),
            ResponseBody::StructuredError(error) => match serializer.to_text(&error) {
                Ok(json) => (
                    self.status,
                    [(header::CONTENT_TYPE, "application/json")],
                    Body::from(json),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!("Failed to serialize error response: {}", e);
                    (self.status, error.message).into_response()
                }
            },
        }
    }
}
