//! Domain errors shared by the gateway, the language-model collaborators and the
//! orchestrators. Startup plumbing (config, metrics) stays on `anyhow`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CivicError>;

#[derive(Error, Debug)]
pub enum CivicError {
    /// Network failure or non-success status from a collaborator.
    #[error("external call failed: {0}")]
    ExternalCall(String),

    /// Collaborator answered, but the payload had the wrong shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A required credential is absent from the environment.
    #[error("{0} is not set")]
    ConfigurationMissing(&'static str),

    /// Caller-supplied input rejected before any external call.
    #[error("{0}")]
    Validation(String),
}

impl CivicError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExternalCall(_) => "external_call",
            Self::MalformedResponse(_) => "malformed_response",
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::Validation(_) => "validation",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ConfigurationMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalCall(_) | Self::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for CivicError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::ExternalCall(e.to_string())
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CivicError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            // Never echo which variable is missing to the browser.
            Self::ConfigurationMissing(_) => "API key not configured".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}
