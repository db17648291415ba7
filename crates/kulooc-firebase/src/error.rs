//! Error types for Firebase REST operations.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Result alias for Firebase operations.
pub type FirebaseResult<T> = Result<T, FirebaseError>;

/// Primary error type for credential, token, and REST failures.
#[derive(Debug, Error)]
pub enum FirebaseError {
    /// The service-account file does not exist.
    #[error("credential file not found: {}", path.display())]
    CredentialMissing {
        /// Path that was probed.
        path: PathBuf,
    },
    /// The service-account file exists but could not be read.
    #[error("failed to read credential file {}", path.display())]
    CredentialRead {
        /// Path of the credential file.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The service-account file is not a valid key document.
    #[error("invalid credential file {}: {source}", path.display())]
    CredentialParse {
        /// Path of the credential file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The private key could not be loaded or the assertion could not be signed.
    #[error("failed to sign token assertion: {source}")]
    SigningKey {
        /// Underlying JWT error.
        source: jsonwebtoken::errors::Error,
    },
    /// The token endpoint rejected the assertion.
    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange {
        /// HTTP status returned by the token endpoint.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },
    /// A request could not be sent or its body could not be read.
    #[error("request for {operation} failed: {source}")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// The API answered with a non-success status.
    #[error("{operation} returned {status}: {}", message.as_deref().unwrap_or(body.as_str()))]
    Api {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code.
        status: StatusCode,
        /// Canonical status from the Google error envelope (e.g. `ALREADY_EXISTS`).
        api_status: Option<String>,
        /// Error message from the Google error envelope.
        message: Option<String>,
        /// Raw response body.
        body: String,
    },
    /// A success response did not have the expected shape.
    #[error("unexpected response for {operation}: {source}")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// A Firestore value could not be converted.
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue {
        /// Field path that failed conversion.
        field: String,
        /// Reason for the failure.
        reason: &'static str,
    },
    /// A configured endpoint is not a usable base URL.
    #[error("invalid endpoint URL '{value}': {source}")]
    InvalidUrl {
        /// Offending URL text.
        value: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
}

/// Coarse classification of API failures callers branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    /// The resource already exists.
    AlreadyExists,
    /// The caller lacks the IAM permission for the call.
    PermissionDenied,
    /// The resource does not exist.
    NotFound,
    /// Any other failure, carrying the canonical status when known.
    Other(Option<String>),
}

impl ApiStatus {
    /// Classify a canonical status string, falling back to the HTTP status.
    #[must_use]
    pub fn classify(api_status: Option<&str>, status: StatusCode) -> Self {
        match api_status {
            Some("ALREADY_EXISTS") => Self::AlreadyExists,
            Some("PERMISSION_DENIED") => Self::PermissionDenied,
            Some("NOT_FOUND") => Self::NotFound,
            Some(other) => Self::Other(Some(other.to_string())),
            None => match status {
                StatusCode::CONFLICT => Self::AlreadyExists,
                StatusCode::FORBIDDEN => Self::PermissionDenied,
                StatusCode::NOT_FOUND => Self::NotFound,
                _ => Self::Other(None),
            },
        }
    }
}

impl FirebaseError {
    /// Classification of an [`FirebaseError::Api`] failure; `None` for other variants.
    #[must_use]
    pub fn api_status(&self) -> Option<ApiStatus> {
        match self {
            Self::Api {
                status, api_status, ..
            } => Some(ApiStatus::classify(api_status.as_deref(), *status)),
            _ => None,
        }
    }

    /// Build an API error from a failed response body.
    pub(crate) fn from_response(operation: &'static str, status: StatusCode, body: String) -> Self {
        let envelope = serde_json::from_str::<ErrorEnvelope>(&body).ok();
        let (api_status, message) = envelope
            .map(|envelope| (envelope.error.status, envelope.error.message))
            .unwrap_or_default();
        Self::Api {
            operation,
            status,
            api_status,
            message,
            body,
        }
    }
}

/// Google's JSON error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}
