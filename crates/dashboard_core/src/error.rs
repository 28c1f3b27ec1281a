//! Error taxonomy: validation stays local, transport failures are surfaced,
//! state misuse is reported as an ignored outcome.

use shared::error::{ApiError, ErrorCode, ProtocolError};
use thiserror::Error;

use crate::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Network,
    Unauthorized,
    NotFound,
    Rejected,
    Server,
    Decode,
}

/// Network or server failure during a page fetch or a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    status: Option<u16>,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    /// Builds the error for a non-2xx response. The API's `code` and `message`
    /// win over what the bare status suggests.
    pub fn from_status(status: u16, body: Option<ApiError>) -> Self {
        let kind = match body.as_ref().and_then(|body| body.code) {
            Some(ErrorCode::Unauthorized | ErrorCode::Forbidden) => {
                TransportErrorKind::Unauthorized
            }
            Some(ErrorCode::NotFound) => TransportErrorKind::NotFound,
            Some(ErrorCode::Validation | ErrorCode::RateLimited) => TransportErrorKind::Rejected,
            Some(ErrorCode::Internal) => TransportErrorKind::Server,
            None => match status {
                401 | 403 => TransportErrorKind::Unauthorized,
                404 => TransportErrorKind::NotFound,
                400..=499 => TransportErrorKind::Rejected,
                _ => TransportErrorKind::Server,
            },
        };
        let message = body
            .map(|body| body.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Self {
            kind,
            status: Some(status),
            message,
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn requires_reauth(&self) -> bool {
        self.kind == TransportErrorKind::Unauthorized
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), None);
        }
        if err.is_decode() {
            return Self::new(TransportErrorKind::Decode, err.to_string());
        }
        Self::network(err.to_string())
    }
}

impl From<ProtocolError> for TransportError {
    fn from(err: ProtocolError) -> Self {
        Self::new(TransportErrorKind::Decode, err.to_string())
    }
}

/// Misuse of the list or surface state. Never a fault: the operation is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("list has not been loaded yet")]
    NotLoaded,
    #[error("list is showing a load error; retry first")]
    LoadFailed,
    #[error("a page fetch is already in flight")]
    FetchInFlight,
    #[error("no next page to fetch")]
    NoNextPage,
    #[error("no record is open for editing")]
    NoRecordOpen,
    #[error("surface is closed")]
    SurfaceClosed,
    #[error("surface is read-only until made editable")]
    ReadOnly,
    #[error("a submission is already running on this surface")]
    AlreadySubmitting,
    #[error("delete was not confirmed")]
    DeleteNotConfirmed,
    #[error("record cannot be activated")]
    CannotActivate,
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<FieldErrors> for DashboardError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
