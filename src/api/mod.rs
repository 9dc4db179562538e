//! Remote control-plane API surface.
//!
//! The provider never signs or sends AWS requests itself. It is handed
//! implementations of [`IotAnalyticsApi`] and [`GreengrassApi`] at
//! construction time and only ever talks to AWS through them. The DTOs mirror
//! the AWS request and response shapes (PascalCase on the wire) so an SDK
//! adapter can pass them through unchanged.

pub mod greengrass;
pub mod iotanalytics;

pub use greengrass::GreengrassApi;
pub use iotanalytics::IotAnalyticsApi;

use thiserror::Error;

/// Broad category of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The addressed entity does not exist.
    NotFound,
    /// An entity with the same identity already exists.
    AlreadyExists,
    /// The request was rejected as malformed or semantically invalid.
    InvalidRequest,
    /// The caller is not allowed to perform the call, including roles
    /// that cannot be assumed yet.
    AccessDenied,
    /// The call was rate limited.
    Throttling,
    /// The service is temporarily unavailable.
    Unavailable,
    /// The service failed internally.
    Internal,
    /// Anything else.
    Other,
}

/// A failed remote call, carrying the service error code and message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Category used for status mapping.
    pub kind: ApiErrorKind,
    /// Service error code, e.g. `ResourceNotFoundException`.
    pub code: String,
    /// Human-readable message returned by the service.
    pub message: String,
}

impl ApiError {
    /// Create an error with an explicit kind and code.
    pub fn new(kind: ApiErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// `ResourceNotFoundException`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, "ResourceNotFoundException", message)
    }

    /// `ResourceAlreadyExistsException`.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorKind::AlreadyExists,
            "ResourceAlreadyExistsException",
            message,
        )
    }

    /// `InvalidRequestException`.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidRequest, "InvalidRequestException", message)
    }

    /// `AccessDeniedException`.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::AccessDenied, "AccessDeniedException", message)
    }

    /// `ThrottlingException`.
    pub fn throttling(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Throttling, "ThrottlingException", message)
    }

    /// `ServiceUnavailableException`.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorKind::Unavailable,
            "ServiceUnavailableException",
            message,
        )
    }

    /// `InternalFailureException`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, "InternalFailureException", message)
    }

    /// Whether the addressed entity is already gone.
    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}
