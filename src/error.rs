//! Error types for the IoT provider.

use thiserror::Error;

use crate::api::{ApiError, ApiErrorKind};

/// Errors surfaced to the host.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The attribute bag could not be decoded into the resource model.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider configuration was rejected.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The host sent a request the provider cannot act on.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operation is not supported.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// A remote call failed. The service error is reported unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A JSON payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The gRPC server failed.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Binding or inspecting the listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err {
            ProviderError::Validation(_) | ProviderError::InvalidRequest(_) => {
                tonic::Status::invalid_argument(message)
            },
            ProviderError::Serialization(_) => tonic::Status::invalid_argument(message),
            ProviderError::Configuration(_) => tonic::Status::failed_precondition(message),
            ProviderError::UnknownResource(_) => tonic::Status::not_found(message),
            ProviderError::Unimplemented(_) => tonic::Status::unimplemented(message),
            ProviderError::Transport(_) | ProviderError::Io(_) => {
                tonic::Status::unavailable(message)
            },
            ProviderError::Api(api) => match api.kind {
                ApiErrorKind::NotFound => tonic::Status::not_found(message),
                ApiErrorKind::AlreadyExists => tonic::Status::already_exists(message),
                ApiErrorKind::InvalidRequest => tonic::Status::invalid_argument(message),
                ApiErrorKind::AccessDenied => tonic::Status::permission_denied(message),
                ApiErrorKind::Throttling => tonic::Status::resource_exhausted(message),
                ApiErrorKind::Unavailable => tonic::Status::unavailable(message),
                ApiErrorKind::Internal | ApiErrorKind::Other => tonic::Status::internal(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::UnknownResource("aws_iot_thing".to_string());
        assert_eq!(err.to_string(), "Unknown resource type: aws_iot_thing");

        let err = ProviderError::InvalidRequest("state has no id".to_string());
        assert_eq!(err.to_string(), "Invalid request: state has no id");
    }

    #[test]
    fn test_api_error_is_transparent() {
        let err: ProviderError = ApiError::access_denied("Unable to assume role").into();
        assert_eq!(err.to_string(), "AccessDeniedException: Unable to assume role");
    }

    #[test]
    fn test_error_to_status() {
        let cases = [
            (
                ProviderError::Validation("x".to_string()),
                tonic::Code::InvalidArgument,
            ),
            (
                ProviderError::Configuration("x".to_string()),
                tonic::Code::FailedPrecondition,
            ),
            (
                ProviderError::UnknownResource("x".to_string()),
                tonic::Code::NotFound,
            ),
            (
                ProviderError::Unimplemented("x".to_string()),
                tonic::Code::Unimplemented,
            ),
            (
                ApiError::not_found("x").into(),
                tonic::Code::NotFound,
            ),
            (
                ApiError::already_exists("x").into(),
                tonic::Code::AlreadyExists,
            ),
            (
                ApiError::access_denied("x").into(),
                tonic::Code::PermissionDenied,
            ),
            (
                ApiError::throttling("x").into(),
                tonic::Code::ResourceExhausted,
            ),
            (ApiError::internal("x").into(), tonic::Code::Internal),
        ];

        for (err, code) in cases {
            let status: tonic::Status = err.into();
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_status_message_keeps_service_code() {
        let err: ProviderError = ApiError::invalid_request("bad bucket").into();
        let status: tonic::Status = err.into();
        assert_eq!(status.message(), "InvalidRequestException: bad bucket");
    }
}
