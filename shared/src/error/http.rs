//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::IntegrationNotFound
            | Self::SyncJobNotFound
            | Self::ProductNotFound => StatusCode::NOT_FOUND,

            // 403 Forbidden
            Self::IntegrationDisabled => StatusCode::FORBIDDEN,

            // 502 Bad Gateway (upstream inventory system)
            Self::SourceFetchFailed | Self::CredentialsRejected => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::SourceDeadlineExceeded | Self::SyncQueueFull | Self::SystemBusy => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
