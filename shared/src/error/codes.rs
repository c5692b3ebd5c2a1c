//! Unified error codes for the catalog sync service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 3xxx: Integration errors (merchant scope / inventory credentials)
//! - 4xxx: Sync job errors
//! - 6xxx: Catalog errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Required field missing
    RequiredField = 7,

    // ==================== 3xxx: Integration ====================
    /// No integration record for the merchant scope
    IntegrationNotFound = 3001,
    /// Integration exists but is disabled
    IntegrationDisabled = 3002,
    /// No access credential / organization id available
    CredentialsMissing = 3003,
    /// The inventory system rejected the credential
    CredentialsRejected = 3004,

    // ==================== 4xxx: Sync ====================
    /// Sync job not found
    SyncJobNotFound = 4001,
    /// Sync queue is full
    SyncQueueFull = 4002,
    /// Inventory source returned an error
    SourceFetchFailed = 4003,
    /// Inventory fetch exceeded its deadline
    SourceDeadlineExceeded = 4004,

    // ==================== 6xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 6001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// System busy (retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::RequiredField => "Required field is missing",

            // Integration
            ErrorCode::IntegrationNotFound => "No inventory integration found",
            ErrorCode::IntegrationDisabled => "Inventory integration is disabled",
            ErrorCode::CredentialsMissing => "Inventory credentials are missing",
            ErrorCode::CredentialsRejected => "Inventory credentials were rejected",

            // Sync
            ErrorCode::SyncJobNotFound => "Sync job not found",
            ErrorCode::SyncQueueFull => "Sync queue is full, please retry later",
            ErrorCode::SourceFetchFailed => "Inventory source request failed",
            ErrorCode::SourceDeadlineExceeded => "Inventory fetch exceeded its deadline",

            // Catalog
            ErrorCode::ProductNotFound => "Product not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            7 => Ok(ErrorCode::RequiredField),

            // Integration
            3001 => Ok(ErrorCode::IntegrationNotFound),
            3002 => Ok(ErrorCode::IntegrationDisabled),
            3003 => Ok(ErrorCode::CredentialsMissing),
            3004 => Ok(ErrorCode::CredentialsRejected),

            // Sync
            4001 => Ok(ErrorCode::SyncJobNotFound),
            4002 => Ok(ErrorCode::SyncQueueFull),
            4003 => Ok(ErrorCode::SourceFetchFailed),
            4004 => Ok(ErrorCode::SourceDeadlineExceeded),

            // Catalog
            6001 => Ok(ErrorCode::ProductNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
