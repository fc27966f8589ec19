//! Backend response envelope.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Standard `{success, data, message}` envelope returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Payload, present on success.
    #[serde(default)]
    pub data: Option<T>,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Build a successful envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Unwrap the payload or turn the envelope into an external-service error.
    pub fn into_result(self) -> Result<T, AppError> {
        if !self.success {
            return Err(AppError::external_service(
                self.message
                    .unwrap_or_else(|| "Backend reported failure".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| AppError::external_service("Backend response missing data"))
    }
}
