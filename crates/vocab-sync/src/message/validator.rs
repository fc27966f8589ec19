//! Frame validation rules.

use vocab_core::error::AppError;

/// Maximum accepted frame size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 65_536;

/// Validates a raw inbound frame before parsing.
pub fn validate_inbound(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_MESSAGE_SIZE {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {} bytes",
            MAX_MESSAGE_SIZE
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates a message type name.
pub fn validate_kind(kind: &str) -> Result<(), AppError> {
    if kind.is_empty() || kind.len() > 64 {
        return Err(AppError::validation("Invalid message type length"));
    }

    if !kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return Err(AppError::validation(
            "Message type contains invalid characters",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_blank_limits() {
        assert!(validate_inbound("{}").is_ok());
        assert!(validate_inbound("  \n").is_err());
        assert!(validate_inbound(&"x".repeat(MAX_MESSAGE_SIZE + 1)).is_err());
    }

    #[test]
    fn test_kind_charset() {
        assert!(validate_kind("menu_updated").is_ok());
        assert!(validate_kind("").is_err());
        assert!(validate_kind("menu updated").is_err());
    }
}
