//! Error types for settings construction

use thiserror::Error;

/// Result type alias using our SettingsError
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors raised while validating and assembling node settings.
///
/// Every variant is fatal to construction: no partial settings value is ever
/// produced, and the bootstrap is expected to report the message and stop.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required field is missing or structurally invalid on its own.
    #[error("invalid setting `{field}`: {reason}")]
    InvalidConfiguration {
        /// Parameter name as documented on the configuration surface
        field: &'static str,
        /// What makes the supplied value unacceptable
        reason: String,
    },

    /// Fields that are valid individually but incompatible together.
    #[error("configuration conflict: {detail}")]
    ConfigurationConflict {
        /// The limit or cross-field condition that was violated
        detail: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SettingsError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(detail: impl Into<String>) -> Self {
        SettingsError::ConfigurationConflict {
            detail: detail.into(),
        }
    }

    /// The offending parameter name, if this is a per-field violation.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SettingsError::InvalidConfiguration { field, .. } => Some(field),
            SettingsError::ConfigurationConflict { .. } => None,
        }
    }
}
