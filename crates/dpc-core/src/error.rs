//! Error types for device-policy operations.
//!
//! Every operation on the coordination core resolves to a definite
//! success/failure result at its boundary; none of these errors propagate as
//! fatal process-level failures. Callers that bridge to a boolean surface map
//! through [`PolicyError::code`].

use crate::capability::{CapabilityTier, GatedOperation};

/// Errors produced by privilege, lock, and launcher operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// The application is not the designated device-owner-class app.
    ///
    /// Permanent until the device is reconfigured externally; callers should
    /// not retry.
    #[error("application is not the designated device owner")]
    NotEligible,

    /// The operation requires a platform capability tier the device does not
    /// meet. Permanent for this process.
    #[error("operation {operation:?} requires capability tier {required:?}, device reports {actual:?}")]
    CapabilityUnsupported {
        /// The gated operation that was attempted.
        operation: GatedOperation,
        /// Minimum tier the operation requires.
        required: CapabilityTier,
        /// Tier the device actually reports.
        actual: CapabilityTier,
    },

    /// A platform primitive refused the call at the boundary.
    ///
    /// Transient; safe to retry once the refusing condition clears.
    #[error("platform primitive refused: {message}")]
    PrimitiveRefused {
        /// Description of the refusal from the platform boundary.
        message: String,
    },

    /// No foreground surface is attached to operate on.
    ///
    /// The caller should retry once a surface attaches.
    #[error("no foreground surface is attached")]
    SurfaceUnavailable,
}

impl PolicyError {
    /// Stable machine-readable code for bridge responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotEligible => "NOT_ELIGIBLE",
            Self::CapabilityUnsupported { .. } => "CAPABILITY_UNSUPPORTED",
            Self::PrimitiveRefused { .. } => "PRIMITIVE_REFUSED",
            Self::SurfaceUnavailable => "SURFACE_UNAVAILABLE",
        }
    }

    /// Convenience constructor for primitive refusals.
    #[must_use]
    pub fn refused(message: impl Into<String>) -> Self {
        Self::PrimitiveRefused {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(PolicyError::NotEligible.code(), "NOT_ELIGIBLE");
        assert_eq!(PolicyError::SurfaceUnavailable.code(), "SURFACE_UNAVAILABLE");
        assert_eq!(PolicyError::refused("busy").code(), "PRIMITIVE_REFUSED");
        let err = PolicyError::CapabilityUnsupported {
            operation: GatedOperation::EnterLockTask,
            required: CapabilityTier::TaskPinning,
            actual: CapabilityTier::Legacy,
        };
        assert_eq!(err.code(), "CAPABILITY_UNSUPPORTED");
    }

    #[test]
    fn test_display_mentions_operation() {
        let err = PolicyError::CapabilityUnsupported {
            operation: GatedOperation::ScopedWipeReason,
            required: CapabilityTier::AuditedWipe,
            actual: CapabilityTier::TaskPinning,
        };
        assert!(err.to_string().contains("ScopedWipeReason"));
    }
}
