//! Platform capability tiers and the operation gating matrix.
//!
//! Device-management surfaces vary by platform generation. Rather than
//! scattering version conditionals through the coordinators, every restricted
//! operation declares its minimum [`CapabilityTier`] here, and callers check
//! the single matrix. The tier is an ordinal proxy for the platform version:
//! it is queried from the backend once, at construction, and never changes
//! for the lifetime of the process.
//!
//! ```text
//! Legacy < OwnershipQuery < TaskPinning < RuntimePolicy
//!        < CredentialTokens < AuditedWipe
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Ordered platform capability tier.
///
/// Tiers are cumulative: a device at a given tier supports every operation
/// gated at that tier or below.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTier {
    /// Baseline platform with no device-management surface.
    Legacy,
    /// The device-owner designation can be queried.
    OwnershipQuery,
    /// Task pinning, persistent preferred activities, and application/user
    /// restriction bundles.
    TaskPinning,
    /// Runtime policy toggles (keyguard, camera) and lock-task mode queries.
    RuntimePolicy,
    /// Credential-reset tokens and consent-free provisioning.
    CredentialTokens,
    /// Scoped wipe carrying an audit reason.
    AuditedWipe,
}

/// Restricted operations gated by platform capability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum GatedOperation {
    /// Query whether this application holds the device-owner designation.
    OwnerQuery,
    /// Pin the foreground task to this application.
    EnterLockTask,
    /// Register a persistent preferred activity for an intent category set.
    RegisterPreferredActivity,
    /// Apply or read an application restriction bundle.
    ApplicationRestrictions,
    /// Add or clear user restrictions.
    UserRestrictions,
    /// Disable or re-enable screen capture.
    ScreenCaptureToggle,
    /// Disable or re-enable the keyguard.
    KeyguardToggle,
    /// Disable or re-enable the camera.
    CameraToggle,
    /// Query whether the foreground task is currently pinned.
    LockTaskModeQuery,
    /// Reset the unlock credential with a pre-provisioned token.
    CredentialReset,
    /// Wipe with an audit reason attached.
    ScopedWipeReason,
}

impl GatedOperation {
    /// Minimum capability tier at which the operation is available.
    #[must_use]
    pub const fn min_tier(self) -> CapabilityTier {
        match self {
            Self::OwnerQuery => CapabilityTier::OwnershipQuery,
            Self::EnterLockTask
            | Self::RegisterPreferredActivity
            | Self::ApplicationRestrictions
            | Self::UserRestrictions
            | Self::ScreenCaptureToggle => CapabilityTier::TaskPinning,
            Self::KeyguardToggle | Self::CameraToggle | Self::LockTaskModeQuery => {
                CapabilityTier::RuntimePolicy
            }
            Self::CredentialReset => CapabilityTier::CredentialTokens,
            Self::ScopedWipeReason => CapabilityTier::AuditedWipe,
        }
    }
}

impl CapabilityTier {
    /// Whether this tier supports the given operation.
    #[must_use]
    pub fn supports(self, operation: GatedOperation) -> bool {
        self >= operation.min_tier()
    }

    /// Checks the gate and produces the capability error on failure.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] when the tier is below
    /// the operation's minimum.
    pub fn require(self, operation: GatedOperation) -> Result<(), PolicyError> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(PolicyError::CapabilityUnsupported {
                operation,
                required: operation.min_tier(),
                actual: self,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered() {
        assert!(CapabilityTier::Legacy < CapabilityTier::OwnershipQuery);
        assert!(CapabilityTier::OwnershipQuery < CapabilityTier::TaskPinning);
        assert!(CapabilityTier::TaskPinning < CapabilityTier::RuntimePolicy);
        assert!(CapabilityTier::RuntimePolicy < CapabilityTier::CredentialTokens);
        assert!(CapabilityTier::CredentialTokens < CapabilityTier::AuditedWipe);
    }

    #[test]
    fn test_support_is_monotonic() {
        let ops = [
            GatedOperation::OwnerQuery,
            GatedOperation::EnterLockTask,
            GatedOperation::RegisterPreferredActivity,
            GatedOperation::ApplicationRestrictions,
            GatedOperation::UserRestrictions,
            GatedOperation::ScreenCaptureToggle,
            GatedOperation::KeyguardToggle,
            GatedOperation::CameraToggle,
            GatedOperation::LockTaskModeQuery,
            GatedOperation::CredentialReset,
            GatedOperation::ScopedWipeReason,
        ];
        // If a tier supports an operation, every higher tier must too.
        let tiers = [
            CapabilityTier::Legacy,
            CapabilityTier::OwnershipQuery,
            CapabilityTier::TaskPinning,
            CapabilityTier::RuntimePolicy,
            CapabilityTier::CredentialTokens,
            CapabilityTier::AuditedWipe,
        ];
        for op in ops {
            let mut seen_supported = false;
            for tier in tiers {
                let supported = tier.supports(op);
                if seen_supported {
                    assert!(supported, "{op:?} support regressed at {tier:?}");
                }
                seen_supported |= supported;
            }
            assert!(seen_supported, "{op:?} unsupported at every tier");
        }
    }

    #[test]
    fn test_lock_task_requires_task_pinning() {
        assert!(!CapabilityTier::OwnershipQuery.supports(GatedOperation::EnterLockTask));
        assert!(CapabilityTier::TaskPinning.supports(GatedOperation::EnterLockTask));
    }

    #[test]
    fn test_require_reports_required_tier() {
        let err = CapabilityTier::Legacy
            .require(GatedOperation::CredentialReset)
            .unwrap_err();
        assert_eq!(
            err,
            PolicyError::CapabilityUnsupported {
                operation: GatedOperation::CredentialReset,
                required: CapabilityTier::CredentialTokens,
                actual: CapabilityTier::Legacy,
            }
        );
    }
}
