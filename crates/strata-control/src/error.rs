// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for strata-control.

use thiserror::Error;
use uuid::Uuid;

/// Control plane errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Create request rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// State store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Node provisioning failed. Fatal for the formation; remaining
    /// provisioning calls are not attempted.
    #[error("Provision error: {0}")]
    Provision(#[from] crate::provisioner::ProvisionError),

    /// A guest rejected or failed a role-configuration call.
    #[error("Guest error: {0}")]
    Guest(#[from] crate::configurator::GuestError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An instance failed before the cluster settled.
    #[error("Cluster {0} has a failed instance")]
    InstanceFailed(Uuid),

    /// Not every instance became ready before the formation deadline.
    #[error("Cluster {cluster_id} readiness timed out after {deadline_secs}s")]
    ReadinessTimeout {
        /// Cluster whose formation timed out.
        cluster_id: Uuid,
        /// The deadline that expired, in seconds.
        deadline_secs: u64,
    },

    /// The overall formation budget expired during role configuration.
    #[error("Cluster {0} formation deadline exceeded")]
    DeadlineExceeded(Uuid),

    /// The formation task was cancelled through its handle.
    #[error("Cluster {0} formation cancelled")]
    FormationCancelled(Uuid),

    /// Cluster was not found.
    #[error("Cluster not found: {0}")]
    ClusterNotFound(Uuid),

    /// The requested operation is not implemented for this datastore.
    #[error("Operation not supported: {0}")]
    OperationNotSupported(&'static str),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type using the control plane Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejections raised by the topology planner. All of these are surfaced
/// synchronously, before any record is written or node requested.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A configuration object was attached to the create request. This
    /// datastore derives node configuration from roles, not from
    /// cluster-level configuration groups.
    #[error("cluster-level configuration is not supported for this datastore")]
    UnsupportedConfiguration,

    /// The requested storage instance count does not match the replica
    /// factor.
    #[error("storage cluster requires exactly {expected} instances, got {actual}")]
    InvalidInstanceCount {
        /// Required count (the replica factor).
        expected: usize,
        /// Count in the request.
        actual: usize,
    },

    /// Requested instances do not share a single flavor.
    #[error("all cluster instances must use the same flavor")]
    HeterogeneousCluster,
}

impl Error {
    /// Stable machine-readable code for the wire surface.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(ValidationError::UnsupportedConfiguration) => {
                "UNSUPPORTED_CONFIGURATION"
            }
            Error::Validation(ValidationError::InvalidInstanceCount { .. }) => {
                "INVALID_INSTANCE_COUNT"
            }
            Error::Validation(ValidationError::HeterogeneousCluster) => "HETEROGENEOUS_CLUSTER",
            Error::Provision(_) => "PROVISION_FAILED",
            Error::Guest(crate::configurator::GuestError::UnsupportedApiVersion(_)) => {
                "UNSUPPORTED_API_VERSION"
            }
            Error::Guest(crate::configurator::GuestError::Rejected(_)) => "CONFIGURATION_REJECTED",
            Error::Guest(_) => "GUEST_TRANSPORT",
            Error::InstanceFailed(_) => "INSTANCE_FAILED",
            Error::ReadinessTimeout { .. } => "READINESS_TIMEOUT",
            Error::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            Error::FormationCancelled(_) => "FORMATION_CANCELLED",
            Error::ClusterNotFound(_) => "CLUSTER_NOT_FOUND",
            Error::OperationNotSupported(_) => "OPERATION_NOT_SUPPORTED",
            _ => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidInstanceCount {
            expected: 3,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "storage cluster requires exactly 3 instances, got 5"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::Validation(ValidationError::HeterogeneousCluster).code(),
            "HETEROGENEOUS_CLUSTER"
        );
        assert_eq!(
            Error::OperationNotSupported("grow").code(),
            "OPERATION_NOT_SUPPORTED"
        );
        assert_eq!(
            Error::ReadinessTimeout {
                cluster_id: Uuid::nil(),
                deadline_secs: 1800,
            }
            .code(),
            "READINESS_TIMEOUT"
        );
        assert_eq!(Error::InstanceFailed(Uuid::nil()).code(), "INSTANCE_FAILED");
    }
}
