// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Guest configuration trait and errors.

use async_trait::async_trait;
use thiserror::Error;

use crate::store::InstanceRecord;

/// Errors from role-configuration calls.
#[derive(Debug, Error)]
pub enum GuestError {
    /// The guest does not speak the requested API version.
    #[error("guest does not support API version {0}")]
    UnsupportedApiVersion(u32),

    /// The guest refused the configuration.
    #[error("guest rejected configuration: {0}")]
    Rejected(String),

    /// The guest could not be reached or the call timed out.
    #[error("guest transport error: {0}")]
    Transport(String),
}

/// Issues role-configuration calls to guest agents.
///
/// Each method is one call to one node. Callers guarantee the node has a
/// hostname and is `Ready` before configuring it.
#[async_trait]
pub trait RoleConfigurator: Send + Sync {
    /// Bind a coordinator to its peer set.
    async fn configure_coordinator(
        &self,
        node: &InstanceRecord,
        peer_endpoints: &[String],
    ) -> Result<(), GuestError>;

    /// Point a router at the coordinator set.
    async fn configure_router(
        &self,
        node: &InstanceRecord,
        coordinator_endpoints: &[String],
    ) -> Result<(), GuestError>;

    /// Join a storage node to its replication group. Idempotent for the
    /// same group name; guests reject a different one.
    async fn configure_storage(
        &self,
        node: &InstanceRecord,
        replica_set_name: &str,
        coordinator_endpoints: &[String],
    ) -> Result<(), GuestError>;
}
