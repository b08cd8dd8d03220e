// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provisioning trait and request/response types.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::topology::NodeRole;

/// Provisioning errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Tenant quota would be exceeded by this node.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Requested flavor does not exist on the backend.
    #[error("Flavor not found: {0}")]
    FlavorNotFound(String),

    /// Backend request failed.
    #[error("Provisioning backend error: {0}")]
    Backend(String),
}

/// Everything a backend needs to create one cluster node.
#[derive(Debug, Clone)]
pub struct NodeRequest {
    /// Instance record id, already persisted as `building`.
    pub instance_id: Uuid,
    /// Owning cluster.
    pub cluster_id: Uuid,
    /// Node name, also used as the machine hostname.
    pub name: String,
    /// Role the node will serve.
    pub role: NodeRole,
    /// Compute flavor.
    pub flavor_id: String,
    /// Data volume size in GiB.
    pub volume_size_gb: u64,
    /// Volume type, backend-specific.
    pub volume_type: Option<String>,
    /// Placement zone, if pinned.
    pub availability_zone: Option<String>,
    /// Placement region, if pinned.
    pub region: Option<String>,
    /// Network attachment, backend-specific.
    pub nic: Option<String>,
    /// Guest modules to apply at boot.
    pub modules: Vec<String>,
    /// Locality hint for the whole cluster.
    pub locality: Option<String>,
}

/// Result of a successful provisioning call.
#[derive(Debug, Clone)]
pub struct ProvisionedNode {
    /// The instance this node backs.
    pub instance_id: Uuid,
    /// Hostname the guest is reachable at.
    pub hostname: String,
}

/// Creates cluster nodes on some infrastructure backend.
///
/// `create_node` returns once the node is *requested*; readiness is
/// reported asynchronously through the state store and observed by the
/// readiness poller.
#[async_trait]
pub trait NodeProvisioner: Send + Sync {
    /// Short backend identifier for logs.
    fn provisioner_type(&self) -> &'static str;

    /// Request one node. Must not block until the node is ready.
    async fn create_node(
        &self,
        request: &NodeRequest,
    ) -> Result<ProvisionedNode, ProvisionError>;
}
