// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! State store for clusters and their member instances.
//!
//! The orchestrator is the single writer for a cluster's records; readers
//! (status queries, the readiness poller) only observe. A cluster is
//! `Active` iff every instance reached `Ready` and every
//! role-configuration call succeeded.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::topology::NodeRole;

pub use memory::MemoryStateStore;
pub use postgres::PostgresStateStore;

/// State store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced cluster does not exist.
    #[error("Cluster not found: {0}")]
    ClusterNotFound(Uuid),

    /// Referenced instance does not exist.
    #[error("Instance not found: {0}")]
    InstanceNotFound(Uuid),

    /// Stored value could not be interpreted.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Cluster-level task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterTaskStatus {
    /// Initial formation in progress.
    BuildingInitial,
    /// Formation completed; all nodes ready and configured.
    Active,
    /// Formation (or a later operation) failed. Terminal.
    Failed,
    /// Grow in progress. Reachable from `Active` only.
    Growing,
    /// Shrink in progress. Reachable from `Active` only.
    Shrinking,
}

impl ClusterTaskStatus {
    /// Stable string form used in persistence and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterTaskStatus::BuildingInitial => "building_initial",
            ClusterTaskStatus::Active => "active",
            ClusterTaskStatus::Failed => "failed",
            ClusterTaskStatus::Growing => "growing",
            ClusterTaskStatus::Shrinking => "shrinking",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "building_initial" => Ok(ClusterTaskStatus::BuildingInitial),
            "active" => Ok(ClusterTaskStatus::Active),
            "failed" => Ok(ClusterTaskStatus::Failed),
            "growing" => Ok(ClusterTaskStatus::Growing),
            "shrinking" => Ok(ClusterTaskStatus::Shrinking),
            other => Err(StoreError::Corrupt(format!(
                "unknown cluster task status: {other}"
            ))),
        }
    }
}

/// Per-instance service status, as reported by the provisioning backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Node requested; guest not yet reporting ready.
    Building,
    /// Guest is up and reachable.
    Ready,
    /// Node failed. Terminal.
    Failed,
}

impl ServiceStatus {
    /// Stable string form used in persistence and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Building => "building",
            ServiceStatus::Ready => "ready",
            ServiceStatus::Failed => "failed",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "building" => Ok(ServiceStatus::Building),
            "ready" => Ok(ServiceStatus::Ready),
            "failed" => Ok(ServiceStatus::Failed),
            other => Err(StoreError::Corrupt(format!(
                "unknown service status: {other}"
            ))),
        }
    }
}

/// A cluster record.
#[derive(Debug, Clone)]
pub struct ClusterRecord {
    /// Cluster id.
    pub id: Uuid,
    /// Cluster name; prefix for node names.
    pub name: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Datastore version identifier.
    pub datastore_version: String,
    /// Current task status.
    pub task_status: ClusterTaskStatus,
    /// When the cluster was created.
    pub created_at: DateTime<Utc>,
}

impl ClusterRecord {
    /// New cluster in the initial building state.
    pub fn new(name: &str, tenant_id: &str, datastore_version: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tenant_id: tenant_id.to_string(),
            datastore_version: datastore_version.to_string(),
            task_status: ClusterTaskStatus::BuildingInitial,
            created_at: Utc::now(),
        }
    }
}

/// A cluster member instance record.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    /// Instance id.
    pub id: Uuid,
    /// Owning cluster.
    pub cluster_id: Uuid,
    /// Node name, `{cluster}-{token}-{ordinal}`.
    pub name: String,
    /// Node role; carries the replication group for storage nodes.
    pub role: NodeRole,
    /// Current service status.
    pub service_status: ServiceStatus,
    /// Compute flavor.
    pub flavor_id: String,
    /// Availability zone; set for storage nodes only.
    pub availability_zone: Option<String>,
    /// Region placement.
    pub region: Option<String>,
    /// Hostname assigned by the provisioner, set once provisioning
    /// succeeds.
    pub hostname: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// Persistence interface for cluster formation state.
///
/// Backends: PostgreSQL ([`PostgresStateStore`]) for production and an
/// in-memory map ([`MemoryStateStore`]) for tests and embedding.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert a new cluster record.
    async fn create_cluster(&self, cluster: &ClusterRecord) -> Result<()>;

    /// Fetch a cluster by id.
    async fn get_cluster(&self, cluster_id: Uuid) -> Result<Option<ClusterRecord>>;

    /// List clusters, optionally filtered by tenant.
    async fn list_clusters(&self, tenant_id: Option<&str>) -> Result<Vec<ClusterRecord>>;

    /// Update a cluster's task status.
    async fn set_cluster_task_status(
        &self,
        cluster_id: Uuid,
        status: ClusterTaskStatus,
    ) -> Result<()>;

    /// Insert a new instance record.
    async fn create_instance(&self, instance: &InstanceRecord) -> Result<()>;

    /// All instances of a cluster as a single consistent snapshot,
    /// ordered by creation.
    async fn instances_for_cluster(&self, cluster_id: Uuid) -> Result<Vec<InstanceRecord>>;

    /// Update one instance's service status.
    async fn set_instance_service_status(
        &self,
        instance_id: Uuid,
        status: ServiceStatus,
    ) -> Result<()>;

    /// Record the hostname assigned by the provisioner.
    async fn set_instance_hostname(&self, instance_id: Uuid, hostname: &str) -> Result<()>;

    /// Mark every instance of a cluster as failed, ready ones included.
    /// Returns the number of instances updated.
    async fn fail_cluster_instances(&self, cluster_id: Uuid) -> Result<u64>;

    /// Backend liveness probe.
    async fn health_check(&self) -> Result<bool>;
}
