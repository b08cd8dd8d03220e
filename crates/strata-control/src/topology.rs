// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Topology planning: validation, role assignment, naming, placement.
//!
//! The planner is a pure function from a create request to the full list
//! of node assignments. It performs no I/O; every rejection happens here,
//! before the orchestrator writes a single record.

use serde::{Deserialize, Serialize};

use crate::config::FormationConfig;
use crate::error::ValidationError;

/// Name token of the single storage replication group. Storage node
/// names embed this token instead of a role label.
pub const REPLICA_SET_NAME: &str = "rs1";

/// A cluster create request, as accepted by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Cluster name; prefix for every node name.
    pub name: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Datastore version identifier.
    pub datastore_version: String,
    /// Requested storage instances. Count must equal the replica factor.
    pub instances: Vec<InstanceSpec>,
    /// Role-count overrides.
    pub extended: ExtendedProperties,
    /// Optional locality hint, passed through to the provisioner.
    pub locality: Option<String>,
    /// Whether the request attached a configuration group. Always
    /// rejected for this datastore.
    pub has_configuration: bool,
}

/// One requested storage instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Compute flavor.
    pub flavor_id: String,
    /// Volume size in GB.
    pub volume_size_gb: u64,
    /// Optional volume type.
    pub volume_type: Option<String>,
    /// Caller-requested availability zone.
    pub availability_zone: Option<String>,
    /// Caller-requested region.
    pub region: Option<String>,
    /// Optional network interface.
    pub nic: Option<String>,
    /// Module ids applied on the node, passed through untouched.
    pub modules: Vec<String>,
}

/// Role-count overrides from the create request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedProperties {
    /// Coordinator count; datastore default when absent.
    pub num_coordinators: Option<u32>,
    /// Router count; datastore default when absent.
    pub num_routers: Option<u32>,
}

/// The role a node plays in the cluster.
///
/// Only storage nodes belong to a replication group, so only the storage
/// case carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum NodeRole {
    /// Metadata coordinator (placement/timestamp service).
    Coordinator,
    /// Stateless SQL router.
    Router,
    /// Storage node belonging to a replication group.
    Storage {
        /// Replication group the node joins.
        replication_group: String,
    },
}

impl NodeRole {
    /// Role label for logs and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Coordinator => "coordinator",
            NodeRole::Router => "router",
            NodeRole::Storage { .. } => "storage",
        }
    }

    /// Replication group, set for storage nodes only.
    pub fn replication_group(&self) -> Option<&str> {
        match self {
            NodeRole::Storage { replication_group } => Some(replication_group),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned node: everything the provisioner needs to request it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Node name, `{cluster}-{token}-{ordinal}`.
    pub name: String,
    /// Node role.
    pub role: NodeRole,
    /// Compute flavor (identical across the cluster).
    pub flavor_id: String,
    /// Volume size in GB.
    pub volume_size_gb: u64,
    /// Optional volume type.
    pub volume_type: Option<String>,
    /// Availability zone; set for storage nodes only.
    pub availability_zone: Option<String>,
    /// Region placement for the node.
    pub region: Option<String>,
    /// Optional network interface.
    pub nic: Option<String>,
    /// Module ids to apply.
    pub modules: Vec<String>,
}

/// Plan the full node set for a cluster create request.
///
/// Returns assignments in provisioning order: coordinators, then
/// routers, then storage.
///
/// Validation, in order:
/// 1. an attached configuration group is unsupported;
/// 2. the storage instance count must equal the replica factor;
/// 3. all instances must share one flavor.
///
/// Naming: coordinators are `{cluster}-pd-{n}`, routers
/// `{cluster}-tidb-{n}`, storage `{cluster}-{rs}-{n}` where `{rs}` is
/// the generated replication-group name. Ordinals are 1-based per role.
///
/// Placement: storage nodes keep the caller's per-instance availability
/// zone and region. Coordinators and routers carry no availability zone;
/// each role group is spread round-robin over the caller's region list,
/// `regions[n % storage_count]` with a 1-based counter restarting per
/// role.
pub fn plan(
    spec: &ClusterSpec,
    config: &FormationConfig,
) -> Result<Vec<RoleAssignment>, ValidationError> {
    if spec.has_configuration {
        return Err(ValidationError::UnsupportedConfiguration);
    }

    if spec.instances.len() != config.replica_factor {
        return Err(ValidationError::InvalidInstanceCount {
            expected: config.replica_factor,
            actual: spec.instances.len(),
        });
    }

    let template = &spec.instances[0];
    if spec
        .instances
        .iter()
        .any(|i| i.flavor_id != template.flavor_id)
    {
        return Err(ValidationError::HeterogeneousCluster);
    }

    let num_coordinators = spec
        .extended
        .num_coordinators
        .unwrap_or(config.default_coordinators) as usize;
    let num_routers = spec
        .extended
        .num_routers
        .unwrap_or(config.default_routers) as usize;

    let regions: Vec<Option<String>> = spec.instances.iter().map(|i| i.region.clone()).collect();

    let mut assignments =
        Vec::with_capacity(num_coordinators + num_routers + spec.instances.len());

    // Each role group spreads over the caller's regions with its own
    // 1-based counter, so a 3-node group over 3 regions lands on
    // regions[1], regions[2], regions[0].
    for n in 1..=num_coordinators {
        assignments.push(RoleAssignment {
            name: format!("{}-pd-{}", spec.name, n),
            role: NodeRole::Coordinator,
            flavor_id: template.flavor_id.clone(),
            volume_size_gb: template.volume_size_gb,
            volume_type: template.volume_type.clone(),
            availability_zone: None,
            region: regions[n % regions.len()].clone(),
            nic: template.nic.clone(),
            modules: template.modules.clone(),
        });
    }

    for n in 1..=num_routers {
        assignments.push(RoleAssignment {
            name: format!("{}-tidb-{}", spec.name, n),
            role: NodeRole::Router,
            flavor_id: template.flavor_id.clone(),
            volume_size_gb: template.volume_size_gb,
            volume_type: template.volume_type.clone(),
            availability_zone: None,
            region: regions[n % regions.len()].clone(),
            nic: template.nic.clone(),
            modules: template.modules.clone(),
        });
    }

    for (i, instance) in spec.instances.iter().enumerate() {
        assignments.push(RoleAssignment {
            name: format!("{}-{}-{}", spec.name, REPLICA_SET_NAME, i + 1),
            role: NodeRole::Storage {
                replication_group: REPLICA_SET_NAME.to_string(),
            },
            flavor_id: instance.flavor_id.clone(),
            volume_size_gb: instance.volume_size_gb,
            volume_type: instance.volume_type.clone(),
            availability_zone: instance.availability_zone.clone(),
            region: instance.region.clone(),
            nic: instance.nic.clone(),
            modules: instance.modules.clone(),
        });
    }

    Ok(assignments)
}
