// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Control protocol handlers.
//!
//! Translate wire requests into orchestrator calls and domain records
//! back into wire responses.

use std::sync::Arc;

use strata_protocol::wire::control;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::orchestrator::ClusterOrchestrator;
use crate::store::{ClusterRecord, InstanceRecord, StateStore};
use crate::topology::{ClusterSpec, ExtendedProperties, InstanceSpec};

/// Shared state for control handlers.
pub struct ControlHandlerState {
    /// Cluster state store, read directly for queries and health.
    pub store: Arc<dyn StateStore>,
    /// Orchestrator driving cluster mutations.
    pub orchestrator: Arc<ClusterOrchestrator>,
    /// Server version string.
    pub version: String,
}

impl ControlHandlerState {
    /// Create handler state over a store and orchestrator.
    pub fn new(store: Arc<dyn StateStore>, orchestrator: Arc<ClusterOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Handle a health check request.
pub async fn handle_health_check(
    state: &ControlHandlerState,
) -> Result<control::HealthCheckResponse> {
    let healthy = state.store.health_check().await.unwrap_or(false);
    Ok(control::HealthCheckResponse {
        healthy,
        version: state.version.clone(),
    })
}

/// Handle a create-cluster request.
///
/// Returns once every node is requested; the response carries the
/// cluster still in its building state. Formation continues in the
/// background and settles the cluster to active or failed.
pub async fn handle_create_cluster(
    state: &ControlHandlerState,
    request: control::CreateClusterRequest,
) -> Result<control::ClusterResponse> {
    let spec = spec_from_wire(request);
    info!(name = %spec.name, tenant = %spec.tenant_id, "create cluster requested");

    let (cluster, handle) = state.orchestrator.create_cluster(spec).await?;
    // The handle is detached on purpose; formation settles the cluster
    // on its own and clients poll GetCluster for the outcome.
    let cluster_id = handle.cluster_id();
    drop(handle);

    let instances = state.store.instances_for_cluster(cluster_id).await?;
    Ok(cluster_to_wire(&cluster, &instances))
}

/// Handle a get-cluster request.
pub async fn handle_get_cluster(
    state: &ControlHandlerState,
    request: control::GetClusterRequest,
) -> Result<control::ClusterResponse> {
    let cluster_id = parse_cluster_id(&request.cluster_id)?;
    let (cluster, instances) = state.orchestrator.cluster_status(cluster_id).await?;
    Ok(cluster_to_wire(&cluster, &instances))
}

/// Handle a list-clusters request.
pub async fn handle_list_clusters(
    state: &ControlHandlerState,
    request: control::ListClustersRequest,
) -> Result<control::ClusterListResponse> {
    let clusters = state
        .orchestrator
        .list_clusters(request.tenant_id.as_deref())
        .await?;

    let mut out = Vec::with_capacity(clusters.len());
    for cluster in &clusters {
        let instances = state.store.instances_for_cluster(cluster.id).await?;
        out.push(cluster_to_wire(cluster, &instances));
    }
    Ok(control::ClusterListResponse { clusters: out })
}

/// Handle a grow-cluster request. Always rejected for this datastore.
pub async fn handle_grow_cluster(
    state: &ControlHandlerState,
    request: control::GrowClusterRequest,
) -> Result<control::AckResponse> {
    let cluster_id = parse_cluster_id(&request.cluster_id)?;
    state
        .orchestrator
        .grow_cluster(cluster_id, request.instances.into_iter().map(spec_item_from_wire).collect())
        .await?;
    Ok(control::AckResponse {
        message: "grow accepted".to_string(),
    })
}

/// Handle a shrink-cluster request. Always rejected for this datastore.
pub async fn handle_shrink_cluster(
    state: &ControlHandlerState,
    request: control::ShrinkClusterRequest,
) -> Result<control::AckResponse> {
    let cluster_id = parse_cluster_id(&request.cluster_id)?;
    let mut instance_ids = Vec::with_capacity(request.instance_ids.len());
    for id in &request.instance_ids {
        instance_ids
            .push(Uuid::parse_str(id).map_err(|e| Error::Other(format!("invalid instance id: {e}")))?);
    }
    state
        .orchestrator
        .shrink_cluster(cluster_id, instance_ids)
        .await?;
    Ok(control::AckResponse {
        message: "shrink accepted".to_string(),
    })
}

fn parse_cluster_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Other(format!("invalid cluster id: {e}")))
}

fn spec_item_from_wire(spec: control::InstanceSpec) -> InstanceSpec {
    InstanceSpec {
        flavor_id: spec.flavor_id,
        volume_size_gb: spec.volume_size_gb,
        volume_type: spec.volume_type,
        availability_zone: spec.availability_zone,
        nic: spec.nic,
        modules: spec.modules,
        region: spec.region,
    }
}

fn spec_from_wire(request: control::CreateClusterRequest) -> ClusterSpec {
    ClusterSpec {
        name: request.name,
        tenant_id: request.tenant_id,
        datastore_version: request.datastore_version,
        instances: request
            .instances
            .into_iter()
            .map(spec_item_from_wire)
            .collect(),
        extended: ExtendedProperties {
            // Zero on the wire means "use the datastore default".
            num_coordinators: (request.num_coordinators > 0).then_some(request.num_coordinators),
            num_routers: (request.num_routers > 0).then_some(request.num_routers),
        },
        locality: request.locality,
        has_configuration: request.has_configuration,
    }
}

fn cluster_to_wire(
    cluster: &ClusterRecord,
    instances: &[InstanceRecord],
) -> control::ClusterResponse {
    control::ClusterResponse {
        cluster_id: cluster.id.to_string(),
        name: cluster.name.clone(),
        tenant_id: cluster.tenant_id.clone(),
        datastore_version: cluster.datastore_version.clone(),
        task_status: cluster.task_status.as_str().to_string(),
        instances: instances.iter().map(instance_to_wire).collect(),
        created_at: cluster.created_at.to_rfc3339(),
    }
}

fn instance_to_wire(instance: &InstanceRecord) -> control::InstanceStatus {
    control::InstanceStatus {
        instance_id: instance.id.to_string(),
        name: instance.name.clone(),
        role: instance.role.as_str().to_string(),
        replication_group: instance.role.replication_group().map(str::to_string),
        service_status: instance.service_status.as_str().to_string(),
        flavor_id: instance.flavor_id.clone(),
        availability_zone: instance.availability_zone.clone(),
        region: instance.region.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormationConfig;
    use crate::configurator::MockConfigurator;
    use crate::provisioner::MockProvisioner;
    use crate::store::MemoryStateStore;

    fn state() -> ControlHandlerState {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let provisioner = Arc::new(MockProvisioner::new(Arc::clone(&store)));
        let configurator = Arc::new(MockConfigurator::new());
        let orchestrator = Arc::new(ClusterOrchestrator::new(
            Arc::clone(&store),
            provisioner,
            configurator,
            FormationConfig::default(),
        ));
        ControlHandlerState::new(store, orchestrator)
    }

    fn create_request() -> control::CreateClusterRequest {
        control::CreateClusterRequest {
            name: "orders".to_string(),
            tenant_id: "t-1".to_string(),
            datastore_version: "7.5".to_string(),
            instances: (0..3)
                .map(|_| control::InstanceSpec {
                    flavor_id: "m1.large".to_string(),
                    volume_size_gb: 100,
                    volume_type: None,
                    availability_zone: None,
                    nic: None,
                    modules: vec![],
                    region: None,
                })
                .collect(),
            num_coordinators: 0,
            num_routers: 0,
            locality: None,
            has_configuration: false,
        }
    }

    #[tokio::test]
    async fn test_health_check_reports_version() {
        let state = state();
        let health = handle_health_check(&state).await.unwrap();
        assert!(health.healthy);
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_create_cluster_returns_building() {
        let state = state();
        let response = handle_create_cluster(&state, create_request())
            .await
            .unwrap();
        assert_eq!(response.task_status, "building_initial");
        // 3 coordinators + 2 routers + 3 storage
        assert_eq!(response.instances.len(), 8);
    }

    #[tokio::test]
    async fn test_create_cluster_validation_surfaces_code() {
        let state = state();
        let mut request = create_request();
        request.instances.truncate(2);
        let err = handle_create_cluster(&state, request).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INSTANCE_COUNT");
    }

    #[tokio::test]
    async fn test_grow_rejected() {
        let state = state();
        let response = handle_create_cluster(&state, create_request())
            .await
            .unwrap();
        let err = handle_grow_cluster(
            &state,
            control::GrowClusterRequest {
                cluster_id: response.cluster_id,
                instances: vec![],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "OPERATION_NOT_SUPPORTED");
    }

    #[tokio::test]
    async fn test_get_cluster_unknown_id() {
        let state = state();
        let err = handle_get_cluster(
            &state,
            control::GetClusterRequest {
                cluster_id: Uuid::new_v4().to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "CLUSTER_NOT_FOUND");
    }
}
