// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cluster formation orchestration.
//!
//! `create_cluster` validates the request, persists the cluster and its
//! member instances, provisions nodes role group by role group, then
//! hands off to a background formation task that waits for readiness and
//! issues exactly one role-configuration call per node. The task's
//! outcome is observable and cancellable through [`FormationHandle`].
//!
//! A cluster is never left in `BuildingInitial` after the formation task
//! settles: any failure path marks the cluster and every member instance
//! `Failed`.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::FormationConfig;
use crate::configurator::RoleConfigurator;
use crate::error::{Error, Result};
use crate::poller::{ReadinessOutcome, ReadinessPoller};
use crate::provisioner::{NodeProvisioner, NodeRequest};
use crate::store::{
    ClusterRecord, ClusterTaskStatus, InstanceRecord, ServiceStatus, StateStore,
};
use crate::topology::{self, ClusterSpec, InstanceSpec, NodeRole, RoleAssignment};

/// Handle to a running formation task.
///
/// Dropping the handle detaches the task; it keeps running and settles
/// the cluster on its own. `cancel` aborts the formation and fails the
/// cluster.
#[derive(Debug)]
pub struct FormationHandle {
    cluster_id: Uuid,
    cancel: Arc<Notify>,
    task: JoinHandle<Result<ClusterTaskStatus>>,
}

impl FormationHandle {
    /// Cluster this formation belongs to.
    pub fn cluster_id(&self) -> Uuid {
        self.cluster_id
    }

    /// Request cancellation. The task fails the cluster and returns
    /// [`Error::FormationCancelled`]; `wait` observes the outcome.
    pub fn cancel(&self) {
        // notify_one stores a permit, so a cancel issued before the task
        // reaches its select point is not lost.
        self.cancel.notify_one();
    }

    /// Wait for the formation to settle and return the final cluster
    /// task status.
    pub async fn wait(self) -> Result<ClusterTaskStatus> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Other(format!(
                "formation task for {} panicked: {e}",
                self.cluster_id
            ))),
        }
    }
}

/// Forms clusters: plan, persist, provision, configure.
pub struct ClusterOrchestrator {
    store: Arc<dyn StateStore>,
    provisioner: Arc<dyn NodeProvisioner>,
    configurator: Arc<dyn RoleConfigurator>,
    config: FormationConfig,
}

impl ClusterOrchestrator {
    /// Build an orchestrator over the given collaborators.
    pub fn new(
        store: Arc<dyn StateStore>,
        provisioner: Arc<dyn NodeProvisioner>,
        configurator: Arc<dyn RoleConfigurator>,
        config: FormationConfig,
    ) -> Self {
        Self {
            store,
            provisioner,
            configurator,
            config,
        }
    }

    /// Formation settings this orchestrator runs with.
    pub fn config(&self) -> &FormationConfig {
        &self.config
    }

    /// Create a cluster and start its formation.
    ///
    /// Validation happens before any record is written. Provisioning is
    /// synchronous here; once every node is requested, the returned
    /// handle tracks the background readiness-and-configuration phase.
    pub async fn create_cluster(
        &self,
        spec: ClusterSpec,
    ) -> Result<(ClusterRecord, FormationHandle)> {
        let assignments = topology::plan(&spec, &self.config)?;

        let cluster = ClusterRecord::new(&spec.name, &spec.tenant_id, &spec.datastore_version);
        self.store.create_cluster(&cluster).await?;
        info!(cluster_id = %cluster.id, name = %cluster.name, nodes = assignments.len(),
            "cluster created, provisioning nodes");

        if let Err(e) = self
            .provision_all(&cluster, &assignments, spec.locality.as_deref())
            .await
        {
            error!(cluster_id = %cluster.id, error = %e, "provisioning failed");
            fail_cluster(&*self.store, cluster.id).await;
            return Err(e);
        }

        let handle = self.spawn_formation(cluster.id);
        Ok((cluster, handle))
    }

    /// Grow is not supported for this datastore.
    pub async fn grow_cluster(
        &self,
        _cluster_id: Uuid,
        _instances: Vec<InstanceSpec>,
    ) -> Result<()> {
        Err(Error::OperationNotSupported("grow"))
    }

    /// Shrink is not supported for this datastore.
    pub async fn shrink_cluster(
        &self,
        _cluster_id: Uuid,
        _instance_ids: Vec<Uuid>,
    ) -> Result<()> {
        Err(Error::OperationNotSupported("shrink"))
    }

    /// Cluster record plus a consistent snapshot of its instances.
    pub async fn cluster_status(
        &self,
        cluster_id: Uuid,
    ) -> Result<(ClusterRecord, Vec<InstanceRecord>)> {
        let cluster = self
            .store
            .get_cluster(cluster_id)
            .await?
            .ok_or(Error::ClusterNotFound(cluster_id))?;
        let instances = self.store.instances_for_cluster(cluster_id).await?;
        Ok((cluster, instances))
    }

    /// List clusters, optionally filtered by tenant.
    pub async fn list_clusters(&self, tenant_id: Option<&str>) -> Result<Vec<ClusterRecord>> {
        Ok(self.store.list_clusters(tenant_id).await?)
    }

    /// Provision every node, one role group at a time, coordinators
    /// first, then routers, then storage. Nodes within a group are
    /// requested concurrently.
    async fn provision_all(
        &self,
        cluster: &ClusterRecord,
        assignments: &[RoleAssignment],
        locality: Option<&str>,
    ) -> Result<()> {
        let groups = [
            |r: &NodeRole| matches!(r, NodeRole::Coordinator),
            |r: &NodeRole| matches!(r, NodeRole::Router),
            |r: &NodeRole| matches!(r, NodeRole::Storage { .. }),
        ];

        for group in groups {
            let members: Vec<&RoleAssignment> =
                assignments.iter().filter(|a| group(&a.role)).collect();
            self.provision_group(cluster, &members, locality).await?;
        }
        Ok(())
    }

    async fn provision_group(
        &self,
        cluster: &ClusterRecord,
        members: &[&RoleAssignment],
        locality: Option<&str>,
    ) -> Result<()> {
        let mut join_set: JoinSet<std::result::Result<_, crate::provisioner::ProvisionError>> =
            JoinSet::new();

        for assignment in members {
            let now = Utc::now();
            let instance = InstanceRecord {
                id: Uuid::new_v4(),
                cluster_id: cluster.id,
                name: assignment.name.clone(),
                role: assignment.role.clone(),
                service_status: ServiceStatus::Building,
                flavor_id: assignment.flavor_id.clone(),
                availability_zone: assignment.availability_zone.clone(),
                region: assignment.region.clone(),
                hostname: None,
                created_at: now,
                updated_at: now,
            };
            self.store.create_instance(&instance).await?;

            let request = NodeRequest {
                instance_id: instance.id,
                cluster_id: cluster.id,
                name: assignment.name.clone(),
                role: assignment.role.clone(),
                flavor_id: assignment.flavor_id.clone(),
                volume_size_gb: assignment.volume_size_gb,
                volume_type: assignment.volume_type.clone(),
                availability_zone: assignment.availability_zone.clone(),
                region: assignment.region.clone(),
                nic: assignment.nic.clone(),
                modules: assignment.modules.clone(),
                locality: locality.map(str::to_string),
            };
            let provisioner = Arc::clone(&self.provisioner);
            join_set.spawn(async move { provisioner.create_node(&request).await });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(node)) => {
                    self.store
                        .set_instance_hostname(node.instance_id, &node.hostname)
                        .await?;
                }
                Ok(Err(e)) => {
                    join_set.abort_all();
                    return Err(e.into());
                }
                Err(e) => {
                    join_set.abort_all();
                    return Err(Error::Other(format!("provisioning task failed: {e}")));
                }
            }
        }
        Ok(())
    }

    fn spawn_formation(&self, cluster_id: Uuid) -> FormationHandle {
        let cancel = Arc::new(Notify::new());
        let store = Arc::clone(&self.store);
        let configurator = Arc::clone(&self.configurator);
        let config = self.config.clone();
        let task_cancel = Arc::clone(&cancel);

        let task = tokio::spawn(async move {
            run_formation(store, configurator, config, cluster_id, task_cancel).await
        });

        FormationHandle {
            cluster_id,
            cancel,
            task,
        }
    }
}

/// Drive one cluster's formation to a terminal task status.
async fn run_formation(
    store: Arc<dyn StateStore>,
    configurator: Arc<dyn RoleConfigurator>,
    config: FormationConfig,
    cluster_id: Uuid,
    cancel: Arc<Notify>,
) -> Result<ClusterTaskStatus> {
    let deadline = config.formation_deadline;

    let outcome = tokio::select! {
        biased;
        _ = cancel.notified() => {
            warn!(%cluster_id, "formation cancelled");
            Err(Error::FormationCancelled(cluster_id))
        }
        formed = tokio::time::timeout(
            deadline,
            form_cluster(&store, &*configurator, &config, cluster_id),
        ) => match formed {
            Ok(result) => result,
            Err(_) => {
                warn!(%cluster_id, deadline_secs = deadline.as_secs(), "formation deadline exceeded");
                Err(Error::DeadlineExceeded(cluster_id))
            }
        }
    };

    match outcome {
        Ok(()) => {
            store
                .set_cluster_task_status(cluster_id, ClusterTaskStatus::Active)
                .await?;
            info!(%cluster_id, "cluster is active");
            Ok(ClusterTaskStatus::Active)
        }
        Err(e) => {
            error!(%cluster_id, error = %e, "formation failed");
            fail_cluster(&*store, cluster_id).await;
            Err(e)
        }
    }
}

/// Wait for readiness, then configure every node: coordinators first,
/// then storage joins, then routers. Exactly one call per node.
async fn form_cluster(
    store: &Arc<dyn StateStore>,
    configurator: &dyn RoleConfigurator,
    config: &FormationConfig,
    cluster_id: Uuid,
) -> Result<()> {
    let poller = ReadinessPoller::new(Arc::clone(store), config.poll_interval);
    match poller
        .await_ready(cluster_id, config.formation_deadline)
        .await?
    {
        ReadinessOutcome::Ready => {}
        ReadinessOutcome::InstanceFailed => {
            return Err(Error::InstanceFailed(cluster_id));
        }
        ReadinessOutcome::DeadlineExpired | ReadinessOutcome::Interrupted => {
            return Err(Error::ReadinessTimeout {
                cluster_id,
                deadline_secs: config.formation_deadline.as_secs(),
            });
        }
    }

    let instances = store.instances_for_cluster(cluster_id).await?;

    let coordinators: Vec<&InstanceRecord> = instances
        .iter()
        .filter(|i| matches!(i.role, NodeRole::Coordinator))
        .collect();
    let routers: Vec<&InstanceRecord> = instances
        .iter()
        .filter(|i| matches!(i.role, NodeRole::Router))
        .collect();
    let storage: Vec<&InstanceRecord> = instances
        .iter()
        .filter(|i| matches!(i.role, NodeRole::Storage { .. }))
        .collect();

    let coordinator_endpoints = endpoints(&coordinators, config.coordinator_port)?;

    for node in &coordinators {
        configurator
            .configure_coordinator(node, &coordinator_endpoints)
            .await?;
    }

    for node in &storage {
        if let Some(group) = node.role.replication_group() {
            configurator
                .configure_storage(node, group, &coordinator_endpoints)
                .await?;
        }
    }

    for node in &routers {
        configurator
            .configure_router(node, &coordinator_endpoints)
            .await?;
    }

    Ok(())
}

fn endpoints(nodes: &[&InstanceRecord], port: u16) -> Result<Vec<String>> {
    nodes
        .iter()
        .map(|n| {
            n.hostname
                .as_deref()
                .map(|h| format!("{h}:{port}"))
                .ok_or_else(|| Error::Other(format!("node {} has no hostname", n.name)))
        })
        .collect()
}

/// Mark the cluster and every member instance failed, ready ones
/// included. Best effort; store errors here are logged, not propagated,
/// so the original failure stays visible.
async fn fail_cluster(store: &dyn StateStore, cluster_id: Uuid) {
    match store.fail_cluster_instances(cluster_id).await {
        Ok(updated) if updated > 0 => {
            warn!(%cluster_id, instances = updated, "marked instances failed")
        }
        Ok(_) => {}
        Err(e) => error!(%cluster_id, error = %e, "failed to mark instances failed"),
    }
    if let Err(e) = store
        .set_cluster_task_status(cluster_id, ClusterTaskStatus::Failed)
        .await
    {
        error!(%cluster_id, error = %e, "failed to mark cluster failed");
    }
}
