// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end formation tests over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use strata_control::config::FormationConfig;
use strata_control::configurator::{MockConfigurator, RoleConfigurator};
use strata_control::error::{Error, ValidationError};
use strata_control::orchestrator::ClusterOrchestrator;
use strata_control::provisioner::{MockProvisioner, NodeProvisioner};
use strata_control::store::{ClusterTaskStatus, MemoryStateStore, ServiceStatus, StateStore};
use strata_control::topology::{ClusterSpec, ExtendedProperties, InstanceSpec};

fn fast_config() -> FormationConfig {
    FormationConfig {
        poll_interval: Duration::from_millis(5),
        formation_deadline: Duration::from_secs(5),
        ..FormationConfig::default()
    }
}

fn spec(name: &str) -> ClusterSpec {
    ClusterSpec {
        name: name.to_string(),
        tenant_id: "t-1".to_string(),
        datastore_version: "7.5".to_string(),
        instances: ["az1", "az2", "az3"]
            .iter()
            .map(|az| InstanceSpec {
                flavor_id: "m1.large".to_string(),
                volume_size_gb: 100,
                volume_type: None,
                availability_zone: Some(az.to_string()),
                region: Some(format!("region-{az}")),
                nic: None,
                modules: vec![],
            })
            .collect(),
        extended: ExtendedProperties::default(),
        locality: None,
        has_configuration: false,
    }
}

struct Harness {
    store: Arc<MemoryStateStore>,
    configurator: Arc<MockConfigurator>,
    orchestrator: ClusterOrchestrator,
}

fn harness_with(
    provisioner: Arc<dyn NodeProvisioner>,
    configurator: Arc<MockConfigurator>,
    config: FormationConfig,
) -> Harness {
    let store = Arc::new(MemoryStateStore::new());
    let orchestrator = ClusterOrchestrator::new(
        store.clone(),
        provisioner,
        configurator.clone() as Arc<dyn RoleConfigurator>,
        config,
    );
    Harness {
        store,
        configurator,
        orchestrator,
    }
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStateStore::new());
    let provisioner = Arc::new(MockProvisioner::new(store.clone()));
    let configurator = Arc::new(MockConfigurator::new());
    let orchestrator = ClusterOrchestrator::new(
        store.clone(),
        provisioner,
        configurator.clone() as Arc<dyn RoleConfigurator>,
        fast_config(),
    );
    Harness {
        store,
        configurator,
        orchestrator,
    }
}

#[tokio::test]
async fn test_formation_reaches_active() {
    let h = harness();

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();
    assert_eq!(cluster.task_status, ClusterTaskStatus::BuildingInitial);

    let status = handle.wait().await.unwrap();
    assert_eq!(status, ClusterTaskStatus::Active);

    let stored = h.store.get_cluster(cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.task_status, ClusterTaskStatus::Active);

    let instances = h.store.instances_for_cluster(cluster.id).await.unwrap();
    assert_eq!(instances.len(), 8);
    for instance in &instances {
        assert_eq!(instance.service_status, ServiceStatus::Ready);
        assert!(instance.hostname.is_some());
    }

    let mut names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "orders-pd-1",
            "orders-pd-2",
            "orders-pd-3",
            "orders-rs1-1",
            "orders-rs1-2",
            "orders-rs1-3",
            "orders-tidb-1",
            "orders-tidb-2",
        ]
    );
}

#[tokio::test]
async fn test_exactly_one_configuration_call_per_node() {
    let h = harness();

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();
    handle.wait().await.unwrap();

    let instances = h.store.instances_for_cluster(cluster.id).await.unwrap();
    for instance in &instances {
        assert_eq!(h.configurator.calls_for(&instance.name).await, 1);
    }

    // Coordinators are configured first, then storage joins, then
    // routers.
    let calls = h.configurator.calls().await;
    let kinds: Vec<&str> = calls.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            "coordinator",
            "coordinator",
            "coordinator",
            "storage",
            "storage",
            "storage",
            "router",
            "router",
        ]
    );

    // Every call carries the full coordinator endpoint set.
    for call in &calls {
        assert_eq!(call.endpoints.len(), 3);
        assert!(call.endpoints.iter().all(|e| e.contains("-pd-")));
        assert!(call.endpoints.iter().all(|e| e.ends_with(":2379")));
    }
}

#[tokio::test]
async fn test_validation_rejected_before_side_effects() {
    let h = harness();

    let mut bad = spec("orders");
    bad.has_configuration = true;
    let err = h.orchestrator.create_cluster(bad).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::UnsupportedConfiguration)
    ));

    // Nothing was written.
    assert!(h.store.list_clusters(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_provision_failure_fails_cluster() {
    let h = harness_with(
        Arc::new(MockProvisioner::failing()),
        Arc::new(MockConfigurator::new()),
        fast_config(),
    );

    let err = h.orchestrator.create_cluster(spec("orders")).await.unwrap_err();
    assert!(matches!(err, Error::Provision(_)));

    let clusters = h.store.list_clusters(None).await.unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].task_status, ClusterTaskStatus::Failed);

    // No instance is left building.
    for instance in h
        .store
        .instances_for_cluster(clusters[0].id)
        .await
        .unwrap()
    {
        assert_eq!(instance.service_status, ServiceStatus::Failed);
    }

    // No configuration call was attempted.
    assert!(h.configurator.calls().await.is_empty());
}

#[tokio::test]
async fn test_readiness_timeout_fails_cluster() {
    let config = FormationConfig {
        poll_interval: Duration::from_millis(5),
        formation_deadline: Duration::from_millis(100),
        ..FormationConfig::default()
    };
    let h = harness_with(
        Arc::new(MockProvisioner::never_ready()),
        Arc::new(MockConfigurator::new()),
        config,
    );

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();

    let err = handle.wait().await.unwrap_err();
    assert!(matches!(
        err,
        Error::ReadinessTimeout { .. } | Error::DeadlineExceeded(_)
    ));

    let stored = h.store.get_cluster(cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.task_status, ClusterTaskStatus::Failed);

    for instance in h.store.instances_for_cluster(cluster.id).await.unwrap() {
        assert_eq!(instance.service_status, ServiceStatus::Failed);
    }

    assert!(h.configurator.calls().await.is_empty());
}

#[tokio::test]
async fn test_readiness_timeout_fails_ready_instances_too() {
    let config = FormationConfig {
        poll_interval: Duration::from_millis(5),
        formation_deadline: Duration::from_millis(150),
        ..FormationConfig::default()
    };
    let h = harness_with(
        Arc::new(MockProvisioner::never_ready()),
        Arc::new(MockConfigurator::new()),
        config,
    );

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();

    // One node comes up; the rest never do.
    let instances = h.store.instances_for_cluster(cluster.id).await.unwrap();
    let ready_one = instances
        .iter()
        .find(|i| i.name == "orders-pd-1")
        .unwrap()
        .id;
    h.store
        .set_instance_service_status(ready_one, ServiceStatus::Ready)
        .await
        .unwrap();

    handle.wait().await.unwrap_err();

    let stored = h.store.get_cluster(cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.task_status, ClusterTaskStatus::Failed);

    // Failure takes the whole membership down with it, the node that
    // had reached ready included.
    for instance in h.store.instances_for_cluster(cluster.id).await.unwrap() {
        assert_eq!(
            instance.service_status,
            ServiceStatus::Failed,
            "{} survived the failed formation",
            instance.name
        );
    }
}

#[tokio::test]
async fn test_failed_instance_surfaces_distinct_error() {
    let config = FormationConfig {
        poll_interval: Duration::from_millis(5),
        formation_deadline: Duration::from_secs(60),
        ..FormationConfig::default()
    };
    let h = harness_with(
        Arc::new(MockProvisioner::never_ready()),
        Arc::new(MockConfigurator::new()),
        config,
    );

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();

    let instances = h.store.instances_for_cluster(cluster.id).await.unwrap();
    h.store
        .set_instance_service_status(instances[0].id, ServiceStatus::Failed)
        .await
        .unwrap();

    // The formation reports the dead node, not a timeout.
    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, Error::InstanceFailed(id) if id == cluster.id));

    let stored = h.store.get_cluster(cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.task_status, ClusterTaskStatus::Failed);
}

#[tokio::test]
async fn test_configuration_rejection_fails_cluster() {
    let h = harness_with_store_provisioner(Arc::new(MockConfigurator::failing()));

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();

    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, Error::Guest(_)));

    let stored = h.store.get_cluster(cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.task_status, ClusterTaskStatus::Failed);
}

fn harness_with_store_provisioner(configurator: Arc<MockConfigurator>) -> Harness {
    let store = Arc::new(MemoryStateStore::new());
    let provisioner = Arc::new(MockProvisioner::new(store.clone()));
    let orchestrator = ClusterOrchestrator::new(
        store.clone(),
        provisioner,
        configurator.clone() as Arc<dyn RoleConfigurator>,
        fast_config(),
    );
    Harness {
        store,
        configurator,
        orchestrator,
    }
}

#[tokio::test]
async fn test_cancel_fails_cluster() {
    let config = FormationConfig {
        poll_interval: Duration::from_millis(5),
        formation_deadline: Duration::from_secs(60),
        ..FormationConfig::default()
    };
    let h = harness_with(
        Arc::new(MockProvisioner::never_ready()),
        Arc::new(MockConfigurator::new()),
        config,
    );

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.cancel();

    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, Error::FormationCancelled(_)));

    let stored = h.store.get_cluster(cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.task_status, ClusterTaskStatus::Failed);
}

#[tokio::test]
async fn test_grow_and_shrink_rejected() {
    let h = harness();

    let (cluster, handle) = h.orchestrator.create_cluster(spec("orders")).await.unwrap();
    handle.wait().await.unwrap();

    let err = h
        .orchestrator
        .grow_cluster(cluster.id, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OperationNotSupported("grow")));

    let err = h
        .orchestrator
        .shrink_cluster(cluster.id, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OperationNotSupported("shrink")));

    // The cluster stays active.
    let stored = h.store.get_cluster(cluster.id).await.unwrap().unwrap();
    assert_eq!(stored.task_status, ClusterTaskStatus::Active);
}

#[tokio::test]
async fn test_role_count_overrides() {
    let h = harness();

    let mut custom = spec("orders");
    custom.extended = ExtendedProperties {
        num_coordinators: Some(5),
        num_routers: Some(1),
    };
    let (cluster, handle) = h.orchestrator.create_cluster(custom).await.unwrap();
    handle.wait().await.unwrap();

    let instances = h.store.instances_for_cluster(cluster.id).await.unwrap();
    assert_eq!(instances.len(), 9);
    assert_eq!(
        instances.iter().filter(|i| i.name.contains("-pd-")).count(),
        5
    );
    assert_eq!(
        instances
            .iter()
            .filter(|i| i.name.contains("-tidb-"))
            .count(),
        1
    );
}
