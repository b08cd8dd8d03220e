// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory state store backend.
//!
//! Used by tests and by embedders that do not need durability. Holds the
//! same records the PostgreSQL backend does, under a single lock so
//! snapshots stay consistent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ClusterRecord, ClusterTaskStatus, InstanceRecord, Result, ServiceStatus, StateStore,
    StoreError,
};

#[derive(Default)]
struct Inner {
    clusters: HashMap<Uuid, ClusterRecord>,
    instances: HashMap<Uuid, InstanceRecord>,
}

/// In-memory [`StateStore`] backend.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn create_cluster(&self, cluster: &ClusterRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.clusters.insert(cluster.id, cluster.clone());
        Ok(())
    }

    async fn get_cluster(&self, cluster_id: Uuid) -> Result<Option<ClusterRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.clusters.get(&cluster_id).cloned())
    }

    async fn list_clusters(&self, tenant_id: Option<&str>) -> Result<Vec<ClusterRecord>> {
        let inner = self.inner.read().await;
        let mut clusters: Vec<ClusterRecord> = inner
            .clusters
            .values()
            .filter(|c| tenant_id.is_none_or(|t| c.tenant_id == t))
            .cloned()
            .collect();
        clusters.sort_by_key(|c| c.created_at);
        Ok(clusters)
    }

    async fn set_cluster_task_status(
        &self,
        cluster_id: Uuid,
        status: ClusterTaskStatus,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let cluster = inner
            .clusters
            .get_mut(&cluster_id)
            .ok_or(StoreError::ClusterNotFound(cluster_id))?;
        cluster.task_status = status;
        Ok(())
    }

    async fn create_instance(&self, instance: &InstanceRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.clusters.contains_key(&instance.cluster_id) {
            return Err(StoreError::ClusterNotFound(instance.cluster_id));
        }
        inner.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn instances_for_cluster(&self, cluster_id: Uuid) -> Result<Vec<InstanceRecord>> {
        let inner = self.inner.read().await;
        let mut instances: Vec<InstanceRecord> = inner
            .instances
            .values()
            .filter(|i| i.cluster_id == cluster_id)
            .cloned()
            .collect();
        instances.sort_by_key(|i| (i.created_at, i.name.clone()));
        Ok(instances)
    }

    async fn set_instance_service_status(
        &self,
        instance_id: Uuid,
        status: ServiceStatus,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let instance = inner
            .instances
            .get_mut(&instance_id)
            .ok_or(StoreError::InstanceNotFound(instance_id))?;
        instance.service_status = status;
        instance.updated_at = Utc::now();
        Ok(())
    }

    async fn set_instance_hostname(&self, instance_id: Uuid, hostname: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let instance = inner
            .instances
            .get_mut(&instance_id)
            .ok_or(StoreError::InstanceNotFound(instance_id))?;
        instance.hostname = Some(hostname.to_string());
        instance.updated_at = Utc::now();
        Ok(())
    }

    async fn fail_cluster_instances(&self, cluster_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut updated = 0u64;
        for instance in inner.instances.values_mut() {
            if instance.cluster_id == cluster_id
                && instance.service_status != ServiceStatus::Failed
            {
                instance.service_status = ServiceStatus::Failed;
                instance.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::NodeRole;

    fn test_instance(cluster_id: Uuid, name: &str, role: NodeRole) -> InstanceRecord {
        InstanceRecord {
            id: Uuid::new_v4(),
            cluster_id,
            name: name.to_string(),
            role,
            service_status: ServiceStatus::Building,
            flavor_id: "m1.large".to_string(),
            availability_zone: None,
            region: None,
            hostname: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cluster_round_trip() {
        let store = MemoryStateStore::new();
        let cluster = ClusterRecord::new("orders", "t-1", "7.5");
        store.create_cluster(&cluster).await.unwrap();

        let fetched = store.get_cluster(cluster.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "orders");
        assert_eq!(fetched.task_status, ClusterTaskStatus::BuildingInitial);

        assert!(store.get_cluster(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_clusters_by_tenant() {
        let store = MemoryStateStore::new();
        store
            .create_cluster(&ClusterRecord::new("a", "t-1", "7.5"))
            .await
            .unwrap();
        store
            .create_cluster(&ClusterRecord::new("b", "t-2", "7.5"))
            .await
            .unwrap();

        assert_eq!(store.list_clusters(None).await.unwrap().len(), 2);
        let t1 = store.list_clusters(Some("t-1")).await.unwrap();
        assert_eq!(t1.len(), 1);
        assert_eq!(t1[0].name, "a");
    }

    #[tokio::test]
    async fn test_instance_requires_cluster() {
        let store = MemoryStateStore::new();
        let orphan = test_instance(Uuid::new_v4(), "x-pd-1", NodeRole::Coordinator);
        assert!(matches!(
            store.create_instance(&orphan).await.unwrap_err(),
            StoreError::ClusterNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_fail_cluster_instances_includes_ready() {
        let store = MemoryStateStore::new();
        let cluster = ClusterRecord::new("orders", "t-1", "7.5");
        store.create_cluster(&cluster).await.unwrap();

        let building = test_instance(cluster.id, "orders-pd-1", NodeRole::Coordinator);
        let ready = test_instance(cluster.id, "orders-pd-2", NodeRole::Coordinator);
        let failed = test_instance(cluster.id, "orders-pd-3", NodeRole::Coordinator);
        for instance in [&building, &ready, &failed] {
            store.create_instance(instance).await.unwrap();
        }
        store
            .set_instance_service_status(ready.id, ServiceStatus::Ready)
            .await
            .unwrap();
        store
            .set_instance_service_status(failed.id, ServiceStatus::Failed)
            .await
            .unwrap();

        // Already-failed instances are not re-counted.
        let updated = store.fail_cluster_instances(cluster.id).await.unwrap();
        assert_eq!(updated, 2);

        for instance in store.instances_for_cluster(cluster.id).await.unwrap() {
            assert_eq!(instance.service_status, ServiceStatus::Failed);
        }
    }

    #[tokio::test]
    async fn test_set_hostname() {
        let store = MemoryStateStore::new();
        let cluster = ClusterRecord::new("orders", "t-1", "7.5");
        store.create_cluster(&cluster).await.unwrap();
        let instance = test_instance(cluster.id, "orders-pd-1", NodeRole::Coordinator);
        store.create_instance(&instance).await.unwrap();

        store
            .set_instance_hostname(instance.id, "orders-pd-1.nodes.local")
            .await
            .unwrap();

        let instances = store.instances_for_cluster(cluster.id).await.unwrap();
        assert_eq!(
            instances[0].hostname.as_deref(),
            Some("orders-pd-1.nodes.local")
        );
    }
}
