// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock configurator for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{GuestError, RoleConfigurator};
use crate::store::InstanceRecord;

/// One recorded configuration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Node name the call targeted.
    pub node: String,
    /// `coordinator`, `router` or `storage`.
    pub kind: &'static str,
    /// Endpoints carried by the call.
    pub endpoints: Vec<String>,
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    // node name -> joined replication group
    joined: HashMap<String, String>,
}

/// Records configuration calls and mimics guest join semantics.
///
/// Storage joins are idempotent for the same group name and rejected
/// for a different one, like a real guest agent.
#[derive(Default)]
pub struct MockConfigurator {
    state: Mutex<State>,
    fail: bool,
}

impl MockConfigurator {
    /// Configurator that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configurator that rejects every call.
    pub fn failing() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail: true,
        }
    }

    /// All calls seen so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls that targeted the given node.
    pub async fn calls_for(&self, node_name: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.node == node_name)
            .count()
    }

    async fn record(
        &self,
        node: &InstanceRecord,
        kind: &'static str,
        endpoints: &[String],
    ) -> Result<(), GuestError> {
        let mut state = self.state.lock().await;
        state.calls.push(RecordedCall {
            node: node.name.clone(),
            kind,
            endpoints: endpoints.to_vec(),
        });
        if self.fail {
            return Err(GuestError::Rejected(format!(
                "mock refused {kind} call for {}",
                node.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleConfigurator for MockConfigurator {
    async fn configure_coordinator(
        &self,
        node: &InstanceRecord,
        peer_endpoints: &[String],
    ) -> Result<(), GuestError> {
        self.record(node, "coordinator", peer_endpoints).await
    }

    async fn configure_router(
        &self,
        node: &InstanceRecord,
        coordinator_endpoints: &[String],
    ) -> Result<(), GuestError> {
        self.record(node, "router", coordinator_endpoints).await?;
        // Routers hold no storage state; a router bind drops any group
        // membership the node may have had.
        self.state.lock().await.joined.remove(&node.name);
        Ok(())
    }

    async fn configure_storage(
        &self,
        node: &InstanceRecord,
        replica_set_name: &str,
        coordinator_endpoints: &[String],
    ) -> Result<(), GuestError> {
        self.record(node, "storage", coordinator_endpoints).await?;

        let mut state = self.state.lock().await;
        match state.joined.get(&node.name) {
            Some(existing) if existing != replica_set_name => Err(GuestError::Rejected(format!(
                "{} already joined to {existing}",
                node.name
            ))),
            _ => {
                state
                    .joined
                    .insert(node.name.clone(), replica_set_name.to_string());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ServiceStatus;
    use crate::topology::NodeRole;
    use chrono::Utc;
    use uuid::Uuid;

    fn storage_node(name: &str) -> InstanceRecord {
        InstanceRecord {
            id: Uuid::new_v4(),
            cluster_id: Uuid::new_v4(),
            name: name.to_string(),
            role: NodeRole::Storage {
                replication_group: "rs1".to_string(),
            },
            service_status: ServiceStatus::Ready,
            flavor_id: "m1.large".to_string(),
            availability_zone: None,
            region: None,
            hostname: Some(name.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_storage_join_idempotent_same_group() {
        let configurator = MockConfigurator::new();
        let node = storage_node("orders-rs1-1");
        let endpoints = vec!["orders-pd-1:2379".to_string()];

        configurator
            .configure_storage(&node, "rs1", &endpoints)
            .await
            .unwrap();
        configurator
            .configure_storage(&node, "rs1", &endpoints)
            .await
            .unwrap();
        assert_eq!(configurator.calls_for("orders-rs1-1").await, 2);
    }

    #[tokio::test]
    async fn test_storage_join_conflicting_group_rejected() {
        let configurator = MockConfigurator::new();
        let node = storage_node("orders-rs1-1");
        let endpoints = vec!["orders-pd-1:2379".to_string()];

        configurator
            .configure_storage(&node, "rs1", &endpoints)
            .await
            .unwrap();
        let err = configurator
            .configure_storage(&node, "rs2", &endpoints)
            .await
            .unwrap_err();
        assert!(matches!(err, GuestError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_failing_configurator_rejects() {
        let configurator = MockConfigurator::failing();
        let node = storage_node("orders-rs1-1");
        let err = configurator
            .configure_coordinator(&node, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GuestError::Rejected(_)));
        assert_eq!(configurator.calls().await.len(), 1);
    }
}
