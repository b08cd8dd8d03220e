// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock provisioner for tests and local development.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{NodeProvisioner, NodeRequest, ProvisionError, ProvisionedNode};
use crate::store::{ServiceStatus, StateStore};

#[derive(Clone, Copy)]
enum Mode {
    /// Nodes come up after `ready_delay`.
    Succeed,
    /// Every create call fails.
    Fail,
    /// Nodes are requested but never become ready.
    NeverReady,
}

/// Provisioner that fakes nodes in the state store.
///
/// On a successful `create_node` it spawns a task that flips the
/// instance to `Ready` after a short delay, standing in for the real
/// backend's asynchronous boot. The node's hostname is its name.
pub struct MockProvisioner {
    store: Option<Arc<dyn StateStore>>,
    mode: Mode,
    ready_delay: Duration,
    requests: Mutex<Vec<Uuid>>,
}

impl MockProvisioner {
    /// Provisioner whose nodes become ready after 10ms.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store: Some(store),
            mode: Mode::Succeed,
            ready_delay: Duration::from_millis(10),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provisioner whose nodes become ready after the given delay.
    pub fn with_ready_delay(store: Arc<dyn StateStore>, ready_delay: Duration) -> Self {
        Self {
            store: Some(store),
            mode: Mode::Succeed,
            ready_delay,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provisioner that fails every create call.
    pub fn failing() -> Self {
        Self {
            store: None,
            mode: Mode::Fail,
            ready_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provisioner whose nodes never report ready.
    pub fn never_ready() -> Self {
        Self {
            store: None,
            mode: Mode::NeverReady,
            ready_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Instance ids of all create calls seen so far, in order.
    pub async fn requested(&self) -> Vec<Uuid> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl NodeProvisioner for MockProvisioner {
    fn provisioner_type(&self) -> &'static str {
        "mock"
    }

    async fn create_node(
        &self,
        request: &NodeRequest,
    ) -> Result<ProvisionedNode, ProvisionError> {
        self.requests.lock().await.push(request.instance_id);

        match self.mode {
            Mode::Fail => Err(ProvisionError::Backend(format!(
                "mock provisioner rejected {}",
                request.name
            ))),
            Mode::NeverReady => Ok(ProvisionedNode {
                instance_id: request.instance_id,
                hostname: request.name.clone(),
            }),
            Mode::Succeed => {
                if let Some(store) = &self.store {
                    let store = Arc::clone(store);
                    let instance_id = request.instance_id;
                    let delay = self.ready_delay;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = store
                            .set_instance_service_status(instance_id, ServiceStatus::Ready)
                            .await;
                    });
                }
                Ok(ProvisionedNode {
                    instance_id: request.instance_id,
                    hostname: request.name.clone(),
                })
            }
        }
    }
}
