// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! QUIC transport for role-configuration calls.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use strata_protocol::wire::guest::{
    guest_request, ConfigureCoordinator, ConfigureRouter, ConfigureStorage, GuestRequest,
    GuestResponse, GuestStatus,
};
use strata_protocol::{StrataClient, GUEST_API_VERSION};
use tracing::{debug, warn};

use super::{GuestError, RoleConfigurator};
use crate::config::FormationConfig;
use crate::store::InstanceRecord;

/// Talks the versioned guest protocol to each node's agent over QUIC.
///
/// Guests present self-signed certificates, so connections skip server
/// verification; the control network is assumed private.
pub struct QuicRoleConfigurator {
    guest_port: u16,
    configure_timeout: Duration,
    join_timeout: Duration,
}

impl QuicRoleConfigurator {
    /// Build from formation settings.
    pub fn new(config: &FormationConfig) -> Self {
        Self {
            guest_port: config.guest_port,
            configure_timeout: config.configure_timeout,
            join_timeout: config.join_timeout,
        }
    }

    async fn resolve(&self, node: &InstanceRecord) -> Result<SocketAddr, GuestError> {
        let hostname = node
            .hostname
            .as_deref()
            .ok_or_else(|| GuestError::Transport(format!("node {} has no hostname", node.name)))?;

        tokio::net::lookup_host(format!("{}:{}", hostname, self.guest_port))
            .await
            .map_err(|e| GuestError::Transport(format!("resolving {hostname}: {e}")))?
            .next()
            .ok_or_else(|| GuestError::Transport(format!("no address for {hostname}")))
    }

    async fn call(
        &self,
        node: &InstanceRecord,
        request: guest_request::Request,
        deadline: Duration,
    ) -> Result<(), GuestError> {
        let addr = self.resolve(node).await?;
        let client = StrataClient::insecure(addr)
            .map_err(|e| GuestError::Transport(e.to_string()))?;
        client
            .connect()
            .await
            .map_err(|e| GuestError::Transport(format!("connecting to {}: {e}", node.name)))?;

        let envelope = GuestRequest {
            api_version: GUEST_API_VERSION,
            request: Some(request),
        };

        debug!(node = %node.name, %addr, "sending role configuration");
        let response: GuestResponse = client
            .request_with_timeout(&envelope, deadline)
            .await
            .map_err(|e| GuestError::Transport(format!("calling {}: {e}", node.name)))?;
        client.close().await;

        match GuestStatus::try_from(response.status) {
            Ok(GuestStatus::Ok) => Ok(()),
            Ok(GuestStatus::UnsupportedApiVersion) => {
                warn!(node = %node.name, "guest refused API version");
                Err(GuestError::UnsupportedApiVersion(GUEST_API_VERSION))
            }
            Ok(GuestStatus::Rejected) => Err(GuestError::Rejected(response.message)),
            Err(_) => Err(GuestError::Transport(format!(
                "unknown guest status {} from {}",
                response.status, node.name
            ))),
        }
    }
}

#[async_trait]
impl RoleConfigurator for QuicRoleConfigurator {
    async fn configure_coordinator(
        &self,
        node: &InstanceRecord,
        peer_endpoints: &[String],
    ) -> Result<(), GuestError> {
        self.call(
            node,
            guest_request::Request::ConfigureCoordinator(ConfigureCoordinator {
                peer_endpoints: peer_endpoints.to_vec(),
            }),
            self.configure_timeout,
        )
        .await
    }

    async fn configure_router(
        &self,
        node: &InstanceRecord,
        coordinator_endpoints: &[String],
    ) -> Result<(), GuestError> {
        self.call(
            node,
            guest_request::Request::ConfigureRouter(ConfigureRouter {
                coordinator_endpoints: coordinator_endpoints.to_vec(),
            }),
            self.configure_timeout,
        )
        .await
    }

    async fn configure_storage(
        &self,
        node: &InstanceRecord,
        replica_set_name: &str,
        coordinator_endpoints: &[String],
    ) -> Result<(), GuestError> {
        // Membership joins can take much longer than a bind, so they get
        // their own deadline.
        self.call(
            node,
            guest_request::Request::ConfigureStorage(ConfigureStorage {
                replica_set_name: replica_set_name.to_string(),
                coordinator_endpoints: coordinator_endpoints.to_vec(),
            }),
            self.join_timeout,
        )
        .await
    }
}
