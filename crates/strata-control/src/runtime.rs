// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for strata-control.
//!
//! [`ControlRuntime`] lets an application host the control plane inside
//! its own tokio runtime instead of running the standalone binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_control::runtime::ControlRuntime;
//! use strata_control::configurator::QuicRoleConfigurator;
//! use strata_control::provisioner::MockProvisioner;
//! use strata_control::store::MemoryStateStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStateStore::new());
//!     let runtime = ControlRuntime::builder()
//!         .store(store.clone())
//!         .provisioner(Arc::new(MockProvisioner::new(store)))
//!         .bind_addr("0.0.0.0:7441".parse()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... run your application ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::FormationConfig;
use crate::configurator::{QuicRoleConfigurator, RoleConfigurator};
use crate::handlers::ControlHandlerState;
use crate::orchestrator::ClusterOrchestrator;
use crate::provisioner::NodeProvisioner;
use crate::store::StateStore;

/// Builder for creating a [`ControlRuntime`].
pub struct ControlRuntimeBuilder {
    store: Option<Arc<dyn StateStore>>,
    provisioner: Option<Arc<dyn NodeProvisioner>>,
    configurator: Option<Arc<dyn RoleConfigurator>>,
    bind_addr: SocketAddr,
    formation: FormationConfig,
}

impl Default for ControlRuntimeBuilder {
    fn default() -> Self {
        Self {
            store: None,
            provisioner: None,
            configurator: None,
            bind_addr: "0.0.0.0:7441".parse().expect("static addr"),
            formation: FormationConfig::default(),
        }
    }
}

impl ControlRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cluster state store (required).
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the node provisioner (required).
    pub fn provisioner(mut self, provisioner: Arc<dyn NodeProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// Set the role configurator.
    ///
    /// Default: [`QuicRoleConfigurator`] built from the formation
    /// settings.
    pub fn configurator(mut self, configurator: Arc<dyn RoleConfigurator>) -> Self {
        self.configurator = Some(configurator);
        self
    }

    /// Set the bind address for the control QUIC server.
    ///
    /// Default: `0.0.0.0:7441`
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the formation settings.
    ///
    /// Default: [`FormationConfig::default`]
    pub fn formation(mut self, formation: FormationConfig) -> Self {
        self.formation = formation;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<ControlRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("store is required"))?;
        let provisioner = self
            .provisioner
            .ok_or_else(|| anyhow::anyhow!("provisioner is required"))?;
        let configurator = self
            .configurator
            .unwrap_or_else(|| Arc::new(QuicRoleConfigurator::new(&self.formation)));

        Ok(ControlRuntimeConfig {
            store,
            provisioner,
            configurator,
            bind_addr: self.bind_addr,
            formation: self.formation,
        })
    }
}

/// Configuration for a [`ControlRuntime`].
pub struct ControlRuntimeConfig {
    store: Arc<dyn StateStore>,
    provisioner: Arc<dyn NodeProvisioner>,
    configurator: Arc<dyn RoleConfigurator>,
    bind_addr: SocketAddr,
    formation: FormationConfig,
}

impl ControlRuntimeConfig {
    /// Start the runtime, spawning the QUIC server task.
    pub async fn start(self) -> Result<ControlRuntime> {
        let orchestrator = Arc::new(ClusterOrchestrator::new(
            self.store.clone(),
            self.provisioner.clone(),
            self.configurator.clone(),
            self.formation.clone(),
        ));

        let state = Arc::new(ControlHandlerState::new(
            self.store.clone(),
            orchestrator.clone(),
        ));

        let (server_shutdown_tx, server_shutdown_rx) = watch::channel(false);
        let bind_addr = self.bind_addr;
        let server_state = state.clone();

        let server_handle = tokio::spawn(run_control_server_with_shutdown(
            bind_addr,
            server_state,
            server_shutdown_rx,
        ));

        info!(bind_addr = %bind_addr, "ControlRuntime started");

        Ok(ControlRuntime {
            server_handle,
            server_shutdown_tx,
            state,
            orchestrator,
            bind_addr,
        })
    }
}

/// A running control plane that can be embedded in an application.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination. Formation
/// tasks already in flight keep running on the tokio runtime until they
/// settle their clusters.
pub struct ControlRuntime {
    server_handle: JoinHandle<Result<()>>,
    server_shutdown_tx: watch::Sender<bool>,
    state: Arc<ControlHandlerState>,
    orchestrator: Arc<ClusterOrchestrator>,
    bind_addr: SocketAddr,
}

impl ControlRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> ControlRuntimeBuilder {
        ControlRuntimeBuilder::new()
    }

    /// Get the bind address of the QUIC server.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Get a reference to the shared handler state.
    pub fn state(&self) -> &Arc<ControlHandlerState> {
        &self.state
    }

    /// Get a reference to the orchestrator, for direct embedding.
    pub fn orchestrator(&self) -> &Arc<ClusterOrchestrator> {
        &self.orchestrator
    }

    /// Gracefully shut down the runtime.
    pub async fn shutdown(self) -> Result<()> {
        info!("ControlRuntime shutting down...");

        let _ = self.server_shutdown_tx.send(true);

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("ControlRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("control server error during shutdown: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("control server task panicked: {}", e);
                Err(anyhow::anyhow!("server task panicked: {}", e))
            }
        }
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished()
    }
}

/// Run the control QUIC server with shutdown support.
async fn run_control_server_with_shutdown(
    bind_addr: SocketAddr,
    state: Arc<ControlHandlerState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    use strata_protocol::server::StrataServer;

    let server = StrataServer::localhost(bind_addr)?;

    info!(addr = %bind_addr, "control QUIC server starting");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("control QUIC server received shutdown signal");
                    server.close();
                    break;
                }
            }

            incoming = server.accept() => {
                match incoming {
                    Some(incoming) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            match incoming.await {
                                Ok(connection) => {
                                    let remote_addr = connection.remote_address();
                                    debug!(%remote_addr, "accepted connection");

                                    let conn = strata_protocol::server::ConnectionHandler::new(connection);
                                    crate::server::handle_connection(conn, state).await;
                                }
                                Err(e) => {
                                    debug!("failed to accept connection: {}", e);
                                }
                            }
                        });
                    }
                    None => {
                        // Endpoint closed
                        break;
                    }
                }
            }
        }
    }

    info!("control QUIC server stopped");
    Ok(())
}
