// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for strata-control.

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL for the control plane state store
    pub database_url: String,
    /// QUIC server address for the control API
    pub quic_addr: SocketAddr,
    /// Formation parameters (deadlines, role counts, ports)
    pub formation: FormationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("STRATA_DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("STRATA_DATABASE_URL"))?;

        let port: u16 = std::env::var("STRATA_QUIC_PORT")
            .unwrap_or_else(|_| "7441".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let quic_addr = SocketAddr::from(([0, 0, 0, 0], port));

        Ok(Self {
            database_url,
            quic_addr,
            formation: FormationConfig::from_env(),
        })
    }
}

/// Parameters governing cluster formation.
///
/// Passed explicitly into the planner and orchestrator at construction;
/// nothing here is read from global state after startup.
#[derive(Debug, Clone)]
pub struct FormationConfig {
    /// Fixed storage replica factor. Create requests with a different
    /// storage instance count are rejected.
    pub replica_factor: usize,
    /// Coordinator count when the request does not override it.
    pub default_coordinators: u32,
    /// Router count when the request does not override it.
    pub default_routers: u32,
    /// Coordinator peer port.
    pub coordinator_port: u16,
    /// Router SQL port.
    pub router_port: u16,
    /// Storage service port.
    pub storage_port: u16,
    /// Port the guest agent listens on for role-configuration calls.
    pub guest_port: u16,
    /// Total budget for a formation: readiness wait plus role
    /// configuration. Expiry drives the cluster to failed.
    pub formation_deadline: Duration,
    /// Readiness poll interval.
    pub poll_interval: Duration,
    /// Deadline for bind-only guest calls (coordinator, router).
    pub configure_timeout: Duration,
    /// Deadline for storage membership joins. Joins move data and can
    /// take far longer than a bind.
    pub join_timeout: Duration,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            replica_factor: 3,
            default_coordinators: 3,
            default_routers: 2,
            coordinator_port: 2379,
            router_port: 4000,
            storage_port: 20160,
            guest_port: 7442,
            formation_deadline: Duration::from_secs(1800),
            poll_interval: Duration::from_secs(5),
            configure_timeout: Duration::from_secs(30),
            join_timeout: Duration::from_secs(600),
        }
    }
}

impl FormationConfig {
    /// Load formation parameters from environment variables with defaults.
    ///
    /// Environment variables:
    /// - `STRATA_DEFAULT_COORDINATORS`: Coordinator count default (default: 3)
    /// - `STRATA_DEFAULT_ROUTERS`: Router count default (default: 2)
    /// - `STRATA_GUEST_PORT`: Guest agent port (default: 7442)
    /// - `STRATA_FORMATION_DEADLINE_SECS`: Formation budget in seconds (default: 1800)
    /// - `STRATA_POLL_INTERVAL_SECS`: Readiness poll interval in seconds (default: 5)
    /// - `STRATA_CONFIGURE_TIMEOUT_SECS`: Bind-call deadline in seconds (default: 30)
    /// - `STRATA_JOIN_TIMEOUT_SECS`: Storage-join deadline in seconds (default: 600)
    pub fn from_env() -> Self {
        let default = Self::default();

        fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        Self {
            replica_factor: default.replica_factor,
            default_coordinators: env_parse(
                "STRATA_DEFAULT_COORDINATORS",
                default.default_coordinators,
            ),
            default_routers: env_parse("STRATA_DEFAULT_ROUTERS", default.default_routers),
            coordinator_port: default.coordinator_port,
            router_port: default.router_port,
            storage_port: default.storage_port,
            guest_port: env_parse("STRATA_GUEST_PORT", default.guest_port),
            formation_deadline: Duration::from_secs(env_parse(
                "STRATA_FORMATION_DEADLINE_SECS",
                default.formation_deadline.as_secs(),
            )),
            poll_interval: Duration::from_secs(env_parse(
                "STRATA_POLL_INTERVAL_SECS",
                default.poll_interval.as_secs(),
            )),
            configure_timeout: Duration::from_secs(env_parse(
                "STRATA_CONFIGURE_TIMEOUT_SECS",
                default.configure_timeout.as_secs(),
            )),
            join_timeout: Duration::from_secs(env_parse(
                "STRATA_JOIN_TIMEOUT_SECS",
                default.join_timeout.as_secs(),
            )),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
}
