// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Strata Control - Cluster Formation Orchestration
//!
//! This crate is the control plane that turns a create-cluster request
//! into a running multi-role database cluster: metadata coordinators,
//! SQL routers and a replicated storage group. It validates topology,
//! provisions nodes, waits for readiness and pushes role configuration
//! to each node's guest agent.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       External Clients                          │
//! │                  (tenant API, operator CLI)                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  strata-control (This Crate)                    │
//! │                         Port 7441                               │
//! │  ┌──────────┐  ┌──────────────┐  ┌──────────┐  ┌─────────────┐  │
//! │  │ Topology │  │ Orchestrator │  │Readiness │  │    Role     │  │
//! │  │ Planner  │  │  + Handles   │  │  Poller  │  │Configurator │  │
//! │  └──────────┘  └──────────────┘  └──────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!        │                  │ Create nodes             │ Port 7442
//!        │                  ▼                          ▼
//!        │        ┌──────────────────┐      ┌─────────────────────┐
//!        │        │   Provisioning   │─────►│   Cluster Nodes     │
//!        │        │     Backend      │      │   (guest agents)    │
//!        │        └──────────────────┘      └─────────────────────┘
//!        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          PostgreSQL                             │
//! │                   (clusters, cluster_instances)                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # QUIC Server (Control Protocol - Port 7441)
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | `CreateCluster` | Validate, provision and start forming a cluster |
//! | `GetCluster` | Fetch a cluster with its member instances |
//! | `ListClusters` | List clusters with optional tenant filter |
//! | `GrowCluster` | Always rejected for this datastore |
//! | `ShrinkCluster` | Always rejected for this datastore |
//! | `HealthCheck` | Server and store liveness |
//!
//! # Cluster Task Status State Machine
//!
//! ```text
//!          ┌──────────────────┐
//!          │ BUILDING_INITIAL │
//!          └────────┬─────────┘
//!                   │
//!        all ready  │  provision error,
//!        and every  │  readiness timeout,
//!        configure  │  configure error,
//!        call OK    │  deadline, cancel
//!          ┌────────┴─────────┐
//!          ▼                  ▼
//!     ┌────────┐         ┌────────┐
//!     │ ACTIVE │         │ FAILED │
//!     └────────┘         └────────┘
//! ```
//!
//! A cluster is never left in `BUILDING_INITIAL` once its formation task
//! settles. On any failure the cluster and every member instance are
//! marked `FAILED`.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `STRATA_DATABASE_URL` | Yes | - | PostgreSQL connection string |
//! | `STRATA_QUIC_PORT` | No | `7441` | Control QUIC server port |
//! | `STRATA_GUEST_PORT` | No | `7442` | Guest agent QUIC port |
//! | `STRATA_DEFAULT_COORDINATORS` | No | `3` | Default coordinator count |
//! | `STRATA_DEFAULT_ROUTERS` | No | `2` | Default router count |
//! | `STRATA_FORMATION_DEADLINE_SECS` | No | `1800` | Formation budget |
//! | `STRATA_POLL_INTERVAL_SECS` | No | `5` | Readiness poll interval |
//! | `STRATA_CONFIGURE_TIMEOUT_SECS` | No | `30` | Bind-call deadline |
//! | `STRATA_JOIN_TIMEOUT_SECS` | No | `600` | Storage-join deadline |
//!
//! # Modules
//!
//! - [`config`]: Server configuration from environment variables
//! - [`configurator`]: Role-configuration calls to guest agents
//! - [`error`]: Error types for control plane operations
//! - [`handlers`]: Control protocol request handlers
//! - [`orchestrator`]: Formation driver and [`orchestrator::FormationHandle`]
//! - [`poller`]: Readiness polling over the state store
//! - [`provisioner`]: Node provisioning backends
//! - [`runtime`]: Embeddable [`runtime::ControlRuntime`]
//! - [`server`]: Control QUIC server
//! - [`store`]: Cluster and instance persistence
//! - [`topology`]: Request validation and role planning

#![deny(missing_docs)]

pub mod config;
pub mod configurator;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod poller;
pub mod provisioner;
pub mod runtime;
pub mod server;
pub mod store;
pub mod topology;

pub use config::{Config, FormationConfig};
pub use error::{Error, Result, ValidationError};
pub use orchestrator::{ClusterOrchestrator, FormationHandle};
