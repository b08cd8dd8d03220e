// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Strata Control - Cluster Formation Server
//!
//! A QUIC server responsible for:
//! - Cluster creation (validation, planning, provisioning)
//! - Formation (readiness polling, role configuration)
//! - Cluster status queries

use std::sync::Arc;
use tracing::{info, warn};

use strata_control::config::Config;
use strata_control::provisioner::{MockProvisioner, NodeProvisioner};
use strata_control::runtime::ControlRuntime;
use strata_control::store::{PostgresStateStore, StateStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strata_control=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        quic_addr = %config.quic_addr,
        "Starting Strata Control"
    );

    // Connect to database
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    // Create tables if they don't exist
    sqlx::raw_sql(include_str!("../migrations/schema.sql"))
        .execute(&pool)
        .await?;

    info!("Database schema verified");

    let store: Arc<dyn StateStore> = Arc::new(PostgresStateStore::new(pool));

    // Real deployments plug in an infrastructure provisioner; the mock
    // fakes nodes in the state store and exists for local development.
    let provisioner: Arc<dyn NodeProvisioner> = match std::env::var("STRATA_PROVISIONER") {
        Ok(name) if name == "mock" => Arc::new(MockProvisioner::new(store.clone())),
        Ok(name) => anyhow::bail!("unknown provisioner: {name}"),
        Err(_) => {
            warn!("STRATA_PROVISIONER not set; using mock provisioner");
            Arc::new(MockProvisioner::new(store.clone()))
        }
    };
    info!(provisioner_type = provisioner.provisioner_type(), "Provisioner initialized");

    // Start the runtime
    let runtime = ControlRuntime::builder()
        .store(store)
        .provisioner(provisioner)
        .bind_addr(config.quic_addr)
        .formation(config.formation.clone())
        .build()?
        .start()
        .await?;

    info!(addr = %config.quic_addr, "Control server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Graceful shutdown
    runtime.shutdown().await?;

    info!("Strata Control shut down");

    Ok(())
}
