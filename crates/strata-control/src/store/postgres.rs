// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL state store backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    ClusterRecord, ClusterTaskStatus, InstanceRecord, Result, ServiceStatus, StateStore,
    StoreError,
};
use crate::topology::NodeRole;

/// PostgreSQL-backed [`StateStore`].
#[derive(Clone)]
pub struct PostgresStateStore {
    pool: PgPool,
}

impl PostgresStateStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw clusters row; status is parsed on the way out.
#[derive(sqlx::FromRow)]
struct ClusterRow {
    id: Uuid,
    name: String,
    tenant_id: String,
    datastore_version: String,
    task_status: String,
    created_at: DateTime<Utc>,
}

impl ClusterRow {
    fn into_record(self) -> Result<ClusterRecord> {
        Ok(ClusterRecord {
            id: self.id,
            name: self.name,
            tenant_id: self.tenant_id,
            datastore_version: self.datastore_version,
            task_status: ClusterTaskStatus::parse(&self.task_status)?,
            created_at: self.created_at,
        })
    }
}

/// Raw cluster_instances row; role and statuses are parsed on the way out.
#[derive(sqlx::FromRow)]
struct InstanceRow {
    id: Uuid,
    cluster_id: Uuid,
    name: String,
    role: String,
    replication_group: Option<String>,
    service_status: String,
    flavor_id: String,
    availability_zone: Option<String>,
    region: Option<String>,
    hostname: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InstanceRow {
    fn into_record(self) -> Result<InstanceRecord> {
        let role = match self.role.as_str() {
            "coordinator" => NodeRole::Coordinator,
            "router" => NodeRole::Router,
            "storage" => NodeRole::Storage {
                replication_group: self.replication_group.ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "storage instance {} has no replication group",
                        self.id
                    ))
                })?,
            },
            other => {
                return Err(StoreError::Corrupt(format!("unknown node role: {other}")));
            }
        };

        Ok(InstanceRecord {
            id: self.id,
            cluster_id: self.cluster_id,
            name: self.name,
            role,
            service_status: ServiceStatus::parse(&self.service_status)?,
            flavor_id: self.flavor_id,
            availability_zone: self.availability_zone,
            region: self.region,
            hostname: self.hostname,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl StateStore for PostgresStateStore {
    async fn create_cluster(&self, cluster: &ClusterRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clusters (id, name, tenant_id, datastore_version, task_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(cluster.id)
        .bind(&cluster.name)
        .bind(&cluster.tenant_id)
        .bind(&cluster.datastore_version)
        .bind(cluster.task_status.as_str())
        .bind(cluster.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_cluster(&self, cluster_id: Uuid) -> Result<Option<ClusterRecord>> {
        let row = sqlx::query_as::<_, ClusterRow>(
            r#"
            SELECT id, name, tenant_id, datastore_version, task_status, created_at
            FROM clusters
            WHERE id = $1
            "#,
        )
        .bind(cluster_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ClusterRow::into_record).transpose()
    }

    async fn list_clusters(&self, tenant_id: Option<&str>) -> Result<Vec<ClusterRecord>> {
        let rows = sqlx::query_as::<_, ClusterRow>(
            r#"
            SELECT id, name, tenant_id, datastore_version, task_status, created_at
            FROM clusters
            WHERE ($1::TEXT IS NULL OR tenant_id = $1)
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ClusterRow::into_record).collect()
    }

    async fn set_cluster_task_status(
        &self,
        cluster_id: Uuid,
        status: ClusterTaskStatus,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE clusters SET task_status = $2 WHERE id = $1")
            .bind(cluster_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ClusterNotFound(cluster_id));
        }
        Ok(())
    }

    async fn create_instance(&self, instance: &InstanceRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cluster_instances
                (id, cluster_id, name, role, replication_group, service_status,
                 flavor_id, availability_zone, region, hostname, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(instance.id)
        .bind(instance.cluster_id)
        .bind(&instance.name)
        .bind(instance.role.as_str())
        .bind(instance.role.replication_group())
        .bind(instance.service_status.as_str())
        .bind(&instance.flavor_id)
        .bind(&instance.availability_zone)
        .bind(&instance.region)
        .bind(&instance.hostname)
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn instances_for_cluster(&self, cluster_id: Uuid) -> Result<Vec<InstanceRecord>> {
        let rows = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, cluster_id, name, role, replication_group, service_status,
                   flavor_id, availability_zone, region, hostname, created_at, updated_at
            FROM cluster_instances
            WHERE cluster_id = $1
            ORDER BY created_at, name
            "#,
        )
        .bind(cluster_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InstanceRow::into_record).collect()
    }

    async fn set_instance_service_status(
        &self,
        instance_id: Uuid,
        status: ServiceStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE cluster_instances SET service_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(instance_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InstanceNotFound(instance_id));
        }
        Ok(())
    }

    async fn set_instance_hostname(&self, instance_id: Uuid, hostname: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE cluster_instances SET hostname = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(instance_id)
        .bind(hostname)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InstanceNotFound(instance_id));
        }
        Ok(())
    }

    async fn fail_cluster_instances(&self, cluster_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cluster_instances
            SET service_status = 'failed', updated_at = NOW()
            WHERE cluster_id = $1 AND service_status <> 'failed'
            "#,
        )
        .bind(cluster_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<bool> {
        let result: std::result::Result<(i32,), sqlx::Error> =
            sqlx::query_as("SELECT 1").fetch_one(&self.pool).await;
        Ok(result.is_ok())
    }
}
