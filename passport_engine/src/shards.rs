//! Per-tenant database shards.
//!
//! Tenant data can be spread over several database clusters. Each `[[tenant_databases]]` entry names a cluster, the
//! URL of its database and the tenant ids that live on it. [`TenantDatabases`] opens one pool per cluster and resolves
//! a tenant id to the pool that holds its data.
use std::{collections::HashMap, fmt::Debug};

use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{traits::PassportDatabase, SqliteDatabase};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    pub cluster_name: String,
    pub url: String,
    #[serde(default)]
    pub tenant_ids: Vec<i64>,
}

#[derive(Debug, Clone, Error)]
pub enum ShardError {
    #[error("Could not open the database for cluster {0}. {1}")]
    ConnectionError(String, String),
    #[error("Cluster {0} is configured more than once")]
    DuplicateCluster(String),
    #[error("Tenant {0} is assigned to both {1} and {2}")]
    DuplicateTenant(i64, String, String),
    #[error("Tenant {0} is not assigned to any database cluster")]
    UnknownTenant(i64),
}

#[derive(Clone, Default)]
pub struct TenantDatabases {
    clusters: HashMap<String, SqliteDatabase>,
    tenants: HashMap<i64, String>,
}

impl Debug for TenantDatabases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.clusters.keys().collect::<Vec<_>>();
        names.sort();
        write!(f, "TenantDatabases ({} tenants on {names:?})", self.tenants.len())
    }
}

impl TenantDatabases {
    /// Opens a pool for every configured cluster. Fails if a cluster or a tenant id appears twice.
    pub async fn connect(configs: &[ShardConfig], max_connections: u32) -> Result<Self, ShardError> {
        let mut shards = Self::default();
        for config in configs {
            if shards.clusters.contains_key(&config.cluster_name) {
                return Err(ShardError::DuplicateCluster(config.cluster_name.clone()));
            }
            let db = SqliteDatabase::new_with_url(&config.url, max_connections)
                .await
                .map_err(|e| ShardError::ConnectionError(config.cluster_name.clone(), e.to_string()))?;
            shards.add_cluster(config, db)?;
        }
        info!("🗃️ Opened {} tenant database clusters", shards.clusters.len());
        Ok(shards)
    }

    fn add_cluster(&mut self, config: &ShardConfig, db: SqliteDatabase) -> Result<(), ShardError> {
        for tenant_id in &config.tenant_ids {
            if let Some(existing) = self.tenants.get(tenant_id) {
                return Err(ShardError::DuplicateTenant(*tenant_id, existing.clone(), config.cluster_name.clone()));
            }
            self.tenants.insert(*tenant_id, config.cluster_name.clone());
        }
        debug!("🗃️ Cluster {} serves {} tenants", config.cluster_name, config.tenant_ids.len());
        self.clusters.insert(config.cluster_name.clone(), db);
        Ok(())
    }

    /// The database holding the given tenant's data.
    pub fn for_tenant(&self, tenant_id: i64) -> Result<&SqliteDatabase, ShardError> {
        self.tenants
            .get(&tenant_id)
            .and_then(|name| self.clusters.get(name))
            .ok_or(ShardError::UnknownTenant(tenant_id))
    }

    pub fn cluster(&self, name: &str) -> Option<&SqliteDatabase> {
        self.clusters.get(name)
    }

    pub fn cluster_names(&self) -> Vec<&str> {
        let mut names = self.clusters.keys().map(|s| s.as_str()).collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        for db in self.clusters.values() {
            db.run_migrations().await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        for db in self.clusters.values() {
            db.close().await;
        }
    }
}
