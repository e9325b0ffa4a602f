//! Per-tenant schema routing.
//!
//! Each tenant owns a PostgreSQL schema named `tenant_<uuid>` (dashes
//! replaced by underscores). Tenant-scoped work runs inside a transaction
//! whose `search_path` points at that schema, so the same entities resolve
//! to the tenant's tables. Backends without schemas (SQLite) keep every
//! tenant in one database and rely on the `tenant_id` column filters.

use crate::{db::DbPool, entities::tenant, errors::ServiceError};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait, Statement, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

static SCHEMA_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("schema name pattern"));

/// Builds the schema name for a tenant id.
pub fn schema_name_for(tenant_id: &Uuid) -> String {
    format!("tenant_{}", tenant_id.to_string().replace('-', "_"))
}

/// Rejects anything that is not a plain lowercase SQL identifier. Schema
/// names are interpolated into `SET search_path` and `CREATE SCHEMA`.
pub fn validate_schema_name(name: &str) -> Result<(), ServiceError> {
    if SCHEMA_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ServiceError::InternalError(format!(
            "invalid tenant schema name: {}",
            name
        )))
    }
}

/// Opens tenant-scoped transactions and provisions tenant schemas.
#[derive(Clone)]
pub struct TenantSchemas {
    db: Arc<DbPool>,
}

impl TenantSchemas {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &DbPool {
        &self.db
    }

    /// Begins a transaction routed to the tenant's schema.
    ///
    /// Fails with 404 for unknown tenants and 403 for deactivated ones.
    #[instrument(skip(self))]
    pub async fn begin(&self, tenant_id: Uuid) -> Result<DatabaseTransaction, ServiceError> {
        let tenant = tenant::Entity::find_by_id(tenant_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant", tenant_id))?;

        if !tenant.is_active {
            return Err(ServiceError::Forbidden(format!(
                "Tenant {} is inactive",
                tenant_id
            )));
        }

        let txn = self.db.begin().await?;
        if txn.get_database_backend() == DbBackend::Postgres {
            validate_schema_name(&tenant.schema_name)?;
            txn.execute(Statement::from_string(
                DbBackend::Postgres,
                format!("SET LOCAL search_path TO \"{}\", public", tenant.schema_name),
            ))
            .await?;
        }

        counter!("helpdesk_db.tenant_transactions", 1);
        Ok(txn)
    }

    /// Creates the tenant schema and its tables. Idempotent.
    #[instrument(skip(self))]
    pub async fn provision(&self, tenant_id: Uuid) -> Result<String, ServiceError> {
        let schema = schema_name_for(&tenant_id);
        validate_schema_name(&schema)?;

        let backend = self.db.get_database_backend();
        if backend != DbBackend::Postgres {
            debug!(%schema, ?backend, "backend has no schemas; tenant tables are shared");
            return Ok(schema);
        }

        let txn = self.db.begin().await?;
        txn.execute(Statement::from_string(
            DbBackend::Postgres,
            format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", schema),
        ))
        .await?;
        txn.execute(Statement::from_string(
            DbBackend::Postgres,
            format!("SET LOCAL search_path TO \"{}\"", schema),
        ))
        .await?;
        crate::migrator::TenantMigrator::up(&txn, None).await?;
        txn.commit().await?;

        info!(%schema, "tenant schema provisioned");
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_name_replaces_dashes() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(
            schema_name_for(&id),
            "tenant_550e8400_e29b_41d4_a716_446655440000"
        );
        assert!(validate_schema_name(&schema_name_for(&id)).is_ok());
    }

    #[test]
    fn schema_name_rejects_injection() {
        assert!(validate_schema_name("tenant_x\"; DROP SCHEMA public; --").is_err());
        assert!(validate_schema_name("Tenant_Upper").is_err());
        assert!(validate_schema_name("").is_err());
        assert!(validate_schema_name(&"a".repeat(64)).is_err());
    }
}
