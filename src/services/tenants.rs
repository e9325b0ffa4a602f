//! Tenant registry (platform operators) and tenant self-administration.

use crate::{
    auth::TenantContext,
    db::{schema_name_for, TenantSchemas},
    entities::{contract, item, tenant, ticket, warehouse},
    errors::{map_unique_violation, ServiceError},
    services::{validation::{validate_not_blank, validate_slug}, Page},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Acme Support",
    "subdomain": "acme",
    "settings": {"timezone": "America/Sao_Paulo"}
}))]
pub struct CreateTenantInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    #[validate(custom = "validate_slug")]
    pub subdomain: String,
    #[schema(value_type = Option<Object>)]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTenantInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    /// Replaces the stored settings (platform admin) or is merged into them
    /// key by key (tenant admin).
    #[schema(value_type = Option<Object>)]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TenantStats {
    pub tenant_id: Uuid,
    pub tickets: u64,
    pub open_tickets: u64,
    pub items: u64,
    pub contracts: u64,
    pub warehouses: u64,
}

fn require_object(settings: &Value) -> Result<(), ServiceError> {
    if settings.is_object() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "settings must be a JSON object".to_string(),
        ))
    }
}

/// Shallow merge: keys in `patch` overwrite keys in `base`, `null` removes.
pub fn merge_settings(base: &Value, patch: &Value) -> Value {
    let mut merged: Map<String, Value> = base.as_object().cloned().unwrap_or_default();
    if let Some(patch) = patch.as_object() {
        for (key, value) in patch {
            if value.is_null() {
                merged.remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

/// Service for the tenant registry
#[derive(Clone)]
pub struct TenantService {
    schemas: Arc<TenantSchemas>,
}

impl TenantService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    /// Registers a tenant and provisions its schema
    #[instrument(skip(self, input), fields(subdomain = %input.subdomain))]
    pub async fn create_tenant(
        &self,
        input: CreateTenantInput,
    ) -> Result<tenant::Model, ServiceError> {
        input.validate()?;
        let settings = input.settings.unwrap_or_else(|| json!({}));
        require_object(&settings)?;

        let db = self.schemas.pool();
        let taken = tenant::Entity::find()
            .filter(tenant::Column::Subdomain.eq(input.subdomain.as_str()))
            .count(db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "Subdomain '{}' is already in use",
                input.subdomain
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let created = tenant::ActiveModel {
            id: Set(id),
            name: Set(input.name.trim().to_string()),
            subdomain: Set(input.subdomain.clone()),
            schema_name: Set(schema_name_for(&id)),
            settings: Set(settings),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            map_unique_violation(e, format!("Subdomain '{}' is already in use", input.subdomain))
        })?;

        if let Err(err) = self.schemas.provision(id).await {
            error!(tenant_id = %id, error = %err, "schema provisioning failed; removing tenant");
            tenant::Entity::delete_by_id(id).exec(db).await?;
            return Err(err);
        }

        counter!("helpdesk_tenants.created", 1);
        info!(tenant_id = %id, schema = %created.schema_name, "tenant created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_tenants(
        &self,
        active: Option<bool>,
        page: Page,
    ) -> Result<(Vec<tenant::Model>, u64), ServiceError> {
        let db = self.schemas.pool();
        let mut query = tenant::Entity::find();
        if let Some(active) = active {
            query = query.filter(tenant::Column::IsActive.eq(active));
        }
        let total = query.clone().count(db).await?;
        let rows = query
            .order_by_asc(tenant::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok((rows, total))
    }

    #[instrument(skip(self))]
    pub async fn get_tenant(&self, id: Uuid) -> Result<tenant::Model, ServiceError> {
        tenant::Entity::find_by_id(id)
            .one(self.schemas.pool())
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant", id))
    }

    #[instrument(skip(self, input))]
    pub async fn update_tenant(
        &self,
        id: Uuid,
        input: UpdateTenantInput,
    ) -> Result<tenant::Model, ServiceError> {
        input.validate()?;
        if let Some(settings) = &input.settings {
            require_object(settings)?;
        }
        let existing = self.get_tenant(id).await?;

        let mut active: tenant::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(settings) = input.settings {
            active.settings = Set(settings);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.schemas.pool()).await?)
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<tenant::Model, ServiceError> {
        let existing = self.get_tenant(id).await?;
        let mut active: tenant::ActiveModel = existing.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.schemas.pool()).await?;
        info!(tenant_id = %id, is_active, "tenant activation changed");
        Ok(updated)
    }

    /// The caller's own tenant. Inactive tenants are refused.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn current_tenant(&self, ctx: &TenantContext) -> Result<tenant::Model, ServiceError> {
        let found = self.get_tenant(ctx.tenant_id).await?;
        if !found.is_active {
            return Err(ServiceError::Forbidden(format!(
                "Tenant {} is inactive",
                ctx.tenant_id
            )));
        }
        Ok(found)
    }

    /// Renames the caller's tenant and merges settings into the stored ones
    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_current_tenant(
        &self,
        ctx: &TenantContext,
        input: UpdateTenantInput,
    ) -> Result<tenant::Model, ServiceError> {
        input.validate()?;
        if let Some(settings) = &input.settings {
            require_object(settings)?;
        }
        let existing = self.current_tenant(ctx).await?;
        let merged = input
            .settings
            .as_ref()
            .map(|patch| merge_settings(&existing.settings, patch));

        let mut active: tenant::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(settings) = merged {
            active.settings = Set(settings);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.schemas.pool()).await?)
    }

    /// Row counts for the tenant dashboard
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn stats(&self, ctx: &TenantContext) -> Result<TenantStats, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let tenant_id = ctx.tenant_id;

        let tickets = ticket::Entity::find()
            .filter(ticket::Column::TenantId.eq(tenant_id))
            .filter(ticket::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        let open_tickets = ticket::Entity::find()
            .filter(ticket::Column::TenantId.eq(tenant_id))
            .filter(ticket::Column::IsActive.eq(true))
            .filter(ticket::Column::Status.is_not_in(["resolved", "closed"]))
            .count(&txn)
            .await?;
        let items = item::Entity::find()
            .filter(item::Column::TenantId.eq(tenant_id))
            .filter(item::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        let contracts = contract::Entity::find()
            .filter(contract::Column::TenantId.eq(tenant_id))
            .filter(contract::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        let warehouses = warehouse::Entity::find()
            .filter(warehouse::Column::TenantId.eq(tenant_id))
            .filter(warehouse::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        txn.commit().await?;

        Ok(TenantStats {
            tenant_id,
            tickets,
            open_tickets,
            items,
            contracts,
            warehouses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_merge_overwrites_and_removes_keys() {
        let base = json!({"timezone": "UTC", "locale": "en", "sla_hours": 8});
        let patch = json!({"timezone": "America/Sao_Paulo", "locale": null, "logo": "x.png"});
        assert_eq!(
            merge_settings(&base, &patch),
            json!({"timezone": "America/Sao_Paulo", "sla_hours": 8, "logo": "x.png"})
        );
    }

    #[test]
    fn settings_must_be_objects() {
        assert!(require_object(&json!({})).is_ok());
        assert!(require_object(&json!([1, 2])).is_err());
    }

    #[test]
    fn subdomain_is_validated() {
        let input = CreateTenantInput {
            name: "Acme".into(),
            subdomain: "Not A Slug".into(),
            settings: None,
        };
        assert!(input.validate().is_err());
    }
}
