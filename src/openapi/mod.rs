use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{
    contracts, form_templates, geolocation, items, saas_admin, schedules, service_kits, stock,
    tenant_admin, ticket_hierarchy, ticket_history, tickets,
};
use crate::services;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Helpdesk API",
        version = "1.0.0",
        description = r#"
# Helpdesk API

Multi-tenant helpdesk backend for field-service companies.

## Features

- **Tenants**: platform operators register companies; each tenant's data is isolated
- **Tickets**: numbered tickets with an append-only change history
- **Ticket hierarchy**: categories, subcategories and actions used to classify tickets
- **Parts and services**: item catalog, warehouses, stock movements and service kits
- **Contracts**: service contracts with a status lifecycle and renewals
- **Timecard**: work schedule templates (5x2, 6x1, 12x36, shift, flexible)
- **Form templates**: dynamic forms with server-side validation
- **Geolocation**: field agent positions and proximity search

## Authentication

Every `/api` endpoint requires a bearer JWT. The token carries the caller's
role and, for tenant roles, the tenant id:

```
Authorization: Bearer <your-jwt-token>
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, capped by
server configuration) and answer with `items`, `total`, `page`, `limit` and
`total_pages`.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    security(("bearer_auth" = [])),
    tags(
        (name = "saas-admin", description = "Platform tenant management"),
        (name = "tenant-admin", description = "Current tenant settings and statistics"),
        (name = "tickets", description = "Ticket management"),
        (name = "ticket-history", description = "Ticket audit trail and notes"),
        (name = "ticket-hierarchy", description = "Ticket categories, subcategories and actions"),
        (name = "parts-services", description = "Items, warehouses, stock and service kits"),
        (name = "timecard", description = "Work schedule templates"),
        (name = "contracts", description = "Service contracts"),
        (name = "form-templates", description = "Dynamic form templates"),
        (name = "geolocation", description = "Field agent positions")
    ),
    paths(
        saas_admin::list_tenants,
        saas_admin::create_tenant,
        saas_admin::get_tenant,
        saas_admin::update_tenant,
        saas_admin::activate_tenant,
        saas_admin::deactivate_tenant,

        tenant_admin::get_current_tenant,
        tenant_admin::update_current_tenant,
        tenant_admin::tenant_stats,

        tickets::list_tickets,
        tickets::create_ticket,
        tickets::get_ticket,
        tickets::update_ticket,
        tickets::delete_ticket,

        ticket_history::list_history,
        ticket_history::history_summary,
        ticket_history::add_note,

        ticket_hierarchy::list_categories,
        ticket_hierarchy::create_category,
        ticket_hierarchy::update_category,
        ticket_hierarchy::delete_category,
        ticket_hierarchy::list_subcategories,
        ticket_hierarchy::create_subcategory,
        ticket_hierarchy::update_subcategory,
        ticket_hierarchy::delete_subcategory,
        ticket_hierarchy::list_actions,
        ticket_hierarchy::create_action,
        ticket_hierarchy::update_action,
        ticket_hierarchy::delete_action,
        ticket_hierarchy::get_tree,

        items::list_items,
        items::create_item,
        items::item_stats,
        items::get_item,
        items::update_item,
        items::delete_item,
        items::list_attachments,
        items::add_attachment,
        items::remove_attachment,
        items::list_links,
        items::add_link,
        items::remove_link,
        items::list_customer_links,
        items::add_customer_link,
        items::remove_customer_link,
        items::list_supplier_links,
        items::add_supplier_link,
        items::remove_supplier_link,

        stock::list_warehouses,
        stock::create_warehouse,
        stock::get_warehouse,
        stock::update_warehouse,
        stock::delete_warehouse,
        stock::list_stock,
        stock::low_stock_report,
        stock::stock_stats,
        stock::update_thresholds,
        stock::list_movements,
        stock::create_movement,

        service_kits::list_kits,
        service_kits::create_kit,
        service_kits::get_kit,
        service_kits::update_kit,
        service_kits::delete_kit,

        schedules::list_templates,
        schedules::create_template,
        schedules::get_template,
        schedules::update_template,
        schedules::delete_template,

        contracts::list_contracts,
        contracts::create_contract,
        contracts::expiring_contracts,
        contracts::get_contract,
        contracts::update_contract,
        contracts::delete_contract,
        contracts::change_status,
        contracts::renew_contract,

        form_templates::list_templates,
        form_templates::create_template,
        form_templates::get_template,
        form_templates::update_template,
        form_templates::delete_template,
        form_templates::validate_submission,

        geolocation::record_location,
        geolocation::latest_locations,
        geolocation::location_history,
        geolocation::nearby_agents,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::auth::Role,

            saas_admin::TenantListQuery,
            saas_admin::TenantSummary,
            services::tenants::CreateTenantInput,
            services::tenants::UpdateTenantInput,
            services::tenants::TenantStats,

            tickets::TicketListQuery,
            tickets::TicketSummary,
            services::tickets::CreateTicketInput,
            services::tickets::UpdateTicketInput,
            services::tickets::TicketStatus,
            services::tickets::TicketPriority,

            ticket_history::HistoryQuery,
            ticket_history::HistoryEntry,
            services::ticket_history::AddNoteInput,
            services::ticket_history::HistorySummary,
            services::ticket_history::HistoryAction,

            ticket_hierarchy::NodeListQuery,
            ticket_hierarchy::TreeQuery,
            ticket_hierarchy::HierarchyNode,
            ticket_hierarchy::SubcategoryBranch,
            ticket_hierarchy::CategoryBranch,
            services::ticket_hierarchy::NodeInput,
            services::ticket_hierarchy::NodeUpdate,

            items::ItemListQuery,
            items::ItemSummary,
            items::AttachmentSummary,
            items::ItemLinkSummary,
            items::CustomerLinkSummary,
            items::SupplierLinkSummary,
            services::items::CreateItemInput,
            services::items::UpdateItemInput,
            services::items::ItemStats,
            services::items::ItemType,
            services::items::ItemStatus,
            services::items::AddAttachmentInput,
            services::items::CreateItemLinkInput,
            services::items::CreateCustomerLinkInput,
            services::items::CreateSupplierLinkInput,
            services::items::LinkType,

            stock::WarehouseListQuery,
            stock::StockListQuery,
            stock::WarehouseScopeQuery,
            stock::MovementListQuery,
            stock::WarehouseSummary,
            stock::StockLevel,
            stock::MovementSummary,
            stock::MovementResult,
            services::stock::CreateWarehouseInput,
            services::stock::UpdateWarehouseInput,
            services::stock::CreateMovementInput,
            services::stock::UpdateStockThresholdsInput,
            services::stock::StockStats,
            services::stock::MovementType,

            service_kits::KitListQuery,
            service_kits::ServiceKitSummary,
            service_kits::KitItemSummary,
            service_kits::ServiceKitDetail,
            services::service_kits::CreateServiceKitInput,
            services::service_kits::UpdateServiceKitInput,
            services::service_kits::KitItemInput,
            services::service_kits::KitType,

            schedules::ScheduleListQuery,
            schedules::ScheduleTemplateSummary,
            services::schedules::CreateScheduleTemplateInput,
            services::schedules::UpdateScheduleTemplateInput,
            services::schedules::ScheduleConfiguration,
            services::schedules::ScheduleType,

            contracts::ContractListQuery,
            contracts::ExpiringQuery,
            contracts::ContractSummary,
            services::contracts::CreateContractInput,
            services::contracts::UpdateContractInput,
            services::contracts::ChangeContractStatusInput,
            services::contracts::RenewContractInput,
            services::contracts::ContractStatus,
            services::contracts::ContractType,

            form_templates::FormTemplateListQuery,
            form_templates::FormTemplateSummary,
            services::form_templates::CreateFormTemplateInput,
            services::form_templates::UpdateFormTemplateInput,
            services::form_templates::TemplateField,
            services::form_templates::TemplateTarget,
            services::form_templates::FieldType,
            services::form_templates::FormSubmission,
            services::form_templates::FieldError,
            services::form_templates::SubmissionResult,

            geolocation::HistoryWindow,
            geolocation::LocationSummary,
            services::geolocation::RecordLocationInput,
            services::geolocation::NearbyAgent,
        )
    )
)]
pub struct ApiDoc;

/// Registers the bearer JWT scheme referenced by `security`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_helpdesk_routes() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Helpdesk API"));
        assert!(json.contains("/api/tickets"));
        assert!(json.contains("/api/parts-services/stock/movements"));
        assert!(json.contains("/api/contracts/{id}/renew") || json.contains("/api/contracts/:id/renew"));
        assert!(json.contains("bearer_auth"));
    }
}
