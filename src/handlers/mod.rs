pub mod common;
pub mod contracts;
pub mod extract;
pub mod form_templates;
pub mod geolocation;
pub mod items;
pub mod saas_admin;
pub mod schedules;
pub mod service_kits;
pub mod stock;
pub mod tenant_admin;
pub mod ticket_hierarchy;
pub mod ticket_history;
pub mod tickets;

use crate::{
    db::TenantSchemas,
    services::{
        contracts::ContractService, form_templates::FormTemplateService,
        geolocation::GeolocationService, items::ItemService, schedules::ScheduleService,
        service_kits::ServiceKitService, stock::StockService, tenants::TenantService,
        ticket_hierarchy::TicketHierarchyService, ticket_history::TicketHistoryService,
        tickets::TicketService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub tenants: Arc<TenantService>,
    pub tickets: Arc<TicketService>,
    pub ticket_history: Arc<TicketHistoryService>,
    pub hierarchy: Arc<TicketHierarchyService>,
    pub items: Arc<ItemService>,
    pub stock: Arc<StockService>,
    pub service_kits: Arc<ServiceKitService>,
    pub schedules: Arc<ScheduleService>,
    pub contracts: Arc<ContractService>,
    pub form_templates: Arc<FormTemplateService>,
    pub geolocation: Arc<GeolocationService>,
}

impl AppServices {
    /// Builds every service on top of the shared tenant schema router.
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self {
            tenants: Arc::new(TenantService::new(schemas.clone())),
            tickets: Arc::new(TicketService::new(schemas.clone())),
            ticket_history: Arc::new(TicketHistoryService::new(schemas.clone())),
            hierarchy: Arc::new(TicketHierarchyService::new(schemas.clone())),
            items: Arc::new(ItemService::new(schemas.clone())),
            stock: Arc::new(StockService::new(schemas.clone())),
            service_kits: Arc::new(ServiceKitService::new(schemas.clone())),
            schedules: Arc::new(ScheduleService::new(schemas.clone())),
            contracts: Arc::new(ContractService::new(schemas.clone())),
            form_templates: Arc::new(FormTemplateService::new(schemas.clone())),
            geolocation: Arc::new(GeolocationService::new(schemas)),
        }
    }
}
