//! SeaORM entities.
//!
//! `tenant` lives in the shared registry schema; everything else is a
//! tenant-owned table created inside each tenant schema and carries a
//! `tenant_id` column.

pub mod agent_location;
pub mod contract;
pub mod form_template;
pub mod item;
pub mod item_attachment;
pub mod item_customer_link;
pub mod item_link;
pub mod item_supplier_link;
pub mod schedule_template;
pub mod service_kit;
pub mod service_kit_item;
pub mod stock_item;
pub mod stock_movement;
pub mod tenant;
pub mod ticket;
pub mod ticket_action;
pub mod ticket_category;
pub mod ticket_history;
pub mod ticket_subcategory;
pub mod warehouse;
