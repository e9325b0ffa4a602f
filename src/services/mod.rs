// Domain services. Each one opens a tenant-routed transaction through
// `TenantSchemas` and filters every query by the caller's tenant id.
pub mod contracts;
pub mod form_templates;
pub mod geolocation;
pub mod items;
pub mod schedules;
pub mod service_kits;
pub mod stock;
pub mod tenants;
pub mod ticket_hierarchy;
pub mod ticket_history;
pub mod tickets;
pub mod validation;

/// Highest page number a list request may ask for.
pub const MAX_PAGE: u64 = 100_000;

/// Page request after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_offsets_are_one_based() {
        assert_eq!(Page::new(1, 20).offset(), 0);
        assert_eq!(Page::new(3, 10).offset(), 20);
        assert_eq!(Page::new(0, 0), Page::new(1, 1));
        assert_eq!(Page::new(u64::MAX, 100).offset(), u64::MAX);
    }
}
