use sea_orm_migration::prelude::*;

/// Registry migrations. Run once against the shared (`public`) schema.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_create_tenants_table::Migration)]
    }
}

/// Tenant table migrations. Run inside every tenant schema on PostgreSQL,
/// or once next to the registry on backends without schemas.
pub struct TenantMigrator;

#[async_trait::async_trait]
impl MigratorTrait for TenantMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240102_000001_create_ticket_hierarchy_tables::Migration),
            Box::new(m20240102_000002_create_tickets_tables::Migration),
            Box::new(m20240102_000003_create_items_tables::Migration),
            Box::new(m20240102_000004_create_stock_tables::Migration),
            Box::new(m20240102_000005_create_service_kit_tables::Migration),
            Box::new(m20240102_000006_create_schedule_templates_table::Migration),
            Box::new(m20240102_000007_create_contracts_table::Migration),
            Box::new(m20240102_000008_create_form_templates_table::Migration),
            Box::new(m20240102_000009_create_agent_locations_table::Migration),
        ]
    }

    // Kept apart from the registry's bookkeeping table so the two migrators
    // can share one database on SQLite.
    fn migration_table_name() -> DynIden {
        Alias::new("tenant_migrations").into_iden()
    }
}

mod m20240101_000001_create_tenants_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_tenants_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tenants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tenants::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tenants::Name).string().not_null())
                        .col(
                            ColumnDef::new(Tenants::Subdomain)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Tenants::SchemaName).string().not_null())
                        .col(ColumnDef::new(Tenants::Settings).json().not_null())
                        .col(
                            ColumnDef::new(Tenants::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Tenants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tenants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tenants::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Tenants {
        Table,
        Id,
        Name,
        Subdomain,
        SchemaName,
        Settings,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000001_create_ticket_hierarchy_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000001_create_ticket_hierarchy_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TicketCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TicketCategories::TenantId).uuid().not_null())
                        .col(ColumnDef::new(TicketCategories::CompanyId).uuid().null())
                        .col(ColumnDef::new(TicketCategories::Name).string().not_null())
                        .col(ColumnDef::new(TicketCategories::Description).text().null())
                        .col(ColumnDef::new(TicketCategories::Color).string().null())
                        .col(ColumnDef::new(TicketCategories::Icon).string().null())
                        .col(
                            ColumnDef::new(TicketCategories::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TicketCategories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(TicketCategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketCategories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TicketSubcategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketSubcategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketSubcategories::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketSubcategories::CategoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TicketSubcategories::CompanyId).uuid().null())
                        .col(ColumnDef::new(TicketSubcategories::Name).string().not_null())
                        .col(
                            ColumnDef::new(TicketSubcategories::Description)
                                .text()
                                .null(),
                        )
                        .col(ColumnDef::new(TicketSubcategories::Color).string().null())
                        .col(ColumnDef::new(TicketSubcategories::Icon).string().null())
                        .col(
                            ColumnDef::new(TicketSubcategories::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TicketSubcategories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(TicketSubcategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketSubcategories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ticket_subcategories_category")
                                .from(TicketSubcategories::Table, TicketSubcategories::CategoryId)
                                .to(TicketCategories::Table, TicketCategories::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TicketActions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketActions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TicketActions::TenantId).uuid().not_null())
                        .col(ColumnDef::new(TicketActions::SubcategoryId).uuid().not_null())
                        .col(ColumnDef::new(TicketActions::CompanyId).uuid().null())
                        .col(ColumnDef::new(TicketActions::Name).string().not_null())
                        .col(ColumnDef::new(TicketActions::Description).text().null())
                        .col(
                            ColumnDef::new(TicketActions::EstimatedTimeMinutes)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(TicketActions::Color).string().null())
                        .col(ColumnDef::new(TicketActions::Icon).string().null())
                        .col(
                            ColumnDef::new(TicketActions::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TicketActions::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(TicketActions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TicketActions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ticket_actions_subcategory")
                                .from(TicketActions::Table, TicketActions::SubcategoryId)
                                .to(TicketSubcategories::Table, TicketSubcategories::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ticket_categories_tenant")
                        .table(TicketCategories::Table)
                        .col(TicketCategories::TenantId)
                        .col(TicketCategories::CompanyId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ticket_subcategories_category")
                        .table(TicketSubcategories::Table)
                        .col(TicketSubcategories::TenantId)
                        .col(TicketSubcategories::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ticket_actions_subcategory")
                        .table(TicketActions::Table)
                        .col(TicketActions::TenantId)
                        .col(TicketActions::SubcategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TicketActions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TicketSubcategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TicketCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum TicketCategories {
        Table,
        Id,
        TenantId,
        CompanyId,
        Name,
        Description,
        Color,
        Icon,
        SortOrder,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum TicketSubcategories {
        Table,
        Id,
        TenantId,
        CategoryId,
        CompanyId,
        Name,
        Description,
        Color,
        Icon,
        SortOrder,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TicketActions {
        Table,
        Id,
        TenantId,
        SubcategoryId,
        CompanyId,
        Name,
        Description,
        EstimatedTimeMinutes,
        Color,
        Icon,
        SortOrder,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000002_create_tickets_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000002_create_tickets_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tickets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tickets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tickets::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Tickets::Number).string().not_null())
                        .col(ColumnDef::new(Tickets::Subject).string_len(500).not_null())
                        .col(ColumnDef::new(Tickets::Description).text().null())
                        .col(ColumnDef::new(Tickets::Status).string().not_null())
                        .col(ColumnDef::new(Tickets::Priority).string().not_null())
                        .col(ColumnDef::new(Tickets::Urgency).string().null())
                        .col(ColumnDef::new(Tickets::Impact).string().null())
                        .col(ColumnDef::new(Tickets::CategoryId).uuid().null())
                        .col(ColumnDef::new(Tickets::SubcategoryId).uuid().null())
                        .col(ColumnDef::new(Tickets::ActionId).uuid().null())
                        .col(ColumnDef::new(Tickets::CompanyId).uuid().null())
                        .col(ColumnDef::new(Tickets::CallerId).uuid().null())
                        .col(ColumnDef::new(Tickets::AssignedToId).uuid().null())
                        .col(ColumnDef::new(Tickets::AssignmentGroup).string().null())
                        .col(ColumnDef::new(Tickets::Tags).json().not_null())
                        .col(ColumnDef::new(Tickets::CustomFields).json().not_null())
                        .col(
                            ColumnDef::new(Tickets::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Tickets::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Tickets::UpdatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Tickets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tickets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tickets::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Tickets::ClosedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TicketHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TicketHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TicketHistory::TenantId).uuid().not_null())
                        .col(ColumnDef::new(TicketHistory::TicketId).uuid().not_null())
                        .col(ColumnDef::new(TicketHistory::ActionType).string().not_null())
                        .col(ColumnDef::new(TicketHistory::FieldName).string().null())
                        .col(ColumnDef::new(TicketHistory::OldValue).text().null())
                        .col(ColumnDef::new(TicketHistory::NewValue).text().null())
                        .col(ColumnDef::new(TicketHistory::Description).text().not_null())
                        .col(ColumnDef::new(TicketHistory::PerformedBy).uuid().not_null())
                        .col(ColumnDef::new(TicketHistory::PerformedByName).string().null())
                        .col(ColumnDef::new(TicketHistory::IpAddress).string().null())
                        .col(ColumnDef::new(TicketHistory::UserAgent).string().null())
                        .col(ColumnDef::new(TicketHistory::Metadata).json().not_null())
                        .col(
                            ColumnDef::new(TicketHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ticket_history_ticket")
                                .from(TicketHistory::Table, TicketHistory::TicketId)
                                .to(Tickets::Table, Tickets::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tickets_tenant_number")
                        .table(Tickets::Table)
                        .col(Tickets::TenantId)
                        .col(Tickets::Number)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tickets_status")
                        .table(Tickets::Table)
                        .col(Tickets::TenantId)
                        .col(Tickets::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tickets_assigned_to")
                        .table(Tickets::Table)
                        .col(Tickets::AssignedToId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ticket_history_ticket")
                        .table(TicketHistory::Table)
                        .col(TicketHistory::TenantId)
                        .col(TicketHistory::TicketId)
                        .col(TicketHistory::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TicketHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Tickets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Tickets {
        Table,
        Id,
        TenantId,
        Number,
        Subject,
        Description,
        Status,
        Priority,
        Urgency,
        Impact,
        CategoryId,
        SubcategoryId,
        ActionId,
        CompanyId,
        CallerId,
        AssignedToId,
        AssignmentGroup,
        Tags,
        CustomFields,
        IsActive,
        CreatedBy,
        UpdatedBy,
        CreatedAt,
        UpdatedAt,
        ResolvedAt,
        ClosedAt,
    }

    #[derive(DeriveIden)]
    enum TicketHistory {
        Table,
        Id,
        TenantId,
        TicketId,
        ActionType,
        FieldName,
        OldValue,
        NewValue,
        Description,
        PerformedBy,
        PerformedByName,
        IpAddress,
        UserAgent,
        Metadata,
        CreatedAt,
    }
}

mod m20240102_000003_create_items_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000003_create_items_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::ItemType).string().not_null())
                        .col(ColumnDef::new(Items::IntegrationCode).string().null())
                        .col(ColumnDef::new(Items::Description).text().null())
                        .col(ColumnDef::new(Items::MeasurementUnit).string().not_null())
                        .col(ColumnDef::new(Items::MaintenancePlan).string().null())
                        .col(ColumnDef::new(Items::GroupName).string().null())
                        .col(ColumnDef::new(Items::Checklist).json().not_null())
                        .col(ColumnDef::new(Items::Status).string().not_null())
                        .col(
                            ColumnDef::new(Items::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Items::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemAttachments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ItemAttachments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ItemAttachments::TenantId).uuid().not_null())
                        .col(ColumnDef::new(ItemAttachments::ItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemAttachments::FileName).string().not_null())
                        .col(ColumnDef::new(ItemAttachments::FileUrl).string().not_null())
                        .col(
                            ColumnDef::new(ItemAttachments::FileSize)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ItemAttachments::ContentType).string().null())
                        .col(ColumnDef::new(ItemAttachments::UploadedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(ItemAttachments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_item_attachments_item")
                                .from(ItemAttachments::Table, ItemAttachments::ItemId)
                                .to(Items::Table, Items::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemLinks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ItemLinks::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ItemLinks::TenantId).uuid().not_null())
                        .col(ColumnDef::new(ItemLinks::ParentItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemLinks::LinkedItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemLinks::LinkType).string().not_null())
                        .col(
                            ColumnDef::new(ItemLinks::Quantity)
                                .decimal()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(ItemLinks::Notes).text().null())
                        .col(
                            ColumnDef::new(ItemLinks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemCustomerLinks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ItemCustomerLinks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ItemCustomerLinks::TenantId).uuid().not_null())
                        .col(ColumnDef::new(ItemCustomerLinks::ItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemCustomerLinks::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(ItemCustomerLinks::Alias).string().null())
                        .col(ColumnDef::new(ItemCustomerLinks::Sku).string().null())
                        .col(ColumnDef::new(ItemCustomerLinks::Barcode).string().null())
                        .col(
                            ColumnDef::new(ItemCustomerLinks::IsAsset)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ItemCustomerLinks::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ItemCustomerLinks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemCustomerLinks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemSupplierLinks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ItemSupplierLinks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ItemSupplierLinks::TenantId).uuid().not_null())
                        .col(ColumnDef::new(ItemSupplierLinks::ItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemSupplierLinks::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(ItemSupplierLinks::PartNumber).string().null())
                        .col(ColumnDef::new(ItemSupplierLinks::Description).text().null())
                        .col(ColumnDef::new(ItemSupplierLinks::UnitPrice).decimal().null())
                        .col(
                            ColumnDef::new(ItemSupplierLinks::LeadTimeDays)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ItemSupplierLinks::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ItemSupplierLinks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemSupplierLinks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // NULL codes do not collide, so only coded items are unique.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_tenant_integration_code")
                        .table(Items::Table)
                        .col(Items::TenantId)
                        .col(Items::IntegrationCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_item_links_pair")
                        .table(ItemLinks::Table)
                        .col(ItemLinks::TenantId)
                        .col(ItemLinks::ParentItemId)
                        .col(ItemLinks::LinkedItemId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_item_customer_links_item")
                        .table(ItemCustomerLinks::Table)
                        .col(ItemCustomerLinks::TenantId)
                        .col(ItemCustomerLinks::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_item_supplier_links_item")
                        .table(ItemSupplierLinks::Table)
                        .col(ItemSupplierLinks::TenantId)
                        .col(ItemSupplierLinks::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                ItemSupplierLinks::Table.into_iden(),
                ItemCustomerLinks::Table.into_iden(),
                ItemLinks::Table.into_iden(),
                ItemAttachments::Table.into_iden(),
                Items::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
        TenantId,
        Name,
        ItemType,
        IntegrationCode,
        Description,
        MeasurementUnit,
        MaintenancePlan,
        GroupName,
        Checklist,
        Status,
        IsActive,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ItemAttachments {
        Table,
        Id,
        TenantId,
        ItemId,
        FileName,
        FileUrl,
        FileSize,
        ContentType,
        UploadedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ItemLinks {
        Table,
        Id,
        TenantId,
        ParentItemId,
        LinkedItemId,
        LinkType,
        Quantity,
        Notes,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ItemCustomerLinks {
        Table,
        Id,
        TenantId,
        ItemId,
        CustomerId,
        Alias,
        Sku,
        Barcode,
        IsAsset,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ItemSupplierLinks {
        Table,
        Id,
        TenantId,
        ItemId,
        SupplierId,
        PartNumber,
        Description,
        UnitPrice,
        LeadTimeDays,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000004_create_stock_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000004_create_stock_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Warehouses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Warehouses::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::Code).string().not_null())
                        .col(ColumnDef::new(Warehouses::Address).text().null())
                        .col(ColumnDef::new(Warehouses::WarehouseType).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(StockItems::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockItems::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockItems::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockItems::Quantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockItems::ReservedQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockItems::MinimumStock)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockItems::MaximumStock).decimal().null())
                        .col(
                            ColumnDef::new(StockItems::UnitCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockItems::BinLocation).string().null())
                        .col(
                            ColumnDef::new(StockItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_items_warehouse")
                                .from(StockItems::Table, StockItems::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::DestinationWarehouseId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovements::MovementType).string().not_null())
                        .col(ColumnDef::new(StockMovements::Quantity).decimal().not_null())
                        .col(ColumnDef::new(StockMovements::UnitCost).decimal().null())
                        .col(ColumnDef::new(StockMovements::Reason).text().null())
                        .col(
                            ColumnDef::new(StockMovements::ReferenceDocument)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovements::PerformedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouses_tenant_code")
                        .table(Warehouses::Table)
                        .col(Warehouses::TenantId)
                        .col(Warehouses::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_items_item_warehouse")
                        .table(StockItems::Table)
                        .col(StockItems::TenantId)
                        .col(StockItems::ItemId)
                        .col(StockItems::WarehouseId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_item")
                        .table(StockMovements::Table)
                        .col(StockMovements::TenantId)
                        .col(StockMovements::ItemId)
                        .col(StockMovements::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Id,
        TenantId,
        Name,
        Code,
        Address,
        WarehouseType,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockItems {
        Table,
        Id,
        TenantId,
        ItemId,
        WarehouseId,
        Quantity,
        ReservedQuantity,
        MinimumStock,
        MaximumStock,
        UnitCost,
        BinLocation,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        TenantId,
        ItemId,
        WarehouseId,
        DestinationWarehouseId,
        MovementType,
        Quantity,
        UnitCost,
        Reason,
        ReferenceDocument,
        PerformedBy,
        CreatedAt,
    }
}

mod m20240102_000005_create_service_kit_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000005_create_service_kit_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ServiceKits::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ServiceKits::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ServiceKits::TenantId).uuid().not_null())
                        .col(ColumnDef::new(ServiceKits::Name).string().not_null())
                        .col(ColumnDef::new(ServiceKits::Description).text().null())
                        .col(ColumnDef::new(ServiceKits::KitType).string().not_null())
                        .col(ColumnDef::new(ServiceKits::EquipmentModel).string().null())
                        .col(
                            ColumnDef::new(ServiceKits::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(ServiceKits::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(ServiceKits::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceKits::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ServiceKitItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceKitItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceKitItems::TenantId).uuid().not_null())
                        .col(ColumnDef::new(ServiceKitItems::KitId).uuid().not_null())
                        .col(ColumnDef::new(ServiceKitItems::ItemId).uuid().not_null())
                        .col(ColumnDef::new(ServiceKitItems::Quantity).decimal().not_null())
                        .col(
                            ColumnDef::new(ServiceKitItems::IsOptional)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_service_kit_items_kit")
                                .from(ServiceKitItems::Table, ServiceKitItems::KitId)
                                .to(ServiceKits::Table, ServiceKits::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_kit_items_kit_item")
                        .table(ServiceKitItems::Table)
                        .col(ServiceKitItems::KitId)
                        .col(ServiceKitItems::ItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ServiceKitItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ServiceKits::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ServiceKits {
        Table,
        Id,
        TenantId,
        Name,
        Description,
        KitType,
        EquipmentModel,
        IsActive,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ServiceKitItems {
        Table,
        Id,
        TenantId,
        KitId,
        ItemId,
        Quantity,
        IsOptional,
    }
}

mod m20240102_000006_create_schedule_templates_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000006_create_schedule_templates_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ScheduleTemplates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ScheduleTemplates::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ScheduleTemplates::TenantId).uuid().not_null())
                        .col(ColumnDef::new(ScheduleTemplates::Name).string().not_null())
                        .col(ColumnDef::new(ScheduleTemplates::Description).text().null())
                        .col(
                            ColumnDef::new(ScheduleTemplates::ScheduleType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ScheduleTemplates::RotationCycleDays)
                                .integer()
                                .not_null()
                                .default(7),
                        )
                        .col(
                            ColumnDef::new(ScheduleTemplates::Configuration)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ScheduleTemplates::RequiresApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ScheduleTemplates::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(ScheduleTemplates::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(ScheduleTemplates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ScheduleTemplates::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ScheduleTemplates::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ScheduleTemplates {
        Table,
        Id,
        TenantId,
        Name,
        Description,
        ScheduleType,
        RotationCycleDays,
        Configuration,
        RequiresApproval,
        IsActive,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000007_create_contracts_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000007_create_contracts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Contracts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Contracts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Contracts::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Contracts::ContractNumber).string().not_null())
                        .col(ColumnDef::new(Contracts::Title).string().not_null())
                        .col(ColumnDef::new(Contracts::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Contracts::CustomerCompanyId).uuid().null())
                        .col(ColumnDef::new(Contracts::ContractType).string().not_null())
                        .col(ColumnDef::new(Contracts::Status).string().not_null())
                        .col(ColumnDef::new(Contracts::Priority).string().not_null())
                        .col(ColumnDef::new(Contracts::StartDate).date().not_null())
                        .col(ColumnDef::new(Contracts::EndDate).date().not_null())
                        .col(ColumnDef::new(Contracts::RenewalDate).date().null())
                        .col(
                            ColumnDef::new(Contracts::AutoRenewal)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Contracts::MonthlyValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Contracts::TotalValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Contracts::Currency).string().not_null())
                        .col(ColumnDef::new(Contracts::ManagerId).uuid().null())
                        .col(ColumnDef::new(Contracts::Description).text().null())
                        .col(ColumnDef::new(Contracts::Terms).text().null())
                        .col(
                            ColumnDef::new(Contracts::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Contracts::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Contracts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Contracts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_contracts_tenant_number")
                        .table(Contracts::Table)
                        .col(Contracts::TenantId)
                        .col(Contracts::ContractNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_contracts_end_date")
                        .table(Contracts::Table)
                        .col(Contracts::TenantId)
                        .col(Contracts::Status)
                        .col(Contracts::EndDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Contracts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Contracts {
        Table,
        Id,
        TenantId,
        ContractNumber,
        Title,
        CustomerId,
        CustomerCompanyId,
        ContractType,
        Status,
        Priority,
        StartDate,
        EndDate,
        RenewalDate,
        AutoRenewal,
        MonthlyValue,
        TotalValue,
        Currency,
        ManagerId,
        Description,
        Terms,
        IsActive,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000008_create_form_templates_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000008_create_form_templates_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FormTemplates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FormTemplates::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FormTemplates::TenantId).uuid().not_null())
                        .col(ColumnDef::new(FormTemplates::Name).string().not_null())
                        .col(ColumnDef::new(FormTemplates::Description).text().null())
                        .col(ColumnDef::new(FormTemplates::Target).string().not_null())
                        .col(ColumnDef::new(FormTemplates::Fields).json().not_null())
                        .col(
                            ColumnDef::new(FormTemplates::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(FormTemplates::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(FormTemplates::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(FormTemplates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FormTemplates::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FormTemplates::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FormTemplates {
        Table,
        Id,
        TenantId,
        Name,
        Description,
        Target,
        Fields,
        Version,
        IsActive,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000009_create_agent_locations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000009_create_agent_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AgentLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AgentLocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AgentLocations::TenantId).uuid().not_null())
                        .col(ColumnDef::new(AgentLocations::UserId).uuid().not_null())
                        .col(ColumnDef::new(AgentLocations::Latitude).double().not_null())
                        .col(ColumnDef::new(AgentLocations::Longitude).double().not_null())
                        .col(ColumnDef::new(AgentLocations::AccuracyMeters).double().null())
                        .col(
                            ColumnDef::new(AgentLocations::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AgentLocations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_agent_locations_user_recorded")
                        .table(AgentLocations::Table)
                        .col(AgentLocations::TenantId)
                        .col(AgentLocations::UserId)
                        .col(AgentLocations::RecordedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AgentLocations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AgentLocations {
        Table,
        Id,
        TenantId,
        UserId,
        Latitude,
        Longitude,
        AccuracyMeters,
        RecordedAt,
        CreatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_migrations_use_their_own_bookkeeping_table() {
        let tenant_table = Iden::to_string(&*TenantMigrator::migration_table_name());
        let registry_table = Iden::to_string(&*Migrator::migration_table_name());
        assert_eq!(tenant_table, "tenant_migrations");
        assert_ne!(tenant_table, registry_table);
    }

    #[test]
    fn migration_names_are_unique() {
        let mut names: Vec<String> = Migrator::migrations()
            .iter()
            .chain(TenantMigrator::migrations().iter())
            .map(|m| m.name().to_string())
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
