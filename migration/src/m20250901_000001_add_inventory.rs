use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

/// Organizations (品牌方 / 经销商 / 门店)
#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    OrgType,
    IsActive,
    CreatedAt,
}

/// Product Inventory (按 变体 + 组织 维度的库存)
#[derive(DeriveIden)]
enum ProductInventory {
    Table,
    Id,
    VariantId,
    OrganizationId,
    QuantityOnHand,
    QuantityAvailable,
    AverageCostCents,
    UpdatedAt,
}

/// Stock Movements (库存流水)
#[derive(DeriveIden)]
enum StockMovements {
    Table,
    Id,
    MovementType,
    VariantId,
    OrganizationId,
    QuantityChange,
    QuantityBefore,
    QuantityAfter,
    UnitCostCents,
    Reason,
    ReferenceType,
    ReferenceId,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("stock_movement_type"))
                    .values(vec![
                        Alias::new("campaign_allocation"),
                        Alias::new("campaign_deallocation"),
                        Alias::new("manual_adjustment"),
                    ])
                    .to_owned(),
            )
            .await?;

        // 组织表
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(Organizations::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Organizations::OrgType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Organizations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 库存表：quantity_available 永不为负
        manager
            .create_table(
                Table::create()
                    .table(ProductInventory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductInventory::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::VariantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::QuantityOnHand)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::QuantityAvailable)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(ProductInventory::QuantityAvailable).gte(0)),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::AverageCostCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_inventory_organization")
                            .from(ProductInventory::Table, ProductInventory::OrganizationId)
                            .to(Organizations::Table, Organizations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // (variant_id, organization_id) 唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_product_inventory_variant_org_unique")
                    .table(ProductInventory::Table)
                    .col(ProductInventory::VariantId)
                    .col(ProductInventory::OrganizationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 库存流水表
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MovementType)
                            .custom(Alias::new("stock_movement_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::VariantId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockMovements::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::QuantityChange)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::QuantityBefore)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::QuantityAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::UnitCostCents)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(StockMovements::Reason).text().not_null())
                    .col(
                        ColumnDef::new(StockMovements::ReferenceType)
                            .string_len(64)
                            .null(),
                    )
                    .col(ColumnDef::new(StockMovements::ReferenceId).uuid().null())
                    .col(ColumnDef::new(StockMovements::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 按业务引用查询流水
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stock_movements_reference")
                    .table(StockMovements::Table)
                    .col(StockMovements::ReferenceType)
                    .col(StockMovements::ReferenceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(StockMovements::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(ProductInventory::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(Organizations::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_type(
                Type::drop()
                    .if_exists()
                    .name(Alias::new("stock_movement_type"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
