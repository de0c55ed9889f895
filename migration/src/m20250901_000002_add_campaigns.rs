use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

/// Campaigns (刮刮卡 / 大转盘 活动)
#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
    OrganizationId,
    GameType,
    Name,
    Description,
    Status,
    StartAt,
    EndAt,
    MaxTotalPlays,
    MaxPlaysPerConsumer,
    ThemeConfig,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

/// Campaign Rewards (活动奖品配置)
#[derive(DeriveIden)]
enum CampaignRewards {
    Table,
    Id,
    CampaignId,
    Name,
    RewardType,
    PointsValue,
    VoucherCode,
    LinkUrl,
    VariantId,
    AllocatedQuantity,
    RemainingQuantity,
    ItemsPerWin,
    SortOrder,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

/// Campaign Plays (消费者参与记录)
#[derive(DeriveIden)]
enum CampaignPlays {
    Table,
    Id,
    CampaignId,
    ConsumerRef,
    RewardId,
    IsWinner,
    PlayedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create_enum(manager: &SchemaManager<'_>, name: &str, values: &[&str]) -> Result<(), DbErr> {
    manager
        .create_type(
            Type::create()
                .as_enum(Alias::new(name))
                .values(values.iter().map(|v| Alias::new(*v)).collect::<Vec<_>>())
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_enum(manager, "game_type", &["scratch_card", "spin_wheel"]).await?;
        create_enum(
            manager,
            "campaign_status",
            &["draft", "scheduled", "active", "ended"],
        )
        .await?;
        create_enum(
            manager,
            "reward_type",
            &["points", "product", "voucher", "link"],
        )
        .await?;

        // 活动表
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Campaigns::OrganizationId).uuid().not_null())
                    .col(
                        ColumnDef::new(Campaigns::GameType)
                            .custom(Alias::new("game_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Campaigns::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Campaigns::Description).text().null())
                    .col(
                        ColumnDef::new(Campaigns::Status)
                            .custom(Alias::new("campaign_status"))
                            .not_null()
                            .default(Expr::cust("'draft'")),
                    )
                    .col(
                        ColumnDef::new(Campaigns::StartAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::EndAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::MaxTotalPlays)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::MaxPlaysPerConsumer)
                            .integer()
                            .null(), // NULL = 不限
                    )
                    .col(
                        ColumnDef::new(Campaigns::ThemeConfig)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(ColumnDef::new(Campaigns::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Campaigns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaign_organization")
                            .from(Campaigns::Table, Campaigns::OrganizationId)
                            .to(Organizations::Table, Organizations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaigns_org_status")
                    .table(Campaigns::Table)
                    .col(Campaigns::OrganizationId)
                    .col(Campaigns::Status)
                    .to_owned(),
            )
            .await?;

        // 奖品表：删除活动时级联删除
        manager
            .create_table(
                Table::create()
                    .table(CampaignRewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignRewards::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::CampaignId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::RewardType)
                            .custom(Alias::new("reward_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(CampaignRewards::PointsValue).big_integer().null())
                    .col(
                        ColumnDef::new(CampaignRewards::VoucherCode)
                            .string_len(128)
                            .null(),
                    )
                    .col(ColumnDef::new(CampaignRewards::LinkUrl).text().null())
                    .col(ColumnDef::new(CampaignRewards::VariantId).uuid().null())
                    .col(
                        ColumnDef::new(CampaignRewards::AllocatedQuantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::RemainingQuantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::ItemsPerWin)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(CampaignRewards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaign_reward_campaign")
                            .from(CampaignRewards::Table, CampaignRewards::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaign_rewards_campaign")
                    .table(CampaignRewards::Table)
                    .col(CampaignRewards::CampaignId)
                    .to_owned(),
            )
            .await?;

        // 参与记录表：奖品被删除后保留记录 (reward_id 置空)
        manager
            .create_table(
                Table::create()
                    .table(CampaignPlays::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignPlays::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(CampaignPlays::CampaignId).uuid().not_null())
                    .col(
                        ColumnDef::new(CampaignPlays::ConsumerRef)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CampaignPlays::RewardId).uuid().null())
                    .col(
                        ColumnDef::new(CampaignPlays::IsWinner)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CampaignPlays::PlayedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaign_play_campaign")
                            .from(CampaignPlays::Table, CampaignPlays::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaign_play_reward")
                            .from(CampaignPlays::Table, CampaignPlays::RewardId)
                            .to(CampaignRewards::Table, CampaignRewards::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaign_plays_campaign_consumer")
                    .table(CampaignPlays::Table)
                    .col(CampaignPlays::CampaignId)
                    .col(CampaignPlays::ConsumerRef)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：参与记录 -> 奖品 -> 活动 -> 枚举
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(CampaignPlays::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(CampaignRewards::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Campaigns::Table).to_owned())
            .await?;

        for name in ["reward_type", "campaign_status", "game_type"] {
            manager
                .drop_type(Type::drop().if_exists().name(Alias::new(name)).to_owned())
                .await?;
        }

        Ok(())
    }
}
