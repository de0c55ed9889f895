use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "stock_movement_type"
)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// 活动奖品占用库存 (扣减)
    #[sea_orm(string_value = "campaign_allocation")]
    CampaignAllocation,
    /// 活动奖品释放库存 (退回)
    #[sea_orm(string_value = "campaign_deallocation")]
    CampaignDeallocation,
    #[sea_orm(string_value = "manual_adjustment")]
    ManualAdjustment,
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementType::CampaignAllocation => write!(f, "campaign_allocation"),
            MovementType::CampaignDeallocation => write!(f, "campaign_deallocation"),
            MovementType::ManualAdjustment => write!(f, "manual_adjustment"),
        }
    }
}

/// 库存流水实体
/// - quantity_change: 有符号变动量 (负数 = 扣减, 正数 = 退回)
/// - quantity_before / quantity_after: 变动前后的可用库存快照
/// - reference_type / reference_id: 业务来源 (如 campaign + 活动ID)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub movement_type: MovementType,
    pub variant_id: Uuid,
    pub organization_id: Uuid,
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub unit_cost_cents: Option<i64>,
    pub reason: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
