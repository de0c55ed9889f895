use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reward_type")]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    #[sea_orm(string_value = "points")]
    Points,
    /// 实物奖品，关联库存变体
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "voucher")]
    Voucher,
    #[sea_orm(string_value = "link")]
    Link,
}

impl std::fmt::Display for RewardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardType::Points => write!(f, "points"),
            RewardType::Product => write!(f, "product"),
            RewardType::Voucher => write!(f, "voucher"),
            RewardType::Link => write!(f, "link"),
        }
    }
}

/// 活动奖品实体
/// 概念说明:
/// - allocated_quantity: 分配的中奖次数 (占用活动总参与预算)
/// - remaining_quantity: 剩余可中奖次数
/// - items_per_win: 每次中奖发放的实物数量 (仅 product 类型参与库存计算)
/// - variant_id: product 类型关联的商品变体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub reward_type: RewardType,
    pub points_value: Option<i64>,
    pub voucher_code: Option<String>,
    pub link_url: Option<String>,
    pub variant_id: Option<Uuid>,
    pub allocated_quantity: i64,
    pub remaining_quantity: i64,
    pub items_per_win: i64,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 是否还能被抽中
    pub fn is_available(&self) -> bool {
        self.is_active && self.remaining_quantity > 0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaigns::Entity",
        from = "Column::CampaignId",
        to = "super::campaigns::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Campaign,
}

impl Related<super::campaigns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
