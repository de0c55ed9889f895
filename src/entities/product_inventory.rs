use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 库存实体
/// 说明:
/// - 每个 (variant_id, organization_id) 一条记录
/// - quantity_available: 可用库存，数据库层约束不得小于 0
/// - average_cost_cents: 平均成本(分)，写库存流水时作为单位成本
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "product_inventory")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variant_id: Uuid,
    pub organization_id: Uuid,
    pub quantity_on_hand: i64,
    pub quantity_available: i64,
    pub average_cost_cents: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
