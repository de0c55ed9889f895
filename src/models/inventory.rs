use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{MovementType, inventory_entity as inventory, stock_movement_entity as movements};

/// 库存记录响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryResponse {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub organization_id: Uuid,
    pub quantity_on_hand: i64,
    pub quantity_available: i64,
    pub average_cost_cents: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<inventory::Model> for InventoryResponse {
    fn from(m: inventory::Model) -> Self {
        InventoryResponse {
            id: m.id,
            variant_id: m.variant_id,
            organization_id: m.organization_id,
            quantity_on_hand: m.quantity_on_hand,
            quantity_available: m.quantity_available,
            average_cost_cents: m.average_cost_cents,
            updated_at: m.updated_at,
        }
    }
}

/// 库存流水响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockMovementResponse {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub variant_id: Uuid,
    pub organization_id: Uuid,
    /// 负数 = 扣减, 正数 = 退回
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

impl From<movements::Model> for StockMovementResponse {
    fn from(m: movements::Model) -> Self {
        StockMovementResponse {
            id: m.id,
            movement_type: m.movement_type,
            variant_id: m.variant_id,
            organization_id: m.organization_id,
            quantity_change: m.quantity_change,
            quantity_before: m.quantity_before,
            quantity_after: m.quantity_after,
            unit_cost_cents: m.unit_cost_cents,
            reason: m.reason,
            reference_type: m.reference_type,
            reference_id: m.reference_id,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}

/// 手工调整库存请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ManualAdjustmentRequest {
    pub variant_id: Uuid,
    pub organization_id: Uuid,
    pub quantity_change: i64,
    pub unit_cost_cents: Option<i64>,
    pub reason: String,
}

/// 库存流水查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct StockMovementQuery {
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
}
