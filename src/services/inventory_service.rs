use crate::entities::{
    MovementType, inventory_entity as inventory, stock_movement_entity as movements,
};
use crate::error::{AppError, AppResult};
use crate::models::{ManualAdjustmentRequest, StockMovementQuery};
use crate::utils::AuthUser;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use uuid::Uuid;

/// 一次库存调整 (对应数据库中的库存流水)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub movement_type: MovementType,
    pub variant_id: Uuid,
    pub organization_id: Uuid,
    /// 有符号变动量：负数扣减，正数退回
    pub quantity_change: i64,
    pub unit_cost_cents: Option<i64>,
    pub reason: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// 库存访问边界
/// 奖品库存同步只通过该接口读写库存，测试中可替换为内存实现
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// 某个变体在所有组织下的库存记录
    /// 按可用库存降序、组织 id 升序返回，选择目标库存依赖该顺序
    async fn list_inventory(&self, variant_id: Uuid) -> AppResult<Vec<inventory::Model>>;

    /// 记录库存流水并调整可用库存，库存不足时返回错误
    async fn record_stock_movement(
        &self,
        adjustment: StockAdjustment,
    ) -> AppResult<movements::Model>;
}

#[derive(Clone)]
pub struct InventoryService {
    pool: DatabaseConnection,
}

impl InventoryService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 变体在各组织的库存 (仅返回当前用户可管理的组织)
    pub async fn variant_inventory(
        &self,
        user: &AuthUser,
        variant_id: Uuid,
    ) -> AppResult<Vec<inventory::Model>> {
        let rows = self.list_inventory(variant_id).await?;
        Ok(rows
            .into_iter()
            .filter(|row| user.can_manage(row.organization_id))
            .collect())
    }

    /// 按业务引用查询库存流水 (倒序)
    pub async fn list_movements(
        &self,
        query: &StockMovementQuery,
    ) -> AppResult<Vec<movements::Model>> {
        let mut select = movements::Entity::find();
        if let Some(reference_type) = &query.reference_type {
            select = select.filter(movements::Column::ReferenceType.eq(reference_type.clone()));
        }
        if let Some(reference_id) = query.reference_id {
            select = select.filter(movements::Column::ReferenceId.eq(reference_id));
        }
        if let Some(variant_id) = query.variant_id {
            select = select.filter(movements::Column::VariantId.eq(variant_id));
        }
        Ok(select
            .order_by_desc(movements::Column::CreatedAt)
            .all(&self.pool)
            .await?)
    }

    /// 后台手工调整库存
    pub async fn manual_adjust(
        &self,
        user: &AuthUser,
        request: ManualAdjustmentRequest,
    ) -> AppResult<movements::Model> {
        validate_manual_adjustment(user, &request)?;

        self.record_stock_movement(StockAdjustment {
            movement_type: MovementType::ManualAdjustment,
            variant_id: request.variant_id,
            organization_id: request.organization_id,
            quantity_change: request.quantity_change,
            unit_cost_cents: request.unit_cost_cents,
            reason: request.reason.trim().to_string(),
            reference_type: None,
            reference_id: None,
            created_by: Some(user.user_id),
        })
        .await
    }
}

#[async_trait]
impl InventoryGateway for InventoryService {
    async fn list_inventory(&self, variant_id: Uuid) -> AppResult<Vec<inventory::Model>> {
        Ok(inventory::Entity::find()
            .filter(inventory::Column::VariantId.eq(variant_id))
            .order_by_desc(inventory::Column::QuantityAvailable)
            .order_by_asc(inventory::Column::OrganizationId)
            .all(&self.pool)
            .await?)
    }

    /// 逻辑:
    /// 1. 找到 (变体, 组织) 的库存记录
    /// 2. 带条件原子更新 (where quantity_available + change >= 0)
    /// 3. 写库存流水 (记录变动前后数量)
    async fn record_stock_movement(
        &self,
        adjustment: StockAdjustment,
    ) -> AppResult<movements::Model> {
        let txn = self.pool.begin().await?;

        let row = inventory::Entity::find()
            .filter(inventory::Column::VariantId.eq(adjustment.variant_id))
            .filter(inventory::Column::OrganizationId.eq(adjustment.organization_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Inventory record for variant {} at organization {}",
                    adjustment.variant_id, adjustment.organization_id
                ))
            })?;

        let change = adjustment.quantity_change;
        // 需要的最少可用库存 (退回时为负数)
        let required_available = minimum_available(change)?;
        let update_result = inventory::Entity::update_many()
            .col_expr(
                inventory::Column::QuantityAvailable,
                Expr::col(inventory::Column::QuantityAvailable).add(change),
            )
            .col_expr(
                inventory::Column::QuantityOnHand,
                Expr::col(inventory::Column::QuantityOnHand).add(change),
            )
            .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory::Column::Id.eq(row.id))
            .filter(inventory::Column::QuantityAvailable.gte(required_available))
            .exec(&txn)
            .await?;

        if update_result.rows_affected != 1 {
            // txn 未提交，丢弃即回滚
            return Err(AppError::ValidationError(format!(
                "Insufficient stock for variant {}: available {}, requested {}",
                adjustment.variant_id, row.quantity_available, required_available
            )));
        }

        let updated = inventory::Entity::find_by_id(row.id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::InternalError("Inventory row disappeared".into()))?;

        let movement = movements::ActiveModel {
            id: Set(Uuid::new_v4()),
            movement_type: Set(adjustment.movement_type),
            variant_id: Set(adjustment.variant_id),
            organization_id: Set(adjustment.organization_id),
            quantity_change: Set(change),
            quantity_before: Set(updated.quantity_available - change),
            quantity_after: Set(updated.quantity_available),
            unit_cost_cents: Set(adjustment.unit_cost_cents),
            reason: Set(adjustment.reason),
            reference_type: Set(adjustment.reference_type),
            reference_id: Set(adjustment.reference_id),
            created_by: Set(adjustment.created_by),
            created_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!(
            "Stock movement {} recorded: variant={} org={} change={}",
            movement.movement_type,
            movement.variant_id,
            movement.organization_id,
            movement.quantity_change
        );
        Ok(movement)
    }
}

fn validate_manual_adjustment(user: &AuthUser, request: &ManualAdjustmentRequest) -> AppResult<()> {
    if !user.can_manage(request.organization_id) {
        return Err(AppError::Forbidden);
    }
    if request.quantity_change == 0 {
        return Err(AppError::ValidationError(
            "Quantity change must not be zero".into(),
        ));
    }
    minimum_available(request.quantity_change)?;
    if request.reason.trim().is_empty() {
        return Err(AppError::ValidationError("Reason is required".into()));
    }
    Ok(())
}

/// 变动后库存不为负所需的最少可用数量：available + change >= 0
fn minimum_available(change: i64) -> AppResult<i64> {
    change
        .checked_neg()
        .ok_or_else(|| AppError::ValidationError("Quantity change is out of range".into()))
}
