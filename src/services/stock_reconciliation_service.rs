//! 活动奖品库存同步
//!
//! 活动保存 / 删除后，根据编辑前后的奖品配置计算每个商品变体的净差额，
//! 为每个变体选择目标组织并写一条库存流水。
//! 活动与奖品已经落库，这里的失败只作为警告返回给调用方，不回滚。

use crate::entities::{GameType, MovementType, stock_movement_entity as movements};
use crate::services::{InventoryGateway, StockAdjustment};
use crate::utils::{RewardAllocation, StockDelta, compute_stock_deltas, select_target_inventory};
use std::sync::Arc;
use uuid::Uuid;

pub const CAMPAIGN_REFERENCE_TYPE: &str = "campaign";

/// 库存同步所需的活动信息
#[derive(Debug, Clone)]
pub struct CampaignStockContext {
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub game_type: GameType,
    /// 活动所属组织，选择库存时优先
    pub owner_organization_id: Uuid,
    pub acting_user_id: Option<Uuid>,
}

impl CampaignStockContext {
    fn reason(&self, delta: &StockDelta) -> String {
        if delta.is_deduction() {
            format!(
                "Allocated to {} campaign: {}",
                self.game_type.label(),
                self.campaign_name
            )
        } else {
            format!(
                "Returned from {} campaign: {}",
                self.game_type.label(),
                self.campaign_name
            )
        }
    }
}

/// 同步结果：成功写入的流水 + 失败的警告
#[derive(Debug, Clone, Default)]
pub struct StockSyncReport {
    pub movements: Vec<movements::Model>,
    pub warnings: Vec<String>,
}

impl StockSyncReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Clone)]
pub struct StockReconciler {
    gateway: Arc<dyn InventoryGateway>,
}

impl StockReconciler {
    pub fn new(gateway: Arc<dyn InventoryGateway>) -> Self {
        Self { gateway }
    }

    /// 对比编辑前后的奖品配置并同步库存
    pub async fn reconcile(
        &self,
        ctx: &CampaignStockContext,
        previous: &[RewardAllocation],
        next: &[RewardAllocation],
    ) -> StockSyncReport {
        match compute_stock_deltas(previous, next) {
            Ok(deltas) => self.apply(ctx, &deltas).await,
            Err(e) => {
                log::warn!("Stock sync skipped for campaign {}: {e}", ctx.campaign_id);
                StockSyncReport {
                    movements: vec![],
                    warnings: vec![e.to_string()],
                }
            }
        }
    }

    /// 每个变体一次库存调整；逐个处理，单个失败不影响其它变体，不重试
    pub async fn apply(&self, ctx: &CampaignStockContext, deltas: &[StockDelta]) -> StockSyncReport {
        let mut report = StockSyncReport::default();

        for delta in deltas.iter().filter(|d| d.delta != 0) {
            match self.apply_one(ctx, delta).await {
                Ok(movement) => report.movements.push(movement),
                Err(warning) => {
                    log::warn!(
                        "Stock sync failed for campaign {} variant {}: {}",
                        ctx.campaign_id,
                        delta.variant_id,
                        warning
                    );
                    report.warnings.push(warning);
                }
            }
        }

        report
    }

    async fn apply_one(
        &self,
        ctx: &CampaignStockContext,
        delta: &StockDelta,
    ) -> Result<movements::Model, String> {
        let rows = self
            .gateway
            .list_inventory(delta.variant_id)
            .await
            .map_err(|e| format!("Failed to load inventory for variant {}: {e}", delta.variant_id))?;

        // 不在这里复核库存是否充足，由库存层拒绝负库存
        let target = select_target_inventory(&rows, ctx.owner_organization_id, delta.delta)
            .ok_or_else(|| format!("No inventory record found for variant {}", delta.variant_id))?;

        let movement_type = if delta.is_deduction() {
            MovementType::CampaignAllocation
        } else {
            MovementType::CampaignDeallocation
        };

        self.gateway
            .record_stock_movement(StockAdjustment {
                movement_type,
                variant_id: delta.variant_id,
                organization_id: target.organization_id,
                quantity_change: delta.quantity_change(),
                unit_cost_cents: target.average_cost_cents,
                reason: ctx.reason(delta),
                reference_type: Some(CAMPAIGN_REFERENCE_TYPE.to_string()),
                reference_id: Some(ctx.campaign_id),
                created_by: ctx.acting_user_id,
            })
            .await
            .map_err(|e| {
                format!(
                    "Failed to {} {} unit(s) of variant {}: {e}",
                    if delta.is_deduction() { "deduct" } else { "return" },
                    delta.delta.abs(),
                    delta.variant_id
                )
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entities::{RewardType, inventory_entity as inventory};
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 内存库存：记录所有调整，库存不足时与数据库层一样拒绝
    #[derive(Default)]
    pub(crate) struct MemoryInventory {
        pub rows: Mutex<Vec<inventory::Model>>,
        pub adjustments: Mutex<Vec<StockAdjustment>>,
        pub fail_variants: Mutex<Vec<Uuid>>,
    }

    impl MemoryInventory {
        pub fn with_rows(rows: Vec<inventory::Model>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        pub fn adjustments(&self) -> Vec<StockAdjustment> {
            self.adjustments.lock().unwrap().clone()
        }

        pub fn available(&self, variant_id: Uuid, organization_id: Uuid) -> Option<i64> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.variant_id == variant_id && r.organization_id == organization_id)
                .map(|r| r.quantity_available)
        }
    }

    pub(crate) fn stock_row(variant_id: Uuid, organization_id: Uuid, available: i64) -> inventory::Model {
        inventory::Model {
            id: Uuid::new_v4(),
            variant_id,
            organization_id,
            quantity_on_hand: available,
            quantity_available: available,
            average_cost_cents: Some(120),
            updated_at: None,
        }
    }

    #[async_trait]
    impl InventoryGateway for MemoryInventory {
        async fn list_inventory(&self, variant_id: Uuid) -> AppResult<Vec<inventory::Model>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.variant_id == variant_id)
                .cloned()
                .collect())
        }

        async fn record_stock_movement(
            &self,
            adjustment: StockAdjustment,
        ) -> AppResult<movements::Model> {
            if self.fail_variants.lock().unwrap().contains(&adjustment.variant_id) {
                return Err(AppError::InternalError("connection reset".into()));
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| {
                    r.variant_id == adjustment.variant_id
                        && r.organization_id == adjustment.organization_id
                })
                .ok_or_else(|| AppError::NotFound("inventory".into()))?;
            let after = row.quantity_available + adjustment.quantity_change;
            if after < 0 {
                return Err(AppError::ValidationError("Insufficient stock".into()));
            }
            let before = row.quantity_available;
            row.quantity_available = after;
            row.quantity_on_hand += adjustment.quantity_change;
            drop(rows);

            self.adjustments.lock().unwrap().push(adjustment.clone());
            Ok(movements::Model {
                id: Uuid::new_v4(),
                movement_type: adjustment.movement_type,
                variant_id: adjustment.variant_id,
                organization_id: adjustment.organization_id,
                quantity_change: adjustment.quantity_change,
                quantity_before: before,
                quantity_after: after,
                unit_cost_cents: adjustment.unit_cost_cents,
                reason: adjustment.reason,
                reference_type: adjustment.reference_type,
                reference_id: adjustment.reference_id,
                created_by: adjustment.created_by,
                created_at: None,
            })
        }
    }

    fn ctx(owner: Uuid) -> CampaignStockContext {
        CampaignStockContext {
            campaign_id: Uuid::new_v4(),
            campaign_name: "Raya Scratch & Win".into(),
            game_type: GameType::ScratchCard,
            owner_organization_id: owner,
            acting_user_id: Some(Uuid::new_v4()),
        }
    }

    fn product(variant_id: Uuid, allocated: i64, per_win: i64) -> RewardAllocation {
        RewardAllocation {
            reward_type: RewardType::Product,
            variant_id: Some(variant_id),
            allocated_quantity: allocated,
            items_per_win: per_win,
        }
    }

    #[tokio::test]
    async fn test_increase_allocation_deducts_from_owner() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![
            stock_row(variant, other, 500),
            stock_row(variant, owner, 40),
        ]));
        let reconciler = StockReconciler::new(inventory.clone());
        let ctx = ctx(owner);

        let report = reconciler
            .reconcile(&ctx, &[product(variant, 10, 2)], &[product(variant, 15, 2)])
            .await;

        assert!(report.is_clean());
        let adjustments = inventory.adjustments();
        assert_eq!(adjustments.len(), 1);
        let adj = &adjustments[0];
        assert_eq!(adj.quantity_change, -10);
        assert_eq!(adj.organization_id, owner);
        assert_eq!(adj.movement_type, MovementType::CampaignAllocation);
        assert_eq!(adj.reference_type.as_deref(), Some(CAMPAIGN_REFERENCE_TYPE));
        assert_eq!(adj.reference_id, Some(ctx.campaign_id));
        assert_eq!(adj.created_by, ctx.acting_user_id);
        assert_eq!(adj.unit_cost_cents, Some(120));
        assert!(adj.reason.contains("Raya Scratch & Win"));
        assert_eq!(inventory.available(variant, owner), Some(30));
        assert_eq!(inventory.available(variant, other), Some(500));
    }

    #[tokio::test]
    async fn test_removed_reward_returns_stock() {
        let owner = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![stock_row(variant, owner, 0)]));
        let reconciler = StockReconciler::new(inventory.clone());

        let report = reconciler
            .reconcile(&ctx(owner), &[product(variant, 6, 3)], &[])
            .await;

        assert!(report.is_clean());
        assert_eq!(report.movements.len(), 1);
        assert_eq!(report.movements[0].quantity_change, 18);
        assert_eq!(
            report.movements[0].movement_type,
            MovementType::CampaignDeallocation
        );
        assert!(report.movements[0].reason.starts_with("Returned from scratch card"));
        assert_eq!(inventory.available(variant, owner), Some(18));
    }

    #[tokio::test]
    async fn test_unchanged_requirement_issues_no_movement() {
        let owner = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![stock_row(variant, owner, 10)]));
        let reconciler = StockReconciler::new(inventory.clone());

        let report = reconciler
            .reconcile(&ctx(owner), &[product(variant, 4, 2)], &[product(variant, 8, 1)])
            .await;

        assert!(report.is_clean());
        assert!(report.movements.is_empty());
        assert!(inventory.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_owner_short_on_stock_uses_largest_org() {
        let owner = Uuid::new_v4();
        let warehouse = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![
            stock_row(variant, owner, 3),
            stock_row(variant, warehouse, 80),
        ]));
        let reconciler = StockReconciler::new(inventory.clone());

        let report = reconciler
            .reconcile(&ctx(owner), &[], &[product(variant, 5, 2)])
            .await;

        assert!(report.is_clean());
        assert_eq!(inventory.available(variant, warehouse), Some(70));
        assert_eq!(inventory.available(variant, owner), Some(3));
    }

    #[tokio::test]
    async fn test_failures_become_warnings_and_other_variants_continue() {
        let owner = Uuid::new_v4();
        let broken = Uuid::new_v4();
        let healthy = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![
            stock_row(broken, owner, 100),
            stock_row(healthy, owner, 100),
        ]));
        inventory.fail_variants.lock().unwrap().push(broken);
        let reconciler = StockReconciler::new(inventory.clone());

        let report = reconciler
            .reconcile(
                &ctx(owner),
                &[],
                &[
                    product(broken, 1, 1),
                    product(healthy, 2, 1),
                    product(missing, 3, 1),
                ],
            )
            .await;

        assert_eq!(report.movements.len(), 1);
        assert_eq!(report.movements[0].variant_id, healthy);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("connection reset")));
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("No inventory record found"))
        );
        assert_eq!(inventory.available(healthy, owner), Some(98));
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_reported_not_forced() {
        let owner = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![stock_row(variant, owner, 4)]));
        let reconciler = StockReconciler::new(inventory.clone());

        let report = reconciler
            .reconcile(&ctx(owner), &[], &[product(variant, 10, 1)])
            .await;

        assert!(report.movements.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("deduct 10"));
        assert_eq!(inventory.available(variant, owner), Some(4));
    }

    #[tokio::test]
    async fn test_out_of_range_requirement_becomes_warning() {
        let owner = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![stock_row(variant, owner, 10)]));
        let reconciler = StockReconciler::new(inventory.clone());

        let report = reconciler
            .reconcile(&ctx(owner), &[], &[product(variant, 2, i64::MAX)])
            .await;

        assert!(report.movements.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("out of range"));
        assert!(inventory.adjustments().is_empty());
        assert_eq!(inventory.available(variant, owner), Some(10));
    }
}
