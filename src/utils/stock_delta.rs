//! 奖品库存差额计算
//!
//! 对比编辑前后两组奖品配置，按商品变体汇总需要占用 / 释放的实物数量。
//! 只有 product 类型且关联了变体的奖品参与计算。

use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;

use crate::entities::{RewardType, campaign_reward_entity as rewards};

/// 参与库存计算的奖品分配信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardAllocation {
    pub reward_type: RewardType,
    pub variant_id: Option<Uuid>,
    pub allocated_quantity: i64,
    pub items_per_win: i64,
}

/// 实物数量超出 i64 范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Stock requirement for variant {variant_id} is out of range")]
pub struct StockOverflow {
    pub variant_id: Uuid,
}

impl RewardAllocation {
    /// 该奖品需要占用的 (变体, 实物数量)；非实物奖品返回 Ok(None)
    pub fn required_units(&self) -> Result<Option<(Uuid, i64)>, StockOverflow> {
        match (self.reward_type, self.variant_id) {
            (RewardType::Product, Some(variant_id)) => self
                .allocated_quantity
                .checked_mul(self.items_per_win)
                .map(|units| Some((variant_id, units)))
                .ok_or(StockOverflow { variant_id }),
            _ => Ok(None),
        }
    }
}

impl From<&rewards::Model> for RewardAllocation {
    fn from(m: &rewards::Model) -> Self {
        RewardAllocation {
            reward_type: m.reward_type,
            variant_id: m.variant_id,
            allocated_quantity: m.allocated_quantity,
            items_per_win: m.items_per_win,
        }
    }
}

/// 单个变体的净差额
/// delta > 0: 需要从库存扣减; delta < 0: 需要退回库存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub variant_id: Uuid,
    pub delta: i64,
}

impl StockDelta {
    pub fn is_deduction(&self) -> bool {
        self.delta > 0
    }

    /// 写入库存流水的变动量 (与 delta 符号相反)
    pub fn quantity_change(&self) -> i64 {
        -self.delta
    }
}

/// 计算编辑前后的净库存差额，结果按变体ID排序，零差额的变体不会出现
///
/// 任一变体的数量超出 i64 范围时整体返回错误，不产生部分结果。
pub fn compute_stock_deltas(
    previous: &[RewardAllocation],
    next: &[RewardAllocation],
) -> Result<Vec<StockDelta>, StockOverflow> {
    let mut deltas: BTreeMap<Uuid, i64> = BTreeMap::new();

    for allocation in next {
        if let Some((variant_id, required)) = allocation.required_units()? {
            let entry = deltas.entry(variant_id).or_insert(0);
            *entry = entry
                .checked_add(required)
                .ok_or(StockOverflow { variant_id })?;
        }
    }
    for allocation in previous {
        if let Some((variant_id, committed)) = allocation.required_units()? {
            let entry = deltas.entry(variant_id).or_insert(0);
            *entry = entry
                .checked_sub(committed)
                .ok_or(StockOverflow { variant_id })?;
        }
    }

    Ok(deltas
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(variant_id, delta)| StockDelta { variant_id, delta })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(variant_id: Uuid, allocated: i64, per_win: i64) -> RewardAllocation {
        RewardAllocation {
            reward_type: RewardType::Product,
            variant_id: Some(variant_id),
            allocated_quantity: allocated,
            items_per_win: per_win,
        }
    }

    #[test]
    fn test_increase_allocation_deducts_difference() {
        let v = Uuid::new_v4();
        let deltas = compute_stock_deltas(&[product(v, 10, 2)], &[product(v, 15, 2)]).unwrap();
        assert_eq!(deltas, vec![StockDelta { variant_id: v, delta: 10 }]);
        assert!(deltas[0].is_deduction());
        assert_eq!(deltas[0].quantity_change(), -10);
    }

    #[test]
    fn test_net_delta_uses_both_multipliers() {
        let v = Uuid::new_v4();
        let deltas = compute_stock_deltas(&[product(v, 10, 3)], &[product(v, 4, 5)]).unwrap();
        // 4*5 - 10*3 = -10
        assert_eq!(deltas, vec![StockDelta { variant_id: v, delta: -10 }]);
        assert!(!deltas[0].is_deduction());
        assert_eq!(deltas[0].quantity_change(), 10);
    }

    #[test]
    fn test_unchanged_requirement_produces_nothing() {
        let v = Uuid::new_v4();
        // 10*2 与 5*4 所需实物数量相同
        assert!(
            compute_stock_deltas(&[product(v, 10, 2)], &[product(v, 5, 4)])
                .unwrap()
                .is_empty()
        );
        assert!(
            compute_stock_deltas(&[product(v, 7, 1)], &[product(v, 7, 1)])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_removed_reward_returns_full_quantity() {
        let v = Uuid::new_v4();
        let deltas = compute_stock_deltas(&[product(v, 8, 3)], &[]).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].quantity_change(), 24);
    }

    #[test]
    fn test_new_reward_deducts_full_quantity() {
        let v = Uuid::new_v4();
        let deltas = compute_stock_deltas(&[], &[product(v, 5, 1)]).unwrap();
        assert_eq!(deltas, vec![StockDelta { variant_id: v, delta: 5 }]);
    }

    #[test]
    fn test_rewards_sharing_variant_are_summed() {
        let v = Uuid::new_v4();
        let deltas =
            compute_stock_deltas(&[product(v, 2, 1)], &[product(v, 3, 1), product(v, 4, 2)])
                .unwrap();
        assert_eq!(deltas, vec![StockDelta { variant_id: v, delta: 9 }]);
    }

    #[test]
    fn test_non_product_rewards_ignored() {
        let v = Uuid::new_v4();
        let points = RewardAllocation {
            reward_type: RewardType::Points,
            variant_id: None,
            allocated_quantity: 100,
            items_per_win: 1,
        };
        let voucher_with_variant = RewardAllocation {
            reward_type: RewardType::Voucher,
            variant_id: Some(v),
            allocated_quantity: 10,
            items_per_win: 1,
        };
        let product_without_variant = RewardAllocation {
            reward_type: RewardType::Product,
            variant_id: None,
            allocated_quantity: 10,
            items_per_win: 1,
        };
        assert!(
            compute_stock_deltas(&[], &[points, voucher_with_variant, product_without_variant])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_variant_swap() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let deltas = compute_stock_deltas(&[product(a, 5, 1)], &[product(b, 5, 1)]).unwrap();
        assert_eq!(deltas.len(), 2);
        let a_delta = deltas.iter().find(|d| d.variant_id == a).unwrap();
        let b_delta = deltas.iter().find(|d| d.variant_id == b).unwrap();
        assert_eq!(a_delta.delta, -5);
        assert_eq!(b_delta.delta, 5);
    }

    #[test]
    fn test_overflowing_requirement_is_an_error() {
        let v = Uuid::new_v4();
        assert_eq!(
            compute_stock_deltas(&[], &[product(v, 2, i64::MAX)]),
            Err(StockOverflow { variant_id: v })
        );
        // 单个奖品不溢出，但同一变体累加后溢出
        assert_eq!(
            compute_stock_deltas(&[], &[product(v, i64::MAX, 1), product(v, 1, 1)]),
            Err(StockOverflow { variant_id: v })
        );
        assert_eq!(
            compute_stock_deltas(
                &[product(v, i64::MAX, 1), product(v, 1, 1), product(v, 1, 1)],
                &[]
            ),
            Err(StockOverflow { variant_id: v })
        );
    }
}
