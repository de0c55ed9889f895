//! 未中奖 (no-prize) 配额计算
//!
//! 活动总参与次数中未分配给任何奖品的部分即为"谢谢参与"。
//! 纯计算，不落库。

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct NoPrizeQuota {
    /// 活动总参与次数
    pub total_plays: i64,
    /// 已分配给奖品的中奖次数之和
    pub total_allocated: i64,
    /// 未中奖次数 = max(0, total_plays - total_allocated)
    pub quantity: i64,
    /// 未中奖概率 (百分比, 0~100)
    pub probability: f64,
    /// 分配总数是否超出预算
    pub over_allocated: bool,
}

impl NoPrizeQuota {
    /// 超出预算时给出的提示
    pub fn warning(&self) -> Option<String> {
        self.over_allocated.then(|| {
            format!(
                "Total allocated rewards ({}) exceed the campaign play budget ({})",
                self.total_allocated, self.total_plays
            )
        })
    }
}

/// 根据活动总参与次数与各奖品分配数量计算未中奖配额
///
/// 分配数量来自客户端，求和溢出时按 i64::MAX 计并视为超出预算。
pub fn calculate_no_prize_quota<I>(total_plays: i64, allocated: I) -> NoPrizeQuota
where
    I: IntoIterator<Item = i64>,
{
    let summed = allocated
        .into_iter()
        .try_fold(0i64, |acc, q| acc.checked_add(q.max(0)));
    let (total_allocated, overflowed) = match summed {
        Some(total) => (total, false),
        None => (i64::MAX, true),
    };
    let quantity = total_plays.saturating_sub(total_allocated).max(0);
    let probability = if total_plays > 0 {
        quantity as f64 / total_plays as f64 * 100.0
    } else {
        0.0
    };

    NoPrizeQuota {
        total_plays,
        total_allocated,
        quantity,
        probability,
        over_allocated: overflowed || total_allocated > total_plays,
    }
}

/// 单个奖品的中奖概率 (百分比)
pub fn reward_probability(allocated: i64, total_plays: i64) -> f64 {
    if total_plays <= 0 {
        return 0.0;
    }
    allocated as f64 / total_plays as f64 * 100.0
}
