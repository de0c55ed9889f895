use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    CampaignStatus, GameType, RewardType, campaign_entity as campaigns,
    campaign_reward_entity as rewards,
};
use crate::error::{AppError, AppResult};
use crate::utils::{
    NoPrizeQuota, RewardAllocation, calculate_no_prize_quota, compute_stock_deltas,
    reward_probability,
};

use super::StockMovementResponse;

/// 大转盘最多 12 格，其中一格留给"谢谢参与"
pub const SPIN_WHEEL_MAX_REWARDS: usize = 11;

/// 每次中奖最多发放的实物数量
pub const MAX_ITEMS_PER_WIN: i64 = 1_000;

/// 奖品配置 (保存活动时提交)
/// id 为空表示新增；带 id 表示编辑已有奖品
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RewardInput {
    pub id: Option<Uuid>,
    pub name: String,
    pub reward_type: RewardType,
    pub points_value: Option<i64>,
    pub voucher_code: Option<String>,
    pub link_url: Option<String>,
    /// product 类型必填
    pub variant_id: Option<Uuid>,
    /// 分配的中奖次数
    pub allocated_quantity: i64,
    /// 每次中奖发放的实物数量 (默认 1)
    pub items_per_win: Option<i64>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl RewardInput {
    pub fn items_per_win(&self) -> i64 {
        self.items_per_win.unwrap_or(1)
    }

    pub fn allocation(&self) -> RewardAllocation {
        RewardAllocation {
            reward_type: self.reward_type,
            variant_id: self.variant_id,
            allocated_quantity: self.allocated_quantity,
            items_per_win: self.items_per_win(),
        }
    }

    /// budget: 活动总参与次数，单个奖品的分配数量不能超过它
    fn validate(&self, index: usize, budget: i64) -> AppResult<()> {
        let label = if self.name.trim().is_empty() {
            format!("Reward #{}", index + 1)
        } else {
            format!("Reward '{}'", self.name.trim())
        };

        if self.name.trim().is_empty() {
            return Err(AppError::ValidationError(format!("{label}: name is required")));
        }
        if self.allocated_quantity < 0 {
            return Err(AppError::ValidationError(format!(
                "{label}: allocated quantity must not be negative"
            )));
        }
        if self.allocated_quantity > budget {
            return Err(AppError::ValidationError(format!(
                "{label}: allocated quantity exceeds the campaign play budget ({budget})"
            )));
        }
        if !(1..=MAX_ITEMS_PER_WIN).contains(&self.items_per_win()) {
            return Err(AppError::ValidationError(format!(
                "{label}: items per win must be between 1 and {MAX_ITEMS_PER_WIN}"
            )));
        }
        match self.reward_type {
            RewardType::Product if self.variant_id.is_none() => Err(AppError::ValidationError(
                format!("{label}: product rewards require a product variant"),
            )),
            RewardType::Points if self.points_value.unwrap_or(0) <= 0 => Err(
                AppError::ValidationError(format!("{label}: points value must be positive")),
            ),
            RewardType::Link
                if self
                    .link_url
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or("")
                    .is_empty() =>
            {
                Err(AppError::ValidationError(format!(
                    "{label}: link rewards require a URL"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// 创建 / 编辑活动请求
/// 替代前端表单状态，作为一次保存的完整命令
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SaveCampaignRequest {
    pub game_type: GameType,
    pub name: String,
    pub description: Option<String>,
    /// 缺省为 draft (创建) 或保持不变 (编辑)
    pub status: Option<CampaignStatus>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub max_total_plays: i64,
    pub max_plays_per_consumer: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub theme_config: Option<serde_json::Value>,
    /// 超级管理员可为其它组织创建活动
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub rewards: Vec<RewardInput>,
}

impl SaveCampaignRequest {
    pub fn quota(&self) -> NoPrizeQuota {
        calculate_no_prize_quota(
            self.max_total_plays,
            self.rewards.iter().map(|r| r.allocated_quantity),
        )
    }

    /// 写库前的全部校验，失败则不做任何写入
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::ValidationError("Campaign name is required".into()));
        }
        if self.max_total_plays < 0 {
            return Err(AppError::ValidationError(
                "Total plays must not be negative".into(),
            ));
        }
        if let Some(limit) = self.max_plays_per_consumer
            && limit < 1
        {
            return Err(AppError::ValidationError(
                "Plays per consumer must be at least 1".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_at, self.end_at)
            && end <= start
        {
            return Err(AppError::ValidationError(
                "End time must be after start time".into(),
            ));
        }
        if let Some(theme) = &self.theme_config
            && !theme.is_object()
        {
            return Err(AppError::ValidationError(
                "Theme config must be a JSON object".into(),
            ));
        }

        if self.game_type == GameType::SpinWheel {
            let segments = self.rewards.len();
            if segments == 0 || segments > SPIN_WHEEL_MAX_REWARDS {
                return Err(AppError::ValidationError(format!(
                    "Spin wheel campaigns need between 1 and {SPIN_WHEEL_MAX_REWARDS} rewards"
                )));
            }
        }

        let mut seen = HashSet::new();
        for (index, reward) in self.rewards.iter().enumerate() {
            reward.validate(index, self.max_total_plays)?;
            if let Some(id) = reward.id
                && !seen.insert(id)
            {
                return Err(AppError::ValidationError(format!(
                    "Reward {id} appears more than once"
                )));
            }
        }

        if let Some(warning) = self.quota().warning() {
            return Err(AppError::ValidationError(warning));
        }

        // 提交后才同步库存，这里先确认实物数量可计算
        let allocations: Vec<RewardAllocation> =
            self.rewards.iter().map(RewardInput::allocation).collect();
        compute_stock_deltas(&[], &allocations)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateCampaignStatusRequest {
    pub status: CampaignStatus,
}

/// 活动列表查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CampaignQuery {
    pub game_type: Option<GameType>,
    pub status: Option<CampaignStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// 未中奖配额预览 (编辑表单实时显示)
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct QuotaPreviewRequest {
    pub max_total_plays: i64,
    #[serde(default)]
    pub allocated_quantities: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub game_type: GameType,
    pub name: String,
    pub description: Option<String>,
    pub status: CampaignStatus,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub max_total_plays: i64,
    pub max_plays_per_consumer: Option<i32>,
    #[schema(value_type = Object)]
    pub theme_config: serde_json::Value,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<campaigns::Model> for CampaignResponse {
    fn from(m: campaigns::Model) -> Self {
        CampaignResponse {
            id: m.id,
            organization_id: m.organization_id,
            game_type: m.game_type,
            name: m.name,
            description: m.description,
            status: m.status,
            start_at: m.start_at,
            end_at: m.end_at,
            max_total_plays: m.max_total_plays,
            max_plays_per_consumer: m.max_plays_per_consumer,
            theme_config: m.theme_config,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RewardResponse {
    pub id: Uuid,
    pub name: String,
    pub reward_type: RewardType,
    pub points_value: Option<i64>,
    pub voucher_code: Option<String>,
    pub link_url: Option<String>,
    pub variant_id: Option<Uuid>,
    pub allocated_quantity: i64,
    pub remaining_quantity: i64,
    pub items_per_win: i64,
    /// 中奖概率 (百分比)
    pub probability: f64,
    pub sort_order: i32,
    pub is_active: bool,
}

impl RewardResponse {
    pub fn from_model(m: rewards::Model, total_plays: i64) -> Self {
        RewardResponse {
            probability: reward_probability(m.allocated_quantity, total_plays),
            id: m.id,
            name: m.name,
            reward_type: m.reward_type,
            points_value: m.points_value,
            voucher_code: m.voucher_code,
            link_url: m.link_url,
            variant_id: m.variant_id,
            allocated_quantity: m.allocated_quantity,
            remaining_quantity: m.remaining_quantity,
            items_per_win: m.items_per_win,
            sort_order: m.sort_order,
            is_active: m.is_active,
        }
    }
}

/// 活动详情：活动 + 奖品 + 未中奖配额
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CampaignDetailResponse {
    pub campaign: CampaignResponse,
    pub rewards: Vec<RewardResponse>,
    pub no_prize: NoPrizeQuota,
}

impl CampaignDetailResponse {
    pub fn new(campaign: campaigns::Model, reward_models: Vec<rewards::Model>) -> Self {
        let total_plays = campaign.max_total_plays;
        let no_prize = calculate_no_prize_quota(
            total_plays,
            reward_models.iter().map(|r| r.allocated_quantity),
        );
        CampaignDetailResponse {
            campaign: campaign.into(),
            rewards: reward_models
                .into_iter()
                .map(|r| RewardResponse::from_model(r, total_plays))
                .collect(),
            no_prize,
        }
    }
}

/// 保存 / 删除活动的结果
/// 活动已保存但库存同步失败时 warnings 非空
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaveCampaignResponse {
    pub detail: Option<CampaignDetailResponse>,
    pub stock_movements: Vec<StockMovementResponse>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RewardStats {
    pub reward_id: Uuid,
    pub name: String,
    pub reward_type: RewardType,
    pub allocated_quantity: i64,
    pub remaining_quantity: i64,
    pub won: i64,
}

/// 活动统计
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CampaignStatsResponse {
    pub campaign_id: Uuid,
    pub total_plays: i64,
    pub total_winners: i64,
    pub remaining_plays: i64,
    pub unique_consumers: i64,
    pub rewards: Vec<RewardStats>,
    pub no_prize: NoPrizeQuota,
}
