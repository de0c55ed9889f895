use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    GameType, RewardType, campaign_entity as campaigns, campaign_reward_entity as rewards,
};

/// 消费者参与请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PlayRequest {
    /// 消费者标识 (手机号 / 会员ID)
    pub consumer_ref: String,
}

/// 中奖后返回给消费者的奖品（隐藏库存相关字段）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WonReward {
    pub id: Uuid,
    pub name: String,
    pub reward_type: RewardType,
    pub points_value: Option<i64>,
    pub voucher_code: Option<String>,
    pub link_url: Option<String>,
    pub items_per_win: i64,
}

impl From<rewards::Model> for WonReward {
    fn from(m: rewards::Model) -> Self {
        WonReward {
            id: m.id,
            name: m.name,
            reward_type: m.reward_type,
            points_value: m.points_value,
            voucher_code: m.voucher_code,
            link_url: m.link_url,
            items_per_win: m.items_per_win,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayResponse {
    pub play_id: Uuid,
    pub is_winner: bool,
    pub reward: Option<WonReward>,
    /// 该消费者剩余参与次数 (不限时为空)
    pub remaining_plays_for_consumer: Option<i64>,
}

/// 前台展示的奖品 (转盘格子 / 刮刮卡奖品列表)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicRewardResponse {
    pub id: Uuid,
    pub name: String,
    pub reward_type: RewardType,
    pub sort_order: i32,
}

impl From<rewards::Model> for PublicRewardResponse {
    fn from(m: rewards::Model) -> Self {
        PublicRewardResponse {
            id: m.id,
            name: m.name,
            reward_type: m.reward_type,
            sort_order: m.sort_order,
        }
    }
}

/// 前台活动信息
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicCampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub game_type: GameType,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    pub theme_config: serde_json::Value,
    pub rewards: Vec<PublicRewardResponse>,
}

impl PublicCampaignResponse {
    pub fn new(campaign: campaigns::Model, reward_models: Vec<rewards::Model>) -> Self {
        PublicCampaignResponse {
            id: campaign.id,
            name: campaign.name,
            description: campaign.description,
            game_type: campaign.game_type,
            start_at: campaign.start_at,
            end_at: campaign.end_at,
            theme_config: campaign.theme_config,
            rewards: reward_models
                .into_iter()
                .filter(|r| r.is_active)
                .map(Into::into)
                .collect(),
        }
    }
}
