use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "game_type")]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    #[sea_orm(string_value = "scratch_card")]
    ScratchCard,
    #[sea_orm(string_value = "spin_wheel")]
    SpinWheel,
}

impl GameType {
    /// 展示名称 (用于库存流水原因等)
    pub fn label(&self) -> &'static str {
        match self {
            GameType::ScratchCard => "scratch card",
            GameType::SpinWheel => "spin wheel",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::ScratchCard => write!(f, "scratch_card"),
            GameType::SpinWheel => write!(f, "spin_wheel"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "campaign_status")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "ended")]
    Ended,
}

impl CampaignStatus {
    /// 允许的状态流转:
    /// draft -> active | scheduled
    /// scheduled -> active | draft
    /// active -> ended
    /// ended 为终态
    pub fn can_transition_to(&self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Draft, Active) | (Draft, Scheduled) | (Scheduled, Active) | (Scheduled, Draft) | (Active, Ended)
        )
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Active => write!(f, "active"),
            CampaignStatus::Ended => write!(f, "ended"),
        }
    }
}

/// 活动实体 (刮刮卡 / 大转盘)
/// - max_total_plays: 活动总参与次数预算，奖品分配数量之和不应超过该值
/// - max_plays_per_consumer: 单个消费者参与上限 (NULL = 不限)
/// - theme_config: 前端主题配置 (不透明 JSON)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub theme_config: Json,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 当前时间是否处于活动有效期内 (未设置的边界视为不限)
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_at.map(|s| s <= now).unwrap_or(true);
        let not_ended = self.end_at.map(|e| now <= e).unwrap_or(true);
        started && not_ended
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::campaign_rewards::Entity")]
    Rewards,
    #[sea_orm(has_many = "super::campaign_plays::Entity")]
    Plays,
}

impl Related<super::campaign_rewards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rewards.def()
    }
}

impl Related<super::campaign_plays::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plays.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
