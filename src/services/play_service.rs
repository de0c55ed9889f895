use crate::entities::{
    CampaignStatus, campaign_entity as campaigns, campaign_play_entity as plays,
    campaign_reward_entity as rewards,
};
use crate::error::{AppError, AppResult};
use crate::models::{CampaignStatsResponse, PlayRequest, PlayResponse, RewardStats};
use crate::utils::{AuthUser, calculate_no_prize_quota};
use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

const MAX_DRAW_ATTEMPTS: usize = 5;

/// 按剩余数量加权抽取
///
/// 每个可用奖品的权重为 remaining_quantity，"谢谢参与"的权重为
/// max(0, remaining_plays - Σremaining_quantity)。
/// roll 取值 [0, total_weight)，落在奖品区间之外即未中奖。
/// 返回命中的奖品下标，None 表示未中奖。
pub fn draw_outcome(candidates: &[rewards::Model], roll: i64) -> Option<usize> {
    let mut acc = 0i64;
    for (index, reward) in candidates.iter().enumerate() {
        if !reward.is_available() {
            continue;
        }
        acc += reward.remaining_quantity;
        if roll < acc {
            return Some(index);
        }
    }
    None
}

/// 抽奖总权重 (奖品剩余 + 未中奖剩余)
pub fn total_weight(candidates: &[rewards::Model], remaining_plays: i64) -> i64 {
    let prize_weight: i64 = candidates
        .iter()
        .filter(|r| r.is_available())
        .map(|r| r.remaining_quantity)
        .sum();
    prize_weight + (remaining_plays - prize_weight).max(0)
}

#[derive(Clone)]
pub struct PlayService {
    pool: DatabaseConnection,
}

impl PlayService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 消费者参与一次 (刮刮卡 / 大转盘)
    ///
    /// 逻辑:
    /// 1. 校验活动状态、有效期、总次数预算与单人上限
    /// 2. 按剩余数量加权抽取奖品
    /// 3. 命中奖品时原子扣减剩余数量 (update where remaining_quantity > 0)，
    ///    扣减失败则排除该奖品重试
    /// 4. 写参与记录
    pub async fn play(&self, campaign_id: Uuid, request: PlayRequest) -> AppResult<PlayResponse> {
        let consumer_ref = request.consumer_ref.trim().to_string();
        if consumer_ref.is_empty() {
            return Err(AppError::ValidationError("Consumer is required".into()));
        }

        let txn = self.pool.begin().await?;

        let campaign = campaigns::Entity::find_by_id(campaign_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id}")))?;

        if campaign.status != CampaignStatus::Active {
            return Err(AppError::ValidationError("Campaign is not active".into()));
        }
        if !campaign.is_within_window(Utc::now()) {
            return Err(AppError::ValidationError(
                "Campaign is outside its validity window".into(),
            ));
        }

        let total_plays = plays::Entity::find()
            .filter(plays::Column::CampaignId.eq(campaign_id))
            .count(&txn)
            .await? as i64;
        if total_plays >= campaign.max_total_plays {
            return Err(AppError::ValidationError(
                "All plays for this campaign have been used".into(),
            ));
        }

        let consumer_plays = plays::Entity::find()
            .filter(plays::Column::CampaignId.eq(campaign_id))
            .filter(plays::Column::ConsumerRef.eq(consumer_ref.clone()))
            .count(&txn)
            .await? as i64;
        if let Some(limit) = campaign.max_plays_per_consumer
            && consumer_plays >= limit as i64
        {
            return Err(AppError::ValidationError("Play limit reached".into()));
        }

        let candidates = rewards::Entity::find()
            .filter(rewards::Column::CampaignId.eq(campaign_id))
            .filter(rewards::Column::IsActive.eq(true))
            .filter(rewards::Column::RemainingQuantity.gt(0))
            .order_by_asc(rewards::Column::SortOrder)
            .all(&txn)
            .await?;

        let remaining_plays = campaign.max_total_plays - total_plays;
        let won = self
            .select_and_secure_reward(&txn, candidates, remaining_plays)
            .await?;

        let play = plays::ActiveModel {
            id: Set(Uuid::new_v4()),
            campaign_id: Set(campaign_id),
            consumer_ref: Set(consumer_ref),
            reward_id: Set(won.as_ref().map(|r| r.id)),
            is_winner: Set(won.is_some()),
            played_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        if let Some(reward) = &won {
            log::info!(
                "Campaign {} play {} won reward {} ({})",
                campaign_id,
                play.id,
                reward.id,
                reward.reward_type
            );
        }

        Ok(PlayResponse {
            play_id: play.id,
            is_winner: won.is_some(),
            reward: won.map(Into::into),
            remaining_plays_for_consumer: campaign
                .max_plays_per_consumer
                .map(|limit| (limit as i64 - consumer_plays - 1).max(0)),
        })
    }

    /// 活动统计: 参与次数、中奖次数、各奖品中奖数与未中奖配额
    pub async fn campaign_stats(
        &self,
        user: &AuthUser,
        campaign_id: Uuid,
    ) -> AppResult<CampaignStatsResponse> {
        let campaign = campaigns::Entity::find_by_id(campaign_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id}")))?;
        if !user.can_manage(campaign.organization_id) {
            return Err(AppError::Forbidden);
        }

        let base = plays::Entity::find().filter(plays::Column::CampaignId.eq(campaign_id));
        let total_plays = base.clone().count(&self.pool).await? as i64;
        let total_winners = base
            .clone()
            .filter(plays::Column::IsWinner.eq(true))
            .count(&self.pool)
            .await? as i64;
        let unique_consumers = base
            .clone()
            .select_only()
            .column(plays::Column::ConsumerRef)
            .distinct()
            .count(&self.pool)
            .await? as i64;

        let won_by_reward: HashMap<Uuid, i64> = base
            .select_only()
            .column(plays::Column::RewardId)
            .column_as(Expr::col(plays::Column::Id).count(), "won")
            .filter(plays::Column::RewardId.is_not_null())
            .group_by(plays::Column::RewardId)
            .into_tuple::<(Option<Uuid>, i64)>()
            .all(&self.pool)
            .await?
            .into_iter()
            .filter_map(|(reward_id, won)| reward_id.map(|id| (id, won)))
            .collect();

        let reward_models = rewards::Entity::find()
            .filter(rewards::Column::CampaignId.eq(campaign_id))
            .order_by_asc(rewards::Column::SortOrder)
            .all(&self.pool)
            .await?;

        let no_prize = calculate_no_prize_quota(
            campaign.max_total_plays,
            reward_models.iter().map(|r| r.allocated_quantity),
        );

        Ok(CampaignStatsResponse {
            campaign_id,
            total_plays,
            total_winners,
            remaining_plays: (campaign.max_total_plays - total_plays).max(0),
            unique_consumers,
            rewards: reward_models
                .into_iter()
                .map(|r| RewardStats {
                    won: won_by_reward.get(&r.id).copied().unwrap_or(0),
                    reward_id: r.id,
                    name: r.name,
                    reward_type: r.reward_type,
                    allocated_quantity: r.allocated_quantity,
                    remaining_quantity: r.remaining_quantity,
                })
                .collect(),
            no_prize,
        })
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    /// 抽取并扣减奖品剩余数量，竞争失败时排除该奖品重试；返回 None 表示未中奖
    async fn select_and_secure_reward(
        &self,
        txn: &DatabaseTransaction,
        mut candidates: Vec<rewards::Model>,
        remaining_plays: i64,
    ) -> AppResult<Option<rewards::Model>> {
        for _ in 0..MAX_DRAW_ATTEMPTS {
            let total = total_weight(&candidates, remaining_plays);
            if total <= 0 {
                return Ok(None);
            }
            let roll = rand::thread_rng().gen_range(0..total);
            let Some(index) = draw_outcome(&candidates, roll) else {
                return Ok(None);
            };
            let chosen_id = candidates[index].id;

            let update_result = rewards::Entity::update_many()
                .col_expr(
                    rewards::Column::RemainingQuantity,
                    Expr::col(rewards::Column::RemainingQuantity).sub(1),
                )
                .filter(rewards::Column::Id.eq(chosen_id))
                .filter(rewards::Column::RemainingQuantity.gt(0))
                .exec(txn)
                .await?;

            if update_result.rows_affected == 1 {
                return Ok(rewards::Entity::find_by_id(chosen_id).one(txn).await?);
            }

            // 已被抽完，排除后重试
            candidates.remove(index);
        }

        log::warn!("Reward draw gave up after {MAX_DRAW_ATTEMPTS} attempts");
        Ok(None)
    }
}
