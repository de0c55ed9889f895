use crate::entities::{
    CampaignStatus, RewardType, campaign_entity as campaigns, campaign_reward_entity as rewards,
    organization_entity as organizations,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CampaignDetailResponse, CampaignQuery, CampaignResponse, PaginatedResponse,
    PaginationParams, PublicCampaignResponse, QuotaPreviewRequest, RewardInput,
    SaveCampaignRequest, SaveCampaignResponse,
};
use crate::services::{CampaignStockContext, StockReconciler, StockSyncReport};
use crate::utils::{AuthUser, NoPrizeQuota, RewardAllocation, calculate_no_prize_quota};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct CampaignService {
    pool: DatabaseConnection,
    reconciler: StockReconciler,
}

impl CampaignService {
    pub fn new(pool: DatabaseConnection, reconciler: StockReconciler) -> Self {
        Self { pool, reconciler }
    }

    /// 创建活动
    ///
    /// 逻辑:
    /// 1. 校验请求 (名称、预算、奖品配置)，失败不写库
    /// 2. 同一事务内写入活动与奖品
    /// 3. 提交后为实物奖品占用库存，失败仅作为警告返回
    pub async fn create_campaign(
        &self,
        user: &AuthUser,
        request: SaveCampaignRequest,
    ) -> AppResult<SaveCampaignResponse> {
        request.validate()?;
        let organization_id = resolve_owner(user, request.organization_id)?;
        organizations::Entity::find_by_id(organization_id)
            .one(&self.pool)
            .await?
            .filter(|org| org.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Organization {organization_id}")))?;
        let status = request.status.unwrap_or(CampaignStatus::Draft);
        if status == CampaignStatus::Ended {
            return Err(AppError::ValidationError(
                "A new campaign cannot start as ended".into(),
            ));
        }
        let now = Utc::now();
        ensure_can_activate(status, request.end_at, now)?;

        let campaign_id = Uuid::new_v4();
        let plan = plan_reward_writes(campaign_id, &[], &request.rewards)?;

        let txn = self.pool.begin().await?;

        let campaign = campaigns::ActiveModel {
            id: Set(campaign_id),
            organization_id: Set(organization_id),
            game_type: Set(request.game_type),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description.clone()),
            status: Set(status),
            start_at: Set(request.start_at),
            end_at: Set(request.end_at),
            max_total_plays: Set(request.max_total_plays),
            max_plays_per_consumer: Set(request.max_plays_per_consumer),
            theme_config: Set(request
                .theme_config
                .clone()
                .unwrap_or_else(|| serde_json::json!({}))),
            created_by: Set(Some(user.user_id)),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await?;

        let saved_rewards = write_rewards(&txn, campaign.id, plan).await?;
        txn.commit().await?;

        log::info!(
            "Campaign {} ({}) created by {} with {} reward(s)",
            campaign.id,
            campaign.game_type,
            user.user_id,
            saved_rewards.len()
        );

        let report = self
            .reconciler
            .reconcile(
                &stock_context(&campaign, user),
                &[],
                &allocations(&saved_rewards),
            )
            .await;

        Ok(save_response(Some((campaign, saved_rewards)), report))
    }

    /// 编辑活动
    ///
    /// 奖品按 id 对比: 带已有 id 的更新，缺失的删除，无 id 的新增。
    /// 提交后按编辑前后的差额同步库存。
    pub async fn update_campaign(
        &self,
        user: &AuthUser,
        campaign_id: Uuid,
        request: SaveCampaignRequest,
    ) -> AppResult<SaveCampaignResponse> {
        request.validate()?;

        let txn = self.pool.begin().await?;
        let existing = find_campaign(&txn, campaign_id).await?;
        if !user.can_manage(existing.organization_id) {
            return Err(AppError::Forbidden);
        }
        if request.game_type != existing.game_type {
            return Err(AppError::ValidationError(
                "Game type of an existing campaign cannot be changed".into(),
            ));
        }
        let status = request.status.unwrap_or(existing.status);
        if !existing.status.can_transition_to(status) {
            return Err(AppError::ValidationError(format!(
                "Cannot change campaign status from {} to {}",
                existing.status, status
            )));
        }
        ensure_can_activate(status, request.end_at, Utc::now())?;

        let previous_rewards = load_rewards(&txn, campaign_id).await?;
        // 奖品 id 全部校验通过后才开始写库
        let plan = plan_reward_writes(campaign_id, &previous_rewards, &request.rewards)?;

        let mut am = existing.into_active_model();
        am.name = Set(request.name.trim().to_string());
        am.description = Set(request.description.clone());
        am.status = Set(status);
        am.start_at = Set(request.start_at);
        am.end_at = Set(request.end_at);
        am.max_total_plays = Set(request.max_total_plays);
        am.max_plays_per_consumer = Set(request.max_plays_per_consumer);
        if let Some(theme) = request.theme_config.clone() {
            am.theme_config = Set(theme);
        }
        am.updated_at = Set(Some(Utc::now()));
        let campaign = am.update(&txn).await?;

        let saved_rewards = write_rewards(&txn, campaign_id, plan).await?;
        txn.commit().await?;

        log::info!(
            "Campaign {} updated by {}: {} -> {} reward(s)",
            campaign_id,
            user.user_id,
            previous_rewards.len(),
            saved_rewards.len()
        );

        let report = self
            .reconciler
            .reconcile(
                &stock_context(&campaign, user),
                &allocations(&previous_rewards),
                &allocations(&saved_rewards),
            )
            .await;

        Ok(save_response(Some((campaign, saved_rewards)), report))
    }

    /// 删除活动 (奖品级联删除)，随后退回全部已占用的实物库存
    pub async fn delete_campaign(
        &self,
        user: &AuthUser,
        campaign_id: Uuid,
    ) -> AppResult<SaveCampaignResponse> {
        let txn = self.pool.begin().await?;
        let campaign = find_campaign(&txn, campaign_id).await?;
        if !user.can_manage(campaign.organization_id) {
            return Err(AppError::Forbidden);
        }
        let previous_rewards = load_rewards(&txn, campaign_id).await?;

        campaigns::Entity::delete_by_id(campaign_id).exec(&txn).await?;
        txn.commit().await?;

        log::info!("Campaign {} deleted by {}", campaign_id, user.user_id);

        let report = self
            .reconciler
            .reconcile(
                &stock_context(&campaign, user),
                &allocations(&previous_rewards),
                &[],
            )
            .await;

        Ok(save_response(None, report))
    }

    pub async fn get_campaign(
        &self,
        user: &AuthUser,
        campaign_id: Uuid,
    ) -> AppResult<CampaignDetailResponse> {
        let campaign = find_campaign(&self.pool, campaign_id).await?;
        if !user.can_manage(campaign.organization_id) {
            return Err(AppError::Forbidden);
        }
        let reward_models = load_rewards(&self.pool, campaign_id).await?;
        Ok(CampaignDetailResponse::new(campaign, reward_models))
    }

    /// 活动列表 (按创建时间倒序)，普通管理员只能看到本组织的活动
    pub async fn list_campaigns(
        &self,
        user: &AuthUser,
        query: &CampaignQuery,
    ) -> AppResult<PaginatedResponse<CampaignResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut select = campaigns::Entity::find();
        if !user.is_super_admin() {
            let organization_id = user.organization_id.ok_or(AppError::Forbidden)?;
            select = select.filter(campaigns::Column::OrganizationId.eq(organization_id));
        }
        if let Some(game_type) = query.game_type {
            select = select.filter(campaigns::Column::GameType.eq(game_type));
        }
        if let Some(status) = query.status {
            select = select.filter(campaigns::Column::Status.eq(status));
        }

        let total = select.clone().count(&self.pool).await?;
        let items = select
            .order_by_desc(campaigns::Column::CreatedAt)
            .limit(params.per_page())
            .offset(params.offset())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            &params,
            total,
        ))
    }

    /// 单独修改活动状态
    pub async fn update_status(
        &self,
        user: &AuthUser,
        campaign_id: Uuid,
        status: CampaignStatus,
    ) -> AppResult<CampaignResponse> {
        let campaign = find_campaign(&self.pool, campaign_id).await?;
        if !user.can_manage(campaign.organization_id) {
            return Err(AppError::Forbidden);
        }
        if !campaign.status.can_transition_to(status) {
            return Err(AppError::ValidationError(format!(
                "Cannot change campaign status from {} to {}",
                campaign.status, status
            )));
        }
        ensure_can_activate(status, campaign.end_at, Utc::now())?;

        let mut am = campaign.into_active_model();
        am.status = Set(status);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&self.pool).await?;
        log::info!("Campaign {} status set to {}", campaign_id, status);
        Ok(updated.into())
    }

    /// 编辑表单的未中奖配额预览
    pub fn preview_quota(&self, request: &QuotaPreviewRequest) -> NoPrizeQuota {
        calculate_no_prize_quota(
            request.max_total_plays,
            request.allocated_quantities.iter().copied(),
        )
    }

    /// 前台活动信息 (仅 scheduled / active)
    pub async fn get_public_campaign(&self, campaign_id: Uuid) -> AppResult<PublicCampaignResponse> {
        let campaign = find_campaign(&self.pool, campaign_id).await?;
        if !matches!(
            campaign.status,
            CampaignStatus::Active | CampaignStatus::Scheduled
        ) {
            return Err(AppError::NotFound(format!("Campaign {campaign_id}")));
        }
        let reward_models = load_rewards(&self.pool, campaign_id).await?;
        Ok(PublicCampaignResponse::new(campaign, reward_models))
    }

    /// 按有效期推进活动状态:
    /// - scheduled 且已过结束时间 -> ended (从未开始过)
    /// - scheduled 且已到开始时间 -> active
    /// - active 且已过结束时间 -> ended
    ///
    /// 返回 (启动数, 结束数)
    pub async fn advance_statuses(&self, now: DateTime<Utc>) -> AppResult<(u64, u64)> {
        let expired = campaigns::Entity::update_many()
            .col_expr(
                campaigns::Column::Status,
                campaigns::Column::Status.save_as(Expr::val(CampaignStatus::Ended.to_string())),
            )
            .col_expr(campaigns::Column::UpdatedAt, Expr::value(now))
            .filter(campaigns::Column::Status.eq(CampaignStatus::Scheduled))
            .filter(campaigns::Column::EndAt.lt(now))
            .exec(&self.pool)
            .await?
            .rows_affected;

        let started = campaigns::Entity::update_many()
            .col_expr(
                campaigns::Column::Status,
                campaigns::Column::Status.save_as(Expr::val(CampaignStatus::Active.to_string())),
            )
            .col_expr(campaigns::Column::UpdatedAt, Expr::value(now))
            .filter(campaigns::Column::Status.eq(CampaignStatus::Scheduled))
            .filter(campaigns::Column::StartAt.lte(now))
            .filter(
                Condition::any()
                    .add(campaigns::Column::EndAt.is_null())
                    .add(campaigns::Column::EndAt.gte(now)),
            )
            .exec(&self.pool)
            .await?
            .rows_affected;

        let ended = campaigns::Entity::update_many()
            .col_expr(
                campaigns::Column::Status,
                campaigns::Column::Status.save_as(Expr::val(CampaignStatus::Ended.to_string())),
            )
            .col_expr(campaigns::Column::UpdatedAt, Expr::value(now))
            .filter(campaigns::Column::Status.eq(CampaignStatus::Active))
            .filter(campaigns::Column::EndAt.lt(now))
            .exec(&self.pool)
            .await?
            .rows_affected;

        Ok((started, expired + ended))
    }
}

// -----------------------------
// 内部辅助方法
// -----------------------------

/// 活动归属组织：超级管理员可指定，其它用户固定为所在组织
fn resolve_owner(user: &AuthUser, requested: Option<Uuid>) -> AppResult<Uuid> {
    match (requested, user.organization_id) {
        (Some(org), _) if user.can_manage(org) => Ok(org),
        (Some(_), _) => Err(AppError::Forbidden),
        (None, Some(org)) => Ok(org),
        (None, None) => Err(AppError::ValidationError(
            "Organization is required".into(),
        )),
    }
}

/// 已过结束时间的活动不能 (再) 进入 active
fn ensure_can_activate(
    status: CampaignStatus,
    end_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if status == CampaignStatus::Active && end_at.is_some_and(|end| end < now) {
        return Err(AppError::ValidationError(
            "Campaign has already passed its end time".into(),
        ));
    }
    Ok(())
}

fn stock_context(campaign: &campaigns::Model, user: &AuthUser) -> CampaignStockContext {
    CampaignStockContext {
        campaign_id: campaign.id,
        campaign_name: campaign.name.clone(),
        game_type: campaign.game_type,
        owner_organization_id: campaign.organization_id,
        acting_user_id: Some(user.user_id),
    }
}

fn allocations(reward_models: &[rewards::Model]) -> Vec<RewardAllocation> {
    reward_models.iter().map(RewardAllocation::from).collect()
}

fn save_response(
    saved: Option<(campaigns::Model, Vec<rewards::Model>)>,
    report: StockSyncReport,
) -> SaveCampaignResponse {
    if !report.is_clean() {
        log::warn!(
            "Campaign saved with {} stock warning(s)",
            report.warnings.len()
        );
    }
    SaveCampaignResponse {
        detail: saved.map(|(campaign, reward_models)| {
            CampaignDetailResponse::new(campaign, reward_models)
        }),
        stock_movements: report.movements.into_iter().map(Into::into).collect(),
        warnings: report.warnings,
    }
}

async fn find_campaign<C: ConnectionTrait>(
    conn: &C,
    campaign_id: Uuid,
) -> AppResult<campaigns::Model> {
    campaigns::Entity::find_by_id(campaign_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id}")))
}

async fn load_rewards<C: ConnectionTrait>(
    conn: &C,
    campaign_id: Uuid,
) -> AppResult<Vec<rewards::Model>> {
    Ok(rewards::Entity::find()
        .filter(rewards::Column::CampaignId.eq(campaign_id))
        .order_by_asc(rewards::Column::SortOrder)
        .order_by_asc(rewards::Column::CreatedAt)
        .all(conn)
        .await?)
}

/// 编辑后的剩余中奖次数：按分配数量的变化同步增减，不小于 0
pub(crate) fn adjusted_remaining(previous: &rewards::Model, new_allocated: i64) -> i64 {
    previous
        .remaining_quantity
        .saturating_add(new_allocated.saturating_sub(previous.allocated_quantity))
        .max(0)
}

/// 单个奖品的写入动作
#[derive(Debug)]
enum RewardWrite<'a> {
    Update {
        previous: &'a rewards::Model,
        input: &'a RewardInput,
        sort_order: i32,
    },
    Insert {
        input: &'a RewardInput,
        sort_order: i32,
    },
}

/// 奖品写入计划：按 id 对比编辑前后的奖品
/// - 带已有 id 的更新，无 id 的新增
/// - 请求中未出现的旧奖品删除
/// - 不属于该活动的 id 直接拒绝，此时不会有任何写入
#[derive(Debug)]
struct RewardPlan<'a> {
    writes: Vec<RewardWrite<'a>>,
    removed: Vec<Uuid>,
}

fn plan_reward_writes<'a>(
    campaign_id: Uuid,
    previous: &'a [rewards::Model],
    inputs: &'a [RewardInput],
) -> AppResult<RewardPlan<'a>> {
    let mut previous_by_id: HashMap<Uuid, &rewards::Model> =
        previous.iter().map(|r| (r.id, r)).collect();
    let mut writes = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let sort_order = input.sort_order.unwrap_or(index as i32);
        let write = match input.id {
            Some(id) => {
                let old = previous_by_id.remove(&id).ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "Reward {id} does not belong to campaign {campaign_id}"
                    ))
                })?;
                RewardWrite::Update {
                    previous: old,
                    input,
                    sort_order,
                }
            }
            None => RewardWrite::Insert { input, sort_order },
        };
        writes.push(write);
    }

    // 保持编辑前的顺序
    let removed = previous
        .iter()
        .filter(|r| previous_by_id.contains_key(&r.id))
        .map(|r| r.id)
        .collect();

    Ok(RewardPlan { writes, removed })
}

/// 非实物奖品不关联库存
fn reward_variant(input: &RewardInput) -> Option<Uuid> {
    match input.reward_type {
        RewardType::Product => input.variant_id,
        _ => None,
    }
}

/// 按计划写入奖品 (在调用方事务内)
async fn write_rewards<C: ConnectionTrait>(
    conn: &C,
    campaign_id: Uuid,
    plan: RewardPlan<'_>,
) -> AppResult<Vec<rewards::Model>> {
    let now = Utc::now();
    let mut saved = Vec::with_capacity(plan.writes.len());

    for write in plan.writes {
        let model = match write {
            RewardWrite::Update {
                previous,
                input,
                sort_order,
            } => {
                let mut am = previous.clone().into_active_model();
                am.name = Set(input.name.trim().to_string());
                am.reward_type = Set(input.reward_type);
                am.points_value = Set(input.points_value);
                am.voucher_code = Set(input.voucher_code.clone());
                am.link_url = Set(input.link_url.clone());
                am.variant_id = Set(reward_variant(input));
                am.allocated_quantity = Set(input.allocated_quantity);
                am.remaining_quantity =
                    Set(adjusted_remaining(previous, input.allocated_quantity));
                am.items_per_win = Set(input.items_per_win());
                am.sort_order = Set(sort_order);
                am.is_active = Set(input.is_active.unwrap_or(true));
                am.updated_at = Set(Some(now));
                am.update(conn).await?
            }
            RewardWrite::Insert { input, sort_order } => {
                rewards::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    campaign_id: Set(campaign_id),
                    name: Set(input.name.trim().to_string()),
                    reward_type: Set(input.reward_type),
                    points_value: Set(input.points_value),
                    voucher_code: Set(input.voucher_code.clone()),
                    link_url: Set(input.link_url.clone()),
                    variant_id: Set(reward_variant(input)),
                    allocated_quantity: Set(input.allocated_quantity),
                    remaining_quantity: Set(input.allocated_quantity),
                    items_per_win: Set(input.items_per_win()),
                    sort_order: Set(sort_order),
                    is_active: Set(input.is_active.unwrap_or(true)),
                    created_at: Set(Some(now)),
                    updated_at: Set(Some(now)),
                }
                .insert(conn)
                .await?
            }
        };
        saved.push(model);
    }

    if !plan.removed.is_empty() {
        rewards::Entity::delete_many()
            .filter(rewards::Column::Id.is_in(plan.removed))
            .exec(conn)
            .await?;
    }

    saved.sort_by_key(|r| r.sort_order);
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::GameType;
    use crate::services::stock_reconciliation_service::tests::{MemoryInventory, stock_row};
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn user(org: Option<Uuid>, role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            organization_id: org,
            role: role.into(),
        }
    }

    fn reward(allocated: i64, remaining: i64) -> rewards::Model {
        rewards::Model {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            name: "Cap".into(),
            reward_type: RewardType::Product,
            points_value: None,
            voucher_code: None,
            link_url: None,
            variant_id: Some(Uuid::new_v4()),
            allocated_quantity: allocated,
            remaining_quantity: remaining,
            items_per_win: 1,
            sort_order: 0,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn campaign(organization_id: Uuid, status: CampaignStatus) -> campaigns::Model {
        campaigns::Model {
            id: Uuid::new_v4(),
            organization_id,
            game_type: GameType::ScratchCard,
            name: "Summer scratch".into(),
            description: None,
            status,
            start_at: None,
            end_at: None,
            max_total_plays: 100,
            max_plays_per_consumer: None,
            theme_config: serde_json::json!({}),
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn product_reward(
        campaign_id: Uuid,
        variant_id: Uuid,
        allocated: i64,
        per_win: i64,
    ) -> rewards::Model {
        rewards::Model {
            campaign_id,
            variant_id: Some(variant_id),
            items_per_win: per_win,
            ..reward(allocated, allocated)
        }
    }

    fn product_input(id: Option<Uuid>, variant_id: Uuid, allocated: i64) -> RewardInput {
        RewardInput {
            id,
            name: "Cap".into(),
            reward_type: RewardType::Product,
            points_value: None,
            voucher_code: None,
            link_url: None,
            variant_id: Some(variant_id),
            allocated_quantity: allocated,
            items_per_win: None,
            sort_order: None,
            is_active: None,
        }
    }

    fn points_input(allocated: i64) -> RewardInput {
        RewardInput {
            name: "50 points".into(),
            reward_type: RewardType::Points,
            points_value: Some(50),
            variant_id: None,
            ..product_input(None, Uuid::nil(), allocated)
        }
    }

    fn save_request(rewards: Vec<RewardInput>) -> SaveCampaignRequest {
        SaveCampaignRequest {
            game_type: GameType::ScratchCard,
            name: "Summer scratch".into(),
            description: None,
            status: None,
            start_at: None,
            end_at: None,
            max_total_plays: 100,
            max_plays_per_consumer: None,
            theme_config: None,
            organization_id: None,
            rewards,
        }
    }

    fn service(db: DatabaseConnection, inventory: Arc<MemoryInventory>) -> CampaignService {
        CampaignService::new(db, StockReconciler::new(inventory))
    }

    #[test]
    fn test_resolve_owner() {
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();

        let admin = user(Some(org), "org_admin");
        assert_eq!(resolve_owner(&admin, None).unwrap(), org);
        assert_eq!(resolve_owner(&admin, Some(org)).unwrap(), org);
        assert!(matches!(
            resolve_owner(&admin, Some(other)),
            Err(AppError::Forbidden)
        ));

        let root = user(None, "super_admin");
        assert_eq!(resolve_owner(&root, Some(other)).unwrap(), other);
        assert!(matches!(
            resolve_owner(&root, None),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_adjusted_remaining() {
        // 分配 10，已中 4
        let old = reward(10, 6);
        assert_eq!(adjusted_remaining(&old, 15), 11);
        assert_eq!(adjusted_remaining(&old, 10), 6);
        assert_eq!(adjusted_remaining(&old, 5), 1);
        // 新分配少于已中数量时归零
        assert_eq!(adjusted_remaining(&old, 2), 0);
    }

    #[test]
    fn test_save_response_maps_report() {
        let report = StockSyncReport {
            movements: vec![],
            warnings: vec!["No inventory record found for variant x".into()],
        };
        let response = save_response(None, report);
        assert!(response.detail.is_none());
        assert_eq!(response.warnings.len(), 1);
    }

    #[test]
    fn test_ensure_can_activate() {
        let now = Utc::now();
        let past = Some(now - Duration::hours(1));
        let future = Some(now + Duration::hours(1));

        assert!(ensure_can_activate(CampaignStatus::Active, None, now).is_ok());
        assert!(ensure_can_activate(CampaignStatus::Active, future, now).is_ok());
        assert!(matches!(
            ensure_can_activate(CampaignStatus::Active, past, now),
            Err(AppError::ValidationError(_))
        ));
        // 只限制 active
        assert!(ensure_can_activate(CampaignStatus::Draft, past, now).is_ok());
        assert!(ensure_can_activate(CampaignStatus::Scheduled, past, now).is_ok());
    }

    #[test]
    fn test_plan_updates_inserts_and_removes() {
        let campaign_id = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let kept = product_reward(campaign_id, variant, 10, 1);
        let dropped = product_reward(campaign_id, variant, 5, 1);
        let previous = vec![kept.clone(), dropped.clone()];
        let inputs = vec![points_input(3), product_input(Some(kept.id), variant, 4)];

        let plan = plan_reward_writes(campaign_id, &previous, &inputs).unwrap();

        assert_eq!(plan.writes.len(), 2);
        assert!(matches!(
            plan.writes[0],
            RewardWrite::Insert { sort_order: 0, .. }
        ));
        match &plan.writes[1] {
            RewardWrite::Update {
                previous,
                input,
                sort_order,
            } => {
                assert_eq!(previous.id, kept.id);
                assert_eq!(input.allocated_quantity, 4);
                assert_eq!(*sort_order, 1);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(plan.removed, vec![dropped.id]);
    }

    #[test]
    fn test_plan_rejects_foreign_reward_id() {
        let campaign_id = Uuid::new_v4();
        let previous = vec![product_reward(campaign_id, Uuid::new_v4(), 10, 1)];
        let inputs = vec![product_input(Some(Uuid::new_v4()), Uuid::new_v4(), 1)];

        let err = plan_reward_writes(campaign_id, &previous, &inputs).unwrap_err();
        assert!(err.to_string().contains("does not belong"));

        // 新建活动没有旧奖品，任何 id 都不合法
        assert!(plan_reward_writes(campaign_id, &[], &inputs).is_err());
    }

    #[tokio::test]
    async fn test_delete_campaign_returns_all_committed_stock() {
        let owner = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let existing = campaign(owner, CampaignStatus::Active);
        let cap = product_reward(existing.id, variant, 10, 2);
        let mut points = reward(20, 20);
        points.reward_type = RewardType::Points;
        points.variant_id = None;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![cap, points]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![stock_row(variant, owner, 5)]));

        let response = service(db, inventory.clone())
            .delete_campaign(&user(Some(owner), "org_admin"), existing.id)
            .await
            .unwrap();

        assert!(response.detail.is_none());
        assert!(response.warnings.is_empty());
        assert_eq!(response.stock_movements.len(), 1);
        assert_eq!(response.stock_movements[0].quantity_change, 20);
        assert_eq!(inventory.available(variant, owner), Some(25));
    }

    #[tokio::test]
    async fn test_delete_campaign_of_other_organization_is_forbidden() {
        let existing = campaign(Uuid::new_v4(), CampaignStatus::Draft);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .into_connection();
        let inventory = Arc::new(MemoryInventory::default());

        let result = service(db, inventory.clone())
            .delete_campaign(&user(Some(Uuid::new_v4()), "org_admin"), existing.id)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden)));
        assert!(inventory.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_update_campaign_reconciles_previous_against_saved() {
        let owner = Uuid::new_v4();
        let hat = Uuid::new_v4();
        let mug = Uuid::new_v4();
        let existing = campaign(owner, CampaignStatus::Draft);
        let kept = product_reward(existing.id, hat, 10, 1);
        let dropped = product_reward(existing.id, mug, 5, 1);

        // 数据库返回的保存结果决定同步差额
        let kept_after = rewards::Model {
            allocated_quantity: 4,
            remaining_quantity: 4,
            ..kept.clone()
        };
        let inserted = rewards::Model {
            id: Uuid::new_v4(),
            reward_type: RewardType::Points,
            points_value: Some(50),
            variant_id: None,
            sort_order: 1,
            ..reward(3, 3)
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![kept.clone(), dropped]])
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![kept_after], vec![inserted]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let inventory = Arc::new(MemoryInventory::with_rows(vec![
            stock_row(hat, owner, 0),
            stock_row(mug, owner, 0),
        ]));

        let request = save_request(vec![product_input(Some(kept.id), hat, 4), points_input(3)]);
        let response = service(db, inventory.clone())
            .update_campaign(&user(Some(owner), "org_admin"), existing.id, request)
            .await
            .unwrap();

        assert!(response.warnings.is_empty());
        assert_eq!(response.detail.unwrap().rewards.len(), 2);
        assert_eq!(response.stock_movements.len(), 2);
        assert_eq!(inventory.available(hat, owner), Some(6));
        assert_eq!(inventory.available(mug, owner), Some(5));
    }

    #[tokio::test]
    async fn test_update_campaign_rejects_unknown_reward_before_writing() {
        let owner = Uuid::new_v4();
        let existing = campaign(owner, CampaignStatus::Draft);
        let stored = product_reward(existing.id, Uuid::new_v4(), 10, 1);

        // 只提供读取结果，任何写入都会因缺少 mock 结果而返回数据库错误
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .append_query_results([vec![stored]])
            .into_connection();
        let inventory = Arc::new(MemoryInventory::default());

        let request = save_request(vec![product_input(Some(Uuid::new_v4()), Uuid::new_v4(), 1)]);
        let result = service(db, inventory.clone())
            .update_campaign(&user(Some(owner), "org_admin"), existing.id, request)
            .await;

        match result {
            Err(AppError::ValidationError(message)) => {
                assert!(message.contains("does not belong"))
            }
            other => panic!("expected validation error, got {:?}", other.err()),
        }
        assert!(inventory.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_update_campaign_cannot_activate_after_end() {
        let owner = Uuid::new_v4();
        let existing = campaign(owner, CampaignStatus::Draft);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]])
            .into_connection();

        let mut request = save_request(vec![points_input(3)]);
        request.status = Some(CampaignStatus::Active);
        request.start_at = Some(Utc::now() - Duration::days(2));
        request.end_at = Some(Utc::now() - Duration::days(1));

        let result = service(db, Arc::new(MemoryInventory::default()))
            .update_campaign(&user(Some(owner), "org_admin"), existing.id, request)
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_advance_statuses_counts_expired_scheduled_as_ended() {
        let exec = |rows_affected| MockExecResult {
            last_insert_id: 0,
            rows_affected,
        };
        // 依次: scheduled 已过期, scheduled 开始, active 结束
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(2), exec(3), exec(1)])
            .into_connection();

        let (started, ended) = service(db, Arc::new(MemoryInventory::default()))
            .advance_statuses(Utc::now())
            .await
            .unwrap();
        assert_eq!(started, 3);
        assert_eq!(ended, 3);
    }
}
