use crate::error::AppError;
use crate::models::*;
use crate::services::{CampaignService, PlayService};
use crate::utils::{AuthUser, NoPrizeQuota};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

/// 从请求扩展中获取当前管理员（中间件在鉴权后注入）
fn get_auth_user_from_request(req: &HttpRequest) -> Result<AuthUser, AppError> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[utoipa::path(
    get,
    path = "/campaigns",
    tag = "campaign",
    params(
        ("game_type" = Option<String>, Query, description = "玩法: scratch_card/spin_wheel"),
        ("status" = Option<String>, Query, description = "状态: draft/scheduled/active/ended"),
        ("page" = Option<u64>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u64>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动列表成功", body = PaginatedResponse<CampaignResponse>),
        (status = 401, description = "未授权")
    )
)]
/// 分页获取活动列表（按创建时间倒序）
pub async fn list_campaigns(
    service: web::Data<CampaignService>,
    req: HttpRequest,
    query: web::Query<CampaignQuery>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.list_campaigns(&user, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/campaigns",
    tag = "campaign",
    request_body = SaveCampaignRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建活动成功，返回库存流水与警告", body = SaveCampaignResponse),
        (status = 400, description = "参数错误或奖品分配超出参与预算"),
        (status = 401, description = "未授权")
    )
)]
/// 创建活动并为实物奖品占用库存
pub async fn create_campaign(
    service: web::Data<CampaignService>,
    req: HttpRequest,
    request: web::Json<SaveCampaignRequest>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.create_campaign(&user, request.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    tag = "campaign",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动详情成功", body = CampaignDetailResponse),
        (status = 404, description = "活动不存在")
    )
)]
/// 活动详情（含奖品中奖概率与未中奖配额）
pub async fn get_campaign(
    service: web::Data<CampaignService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.get_campaign(&user, path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/campaigns/{id}",
    tag = "campaign",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    request_body = SaveCampaignRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新活动成功，按差额同步库存", body = SaveCampaignResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "活动不存在")
    )
)]
/// 编辑活动与奖品，按编辑前后差额扣减或退回库存
pub async fn update_campaign(
    service: web::Data<CampaignService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<SaveCampaignRequest>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .update_campaign(&user, path.into_inner(), request.into_inner())
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/campaigns/{id}",
    tag = "campaign",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除活动成功，退回已占用库存", body = SaveCampaignResponse),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn delete_campaign(
    service: web::Data<CampaignService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.delete_campaign(&user, path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/campaigns/{id}/status",
    tag = "campaign",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    request_body = UpdateCampaignStatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "修改状态成功", body = CampaignResponse),
        (status = 400, description = "不允许的状态流转")
    )
)]
pub async fn update_campaign_status(
    service: web::Data<CampaignService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<UpdateCampaignStatusRequest>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .update_status(&user, path.into_inner(), request.into_inner().status)
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}/stats",
    tag = "campaign",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动统计成功", body = CampaignStatsResponse),
        (status = 404, description = "活动不存在")
    )
)]
/// 活动统计：参与次数、中奖次数、各奖品中奖数
pub async fn get_campaign_stats(
    service: web::Data<PlayService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.campaign_stats(&user, path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/campaigns/quota",
    tag = "campaign",
    request_body = QuotaPreviewRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "计算未中奖配额成功", body = NoPrizeQuota)
    )
)]
/// 编辑表单实时预览未中奖数量与概率（不写库）
pub async fn preview_quota(
    service: web::Data<CampaignService>,
    request: web::Json<QuotaPreviewRequest>,
) -> Result<HttpResponse> {
    let quota = service.preview_quota(&request.into_inner());
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": quota })))
}

pub fn campaign_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/campaigns")
            .route("", web::get().to(list_campaigns))
            .route("", web::post().to(create_campaign))
            .route("/quota", web::post().to(preview_quota))
            .route("/{id}", web::get().to(get_campaign))
            .route("/{id}", web::put().to(update_campaign))
            .route("/{id}", web::delete().to(delete_campaign))
            .route("/{id}/status", web::put().to(update_campaign_status))
            .route("/{id}/stats", web::get().to(get_campaign_stats)),
    );
}
