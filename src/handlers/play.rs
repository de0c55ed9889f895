use crate::models::*;
use crate::services::{CampaignService, PlayService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/public/campaigns/{id}",
    tag = "play",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    responses(
        (status = 200, description = "获取活动展示信息成功", body = PublicCampaignResponse),
        (status = 404, description = "活动不存在或未开放")
    )
)]
/// 消费者端活动展示（奖品列表与主题配置，不含库存数量）
pub async fn get_public_campaign(
    service: web::Data<CampaignService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match service.get_public_campaign(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/public/campaigns/{id}/play",
    tag = "play",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    request_body = PlayRequest,
    responses(
        (status = 200, description = "参与成功，返回是否中奖", body = PlayResponse),
        (status = 400, description = "活动未开始/已结束或参与次数已用完"),
        (status = 404, description = "活动不存在")
    )
)]
/// 刮一次 / 转一次
pub async fn play_campaign(
    service: web::Data<PlayService>,
    path: web::Path<Uuid>,
    request: web::Json<PlayRequest>,
) -> Result<HttpResponse> {
    match service.play(path.into_inner(), request.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn play_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/public/campaigns")
            .route("/{id}", web::get().to(get_public_campaign))
            .route("/{id}/play", web::post().to(play_campaign)),
    );
}
