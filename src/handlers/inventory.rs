use crate::error::AppError;
use crate::models::*;
use crate::services::InventoryService;
use crate::utils::AuthUser;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

fn get_auth_user_from_request(req: &HttpRequest) -> Result<AuthUser, AppError> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[utoipa::path(
    get,
    path = "/inventory/variants/{variant_id}",
    tag = "inventory",
    params(
        ("variant_id" = Uuid, Path, description = "商品变体ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取变体库存成功", body = [InventoryResponse]),
        (status = 401, description = "未授权")
    )
)]
/// 变体在各组织的库存（按可用数量倒序）
pub async fn get_variant_inventory(
    service: web::Data<InventoryService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.variant_inventory(&user, path.into_inner()).await {
        Ok(rows) => {
            let data: Vec<InventoryResponse> = rows.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/inventory/adjust",
    tag = "inventory",
    request_body = ManualAdjustmentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "调整库存成功", body = StockMovementResponse),
        (status = 400, description = "库存不足或参数错误"),
        (status = 403, description = "无权管理该组织库存")
    )
)]
/// 手工调整库存（入库为正数，出库为负数）
pub async fn adjust_inventory(
    service: web::Data<InventoryService>,
    req: HttpRequest,
    request: web::Json<ManualAdjustmentRequest>,
) -> Result<HttpResponse> {
    let user = match get_auth_user_from_request(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.manual_adjust(&user, request.into_inner()).await {
        Ok(movement) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": StockMovementResponse::from(movement)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/inventory/movements",
    tag = "inventory",
    params(
        ("reference_type" = Option<String>, Query, description = "业务类型，如 campaign"),
        ("reference_id" = Option<Uuid>, Query, description = "业务ID"),
        ("variant_id" = Option<Uuid>, Query, description = "商品变体ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取库存流水成功", body = [StockMovementResponse])
    )
)]
/// 查询库存流水（倒序）
pub async fn list_stock_movements(
    service: web::Data<InventoryService>,
    query: web::Query<StockMovementQuery>,
) -> Result<HttpResponse> {
    match service.list_movements(&query.into_inner()).await {
        Ok(list) => {
            let data: Vec<StockMovementResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn inventory_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/inventory")
            .route("/variants/{variant_id}", web::get().to(get_variant_inventory))
            .route("/adjust", web::post().to(adjust_inventory))
            .route("/movements", web::get().to(list_stock_movements)),
    );
}
