use serde::Serialize;
use utoipa::ToSchema;

/// 错误响应中的 error 字段
/// 完整形如 `{ success: false, error: { code, message } }`，由 `AppError` 生成
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}
