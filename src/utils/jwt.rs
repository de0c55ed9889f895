use crate::error::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 认证服务签发的 access token 载荷
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id (uuid)
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// 已认证的后台用户，由鉴权中间件注入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub role: String,
}

impl AuthUser {
    pub fn is_super_admin(&self) -> bool {
        self.role == "super_admin"
    }

    /// 是否可管理指定组织的数据
    pub fn can_manage(&self, organization_id: Uuid) -> bool {
        self.is_super_admin() || self.organization_id == Some(organization_id)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> AppResult<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::AuthError("Invalid subject in access token".to_string()))?;
        let organization_id = match claims.org_id {
            Some(org) => Some(Uuid::parse_str(&org).map_err(|_| {
                AppError::AuthError("Invalid organization in access token".to_string())
            })?),
            None => None,
        };
        Ok(AuthUser {
            user_id,
            organization_id,
            role: claims.role.unwrap_or_else(|| "authenticated".to_string()),
        })
    }
}

/// 只做校验：登录与签发由外部认证服务负责 (HS256 共享密钥)
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // 认证服务的 aud 不固定，这里不校验
        validation.validate_aud = false;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AuthUser> {
        self.verify_token(token)?.try_into()
    }
}
