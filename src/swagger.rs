use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{CampaignStatus, GameType, MovementType, RewardType};
use crate::handlers;
use crate::models::*;
use crate::utils::NoPrizeQuota;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::campaign::list_campaigns,
        handlers::campaign::create_campaign,
        handlers::campaign::get_campaign,
        handlers::campaign::update_campaign,
        handlers::campaign::delete_campaign,
        handlers::campaign::update_campaign_status,
        handlers::campaign::get_campaign_stats,
        handlers::campaign::preview_quota,
        handlers::inventory::get_variant_inventory,
        handlers::inventory::adjust_inventory,
        handlers::inventory::list_stock_movements,
        handlers::play::get_public_campaign,
        handlers::play::play_campaign,
    ),
    components(
        schemas(
            GameType,
            CampaignStatus,
            RewardType,
            MovementType,
            RewardInput,
            SaveCampaignRequest,
            UpdateCampaignStatusRequest,
            CampaignQuery,
            QuotaPreviewRequest,
            NoPrizeQuota,
            CampaignResponse,
            RewardResponse,
            CampaignDetailResponse,
            SaveCampaignResponse,
            RewardStats,
            CampaignStatsResponse,
            InventoryResponse,
            StockMovementResponse,
            ManualAdjustmentRequest,
            StockMovementQuery,
            PlayRequest,
            PlayResponse,
            WonReward,
            PublicRewardResponse,
            PublicCampaignResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "campaign", description = "Scratch card / spin wheel campaign management API"),
        (name = "inventory", description = "Product inventory and stock movement API"),
        (name = "play", description = "Consumer play API"),
    ),
    info(
        title = "Loyalty Campaign Backend API",
        version = "1.0.0",
        description = "Loyalty campaign backend REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
