use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use utoipa::ToSchema;

use crate::bootstrap::app_context::AppContext;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResp {
    pub status: &'static str,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, body = HealthResp))
)]
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResp> {
    let store_ok = ctx.document_store().ping().await.is_ok();
    let status = if store_ok { "ok" } else { "degraded" };
    Json(HealthResp { status })
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new().route("/health", get(health)).with_state(ctx)
}
