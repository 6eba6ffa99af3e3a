//! Unauthenticated surface: the active site settings for the public
//! frontend, and a liveness probe.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::AppResult;
use crate::models::response;
use crate::services::SettingsService;
use crate::AppState;

pub async fn get_settings(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let service = SettingsService::new(
        &state.db,
        state.store.as_ref(),
        state.config.max_upload_size,
    );
    let settings = service.current_response().await?;
    Ok(response::ok("Settings retrieved successfully", settings))
}

pub async fn health_check(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    sqlx::query("SELECT 1").execute(state.db.pool()).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success", "message": "ok" })))
}
