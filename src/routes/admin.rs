//! Admin gateway: login, first-run setup and the query-engine driven
//! user listing. The settings subtree is mounted here behind
//! `AdminMiddleware`.

use actix_web::{http::header, web, HttpResponse};
use serde_json::json;
use std::collections::HashMap;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AdminMiddleware, AuthAdmin};
use crate::models::response;
use crate::models::{AdminLoginRequest, AdminProfile, AdminSetupRequest, UserResponse, ROLE_ADMIN};
use crate::query::{PaginationMeta, QueryOptions};
use crate::routes::{settings, token_cookie};
use crate::services::{AdminService, UserService};
use crate::utils::auth::create_jwt;
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(login))
        .route("/setup", web::post().to(setup))
        .service(
            web::resource("/users")
                .wrap(AdminMiddleware)
                .route(web::get().to(list_users)),
        )
        .service(
            web::scope("/settings")
                .wrap(AdminMiddleware)
                .configure(settings::create_routes),
        );
}

async fn login(
    state: web::Data<AppState>,
    req: web::Json<AdminLoginRequest>,
) -> AppResult<HttpResponse> {
    req.validate().map_err(AppError::from_validation)?;

    let admin_service = AdminService::new(&state.db);
    let mut admin = admin_service.authenticate(&req.email, &req.password).await?;

    let now = admin_service.touch_last_login(&admin.id).await?;
    admin.last_login_at = Some(now);

    let token = create_jwt(
        &admin.id,
        ROLE_ADMIN,
        &state.config.jwt_secret_key,
        &state.config.jwt_expires_in,
    )?;

    let cookie = token_cookie(&token, &state.config.jwt_expires_in)?;

    Ok(HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(json!({
            "status": "success",
            "message": "Logged in successfully",
            "data": {
                "token": token,
                "admin": AdminProfile::from(admin),
            },
        })))
}

/// Creates the first admin account. Once any admin exists this endpoint
/// is closed; further accounts are provisioned by an existing admin out
/// of band.
async fn setup(
    state: web::Data<AppState>,
    req: web::Json<AdminSetupRequest>,
) -> AppResult<HttpResponse> {
    req.validate().map_err(AppError::from_validation)?;

    let admin_service = AdminService::new(&state.db);
    if admin_service.count().await? > 0 {
        return Err(AppError::Forbidden(
            "Admin account already provisioned".to_string(),
        ));
    }

    let admin = admin_service
        .create(&req.name, &req.email, &req.password)
        .await?;

    Ok(response::created(
        "Admin account created successfully",
        AdminProfile::from(admin),
    ))
}

async fn list_users(
    state: web::Data<AppState>,
    _admin: AuthAdmin,
    query: web::Query<HashMap<String, String>>,
) -> AppResult<HttpResponse> {
    let opts = QueryOptions::from_params(&query)?;
    let (users, total) = UserService::new(&state.db).list(&opts).await?;

    let data: Vec<serde_json::Value> = users
        .into_iter()
        .map(|user| {
            let mut value =
                serde_json::to_value(UserResponse::from(user)).unwrap_or_default();
            opts.project(&mut value);
            value
        })
        .collect();

    let meta = PaginationMeta::new(total, opts.page, opts.limit);
    Ok(response::ok_with_meta(
        "Users retrieved successfully",
        data,
        meta,
    ))
}
