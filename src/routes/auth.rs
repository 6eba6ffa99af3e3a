//! End-user gateway: signup and signin.

use actix_web::{http::header, web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthMiddleware, AuthUser};
use crate::models::{response, SigninRequest, SignupRequest, UserResponse, ROLE_USER};
use crate::services::UserService;
use crate::utils::auth::create_jwt;
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/signup", web::post().to(signup))
        .route("/signin", web::post().to(signin))
        .service(
            web::resource("/me")
                .wrap(AuthMiddleware)
                .route(web::get().to(session)),
        );
}

async fn session(user: AuthUser) -> AppResult<HttpResponse> {
    Ok(response::ok(
        "Session retrieved successfully",
        UserResponse::from(user.user),
    ))
}

async fn signup(
    state: web::Data<AppState>,
    req: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    req.validate().map_err(AppError::from_validation)?;

    let user = UserService::new(&state.db)
        .create(&req.name, &req.email, &req.password)
        .await?;

    let token = create_jwt(
        &user.id,
        ROLE_USER,
        &state.config.jwt_secret_key,
        &state.config.jwt_expires_in,
    )?;

    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Account created successfully",
        "data": {
            "token": token,
            "user": UserResponse::from(user),
        },
    })))
}

async fn signin(
    state: web::Data<AppState>,
    req: web::Json<SigninRequest>,
) -> AppResult<HttpResponse> {
    req.validate().map_err(AppError::from_validation)?;

    let user = UserService::new(&state.db)
        .authenticate(&req.email, &req.password)
        .await?;

    let token = create_jwt(
        &user.id,
        ROLE_USER,
        &state.config.jwt_secret_key,
        &state.config.jwt_expires_in,
    )?;

    let cookie = super::token_cookie(&token, &state.config.jwt_expires_in)?;

    Ok(HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(json!({
            "status": "success",
            "message": "Logged in successfully",
            "data": {
                "token": token,
                "user": UserResponse::from(user),
            },
        })))
}
