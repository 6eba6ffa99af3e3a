//! Admin settings endpoints: current record, partial update, history,
//! restore, image replacement and menu item management.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use std::collections::HashMap;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthAdmin;
use crate::models::response;
use crate::models::settings::{
    AboutSectionTextPatch, HeroSectionTextPatch, MenuChildItemPatch,
};
use crate::models::{MenuChildItemInput, UpdateSettingsRequest};
use crate::query::{PaginationMeta, QueryOptions};
use crate::services::{ImageField, ImageUpload, SettingsService};
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(get_settings))
        .route("", web::put().to(update_settings))
        .route("/history", web::get().to(get_history))
        .route("/restore/{id}", web::post().to(restore_settings))
        .route("/background-image", web::put().to(replace_background_image))
        .route(
            "/background-image",
            web::delete().to(remove_background_image),
        )
        .route("/about-section-image", web::put().to(replace_about_image))
        .route("/about-section-image", web::delete().to(remove_about_image))
        .route("/menu-main-image", web::put().to(replace_menu_main_image))
        .route("/menu-main-image", web::delete().to(remove_menu_main_image))
        .route("/hero-section", web::put().to(update_hero_section))
        .route("/about-section", web::put().to(update_about_section))
        .route("/menu-items", web::post().to(add_menu_item))
        .route("/menu-items/{index}", web::put().to(update_menu_item))
        .route("/menu-items/{index}", web::delete().to(delete_menu_item));
}

fn settings_service<'a>(state: &'a AppState) -> SettingsService<'a> {
    SettingsService::new(&state.db, state.store.as_ref(), state.config.max_upload_size)
}

/// Collects one optional `image` file plus any text fields from a
/// multipart body. A second file part is rejected up front.
async fn read_multipart(
    payload: &mut Multipart,
) -> AppResult<(Option<ImageUpload>, HashMap<String, String>)> {
    let mut image: Option<ImageUpload> = None;
    let mut fields = HashMap::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
        let content_disposition = field.content_disposition();
        let field_name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_name())
            .unwrap_or("")
            .to_string();
        let filename = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_filename())
            .map(|s| s.to_string());

        let content_type = field.content_type().map(|m| m.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
            data.extend_from_slice(&chunk);
        }

        if field_name == "image" {
            if image.is_some() {
                return Err(AppError::UploadRejected(
                    "Only one image file is allowed".to_string(),
                ));
            }
            let filename = filename.unwrap_or_else(|| "upload".to_string());
            let content_type = content_type.unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });
            image = Some(ImageUpload {
                filename,
                content_type,
                data,
            });
        } else {
            let value = String::from_utf8(data).map_err(|_| {
                AppError::BadRequest(format!("Field {} is not valid UTF-8", field_name))
            })?;
            fields.insert(field_name, value);
        }
    }

    Ok((image, fields))
}

async fn require_image(payload: &mut Multipart) -> AppResult<ImageUpload> {
    let (image, _) = read_multipart(payload).await?;
    image.ok_or_else(|| AppError::UploadRejected("Image file is required".to_string()))
}

async fn get_settings(state: web::Data<AppState>, _admin: AuthAdmin) -> AppResult<HttpResponse> {
    let settings = settings_service(&state).current_response().await?;
    Ok(response::ok("Settings retrieved successfully", settings))
}

async fn update_settings(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    patch: web::Json<UpdateSettingsRequest>,
) -> AppResult<HttpResponse> {
    let settings = settings_service(&state)
        .update(&admin.id, patch.into_inner())
        .await?;
    Ok(response::ok("Settings updated successfully", settings))
}

async fn get_history(
    state: web::Data<AppState>,
    _admin: AuthAdmin,
    query: web::Query<HashMap<String, String>>,
) -> AppResult<HttpResponse> {
    let opts = QueryOptions::from_params(&query)?;
    let (records, total) = settings_service(&state).history(&opts).await?;

    let data: Vec<serde_json::Value> = records
        .into_iter()
        .map(|record| {
            let mut value = serde_json::to_value(record).unwrap_or_default();
            opts.project(&mut value);
            value
        })
        .collect();

    let meta = PaginationMeta::new(total, opts.page, opts.limit);
    Ok(response::ok_with_meta(
        "Settings history retrieved successfully",
        data,
        meta,
    ))
}

async fn restore_settings(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let settings = settings_service(&state)
        .restore(&admin.id, &path.into_inner())
        .await?;
    Ok(response::ok("Settings restored successfully", settings))
}

// ---- Image fields -------------------------------------------------------

async fn replace_image_field(
    state: &AppState,
    admin: &AuthAdmin,
    field: ImageField,
    payload: &mut Multipart,
) -> AppResult<HttpResponse> {
    let upload = require_image(payload).await?;
    let settings = settings_service(state)
        .replace_image(&admin.id, field, upload)
        .await?;
    Ok(response::ok("Image updated successfully", settings))
}

async fn remove_image_field(
    state: &AppState,
    admin: &AuthAdmin,
    field: ImageField,
) -> AppResult<HttpResponse> {
    let settings = settings_service(state).remove_image(&admin.id, field).await?;
    Ok(response::ok("Image removed successfully", settings))
}

async fn replace_background_image(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    replace_image_field(&state, &admin, ImageField::Background, &mut payload).await
}

async fn remove_background_image(
    state: web::Data<AppState>,
    admin: AuthAdmin,
) -> AppResult<HttpResponse> {
    remove_image_field(&state, &admin, ImageField::Background).await
}

async fn replace_about_image(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    replace_image_field(&state, &admin, ImageField::AboutSection, &mut payload).await
}

async fn remove_about_image(
    state: web::Data<AppState>,
    admin: AuthAdmin,
) -> AppResult<HttpResponse> {
    remove_image_field(&state, &admin, ImageField::AboutSection).await
}

async fn replace_menu_main_image(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    replace_image_field(&state, &admin, ImageField::MenuMain, &mut payload).await
}

async fn remove_menu_main_image(
    state: web::Data<AppState>,
    admin: AuthAdmin,
) -> AppResult<HttpResponse> {
    remove_image_field(&state, &admin, ImageField::MenuMain).await
}

// ---- Section shorthands -------------------------------------------------

async fn update_hero_section(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    patch: web::Json<HeroSectionTextPatch>,
) -> AppResult<HttpResponse> {
    let request = UpdateSettingsRequest {
        hero_section_text: Some(patch.into_inner()),
        ..Default::default()
    };
    let settings = settings_service(&state).update(&admin.id, request).await?;
    Ok(response::ok("Hero section updated successfully", settings))
}

async fn update_about_section(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    patch: web::Json<AboutSectionTextPatch>,
) -> AppResult<HttpResponse> {
    let request = UpdateSettingsRequest {
        about_section_text: Some(patch.into_inner()),
        ..Default::default()
    };
    let settings = settings_service(&state).update(&admin.id, request).await?;
    Ok(response::ok("About section updated successfully", settings))
}

// ---- Menu child items ---------------------------------------------------

async fn add_menu_item(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let (image, fields) = read_multipart(&mut payload).await?;

    let price: f64 = fields
        .get("price")
        .ok_or_else(|| AppError::validation("price is required"))?
        .parse()
        .map_err(|_| AppError::validation("price must be a number"))?;

    let input = MenuChildItemInput {
        title: fields.get("title").cloned().unwrap_or_default(),
        content: fields.get("content").cloned().unwrap_or_default(),
        price,
    };
    input.validate().map_err(AppError::from_validation)?;

    let settings = settings_service(&state)
        .add_menu_item(&admin.id, input, image)
        .await?;
    Ok(response::created("Menu item added successfully", settings))
}

async fn update_menu_item(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    path: web::Path<usize>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let (image, fields) = read_multipart(&mut payload).await?;

    let price = match fields.get("price") {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| AppError::validation("price must be a number"))?,
        ),
        None => None,
    };

    let patch = MenuChildItemPatch {
        title: fields.get("title").cloned(),
        content: fields.get("content").cloned(),
        price,
    };

    let settings = settings_service(&state)
        .update_menu_item(&admin.id, path.into_inner(), patch, image)
        .await?;
    Ok(response::ok("Menu item updated successfully", settings))
}

async fn delete_menu_item(
    state: web::Data<AppState>,
    admin: AuthAdmin,
    path: web::Path<usize>,
) -> AppResult<HttpResponse> {
    let settings = settings_service(&state)
        .delete_menu_item(&admin.id, path.into_inner())
        .await?;
    Ok(response::ok("Menu item removed successfully", settings))
}
