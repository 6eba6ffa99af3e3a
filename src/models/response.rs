//! Success-side response envelope:
//! `{status: "success", message, data?, meta?}`.

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

use crate::query::PaginationMeta;

pub fn ok(message: &str, data: impl Serialize) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": message,
        "data": data,
    }))
}

pub fn ok_with_meta(message: &str, data: impl Serialize, meta: PaginationMeta) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": message,
        "data": data,
        "meta": meta,
    }))
}

pub fn created(message: &str, data: impl Serialize) -> HttpResponse {
    HttpResponse::Created().json(json!({
        "status": "success",
        "message": message,
        "data": data,
    }))
}
