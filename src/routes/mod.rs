pub mod admin;
pub mod auth;
pub mod public;
pub mod settings;

use actix_web::cookie::{Cookie, SameSite};

use crate::error::AppResult;
use crate::utils::auth::parse_duration;

/// Session cookie shared by the admin and user gateways.
pub(crate) fn token_cookie(token: &str, expires_in: &str) -> AppResult<Cookie<'static>> {
    let mut cookie = Cookie::new("token", token.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_secure(true);
    cookie.set_path("/");
    let max_age = parse_duration(expires_in)?;
    cookie.set_max_age(time::Duration::seconds(max_age.num_seconds()));
    Ok(cookie)
}
