use anyhow::Context;

const DEFAULT_MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret_key: String,
    pub jwt_expires_in: String,
    pub asset_store_url: String,
    pub asset_store_api_key: String,
    pub max_upload_size: usize,
    pub cors_allow_origin: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid port number")?;

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let jwt_secret_key =
            std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;
        let jwt_expires_in =
            std::env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "24h".to_string());

        let asset_store_url =
            std::env::var("ASSET_STORE_URL").context("ASSET_STORE_URL must be set")?;
        let asset_store_api_key = std::env::var("ASSET_STORE_API_KEY").unwrap_or_default();

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);

        let cors_allow_origin =
            std::env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_string());

        Ok(Config {
            host,
            port,
            database_url,
            jwt_secret_key,
            jwt_expires_in,
            asset_store_url,
            asset_store_api_key,
            max_upload_size,
            cors_allow_origin,
        })
    }
}
