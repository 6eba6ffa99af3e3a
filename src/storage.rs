//! Object-store client for image assets.
//!
//! Uploads return a public URL plus an opaque asset id that allows a
//! later delete. Asset deletes during image replacement are best-effort:
//! the settings service logs and swallows failures.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub url: String,
    pub asset_id: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> AppResult<StoredAsset>;

    async fn delete(&self, asset_id: &str) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
    id: String,
}

pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        HttpObjectStore {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> AppResult<StoredAsset> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::Internal(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("folder", folder.to_string())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/assets", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Asset upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Asset upload failed with status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid asset store response: {}", e)))?;

        Ok(StoredAsset {
            url: body.url,
            asset_id: body.id,
        })
    }

    async fn delete(&self, asset_id: &str) -> AppResult<()> {
        let response = self
            .client
            .delete(format!("{}/assets/{}", self.base_url, asset_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Asset delete failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Asset delete failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
