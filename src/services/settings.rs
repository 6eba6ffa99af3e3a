//! Settings version manager.
//!
//! Owns every transition of the single-active-record invariant: lazy
//! bootstrap, in-place updates of the active row, transactional restore
//! (deactivate-all then insert-copy), and the image asset lifecycle.
//! Old assets are reclaimed best-effort before a replacement upload; a
//! failed delete is logged and never blocks the mutation.

use sqlx::types::Json;
use std::collections::HashMap;

use crate::db::Database;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::settings::MenuChildItemPatch;
use crate::models::{
    ActorRef, ImageAsset, MenuChildItem, MenuChildItemInput, SettingsRecord, SettingsResponse,
    UpdateSettingsRequest,
};
use crate::query::QueryOptions;
use crate::services::AdminService;
use crate::storage::ObjectStore;
use crate::utils::time::current_timestamp_seconds;

const SETTINGS_COLUMNS: &str = "id, is_active, background_image, hero_section_text, \
     about_section_text, about_section_image, contact_info, social_media, menu_main_text, \
     menu_main_image, menu_child_items, updated_by, created_at, updated_at";

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// An image file extracted from a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// The column-backed image fields; menu item images live inside the
/// menu_child_items sequence and are addressed by index instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField {
    Background,
    AboutSection,
    MenuMain,
}

impl ImageField {
    pub fn folder(&self) -> &'static str {
        match self {
            ImageField::Background => "site/background",
            ImageField::AboutSection => "site/about",
            ImageField::MenuMain => "site/menu",
        }
    }

    fn reset_value(&self) -> ImageAsset {
        match self {
            ImageField::Background => ImageAsset::default_background(),
            _ => ImageAsset::default(),
        }
    }
}

pub fn validate_upload(upload: &ImageUpload, max_size: usize) -> AppResult<()> {
    if upload.data.is_empty() {
        return Err(AppError::UploadRejected(
            "Image file is required".to_string(),
        ));
    }

    if !ALLOWED_IMAGE_TYPES.contains(&upload.content_type.as_str()) {
        return Err(AppError::UploadRejected(format!(
            "Unsupported image type: {} (allowed: jpeg, jpg, png, webp)",
            upload.content_type
        )));
    }

    if upload.data.len() > max_size {
        return Err(AppError::UploadRejected(format!(
            "Image exceeds the maximum upload size of {} bytes",
            max_size
        )));
    }

    Ok(())
}

/// Best-effort reclaim of a replaced asset. Failures are logged and
/// swallowed so cleanup can never abort the settings mutation.
pub async fn reclaim_asset(store: &dyn ObjectStore, asset_id: Option<&str>) {
    if let Some(id) = asset_id {
        if let Err(e) = store.delete(id).await {
            tracing::warn!("Failed to delete replaced asset {}: {}", id, e);
        }
    }
}

/// Reclaims `old`'s stored asset when a mutation swapped it for a
/// different one. A no-op when the value kept its asset or never had
/// one.
async fn reclaim_if_replaced(store: &dyn ObjectStore, old: &ImageAsset, new: &ImageAsset) {
    if old.asset_id.is_some() && old.asset_id != new.asset_id {
        reclaim_asset(store, old.asset_id.as_deref()).await;
    }
}

fn check_menu_index(record: &SettingsRecord, index: usize) -> AppResult<()> {
    if index >= record.menu_child_items.len() {
        return Err(AppError::NotFound(format!(
            "Menu item index {} out of range",
            index
        )));
    }
    Ok(())
}

pub struct SettingsService<'a> {
    db: &'a Database,
    store: &'a dyn ObjectStore,
    max_upload_size: usize,
}

impl<'a> SettingsService<'a> {
    pub fn new(db: &'a Database, store: &'a dyn ObjectStore, max_upload_size: usize) -> Self {
        SettingsService {
            db,
            store,
            max_upload_size,
        }
    }

    // ---- Current record and bootstrap -----------------------------------

    pub async fn get_active(&self) -> AppResult<Option<SettingsRecord>> {
        let record = sqlx::query_as::<_, SettingsRecord>(&format!(
            "SELECT {} FROM site_settings WHERE is_active = TRUE",
            SETTINGS_COLUMNS
        ))
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<SettingsRecord>> {
        let record = sqlx::query_as::<_, SettingsRecord>(&format!(
            "SELECT {} FROM site_settings WHERE id = $1",
            SETTINGS_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(record)
    }

    /// The active record, lazily bootstrapping a default one on first
    /// call. Concurrent first-callers race on the insert; the partial
    /// unique index picks one winner and the loser re-reads it.
    pub async fn current(&self) -> AppResult<SettingsRecord> {
        if let Some(record) = self.get_active().await? {
            return Ok(record);
        }

        let admin_id = AdminService::new(self.db).ensure_any_admin().await?;
        let record = SettingsRecord::bootstrap(&admin_id, current_timestamp_seconds());

        match self.insert(&record).await {
            Ok(()) => Ok(record),
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                tracing::debug!("Lost bootstrap race, re-reading active settings record");
                self.get_active()
                    .await?
                    .ok_or_else(|| AppError::Internal("No active settings record".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn current_response(&self) -> AppResult<SettingsResponse> {
        let record = self.current().await?;
        self.to_response(record).await
    }

    // ---- Partial update --------------------------------------------------

    pub async fn update(
        &self,
        actor_id: &str,
        patch: UpdateSettingsRequest,
    ) -> AppResult<SettingsResponse> {
        let mut record = self.current().await?;

        // Wholesale replacement through the JSON patch drops the old
        // image values; their stored assets get reclaimed like on the
        // dedicated image endpoints.
        let old_background = record.background_image.clone();
        let old_about_image = record.about_section_image.clone();
        let old_menu_image = record.menu_main_image.clone();
        let old_items = if patch.menu_child_items.is_some() {
            std::mem::take(&mut record.menu_child_items)
        } else {
            Vec::new()
        };

        record.apply(patch);
        record.updated_by = actor_id.to_string();
        record.updated_at = current_timestamp_seconds();

        self.persist(&record).await?;

        reclaim_if_replaced(self.store, &old_background, &record.background_image).await;
        reclaim_if_replaced(self.store, &old_about_image, &record.about_section_image).await;
        reclaim_if_replaced(self.store, &old_menu_image, &record.menu_main_image).await;
        for item in &old_items {
            reclaim_asset(self.store, item.image.asset_id.as_deref()).await;
        }

        self.to_response(record).await
    }

    // ---- History and restore ----------------------------------------------

    pub async fn history(&self, opts: &QueryOptions) -> AppResult<(Vec<SettingsResponse>, i64)> {
        let (where_clause, binds) = opts.where_clause(1);

        let count_sql = format!("SELECT COUNT(*) FROM site_settings {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total = count_query.fetch_one(&self.db.pool).await?;

        let list_sql = format!(
            "SELECT {} FROM site_settings {} {} LIMIT {} OFFSET {}",
            SETTINGS_COLUMNS,
            where_clause,
            opts.order_clause(),
            opts.limit,
            opts.offset()
        );
        let mut list_query = sqlx::query_as::<_, SettingsRecord>(&list_sql);
        for bind in &binds {
            list_query = list_query.bind(bind);
        }
        let records = list_query.fetch_all(&self.db.pool).await?;

        let responses = self.to_responses(records).await?;
        Ok((responses, total))
    }

    /// Creates a new active record from the display-content fields of
    /// `target_id`. The target row itself is left untouched; the sweep
    /// and the insert run in one transaction so a crash cannot leave the
    /// collection without an active record.
    pub async fn restore(&self, actor_id: &str, target_id: &str) -> AppResult<SettingsResponse> {
        let target = self
            .get_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Settings record not found".to_string()))?;

        let record =
            SettingsRecord::restored_from(&target, actor_id, current_timestamp_seconds());

        let mut tx = self.db.pool.begin().await?;

        sqlx::query("UPDATE site_settings SET is_active = FALSE WHERE is_active")
            .execute(&mut *tx)
            .await?;

        Self::insert_with(&mut tx, &record).await?;

        tx.commit().await?;

        self.to_response(record).await
    }

    // ---- Image lifecycle ---------------------------------------------------

    pub async fn replace_image(
        &self,
        actor_id: &str,
        field: ImageField,
        upload: ImageUpload,
    ) -> AppResult<SettingsResponse> {
        validate_upload(&upload, self.max_upload_size)?;

        let mut record = self.current().await?;

        let slot = match field {
            ImageField::Background => &record.background_image,
            ImageField::AboutSection => &record.about_section_image,
            ImageField::MenuMain => &record.menu_main_image,
        };
        reclaim_asset(self.store, slot.asset_id.as_deref()).await;

        let stored = self
            .store
            .upload(
                field.folder(),
                &upload.filename,
                &upload.content_type,
                upload.data,
            )
            .await?;

        let asset = ImageAsset {
            url: Some(stored.url),
            asset_id: Some(stored.asset_id),
        };
        match field {
            ImageField::Background => record.background_image = asset,
            ImageField::AboutSection => record.about_section_image = asset,
            ImageField::MenuMain => record.menu_main_image = asset,
        }

        record.updated_by = actor_id.to_string();
        record.updated_at = current_timestamp_seconds();
        self.persist(&record).await?;
        self.to_response(record).await
    }

    pub async fn remove_image(
        &self,
        actor_id: &str,
        field: ImageField,
    ) -> AppResult<SettingsResponse> {
        let mut record = self.current().await?;

        let slot = match field {
            ImageField::Background => &record.background_image,
            ImageField::AboutSection => &record.about_section_image,
            ImageField::MenuMain => &record.menu_main_image,
        };
        reclaim_asset(self.store, slot.asset_id.as_deref()).await;

        let reset = field.reset_value();
        match field {
            ImageField::Background => record.background_image = reset,
            ImageField::AboutSection => record.about_section_image = reset,
            ImageField::MenuMain => record.menu_main_image = reset,
        }

        record.updated_by = actor_id.to_string();
        record.updated_at = current_timestamp_seconds();
        self.persist(&record).await?;
        self.to_response(record).await
    }

    // ---- Menu child items ---------------------------------------------------

    pub async fn add_menu_item(
        &self,
        actor_id: &str,
        input: MenuChildItemInput,
        image: Option<ImageUpload>,
    ) -> AppResult<SettingsResponse> {
        let mut record = self.current().await?;

        let asset = match image {
            Some(upload) => {
                validate_upload(&upload, self.max_upload_size)?;
                let stored = self
                    .store
                    .upload(
                        "site/menu-items",
                        &upload.filename,
                        &upload.content_type,
                        upload.data,
                    )
                    .await?;
                ImageAsset {
                    url: Some(stored.url),
                    asset_id: Some(stored.asset_id),
                }
            }
            None => ImageAsset::default(),
        };

        record
            .menu_child_items
            .push(MenuChildItem::new(input.title, input.content, input.price, asset));

        record.updated_by = actor_id.to_string();
        record.updated_at = current_timestamp_seconds();
        self.persist(&record).await?;
        self.to_response(record).await
    }

    /// Index-addressed update. Indices shift on delete; the item's
    /// surrogate id is the stable handle across mutations.
    pub async fn update_menu_item(
        &self,
        actor_id: &str,
        index: usize,
        patch: MenuChildItemPatch,
        image: Option<ImageUpload>,
    ) -> AppResult<SettingsResponse> {
        let mut record = self.current().await?;
        check_menu_index(&record, index)?;

        if let Some(upload) = image {
            validate_upload(&upload, self.max_upload_size)?;
            reclaim_asset(
                self.store,
                record.menu_child_items[index].image.asset_id.as_deref(),
            )
            .await;
            let stored = self
                .store
                .upload(
                    "site/menu-items",
                    &upload.filename,
                    &upload.content_type,
                    upload.data,
                )
                .await?;
            record.menu_child_items[index].image = ImageAsset {
                url: Some(stored.url),
                asset_id: Some(stored.asset_id),
            };
        }

        let item = &mut record.menu_child_items[index];
        if let Some(title) = patch.title {
            item.title = title;
        }
        if let Some(content) = patch.content {
            item.content = content;
        }
        if let Some(price) = patch.price {
            item.price = price;
        }

        record.updated_by = actor_id.to_string();
        record.updated_at = current_timestamp_seconds();
        self.persist(&record).await?;
        self.to_response(record).await
    }

    pub async fn delete_menu_item(
        &self,
        actor_id: &str,
        index: usize,
    ) -> AppResult<SettingsResponse> {
        let mut record = self.current().await?;
        check_menu_index(&record, index)?;

        let removed = record.menu_child_items.remove(index);
        reclaim_asset(self.store, removed.image.asset_id.as_deref()).await;

        record.updated_by = actor_id.to_string();
        record.updated_at = current_timestamp_seconds();
        self.persist(&record).await?;
        self.to_response(record).await
    }

    // ---- Persistence helpers --------------------------------------------

    async fn insert(&self, record: &SettingsRecord) -> AppResult<()> {
        let mut tx = self.db.pool.begin().await?;
        Self::insert_with(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_with(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record: &SettingsRecord,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO site_settings (
                id, is_active, background_image, hero_section_text, about_section_text,
                about_section_image, contact_info, social_media, menu_main_text,
                menu_main_image, menu_child_items, updated_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&record.id)
        .bind(record.is_active)
        .bind(Json(&record.background_image))
        .bind(Json(&record.hero_section_text))
        .bind(Json(&record.about_section_text))
        .bind(Json(&record.about_section_image))
        .bind(Json(&record.contact_info))
        .bind(Json(&record.social_media))
        .bind(Json(&record.menu_main_text))
        .bind(Json(&record.menu_main_image))
        .bind(Json(&record.menu_child_items))
        .bind(&record.updated_by)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn persist(&self, record: &SettingsRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE site_settings SET
                background_image = $1, hero_section_text = $2, about_section_text = $3,
                about_section_image = $4, contact_info = $5, social_media = $6,
                menu_main_text = $7, menu_main_image = $8, menu_child_items = $9,
                updated_by = $10, updated_at = $11
            WHERE id = $12
            "#,
        )
        .bind(Json(&record.background_image))
        .bind(Json(&record.hero_section_text))
        .bind(Json(&record.about_section_text))
        .bind(Json(&record.about_section_image))
        .bind(Json(&record.contact_info))
        .bind(Json(&record.social_media))
        .bind(Json(&record.menu_main_text))
        .bind(Json(&record.menu_main_image))
        .bind(Json(&record.menu_child_items))
        .bind(&record.updated_by)
        .bind(record.updated_at)
        .bind(&record.id)
        .execute(&self.db.pool)
        .await?;

        Ok(())
    }

    // ---- Actor resolution -----------------------------------------------

    async fn to_response(&self, record: SettingsRecord) -> AppResult<SettingsResponse> {
        let actor = self.resolve_actor(&record.updated_by).await?;
        Ok(SettingsResponse::from_record(record, actor))
    }

    async fn to_responses(
        &self,
        records: Vec<SettingsRecord>,
    ) -> AppResult<Vec<SettingsResponse>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = records.iter().map(|r| r.updated_by.clone()).collect();
        ids.sort();
        ids.dedup();

        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "SELECT id, name, email FROM admin WHERE id IN ({})",
            placeholders.join(", ")
        );

        let mut query = sqlx::query_as::<_, (String, String, String)>(&sql);
        for id in &ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.db.pool).await?;

        let actors: HashMap<String, ActorRef> = rows
            .into_iter()
            .map(|(id, name, email)| (id.clone(), ActorRef { id, name, email }))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let actor = actors
                    .get(&record.updated_by)
                    .cloned()
                    .unwrap_or_else(|| unknown_actor(&record.updated_by));
                SettingsResponse::from_record(record, actor)
            })
            .collect())
    }

    async fn resolve_actor(&self, admin_id: &str) -> AppResult<ActorRef> {
        let admin = AdminService::new(self.db).get_by_id(admin_id).await?;
        Ok(admin
            .map(|a| ActorRef {
                id: a.id,
                name: a.name,
                email: a.email,
            })
            .unwrap_or_else(|| unknown_actor(admin_id)))
    }
}

fn unknown_actor(id: &str) -> ActorRef {
    ActorRef {
        id: id.to_string(),
        name: "Unknown".to_string(),
        email: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::DEFAULT_BACKGROUND_IMAGE_URL;
    use crate::storage::StoredAsset;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct MockStore {
        fail_delete: bool,
        deletes: Mutex<Vec<String>>,
        uploads: Mutex<Vec<String>>,
    }

    impl MockStore {
        fn new(fail_delete: bool) -> Self {
            MockStore {
                fail_delete,
                deletes: Mutex::new(Vec::new()),
                uploads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for MockStore {
        async fn upload(
            &self,
            folder: &str,
            filename: &str,
            _content_type: &str,
            _data: Vec<u8>,
        ) -> AppResult<StoredAsset> {
            self.uploads
                .lock()
                .unwrap()
                .push(format!("{}/{}", folder, filename));
            Ok(StoredAsset {
                url: format!("https://cdn.example/{}/{}", folder, filename),
                asset_id: Uuid::new_v4().to_string(),
            })
        }

        async fn delete(&self, asset_id: &str) -> AppResult<()> {
            self.deletes.lock().unwrap().push(asset_id.to_string());
            if self.fail_delete {
                Err(AppError::Internal("store unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn upload(content_type: &str, size: usize) -> ImageUpload {
        ImageUpload {
            filename: "photo.png".to_string(),
            content_type: content_type.to_string(),
            data: vec![0u8; size],
        }
    }

    #[test]
    fn test_validate_upload_accepts_allowed_types() {
        for ty in ALLOWED_IMAGE_TYPES {
            assert!(validate_upload(&upload(ty, 100), 1024).is_ok());
        }
    }

    #[test]
    fn test_validate_upload_rejects_bad_type() {
        let err = validate_upload(&upload("image/gif", 100), 1024).unwrap_err();
        assert!(matches!(err, AppError::UploadRejected(_)));
    }

    #[test]
    fn test_validate_upload_rejects_missing_file() {
        let err = validate_upload(&upload("image/png", 0), 1024).unwrap_err();
        assert!(matches!(err, AppError::UploadRejected(_)));
    }

    #[test]
    fn test_validate_upload_rejects_oversize() {
        let err = validate_upload(&upload("image/png", 2048), 1024).unwrap_err();
        assert!(matches!(err, AppError::UploadRejected(_)));
    }

    #[tokio::test]
    async fn test_reclaim_swallows_delete_failure() {
        let store = MockStore::new(true);
        // Must not propagate the failure
        reclaim_asset(&store, Some("asset-1")).await;
        assert_eq!(store.deletes.lock().unwrap().as_slice(), ["asset-1"]);

        // A subsequent upload still goes through
        let stored = store
            .upload("site/background", "bg.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(!stored.asset_id.is_empty());
    }

    #[tokio::test]
    async fn test_reclaim_skips_absent_asset() {
        let store = MockStore::new(false);
        reclaim_asset(&store, None).await;
        assert!(store.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patch_replacing_image_reclaims_stored_asset() {
        let store = MockStore::new(false);
        let mut record = SettingsRecord::bootstrap("admin-1", 1);
        record.background_image = ImageAsset {
            url: Some("https://cdn.example/old.png".to_string()),
            asset_id: Some("asset-old".to_string()),
        };
        let old = record.background_image.clone();

        record.apply(UpdateSettingsRequest {
            background_image: Some(ImageAsset {
                url: Some("https://cdn.example/new.png".to_string()),
                asset_id: None,
            }),
            ..Default::default()
        });

        assert!(record.background_image.asset_id.is_none());
        reclaim_if_replaced(&store, &old, &record.background_image).await;
        assert_eq!(store.deletes.lock().unwrap().as_slice(), ["asset-old"]);
    }

    #[tokio::test]
    async fn test_unchanged_image_keeps_its_asset() {
        let store = MockStore::new(false);
        let kept = ImageAsset {
            url: Some("https://cdn.example/a.png".to_string()),
            asset_id: Some("asset-1".to_string()),
        };
        reclaim_if_replaced(&store, &kept, &kept.clone()).await;

        // Nothing to reclaim when the previous value had no stored asset
        let fresh = ImageAsset {
            url: Some("https://cdn.example/b.png".to_string()),
            asset_id: Some("asset-2".to_string()),
        };
        reclaim_if_replaced(&store, &ImageAsset::default(), &fresh).await;

        assert!(store.deletes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_menu_index_out_of_range_is_not_found() {
        let mut record = SettingsRecord::bootstrap("admin-1", 1);
        assert!(matches!(
            check_menu_index(&record, 0),
            Err(AppError::NotFound(_))
        ));

        record.menu_child_items = vec![
            MenuChildItem::new("a".into(), "a".into(), 1.0, ImageAsset::default()),
            MenuChildItem::new("b".into(), "b".into(), 2.0, ImageAsset::default()),
        ];
        assert!(check_menu_index(&record, 1).is_ok());
        assert!(matches!(
            check_menu_index(&record, 2),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_image_field_folders() {
        assert_eq!(ImageField::Background.folder(), "site/background");
        assert_eq!(ImageField::AboutSection.folder(), "site/about");
        assert_eq!(ImageField::MenuMain.folder(), "site/menu");
    }

    #[test]
    fn test_reset_values() {
        assert_eq!(
            ImageField::Background.reset_value().url.as_deref(),
            Some(DEFAULT_BACKGROUND_IMAGE_URL)
        );
        assert!(ImageField::AboutSection.reset_value().url.is_none());
        assert!(ImageField::MenuMain.reset_value().url.is_none());
    }
}
