//! Site settings record and its per-field update descriptors.
//!
//! The settings document is versioned append-on-write: every row in
//! `site_settings` is a full snapshot, and at most one row is active at
//! a time (enforced by a partial unique index). Update requests
//! enumerate the known top-level fields explicitly; object-valued
//! fields merge one level deep, everything else replaces wholesale.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Placeholder served when the background image is reset.
pub const DEFAULT_BACKGROUND_IMAGE_URL: &str = "/images/default-background.jpg";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub url: Option<String>,
    pub asset_id: Option<String>,
}

impl ImageAsset {
    pub fn default_background() -> Self {
        ImageAsset {
            url: Some(DEFAULT_BACKGROUND_IMAGE_URL.to_string()),
            asset_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeroSectionText {
    pub title: String,
    pub subtitle: String,
    pub button_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AboutSectionText {
    pub title: String,
    pub content: String,
    pub mission: Option<String>,
    pub vision: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialMedia {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuMainText {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// A menu entry. The `id` is a stable surrogate handle generated at
/// creation; list position is display order only and shifts on delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuChildItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub price: f64,
    #[serde(default)]
    pub image: ImageAsset,
}

impl MenuChildItem {
    pub fn new(title: String, content: String, price: f64, image: ImageAsset) -> Self {
        MenuChildItem {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            price,
            image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub id: String,
    pub is_active: bool,
    #[sqlx(json)]
    pub background_image: ImageAsset,
    #[sqlx(json)]
    pub hero_section_text: HeroSectionText,
    #[sqlx(json)]
    pub about_section_text: AboutSectionText,
    #[sqlx(json)]
    pub about_section_image: ImageAsset,
    #[sqlx(json)]
    pub contact_info: ContactInfo,
    #[sqlx(json)]
    pub social_media: SocialMedia,
    #[sqlx(json)]
    pub menu_main_text: MenuMainText,
    #[sqlx(json)]
    pub menu_main_image: ImageAsset,
    #[sqlx(json)]
    pub menu_child_items: Vec<MenuChildItem>,
    pub updated_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SettingsRecord {
    /// Default bootstrap record, used when no active row exists.
    pub fn bootstrap(admin_id: &str, now: i64) -> Self {
        SettingsRecord {
            id: Uuid::new_v4().to_string(),
            is_active: true,
            background_image: ImageAsset::default_background(),
            hero_section_text: HeroSectionText::default(),
            about_section_text: AboutSectionText::default(),
            about_section_image: ImageAsset::default(),
            contact_info: ContactInfo::default(),
            social_media: SocialMedia::default(),
            menu_main_text: MenuMainText::default(),
            menu_main_image: ImageAsset::default(),
            menu_child_items: Vec::new(),
            updated_by: admin_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// New active record carrying only the display-content fields of a
    /// restore target. Menu items, menu images and the about image stay
    /// at their defaults: restore never resurrects them.
    pub fn restored_from(target: &SettingsRecord, admin_id: &str, now: i64) -> Self {
        SettingsRecord {
            id: Uuid::new_v4().to_string(),
            is_active: true,
            background_image: target.background_image.clone(),
            hero_section_text: target.hero_section_text.clone(),
            about_section_text: target.about_section_text.clone(),
            about_section_image: ImageAsset::default(),
            contact_info: target.contact_info.clone(),
            social_media: target.social_media.clone(),
            menu_main_text: MenuMainText::default(),
            menu_main_image: ImageAsset::default(),
            menu_child_items: Vec::new(),
            updated_by: admin_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place. Object-valued fields shallow
    /// merge; image and array fields replace wholesale.
    pub fn apply(&mut self, patch: UpdateSettingsRequest) {
        if let Some(p) = patch.hero_section_text {
            p.apply(&mut self.hero_section_text);
        }
        if let Some(p) = patch.about_section_text {
            p.apply(&mut self.about_section_text);
        }
        if let Some(p) = patch.contact_info {
            p.apply(&mut self.contact_info);
        }
        if let Some(p) = patch.social_media {
            p.apply(&mut self.social_media);
        }
        if let Some(p) = patch.menu_main_text {
            p.apply(&mut self.menu_main_text);
        }
        if let Some(image) = patch.background_image {
            self.background_image = image;
        }
        if let Some(image) = patch.about_section_image {
            self.about_section_image = image;
        }
        if let Some(image) = patch.menu_main_image {
            self.menu_main_image = image;
        }
        if let Some(items) = patch.menu_child_items {
            self.menu_child_items = items
                .into_iter()
                .map(|item| MenuChildItem::new(item.title, item.content, item.price, ImageAsset::default()))
                .collect();
        }
    }
}

// ---- Update descriptors -------------------------------------------------
//
// One patch type per object-valued field: present keys overwrite, absent
// keys keep the current value. One level only.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSectionTextPatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub button_text: Option<String>,
}

impl HeroSectionTextPatch {
    pub fn apply(self, current: &mut HeroSectionText) {
        if let Some(title) = self.title {
            current.title = title;
        }
        if let Some(subtitle) = self.subtitle {
            current.subtitle = subtitle;
        }
        if let Some(button_text) = self.button_text {
            current.button_text = button_text;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutSectionTextPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mission: Option<String>,
    pub vision: Option<String>,
}

impl AboutSectionTextPatch {
    pub fn apply(self, current: &mut AboutSectionText) {
        if let Some(title) = self.title {
            current.title = title;
        }
        if let Some(content) = self.content {
            current.content = content;
        }
        if let Some(mission) = self.mission {
            current.mission = Some(mission);
        }
        if let Some(vision) = self.vision {
            current.vision = Some(vision);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfoPatch {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInfoPatch {
    pub fn apply(self, current: &mut ContactInfo) {
        if let Some(email) = self.email {
            current.email = Some(email);
        }
        if let Some(phone) = self.phone {
            current.phone = Some(phone);
        }
        if let Some(address) = self.address {
            current.address = Some(address);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaPatch {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
}

impl SocialMediaPatch {
    pub fn apply(self, current: &mut SocialMedia) {
        if let Some(facebook) = self.facebook {
            current.facebook = Some(facebook);
        }
        if let Some(twitter) = self.twitter {
            current.twitter = Some(twitter);
        }
        if let Some(instagram) = self.instagram {
            current.instagram = Some(instagram);
        }
        if let Some(linkedin) = self.linkedin {
            current.linkedin = Some(linkedin);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuMainTextPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl MenuMainTextPatch {
    pub fn apply(self, current: &mut MenuMainText) {
        if let Some(title) = self.title {
            current.title = Some(title);
        }
        if let Some(content) = self.content {
            current.content = Some(content);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub hero_section_text: Option<HeroSectionTextPatch>,
    pub about_section_text: Option<AboutSectionTextPatch>,
    pub contact_info: Option<ContactInfoPatch>,
    pub social_media: Option<SocialMediaPatch>,
    pub menu_main_text: Option<MenuMainTextPatch>,
    pub background_image: Option<ImageAsset>,
    pub about_section_image: Option<ImageAsset>,
    pub menu_main_image: Option<ImageAsset>,
    pub menu_child_items: Option<Vec<MenuChildItemInput>>,
}

/// Partial update for one menu entry; an accompanying image upload is
/// handled separately by the settings service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuChildItemPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MenuChildItemInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 2000))]
    pub content: String,

    #[validate(range(min = 0.0))]
    pub price: f64,
}

// ---- Responses ----------------------------------------------------------

/// Actor identity resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct ActorRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub id: String,
    pub is_active: bool,
    pub background_image: ImageAsset,
    pub hero_section_text: HeroSectionText,
    pub about_section_text: AboutSectionText,
    pub about_section_image: ImageAsset,
    pub contact_info: ContactInfo,
    pub social_media: SocialMedia,
    pub menu_main_text: MenuMainText,
    pub menu_main_image: ImageAsset,
    pub menu_child_items: Vec<MenuChildItem>,
    pub updated_by: ActorRef,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SettingsResponse {
    pub fn from_record(record: SettingsRecord, updated_by: ActorRef) -> Self {
        SettingsResponse {
            id: record.id,
            is_active: record.is_active,
            background_image: record.background_image,
            hero_section_text: record.hero_section_text,
            about_section_text: record.about_section_text,
            about_section_image: record.about_section_image,
            contact_info: record.contact_info,
            social_media: record.social_media,
            menu_main_text: record.menu_main_text,
            menu_main_image: record.menu_main_image,
            menu_child_items: record.menu_child_items,
            updated_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SettingsRecord {
        let mut record = SettingsRecord::bootstrap("admin-1", 1_000);
        record.hero_section_text = HeroSectionText {
            title: "Old".to_string(),
            subtitle: "S".to_string(),
            button_text: "B".to_string(),
        };
        record
    }

    #[test]
    fn test_shallow_merge_preserves_absent_keys() {
        let mut record = sample();
        record.apply(UpdateSettingsRequest {
            hero_section_text: Some(HeroSectionTextPatch {
                title: Some("New".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(record.hero_section_text.title, "New");
        assert_eq!(record.hero_section_text.subtitle, "S");
        assert_eq!(record.hero_section_text.button_text, "B");
    }

    #[test]
    fn test_image_field_replaces_wholesale() {
        let mut record = sample();
        record.apply(UpdateSettingsRequest {
            background_image: Some(ImageAsset {
                url: Some("https://cdn/x.png".to_string()),
                asset_id: None,
            }),
            ..Default::default()
        });

        // No merge: the previous default URL is gone entirely
        assert_eq!(
            record.background_image.url.as_deref(),
            Some("https://cdn/x.png")
        );
        assert!(record.background_image.asset_id.is_none());
    }

    #[test]
    fn test_menu_items_replace_and_get_surrogate_ids() {
        let mut record = sample();
        record.menu_child_items = vec![MenuChildItem::new(
            "old".into(),
            "old".into(),
            1.0,
            ImageAsset::default(),
        )];

        record.apply(UpdateSettingsRequest {
            menu_child_items: Some(vec![MenuChildItemInput {
                title: "espresso".to_string(),
                content: "strong".to_string(),
                price: 3.5,
            }]),
            ..Default::default()
        });

        assert_eq!(record.menu_child_items.len(), 1);
        assert_eq!(record.menu_child_items[0].title, "espresso");
        assert!(!record.menu_child_items[0].id.is_empty());
    }

    #[test]
    fn test_restore_excludes_menu_items() {
        let mut target = sample();
        target.menu_child_items = vec![
            MenuChildItem::new("a".into(), "a".into(), 1.0, ImageAsset::default()),
            MenuChildItem::new("b".into(), "b".into(), 2.0, ImageAsset::default()),
        ];
        target.about_section_image = ImageAsset {
            url: Some("https://cdn/about.png".to_string()),
            asset_id: Some("asset-1".to_string()),
        };
        target.contact_info.email = Some("hi@example.com".to_string());

        let restored = SettingsRecord::restored_from(&target, "admin-2", 2_000);

        assert!(restored.is_active);
        assert!(restored.menu_child_items.is_empty());
        assert_eq!(restored.about_section_image, ImageAsset::default());
        assert_eq!(restored.hero_section_text, target.hero_section_text);
        assert_eq!(restored.contact_info, target.contact_info);
        assert_eq!(restored.updated_by, "admin-2");
        assert_ne!(restored.id, target.id);
    }

    #[test]
    fn test_active_flag_stable_across_update_and_restore() {
        // An in-place update never touches the active flag or the row
        // identity; restore mints a fresh active row and leaves the
        // target untouched (the deactivation sweep is a separate step).
        let mut record = sample();
        let original_id = record.id.clone();
        assert!(record.is_active);

        record.apply(UpdateSettingsRequest {
            contact_info: Some(ContactInfoPatch {
                email: Some("new@example.com".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(record.is_active);
        assert_eq!(record.id, original_id);

        let restored = SettingsRecord::restored_from(&record, "admin-2", 3_000);
        assert!(restored.is_active);
        assert!(record.is_active);
        assert_ne!(restored.id, record.id);
    }

    #[test]
    fn test_bootstrap_has_default_background() {
        let record = SettingsRecord::bootstrap("admin-1", 1);
        assert_eq!(
            record.background_image.url.as_deref(),
            Some(DEFAULT_BACKGROUND_IMAGE_URL)
        );
        assert!(record.is_active);
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let record = SettingsRecord::bootstrap("admin-1", 1);
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("backgroundImage"));
        assert!(obj.contains_key("heroSectionText"));
        assert!(obj.contains_key("menuChildItems"));
        assert!(obj.contains_key("isActive"));
        assert!(obj.contains_key("updatedBy"));
    }
}
