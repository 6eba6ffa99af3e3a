pub mod admin;
pub mod settings;
pub mod user;

pub use admin::AdminService;
pub use settings::{ImageField, ImageUpload, SettingsService};
pub use user::UserService;
