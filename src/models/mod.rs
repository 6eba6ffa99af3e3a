pub mod admin;
pub mod auth;
pub mod response;
pub mod settings;
pub mod user;

pub use admin::{Admin, AdminLoginRequest, AdminProfile, AdminSetupRequest};
pub use auth::{Claims, ROLE_ADMIN, ROLE_USER};
pub use settings::{
    ActorRef, ImageAsset, MenuChildItem, MenuChildItemInput, MenuChildItemPatch, SettingsRecord,
    SettingsResponse, UpdateSettingsRequest,
};
pub use user::{SigninRequest, SignupRequest, User, UserResponse};
