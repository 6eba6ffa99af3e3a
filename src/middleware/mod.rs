pub mod auth;

pub use auth::{AdminMiddleware, AuthAdmin, AuthMiddleware, AuthUser};
