//! HTTP façade over `rabbitmq.com/v1beta1` `Permission` resources.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;

pub use app::{build_router, AppState};
pub use config::ApiConfig;
pub use error::ApiError;
