pub mod client;
pub mod models;

pub use client::{ApiClient, ApiError, ByteStream, Result};
pub use models::ApiConfig;
