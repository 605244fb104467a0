pub mod dto;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;

pub use dto::{
    LoginRequest, LoginResponse, LoginResult, MessageResponse, RegisterRequest, StoryResponse,
};
pub use http::HttpStoryApi;

/// Query for `GET /stories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoryQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub location: bool,
}

impl StoryQuery {
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            location: false,
        }
    }

    pub fn with_location() -> Self {
        Self {
            location: true,
            ..Default::default()
        }
    }
}

/// Multipart payload for `POST /stories`.
#[derive(Debug, Clone)]
pub struct StoryUpload {
    pub photo: Vec<u8>,
    pub file_name: String,
    pub description: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Remote source of stories and accounts.
#[async_trait]
pub trait StoryApi {
    /// A client that sends `Authorization: Bearer <token>` on every request.
    fn authorize(&self, token: &str) -> Result<Arc<dyn StoryApi + Send + Sync>>;

    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse>;
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;
    async fn stories(&self, query: StoryQuery) -> Result<StoryResponse>;
    async fn upload_story(&self, upload: StoryUpload) -> Result<MessageResponse>;
}
