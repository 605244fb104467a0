use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::api::{
    LoginRequest, LoginResponse, MessageResponse, RegisterRequest, StoryApi, StoryQuery,
    StoryResponse, StoryUpload,
};
use crate::app::{Result, StoryError};
use crate::config::ApiConfig;

pub struct HttpStoryApi {
    client: Client,
    base_url: Url,
    config: ApiConfig,
}

impl HttpStoryApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Self::build(config, None)
    }

    fn build(config: &ApiConfig, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| StoryError::InvalidSession("token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        // Url::join drops the last path segment unless the base ends with '/'.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            config: config.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Account endpoints take `application/x-www-form-urlencoded` fields.
    fn form_post<T: Serialize>(&self, path: &str, fields: &T) -> Result<Request> {
        let url = self.endpoint(path)?;
        tracing::debug!("POST {}", url);
        Ok(self.client.post(url).form(fields).build()?)
    }

    fn stories_url(&self, query: StoryQuery) -> Result<Url> {
        let mut url = self.endpoint("stories")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(size) = query.size {
                pairs.append_pair("size", &size.to_string());
            }
            if query.location {
                pairs.append_pair("location", "1");
            }
        }
        // An empty query_pairs_mut still leaves a trailing '?'.
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

/// Decode a successful body as `T`, or turn an error body into an API error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.bytes().await?;
    Err(error_from_body(status.as_u16(), &body))
}

pub(crate) fn error_from_body(status: u16, body: &[u8]) -> StoryError {
    match serde_json::from_slice::<MessageResponse>(body) {
        Ok(response) => StoryError::Api {
            status,
            message: response.message,
        },
        Err(e) => {
            tracing::debug!("Undecodable error body (status {}): {}", status, e);
            StoryError::Decode { status }
        }
    }
}

#[async_trait]
impl StoryApi for HttpStoryApi {
    fn authorize(&self, token: &str) -> Result<Arc<dyn StoryApi + Send + Sync>> {
        Ok(Arc::new(Self::build(&self.config, Some(token))?))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse> {
        let request = self.form_post("register", request)?;
        let response = self.client.execute(request).await?;
        decode(response).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let request = self.form_post("login", request)?;
        let response = self.client.execute(request).await?;
        decode(response).await
    }

    async fn stories(&self, query: StoryQuery) -> Result<StoryResponse> {
        let url = self.stories_url(query)?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn upload_story(&self, upload: StoryUpload) -> Result<MessageResponse> {
        let url = self.endpoint("stories")?;
        tracing::debug!("POST {} ({} byte photo)", url, upload.photo.len());

        let photo = Part::bytes(upload.photo)
            .file_name(upload.file_name)
            .mime_str("image/jpeg")?;

        let mut form = Form::new()
            .part("photo", photo)
            .text("description", upload.description);
        if let Some(lat) = upload.lat {
            form = form.text("lat", lat.to_string());
        }
        if let Some(lon) = upload.lon {
            form = form.text("lon", lon.to_string());
        }

        let response = self.client.post(url).multipart(form).send().await?;
        decode(response).await
    }
}
