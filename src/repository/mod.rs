//! The story repository: one entry point for accounts, the paged feed, the
//! location list and uploads.
//!
//! Every operation returns a stream of [`Outcome`]s that starts with
//! [`Outcome::Loading`] and ends with a single `Success` or `Error`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;

use crate::api::{
    LoginRequest, LoginResult, MessageResponse, RegisterRequest, StoryApi, StoryQuery,
    StoryUpload,
};
use crate::app::{Result, StoryError};
use crate::domain::{Outcome, Session, Story};
use crate::media;
use crate::paging::{FeedCursor, FeedReader, RemoteMediator};
use crate::store::{SessionStore, StoryCache};

pub struct StoryRepository {
    api: Arc<dyn StoryApi + Send + Sync>,
    /// Client carrying the current bearer token; built on first use.
    authorized: Mutex<Option<Arc<dyn StoryApi + Send + Sync>>>,
    session: Arc<dyn SessionStore + Send + Sync>,
    cache: Arc<dyn StoryCache + Send + Sync>,
    page_size: u32,
    max_image_bytes: usize,
}

/// Wrap a fallible operation as `Loading` followed by its result.
fn outcome_stream<'a, T, F>(operation: &'static str, fut: F) -> BoxStream<'a, Outcome<T>>
where
    T: Send + 'a,
    F: Future<Output = Result<T>> + Send + 'a,
{
    stream::once(future::ready(Outcome::Loading))
        .chain(stream::once(async move {
            let result = fut.await;
            if let Err(ref e) = result {
                tracing::warn!("{}: {}", operation, e);
            }
            Outcome::from(result)
        }))
        .boxed()
}

impl StoryRepository {
    pub fn new(
        api: Arc<dyn StoryApi + Send + Sync>,
        session: Arc<dyn SessionStore + Send + Sync>,
        cache: Arc<dyn StoryCache + Send + Sync>,
        page_size: u32,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            api,
            authorized: Mutex::new(None),
            session,
            cache,
            page_size,
            max_image_bytes,
        }
    }

    /// Authorized client, loading the token from the session store the
    /// first time it is needed.
    async fn client(&self) -> Result<Arc<dyn StoryApi + Send + Sync>> {
        let mut authorized = self.authorized.lock().await;
        if let Some(client) = authorized.as_ref() {
            return Ok(client.clone());
        }

        let session = self.session.load_session()?;
        let client = match session.bearer_token() {
            Some(token) => {
                tracing::debug!("Loaded session token");
                self.api.authorize(token)?
            }
            None => {
                tracing::debug!("No session token; using anonymous client");
                self.api.clone()
            }
        };

        *authorized = Some(client.clone());
        Ok(client)
    }

    pub fn session(&self) -> Result<Session> {
        self.session.load_session()
    }

    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> BoxStream<'_, Outcome<MessageResponse>> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        outcome_stream("register", async move { self.api.register(&request).await })
    }

    pub fn login(&self, email: &str, password: &str) -> BoxStream<'_, Outcome<LoginResult>> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        outcome_stream("login", async move { self.try_login(&request).await })
    }

    async fn try_login(&self, request: &LoginRequest) -> Result<LoginResult> {
        let response = self.api.login(request).await?;
        let result = response
            .login_result
            .ok_or(StoryError::MissingLoginResult)?;

        self.session.save_session(&result.token)?;
        let client = self.api.authorize(&result.token)?;
        *self.authorized.lock().await = Some(client);

        tracing::info!(
            "Logged in as {}",
            result.name.as_deref().unwrap_or("(unnamed user)")
        );
        Ok(result)
    }

    /// Clear the session and every cached story.
    pub async fn logout(&self) -> Result<()> {
        let mut authorized = self.authorized.lock().await;
        self.session.clear_session()?;
        self.cache.clear_stories()?;
        *authorized = None;
        tracing::info!("Logged out");
        Ok(())
    }

    /// The paged feed; load errors surface per page through the cursor.
    pub fn list_stories(&self) -> BoxStream<'_, Outcome<FeedCursor>> {
        outcome_stream("list_stories", async move {
            let client = self.client().await?;
            let mediator = Arc::new(RemoteMediator::new(client, self.cache.clone()));
            let reader = FeedReader::new(mediator, self.cache.clone(), self.page_size);
            Ok(reader.observe())
        })
    }

    pub fn list_stories_with_location(&self) -> BoxStream<'_, Outcome<Vec<Story>>> {
        outcome_stream("list_stories_with_location", async move {
            let client = self.client().await?;
            let response = client.stories(StoryQuery::with_location()).await?;
            Ok(response
                .list_story
                .into_iter()
                .filter(Story::has_location)
                .collect())
        })
    }

    pub fn upload_story(
        &self,
        file: Option<&Path>,
        description: &str,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> BoxStream<'_, Outcome<MessageResponse>> {
        let file: Option<PathBuf> = file.map(Path::to_path_buf);
        let description = description.to_string();
        outcome_stream("upload_story", async move {
            let file = file.ok_or(StoryError::NoImage)?;
            self.try_upload(file, description, lat, lon).await
        })
    }

    async fn try_upload(
        &self,
        file: PathBuf,
        description: String,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<MessageResponse> {
        let max_bytes = self.max_image_bytes;
        let file_name = media::upload_file_name(&file);
        let photo = tokio::task::spawn_blocking(move || media::compress_image(&file, max_bytes))
            .await
            .map_err(|e| StoryError::Other(format!("Image task failed: {}", e)))??;

        let client = self.client().await?;
        client
            .upload_story(StoryUpload {
                photo: photo.bytes,
                file_name,
                description,
                lat,
                lon,
            })
            .await
    }
}
