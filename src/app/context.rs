use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{HttpStoryApi, StoryApi};
use crate::app::error::{Result, StoryError};
use crate::config::Config;
use crate::repository::StoryRepository;
use crate::store::sqlite::SqliteStore;

/// Everything the binary needs, built once at startup and passed around
/// explicitly.
pub struct AppContext {
    pub config: Config,
    pub repository: StoryRepository,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let api: Arc<dyn StoryApi + Send + Sync> = Arc::new(HttpStoryApi::new(&config.api)?);
        Ok(Self::with_parts(config, store, api))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let api: Arc<dyn StoryApi + Send + Sync> = Arc::new(HttpStoryApi::new(&config.api)?);
        Ok(Self::with_parts(config, store, api))
    }

    fn with_parts(
        config: Config,
        store: Arc<SqliteStore>,
        api: Arc<dyn StoryApi + Send + Sync>,
    ) -> Self {
        let repository = StoryRepository::new(
            api,
            store.clone(),
            store,
            config.feed.page_size,
            config.upload.max_image_bytes,
        );

        Self { config, repository }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoryError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("storyfeed");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("storyfeed.db"))
    }
}
