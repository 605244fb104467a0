pub mod sqlite;

use crate::app::Result;
use crate::domain::{PageKey, Session, Story};

pub use sqlite::SqliteStore;

/// Edge of the cached window whose page pointer should be cleared because
/// the page beyond it came back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealedEdge {
    /// Clear `prev_page` of this story.
    Leading(String),
    /// Clear `next_page` of this story.
    Trailing(String),
}

/// Where newly cached stories land relative to the ones already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// Before the first cached story (a page fetched by Prepend).
    Front,
    #[default]
    Back,
}

/// One fetched page, ready to be written to the cache in a single
/// transaction.
#[derive(Debug, Clone, Default)]
pub struct PageMerge {
    pub clear_first: bool,
    pub placement: Placement,
    pub stories: Vec<Story>,
    pub keys: Vec<PageKey>,
    pub sealed: Option<SealedEdge>,
}

pub trait StoryCache {
    /// Stories in insertion order, starting at `offset`.
    fn stories(&self, offset: usize, limit: usize) -> Result<Vec<Story>>;
    fn all_stories(&self) -> Result<Vec<Story>>;
    fn story_count(&self) -> Result<usize>;

    fn page_key(&self, story_id: &str) -> Result<Option<PageKey>>;
    fn all_page_keys(&self) -> Result<Vec<PageKey>>;

    /// Apply a fetched page atomically: either every change lands or none.
    fn merge_page(&self, merge: &PageMerge) -> Result<()>;
    fn clear_stories(&self) -> Result<()>;

    /// Bumped whenever the cache is cleared, so readers holding offsets into
    /// the old contents can tell they are stale.
    fn generation(&self) -> Result<u64>;
}

pub trait SessionStore {
    fn load_session(&self) -> Result<Session>;
    /// Persist `token` and mark the session as logged in.
    fn save_session(&self, token: &str) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
}
