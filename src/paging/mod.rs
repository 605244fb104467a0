//! Network-backed paging over the local story cache.
//!
//! ```text
//! StoryApi → RemoteMediator → StoryCache → FeedReader → consumer
//! ```
//!
//! The [`RemoteMediator`] decides which page to fetch and merges it into the
//! cache; the [`FeedReader`] serves the cache page by page and asks the
//! mediator for more when the consumer reaches the end of what is cached.

pub mod mediator;
pub mod reader;

pub use mediator::RemoteMediator;
pub use reader::{FeedCursor, FeedReader};

use crate::domain::Story;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Replace the cache with a freshly fetched page.
    Refresh,
    /// Load the page before the first loaded item.
    Prepend,
    /// Load the page after the last loaded item.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediatorOutcome {
    Success { end_of_pagination_reached: bool },
    Error(String),
}

/// What a new consumer does before serving cached stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeAction {
    LaunchInitialRefresh,
}

/// Snapshot of what a consumer has loaded so far.
#[derive(Debug, Clone, Default)]
pub struct PagingState {
    pub pages: Vec<Vec<Story>>,
    /// Index into the flattened loaded items the consumer last looked at.
    pub anchor_position: Option<usize>,
    pub page_size: u32,
}

impl PagingState {
    pub fn new(page_size: u32) -> Self {
        Self {
            pages: Vec::new(),
            anchor_position: None,
            page_size,
        }
    }

    pub fn first_item(&self) -> Option<&Story> {
        self.pages.iter().flatten().next()
    }

    pub fn last_item(&self) -> Option<&Story> {
        self.pages.iter().rev().flat_map(|page| page.iter().rev()).next()
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Item at `position`, clamped to the loaded range.
    pub fn closest_item_to_position(&self, position: usize) -> Option<&Story> {
        let count = self.item_count();
        if count == 0 {
            return None;
        }
        self.pages.iter().flatten().nth(position.min(count - 1))
    }
}
