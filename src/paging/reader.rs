use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};

use crate::app::{Result, StoryError};
use crate::domain::Story;
use crate::paging::{InitializeAction, LoadType, MediatorOutcome, PagingState, RemoteMediator};
use crate::store::StoryCache;

/// Serves the story cache as a sequence of pages, fetching more through the
/// [`RemoteMediator`] when a consumer reaches either edge of the cached data.
#[derive(Clone)]
pub struct FeedReader {
    mediator: Arc<RemoteMediator>,
    cache: Arc<dyn StoryCache + Send + Sync>,
    page_size: u32,
}

impl FeedReader {
    pub fn new(
        mediator: Arc<RemoteMediator>,
        cache: Arc<dyn StoryCache + Send + Sync>,
        page_size: u32,
    ) -> Self {
        Self {
            mediator,
            cache,
            page_size: page_size.max(1),
        }
    }

    /// Start a new consumer over the current cache state.
    pub fn observe(&self) -> FeedCursor {
        let refresh_pending =
            self.mediator.initialize() == InitializeAction::LaunchInitialRefresh;

        FeedCursor {
            mediator: self.mediator.clone(),
            cache: self.cache.clone(),
            state: PagingState::new(self.page_size),
            head: 0,
            tail: 0,
            generation: None,
            refresh_pending,
            start_reached: false,
            end_reached: false,
        }
    }
}

/// One consumer's position in the feed.
///
/// The cursor hands out a contiguous run of the cache: [`FeedCursor::next_page`]
/// extends it forward and [`FeedCursor::previous_page`] backward. Pages already
/// returned are kept in [`FeedCursor::loaded`]; a failed load leaves them
/// intact and the next call retries.
///
/// If another consumer refreshes the cache, the offsets held here no longer
/// mean anything. The next call then reports [`StoryError::FeedRestarted`]
/// once and the cursor starts over on the refreshed cache.
pub struct FeedCursor {
    mediator: Arc<RemoteMediator>,
    cache: Arc<dyn StoryCache + Send + Sync>,
    state: PagingState,
    /// Cache offset of the first story handed out.
    head: usize,
    /// Cache offset just past the last story handed out.
    tail: usize,
    /// Cache generation the offsets refer to.
    generation: Option<u64>,
    refresh_pending: bool,
    start_reached: bool,
    end_reached: bool,
}

impl FeedCursor {
    pub fn loaded(&self) -> &[Vec<Story>] {
        &self.state.pages
    }

    pub fn is_end_reached(&self) -> bool {
        self.end_reached
    }

    /// Reload the page around the last story handed out and start reading
    /// again from there. Runs on the next call to either page method.
    pub fn refresh(&mut self) {
        self.refresh_pending = true;
    }

    /// Next page of stories, `Some(Err)` for a failed load, `None` at the end.
    pub async fn next_page(&mut self) -> Option<Result<Vec<Story>>> {
        self.forward().await.transpose()
    }

    /// Page before the first story handed out, `None` at the start of the feed.
    pub async fn previous_page(&mut self) -> Option<Result<Vec<Story>>> {
        self.backward().await.transpose()
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<Vec<Story>>> {
        stream::unfold(self, |mut cursor| async move {
            cursor.next_page().await.map(|page| (page, cursor))
        })
        .boxed()
    }

    async fn forward(&mut self) -> Result<Option<Vec<Story>>> {
        let page_size = self.state.page_size as usize;
        loop {
            self.sync().await?;

            let window = self.cache.stories(self.tail, page_size)?;
            if window.len() >= page_size || self.end_reached {
                if window.is_empty() {
                    return Ok(None);
                }
                self.tail += window.len();
                self.state.pages.push(window.clone());
                self.state.anchor_position = Some(self.state.item_count() - 1);
                return Ok(Some(window));
            }

            self.append(window).await?;
        }
    }

    async fn backward(&mut self) -> Result<Option<Vec<Story>>> {
        let page_size = self.state.page_size as usize;
        loop {
            self.sync().await?;

            if self.head >= page_size || self.start_reached {
                if self.head == 0 {
                    return Ok(None);
                }
                let take = self.head.min(page_size);
                let window = self.cache.stories(self.head - take, take)?;
                self.head -= take;
                self.state.pages.insert(0, window.clone());
                self.state.anchor_position = Some(0);
                return Ok(Some(window));
            }

            self.prepend().await?;
        }
    }

    /// Run a pending refresh, or notice that someone else cleared the cache.
    async fn sync(&mut self) -> Result<()> {
        if self.refresh_pending {
            // A failed refresh is reported once; cached stories are still served after it.
            self.refresh_pending = false;
            let outcome = self.mediator.mediate(LoadType::Refresh, &self.state).await;
            self.restart(self.cache.generation()?);

            return match outcome {
                MediatorOutcome::Success {
                    end_of_pagination_reached,
                } => {
                    self.end_reached = end_of_pagination_reached;
                    Ok(())
                }
                MediatorOutcome::Error(message) => Err(StoryError::PageLoad(message)),
            };
        }

        let current = self.cache.generation()?;
        match self.generation {
            Some(seen) if seen != current => {
                tracing::info!("Story cache was refreshed elsewhere; restarting cursor");
                self.restart(current);
                Err(StoryError::FeedRestarted)
            }
            Some(_) => Ok(()),
            None => {
                self.generation = Some(current);
                Ok(())
            }
        }
    }

    fn restart(&mut self, generation: u64) {
        self.state.pages.clear();
        self.state.anchor_position = None;
        self.head = 0;
        self.tail = 0;
        self.generation = Some(generation);
        self.start_reached = false;
        self.end_reached = false;
    }

    /// Ask the mediator for the page after everything read so far, including
    /// the partial `tail` not yet handed out.
    async fn append(&mut self, tail: Vec<Story>) -> Result<()> {
        let before = self.cache.story_count()?;

        let has_tail = !tail.is_empty();
        if has_tail {
            self.state.pages.push(tail);
        }
        let outcome = self.mediator.mediate(LoadType::Append, &self.state).await;
        if has_tail {
            self.state.pages.pop();
        }

        match outcome {
            MediatorOutcome::Success {
                end_of_pagination_reached,
            } => {
                if end_of_pagination_reached {
                    self.end_reached = true;
                } else if self.cache.story_count()? == before {
                    tracing::warn!("Append returned only stories already cached; stopping");
                    self.end_reached = true;
                }
                Ok(())
            }
            MediatorOutcome::Error(message) => Err(StoryError::PageLoad(message)),
        }
    }

    /// Ask the mediator for the page before the first cached story. New rows
    /// land in front of everything, so both offsets shift by the rows added.
    async fn prepend(&mut self) -> Result<()> {
        let before = self.cache.story_count()?;

        let boundary = PagingState {
            pages: vec![self.cache.stories(0, 1)?],
            anchor_position: None,
            page_size: self.state.page_size,
        };
        let outcome = self.mediator.mediate(LoadType::Prepend, &boundary).await;

        match outcome {
            MediatorOutcome::Success {
                end_of_pagination_reached,
            } => {
                let added = self.cache.story_count()?.saturating_sub(before);
                self.head += added;
                self.tail += added;

                if end_of_pagination_reached {
                    self.start_reached = true;
                } else if added == 0 {
                    tracing::warn!("Prepend returned only stories already cached; stopping");
                    self.start_reached = true;
                }
                Ok(())
            }
            MediatorOutcome::Error(message) => Err(StoryError::PageLoad(message)),
        }
    }
}
