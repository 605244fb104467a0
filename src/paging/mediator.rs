use std::sync::Arc;

use crate::api::{StoryApi, StoryQuery};
use crate::app::Result;
use crate::domain::{PageKey, FIRST_PAGE};
use crate::paging::{InitializeAction, LoadType, MediatorOutcome, PagingState};
use crate::store::{PageMerge, Placement, SealedEdge, StoryCache};

/// Keeps the story cache in step with the remote API as a feed is paged.
pub struct RemoteMediator {
    api: Arc<dyn StoryApi + Send + Sync>,
    cache: Arc<dyn StoryCache + Send + Sync>,
}

/// Page to request, or a reason not to request one.
enum PageTarget {
    Fetch(u32),
    Exhausted,
}

impl RemoteMediator {
    pub fn new(
        api: Arc<dyn StoryApi + Send + Sync>,
        cache: Arc<dyn StoryCache + Send + Sync>,
    ) -> Self {
        Self { api, cache }
    }

    /// Cached data may be stale, so every new feed starts with a refresh.
    pub fn initialize(&self) -> InitializeAction {
        InitializeAction::LaunchInitialRefresh
    }

    pub async fn mediate(&self, load_type: LoadType, state: &PagingState) -> MediatorOutcome {
        match self.load(load_type, state).await {
            Ok(end_of_pagination_reached) => MediatorOutcome::Success {
                end_of_pagination_reached,
            },
            Err(e) => {
                tracing::warn!("{:?} load failed: {}", load_type, e);
                MediatorOutcome::Error(e.user_message())
            }
        }
    }

    async fn load(&self, load_type: LoadType, state: &PagingState) -> Result<bool> {
        let page = match self.page_target(load_type, state)? {
            PageTarget::Fetch(page) => page,
            PageTarget::Exhausted => {
                tracing::debug!("{:?}: no page beyond the loaded window", load_type);
                return Ok(true);
            }
        };

        tracing::debug!("{:?}: fetching page {}", load_type, page);
        let response = self
            .api
            .stories(StoryQuery::page(page, state.page_size))
            .await?;
        let stories = response.list_story;
        let end_of_pagination_reached = stories.is_empty();

        let keys = stories
            .iter()
            .map(|story| PageKey::for_page(story.id.clone(), page, end_of_pagination_reached))
            .collect();

        let sealed = if end_of_pagination_reached {
            match load_type {
                LoadType::Append => state
                    .last_item()
                    .map(|story| SealedEdge::Trailing(story.id.clone())),
                LoadType::Prepend => state
                    .first_item()
                    .map(|story| SealedEdge::Leading(story.id.clone())),
                LoadType::Refresh => None,
            }
        } else {
            None
        };

        let placement = match load_type {
            LoadType::Prepend => Placement::Front,
            LoadType::Refresh | LoadType::Append => Placement::Back,
        };

        let count = stories.len();
        self.cache.merge_page(&PageMerge {
            clear_first: load_type == LoadType::Refresh,
            placement,
            stories,
            keys,
            sealed,
        })?;

        tracing::info!("{:?}: merged {} stories from page {}", load_type, count, page);
        Ok(end_of_pagination_reached)
    }

    fn page_target(&self, load_type: LoadType, state: &PagingState) -> Result<PageTarget> {
        let target = match load_type {
            LoadType::Refresh => {
                let key = match state
                    .anchor_position
                    .and_then(|position| state.closest_item_to_position(position))
                {
                    Some(story) => self.cache.page_key(&story.id)?,
                    None => None,
                };
                let page = key
                    .and_then(|k| k.next_page)
                    .map(|next| next.saturating_sub(1).max(FIRST_PAGE))
                    .unwrap_or(FIRST_PAGE);
                PageTarget::Fetch(page)
            }
            LoadType::Prepend => match state.first_item() {
                Some(story) => match self.cache.page_key(&story.id)?.and_then(|k| k.prev_page) {
                    Some(page) => PageTarget::Fetch(page),
                    None => PageTarget::Exhausted,
                },
                None => PageTarget::Exhausted,
            },
            LoadType::Append => match state.last_item() {
                Some(story) => match self.cache.page_key(&story.id)?.and_then(|k| k.next_page) {
                    Some(page) => PageTarget::Fetch(page),
                    None => PageTarget::Exhausted,
                },
                None => PageTarget::Exhausted,
            },
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{dummy_stories, MockStoryApi};
    use crate::domain::Story;
    use crate::store::SqliteStore;

    const PAGE_SIZE: u32 = 5;

    fn setup(last: usize) -> (MockStoryApi, Arc<SqliteStore>, RemoteMediator) {
        let api = MockStoryApi::with_stories(dummy_stories(last));
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mediator = RemoteMediator::new(Arc::new(api.clone()), store.clone());
        (api, store, mediator)
    }

    fn loaded(store: &SqliteStore) -> PagingState {
        PagingState {
            pages: vec![store.all_stories().unwrap()],
            anchor_position: None,
            page_size: PAGE_SIZE,
        }
    }

    fn ids(stories: &[Story]) -> Vec<String> {
        stories.iter().map(|s| s.id.clone()).collect()
    }

    fn success(end: bool) -> MediatorOutcome {
        MediatorOutcome::Success {
            end_of_pagination_reached: end,
        }
    }

    #[test]
    fn test_initialize_launches_refresh() {
        let (_, _, mediator) = setup(3);
        assert_eq!(mediator.initialize(), InitializeAction::LaunchInitialRefresh);
    }

    #[tokio::test]
    async fn test_refresh_without_anchor_loads_first_page() {
        let (api, store, mediator) = setup(100);

        let outcome = mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;

        assert_eq!(outcome, success(false));
        assert_eq!(api.requests(), vec![StoryQuery::page(1, PAGE_SIZE)]);
        assert_eq!(
            ids(&store.all_stories().unwrap()),
            vec!["id 0", "id 1", "id 2", "id 3", "id 4"]
        );
        for key in store.all_page_keys().unwrap() {
            assert_eq!(key.prev_page, None);
            assert_eq!(key.next_page, Some(2));
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_cache_with_latest_page() {
        let (_, store, mediator) = setup(100);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;
        mediator.mediate(LoadType::Append, &loaded(&store)).await;
        assert_eq!(store.story_count().unwrap(), 10);

        let outcome = mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;

        assert_eq!(outcome, success(false));
        assert_eq!(store.story_count().unwrap(), 5);
        assert_eq!(store.all_page_keys().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_refresh_uses_anchor_page() {
        let (api, store, mediator) = setup(100);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;
        mediator.mediate(LoadType::Append, &loaded(&store)).await;
        mediator.mediate(LoadType::Append, &loaded(&store)).await;

        // Anchor on "id 12", which was fetched on page 3.
        let mut state = loaded(&store);
        state.anchor_position = Some(12);
        let outcome = mediator.mediate(LoadType::Refresh, &state).await;

        assert_eq!(outcome, success(false));
        assert_eq!(api.requests().last(), Some(&StoryQuery::page(3, PAGE_SIZE)));
        assert_eq!(
            ids(&store.all_stories().unwrap()),
            vec!["id 10", "id 11", "id 12", "id 13", "id 14"]
        );
        let key = store.page_key("id 10").unwrap().unwrap();
        assert_eq!(key.prev_page, Some(2));
        assert_eq!(key.next_page, Some(4));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let (_, store, mediator) = setup(100);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;
        let stories = store.all_stories().unwrap();
        let keys = store.all_page_keys().unwrap();

        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;

        assert_eq!(store.all_stories().unwrap(), stories);
        assert_eq!(store.all_page_keys().unwrap(), keys);
    }

    #[tokio::test]
    async fn test_append_writes_following_page() {
        let (api, store, mediator) = setup(100);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;

        let outcome = mediator.mediate(LoadType::Append, &loaded(&store)).await;

        assert_eq!(outcome, success(false));
        assert_eq!(api.requests().last(), Some(&StoryQuery::page(2, PAGE_SIZE)));
        let key = store.page_key("id 7").unwrap().unwrap();
        assert_eq!(key.prev_page, Some(1));
        assert_eq!(key.next_page, Some(3));
    }

    #[tokio::test]
    async fn test_prepend_on_first_page_issues_no_request() {
        let (api, store, mediator) = setup(100);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;
        let before = api.request_count();

        let outcome = mediator.mediate(LoadType::Prepend, &loaded(&store)).await;

        assert_eq!(outcome, success(true));
        assert_eq!(api.request_count(), before);
    }

    #[tokio::test]
    async fn test_prepend_loads_previous_page() {
        let (api, store, mediator) = setup(100);
        let mut state = PagingState::new(PAGE_SIZE);
        state.pages = vec![dummy_stories(14)[10..15].to_vec()];
        store
            .merge_page(&PageMerge {
                clear_first: true,
                stories: state.pages[0].clone(),
                keys: state.pages[0]
                    .iter()
                    .map(|s| PageKey::for_page(s.id.clone(), 3, false))
                    .collect(),
                ..Default::default()
            })
            .unwrap();

        let outcome = mediator.mediate(LoadType::Prepend, &state).await;

        assert_eq!(outcome, success(false));
        assert_eq!(api.requests(), vec![StoryQuery::page(2, PAGE_SIZE)]);
        assert_eq!(store.story_count().unwrap(), 10);
        assert_eq!(store.page_key("id 5").unwrap().unwrap().prev_page, Some(1));
        let expected: Vec<String> = (5..15).map(|i| format!("id {}", i)).collect();
        assert_eq!(ids(&store.all_stories().unwrap()), expected);
    }

    #[tokio::test]
    async fn test_append_on_empty_state_reports_end() {
        let (api, _, mediator) = setup(3);

        let outcome = mediator
            .mediate(LoadType::Append, &PagingState::new(PAGE_SIZE))
            .await;

        assert_eq!(outcome, success(true));
        assert_eq!(api.request_count(), 0);
    }

    #[tokio::test]
    async fn test_end_of_pagination_stops_further_appends() {
        // Exactly one full page on the server.
        let (api, store, mediator) = setup(4);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;

        let outcome = mediator.mediate(LoadType::Append, &loaded(&store)).await;
        assert_eq!(outcome, success(true));
        assert_eq!(api.request_count(), 2);
        assert_eq!(store.page_key("id 4").unwrap().unwrap().next_page, None);

        for _ in 0..3 {
            let outcome = mediator.mediate(LoadType::Append, &loaded(&store)).await;
            assert_eq!(outcome, success(true));
        }
        assert_eq!(api.request_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_untouched() {
        let (api, store, mediator) = setup(100);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;
        let stories = store.all_stories().unwrap();
        let keys = store.all_page_keys().unwrap();

        api.fail_page(2);
        let outcome = mediator.mediate(LoadType::Append, &loaded(&store)).await;

        assert_eq!(
            outcome,
            MediatorOutcome::Error("connection reset on page 2".into())
        );
        assert_eq!(store.all_stories().unwrap(), stories);
        assert_eq!(store.all_page_keys().unwrap(), keys);
    }

    #[tokio::test]
    async fn test_failed_merge_during_refresh_is_rolled_back() {
        let (api, store, mediator) = setup(100);
        mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;
        mediator.mediate(LoadType::Append, &loaded(&store)).await;
        let stories = store.all_stories().unwrap();
        let keys = store.all_page_keys().unwrap();

        // The third story of the new first page cannot be written.
        let mut remote = dummy_stories(100);
        remote[2].id = String::new();
        api.set_stories(remote);

        let outcome = mediator
            .mediate(LoadType::Refresh, &PagingState::new(PAGE_SIZE))
            .await;

        assert!(matches!(outcome, MediatorOutcome::Error(_)));
        assert_eq!(store.all_stories().unwrap(), stories);
        assert_eq!(store.all_page_keys().unwrap(), keys);
    }
}
