use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::api::{
    LoginRequest, LoginResponse, LoginResult, MessageResponse, RegisterRequest, StoryApi,
    StoryQuery, StoryResponse, StoryUpload,
};
use crate::app::{Result, StoryError};
use crate::domain::Story;

/// `"id 0"` ..= `"id {last}"`, every story carrying coordinates.
pub fn dummy_stories(last: usize) -> Vec<Story> {
    (0..=last)
        .map(|i| Story {
            id: format!("id {}", i),
            name: format!("name {}", i),
            description: format!("description {}", i),
            photo_url: format!("www.photo.com/{}", i),
            created_at: Utc.timestamp_opt(1_640_995_200 + i as i64 * 60, 0).unwrap(),
            lat: Some(i as f64 + 1.0),
            lon: Some(i as f64 + 2.0),
        })
        .collect()
}

#[derive(Default)]
struct MockState {
    stories: Mutex<Vec<Story>>,
    failing_pages: Mutex<HashSet<u32>>,
    login_response: Mutex<Option<Result<LoginResponse>>>,
    requests: Mutex<Vec<StoryQuery>>,
    uploads: Mutex<Vec<(Option<String>, StoryUpload)>>,
    authorized_tokens: Mutex<Vec<String>>,
}

/// In-memory story API that serves `stories` page by page.
#[derive(Clone, Default)]
pub struct MockStoryApi {
    state: Arc<MockState>,
    token: Option<String>,
}

impl MockStoryApi {
    pub fn with_stories(stories: Vec<Story>) -> Self {
        let api = Self::default();
        api.set_stories(stories);
        api
    }

    pub fn set_stories(&self, stories: Vec<Story>) {
        *self.state.stories.lock().unwrap() = stories;
    }

    pub fn fail_page(&self, page: u32) {
        self.state.failing_pages.lock().unwrap().insert(page);
    }

    pub fn heal_page(&self, page: u32) {
        self.state.failing_pages.lock().unwrap().remove(&page);
    }

    pub fn set_login_response(&self, response: Result<LoginResponse>) {
        *self.state.login_response.lock().unwrap() = Some(response);
    }

    pub fn requests(&self) -> Vec<StoryQuery> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn uploads(&self) -> Vec<(Option<String>, StoryUpload)> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn authorized_tokens(&self) -> Vec<String> {
        self.state.authorized_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoryApi for MockStoryApi {
    fn authorize(&self, token: &str) -> Result<Arc<dyn StoryApi + Send + Sync>> {
        self.state
            .authorized_tokens
            .lock()
            .unwrap()
            .push(token.to_string());
        Ok(Arc::new(Self {
            state: self.state.clone(),
            token: Some(token.to_string()),
        }))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse> {
        if request.password.len() < 8 {
            return Err(StoryError::Api {
                status: 400,
                message: "Password must be at least 8 characters long".into(),
            });
        }
        Ok(MessageResponse {
            error: false,
            message: "User Created".into(),
        })
    }

    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse> {
        match self.state.login_response.lock().unwrap().take() {
            Some(response) => response,
            None => Err(StoryError::Api {
                status: 401,
                message: "User not found".into(),
            }),
        }
    }

    async fn stories(&self, query: StoryQuery) -> Result<StoryResponse> {
        self.state.requests.lock().unwrap().push(query);

        if let Some(page) = query.page {
            if self.state.failing_pages.lock().unwrap().contains(&page) {
                return Err(StoryError::Other(format!("connection reset on page {}", page)));
            }
        }

        let stories = self.state.stories.lock().unwrap().clone();
        let list_story = match (query.page, query.size) {
            (Some(page), Some(size)) => {
                let start = (page.saturating_sub(1) * size) as usize;
                stories
                    .into_iter()
                    .skip(start)
                    .take(size as usize)
                    .collect()
            }
            _ => stories,
        };

        Ok(StoryResponse {
            error: false,
            message: "Stories fetched successfully".into(),
            list_story,
        })
    }

    async fn upload_story(&self, upload: StoryUpload) -> Result<MessageResponse> {
        self.state
            .uploads
            .lock()
            .unwrap()
            .push((self.token.clone(), upload));
        Ok(MessageResponse {
            error: false,
            message: "Story created successfully".into(),
        })
    }
}

/// Convenience for tests that only need a successful login.
pub fn login_ok(token: &str) -> Result<LoginResponse> {
    Ok(LoginResponse {
        error: false,
        message: "success".into(),
        login_result: Some(LoginResult::new(token)),
    })
}
