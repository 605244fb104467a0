use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub is_logged_in: bool,
}

impl Session {
    pub fn logged_in(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            is_logged_in: true,
        }
    }

    /// Token usable for an `Authorization` header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}
