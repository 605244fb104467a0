use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Story {
    pub fn new(id: impl Into<String>, name: impl Into<String>, photo_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            photo_url: photo_url.into(),
            created_at: Utc::now(),
            lat: None,
            lon: None,
        }
    }

    /// Both coordinates are present.
    pub fn has_location(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }

    pub fn display_description(&self) -> &str {
        if self.description.is_empty() {
            "(No description)"
        } else {
            &self.description
        }
    }
}
