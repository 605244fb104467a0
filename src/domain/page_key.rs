use serde::{Deserialize, Serialize};

/// Ledger row recording which pages surround the page a story was fetched on.
///
/// `prev_page == None` marks the first page, `next_page == None` the last
/// page known so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageKey {
    pub story_id: String,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl PageKey {
    /// Keys for a story fetched on `page`; `end_reached` is true when that
    /// page came back empty.
    pub fn for_page(story_id: impl Into<String>, page: u32, end_reached: bool) -> Self {
        Self {
            story_id: story_id.into(),
            prev_page: if page <= super::FIRST_PAGE {
                None
            } else {
                Some(page - 1)
            },
            next_page: if end_reached { None } else { Some(page + 1) },
        }
    }
}
