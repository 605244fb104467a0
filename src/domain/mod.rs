pub mod outcome;
pub mod page_key;
pub mod session;
pub mod story;

pub use outcome::Outcome;
pub use page_key::PageKey;
pub use session::Session;
pub use story::Story;

/// Index of the first page served by the story API.
pub const FIRST_PAGE: u32 = 1;
