//! # storyfeed
//!
//! Client for a story-sharing service with an offline-first, paged feed.
//!
//! ## Architecture
//!
//! ```text
//! StoryApi → RemoteMediator → SQLite cache → FeedReader → StoryRepository → CLI
//! ```
//!
//! - [`api`]: HTTP client for the story service
//! - [`paging`]: Remote mediator and feed reader over the cache
//! - [`store`]: SQLite persistence for stories, page keys and the session
//! - [`repository`]: `Outcome` streams for every user-facing operation
//!
//! ## Quick Start
//!
//! ```bash
//! storyfeed login --email me@example.com --password secret
//! storyfeed stories --pages 2
//! storyfeed upload ./beach.jpg --description "At the beach"
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, API client, repository.
pub mod app;

/// Configuration management.
///
/// Loads from `~/.config/storyfeed/config.toml`.
pub mod config;

/// Command-line interface using clap.
pub mod cli;

/// Core domain models.
///
/// - [`Story`](domain::Story): A story as served by the API
/// - [`PageKey`](domain::PageKey): Page pointers for a cached story
/// - [`Session`](domain::Session): Persisted login state
/// - [`Outcome`](domain::Outcome): Loading/success/error state of an operation
pub mod domain;

/// Remote story API.
///
/// - [`StoryApi`](api::StoryApi): Async trait for the remote source
/// - [`HttpStoryApi`](api::HttpStoryApi): reqwest-based implementation
pub mod api;

/// Photo downsizing for uploads.
pub mod media;

/// Network-backed paging over the local cache.
pub mod paging;

/// Story repository façade.
pub mod repository;

/// SQLite persistence layer.
///
/// - [`StoryCache`](store::StoryCache): Cached stories and page keys
/// - [`SessionStore`](store::SessionStore): Persisted login session
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation of both
pub mod store;
