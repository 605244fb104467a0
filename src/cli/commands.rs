use std::path::Path;

use futures::stream::{BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::app::{AppContext, Result, StoryError};
use crate::domain::{Outcome, Story};
use crate::paging::FeedCursor;

const MAX_CONSECUTIVE_FAILURES: usize = 2;

/// Drive an outcome stream to its terminal state.
async fn settle<T>(mut outcomes: BoxStream<'_, Outcome<T>>) -> Result<T> {
    while let Some(outcome) = outcomes.next().await {
        match outcome {
            Outcome::Loading => tracing::debug!("Loading..."),
            Outcome::Success(value) => return Ok(value),
            Outcome::Error(message) => return Err(StoryError::Other(message)),
        }
    }
    Err(StoryError::Other("Operation ended without a result".into()))
}

fn print_story(story: &Story) {
    println!(
        "{} {}\n  {}\n  {}",
        story.created_at.format("%Y-%m-%d"),
        story.name,
        story.display_description(),
        story.photo_url
    );
}

pub async fn register(ctx: &AppContext, name: &str, email: &str, password: &str) -> Result<()> {
    let response = settle(ctx.repository.register(name, email, password)).await?;
    println!("{}", response.message);
    Ok(())
}

pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    let result = settle(ctx.repository.login(email, password)).await?;
    match result.name {
        Some(name) => println!("Logged in as {}", name),
        None => println!("Logged in"),
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    ctx.repository.logout().await?;
    println!("Logged out");
    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    let session = ctx.repository.session()?;
    if session.is_logged_in {
        println!("Logged in");
    } else {
        println!("Not logged in");
    }
    println!("Server: {}", ctx.config.api.base_url);
    Ok(())
}

pub async fn list_stories(ctx: &AppContext, max_pages: Option<usize>) -> Result<()> {
    let mut cursor = settle(ctx.repository.list_stories()).await?;

    let mut shown = 0;
    let mut pages = 0;
    let mut failures = 0;
    while max_pages.is_none_or(|max| pages < max) {
        match cursor.next_page().await {
            Some(Ok(stories)) => {
                failures = 0;
                pages += 1;
                for story in &stories {
                    print_story(story);
                }
                shown += stories.len();
            }
            Some(Err(e)) => {
                eprintln!("  ! {}", e.user_message());
                // One retry; a failed refresh or a restarted cursor is followed by cached stories.
                failures += 1;
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    break;
                }
            }
            None => break,
        }
    }

    if cursor.is_end_reached() {
        println!("\n{} stories (end of feed)", shown);
    } else {
        println!("\n{} stories", shown);
    }
    Ok(())
}

/// Page through the feed interactively: `n` (or Enter) for the next page,
/// `p` for the previous one, `r` to refresh around the current page, `q` to quit.
pub async fn browse(ctx: &AppContext) -> Result<()> {
    let cursor = settle(ctx.repository.list_stories()).await?;
    println!("[n]ext  [p]revious  [r]efresh  [q]uit");
    let shown = browse_feed(cursor, BufReader::new(tokio::io::stdin())).await?;
    tracing::debug!("Browsed {} pages", shown);
    Ok(())
}

async fn browse_feed<R>(mut cursor: FeedCursor, input: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut shown = 0;

    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        let page = match command {
            "" | "n" => cursor.next_page().await,
            "p" => cursor.previous_page().await,
            "r" => {
                cursor.refresh();
                cursor.next_page().await
            }
            "q" => break,
            other => {
                eprintln!("Unknown command: {}", other);
                continue;
            }
        };

        match page {
            Some(Ok(stories)) => {
                shown += 1;
                for story in &stories {
                    print_story(story);
                }
            }
            Some(Err(e)) => eprintln!("  ! {}", e.user_message()),
            None if command == "p" => println!("(start of feed)"),
            None => println!("(end of feed)"),
        }
    }

    Ok(shown)
}

pub async fn list_map(ctx: &AppContext) -> Result<()> {
    let stories = settle(ctx.repository.list_stories_with_location()).await?;

    if stories.is_empty() {
        println!("No stories with a location");
        return Ok(());
    }

    for story in &stories {
        if let (Some(lat), Some(lon)) = (story.lat, story.lon) {
            println!("{:>10.5} {:>11.5}  {} - {}", lat, lon, story.name, story.display_description());
        }
    }
    Ok(())
}

pub async fn upload(
    ctx: &AppContext,
    path: &Path,
    description: &str,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<()> {
    let file = path.exists().then_some(path);
    let response = settle(ctx.repository.upload_story(file, description, lat, lon)).await?;
    println!("{}", response.message);
    Ok(())
}
