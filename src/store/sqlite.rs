use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, StoryError};
use crate::domain::{PageKey, Session, Story};
use crate::store::{PageMerge, Placement, SealedEdge, SessionStore, StoryCache};

const STORY_COLUMNS: &str = "id, name, description, photo_url, created_at, lat, lon";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![
            M::up(include_str!("../../migrations/001-initial/up.sql")),
            M::up(include_str!("../../migrations/002-cache-generation/up.sql")),
        ]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| StoryError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoryError::Other(format!("Database lock poisoned: {}", e)))
    }

    fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| s.parse::<DateTime<Utc>>())
    }

    fn story_from_row(row: &Row<'_>) -> rusqlite::Result<Story> {
        let created_at: String = row.get(4)?;
        let created_at = Self::parse_datetime(&created_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(Story {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            photo_url: row.get(3)?,
            created_at,
            lat: row.get(5)?,
            lon: row.get(6)?,
        })
    }

    fn key_from_row(row: &Row<'_>) -> rusqlite::Result<PageKey> {
        Ok(PageKey {
            story_id: row.get(0)?,
            prev_page: row.get(1)?,
            next_page: row.get(2)?,
        })
    }

    /// A `None` seq lets SQLite append the story after every other row.
    fn upsert_story(tx: &Transaction<'_>, story: &Story, seq: Option<i64>) -> Result<()> {
        // ON CONFLICT keeps the first seq, so a re-fetched story keeps its position.
        tx.execute(
            "INSERT INTO stories (seq, id, name, description, photo_url, created_at, lat, lon)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                photo_url = excluded.photo_url,
                created_at = excluded.created_at,
                lat = excluded.lat,
                lon = excluded.lon",
            params![
                seq,
                story.id,
                story.name,
                story.description,
                story.photo_url,
                story.created_at.to_rfc3339(),
                story.lat,
                story.lon
            ],
        )?;
        Ok(())
    }

    /// Seqs that place `count` stories directly before the current first row.
    fn leading_seqs(tx: &Transaction<'_>, count: usize) -> Result<Vec<Option<i64>>> {
        let first: Option<i64> = tx.query_row("SELECT MIN(seq) FROM stories", [], |row| row.get(0))?;

        let seqs = match first {
            Some(first) => {
                let start = first - count as i64;
                (0..count as i64).map(|i| Some(start + i)).collect()
            }
            None => vec![None; count],
        };
        Ok(seqs)
    }

    fn bump_generation(tx: &Transaction<'_>) -> Result<()> {
        tx.execute("UPDATE cache_generation SET value = value + 1 WHERE id = 1", [])?;
        Ok(())
    }

    fn upsert_key(tx: &Transaction<'_>, key: &PageKey) -> Result<()> {
        tx.execute(
            "INSERT INTO page_keys (story_id, prev_page, next_page) VALUES (?1, ?2, ?3)
             ON CONFLICT(story_id) DO UPDATE SET
                prev_page = excluded.prev_page,
                next_page = excluded.next_page",
            params![key.story_id, key.prev_page, key.next_page],
        )?;
        Ok(())
    }
}

impl StoryCache for SqliteStore {
    fn stories(&self, offset: usize, limit: usize) -> Result<Vec<Story>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stories ORDER BY seq LIMIT ?1 OFFSET ?2",
            STORY_COLUMNS
        ))?;

        let stories = stmt
            .query_map(params![limit as i64, offset as i64], Self::story_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stories)
    }

    fn all_stories(&self) -> Result<Vec<Story>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stories ORDER BY seq",
            STORY_COLUMNS
        ))?;

        let stories = stmt
            .query_map([], Self::story_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stories)
    }

    fn story_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn page_key(&self, story_id: &str) -> Result<Option<PageKey>> {
        let conn = self.conn()?;

        let key = conn
            .query_row(
                "SELECT story_id, prev_page, next_page FROM page_keys WHERE story_id = ?1",
                params![story_id],
                Self::key_from_row,
            )
            .optional()?;

        Ok(key)
    }

    fn all_page_keys(&self) -> Result<Vec<PageKey>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT k.story_id, k.prev_page, k.next_page
             FROM page_keys k JOIN stories s ON s.id = k.story_id
             ORDER BY s.seq",
        )?;

        let keys = stmt
            .query_map([], Self::key_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    fn merge_page(&self, merge: &PageMerge) -> Result<()> {
        let mut conn = self.conn()?;

        // Dropping the transaction without commit rolls everything back.
        let tx = conn.transaction()?;

        if merge.clear_first {
            tx.execute("DELETE FROM page_keys", [])?;
            tx.execute("DELETE FROM stories", [])?;
            Self::bump_generation(&tx)?;
        }

        let seqs = match merge.placement {
            Placement::Front => Self::leading_seqs(&tx, merge.stories.len())?,
            Placement::Back => vec![None; merge.stories.len()],
        };
        for (story, seq) in merge.stories.iter().zip(seqs) {
            Self::upsert_story(&tx, story, seq)?;
        }
        for key in &merge.keys {
            Self::upsert_key(&tx, key)?;
        }

        match &merge.sealed {
            Some(SealedEdge::Leading(story_id)) => {
                tx.execute(
                    "UPDATE page_keys SET prev_page = NULL WHERE story_id = ?1",
                    params![story_id],
                )?;
            }
            Some(SealedEdge::Trailing(story_id)) => {
                tx.execute(
                    "UPDATE page_keys SET next_page = NULL WHERE story_id = ?1",
                    params![story_id],
                )?;
            }
            None => {}
        }

        tx.commit()?;
        Ok(())
    }

    fn clear_stories(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM page_keys", [])?;
        tx.execute("DELETE FROM stories", [])?;
        Self::bump_generation(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn generation(&self) -> Result<u64> {
        let conn = self.conn()?;
        let value: i64 = conn.query_row(
            "SELECT value FROM cache_generation WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(value as u64)
    }
}

impl SessionStore for SqliteStore {
    fn load_session(&self) -> Result<Session> {
        let conn = self.conn()?;

        let session = conn
            .query_row(
                "SELECT token, is_logged_in FROM session WHERE id = 1",
                [],
                |row| {
                    Ok(Session {
                        token: row.get(0)?,
                        is_logged_in: row.get::<_, i32>(1)? != 0,
                    })
                },
            )
            .optional()?;

        Ok(session.unwrap_or_default())
    }

    fn save_session(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(StoryError::InvalidSession("token must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO session (id, token, is_logged_in) VALUES (1, ?1, 1)
             ON CONFLICT(id) DO UPDATE SET token = excluded.token, is_logged_in = 1",
            params![token],
        )?;

        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM session", [])?;
        Ok(())
    }
}
