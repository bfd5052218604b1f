use super::podcast_models::Podcast;
use super::podcast_store::PodcastStore;
use crate::sqlite_column;
use crate::sqlite_persistence::{open_versioned_db, SqlType, Table, VersionedSchema};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

/// V 0
const PODCAST_TABLE_V_0: Table = Table {
    name: "podcast",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("media", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("original_filename", &SqlType::Text, non_null = true),
        sqlite_column!("content_type", &SqlType::Text, non_null = true),
        sqlite_column!("size", &SqlType::Integer, non_null = true),
        // Users live in another database, so no foreign key here.
        sqlite_column!("creator_id", &SqlType::Integer),
        // Unix millis.
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["media"]],
    indices: &[("idx_podcast_created", "created")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[PODCAST_TABLE_V_0],
    migration: None,
}];

const PODCAST_COLUMNS: &str =
    "id, title, description, media, original_filename, content_type, size, creator_id, created";

fn podcast_from_row(row: &Row) -> rusqlite::Result<Podcast> {
    let created_millis: i64 = row.get(8)?;
    Ok(Podcast {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        media: row.get(3)?,
        original_filename: row.get(4)?,
        content_type: row.get(5)?,
        size: row.get::<_, i64>(6)?.max(0) as u64,
        creator_id: row.get::<_, Option<i64>>(7)?.map(|id| id as usize),
        created: DateTime::<Utc>::from_timestamp_millis(created_millis).unwrap_or_default(),
    })
}

#[derive(Clone)]
pub struct SqlitePodcastStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePodcastStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), VERSIONED_SCHEMAS)?;
        Ok(SqlitePodcastStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Podcast store connection lock poisoned"))
    }
}

impl PodcastStore for SqlitePodcastStore {
    fn insert_podcast(&self, podcast: &Podcast) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO podcast ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                PODCAST_COLUMNS
            ),
            params![
                podcast.id,
                podcast.title,
                podcast.description,
                podcast.media,
                podcast.original_filename,
                podcast.content_type,
                podcast.size as i64,
                podcast.creator_id.map(|id| id as i64),
                podcast.created.timestamp_millis(),
            ],
        )
        .with_context(|| format!("Failed to insert podcast {}", podcast.id))?;
        Ok(())
    }

    fn get_podcast(&self, podcast_id: &str) -> Result<Option<Podcast>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM podcast WHERE id = ?1", PODCAST_COLUMNS),
                params![podcast_id],
                podcast_from_row,
            )
            .optional()?)
    }

    fn list_podcasts(&self) -> Result<Vec<Podcast>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM podcast ORDER BY created DESC, rowid DESC",
            PODCAST_COLUMNS
        ))?;
        let podcasts = stmt
            .query_map([], podcast_from_row)?
            .collect::<rusqlite::Result<Vec<Podcast>>>()?;
        Ok(podcasts)
    }

    fn delete_podcast(&self, podcast_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM podcast WHERE id = ?1", params![podcast_id])?;
        Ok(deleted > 0)
    }
}
