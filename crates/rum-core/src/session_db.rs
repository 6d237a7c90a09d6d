//! Persistent upload-session store (SQLite via sqlx).
//!
//! One row per logical upload: file descriptor and fingerprint, the remote
//! session URL once the server acknowledges it, the confirmed byte offset,
//! state, and the episode metadata needed to materialize the entity.
//! Sessions survive process restarts; interrupted transfers are rehydrated
//! as `paused`, never `uploading`.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::metadata::EpisodeMetadata;

/// Session identifier (local; forks on reconciliation, see `supersede_session`).
pub type SessionId = i64;

/// High-level session state stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Queued,
    Uploading,
    Paused,
    Completed,
    Error,
}

impl SessionState {
    fn as_str(self) -> &'static str {
        match self {
            SessionState::Queued => "queued",
            SessionState::Uploading => "uploading",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Error => "error",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "queued" => SessionState::Queued,
            "uploading" => SessionState::Uploading,
            "paused" => SessionState::Paused,
            "completed" => SessionState::Completed,
            "error" => SessionState::Error,
            _ => SessionState::Error,
        }
    }
}

/// Fields for inserting a fresh session.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub endpoint: &'a str,
    pub file_path: &'a str,
    pub file_name: &'a str,
    pub file_size: i64,
    pub fingerprint: &'a str,
    pub metadata: &'a EpisodeMetadata,
}

/// Full session row.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub endpoint: String,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub fingerprint: String,
    pub remote_url: Option<String>,
    pub confirmed_offset: i64,
    pub state: SessionState,
    pub error_message: Option<String>,
    pub result_id: Option<String>,
    pub processing_error: Option<String>,
    pub metadata: EpisodeMetadata,
    pub created_at: i64,
    pub updated_at: i64,
    pub started_at: Option<i64>,
}

impl SessionRecord {
    /// Percent of bytes the server has confirmed, in [0.0, 100.0].
    pub fn percent(&self) -> f64 {
        if self.file_size <= 0 {
            return 100.0;
        }
        ((self.confirmed_offset as f64 / self.file_size as f64) * 100.0).min(100.0)
    }

    /// True when the session can continue from its confirmed offset. A
    /// session without a remote URL must restart from zero instead; this
    /// includes terminal failures that never opened a session (e.g. auth).
    pub fn is_resumable(&self) -> bool {
        !matches!(
            self.state,
            SessionState::Completed | SessionState::Uploading
        ) && self.remote_url.is_some()
    }
}

/// Summary view used by the CLI `status` command.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: SessionId,
    pub state: SessionState,
    pub file_name: String,
    pub file_size: i64,
    pub confirmed_offset: i64,
    pub error_message: Option<String>,
    pub result_id: Option<String>,
    pub processing_error: Option<String>,
}

/// Handle to the SQLite-backed session database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/rum/sessions.db`.
#[derive(Clone)]
pub struct SessionDb {
    pool: Pool<Sqlite>,
}

impl SessionDb {
    /// Open (or create) the default session database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("rum")?;
        let state_dir = xdg_dirs.get_state_home();
        tokio::fs::create_dir_all(&state_dir).await?;
        Self::open_at(&state_dir.join("sessions.db")).await
    }

    /// Open (or create) a session database at an explicit path.
    pub async fn open_at(path: &Path) -> Result<Self> {
        let uri = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;

        let db = SessionDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                endpoint TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                fingerprint TEXT NOT NULL,
                remote_url TEXT,
                confirmed_offset INTEGER NOT NULL DEFAULT 0,
                state TEXT NOT NULL,
                error_message TEXT,
                result_id TEXT,
                processing_error TEXT,
                metadata_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                started_at INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new queued session.
    pub async fn add_session(&self, new: &NewSession<'_>) -> Result<SessionId> {
        let now = unix_timestamp();
        let metadata_json = serde_json::to_string(new.metadata)?;

        let row_id = sqlx::query(
            r#"
            INSERT INTO sessions (
                endpoint, file_path, file_name, file_size, fingerprint,
                remote_url, confirmed_offset, state,
                metadata_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(new.endpoint)
        .bind(new.file_path)
        .bind(new.file_name)
        .bind(new.file_size)
        .bind(new.fingerprint)
        .bind(SessionState::Queued.as_str())
        .bind(metadata_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Fetch one session by id.
    pub async fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, endpoint, file_path, file_name, file_size, fingerprint,
                   remote_url, confirmed_offset, state, error_message,
                   result_id, processing_error, metadata_json,
                   created_at, updated_at, started_at
            FROM sessions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(record_from_row(&row)?))
    }

    /// List all sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, state, file_name, file_size, confirmed_offset,
                   error_message, result_id, processing_error
            FROM sessions
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let state_str: String = row.get("state");
            out.push(SessionSummary {
                id: row.get("id"),
                state: SessionState::from_str(&state_str),
                file_name: row.get("file_name"),
                file_size: row.get("file_size"),
                confirmed_offset: row.get("confirmed_offset"),
                error_message: row.get("error_message"),
                result_id: row.get("result_id"),
                processing_error: row.get("processing_error"),
            });
        }

        Ok(out)
    }

    /// Update the state of a session, clearing any stale error message.
    pub async fn set_state(&self, id: SessionId, state: SessionState) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET state = ?1, error_message = NULL, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(state.as_str())
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Move a session to `paused` or `error` with a human-readable reason.
    pub async fn set_error_state(
        &self,
        id: SessionId,
        state: SessionState,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET state = ?1, error_message = ?2, updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(state.as_str())
        .bind(message)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the server-acknowledged session URL.
    pub async fn set_remote_url(&self, id: SessionId, remote_url: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET remote_url = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(remote_url)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Point the session at a (re)supplied source file.
    pub async fn set_file_path(&self, id: SessionId, file_path: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET file_path = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(file_path)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset the transfer start time (rate/ETA are measured from here).
    pub async fn set_started_at(&self, id: SessionId, started_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET started_at = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(started_at)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a newly confirmed offset. Regressions are ignored so the
    /// stored offset never decreases for the lifetime of a row.
    pub async fn advance_offset(&self, id: SessionId, offset: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET confirmed_offset = ?1, updated_at = ?2
            WHERE id = ?3 AND confirmed_offset < ?1
            "#,
        )
        .bind(offset)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark all bytes transferred: state `completed`, offset forced to the
    /// file size. The result id may still arrive later via the event channel.
    pub async fn mark_completed(&self, id: SessionId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET state = ?1, confirmed_offset = file_size,
                error_message = NULL, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(SessionState::Completed.as_str())
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the playable entity id reported after post-processing.
    pub async fn set_result(&self, id: SessionId, result_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET result_id = ?1, processing_error = NULL, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(result_id)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a post-processing failure (the byte transfer may already be complete).
    pub async fn set_processing_error(&self, id: SessionId, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET processing_error = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(message)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Permanently remove a session row.
    pub async fn remove_session(&self, id: SessionId) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove all completed sessions; returns how many were cleared.
    pub async fn clear_completed(&self) -> Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE state = ?1")
            .bind(SessionState::Completed.as_str())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// Flip sessions a crashed run left in `uploading` back to `paused`.
    /// Called by the runner on startup; after this, a freshly opened store
    /// never reports an `uploading` session.
    pub async fn rehydrate_interrupted(&self) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE sessions
            SET state = ?1, error_message = ?2, updated_at = ?3
            WHERE state = ?4
            "#,
        )
        .bind(SessionState::Paused.as_str())
        .bind("interrupted by shutdown")
        .bind(unix_timestamp())
        .bind(SessionState::Uploading.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Atomically claim the oldest queued session (marking it `uploading`)
    /// so parallel workers never double-claim. Returns None when the queue
    /// is empty.
    pub async fn claim_next_queued(&self) -> Result<Option<SessionId>> {
        loop {
            let row = sqlx::query(
                r#"
                SELECT id FROM sessions
                WHERE state = ?1
                ORDER BY id ASC
                LIMIT 1
                "#,
            )
            .bind(SessionState::Queued.as_str())
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };
            let id: i64 = row.get("id");

            let res = sqlx::query(
                r#"
                UPDATE sessions
                SET state = ?1, updated_at = ?2
                WHERE id = ?3 AND state = ?4
                "#,
            )
            .bind(SessionState::Uploading.as_str())
            .bind(unix_timestamp())
            .bind(id)
            .bind(SessionState::Queued.as_str())
            .execute(&self.pool)
            .await?;

            if res.rows_affected() == 1 {
                return Ok(Some(id));
            }
            // Lost the race to another worker; try the next queued row.
        }
    }

    /// Reconciliation fork: the remote session the server actually honors is
    /// not the one we stored. In one transaction, insert a replacement row
    /// carrying the old row's descriptor and metadata but bound to the new
    /// remote URL and offset, and delete the old row. At no point do two
    /// active rows track the same logical upload.
    pub async fn supersede_session(
        &self,
        old_id: SessionId,
        new_remote_url: &str,
        confirmed_offset: i64,
    ) -> Result<SessionId> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT endpoint, file_path, file_name, file_size, fingerprint,
                   state, metadata_json, created_at
            FROM sessions
            WHERE id = ?1
            "#,
        )
        .bind(old_id)
        .fetch_one(&mut *tx)
        .await?;

        let endpoint: String = row.get("endpoint");
        let file_path: String = row.get("file_path");
        let file_name: String = row.get("file_name");
        let file_size: i64 = row.get("file_size");
        let fingerprint: String = row.get("fingerprint");
        let state: String = row.get("state");
        let metadata_json: String = row.get("metadata_json");
        let created_at: i64 = row.get("created_at");

        let now = unix_timestamp();
        let new_id = sqlx::query(
            r#"
            INSERT INTO sessions (
                endpoint, file_path, file_name, file_size, fingerprint,
                remote_url, confirmed_offset, state,
                metadata_json, created_at, updated_at, started_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&endpoint)
        .bind(&file_path)
        .bind(&file_name)
        .bind(file_size)
        .bind(&fingerprint)
        .bind(new_remote_url)
        .bind(confirmed_offset)
        .bind(&state)
        .bind(&metadata_json)
        .bind(created_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(old_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(new_id)
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord> {
    let state_str: String = row.get("state");
    let metadata_json: String = row.get("metadata_json");
    let metadata: EpisodeMetadata = serde_json::from_str(&metadata_json)?;
    Ok(SessionRecord {
        id: row.get("id"),
        endpoint: row.get("endpoint"),
        file_path: row.get("file_path"),
        file_name: row.get("file_name"),
        file_size: row.get("file_size"),
        fingerprint: row.get("fingerprint"),
        remote_url: row.get("remote_url"),
        confirmed_offset: row.get("confirmed_offset"),
        state: SessionState::from_str(&state_str),
        error_message: row.get("error_message"),
        result_id: row.get("result_id"),
        processing_error: row.get("processing_error"),
        metadata,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        started_at: row.get("started_at"),
    })
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Open an in-memory database for tests (no disk I/O).
    async fn open_memory() -> Result<SessionDb> {
        // Single connection to avoid the in-memory pool handing back a different empty DB.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = SessionDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    fn new_session<'a>(meta: &'a EpisodeMetadata) -> NewSession<'a> {
        NewSession {
            endpoint: "https://ingest.example.com/videos",
            file_path: "/media/s01e01.mp4",
            file_name: "s01e01.mp4",
            file_size: 5 * 1024 * 1024,
            fingerprint: "5242880-abc",
            metadata: meta,
        }
    }

    #[tokio::test]
    async fn session_lifecycle_via_db() {
        let db = open_memory().await.unwrap();
        let meta = EpisodeMetadata {
            collection_id: "c1".to_string(),
            sequence: 1,
            title: "Pilot".to_string(),
            description: None,
        };
        let id = db.add_session(&new_session(&meta)).await.unwrap();

        let rec = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(rec.state, SessionState::Queued);
        assert_eq!(rec.confirmed_offset, 0);
        assert!(rec.remote_url.is_none());
        assert_eq!(rec.metadata, meta);

        db.set_remote_url(id, "https://ingest.example.com/files/1")
            .await
            .unwrap();
        db.set_state(id, SessionState::Uploading).await.unwrap();
        db.advance_offset(id, 1024).await.unwrap();

        let rec = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(rec.state, SessionState::Uploading);
        assert_eq!(rec.confirmed_offset, 1024);

        db.mark_completed(id).await.unwrap();
        let rec = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(rec.state, SessionState::Completed);
        assert_eq!(rec.confirmed_offset, rec.file_size);
        assert_eq!(rec.percent(), 100.0);
    }

    #[tokio::test]
    async fn offset_never_regresses() {
        let db = open_memory().await.unwrap();
        let meta = EpisodeMetadata::default();
        let id = db.add_session(&new_session(&meta)).await.unwrap();

        db.advance_offset(id, 2048).await.unwrap();
        db.advance_offset(id, 1024).await.unwrap();
        let rec = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(rec.confirmed_offset, 2048);

        db.advance_offset(id, 4096).await.unwrap();
        let rec = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(rec.confirmed_offset, 4096);
    }

    #[tokio::test]
    async fn rehydrate_never_yields_uploading() {
        let db = open_memory().await.unwrap();
        let meta = EpisodeMetadata::default();
        let a = db.add_session(&new_session(&meta)).await.unwrap();
        let b = db.add_session(&new_session(&meta)).await.unwrap();
        db.set_state(a, SessionState::Uploading).await.unwrap();
        db.mark_completed(b).await.unwrap();

        let flipped = db.rehydrate_interrupted().await.unwrap();
        assert_eq!(flipped, 1);

        let sessions = db.list_sessions().await.unwrap();
        assert!(sessions
            .iter()
            .all(|s| s.state != SessionState::Uploading));
        let rec = db.get_session(a).await.unwrap().unwrap();
        assert_eq!(rec.state, SessionState::Paused);
        assert_eq!(rec.error_message.as_deref(), Some("interrupted by shutdown"));
        let rec = db.get_session(b).await.unwrap().unwrap();
        assert_eq!(rec.state, SessionState::Completed);
    }

    #[tokio::test]
    async fn claim_next_is_fifo_and_exclusive() {
        let db = open_memory().await.unwrap();
        let meta = EpisodeMetadata::default();
        let a = db.add_session(&new_session(&meta)).await.unwrap();
        let b = db.add_session(&new_session(&meta)).await.unwrap();

        assert_eq!(db.claim_next_queued().await.unwrap(), Some(a));
        let rec = db.get_session(a).await.unwrap().unwrap();
        assert_eq!(rec.state, SessionState::Uploading);

        assert_eq!(db.claim_next_queued().await.unwrap(), Some(b));
        assert_eq!(db.claim_next_queued().await.unwrap(), None);
    }

    #[tokio::test]
    async fn supersede_leaves_exactly_one_row() {
        let db = open_memory().await.unwrap();
        let meta = EpisodeMetadata {
            collection_id: "c9".to_string(),
            sequence: 4,
            title: "Heist".to_string(),
            description: Some("two-parter".to_string()),
        };
        let old = db.add_session(&new_session(&meta)).await.unwrap();
        db.set_remote_url(old, "https://ingest.example.com/files/old")
            .await
            .unwrap();
        db.advance_offset(old, 2 * 1024 * 1024).await.unwrap();

        let new = db
            .supersede_session(old, "https://ingest.example.com/files/new", 0)
            .await
            .unwrap();
        assert_ne!(new, old);

        let sessions = db.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, new);

        assert!(db.get_session(old).await.unwrap().is_none());
        let rec = db.get_session(new).await.unwrap().unwrap();
        assert_eq!(
            rec.remote_url.as_deref(),
            Some("https://ingest.example.com/files/new")
        );
        // The new remote session starts over; the display metadata carries.
        assert_eq!(rec.confirmed_offset, 0);
        assert_eq!(rec.metadata, meta);
        assert_eq!(rec.file_name, "s01e01.mp4");
    }

    #[tokio::test]
    async fn clear_completed_only_removes_completed() {
        let db = open_memory().await.unwrap();
        let meta = EpisodeMetadata::default();
        let a = db.add_session(&new_session(&meta)).await.unwrap();
        let b = db.add_session(&new_session(&meta)).await.unwrap();
        let c = db.add_session(&new_session(&meta)).await.unwrap();
        db.mark_completed(a).await.unwrap();
        db.mark_completed(c).await.unwrap();
        db.set_error_state(b, SessionState::Paused, "network unreachable")
            .await
            .unwrap();

        assert_eq!(db.clear_completed().await.unwrap(), 2);
        let sessions = db.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, b);
        assert_eq!(
            sessions[0].error_message.as_deref(),
            Some("network unreachable")
        );
    }

    #[tokio::test]
    async fn post_processing_outcomes() {
        let db = open_memory().await.unwrap();
        let meta = EpisodeMetadata::default();
        let id = db.add_session(&new_session(&meta)).await.unwrap();
        db.mark_completed(id).await.unwrap();

        db.set_processing_error(id, "transcode failed").await.unwrap();
        let rec = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(rec.state, SessionState::Completed);
        assert_eq!(rec.processing_error.as_deref(), Some("transcode failed"));
        assert!(rec.result_id.is_none());

        // A later successful report replaces the failure.
        db.set_result(id, "episode-77").await.unwrap();
        let rec = db.get_session(id).await.unwrap().unwrap();
        assert_eq!(rec.result_id.as_deref(), Some("episode-77"));
        assert!(rec.processing_error.is_none());
    }
}
