//! SQLite write-through persistence for scenes and player state.
//!
//! Each [`Scene`] is serialised to JSON and stored under its normalized room
//! key. The schema is intentionally simple:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS scenes (
//!     room_key   TEXT PRIMARY KEY,
//!     room_name  TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! CREATE TABLE IF NOT EXISTS session_state (
//!     key        TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```
//!
//! JSON inside a BLOB keeps the row layout stable while the scene record
//! grows; the JSON field names are the external contract.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{IfMemError, Result};
use crate::scene::Scene;
use crate::types::PlayerState;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS scenes (
        room_key   TEXT PRIMARY KEY,
        room_name  TEXT NOT NULL,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        checksum   TEXT
    );
    CREATE TABLE IF NOT EXISTS session_state (
        key        TEXT PRIMARY KEY,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL
    );";

const PLAYER_STATE_KEY: &str = "player_state";

// ---------------------------------------------------------------------------
// Repository seam
// ---------------------------------------------------------------------------

/// Storage backend for the scene store.
///
/// The store calls these after every mutation and logs, never propagates,
/// the errors they return.
pub trait SceneRepository: Send {
    /// Upsert one scene under its room key.
    ///
    /// # Errors
    /// Backend-specific failure.
    fn save_scene(&self, room_key: &str, scene: &Scene) -> Result<()>;

    /// Load every stored scene with its room key.
    ///
    /// # Errors
    /// Backend-specific failure.
    fn load_scenes(&self) -> Result<Vec<(String, Scene)>>;

    /// Upsert the global player state.
    ///
    /// # Errors
    /// Backend-specific failure.
    fn save_player_state(&self, state: &PlayerState) -> Result<()>;

    /// Load the global player state, if one was saved.
    ///
    /// # Errors
    /// Backend-specific failure.
    fn load_player_state(&self) -> Result<Option<PlayerState>>;

    /// Remove everything.
    ///
    /// # Errors
    /// Backend-specific failure.
    fn clear(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteSceneRepository
// ---------------------------------------------------------------------------

/// [`SceneRepository`] backed by a single SQLite file.
///
/// ```no_run
/// # use ifmem_core::persistence::{SceneRepository, SqliteSceneRepository};
/// # use ifmem_core::config::PersistenceConfig;
/// # use ifmem_core::scene::Scene;
/// let repo = SqliteSceneRepository::open("zork.db", &PersistenceConfig::default())?;
/// repo.save_scene("attic", &Scene::new("Attic", 1))?;
/// let scenes = repo.load_scenes()?;
/// # Ok::<(), ifmem_core::error::IfMemError>(())
/// ```
pub struct SqliteSceneRepository {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteSceneRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSceneRepository")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteSceneRepository {
    /// Open (or create) a database at `path`, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IfMemError::Database`] on SQLite failures, or
    /// [`IfMemError::Io`] if the parent directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Scene repository opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`IfMemError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Number of stored scenes.
    ///
    /// # Errors
    ///
    /// Returns [`IfMemError::Database`] on SQLite failures.
    pub fn scene_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scenes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn verify_checksum(&self, room_key: &str, data: &[u8], stored: Option<&str>) {
        if !self.config.checksum_enabled {
            return;
        }
        if let Some(expected) = stored {
            let actual = crc32_hex(data);
            if expected != actual {
                warn!(
                    room = %room_key,
                    expected = %expected,
                    actual = %actual,
                    "Checksum mismatch, possible save corruption"
                );
            }
        }
    }
}

impl SceneRepository for SqliteSceneRepository {
    fn save_scene(&self, room_key: &str, scene: &Scene) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(scene).map_err(|e| IfMemError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO scenes (room_key, room_name, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(room_key) DO UPDATE SET
                room_name = excluded.room_name,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![room_key, scene.room_name, json, now, checksum],
        )?;

        debug!(
            room = %room_key,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved scene"
        );
        Ok(())
    }

    fn load_scenes(&self) -> Result<Vec<(String, Scene)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT room_key, data, checksum FROM scenes ORDER BY room_key")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut scenes = Vec::new();
        for row in rows {
            let (room_key, data, checksum) = row?;
            self.verify_checksum(&room_key, &data, checksum.as_deref());
            let scene: Scene = serde_json::from_slice(&data)
                .map_err(|e| IfMemError::Serialization(e.to_string()))?;
            scenes.push((room_key, scene));
        }

        debug!(scenes = scenes.len(), "Loaded scenes");
        Ok(scenes)
    }

    fn save_player_state(&self, state: &PlayerState) -> Result<()> {
        let json =
            serde_json::to_vec(state).map_err(|e| IfMemError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO session_state (key, data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![PLAYER_STATE_KEY, json, now],
        )?;
        Ok(())
    }

    fn load_player_state(&self) -> Result<Option<PlayerState>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data FROM session_state WHERE key = ?1")?;
        let data: Option<Vec<u8>> = stmt
            .query_row(params![PLAYER_STATE_KEY], |row| row.get(0))
            .optional()?;

        data.map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|e| IfMemError::Serialization(e.to_string()))
        })
        .transpose()
    }

    fn clear(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM scenes; DELETE FROM session_state;")?;
        info!(path = %self.db_path.display(), "Scene repository cleared");
        Ok(())
    }
}

/// Extension trait that adds an `.optional()` combinator to `rusqlite::Result`.
trait OptionalExt<T> {
    /// Convert `QueryReturnedNoRows` into `Ok(None)`.
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
