//! Settings singleton persistence.
//!
//! # Invariants
//! - Exactly one row exists under `SETTINGS_KEY` once `ensure_settings` ran.
//! - The row value is the JSON form of `Settings`.

use crate::model::settings::{Settings, SETTINGS_KEY};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for the settings singleton.
pub trait SettingsRepository {
    fn load_settings(&self) -> RepoResult<Option<Settings>>;
    /// Full replace of the stored settings.
    fn save_settings(&self, settings: &Settings) -> RepoResult<()>;
    /// Loads settings, writing defaults first when none exist.
    fn ensure_settings(&self) -> RepoResult<Settings>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load_settings(&self) -> RepoResult<Option<Settings>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1;",
                [SETTINGS_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match value {
            Some(json) => serde_json::from_str(&json).map(Some).map_err(|err| {
                RepoError::InvalidData(format!("invalid settings value in settings.value: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn save_settings(&self, settings: &Settings) -> RepoResult<()> {
        let json = encode_settings(settings)?;
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![SETTINGS_KEY, json],
        )?;
        Ok(())
    }

    fn ensure_settings(&self) -> RepoResult<Settings> {
        let json = encode_settings(&Settings::default())?;
        self.conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2);",
            params![SETTINGS_KEY, json],
        )?;

        self.load_settings()?.ok_or_else(|| {
            RepoError::InvalidData("settings row missing after initialization".to_string())
        })
    }
}

fn encode_settings(settings: &Settings) -> RepoResult<String> {
    serde_json::to_string(settings)
        .map_err(|err| RepoError::InvalidData(format!("settings cannot be encoded: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{SettingsRepository, SqliteSettingsRepository};
    use crate::db::open_db_in_memory;
    use crate::model::settings::Settings;

    #[test]
    fn ensure_settings_is_idempotent() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteSettingsRepository::new(&conn);

        let first = repo.ensure_settings().unwrap();
        let custom = Settings {
            branches: vec!["Only".to_string()],
            last_backup_timestamp: None,
        };
        repo.save_settings(&custom).unwrap();
        let second = repo.ensure_settings().unwrap();

        assert_eq!(first, Settings::default());
        assert_eq!(second, custom);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
