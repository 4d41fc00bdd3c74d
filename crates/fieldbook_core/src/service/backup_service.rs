//! Backup bundle export and full-state restore.
//!
//! # Responsibility
//! - Serialize every collection into a versioned JSON bundle.
//! - Validate an incoming bundle completely before touching stored data.
//! - Replace stored state with a bundle in one transaction.
//!
//! # Invariants
//! - A rejected bundle leaves the store unchanged.
//! - Restored records keep their ids; installation totals are recomputed.

use crate::error::{StoreError, StoreResult};
use crate::model::customer::Customer;
use crate::model::installation::Installation;
use crate::model::settings::Settings;
use crate::model::timestamp_now;
use crate::repo::customer_repo::{CustomerRepository, SqliteCustomerRepository};
use crate::repo::installation_repo::{InstallationRepository, SqliteInstallationRepository};
use crate::repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
use crate::service::store::DataStore;
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Format tag written into and required from every bundle.
pub const BACKUP_FORMAT_VERSION: &str = "fieldbook_v1";

const REQUIRED_FIELDS: [&str; 3] = ["clients", "installations", "settings"];

/// Serialized form of the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBundle {
    pub clients: Vec<Customer>,
    pub installations: Vec<Installation>,
    pub settings: Settings,
    #[serde(default)]
    pub backup_date: Option<DateTime<Utc>>,
    pub version: String,
}

/// Record counts written by a successful restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub customers: usize,
    pub installations: usize,
}

impl BackupBundle {
    /// Parses and checks a bundle without any store access.
    ///
    /// Checks run in this order: required top-level fields, version tag,
    /// typed record decoding, cross-record consistency.
    ///
    /// # Errors
    /// - `MalformedBackup` for invalid JSON, a missing field, an undecodable
    ///   record or inconsistent records.
    /// - `IncompatibleVersion` when the tag is absent or different.
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| StoreError::MalformedBackup(format!("invalid JSON: {err}")))?;
        let Some(object) = value.as_object() else {
            return Err(StoreError::MalformedBackup(
                "top-level value must be an object".to_string(),
            ));
        };

        let missing = REQUIRED_FIELDS
            .iter()
            .filter(|field| !object.contains_key(**field))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(StoreError::MalformedBackup(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }

        match object.get("version") {
            Some(Value::String(tag)) if tag == BACKUP_FORMAT_VERSION => {}
            Some(Value::String(tag)) => return Err(incompatible(Some(tag.clone()))),
            Some(other) => return Err(incompatible(Some(other.to_string()))),
            None => return Err(incompatible(None)),
        }

        let bundle: BackupBundle = serde_json::from_value(value)
            .map_err(|err| StoreError::MalformedBackup(format!("invalid record: {err}")))?;
        bundle.check_consistency()?;
        Ok(bundle)
    }

    pub fn to_json_pretty(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| StoreError::MalformedBackup(format!("bundle cannot be encoded: {err}")))
    }

    /// Rejects bundles that could not be stored as-is.
    fn check_consistency(&self) -> StoreResult<Settings> {
        if self.version != BACKUP_FORMAT_VERSION {
            return Err(incompatible(Some(self.version.clone())));
        }

        let mut customer_ids = HashSet::new();
        let mut pairs = HashSet::new();
        for customer in &self.clients {
            if customer.name.trim().is_empty() || customer.branch.trim().is_empty() {
                return Err(malformed(format!(
                    "customer {} has an empty name or branch",
                    customer.id
                )));
            }
            if !customer_ids.insert(customer.id) {
                return Err(malformed(format!("duplicate customer id {}", customer.id)));
            }
            if !pairs.insert((customer.name.as_str(), customer.branch.as_str())) {
                return Err(malformed(format!(
                    "customer {} repeats an existing name within its branch",
                    customer.id
                )));
            }
        }

        let mut installation_ids = HashSet::new();
        for installation in &self.installations {
            if !installation_ids.insert(installation.id) {
                return Err(malformed(format!(
                    "duplicate installation id {}",
                    installation.id
                )));
            }
            if !customer_ids.contains(&installation.customer_id) {
                return Err(malformed(format!(
                    "installation {} references missing customer {}",
                    installation.id, installation.customer_id
                )));
            }
        }

        self.settings
            .validate()
            .map_err(|err| malformed(format!("invalid settings: {err}")))
    }
}

impl DataStore {
    /// Builds a bundle of the current state stamped with the current time.
    pub fn export_snapshot(&self) -> StoreResult<BackupBundle> {
        let snapshot = self.load_snapshot()?;
        Ok(BackupBundle {
            clients: snapshot.customers,
            installations: snapshot.installations,
            settings: snapshot.settings,
            backup_date: Some(timestamp_now()),
            version: BACKUP_FORMAT_VERSION.to_string(),
        })
    }

    /// Replaces all stored state with `bundle`.
    ///
    /// The bundle is fully checked first; the replace itself is one
    /// transaction, so a failure midway leaves the previous state intact.
    pub fn import_snapshot(&mut self, bundle: &BackupBundle) -> StoreResult<RestoreSummary> {
        let started_at = Instant::now();
        let settings = bundle.check_consistency()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let customers = SqliteCustomerRepository::new(&tx);
        let installations = SqliteInstallationRepository::new(&tx);

        installations.delete_all_installations()?;
        customers.delete_all_customers()?;

        for customer in &bundle.clients {
            customers.insert_customer_with_id(customer)?;
        }
        for installation in &bundle.installations {
            let mut installation = installation.clone();
            installation.recompute_total();
            installations.insert_installation_with_id(&installation)?;
        }
        SqliteSettingsRepository::new(&tx).save_settings(&settings)?;
        tx.commit()?;

        let summary = RestoreSummary {
            customers: bundle.clients.len(),
            installations: bundle.installations.len(),
        };
        info!(
            "event=backup_restore module=backup status=ok customers={} installations={} duration_ms={}",
            summary.customers,
            summary.installations,
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }

    /// Stamps the last-backup time in settings.
    pub fn record_backup(&self, at: DateTime<Utc>) -> StoreResult<Settings> {
        let mut settings = self.settings()?;
        settings.last_backup_timestamp = Some(at);
        self.save_settings(&settings)
    }

    /// Writes a pretty JSON bundle to `destination` and records the backup.
    ///
    /// The file is written next to the destination first and renamed into
    /// place, so an interrupted write never leaves a truncated backup.
    pub fn backup_to_file(&self, destination: impl AsRef<Path>) -> StoreResult<BackupBundle> {
        let started_at = Instant::now();
        let destination = destination.as_ref();
        let bundle = self.export_snapshot()?;
        let json = bundle.to_json_pretty()?;

        if let Err(err) = write_atomically(destination, json.as_bytes()) {
            error!("event=backup_export module=backup status=error kind=io");
            return Err(err);
        }

        let stamped_at = bundle.backup_date.unwrap_or_else(timestamp_now);
        self.record_backup(stamped_at)?;
        info!(
            "event=backup_export module=backup status=ok customers={} installations={} duration_ms={}",
            bundle.clients.len(),
            bundle.installations.len(),
            started_at.elapsed().as_millis()
        );
        Ok(bundle)
    }

    /// Reads a bundle from `source` and restores it.
    pub fn restore_from_file(&mut self, source: impl AsRef<Path>) -> StoreResult<RestoreSummary> {
        let source = source.as_ref();
        let raw = std::fs::read_to_string(source).map_err(|err| io_error(source, err))?;
        let bundle = match BackupBundle::from_json(&raw) {
            Ok(bundle) => bundle,
            Err(err) => {
                error!("event=backup_restore module=backup status=error kind=rejected");
                return Err(err);
            }
        };
        self.import_snapshot(&bundle)
    }
}

fn write_atomically(destination: &Path, contents: &[u8]) -> StoreResult<()> {
    let parent = destination.parent().unwrap_or_else(|| Path::new(""));
    std::fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".fieldbook-backup-{nanos}.tmp"));
    std::fs::write(&temp_path, contents).map_err(|err| io_error(&temp_path, err))?;

    if std::fs::rename(&temp_path, destination).is_err() {
        let _ = std::fs::remove_file(destination);
        std::fs::rename(&temp_path, destination).map_err(|err| {
            let _ = std::fs::remove_file(&temp_path);
            io_error(destination, err)
        })?;
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn incompatible(found: Option<String>) -> StoreError {
    StoreError::IncompatibleVersion {
        found,
        expected: BACKUP_FORMAT_VERSION,
    }
}

fn malformed(message: String) -> StoreError {
    StoreError::MalformedBackup(message)
}
