//! Data store service: the single entry point callers use.
//!
//! # Responsibility
//! - Own the SQLite connection and compose repositories into use-cases.
//! - Enforce cross-entity rules: the installation/status coupling, the
//!   delete cascade and branch reference checks.
//!
//! # Invariants
//! - Every rule that spans two collections runs inside one transaction.
//! - Customer status is only written by `save_installation` (to
//!   `installed`) and `cancel_customer` (to `canceled`).
//! - `canceled` is terminal: no operation moves a customer out of it.
//! - The settings row exists for the whole lifetime of a `DataStore`.

use crate::config::CoreConfig;
use crate::db::{open_db, open_db_in_memory};
use crate::error::{ConflictError, EntityRef, StoreError, StoreResult};
use crate::model::catalog::{CustomerStatus, DueDay, Plan};
use crate::model::customer::{normalize_name, Customer, CustomerDraft, CustomerId, CustomerInput};
use crate::model::installation::{Installation, InstallationId, InstallationInput};
use crate::model::settings::Settings;
use crate::model::timestamp_now;
use crate::model::validation::{Field, ValidationError};
use crate::repo::customer_repo::{customer_exists, CustomerRepository, SqliteCustomerRepository};
use crate::repo::installation_repo::{InstallationRepository, SqliteInstallationRepository};
use crate::repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
use crate::repo::RepoError;
use crate::service::snapshot::Snapshot;
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;

/// Outcome of a bulk customer import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Ids of created customers, in input order.
    pub created: Vec<CustomerId>,
    /// Lines that were not imported, in input order.
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

/// One rejected import line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    /// Normalized name taken from the line.
    pub name: String,
    pub reason: ConflictError,
}

/// SQLite-backed local data store.
pub struct DataStore {
    pub(super) conn: Connection,
}

impl DataStore {
    /// Opens (or creates) a store file and materializes default settings.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    /// Opens an empty in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Opens the store described by `config`.
    pub fn open_with_config(config: &CoreConfig) -> StoreResult<Self> {
        match config.db_path.as_ref() {
            Some(path) => Self::open(path),
            None => Self::open_in_memory(),
        }
    }

    /// Wraps a migrated connection.
    ///
    /// Idempotent with respect to settings: an existing row is kept as is.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        SqliteSettingsRepository::new(&conn).ensure_settings()?;
        Ok(Self { conn })
    }

    /// Read-only access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns current settings, materializing defaults if the row vanished.
    pub fn settings(&self) -> StoreResult<Settings> {
        Ok(SqliteSettingsRepository::new(&self.conn).ensure_settings()?)
    }

    /// Reads every collection plus the fixed catalogs.
    pub fn load_snapshot(&self) -> StoreResult<Snapshot> {
        let settings = self.settings()?;
        let customers = SqliteCustomerRepository::new(&self.conn).list_customers()?;
        let installations = SqliteInstallationRepository::new(&self.conn).list_installations()?;
        Ok(Snapshot::new(customers, installations, settings))
    }

    pub fn get_customer(&self, id: CustomerId) -> StoreResult<Customer> {
        SqliteCustomerRepository::new(&self.conn)
            .get_customer(id)?
            .ok_or(StoreError::NotFound(EntityRef::Customer(id)))
    }

    pub fn get_installation(&self, id: InstallationId) -> StoreResult<Installation> {
        SqliteInstallationRepository::new(&self.conn)
            .get_installation(id)?
            .ok_or(StoreError::NotFound(EntityRef::Installation(id)))
    }

    /// Installations registered for one customer, oldest first.
    pub fn installations_for_customer(&self, id: CustomerId) -> StoreResult<Vec<Installation>> {
        if !customer_exists(&self.conn, id)? {
            return Err(StoreError::NotFound(EntityRef::Customer(id)));
        }
        Ok(SqliteInstallationRepository::new(&self.conn).list_for_customer(id)?)
    }

    /// Creates a customer, or edits one when `existing_id` is set.
    ///
    /// # Contract
    /// - Create: status `not-installed`, creation time stamped now.
    /// - Update: status and creation time are kept as stored.
    ///
    /// # Errors
    /// - `Validation` listing every missing field, or naming an unknown branch.
    /// - `Conflict` when another customer has the same name and branch.
    /// - `NotFound` when `existing_id` does not exist.
    pub fn save_customer(
        &self,
        input: &CustomerInput,
        existing_id: Option<CustomerId>,
    ) -> StoreResult<Customer> {
        let draft = input.validate()?;
        self.ensure_branch_configured(&draft.branch)?;

        let repo = SqliteCustomerRepository::new(&self.conn);
        if let Some(existing) = repo.find_by_name_and_branch(&draft.name, &draft.branch)? {
            if Some(existing.id) != existing_id {
                return Err(ConflictError::DuplicateCustomer {
                    name: draft.name,
                    branch: draft.branch,
                }
                .into());
            }
        }

        let (id, mode) = match existing_id {
            Some(id) => {
                repo.update_customer(id, &draft)?;
                (id, "update")
            }
            None => {
                let id =
                    repo.insert_customer(&draft, CustomerStatus::NotInstalled, timestamp_now())?;
                (id, "create")
            }
        };

        info!("event=customer_save module=store status=ok mode={mode} customer_id={id}");
        repo.get_customer(id)?
            .ok_or(StoreError::InconsistentState("saved customer not found in read-back"))
    }

    /// Creates one `not-installed` customer per non-blank line of `names_block`.
    ///
    /// Lines are attempted one by one: a name colliding with an existing
    /// `(name, branch)` pair is reported in `ImportReport::failed` and does
    /// not stop the remaining lines.
    ///
    /// # Errors
    /// - `Validation` when branch/plan/due-day are missing, the branch is not
    ///   configured, or the block holds no names at all.
    /// - `Storage` on engine failure; lines created before it stay created.
    pub fn import_customers(
        &self,
        names_block: &str,
        branch: &str,
        plan: Option<Plan>,
        due_day: Option<DueDay>,
    ) -> StoreResult<ImportReport> {
        let branch = branch.trim();
        let mut missing = Vec::new();
        if branch.is_empty() {
            missing.push(Field::Branch);
        }
        if plan.is_none() {
            missing.push(Field::Plan);
        }
        if due_day.is_none() {
            missing.push(Field::DueDay);
        }

        let names = names_block
            .lines()
            .map(normalize_name)
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        if names.is_empty() {
            missing.insert(0, Field::Name);
        }

        let (Some(plan), Some(due_day)) = (plan, due_day) else {
            return Err(ValidationError::MissingFields(missing).into());
        };
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing).into());
        }
        self.ensure_branch_configured(branch)?;

        let repo = SqliteCustomerRepository::new(&self.conn);
        let mut report = ImportReport::default();
        for name in names {
            let draft = CustomerDraft {
                name,
                branch: branch.to_string(),
                plan,
                due_day,
            };
            match repo.insert_customer(&draft, CustomerStatus::NotInstalled, timestamp_now()) {
                Ok(id) => report.created.push(id),
                Err(RepoError::Conflict(reason)) => report.failed.push(ImportFailure {
                    name: draft.name,
                    reason,
                }),
                Err(err) => return Err(err.into()),
            }
        }

        if !report.failed.is_empty() {
            warn!(
                "event=customer_import module=store status=partial created={} failed={}",
                report.created.len(),
                report.failed.len()
            );
        } else {
            info!(
                "event=customer_import module=store status=ok created={}",
                report.created.len()
            );
        }
        Ok(report)
    }

    /// Registers an installation, or edits one when `existing_id` is set.
    ///
    /// # Contract
    /// - `total` is recomputed from the raw amounts.
    /// - Create: inserts the installation and moves a `not-installed` owner
    ///   to `installed` in the same transaction.
    /// - Update: keeps the creation time and never touches customer status.
    ///
    /// # Errors
    /// - `Validation` listing every missing field.
    /// - `NotFound` for a missing customer or installation.
    /// - `Conflict` when registering a new installation for a canceled
    ///   customer.
    pub fn save_installation(
        &mut self,
        input: &InstallationInput,
        customer_id: CustomerId,
        existing_id: Option<InstallationId>,
    ) -> StoreResult<Installation> {
        let draft = input.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let customers = SqliteCustomerRepository::new(&tx);
        let installations = SqliteInstallationRepository::new(&tx);

        let customer = customers
            .get_customer(customer_id)?
            .ok_or(StoreError::NotFound(EntityRef::Customer(customer_id)))?;

        let (id, mode) = match existing_id {
            Some(id) => {
                installations.update_installation(id, customer_id, &draft)?;
                (id, "update")
            }
            None => {
                if customer.status == CustomerStatus::Canceled {
                    return Err(ConflictError::CustomerCanceled(customer_id).into());
                }
                let id = installations.insert_installation(customer_id, &draft, timestamp_now())?;
                if customer.status == CustomerStatus::NotInstalled {
                    customers.set_status(customer_id, CustomerStatus::Installed)?;
                }
                (id, "create")
            }
        };

        let saved = installations
            .get_installation(id)?
            .ok_or(StoreError::InconsistentState(
                "saved installation not found in read-back",
            ))?;
        tx.commit()?;

        info!(
            "event=installation_save module=store status=ok mode={mode} installation_id={id} customer_id={customer_id}"
        );
        Ok(saved)
    }

    /// Soft-cancels a customer. Canceling twice is a no-op.
    pub fn cancel_customer(&self, id: CustomerId) -> StoreResult<()> {
        let repo = SqliteCustomerRepository::new(&self.conn);
        let customer = repo
            .get_customer(id)?
            .ok_or(StoreError::NotFound(EntityRef::Customer(id)))?;

        if customer.status == CustomerStatus::Canceled {
            return Ok(());
        }

        repo.set_status(id, CustomerStatus::Canceled)?;
        info!("event=customer_cancel module=store status=ok customer_id={id}");
        Ok(())
    }

    /// Deletes a customer and all of its installations.
    ///
    /// Returns how many installations were removed with it.
    pub fn delete_customer(&mut self, id: CustomerId) -> StoreResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !customer_exists(&tx, id)? {
            return Err(StoreError::NotFound(EntityRef::Customer(id)));
        }

        let removed = SqliteInstallationRepository::new(&tx).delete_for_customer(id)?;
        SqliteCustomerRepository::new(&tx).delete_customer(id)?;
        tx.commit()?;

        info!(
            "event=customer_delete module=store status=ok customer_id={id} installations_removed={removed}"
        );
        Ok(removed)
    }

    /// Replaces the settings record and returns the normalized copy stored.
    pub fn save_settings(&self, settings: &Settings) -> StoreResult<Settings> {
        let normalized = settings.validate()?;
        SqliteSettingsRepository::new(&self.conn).save_settings(&normalized)?;
        info!(
            "event=settings_save module=store status=ok branches={}",
            normalized.branches.len()
        );
        Ok(normalized)
    }

    /// Appends a branch to the configured list.
    pub fn add_branch(&self, name: &str) -> StoreResult<Settings> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyBranchName.into());
        }

        let mut settings = self.settings()?;
        if settings.has_branch(name) {
            return Err(ConflictError::BranchExists(name.to_string()).into());
        }
        settings.branches.push(name.to_string());
        self.save_settings(&settings)
    }

    /// Removes a branch no customer references.
    ///
    /// # Errors
    /// - `NotFound` when the branch is not configured.
    /// - `Conflict::BranchInUse` with the number of referencing customers,
    ///   canceled ones included.
    pub fn remove_branch(&mut self, name: &str) -> StoreResult<Settings> {
        let name = name.trim();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let settings_repo = SqliteSettingsRepository::new(&tx);
        let settings = settings_repo.ensure_settings()?;
        if !settings.has_branch(name) {
            return Err(StoreError::NotFound(EntityRef::Branch(name.to_string())));
        }

        let count = SqliteCustomerRepository::new(&tx).count_by_branch(name)?;
        if count > 0 {
            return Err(ConflictError::BranchInUse {
                branch: name.to_string(),
                count,
            }
            .into());
        }

        let updated = settings.without_branch(name);
        settings_repo.save_settings(&updated)?;
        tx.commit()?;

        info!("event=branch_remove module=store status=ok migrated=0");
        Ok(updated)
    }

    /// Moves the listed customers to `new_branch`, then removes `old_branch`.
    ///
    /// All-or-nothing: if any reassignment fails, or customers outside the
    /// list still reference `old_branch`, nothing changes and `old_branch`
    /// stays configured.
    pub fn migrate_and_remove_branch(
        &mut self,
        old_branch: &str,
        new_branch: &str,
        customer_ids: &[CustomerId],
    ) -> StoreResult<Settings> {
        let old_branch = old_branch.trim();
        let new_branch = new_branch.trim();
        if customer_ids.is_empty() {
            return Err(ValidationError::MissingFields(vec![Field::CustomerIds]).into());
        }
        if old_branch == new_branch {
            return Err(ValidationError::InvalidArgument(format!(
                "cannot migrate branch `{old_branch}` into itself"
            ))
            .into());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let settings_repo = SqliteSettingsRepository::new(&tx);
        let customers = SqliteCustomerRepository::new(&tx);

        let settings = settings_repo.ensure_settings()?;
        if !settings.has_branch(old_branch) {
            return Err(StoreError::NotFound(EntityRef::Branch(old_branch.to_string())));
        }
        if !settings.has_branch(new_branch) {
            return Err(ValidationError::UnknownBranch(new_branch.to_string()).into());
        }

        for id in customer_ids {
            customers.set_branch(*id, new_branch)?;
        }

        let remaining = customers.count_by_branch(old_branch)?;
        if remaining > 0 {
            return Err(ConflictError::BranchInUse {
                branch: old_branch.to_string(),
                count: remaining,
            }
            .into());
        }

        let updated = settings.without_branch(old_branch);
        settings_repo.save_settings(&updated)?;
        tx.commit()?;

        info!(
            "event=branch_remove module=store status=ok migrated={}",
            customer_ids.len()
        );
        Ok(updated)
    }

    fn ensure_branch_configured(&self, branch: &str) -> StoreResult<()> {
        if self.settings()?.has_branch(branch) {
            Ok(())
        } else {
            Err(ValidationError::UnknownBranch(branch.to_string()).into())
        }
    }
}
