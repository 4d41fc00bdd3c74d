//! Installation repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `total` is written from the draft/record, which derives it from the
//!   two payment slots; callers never pass a free-standing total.
//! - `customer_id` is not a SQLite foreign key; the store checks it.

use crate::error::EntityRef;
use crate::model::catalog::PaymentMethod;
use crate::model::customer::CustomerId;
use crate::model::installation::{Installation, InstallationDraft, InstallationId, Payment};
use crate::repo::{parse_tag, parse_timestamp, timestamp_to_db, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

const INSTALLATION_SELECT_SQL: &str = "SELECT
    id,
    customer_id,
    branch,
    plan,
    due_day,
    method1,
    amount1,
    method2,
    amount2,
    total,
    created_at
FROM installations";

/// Repository interface for installation persistence.
pub trait InstallationRepository {
    fn insert_installation(
        &self,
        customer_id: CustomerId,
        draft: &InstallationDraft,
        created_at: DateTime<Utc>,
    ) -> RepoResult<InstallationId>;
    /// Inserts a full record keeping its id, used by restore.
    fn insert_installation_with_id(&self, installation: &Installation) -> RepoResult<()>;
    /// Replaces every field except `id` and `created_at`.
    fn update_installation(
        &self,
        id: InstallationId,
        customer_id: CustomerId,
        draft: &InstallationDraft,
    ) -> RepoResult<()>;
    fn get_installation(&self, id: InstallationId) -> RepoResult<Option<Installation>>;
    /// Lists every installation in id order.
    fn list_installations(&self) -> RepoResult<Vec<Installation>>;
    fn list_for_customer(&self, customer_id: CustomerId) -> RepoResult<Vec<Installation>>;
    /// Deletes the customer's installations and returns how many went away.
    fn delete_for_customer(&self, customer_id: CustomerId) -> RepoResult<usize>;
    fn delete_all_installations(&self) -> RepoResult<usize>;
}

/// SQLite-backed installation repository.
pub struct SqliteInstallationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInstallationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl InstallationRepository for SqliteInstallationRepository<'_> {
    fn insert_installation(
        &self,
        customer_id: CustomerId,
        draft: &InstallationDraft,
        created_at: DateTime<Utc>,
    ) -> RepoResult<InstallationId> {
        self.conn.execute(
            "INSERT INTO installations (
                customer_id,
                branch,
                plan,
                due_day,
                method1,
                amount1,
                method2,
                amount2,
                total,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                customer_id,
                draft.branch.as_str(),
                draft.plan.as_str(),
                draft.due_day.as_str(),
                draft.payment1.method.map(PaymentMethod::as_str),
                draft.payment1.amount,
                draft.payment2.method.map(PaymentMethod::as_str),
                draft.payment2.amount,
                draft.total,
                timestamp_to_db(&created_at),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn insert_installation_with_id(&self, installation: &Installation) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO installations (
                id,
                customer_id,
                branch,
                plan,
                due_day,
                method1,
                amount1,
                method2,
                amount2,
                total,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                installation.id,
                installation.customer_id,
                installation.branch.as_str(),
                installation.plan.as_str(),
                installation.due_day.as_str(),
                installation.payment1.method.map(PaymentMethod::as_str),
                installation.payment1.amount,
                installation.payment2.method.map(PaymentMethod::as_str),
                installation.payment2.amount,
                installation.total,
                timestamp_to_db(&installation.created_at),
            ],
        )?;

        Ok(())
    }

    fn update_installation(
        &self,
        id: InstallationId,
        customer_id: CustomerId,
        draft: &InstallationDraft,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE installations
             SET
                customer_id = ?1,
                branch = ?2,
                plan = ?3,
                due_day = ?4,
                method1 = ?5,
                amount1 = ?6,
                method2 = ?7,
                amount2 = ?8,
                total = ?9
             WHERE id = ?10;",
            params![
                customer_id,
                draft.branch.as_str(),
                draft.plan.as_str(),
                draft.due_day.as_str(),
                draft.payment1.method.map(PaymentMethod::as_str),
                draft.payment1.amount,
                draft.payment2.method.map(PaymentMethod::as_str),
                draft.payment2.amount,
                draft.total,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Installation(id)));
        }

        Ok(())
    }

    fn get_installation(&self, id: InstallationId) -> RepoResult<Option<Installation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INSTALLATION_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_installation_row(row)?));
        }

        Ok(None)
    }

    fn list_installations(&self) -> RepoResult<Vec<Installation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INSTALLATION_SELECT_SQL} ORDER BY id ASC;"))?;
        let installations = collect_installations(stmt.query([])?);
        installations
    }

    fn list_for_customer(&self, customer_id: CustomerId) -> RepoResult<Vec<Installation>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INSTALLATION_SELECT_SQL} WHERE customer_id = ?1 ORDER BY id ASC;"
        ))?;
        let installations = collect_installations(stmt.query([customer_id])?);
        installations
    }

    fn delete_for_customer(&self, customer_id: CustomerId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM installations WHERE customer_id = ?1;",
            [customer_id],
        )?)
    }

    fn delete_all_installations(&self) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM installations;", [])?)
    }
}

fn collect_installations(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Installation>> {
    let mut installations = Vec::new();
    while let Some(row) = rows.next()? {
        installations.push(parse_installation_row(row)?);
    }
    Ok(installations)
}

fn parse_installation_row(row: &Row<'_>) -> RepoResult<Installation> {
    let plan: String = row.get("plan")?;
    let due_day: String = row.get("due_day")?;
    let created_at: String = row.get("created_at")?;

    Ok(Installation {
        id: row.get("id")?,
        customer_id: row.get("customer_id")?,
        branch: row.get("branch")?,
        plan: parse_tag(&plan, "installations.plan")?,
        due_day: parse_tag(&due_day, "installations.due_day")?,
        payment1: parse_payment(row, "method1", "amount1")?,
        payment2: parse_payment(row, "method2", "amount2")?,
        total: row.get("total")?,
        created_at: parse_timestamp(&created_at, "installations.created_at")?,
    })
}

fn parse_payment(row: &Row<'_>, method_column: &str, amount_column: &str) -> RepoResult<Payment> {
    let method = match row.get::<_, Option<String>>(method_column)? {
        Some(value) => Some(parse_tag::<PaymentMethod>(
            &value,
            &format!("installations.{method_column}"),
        )?),
        None => None,
    };

    Ok(Payment {
        method,
        amount: row.get(amount_column)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{InstallationRepository, SqliteInstallationRepository};
    use crate::db::open_db_in_memory;
    use crate::model::catalog::{DueDay, PaymentMethod, Plan};
    use crate::model::installation::{InstallationDraft, Payment};
    use crate::model::timestamp_now;
    use crate::repo::RepoError;

    fn draft(amount: f64) -> InstallationDraft {
        InstallationDraft {
            branch: "Iporanga".to_string(),
            plan: Plan::Master,
            due_day: DueDay::Day20,
            payment1: Payment {
                method: Some(PaymentMethod::Cash),
                amount,
            },
            payment2: Payment::default(),
            total: amount,
        }
    }

    #[test]
    fn payment_slots_roundtrip() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteInstallationRepository::new(&conn);

        let id = repo.insert_installation(7, &draft(120.0), timestamp_now()).unwrap();
        let loaded = repo.get_installation(id).unwrap().unwrap();

        assert_eq!(loaded.customer_id, 7);
        assert_eq!(loaded.payment1.method, Some(PaymentMethod::Cash));
        assert_eq!(loaded.payment2.method, None);
        assert_eq!(loaded.total, 120.0);
    }

    #[test]
    fn delete_for_customer_only_touches_that_customer() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteInstallationRepository::new(&conn);

        repo.insert_installation(1, &draft(10.0), timestamp_now()).unwrap();
        repo.insert_installation(1, &draft(20.0), timestamp_now()).unwrap();
        repo.insert_installation(2, &draft(30.0), timestamp_now()).unwrap();

        assert_eq!(repo.delete_for_customer(1).unwrap(), 2);
        let remaining = repo.list_installations().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].customer_id, 2);
    }

    #[test]
    fn list_for_customer_returns_only_that_customer_in_id_order() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteInstallationRepository::new(&conn);

        let first = repo.insert_installation(3, &draft(10.0), timestamp_now()).unwrap();
        repo.insert_installation(4, &draft(20.0), timestamp_now()).unwrap();
        let third = repo.insert_installation(3, &draft(30.0), timestamp_now()).unwrap();

        let ids = repo
            .list_for_customer(3)
            .unwrap()
            .iter()
            .map(|installation| installation.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![first, third]);
        assert!(repo.list_for_customer(5).unwrap().is_empty());
        assert_eq!(repo.list_installations().unwrap().len(), 3);
    }

    #[test]
    fn update_missing_installation_is_not_found() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteInstallationRepository::new(&conn);

        let err = repo.update_installation(99, 1, &draft(1.0)).unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
