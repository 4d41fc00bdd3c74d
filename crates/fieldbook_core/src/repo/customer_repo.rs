//! Customer repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `customers` table.
//! - Translate the `(name, branch)` unique index into a semantic conflict.
//!
//! # Invariants
//! - `update_customer` never writes `status` or `created_at`.
//! - Deleting a customer here does not touch installations; the cascade is
//!   composed by the store service.

use crate::error::{ConflictError, EntityRef};
use crate::model::catalog::CustomerStatus;
use crate::model::customer::{Customer, CustomerDraft, CustomerId};
use crate::repo::{
    is_unique_violation, parse_tag, parse_timestamp, timestamp_to_db, RepoError, RepoResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

const CUSTOMER_SELECT_SQL: &str = "SELECT
    id,
    name,
    branch,
    plan,
    due_day,
    status,
    created_at
FROM customers";

/// Repository interface for customer persistence.
pub trait CustomerRepository {
    /// Inserts a new customer with the given initial status.
    fn insert_customer(
        &self,
        draft: &CustomerDraft,
        status: CustomerStatus,
        created_at: DateTime<Utc>,
    ) -> RepoResult<CustomerId>;
    /// Inserts a full record keeping its id, used by restore.
    fn insert_customer_with_id(&self, customer: &Customer) -> RepoResult<()>;
    /// Replaces editable fields (name, branch, plan, due-day).
    fn update_customer(&self, id: CustomerId, draft: &CustomerDraft) -> RepoResult<()>;
    fn set_status(&self, id: CustomerId, status: CustomerStatus) -> RepoResult<()>;
    fn set_branch(&self, id: CustomerId, branch: &str) -> RepoResult<()>;
    fn get_customer(&self, id: CustomerId) -> RepoResult<Option<Customer>>;
    fn find_by_name_and_branch(&self, name: &str, branch: &str) -> RepoResult<Option<Customer>>;
    /// Lists every customer, canceled included, in id order.
    fn list_customers(&self) -> RepoResult<Vec<Customer>>;
    /// Counts customers of any status referencing `branch`.
    fn count_by_branch(&self, branch: &str) -> RepoResult<usize>;
    fn delete_customer(&self, id: CustomerId) -> RepoResult<()>;
    fn delete_all_customers(&self) -> RepoResult<usize>;
}

/// SQLite-backed customer repository.
///
/// Accepts a plain connection or a transaction (through deref).
pub struct SqliteCustomerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCustomerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CustomerRepository for SqliteCustomerRepository<'_> {
    fn insert_customer(
        &self,
        draft: &CustomerDraft,
        status: CustomerStatus,
        created_at: DateTime<Utc>,
    ) -> RepoResult<CustomerId> {
        self.conn
            .execute(
                "INSERT INTO customers (name, branch, plan, due_day, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    draft.name.as_str(),
                    draft.branch.as_str(),
                    draft.plan.as_str(),
                    draft.due_day.as_str(),
                    status.as_str(),
                    timestamp_to_db(&created_at),
                ],
            )
            .map_err(|err| map_unique_violation(err, &draft.name, &draft.branch))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn insert_customer_with_id(&self, customer: &Customer) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO customers (id, name, branch, plan, due_day, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    customer.id,
                    customer.name.as_str(),
                    customer.branch.as_str(),
                    customer.plan.as_str(),
                    customer.due_day.as_str(),
                    customer.status.as_str(),
                    timestamp_to_db(&customer.created_at),
                ],
            )
            .map_err(|err| map_unique_violation(err, &customer.name, &customer.branch))?;

        Ok(())
    }

    fn update_customer(&self, id: CustomerId, draft: &CustomerDraft) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE customers
                 SET
                    name = ?1,
                    branch = ?2,
                    plan = ?3,
                    due_day = ?4
                 WHERE id = ?5;",
                params![
                    draft.name.as_str(),
                    draft.branch.as_str(),
                    draft.plan.as_str(),
                    draft.due_day.as_str(),
                    id,
                ],
            )
            .map_err(|err| map_unique_violation(err, &draft.name, &draft.branch))?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Customer(id)));
        }

        Ok(())
    }

    fn set_status(&self, id: CustomerId, status: CustomerStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE customers SET status = ?1 WHERE id = ?2;",
            params![status.as_str(), id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Customer(id)));
        }

        Ok(())
    }

    fn set_branch(&self, id: CustomerId, branch: &str) -> RepoResult<()> {
        let changed = match self.conn.execute(
            "UPDATE customers SET branch = ?1 WHERE id = ?2;",
            params![branch, id],
        ) {
            Ok(changed) => changed,
            Err(err) if is_unique_violation(&err) => {
                let name = self
                    .get_customer(id)?
                    .map(|customer| customer.name)
                    .unwrap_or_default();
                return Err(RepoError::Conflict(ConflictError::DuplicateCustomer {
                    name,
                    branch: branch.to_string(),
                }));
            }
            Err(err) => return Err(err.into()),
        };

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Customer(id)));
        }

        Ok(())
    }

    fn get_customer(&self, id: CustomerId) -> RepoResult<Option<Customer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CUSTOMER_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_customer_row(row)?));
        }

        Ok(None)
    }

    fn find_by_name_and_branch(&self, name: &str, branch: &str) -> RepoResult<Option<Customer>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CUSTOMER_SELECT_SQL} WHERE name = ?1 AND branch = ?2;"
        ))?;

        let mut rows = stmt.query(params![name, branch])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_customer_row(row)?));
        }

        Ok(None)
    }

    fn list_customers(&self) -> RepoResult<Vec<Customer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CUSTOMER_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut customers = Vec::new();

        while let Some(row) = rows.next()? {
            customers.push(parse_customer_row(row)?);
        }

        Ok(customers)
    }

    fn count_by_branch(&self, branch: &str) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM customers WHERE branch = ?1;",
            [branch],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative customer count {count}")))
    }

    fn delete_customer(&self, id: CustomerId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM customers WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Customer(id)));
        }

        Ok(())
    }

    fn delete_all_customers(&self) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM customers;", [])?)
    }
}

/// Returns whether a customer with this id exists, without decoding it.
pub fn customer_exists(conn: &Connection, id: CustomerId) -> RepoResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM customers WHERE id = ?1;", [id], |row| {
            row.get::<_, i64>(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn parse_customer_row(row: &Row<'_>) -> RepoResult<Customer> {
    let plan: String = row.get("plan")?;
    let due_day: String = row.get("due_day")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;

    Ok(Customer {
        id: row.get("id")?,
        name: row.get("name")?,
        branch: row.get("branch")?,
        plan: parse_tag(&plan, "customers.plan")?,
        due_day: parse_tag(&due_day, "customers.due_day")?,
        status: parse_tag(&status, "customers.status")?,
        created_at: parse_timestamp(&created_at, "customers.created_at")?,
    })
}

fn map_unique_violation(err: rusqlite::Error, name: &str, branch: &str) -> RepoError {
    if is_unique_violation(&err) {
        return RepoError::Conflict(ConflictError::DuplicateCustomer {
            name: name.to_string(),
            branch: branch.to_string(),
        });
    }
    err.into()
}
