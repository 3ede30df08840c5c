//! Data store boundary.

use crate::error::Result;
use crate::query::Sql;
use monapi_proto::{Id, Row};

/// Executes rendered statements.
///
/// Transactions are explicit: the service calls `begin` before a mutation and
/// `commit` or `rollback` after it.
pub trait SqlExecutor: Send + Sync {
    /// Run a query and collect its rows, keyed by column name.
    fn select(&self, sql: &Sql) -> Result<Vec<Row>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &Sql) -> Result<usize>;

    /// Run an INSERT and return the new row id.
    fn insert(&self, sql: &Sql) -> Result<Id>;

    /// Start a transaction.
    fn begin(&self) -> Result<()>;

    /// Commit the current transaction.
    fn commit(&self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback(&self) -> Result<()>;
}
