//! SQLite-backed executor.

use super::executor::SqlExecutor;
use crate::error::{Error, Result};
use crate::query::Sql;
use crate::security::{UserContext, UserRole};
use monapi_proto::{Id, Row, Value};
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

/// DDL for the monitoring schema.
pub const SCHEMA: &str = include_str!("schema.sql");

/// A single SQLite connection behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create missing tables.
    pub fn install_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run a batch of statements, e.g. seed data.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql).map_err(map_error)
    }

    /// Build the context of a stored user.
    pub fn load_user(&self, user_id: Id) -> Result<UserContext> {
        let conn = self.conn.lock();
        let id = i64::try_from(user_id).map_err(|_| Error::denied("Not authorized."))?;

        let code: Option<i64> = conn
            .query_row("SELECT type FROM users WHERE userid=?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        let code = code.ok_or_else(|| Error::denied("Not authorized."))?;
        let role = UserRole::from_code(code)
            .ok_or_else(|| Error::internal(format!("unknown user type {}", code)))?;

        let mut stmt =
            conn.prepare("SELECT usrgrpid FROM users_groups WHERE userid=?1 ORDER BY usrgrpid")?;
        let groups = stmt
            .query_map(params![id], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(UserContext::new(user_id, role)
            .with_groups(groups.into_iter().filter_map(|g| Id::try_from(g).ok())))
    }
}

impl SqlExecutor for SqliteStore {
    fn select(&self, sql: &Sql) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql.text).map_err(map_error)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt
            .query(params_from_iter(sql.params.iter().map(to_sql)))
            .map_err(map_error)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, name) in columns.iter().enumerate() {
                record.insert(name.clone(), from_sql(row.get_ref(i)?));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn execute(&self, sql: &Sql) -> Result<usize> {
        self.conn
            .lock()
            .execute(&sql.text, params_from_iter(sql.params.iter().map(to_sql)))
            .map_err(map_error)
    }

    fn insert(&self, sql: &Sql) -> Result<Id> {
        let conn = self.conn.lock();
        conn.execute(&sql.text, params_from_iter(sql.params.iter().map(to_sql)))
            .map_err(map_error)?;
        Id::try_from(conn.last_insert_rowid())
            .map_err(|_| Error::internal("negative row id after insert"))
    }

    fn begin(&self) -> Result<()> {
        self.conn.lock().execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.conn.lock().execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.conn.lock().execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Constraint violations surface as conflicts; everything else is a storage
/// error.
fn map_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return Error::conflict(
                message
                    .clone()
                    .unwrap_or_else(|| "constraint violation".to_string()),
            );
        }
    }
    Error::Storage(err)
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::List(_) | Value::Object(_) => {
            SqlValue::Text(serde_json::to_string(value).unwrap_or_default())
        }
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
