//! INSERT, UPDATE and DELETE statements.
//!
//! Write statements address unaliased tables, so predicates passed here must
//! use bare column names.

use super::predicate::Predicate;
use super::render::{Sql, SqlWriter};
use monapi_proto::Value;

/// `INSERT INTO table (a,b) VALUES (?,?)`.
pub fn insert(table: &str, values: &[(String, Value)]) -> Sql {
    let mut w = SqlWriter::new();
    let columns: Vec<&str> = values.iter().map(|(c, _)| c.as_str()).collect();
    w.push("INSERT INTO ")
        .push(table)
        .push(" (")
        .push(&columns.join(","))
        .push(") VALUES (");
    for (i, (_, value)) in values.iter().enumerate() {
        if i > 0 {
            w.push(",");
        }
        w.bind(value.clone());
    }
    w.push(")");
    w.finish()
}

/// `UPDATE table SET a=?,b=? WHERE filter`.
pub fn update(table: &str, values: &[(String, Value)], filter: &Predicate) -> Sql {
    let mut w = SqlWriter::new();
    w.push("UPDATE ").push(table).push(" SET ");
    for (i, (column, value)) in values.iter().enumerate() {
        if i > 0 {
            w.push(",");
        }
        w.push(column).push("=");
        w.bind(value.clone());
    }
    w.push(" WHERE ");
    w.predicate(filter);
    w.finish()
}

/// `DELETE FROM table WHERE filter`.
pub fn delete(table: &str, filter: &Predicate) -> Sql {
    let mut w = SqlWriter::new();
    w.push("DELETE FROM ").push(table).push(" WHERE ");
    w.predicate(filter);
    w.finish()
}
