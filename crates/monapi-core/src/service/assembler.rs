//! Shaping of raw query rows into `get` results.

use crate::error::{Error, Result};
use crate::query::ROWSCOUNT;
use monapi_proto::{GetResult, Id, Row, Value};

/// Read the plain count from a `countOutput` query.
pub(super) fn count(rows: &[Row]) -> Result<GetResult> {
    let value = rows
        .first()
        .and_then(|row| row.get(ROWSCOUNT))
        .cloned()
        .unwrap_or(Value::Int(0));
    let count = value
        .as_i64()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| Error::internal(format!("unexpected row count {}", value)))?;
    Ok(GetResult::Count(count))
}

/// Index rows by primary key. Repeated keys keep the first row.
pub(super) fn key_rows(rows: Vec<Row>, pk: &str) -> Result<Vec<(Id, Row)>> {
    let mut keyed: Vec<(Id, Row)> = Vec::with_capacity(rows.len());
    let mut seen = std::collections::HashSet::with_capacity(rows.len());
    for row in rows {
        let id = row
            .get(pk)
            .and_then(Value::as_id)
            .ok_or_else(|| Error::internal(format!("row without a valid \"{}\"", pk)))?;
        if seen.insert(id) {
            keyed.push((id, row));
        }
    }
    Ok(keyed)
}

/// Remove internally selected fields.
pub(super) fn strip(rows: &mut [(Id, Row)], fields: &[String]) {
    if fields.is_empty() {
        return;
    }
    for (_, row) in rows.iter_mut() {
        for field in fields {
            row.remove(field);
        }
    }
}

/// Final addressing of a row result.
pub(super) fn finish(rows: Vec<(Id, Row)>, preserve_keys: bool) -> GetResult {
    if preserve_keys {
        GetResult::Keyed(rows)
    } else {
        GetResult::List(rows.into_iter().map(|(_, row)| row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_count() {
        let rows = vec![row(&[(ROWSCOUNT, Value::Int(7))])];
        assert_eq!(count(&rows).unwrap(), GetResult::Count(7));
        assert_eq!(count(&[]).unwrap(), GetResult::Count(0));
    }

    #[test]
    fn test_key_rows_keeps_order() {
        let rows = vec![
            row(&[("proxyid", Value::Int(9))]),
            row(&[("proxyid", Value::Int(2))]),
            row(&[("proxyid", Value::Int(9))]),
        ];
        let keyed = key_rows(rows, "proxyid").unwrap();
        let ids: Vec<Id> = keyed.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![9, 2]);

        assert!(key_rows(vec![Row::new()], "proxyid").is_err());
    }

    #[test]
    fn test_strip_and_finish() {
        let mut rows = vec![(1, row(&[("proxyid", Value::Int(1)), ("name", Value::from("a"))]))];
        strip(&mut rows, &["proxyid".to_string()]);
        match finish(rows.clone(), false) {
            GetResult::List(list) => assert_eq!(list, vec![row(&[("name", Value::from("a"))])]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(finish(rows, true).keys(), vec![1]);
    }
}
