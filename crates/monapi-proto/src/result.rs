//! Result types for API responses.

use crate::value::{Id, Row, Value};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Result of a `get` call.
#[derive(Debug, Clone, PartialEq)]
pub enum GetResult {
    /// Row count (`countOutput` without `groupCount`).
    Count(u64),
    /// One `{group key, rowscount}` row per group.
    GroupCounts(Vec<Row>),
    /// Rows as a dense sequence.
    List(Vec<Row>),
    /// Rows keyed by primary key (`preservekeys`), in result order.
    Keyed(Vec<(Id, Row)>),
}

impl GetResult {
    /// Number of entries (rows, groups, or the count itself).
    pub fn len(&self) -> usize {
        match self {
            GetResult::Count(n) => *n as usize,
            GetResult::GroupCounts(rows) | GetResult::List(rows) => rows.len(),
            GetResult::Keyed(rows) => rows.len(),
        }
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the count, if this is a count result.
    pub fn count(&self) -> Option<u64> {
        match self {
            GetResult::Count(n) => Some(*n),
            _ => None,
        }
    }

    /// Iterate over result rows regardless of addressing.
    pub fn rows(&self) -> Vec<&Row> {
        match self {
            GetResult::Count(_) => Vec::new(),
            GetResult::GroupCounts(rows) | GetResult::List(rows) => rows.iter().collect(),
            GetResult::Keyed(rows) => rows.iter().map(|(_, row)| row).collect(),
        }
    }

    /// Consume into rows, dropping keys.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            GetResult::Count(_) => Vec::new(),
            GetResult::GroupCounts(rows) | GetResult::List(rows) => rows,
            GetResult::Keyed(rows) => rows.into_iter().map(|(_, row)| row).collect(),
        }
    }

    /// Primary keys of a keyed result.
    pub fn keys(&self) -> Vec<Id> {
        match self {
            GetResult::Keyed(rows) => rows.iter().map(|(id, _)| *id).collect(),
            _ => Vec::new(),
        }
    }

    /// Collect one column from every row.
    pub fn column(&self, field: &str) -> Vec<Value> {
        self.rows()
            .into_iter()
            .map(|row| row.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl Serialize for GetResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GetResult::Count(n) => serializer.serialize_u64(*n),
            GetResult::GroupCounts(rows) | GetResult::List(rows) => {
                let mut seq = serializer.serialize_seq(Some(rows.len()))?;
                for row in rows {
                    seq.serialize_element(row)?;
                }
                seq.end()
            }
            GetResult::Keyed(rows) => {
                let mut map = serializer.serialize_map(Some(rows.len()))?;
                for (id, row) in rows {
                    map.serialize_entry(&id.to_string(), row)?;
                }
                map.end()
            }
        }
    }
}

/// Result of a create, update, or delete call: `{idField: [ids]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    /// Plural id field name, e.g. `proxyids`.
    pub id_field: String,
    /// Affected ids, in input order.
    pub ids: Vec<Id>,
}

impl MutationResult {
    /// Create a mutation result.
    pub fn new(id_field: impl Into<String>, ids: Vec<Id>) -> Self {
        Self {
            id_field: id_field.into(),
            ids,
        }
    }
}

impl Serialize for MutationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let ids: Vec<String> = self.ids.iter().map(|id| id.to_string()).collect();
        map.serialize_entry(&self.id_field, &ids)?;
        map.end()
    }
}
