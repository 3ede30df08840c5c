//! Batch association index between base rows and related ids.

use monapi_proto::{Id, Row, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Ordered multimap from base id to related ids.
///
/// Related ids keep the order in which they were added and are unique per
/// base id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationMap {
    map: BTreeMap<Id, Vec<Id>>,
}

impl RelationMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `base` relates to `related`.
    pub fn add(&mut self, base: Id, related: Id) {
        let related_ids = self.map.entry(base).or_default();
        if !related_ids.contains(&related) {
            related_ids.push(related);
        }
    }

    /// Build from (base, related) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Id, Id)>) -> Self {
        let mut map = Self::new();
        for (base, related) in pairs {
            map.add(base, related);
        }
        map
    }

    /// Build from a foreign key column on the base rows. Null and zero
    /// values mean "no related object".
    pub fn from_rows(rows: &[(Id, Row)], column: &str) -> Self {
        let mut map = Self::new();
        for (base, row) in rows {
            if let Some(related) = row.get(column).and_then(Value::as_id) {
                if related != 0 {
                    map.add(*base, related);
                }
            }
        }
        map
    }

    /// Related ids of one base row.
    pub fn get(&self, base: Id) -> &[Id] {
        self.map.get(&base).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All related ids, unique, in first-seen order.
    pub fn related_ids(&self) -> Vec<Id> {
        let mut seen = HashSet::new();
        self.map
            .values()
            .flatten()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Number of base ids with at least one relation.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if no relation was recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Set `field` on every base row to its first related object, or to
    /// `Value::Null` when there is none.
    pub fn map_one(&self, rows: &mut [(Id, Row)], related: &[(Id, Row)], field: &str) {
        let lookup = index(related);
        for (base, row) in rows.iter_mut() {
            let value = self
                .get(*base)
                .iter()
                .find_map(|id| lookup.get(id))
                .map(|related| Value::Object((*related).clone()))
                .unwrap_or(Value::Null);
            row.insert(field.to_string(), value);
        }
    }

    /// Set `field` on every base row to the list of its related objects, in
    /// the order of `related`. Rows without relations get an empty list.
    pub fn map_many(&self, rows: &mut [(Id, Row)], related: &[(Id, Row)], field: &str) {
        for (base, row) in rows.iter_mut() {
            let linked: HashSet<Id> = self.get(*base).iter().copied().collect();
            let objects = related
                .iter()
                .filter(|(id, _)| linked.contains(id))
                .map(|(_, related)| Value::Object(related.clone()))
                .collect();
            row.insert(field.to_string(), Value::List(objects));
        }
    }

    /// Set `field` on every base row to the number of its related ids that
    /// are present in `visible`.
    pub fn map_count(&self, rows: &mut [(Id, Row)], visible: &[Id], field: &str) {
        let visible: HashSet<Id> = visible.iter().copied().collect();
        for (base, row) in rows.iter_mut() {
            let count = self
                .get(*base)
                .iter()
                .filter(|id| visible.contains(id))
                .count();
            row.insert(field.to_string(), Value::Int(count as i64));
        }
    }
}

fn index(related: &[(Id, Row)]) -> HashMap<Id, &Row> {
    related.iter().map(|(id, row)| (*id, row)).collect()
}
