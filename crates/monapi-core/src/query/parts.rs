//! Structured SELECT accumulator.
//!
//! Every section that can be contributed to from several places is keyed, so
//! a table joined for two reasons (a group filter and the permission check,
//! say) appears once.

use super::predicate::Predicate;

/// Ordered list of keyed entries; inserting an existing key replaces the
/// entry in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Keyed<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert an entry unless the key is already present.
    pub fn insert_once(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        if !self.contains(&key) {
            self.entries.push((key, value));
        }
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Get an entry by key.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// A `LEFT JOIN` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LeftJoin {
    /// Table name.
    pub table: String,
    /// Table alias.
    pub alias: String,
    /// Join condition.
    pub on: Predicate,
}

/// Accumulated parts of one SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryParts {
    /// Select expressions keyed by output name.
    pub select: Keyed<String>,
    /// `table alias` entries keyed by logical join reason.
    pub from: Keyed<String>,
    /// Left joins keyed by alias.
    pub left_join: Keyed<LeftJoin>,
    /// WHERE predicates, AND-combined.
    pub filter: Keyed<Predicate>,
    /// GROUP BY expressions.
    pub group: Vec<String>,
    /// ORDER BY expressions including direction.
    pub order: Vec<String>,
    /// Row limit.
    pub limit: Option<u32>,
    unkeyed: usize,
}

impl QueryParts {
    /// Create empty parts with the base table.
    pub fn new(table: &str, alias: &str) -> Self {
        let mut parts = Self::default();
        parts.from.insert(table, format!("{} {}", table, alias));
        parts
    }

    /// Add a WHERE predicate that needs no deduplication.
    pub fn push_filter(&mut self, predicate: Predicate) {
        self.unkeyed += 1;
        let key = format!("#{}", self.unkeyed);
        self.filter.insert(key, predicate);
    }

    /// Add a WHERE predicate under a dedup key.
    pub fn filter_once(&mut self, key: impl Into<String>, predicate: Predicate) {
        self.filter.insert_once(key, predicate);
    }

    /// Add a select expression under its output name.
    pub fn add_select(&mut self, name: impl Into<String>, expr: impl Into<String>) {
        self.select.insert(name, expr.into());
    }

    /// Whether the statement reads from more than one table and so needs
    /// `DISTINCT` to keep base rows unique.
    pub fn needs_distinct(&self) -> bool {
        self.from.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_replaces_in_place() {
        let mut keyed = Keyed::new();
        keyed.insert("a", 1);
        keyed.insert("b", 2);
        keyed.insert("a", 3);
        assert_eq!(keyed.values().copied().collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_default_parts_are_empty() {
        let parts = QueryParts::default();
        assert!(parts.left_join.is_empty());
        assert!(parts.filter.is_empty());
        assert_eq!(Keyed::<LeftJoin>::default(), Keyed::new());
    }

    #[test]
    fn test_from_dedup() {
        let mut parts = QueryParts::new("applications", "a");
        parts.from.insert_once("hosts_groups", "hosts_groups hg".to_string());
        parts.from.insert_once("hosts_groups", "hosts_groups hg2".to_string());
        assert_eq!(parts.from.len(), 2);
        assert_eq!(parts.from.get("hosts_groups").map(String::as_str), Some("hosts_groups hg"));
        assert!(parts.needs_distinct());
    }

    #[test]
    fn test_unkeyed_filters_accumulate() {
        let mut parts = QueryParts::new("proxy", "p");
        parts.push_filter(Predicate::True);
        parts.push_filter(Predicate::False);
        parts.filter_once("perm", Predicate::True);
        parts.filter_once("perm", Predicate::False);
        assert_eq!(parts.filter.len(), 3);
        assert_eq!(parts.filter.get("perm"), Some(&Predicate::True));
    }
}
