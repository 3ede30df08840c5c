//! Typed `get` options.
//!
//! `GetOptions` is the normalized form of an options request. The universal
//! keys are plain fields; entity-specific keys live in `params`, keyed by the
//! option name the entity declares. A param that is present with `None` was
//! not specified, which is distinct from an empty id list.

use crate::value::{Id, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// Output projection for the root entity or a related-object selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    /// All known output fields.
    Extend,
    /// An explicit field list.
    Fields(Vec<String>),
    /// Only a count (related-object selections that allow it).
    Count,
}

impl Output {
    /// Build a field-list projection.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Output::Fields(fields.into_iter().map(Into::into).collect())
    }

    /// Check whether a field is part of this projection.
    pub fn is_requested(&self, field: &str) -> bool {
        match self {
            Output::Extend => true,
            Output::Fields(fields) => fields.iter().any(|f| f == field),
            Output::Count => false,
        }
    }

    /// Check if this is a count projection.
    pub fn is_count(&self) -> bool {
        matches!(self, Output::Count)
    }
}

impl Default for Output {
    fn default() -> Self {
        Output::Extend
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Sort specification for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by.
    pub field: String,
    /// Sort direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Create ascending order.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Create descending order.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// How multiple tag conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalType {
    /// Every tag condition must hold (wire value 0).
    And,
    /// Any tag condition suffices (wire value 2).
    Or,
}

impl EvalType {
    /// Decode the wire value.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EvalType::And),
            2 => Some(EvalType::Or),
            _ => None,
        }
    }
}

impl Default for EvalType {
    fn default() -> Self {
        EvalType::And
    }
}

/// Tag value comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagOperator {
    /// Case-insensitive substring match (wire value 0).
    Like,
    /// Exact match (wire value 1).
    Equal,
}

impl TagOperator {
    /// Decode the wire value.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TagOperator::Like),
            1 => Some(TagOperator::Equal),
            _ => None,
        }
    }
}

impl Default for TagOperator {
    fn default() -> Self {
        TagOperator::Like
    }
}

/// One tag condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    /// Tag name, matched exactly.
    pub tag: String,
    /// Tag value; empty with `Like` only checks the tag exists.
    pub value: String,
    /// Value comparison.
    pub operator: TagOperator,
}

impl TagFilter {
    /// Tag existence condition.
    pub fn exists(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: String::new(),
            operator: TagOperator::Like,
        }
    }

    /// Substring value condition.
    pub fn like(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
            operator: TagOperator::Like,
        }
    }

    /// Exact value condition.
    pub fn equal(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
            operator: TagOperator::Equal,
        }
    }
}

/// Value of an entity-specific option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    /// Set of object ids.
    Ids(Vec<Id>),
    /// Set of integers.
    Ints(Vec<i64>),
    /// Single integer.
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// Free string.
    Str(String),
    /// Related-object output projection.
    Output(Output),
    /// Tag conditions.
    Tags(Vec<TagFilter>),
    /// Tag combination mode.
    EvalType(EvalType),
}

/// Normalized options for a `get` call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetOptions {
    /// Root output projection.
    pub output: Output,
    /// Return a row count instead of rows.
    pub count_output: bool,
    /// With `count_output`, return one count per group key.
    pub group_count: bool,
    /// Key the result by primary key instead of a dense sequence.
    pub preserve_keys: bool,
    /// Request write access.
    pub editable: bool,
    /// Skip permission scoping (internal calls on already-scoped ids).
    pub no_permissions: bool,
    /// Exact-match filter: field to accepted values.
    pub filter: Option<BTreeMap<String, Vec<Value>>>,
    /// Substring search: field to patterns.
    pub search: Option<BTreeMap<String, Vec<String>>>,
    /// Combine filter/search fields with OR instead of AND.
    pub search_by_any: bool,
    /// Match patterns only at the start of the value.
    pub start_search: bool,
    /// Negate search patterns.
    pub exclude_search: bool,
    /// Treat `*` in search patterns as a wildcard.
    pub search_wildcards_enabled: bool,
    /// Sort specification.
    pub sort: Vec<SortSpec>,
    /// Maximum number of rows.
    pub limit: Option<NonZeroU32>,
    /// Entity-specific options. `None` means "not specified".
    pub params: BTreeMap<String, Option<OptionValue>>,
}

impl GetOptions {
    /// Create options with every universal key at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an entity-specific option, if specified.
    pub fn param(&self, name: &str) -> Option<&OptionValue> {
        self.params.get(name).and_then(|v| v.as_ref())
    }

    /// Get an id-set option.
    pub fn ids(&self, name: &str) -> Option<&[Id]> {
        match self.param(name) {
            Some(OptionValue::Ids(ids)) => Some(ids),
            _ => None,
        }
    }

    /// Get an integer-set option.
    pub fn ints(&self, name: &str) -> Option<&[i64]> {
        match self.param(name) {
            Some(OptionValue::Ints(values)) => Some(values),
            _ => None,
        }
    }

    /// Get a single integer option.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.param(name) {
            Some(OptionValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get a boolean option; unspecified reads as false.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.param(name), Some(OptionValue::Bool(true)))
    }

    /// Get a related-object selection.
    pub fn selection(&self, name: &str) -> Option<&Output> {
        match self.param(name) {
            Some(OptionValue::Output(output)) => Some(output),
            _ => None,
        }
    }

    /// Get tag conditions.
    pub fn tags(&self, name: &str) -> Option<&[TagFilter]> {
        match self.param(name) {
            Some(OptionValue::Tags(tags)) => Some(tags),
            _ => None,
        }
    }

    /// Get a tag combination mode.
    pub fn eval_type(&self, name: &str) -> EvalType {
        match self.param(name) {
            Some(OptionValue::EvalType(eval)) => *eval,
            _ => EvalType::default(),
        }
    }

    /// Set the output projection.
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Request a count instead of rows.
    pub fn count(mut self) -> Self {
        self.count_output = true;
        self
    }

    /// Request per-group counts.
    pub fn group_count(mut self) -> Self {
        self.count_output = true;
        self.group_count = true;
        self
    }

    /// Key results by primary key.
    pub fn preserve_keys(mut self) -> Self {
        self.preserve_keys = true;
        self
    }

    /// Request write access.
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Skip permission scoping.
    pub fn no_permissions(mut self) -> Self {
        self.no_permissions = true;
        self
    }

    /// Add an exact-match filter on a field.
    pub fn with_filter(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), values);
        self
    }

    /// Add a substring search on a field.
    pub fn with_search(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.search
            .get_or_insert_with(BTreeMap::new)
            .entry(field.into())
            .or_default()
            .push(pattern.into());
        self
    }

    /// Add a sort field.
    pub fn sort_by(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    /// Limit the number of rows; zero means no limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = NonZeroU32::new(limit);
        self
    }

    /// Set an id-set option.
    pub fn with_ids<I>(self, name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = Id>,
    {
        self.with_param(name, OptionValue::Ids(ids.into_iter().collect()))
    }

    /// Set a related-object selection.
    pub fn select(self, name: impl Into<String>, output: Output) -> Self {
        self.with_param(name, OptionValue::Output(output))
    }

    /// Set any entity-specific option.
    pub fn with_param(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.params.insert(name.into(), Some(value));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_requested() {
        assert!(Output::Extend.is_requested("name"));
        assert!(Output::fields(["name"]).is_requested("name"));
        assert!(!Output::fields(["name"]).is_requested("hostid"));
        assert!(!Output::Count.is_requested("name"));
    }

    #[test]
    fn test_unspecified_and_empty_ids_differ() {
        let unspecified = GetOptions::new();
        let empty = GetOptions::new().with_ids("hostids", Vec::new());

        assert_eq!(unspecified.ids("hostids"), None);
        assert_eq!(empty.ids("hostids"), Some(&[][..]));
    }

    #[test]
    fn test_builder() {
        let options = GetOptions::new()
            .with_output(Output::fields(["name"]))
            .with_ids("proxyids", [1, 2])
            .select("selectHosts", Output::Count)
            .sort_by(SortSpec::desc("name"))
            .with_limit(0)
            .editable();

        assert_eq!(options.ids("proxyids"), Some(&[1, 2][..]));
        assert_eq!(options.selection("selectHosts"), Some(&Output::Count));
        assert_eq!(options.limit, None);
        assert!(options.editable);
        assert!(!options.flag("recent"));
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(EvalType::from_code(0), Some(EvalType::And));
        assert_eq!(EvalType::from_code(2), Some(EvalType::Or));
        assert_eq!(EvalType::from_code(1), None);
        assert_eq!(TagOperator::from_code(1), Some(TagOperator::Equal));
        assert_eq!(TagOperator::from_code(5), None);
    }
}
