//! Field definitions for entities.

use super::types::FieldType;
use monapi_proto::Value;

/// A field definition within an entity or child table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name as seen by callers.
    pub name: String,
    /// Column name in the owning table.
    pub column: String,
    /// Alias of the left-joined table holding the column; `None` for the base
    /// table.
    pub joined: Option<String>,
    /// Field data type.
    pub field_type: FieldType,
    /// Part of `output: "extend"` and accepted in explicit output lists.
    pub output: bool,
    /// Accepted as a `filter` key.
    pub filterable: bool,
    /// Accepted in create/update input.
    pub writable: bool,
    /// Required on create.
    pub required: bool,
    /// Entity whose ids this field holds; checked for visibility on write.
    pub references: Option<String>,
    /// Allowed integer values.
    pub allowed: Option<Vec<i64>>,
    /// Maximum string length in characters.
    pub max_len: Option<usize>,
    /// Value inserted when create input omits the field.
    pub default: Option<DefaultValue>,
}

/// Default value for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Fixed value.
    Value(Value),
    /// Current Unix time in seconds, evaluated at insert time.
    CurrentTimestamp,
}

impl DefaultValue {
    /// Evaluate the default.
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::CurrentTimestamp => Value::Int(chrono::Utc::now().timestamp()),
        }
    }
}

impl FieldDef {
    /// Create a read-only, filterable output field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            joined: None,
            field_type,
            output: true,
            filterable: true,
            writable: false,
            required: false,
            references: None,
            allowed: None,
            max_len: None,
            default: None,
        }
    }

    /// Id field.
    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Id)
    }

    /// Integer field.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// Floating point field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// String field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Accept the field in create/update input.
    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Require the field on create.
    pub fn required(mut self) -> Self {
        self.writable = true;
        self.required = true;
        self
    }

    /// Writable but never returned or filterable (secrets).
    pub fn write_only(mut self) -> Self {
        self.writable = true;
        self.output = false;
        self.filterable = false;
        self
    }

    /// Selected and used internally but never part of the output.
    pub fn hidden(mut self) -> Self {
        self.output = false;
        self
    }

    /// Not accepted as a filter key.
    pub fn unfilterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    /// Read the column from a left-joined table.
    pub fn joined(mut self, alias: impl Into<String>) -> Self {
        self.joined = Some(alias.into());
        self.writable = false;
        self
    }

    /// Mark as a reference to another entity.
    pub fn references(mut self, entity: impl Into<String>) -> Self {
        self.references = Some(entity.into());
        self
    }

    /// Restrict integer values.
    pub fn allowed(mut self, values: &[i64]) -> Self {
        self.allowed = Some(values.to_vec());
        self
    }

    /// Limit string length.
    pub fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    /// Set the create default.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(default.into()));
        self
    }

    /// Default to the insert time.
    pub fn created_at(mut self) -> Self {
        self.default = Some(DefaultValue::CurrentTimestamp);
        self
    }

    /// Accepted as a `search` key.
    pub fn is_searchable(&self) -> bool {
        self.output && self.field_type.is_textual()
    }

    /// Column qualified with the owning alias.
    pub fn qualified(&self, base_alias: &str) -> String {
        format!("{}.{}", self.joined.as_deref().unwrap_or(base_alias), self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let psk = FieldDef::string("tls_psk").write_only();
        assert!(psk.writable && !psk.output && !psk.filterable);
        assert!(!psk.is_searchable());

        let name = FieldDef::string("name").required().max_len(128);
        assert!(name.writable && name.required && name.is_searchable());

        let lastaccess = FieldDef::int("lastaccess").joined("pr");
        assert_eq!(lastaccess.qualified("p"), "pr.lastaccess");
        assert_eq!(name.qualified("p"), "p.name");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            FieldDef::int("status").with_default(1).default.map(|d| d.resolve()),
            Some(Value::Int(1))
        );
        let clock = FieldDef::int("clock").created_at();
        match clock.default.map(|d| d.resolve()) {
            Some(Value::Int(ts)) => assert!(ts > 0),
            other => panic!("unexpected {:?}", other),
        }
    }
}
