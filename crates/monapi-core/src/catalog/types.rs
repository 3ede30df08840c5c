//! Column types for entity fields.

use monapi_proto::Value;

/// Storage type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Object id (unsigned 64-bit, stored as integer).
    Id,
    /// Integer (enums, flags, timestamps).
    Int,
    /// Floating point.
    Float,
    /// Short string.
    String,
    /// Long text.
    Text,
}

impl FieldType {
    /// Check if values are compared as integers.
    pub fn is_integer(self) -> bool {
        matches!(self, FieldType::Id | FieldType::Int)
    }

    /// Check if values are strings.
    pub fn is_textual(self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }

    /// Human readable expectation used in validation messages.
    pub fn expectation(self) -> &'static str {
        match self {
            FieldType::Id => "a number is expected",
            FieldType::Int => "an integer is expected",
            FieldType::Float => "a floating point value is expected",
            FieldType::String | FieldType::Text => "a character string is expected",
        }
    }

    /// Coerce an input value to this type.
    ///
    /// Integers accept numbers and digit strings, since ids travel as strings.
    /// Strings accept strings only. Null passes through.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (FieldType::Id, v) => v.as_id().map(|id| Value::Int(id as i64)),
            (FieldType::Int, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
            (FieldType::Int, v) => v.as_i64().map(Value::Int),
            (FieldType::Float, Value::String(s)) => s.parse().ok().map(Value::Float),
            (FieldType::Float, v) => v.as_f64().map(Value::Float),
            (FieldType::String | FieldType::Text, Value::String(s)) => {
                Some(Value::String(s.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integers() {
        assert_eq!(FieldType::Id.coerce(&Value::from("12")), Some(Value::Int(12)));
        assert_eq!(FieldType::Id.coerce(&Value::Int(-3)), None);
        assert_eq!(FieldType::Int.coerce(&Value::Bool(true)), Some(Value::Int(1)));
        assert_eq!(FieldType::Int.coerce(&Value::from("x")), None);
    }

    #[test]
    fn test_coerce_strings() {
        assert_eq!(
            FieldType::String.coerce(&Value::from("edge")),
            Some(Value::from("edge"))
        );
        assert_eq!(FieldType::String.coerce(&Value::Int(1)), None);
        assert_eq!(FieldType::Float.coerce(&Value::from("1.5")), Some(Value::Float(1.5)));
        assert_eq!(FieldType::Text.coerce(&Value::Null), Some(Value::Null));
    }
}
