//! Input validation for create and update.
//!
//! The service derives an [`InputSchema`] from the entity descriptor and hands
//! it to a [`Validator`] together with the input objects. [`RuleValidator`]
//! is the built-in implementation.

use crate::catalog::{ChildKind, EntityDescriptor, FieldDef, FieldType};
use crate::security::Method;
use monapi_proto::{Error, Row, Value};
use std::collections::HashSet;

/// Constraints on one input field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    /// Field name.
    pub name: String,
    /// Expected type.
    pub field_type: FieldType,
    /// Must be present.
    pub required: bool,
    /// Allowed integer values.
    pub allowed: Option<Vec<i64>>,
    /// Maximum string length.
    pub max_len: Option<usize>,
}

impl FieldRule {
    fn from_field(field: &FieldDef, required: bool) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type,
            required,
            allowed: field.allowed.clone(),
            max_len: field.max_len,
        }
    }
}

/// Schema of a nested collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSchema {
    /// Input field holding the collection.
    pub field: String,
    /// Rules for each element.
    pub rules: Vec<FieldRule>,
    /// Must be present and non-empty.
    pub required: bool,
}

/// Everything a validator needs to check one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSchema {
    /// Field rules.
    pub rules: Vec<FieldRule>,
    /// Nested collections.
    pub children: Vec<ChildSchema>,
    /// Field sets that must be unique within the batch.
    pub unique: Vec<Vec<String>>,
}

impl InputSchema {
    /// Schema for `create` or `update` of an entity.
    pub fn for_entity(entity: &EntityDescriptor, method: Method) -> Self {
        let creating = method == Method::Create;
        let mut rules: Vec<FieldRule> = entity
            .fields
            .iter()
            .filter(|f| f.writable)
            .map(|f| FieldRule::from_field(f, creating && f.required))
            .collect();

        if method == Method::Update {
            if let Some(pk) = &entity.pk {
                if let Some(field) = entity.field(pk) {
                    rules.insert(0, FieldRule::from_field(field, !entity.singleton));
                }
            }
        }

        let children = entity
            .children
            .iter()
            .map(|child| {
                let rules = match &child.kind {
                    ChildKind::Rows(table) => table
                        .fields
                        .iter()
                        .filter(|f| f.writable)
                        .map(|f| FieldRule::from_field(f, f.required))
                        .collect(),
                    ChildKind::Links { pk, .. } => vec![FieldRule {
                        name: pk.clone(),
                        field_type: FieldType::Id,
                        required: true,
                        allowed: None,
                        max_len: None,
                    }],
                };
                ChildSchema {
                    field: child.field.clone(),
                    rules,
                    required: creating && child.required,
                }
            })
            .collect();

        let mut unique = entity.unique.clone();
        if method == Method::Update {
            if let Some(pk) = &entity.pk {
                unique.push(vec![pk.clone()]);
            }
        }

        Self {
            rules,
            children,
            unique,
        }
    }

    fn child(&self, name: &str) -> Option<&ChildSchema> {
        self.children.iter().find(|c| c.field == name)
    }
}

/// Validates input objects against a schema.
pub trait Validator: Send + Sync {
    /// Return the first problem found.
    fn validate(&self, schema: &InputSchema, input: &[Row]) -> Result<(), Error>;
}

/// Checks presence, types, allowed values, lengths and batch uniqueness.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleValidator;

impl Validator for RuleValidator {
    fn validate(&self, schema: &InputSchema, input: &[Row]) -> Result<(), Error> {
        for (i, object) in input.iter().enumerate() {
            let path = format!("/{}", i + 1);
            check_object(&path, &schema.rules, object, |name| schema.child(name).is_some())?;

            for child in &schema.children {
                match object.get(&child.field) {
                    None | Some(Value::Null) if child.required => {
                        return Err(missing(&path, &child.field));
                    }
                    None | Some(Value::Null) => {}
                    Some(Value::List(items)) => {
                        let child_path = format!("{}/{}", path, child.field);
                        if child.required && items.is_empty() {
                            return Err(Error::invalid(child_path, "cannot be empty"));
                        }
                        for (j, item) in items.iter().enumerate() {
                            let item_path = format!("{}/{}", child_path, j + 1);
                            let Value::Object(item) = item else {
                                return Err(Error::invalid(item_path, "an object is expected"));
                            };
                            check_object(&item_path, &child.rules, item, |_| false)?;
                        }
                    }
                    Some(_) => {
                        return Err(Error::invalid(
                            format!("{}/{}", path, child.field),
                            "an array is expected",
                        ))
                    }
                }
            }
        }

        for fields in &schema.unique {
            let mut seen = HashSet::new();
            for (i, object) in input.iter().enumerate() {
                let key: Vec<String> = fields
                    .iter()
                    .map(|f| object.get(f).map(Value::to_string).unwrap_or_default())
                    .collect();
                if fields.iter().any(|f| !object.contains_key(f)) {
                    continue;
                }
                if !seen.insert(key.clone()) {
                    return Err(Error::invalid(
                        format!("/{}", i + 1),
                        format!("value ({})=({}) already exists", fields.join(", "), key.join(", ")),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn missing(path: &str, field: &str) -> Error {
    Error::invalid(path, format!("the parameter \"{}\" is missing", field))
}

fn check_object(
    path: &str,
    rules: &[FieldRule],
    object: &Row,
    is_child: impl Fn(&str) -> bool,
) -> Result<(), Error> {
    for name in object.keys() {
        if !rules.iter().any(|r| r.name == *name) && !is_child(name) {
            return Err(Error::invalid(
                path,
                format!("unexpected parameter \"{}\"", name),
            ));
        }
    }

    for rule in rules {
        let value = match object.get(&rule.name) {
            None | Some(Value::Null) if rule.required => return Err(missing(path, &rule.name)),
            None => continue,
            Some(value) => value,
        };
        let field_path = format!("{}/{}", path, rule.name);
        let coerced = rule
            .field_type
            .coerce(value)
            .ok_or_else(|| Error::invalid(&field_path, rule.field_type.expectation()))?;

        if let (Some(allowed), Value::Int(v)) = (&rule.allowed, &coerced) {
            if !allowed.contains(v) {
                let list: Vec<String> = allowed.iter().map(i64::to_string).collect();
                return Err(Error::invalid(
                    &field_path,
                    format!("value must be one of {}", list.join(", ")),
                ));
            }
        }
        if let (Some(max), Value::String(s)) = (rule.max_len, &coerced) {
            if s.chars().count() > max {
                return Err(Error::invalid(&field_path, "value is too long"));
            }
        }
    }
    Ok(())
}
