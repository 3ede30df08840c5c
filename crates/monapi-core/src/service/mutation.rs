//! `create`, `update` and `delete`.
//!
//! Every mutation runs in one transaction. Targets are looked up through the
//! regular `get` pipeline with `editable` set, so an invisible target and a
//! missing one fail the same way. The audit record is written before commit;
//! a failing audit sink rolls the whole mutation back.

use super::validator::InputSchema;
use super::ApiService;
use crate::catalog::{ChildKind, EntityDescriptor, FieldDef};
use crate::error::{Error, Result};
use crate::query::{condition_id, write, CompareOp, Predicate, QueryParts, SqlWriter};
use crate::security::{AuditAction, AuditRecord, Method, UserContext};
use monapi_proto::{GetOptions, Id, MutationResult, Output, Row, Value};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

impl<'a> ApiService<'a> {
    /// `entity.create` with one object or an array of objects.
    pub fn create(&self, user: &UserContext, entity: &str, params: &Json) -> Result<MutationResult> {
        let entity = self.authorize(user, entity, Method::Create)?;
        entity.require_pk()?;
        let input = input_objects(params)?;
        self.validator
            .validate(&InputSchema::for_entity(entity, Method::Create), &input)?;

        let values = input
            .iter()
            .map(|object| base_values(entity, object, true))
            .collect::<Result<Vec<_>>>()?;

        let ids = self.in_transaction(entity, AuditAction::Add, || {
            self.check_unique(user, entity, &values, &[])?;
            self.check_references(user, entity, &values)?;
            self.check_links(user, entity, &input)?;

            let mut ids = Vec::with_capacity(input.len());
            for (object, row) in input.iter().zip(&values) {
                let id = self.store.insert(&write::insert(&entity.table, &columns(entity, row)))?;
                for companion in &entity.companions {
                    self.store.insert(&write::insert(
                        &companion.table,
                        &[(companion.column.clone(), id_value(id))],
                    ))?;
                }
                self.write_children(entity, id, object, false)?;
                ids.push(id);
            }

            let after = self.snapshot(user, entity, &ids)?;
            let record = AuditRecord::new(AuditAction::Add, &entity.name, user.user_id)
                .with_ids(ids.clone())
                .with_after(after);
            Ok((ids, record))
        })?;

        Ok(MutationResult::new(entity.id_field(), ids))
    }

    /// `entity.update` with one object or an array of objects, each carrying
    /// its primary key.
    pub fn update(&self, user: &UserContext, entity: &str, params: &Json) -> Result<MutationResult> {
        let entity = self.authorize(user, entity, Method::Update)?;
        let pk = entity.require_pk()?;
        let input = input_objects(params)?;
        self.validator
            .validate(&InputSchema::for_entity(entity, Method::Update), &input)?;

        let ids = self.in_transaction(entity, AuditAction::Update, || {
            let mut targets: Vec<Id> = Vec::with_capacity(input.len());
            for object in &input {
                let id = match object.get(pk).and_then(Value::as_id) {
                    Some(id) => id,
                    None if entity.singleton => self.singleton_id(user, entity)?,
                    None => return Err(Error::no_such_object()),
                };
                targets.push(id);
            }

            let before = self.editable_targets(user, entity, &targets)?;
            let values = input
                .iter()
                .map(|object| {
                    let mut row = base_values(entity, object, false)?;
                    row.remove(pk);
                    Ok(row)
                })
                .collect::<Result<Vec<_>>>()?;

            let existing: Vec<Row> = targets
                .iter()
                .map(|id| before.get(id).cloned().unwrap_or_default())
                .collect();
            self.check_unique(user, entity, &values, &existing_with_ids(&targets, existing))?;
            self.check_references(user, entity, &values)?;
            self.check_links(user, entity, &input)?;

            for ((object, row), id) in input.iter().zip(&values).zip(&targets) {
                if !row.is_empty() {
                    self.store.execute(&write::update(
                        &entity.table,
                        &columns(entity, row),
                        &Predicate::int(pk, CompareOp::Eq, id_int(*id)),
                    ))?;
                }
                self.write_children(entity, *id, object, true)?;
            }

            let after = self.snapshot(user, entity, &targets)?;
            let record = AuditRecord::new(AuditAction::Update, &entity.name, user.user_id)
                .with_ids(targets.clone())
                .with_before(before.into_values().collect())
                .with_after(after);
            Ok((targets, record))
        })?;

        Ok(MutationResult::new(entity.id_field(), ids))
    }

    /// `entity.delete` with an array of ids.
    pub fn delete(&self, user: &UserContext, entity: &str, params: &Json) -> Result<MutationResult> {
        let entity = self.authorize(user, entity, Method::Delete)?;
        let pk = entity.require_pk()?;
        let ids = input_ids(params)?;

        self.in_transaction(entity, AuditAction::Delete, || {
            let before = self.editable_targets(user, entity, &ids)?;
            self.check_restrictions(entity, &ids, &before)?;

            let chunk = self.config.in_chunk_size;
            for child in &entity.children {
                match &child.kind {
                    ChildKind::Rows(table) => {
                        self.store.execute(&write::delete(
                            &table.table,
                            &condition_id(&table.foreign_key, &ids, chunk),
                        ))?;
                    }
                    ChildKind::Links { table, column, .. } => {
                        self.store.execute(&write::update(
                            table,
                            &[(column.clone(), Value::Null)],
                            &condition_id(column, &ids, chunk),
                        ))?;
                    }
                }
            }
            for companion in &entity.companions {
                self.store.execute(&write::delete(
                    &companion.table,
                    &condition_id(&companion.column, &ids, chunk),
                ))?;
            }
            self.store
                .execute(&write::delete(&entity.table, &condition_id(pk, &ids, chunk)))?;

            let record = AuditRecord::new(AuditAction::Delete, &entity.name, user.user_id)
                .with_ids(ids.clone())
                .with_before(before.into_values().collect());
            Ok(((), record))
        })?;

        Ok(MutationResult::new(entity.id_field(), ids))
    }

    /// Run `body` in a transaction, record its audit entry and commit.
    fn in_transaction<T>(
        &self,
        entity: &EntityDescriptor,
        action: AuditAction,
        body: impl FnOnce() -> Result<(T, AuditRecord)>,
    ) -> Result<T> {
        self.store.begin()?;
        let outcome = body().and_then(|(value, record)| {
            if self.config.audit_enabled {
                self.audit.record(&record)?;
            }
            Ok((value, record.ids.len()))
        });

        match outcome {
            Ok((value, count)) => {
                self.store.commit()?;
                info!(entity = %entity.name, %action, count, "mutation committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.store.rollback() {
                    warn!(entity = %entity.name, error = %rollback, "rollback failed");
                }
                warn!(entity = %entity.name, %action, error = %err, "mutation rolled back");
                Err(err)
            }
        }
    }

    /// Stored rows of `ids` the caller may write, keyed by id. Any missing id
    /// fails the whole call.
    fn editable_targets(
        &self,
        user: &UserContext,
        entity: &EntityDescriptor,
        ids: &[Id],
    ) -> Result<BTreeMap<Id, Row>> {
        let options = match &entity.id_option {
            Some(option) => GetOptions::new().with_ids(option.clone(), ids.to_vec()),
            None => GetOptions::new(),
        };
        let found: BTreeMap<Id, Row> = self
            .lookup(user, entity, options.with_output(Output::Extend).editable())?
            .into_iter()
            .collect();
        if ids.iter().any(|id| !found.contains_key(id)) {
            return Err(Error::no_such_object());
        }
        Ok(found)
    }

    fn singleton_id(&self, user: &UserContext, entity: &EntityDescriptor) -> Result<Id> {
        self.lookup(
            user,
            entity,
            GetOptions::new().with_output(Output::Fields(Vec::new())).editable(),
        )?
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(Error::no_such_object)
    }

    fn snapshot(&self, user: &UserContext, entity: &EntityDescriptor, ids: &[Id]) -> Result<Vec<Row>> {
        let Some(option) = &entity.id_option else {
            return Ok(Vec::new());
        };
        let options = GetOptions::new()
            .with_ids(option.clone(), ids.to_vec())
            .no_permissions();
        Ok(self
            .lookup(user, entity, options)?
            .into_iter()
            .map(|(_, row)| row)
            .collect())
    }

    /// Stored rows must not repeat a unique field combination. `existing`
    /// holds the stored row of each object on update, including its id.
    fn check_unique(
        &self,
        user: &UserContext,
        entity: &EntityDescriptor,
        values: &[Row],
        existing: &[(Id, Row)],
    ) -> Result<()> {
        for fields in &entity.unique {
            for (i, row) in values.iter().enumerate() {
                let own = existing.get(i);
                if own.is_some() && !fields.iter().any(|f| row.contains_key(f)) {
                    continue;
                }

                let mut options = GetOptions::new()
                    .with_output(Output::Fields(fields.clone()))
                    .no_permissions();
                let mut key = Vec::with_capacity(fields.len());
                for field in fields {
                    let value = row
                        .get(field)
                        .or_else(|| own.and_then(|(_, stored)| stored.get(field)))
                        .cloned()
                        .unwrap_or(Value::Null);
                    key.push(value.to_string());
                    options = options.with_filter(field.clone(), vec![value]);
                }

                let clash = self
                    .lookup(user, entity, options)?
                    .into_iter()
                    .any(|(id, _)| own.map_or(true, |(own_id, _)| *own_id != id));
                if clash {
                    let shown = entity
                        .name_field
                        .as_ref()
                        .and_then(|f| row.get(f).or_else(|| own.and_then(|(_, s)| s.get(f))))
                        .map(Value::to_string)
                        .unwrap_or_else(|| key.join(", "));
                    return Err(Error::conflict(format!(
                        "{} \"{}\" already exists.",
                        entity.label, shown
                    )));
                }
            }
        }
        Ok(())
    }

    /// Referenced objects must exist and be writable by the caller.
    fn check_references(
        &self,
        user: &UserContext,
        entity: &EntityDescriptor,
        values: &[Row],
    ) -> Result<()> {
        for field in entity.fields.iter().filter(|f| f.writable) {
            let Some(target) = &field.references else {
                continue;
            };
            let ids = referenced_ids(values.iter().filter_map(|row| row.get(&field.name)));
            self.check_editable(user, target, ids)?;
        }
        Ok(())
    }

    /// Objects attached through link collections must be writable.
    fn check_links(&self, user: &UserContext, entity: &EntityDescriptor, input: &[Row]) -> Result<()> {
        for child in &entity.children {
            let ChildKind::Links { target, pk, .. } = &child.kind else {
                continue;
            };
            let ids = referenced_ids(
                input
                    .iter()
                    .filter_map(|object| object.get(&child.field))
                    .filter_map(Value::as_list)
                    .flatten()
                    .filter_map(Value::as_object)
                    .filter_map(|item| item.get(pk)),
            );
            self.check_editable(user, target, ids)?;
        }
        Ok(())
    }

    fn check_editable(&self, user: &UserContext, target: &str, ids: Vec<Id>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let target = self.catalog.entity(target)?;
        self.editable_targets(user, target, &ids).map(|_| ())
    }

    /// Fail when another table still references one of `ids`.
    fn check_restrictions(
        &self,
        entity: &EntityDescriptor,
        ids: &[Id],
        before: &BTreeMap<Id, Row>,
    ) -> Result<()> {
        for restriction in &entity.delete_restrictions {
            let mut parts = QueryParts::new(&restriction.table, "t");
            parts.add_select(
                "referrer",
                format!("t.{} AS referrer", restriction.name_column),
            );
            parts.add_select("target", format!("t.{} AS target", restriction.column));
            parts.push_filter(condition_id(
                &format!("t.{}", restriction.column),
                ids,
                self.config.in_chunk_size,
            ));
            parts.limit = Some(1);

            let rows = self.store.select(&SqlWriter::select(&parts))?;
            let Some(row) = rows.first() else {
                continue;
            };
            let referrer = row.get("referrer").map(Value::to_string).unwrap_or_default();
            let target = row
                .get("target")
                .and_then(Value::as_id)
                .and_then(|id| before.get(&id))
                .and_then(|stored| {
                    entity
                        .name_field
                        .as_ref()
                        .and_then(|f| stored.get(f))
                })
                .map(Value::to_string)
                .unwrap_or_default();
            return Err(Error::conflict(restriction.describe(&referrer, &target)));
        }
        Ok(())
    }

    /// Write nested collections of one object. On update, present collections
    /// replace the stored ones; absent ones are left alone.
    fn write_children(
        &self,
        entity: &EntityDescriptor,
        id: Id,
        object: &Row,
        replace: bool,
    ) -> Result<()> {
        for child in &entity.children {
            let Some(Value::List(items)) = object.get(&child.field) else {
                continue;
            };
            match &child.kind {
                ChildKind::Rows(table) => {
                    let owner = Predicate::int(table.foreign_key.as_str(), CompareOp::Eq, id_int(id));
                    if replace {
                        self.store.execute(&write::delete(&table.table, &owner))?;
                    }
                    for (position, item) in items.iter().filter_map(Value::as_object).enumerate() {
                        let mut values = vec![(table.foreign_key.clone(), id_value(id))];
                        if let Some(ordinal) = &table.ordinal {
                            values.push((ordinal.clone(), Value::Int(position as i64)));
                        }
                        for field in table.fields.iter().filter(|f| f.writable) {
                            if let Some(value) = field_value(field, item.get(&field.name), true)? {
                                values.push((field.column.clone(), value));
                            }
                        }
                        self.store.insert(&write::insert(&table.table, &values))?;
                    }
                }
                ChildKind::Links {
                    table, pk, column, ..
                } => {
                    if replace {
                        self.store.execute(&write::update(
                            table,
                            &[(column.clone(), Value::Null)],
                            &Predicate::int(column.as_str(), CompareOp::Eq, id_int(id)),
                        ))?;
                    }
                    let linked = referenced_ids(
                        items
                            .iter()
                            .filter_map(Value::as_object)
                            .filter_map(|item| item.get(pk)),
                    );
                    if !linked.is_empty() {
                        self.store.execute(&write::update(
                            table,
                            &[(column.clone(), id_value(id))],
                            &condition_id(pk, &linked, self.config.in_chunk_size),
                        ))?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Normalize create/update params to a list of objects.
fn input_objects(params: &Json) -> Result<Vec<Row>> {
    let items = match params {
        Json::Object(_) => vec![params],
        Json::Array(items) if !items.is_empty() => items.iter().collect(),
        Json::Array(_) => {
            return Err(monapi_proto::Error::invalid("/", "cannot be empty").into())
        }
        _ => return Err(monapi_proto::Error::invalid("/", "an array is expected").into()),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match Value::from_json(item) {
            Value::Object(row) => Ok(row),
            _ => Err(Error::from(monapi_proto::Error::invalid(
                format!("/{}", i + 1),
                "an object is expected",
            ))),
        })
        .collect()
}

/// Normalize delete params to a unique, non-empty id list.
fn input_ids(params: &Json) -> Result<Vec<Id>> {
    let Json::Array(items) = params else {
        return Err(monapi_proto::Error::invalid("/", "an array is expected").into());
    };
    if items.is_empty() {
        return Err(monapi_proto::Error::invalid("/", "cannot be empty").into());
    }
    let mut seen = HashSet::with_capacity(items.len());
    let mut ids = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("/{}", i + 1);
        let id = Value::from_json(item)
            .as_id()
            .ok_or_else(|| monapi_proto::Error::invalid(&path, "a number is expected"))?;
        if !seen.insert(id) {
            return Err(monapi_proto::Error::invalid(
                &path,
                format!("value ({}) already exists", id),
            )
            .into());
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Coerce a field value; fill defaults on create.
fn field_value(field: &FieldDef, value: Option<&Value>, creating: bool) -> Result<Option<Value>> {
    match value {
        Some(value) => field
            .field_type
            .coerce(value)
            .map(Some)
            .ok_or_else(|| Error::invalid(format!("Invalid value for \"{}\".", field.name))),
        None if creating => Ok(field.default.as_ref().map(|d| d.resolve())),
        None => Ok(None),
    }
}

/// Base-table values of an input object, keyed by field name.
fn base_values(entity: &EntityDescriptor, object: &Row, creating: bool) -> Result<Row> {
    let mut row = Row::new();
    for field in &entity.fields {
        if field.joined.is_some() {
            continue;
        }
        let given = if field.writable || entity.pk.as_deref() == Some(field.name.as_str()) {
            object.get(&field.name)
        } else {
            None
        };
        if let Some(value) = field_value(field, given, creating)? {
            row.insert(field.name.clone(), value);
        }
    }
    if creating {
        if let Some(pk) = &entity.pk {
            row.remove(pk);
        }
    }
    Ok(row)
}

/// Map field names to column names.
fn columns(entity: &EntityDescriptor, row: &Row) -> Vec<(String, Value)> {
    row.iter()
        .map(|(name, value)| {
            let column = entity
                .field(name)
                .map(|f| f.column.clone())
                .unwrap_or_else(|| name.clone());
            (column, value.clone())
        })
        .collect()
}

fn existing_with_ids(ids: &[Id], rows: Vec<Row>) -> Vec<(Id, Row)> {
    ids.iter().copied().zip(rows).collect()
}

/// Unique non-zero ids, in first-seen order.
fn referenced_ids<'v>(values: impl Iterator<Item = &'v Value>) -> Vec<Id> {
    let mut seen = HashSet::new();
    values
        .filter_map(Value::as_id)
        .filter(|id| *id != 0 && seen.insert(*id))
        .collect()
}

fn id_int(id: Id) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

fn id_value(id: Id) -> Value {
    Value::Int(id_int(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_objects() {
        assert_eq!(input_objects(&json!({"name": "a"})).unwrap().len(), 1);
        assert_eq!(input_objects(&json!([{"name": "a"}, {"name": "b"}])).unwrap().len(), 2);
        assert!(input_objects(&json!([])).is_err());
        assert!(input_objects(&json!([1])).is_err());
        assert!(input_objects(&json!("x")).is_err());
    }

    #[test]
    fn test_input_ids() {
        assert_eq!(input_ids(&json!(["5", 6])).unwrap(), vec![5, 6]);
        assert!(input_ids(&json!([5, "5"])).is_err());
        assert!(input_ids(&json!([])).is_err());
        assert!(input_ids(&json!(5)).is_err());
        assert!(input_ids(&json!(["-1"])).is_err());
    }

    #[test]
    fn test_referenced_ids_skip_zero_and_repeats() {
        let values = [Value::Int(3), Value::Int(0), Value::from("3"), Value::Null, Value::Int(4)];
        assert_eq!(referenced_ids(values.iter()), vec![3, 4]);
    }
}
