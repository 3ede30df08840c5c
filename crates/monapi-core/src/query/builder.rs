//! SELECT construction from normalized options and an entity descriptor.
//!
//! Each option category contributes independently to a [`QueryParts`]
//! accumulator; the result is rendered once by [`SqlWriter`].

use super::condition::{condition_id, condition_int, condition_string, like, search_pattern, tag_condition};
use super::parts::{LeftJoin, QueryParts};
use super::predicate::{CompareOp, Predicate};
use super::render::{Sql, SqlWriter};
use crate::catalog::{EntityDescriptor, FieldDef, FieldType, OptionDef, OptionKind};
use crate::error::{Error, Result};
use crate::security::PermissionScope;
use monapi_proto::{GetOptions, OptionValue, Output, Value};

/// Name of the synthetic count column.
pub const ROWSCOUNT: &str = "rowscount";

/// A rendered query plus the fields to drop from its rows afterwards.
#[derive(Debug, Clone)]
pub struct SelectPlan {
    /// Accumulated query sections.
    pub parts: QueryParts,
    /// Rendered SQL.
    pub sql: Sql,
    /// Fields selected for internal use only.
    pub strip: Vec<String>,
}

/// Builds SELECT statements for one entity.
pub struct QueryBuilder<'a> {
    entity: &'a EntityDescriptor,
    chunk_size: usize,
}

impl<'a> QueryBuilder<'a> {
    /// Create a builder rendering id sets in blocks of `chunk_size`.
    pub fn new(entity: &'a EntityDescriptor, chunk_size: usize) -> Self {
        Self { entity, chunk_size }
    }

    /// Build the query for `options` under a permission scope.
    pub fn build(&self, options: &GetOptions, scope: &PermissionScope) -> Result<SelectPlan> {
        let table = self.entity.table_for(options)?;
        let mut parts = QueryParts::new(table, &self.entity.alias);

        match scope {
            PermissionScope::Unrestricted => {}
            PermissionScope::Restricted(predicate) => {
                parts.filter_once("permission", predicate.clone())
            }
            PermissionScope::RejectAll => parts.filter_once("permission", Predicate::False),
        }

        for option in &self.entity.options {
            self.apply_option(&mut parts, option, options);
        }
        self.apply_filter(&mut parts, options)?;
        self.apply_search(&mut parts, options)?;

        let strip = if options.count_output {
            self.select_count(&mut parts, options);
            Vec::new()
        } else {
            let strip = self.select_output(&mut parts, options)?;
            self.apply_sort(&mut parts, options)?;
            strip
        };

        if !options.count_output || options.group_count {
            parts.limit = options.limit.map(|limit| limit.get());
        }

        let sql = SqlWriter::select(&parts);
        Ok(SelectPlan { parts, sql, strip })
    }

    fn apply_option(&self, parts: &mut QueryParts, def: &OptionDef, options: &GetOptions) {
        let name = def.name.as_str();
        match &def.kind {
            OptionKind::Ids { column, .. } => {
                if let Some(ids) = options.ids(name) {
                    parts.push_filter(condition_id(column, ids, self.chunk_size));
                }
            }
            OptionKind::IdsThrough { link, .. } => {
                if let Some(ids) = options.ids(name) {
                    parts.from.insert_once(link.table.as_str(), link.from_entry());
                    parts.filter_once(
                        format!("{}_link", link.alias),
                        Predicate::columns_eq(link.link(), link.base_column.as_str()),
                    );
                    parts.push_filter(condition_id(&link.target(), ids, self.chunk_size));
                }
            }
            OptionKind::Ints { column, .. } => {
                if let Some(values) = options.ints(name) {
                    parts.push_filter(condition_int(column, values, false, self.chunk_size));
                }
            }
            OptionKind::TimeFrom { column } => {
                if let Some(from) = options.int(name) {
                    parts.push_filter(Predicate::int(column.as_str(), CompareOp::Ge, from));
                }
            }
            OptionKind::TimeTill { column } => {
                if let Some(till) = options.int(name) {
                    parts.push_filter(Predicate::int(column.as_str(), CompareOp::Le, till));
                }
            }
            OptionKind::Tags {
                source,
                eval_option,
            } => {
                if let Some(tags) = options.tags(name) {
                    if !tags.is_empty() {
                        let eval = options.eval_type(eval_option);
                        parts.push_filter(tag_condition(source, tags, eval));
                    }
                }
            }
            OptionKind::Bool { column } => {
                if let Some(OptionValue::Bool(flag)) = options.param(name) {
                    parts.push_filter(Predicate::int(
                        column.as_str(),
                        CompareOp::Eq,
                        i64::from(*flag),
                    ));
                }
            }
            OptionKind::NullUnlessSet { column } => {
                if !options.flag(name) {
                    parts.push_filter(Predicate::is_null(column.as_str()));
                }
            }
            OptionKind::EvalType | OptionKind::TableSelector => {}
        }
    }

    fn field(&self, name: &str) -> Result<&'a FieldDef> {
        self.entity.field(name).ok_or_else(|| {
            Error::invalid(format!(
                "Field \"{}\" does not exist in \"{}\".",
                name, self.entity.name
            ))
        })
    }

    /// Column expression of a field, left-joining its table when needed.
    fn column(&self, parts: &mut QueryParts, field: &FieldDef) -> Result<String> {
        if let Some(alias) = &field.joined {
            let join = self.entity.left_join(alias).ok_or_else(|| {
                Error::internal(format!("no left join \"{}\" on \"{}\"", alias, self.entity.name))
            })?;
            parts.left_join.insert_once(
                alias.as_str(),
                LeftJoin {
                    table: join.table.clone(),
                    alias: join.alias.clone(),
                    on: Predicate::columns_eq(
                        join.base_column.as_str(),
                        format!("{}.{}", join.alias, join.column),
                    ),
                },
            );
        }
        Ok(field.qualified(&self.entity.alias))
    }

    fn apply_filter(&self, parts: &mut QueryParts, options: &GetOptions) -> Result<()> {
        let Some(filter) = &options.filter else {
            return Ok(());
        };

        let mut conditions = Vec::new();
        for (name, values) in filter {
            let field = self.field(name)?;
            let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
            if present.is_empty() && !values.is_empty() {
                continue;
            }
            let column = self.column(parts, field)?;
            let condition = match field.field_type {
                FieldType::Id | FieldType::Int => {
                    let ints: Vec<i64> = present.iter().filter_map(|v| v.as_i64()).collect();
                    condition_int(&column, &ints, false, self.chunk_size)
                }
                FieldType::String | FieldType::Text => {
                    let strings: Vec<String> = present.iter().map(|v| v.to_string()).collect();
                    condition_string(&column, &strings, false)
                }
                FieldType::Float => Predicate::or(
                    present
                        .iter()
                        .filter_map(|v| v.as_f64())
                        .map(|f| Predicate::param(column.as_str(), CompareOp::Eq, f))
                        .collect(),
                ),
            };
            conditions.push(condition);
        }
        push_combined(parts, conditions, options.search_by_any);
        Ok(())
    }

    fn apply_search(&self, parts: &mut QueryParts, options: &GetOptions) -> Result<()> {
        let Some(search) = &options.search else {
            return Ok(());
        };

        let mut conditions = Vec::new();
        for (name, patterns) in search {
            let field = self.field(name)?;
            let column = self.column(parts, field)?;
            let likes: Vec<Predicate> = patterns
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| {
                    let pattern =
                        search_pattern(p, options.start_search, options.search_wildcards_enabled);
                    like(&column, pattern, options.exclude_search)
                })
                .collect();
            if likes.is_empty() {
                continue;
            }
            conditions.push(if options.exclude_search {
                Predicate::and(likes)
            } else {
                Predicate::or(likes)
            });
        }
        push_combined(parts, conditions, options.search_by_any);
        Ok(())
    }

    fn select_count(&self, parts: &mut QueryParts, options: &GetOptions) {
        if options.group_count {
            for def in &self.entity.options {
                let column = match &def.kind {
                    OptionKind::Ids {
                        column,
                        group_by: true,
                    } => column.clone(),
                    OptionKind::IdsThrough {
                        link,
                        group_by: true,
                    } => link.target(),
                    _ => continue,
                };
                if options.param(&def.name).is_none() {
                    continue;
                }
                let key = column.rsplit('.').next().unwrap_or(&column).to_string();
                parts.add_select(key.clone(), format!("{} AS {}", column, key));
                parts.group.push(column);
            }
        }

        let count = match &self.entity.pk {
            Some(pk) => format!("COUNT(DISTINCT {}.{}) AS {}", self.entity.alias, pk, ROWSCOUNT),
            None => format!("COUNT(*) AS {}", ROWSCOUNT),
        };
        parts.add_select(ROWSCOUNT, count);
    }

    /// Select requested fields plus the ones needed internally; returns the
    /// internal ones.
    fn select_output(&self, parts: &mut QueryParts, options: &GetOptions) -> Result<Vec<String>> {
        let mut selected: Vec<&FieldDef> = match &options.output {
            Output::Extend => self.entity.output_fields().collect(),
            Output::Fields(names) => names
                .iter()
                .map(|n| self.field(n))
                .collect::<Result<Vec<_>>>()?,
            Output::Count => Vec::new(),
        };

        let mut internal: Vec<String> = Vec::new();
        if let Some(pk) = &self.entity.pk {
            internal.push(pk.clone());
        }
        for resolver in &self.entity.resolvers {
            if options.selection(resolver.option()).is_some() {
                internal.extend(resolver.required_fields());
            }
        }
        internal.extend(options.sort.iter().map(|s| s.field.clone()));

        let mut strip = Vec::new();
        for name in internal {
            if selected.iter().any(|f| f.name == name) {
                continue;
            }
            selected.push(self.field(&name)?);
            strip.push(name);
        }

        for field in selected {
            let column = self.column(parts, field)?;
            let expr = if field.column == field.name {
                column
            } else {
                format!("{} AS {}", column, field.name)
            };
            parts.add_select(field.name.as_str(), expr);
        }
        Ok(strip)
    }

    fn apply_sort(&self, parts: &mut QueryParts, options: &GetOptions) -> Result<()> {
        for spec in &options.sort {
            if !self.entity.sort_columns.iter().any(|c| *c == spec.field) {
                return Err(Error::invalid(format!(
                    "Sorting by field \"{}\" not allowed.",
                    spec.field
                )));
            }
            let column = self.column(parts, self.field(&spec.field)?)?;
            parts
                .order
                .push(format!("{} {}", column, spec.order.as_sql()));
        }
        Ok(())
    }
}

fn push_combined(parts: &mut QueryParts, conditions: Vec<Predicate>, any: bool) {
    if conditions.is_empty() {
        return;
    }
    if any {
        parts.push_filter(Predicate::or(conditions));
    } else {
        for condition in conditions {
            parts.push_filter(condition);
        }
    }
}
