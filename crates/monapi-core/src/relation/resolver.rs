//! Related-object resolvers.
//!
//! A resolver attaches one output field to every row of an already
//! permission-filtered base result. Resolvers that expand into another entity
//! issue a nested `get` through [`RelatedSource`] with permission checks
//! disabled, since the parent rows already proved visibility.

use super::map::RelationMap;
use crate::catalog::{Cardinality, Catalog, ChildTable, RelationDef, RelationSource};
use crate::error::{Error, Result};
use crate::query::{condition_id, QueryParts, Sql, SqlWriter};
use monapi_proto::{GetOptions, GetResult, Id, Output, Row, Value};
use std::collections::HashMap;

/// Column aliases used by association queries.
pub const BASE_ID: &str = "baseid";
pub const RELATED_ID: &str = "relatedid";

/// What resolvers may call back into.
pub trait RelatedSource {
    /// Nested `get` on another entity.
    fn get(&self, entity: &str, options: GetOptions) -> Result<GetResult>;

    /// Raw association query.
    fn select(&self, sql: &Sql) -> Result<Vec<Row>>;

    /// Ids per IN block.
    fn chunk_size(&self) -> usize;
}

/// Attaches one related field to base rows.
pub trait RelatedResolver: std::fmt::Debug + Send + Sync {
    /// Option key, e.g. `selectHosts`.
    fn option(&self) -> &str;

    /// Output field set on each base row.
    fn field(&self) -> &str;

    /// Whether `"count"` is accepted.
    fn count_allowed(&self) -> bool {
        false
    }

    /// Entity fetched by the nested call, if any.
    fn target(&self) -> Option<&str> {
        None
    }

    /// Base fields the resolver reads; selected even when not requested and
    /// stripped afterwards.
    fn required_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Check a selection against what the resolver can return.
    fn validate_selection(&self, catalog: &Catalog, selection: &Output) -> Result<()> {
        match selection {
            Output::Count if !self.count_allowed() => Err(invalid_count(self.option())),
            Output::Fields(fields) => match self.target() {
                Some(target) => {
                    let entity = catalog.entity(target)?;
                    check_fields(self.option(), fields, |f| entity.is_output_field(f))
                }
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Attach the field to `rows`.
    fn resolve(
        &self,
        source: &dyn RelatedSource,
        selection: &Output,
        rows: &mut [(Id, Row)],
    ) -> Result<()>;
}

fn invalid_count(option: &str) -> Error {
    Error::from(monapi_proto::Error::invalid(
        format!("/{}", option),
        "value must be \"extend\" or an array of field names",
    ))
}

fn check_fields(option: &str, fields: &[String], known: impl Fn(&str) -> bool) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if !known(field) {
            return Err(Error::from(monapi_proto::Error::invalid(
                format!("/{}/{}", option, i + 1),
                format!("value must be one of the output fields, got \"{}\"", field),
            )));
        }
    }
    Ok(())
}

/// Keys of a base result.
pub fn base_ids(rows: &[(Id, Row)]) -> Vec<Id> {
    rows.iter().map(|(id, _)| *id).collect()
}

/// Read (base, related) pairs from rows produced by an association query
/// selecting [`BASE_ID`] and [`RELATED_ID`].
pub fn pairs_from_rows(rows: &[Row]) -> RelationMap {
    RelationMap::from_pairs(rows.iter().filter_map(|row| {
        let base = row.get(BASE_ID).and_then(Value::as_id)?;
        let related = row.get(RELATED_ID).and_then(Value::as_id)?;
        Some((base, related))
    }))
}

/// Association query on a link table.
pub fn association_query(
    table: &str,
    local: &str,
    foreign: &str,
    base_ids: &[Id],
    chunk_size: usize,
) -> Sql {
    let mut parts = QueryParts::new(table, "l");
    parts.add_select(BASE_ID, format!("l.{} AS {}", local, BASE_ID));
    parts.add_select(RELATED_ID, format!("l.{} AS {}", foreign, RELATED_ID));
    parts.push_filter(condition_id(&format!("l.{}", local), base_ids, chunk_size));
    parts.order.push(format!("l.{}", foreign));
    SqlWriter::select(&parts)
}

/// Nested `get` for related ids, returning keyed rows.
pub fn fetch_related(
    source: &dyn RelatedSource,
    target: &str,
    target_ids: &str,
    ids: Vec<Id>,
    output: Output,
) -> Result<Vec<(Id, Row)>> {
    let options = GetOptions::new()
        .with_output(output)
        .with_ids(target_ids, ids)
        .no_permissions()
        .preserve_keys();
    match source.get(target, options)? {
        GetResult::Keyed(rows) => Ok(rows),
        other => Err(Error::internal(format!(
            "nested get on \"{}\" returned {} unkeyed rows",
            target,
            other.len()
        ))),
    }
}

/// Resolver backed by a [`RelationDef`].
#[derive(Debug, Clone)]
pub struct RelationResolver {
    def: RelationDef,
}

impl RelationResolver {
    /// Wrap a relation definition.
    pub fn new(def: RelationDef) -> Self {
        Self { def }
    }

    fn relation_map(&self, source: &dyn RelatedSource, rows: &[(Id, Row)]) -> Result<RelationMap> {
        match &self.def.source {
            RelationSource::LocalColumn(column) => Ok(RelationMap::from_rows(rows, column)),
            RelationSource::Through {
                table,
                local,
                foreign,
            } => {
                let sql = association_query(table, local, foreign, &base_ids(rows), source.chunk_size());
                Ok(pairs_from_rows(&source.select(&sql)?))
            }
        }
    }
}

impl RelatedResolver for RelationResolver {
    fn option(&self) -> &str {
        &self.def.option
    }

    fn field(&self) -> &str {
        &self.def.field
    }

    fn count_allowed(&self) -> bool {
        self.def.count_allowed
    }

    fn target(&self) -> Option<&str> {
        Some(&self.def.target)
    }

    fn required_fields(&self) -> Vec<String> {
        match &self.def.source {
            RelationSource::LocalColumn(column) => vec![column.clone()],
            RelationSource::Through { .. } => Vec::new(),
        }
    }

    fn resolve(
        &self,
        source: &dyn RelatedSource,
        selection: &Output,
        rows: &mut [(Id, Row)],
    ) -> Result<()> {
        let map = self.relation_map(source, rows)?;
        let output = match selection {
            Output::Count => Output::Fields(Vec::new()),
            other => other.clone(),
        };
        let related = if map.is_empty() {
            Vec::new()
        } else {
            fetch_related(
                source,
                &self.def.target,
                &self.def.target_ids,
                map.related_ids(),
                output,
            )?
        };

        match (selection, self.def.cardinality) {
            (Output::Count, _) => {
                let visible: Vec<Id> = related.iter().map(|(id, _)| *id).collect();
                map.map_count(rows, &visible, &self.def.field);
            }
            (_, Cardinality::One) => map.map_one(rows, &related, &self.def.field),
            (_, Cardinality::Many) => map.map_many(rows, &related, &self.def.field),
        }
        Ok(())
    }
}

/// Resolver listing rows of a child table owned by each base row.
#[derive(Debug, Clone)]
pub struct ChildRowsResolver {
    option: String,
    field: String,
    table: ChildTable,
}

impl ChildRowsResolver {
    /// Create a resolver.
    pub fn new(option: impl Into<String>, field: impl Into<String>, table: ChildTable) -> Self {
        Self {
            option: option.into(),
            field: field.into(),
            table,
        }
    }

    fn query(&self, selection: &Output, base_ids: &[Id], chunk_size: usize) -> Sql {
        let mut parts = QueryParts::new(&self.table.table, "c");
        parts.add_select(
            BASE_ID,
            format!("c.{} AS {}", self.table.foreign_key, BASE_ID),
        );
        for field in &self.table.fields {
            if selection.is_requested(&field.name) {
                parts.add_select(
                    field.name.as_str(),
                    format!("c.{} AS {}", field.column, field.name),
                );
            }
        }
        parts.push_filter(condition_id(
            &format!("c.{}", self.table.foreign_key),
            base_ids,
            chunk_size,
        ));
        if let Some(ordinal) = &self.table.ordinal {
            parts.order.push(format!("c.{}", ordinal));
        }
        if let Some(pk) = &self.table.pk {
            parts.order.push(format!("c.{}", pk));
        }
        SqlWriter::select(&parts)
    }
}

impl RelatedResolver for ChildRowsResolver {
    fn option(&self) -> &str {
        &self.option
    }

    fn field(&self) -> &str {
        &self.field
    }

    fn validate_selection(&self, _catalog: &Catalog, selection: &Output) -> Result<()> {
        match selection {
            Output::Count => Err(invalid_count(&self.option)),
            Output::Fields(fields) => {
                check_fields(&self.option, fields, |f| self.table.field(f).is_some())
            }
            Output::Extend => Ok(()),
        }
    }

    fn resolve(
        &self,
        source: &dyn RelatedSource,
        selection: &Output,
        rows: &mut [(Id, Row)],
    ) -> Result<()> {
        let sql = self.query(selection, &base_ids(rows), source.chunk_size());
        let mut grouped: HashMap<Id, Vec<Value>> = HashMap::new();
        for mut child in source.select(&sql)? {
            let owner = child.remove(BASE_ID).and_then(|v| v.as_id());
            if let Some(owner) = owner {
                grouped.entry(owner).or_default().push(Value::Object(child));
            }
        }
        for (id, row) in rows.iter_mut() {
            let children = grouped.remove(id).unwrap_or_default();
            row.insert(self.field.clone(), Value::List(children));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldDef;

    #[test]
    fn test_association_query() {
        let sql = association_query("hosts", "proxyid", "hostid", &[1, 2], 950);
        assert_eq!(
            sql.text,
            "SELECT l.proxyid AS baseid,l.hostid AS relatedid FROM hosts l \
             WHERE l.proxyid IN (1,2) ORDER BY l.hostid"
        );
    }

    #[test]
    fn test_pairs_from_rows() {
        let rows: Vec<Row> = vec![
            [(BASE_ID.to_string(), Value::Int(1)), (RELATED_ID.to_string(), Value::Int(5))]
                .into_iter()
                .collect(),
            [(BASE_ID.to_string(), Value::Null), (RELATED_ID.to_string(), Value::Int(6))]
                .into_iter()
                .collect(),
        ];
        let map = pairs_from_rows(&rows);
        assert_eq!(map.get(1), &[5]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_child_query_selects_requested_fields() {
        let resolver = ChildRowsResolver::new(
            "selectMappings",
            "mappings",
            ChildTable::new("icon_mapping", "iconmapid")
                .with_pk("iconmappingid")
                .with_ordinal("sortorder")
                .with_field(FieldDef::id("iconid").required())
                .with_field(FieldDef::string("expression").required()),
        );
        let sql = resolver.query(&Output::fields(["iconid"]), &[3], 950);
        assert_eq!(
            sql.text,
            "SELECT c.iconmapid AS baseid,c.iconid AS iconid FROM icon_mapping c \
             WHERE c.iconmapid=3 ORDER BY c.sortorder,c.iconmappingid"
        );
    }
}
