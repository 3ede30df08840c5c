//! Strict option normalization.
//!
//! JSON options are parsed into [`GetOptions`] in one pass: unknown keys,
//! malformed shapes and out-of-range values fail with `InvalidParameter`
//! before any query is built. Every option an entity declares ends up in
//! `params`, either with the caller's value, the declared default, or `None`
//! for "not specified".

use crate::catalog::{Catalog, EntityDescriptor, OptionKind};
use crate::error::{Error, Result};
use monapi_proto::{
    EvalType, GetOptions, Id, OptionValue, Output, SortOrder, SortSpec, TagFilter, TagOperator,
    Value,
};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// Option keys shared by every entity.
pub const UNIVERSAL_KEYS: &[&str] = &[
    "output",
    "countOutput",
    "groupCount",
    "preservekeys",
    "editable",
    "nopermissions",
    "filter",
    "search",
    "searchByAny",
    "startSearch",
    "excludeSearch",
    "searchWildcardsEnabled",
    "sortfield",
    "sortorder",
    "limit",
];

fn invalid(path: impl Into<String>, message: impl Into<String>) -> Error {
    Error::from(monapi_proto::Error::invalid(path, message))
}

/// Normalizes and validates options against the catalog.
pub struct OptionNormalizer<'a> {
    catalog: &'a Catalog,
}

impl<'a> OptionNormalizer<'a> {
    /// Create a normalizer.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Parse caller-supplied JSON options.
    pub fn normalize(&self, entity: &EntityDescriptor, json: &Json) -> Result<GetOptions> {
        let empty = Map::new();
        let object = match json {
            Json::Null => &empty,
            Json::Object(object) => object,
            _ => return Err(invalid("/", "an object is expected")),
        };

        let mut options = GetOptions::new();
        let mut sortfield: Vec<String> = Vec::new();
        let mut sortorder: Vec<SortOrder> = Vec::new();

        for (key, value) in object {
            let path = format!("/{}", key);
            match key.as_str() {
                "output" => options.output = parse_output(&path, value, false)?,
                "countOutput" => options.count_output = parse_flag(&path, value)?,
                "groupCount" => options.group_count = parse_flag(&path, value)?,
                "preservekeys" => options.preserve_keys = parse_flag(&path, value)?,
                "editable" => options.editable = parse_flag(&path, value)?,
                "nopermissions" => options.no_permissions = parse_flag(&path, value)?,
                "filter" => options.filter = parse_filter(&path, value)?,
                "search" => options.search = parse_search(&path, value)?,
                "searchByAny" => options.search_by_any = parse_flag(&path, value)?,
                "startSearch" => options.start_search = parse_flag(&path, value)?,
                "excludeSearch" => options.exclude_search = parse_flag(&path, value)?,
                "searchWildcardsEnabled" => {
                    options.search_wildcards_enabled = parse_flag(&path, value)?
                }
                "sortfield" => sortfield = parse_strings(&path, value)?,
                "sortorder" => sortorder = parse_sortorder(&path, value)?,
                "limit" => options.limit = parse_limit(&path, value)?,
                _ => {
                    let parsed = self.parse_entity_option(entity, key, &path, value)?;
                    options.params.insert(key.clone(), parsed);
                }
            }
        }

        options.sort = sortfield
            .into_iter()
            .enumerate()
            .map(|(i, field)| {
                let order = match sortorder.len() {
                    0 => SortOrder::Asc,
                    1 => sortorder[0],
                    _ => sortorder.get(i).copied().unwrap_or(SortOrder::Asc),
                };
                SortSpec { field, order }
            })
            .collect();

        self.complete(entity, options)
    }

    /// Validate typed options and fill every declared option.
    pub fn complete(&self, entity: &EntityDescriptor, mut options: GetOptions) -> Result<GetOptions> {
        self.validate(entity, &options)?;

        options.group_count = options.group_count && options.count_output;
        for def in &entity.options {
            let slot = options.params.entry(def.name.clone()).or_insert(None);
            if slot.is_none() {
                *slot = def.default.clone();
            }
        }
        for resolver in &entity.resolvers {
            options.params.entry(resolver.option().to_string()).or_insert(None);
        }
        Ok(options)
    }

    /// Check field names, option names and values against the entity.
    pub fn validate(&self, entity: &EntityDescriptor, options: &GetOptions) -> Result<()> {
        match &options.output {
            Output::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    if !entity.is_output_field(field) {
                        return Err(invalid(
                            format!("/output/{}", i + 1),
                            format!("value must be one of the output fields, got \"{}\"", field),
                        ));
                    }
                }
            }
            Output::Count => {
                return Err(invalid("/output", "value must be \"extend\" or an array"));
            }
            Output::Extend => {}
        }

        if let Some(filter) = &options.filter {
            for name in filter.keys() {
                if !entity.field(name).map_or(false, |f| f.filterable) {
                    return Err(invalid(
                        "/filter",
                        format!("unexpected parameter \"{}\"", name),
                    ));
                }
            }
        }
        if let Some(search) = &options.search {
            for name in search.keys() {
                if !entity.field(name).map_or(false, |f| f.is_searchable()) {
                    return Err(invalid(
                        "/search",
                        format!("unexpected parameter \"{}\"", name),
                    ));
                }
            }
        }
        for (i, spec) in options.sort.iter().enumerate() {
            if !entity.sort_columns.iter().any(|c| *c == spec.field) {
                return Err(invalid(
                    format!("/sortfield/{}", i + 1),
                    format!(
                        "value must be one of {}",
                        quoted_list(entity.sort_columns.iter().map(String::as_str))
                    ),
                ));
            }
        }

        for (name, value) in &options.params {
            let path = format!("/{}", name);
            if let Some(resolver) = entity.resolver(name) {
                match value {
                    Some(OptionValue::Output(selection)) => {
                        resolver.validate_selection(self.catalog, selection)?
                    }
                    Some(_) => return Err(invalid(path, "an output selection is expected")),
                    None => {}
                }
                continue;
            }
            let Some(def) = entity.option(name) else {
                return Err(invalid("/", format!("unexpected parameter \"{}\"", name)));
            };
            let Some(value) = value else { continue };
            check_value(entity, &def.kind, &path, value)?;
        }
        Ok(())
    }

    fn parse_entity_option(
        &self,
        entity: &EntityDescriptor,
        key: &str,
        path: &str,
        value: &Json,
    ) -> Result<Option<OptionValue>> {
        if value.is_null() {
            if entity.resolver(key).is_some() || entity.option(key).is_some() {
                return Ok(None);
            }
        }
        if let Some(resolver) = entity.resolver(key) {
            let selection = parse_output(path, value, resolver.count_allowed())?;
            return Ok(Some(OptionValue::Output(selection)));
        }
        let Some(def) = entity.option(key) else {
            return Err(invalid("/", format!("unexpected parameter \"{}\"", key)));
        };
        let parsed = match &def.kind {
            OptionKind::Ids { .. } | OptionKind::IdsThrough { .. } => {
                OptionValue::Ids(parse_ids(path, value)?)
            }
            OptionKind::Ints { .. } => OptionValue::Ints(parse_ints(path, value)?),
            OptionKind::TimeFrom { .. } | OptionKind::TimeTill { .. } | OptionKind::TableSelector => {
                OptionValue::Int(parse_int(path, value)?)
            }
            OptionKind::Tags { .. } => OptionValue::Tags(parse_tags(path, value)?),
            OptionKind::EvalType => {
                let code = parse_int(path, value)?;
                OptionValue::EvalType(
                    EvalType::from_code(code)
                        .ok_or_else(|| invalid(path, "value must be one of 0, 2"))?,
                )
            }
            OptionKind::Bool { .. } | OptionKind::NullUnlessSet { .. } => {
                OptionValue::Bool(parse_flag(path, value)?)
            }
        };
        Ok(Some(parsed))
    }
}

fn check_value(entity: &EntityDescriptor, kind: &OptionKind, path: &str, value: &OptionValue) -> Result<()> {
    let fits = match (kind, value) {
        (OptionKind::Ids { .. } | OptionKind::IdsThrough { .. }, OptionValue::Ids(_)) => true,
        (OptionKind::Ints { allowed, .. }, OptionValue::Ints(values)) => {
            if let Some(allowed) = allowed {
                if let Some(bad) = values.iter().find(|v| !allowed.contains(v)) {
                    return Err(invalid(
                        path,
                        format!(
                            "value must be one of {}, got {}",
                            joined(allowed.iter()),
                            bad
                        ),
                    ));
                }
            }
            true
        }
        (OptionKind::TimeFrom { .. } | OptionKind::TimeTill { .. }, OptionValue::Int(_)) => true,
        (OptionKind::TableSelector, OptionValue::Int(v)) => {
            if let Some(selector) = &entity.table_selector {
                if selector.table(*v).is_none() {
                    return Err(invalid(
                        path,
                        format!("value must be one of {}", joined(selector.values().iter())),
                    ));
                }
            }
            true
        }
        (OptionKind::Tags { .. }, OptionValue::Tags(_)) => true,
        (OptionKind::EvalType, OptionValue::EvalType(_)) => true,
        (OptionKind::Bool { .. } | OptionKind::NullUnlessSet { .. }, OptionValue::Bool(_)) => true,
        _ => false,
    };
    if fits {
        Ok(())
    } else {
        Err(invalid(path, "unexpected value type"))
    }
}

fn joined<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

fn quoted_list<'s>(values: impl Iterator<Item = &'s str>) -> String {
    joined(values.map(|v| format!("\"{}\"", v)))
}

/// Bool flag; `null` means unset.
fn parse_flag(path: &str, value: &Json) -> Result<bool> {
    match value {
        Json::Null => Ok(false),
        Json::Bool(b) => Ok(*b),
        _ => Err(invalid(path, "a boolean is expected")),
    }
}

fn parse_output(path: &str, value: &Json, count_allowed: bool) -> Result<Output> {
    match value {
        Json::String(s) if s == "extend" => Ok(Output::Extend),
        Json::String(s) if s == "count" && count_allowed => Ok(Output::Count),
        Json::Array(_) => Ok(Output::Fields(parse_strings(path, value)?)),
        _ if count_allowed => Err(invalid(
            path,
            "value must be one of \"extend\", \"count\" or an array",
        )),
        _ => Err(invalid(path, "value must be \"extend\" or an array")),
    }
}

/// String or array of strings.
fn parse_strings(path: &str, value: &Json) -> Result<Vec<String>> {
    match value {
        Json::String(s) => Ok(vec![s.clone()]),
        Json::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Json::String(s) => Ok(s.clone()),
                _ => Err(invalid(
                    format!("{}/{}", path, i + 1),
                    "a character string is expected",
                )),
            })
            .collect(),
        _ => Err(invalid(path, "an array is expected")),
    }
}

/// Integer from a JSON number or a digit string.
fn scalar_int(value: &Json) -> Option<i64> {
    match value {
        Json::Number(n) => n.as_i64(),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_int(path: &str, value: &Json) -> Result<i64> {
    scalar_int(value).ok_or_else(|| invalid(path, "an integer is expected"))
}

/// Scalar or array of integers.
fn parse_ints(path: &str, value: &Json) -> Result<Vec<i64>> {
    match value {
        Json::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_int(&format!("{}/{}", path, i + 1), item))
            .collect(),
        scalar => Ok(vec![parse_int(path, scalar)?]),
    }
}

/// Scalar or array of ids.
fn parse_ids(path: &str, value: &Json) -> Result<Vec<Id>> {
    let id = |p: &str, v: &Json| {
        scalar_int(v)
            .and_then(|i| Id::try_from(i).ok())
            .ok_or_else(|| invalid(p, "a number is expected"))
    };
    match value {
        Json::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| id(&format!("{}/{}", path, i + 1), item))
            .collect(),
        scalar => Ok(vec![id(path, scalar)?]),
    }
}

/// Positive 32-bit integer; zero, negatives and non-numbers are rejected.
fn parse_limit(path: &str, value: &Json) -> Result<Option<NonZeroU32>> {
    if value.is_null() {
        return Ok(None);
    }
    scalar_int(value)
        .filter(|n| *n >= 1 && *n <= i64::from(i32::MAX))
        .and_then(|n| u32::try_from(n).ok())
        .and_then(NonZeroU32::new)
        .map(Some)
        .ok_or_else(|| invalid(path, "an integer from 1 to 2147483647 is expected"))
}

fn parse_sortorder(path: &str, value: &Json) -> Result<Vec<SortOrder>> {
    parse_strings(path, value)?
        .iter()
        .enumerate()
        .map(|(i, order)| match order.as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            _ => Err(invalid(
                format!("{}/{}", path, i + 1),
                "value must be one of \"ASC\", \"DESC\"",
            )),
        })
        .collect()
}

/// Field to scalar-or-array map; `null` values drop the field.
fn parse_filter(path: &str, value: &Json) -> Result<Option<BTreeMap<String, Vec<Value>>>> {
    let object = match value {
        Json::Null => return Ok(None),
        Json::Object(object) => object,
        _ => return Err(invalid(path, "an object is expected")),
    };
    let mut filter = BTreeMap::new();
    for (field, value) in object {
        let values = match value {
            Json::Null => continue,
            Json::Array(items) => items.iter().map(Value::from_json).collect(),
            Json::Object(_) => {
                return Err(invalid(
                    format!("{}/{}", path, field),
                    "a scalar or an array is expected",
                ))
            }
            scalar => vec![Value::from_json(scalar)],
        };
        filter.insert(field.clone(), values);
    }
    Ok(Some(filter))
}

fn parse_search(path: &str, value: &Json) -> Result<Option<BTreeMap<String, Vec<String>>>> {
    let object = match value {
        Json::Null => return Ok(None),
        Json::Object(object) => object,
        _ => return Err(invalid(path, "an object is expected")),
    };
    let mut search = BTreeMap::new();
    for (field, value) in object {
        if value.is_null() {
            continue;
        }
        search.insert(field.clone(), parse_strings(&format!("{}/{}", path, field), value)?);
    }
    Ok(Some(search))
}

fn parse_tags(path: &str, value: &Json) -> Result<Vec<TagFilter>> {
    let Json::Array(items) = value else {
        return Err(invalid(path, "an array is expected"));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = format!("{}/{}", path, i + 1);
            let Json::Object(object) = item else {
                return Err(invalid(item_path, "an object is expected"));
            };
            let mut filter = TagFilter::exists(String::new());
            let mut has_tag = false;
            for (key, value) in object {
                let field_path = format!("{}/{}", item_path, key);
                match key.as_str() {
                    "tag" => {
                        filter.tag = value
                            .as_str()
                            .ok_or_else(|| invalid(&field_path, "a character string is expected"))?
                            .to_string();
                        has_tag = true;
                    }
                    "value" => {
                        filter.value = value
                            .as_str()
                            .ok_or_else(|| invalid(&field_path, "a character string is expected"))?
                            .to_string();
                    }
                    "operator" => {
                        filter.operator = TagOperator::from_code(parse_int(&field_path, value)?)
                            .ok_or_else(|| invalid(&field_path, "value must be one of 0, 1"))?;
                    }
                    _ => {
                        return Err(invalid(
                            item_path.clone(),
                            format!("unexpected parameter \"{}\"", key),
                        ))
                    }
                }
            }
            if !has_tag {
                return Err(invalid(item_path, "the parameter \"tag\" is missing"));
            }
            Ok(filter)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, EntityDescriptor, FieldDef, OptionDef, RelationDef};
    use crate::relation::RelationResolver;
    use serde_json::json;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register(
                EntityDescriptor::new("host", "Host", "hosts", "h")
                    .with_pk("hostid")
                    .with_field(FieldDef::string("host")),
            )
            .unwrap();
        catalog
            .register(
                EntityDescriptor::new("proxy", "Proxy", "proxy", "p")
                    .with_pk("proxyid")
                    .with_field(FieldDef::string("name").required())
                    .with_field(FieldDef::int("operating_mode").allowed(&[0, 1]))
                    .with_field(FieldDef::string("tls_psk").write_only())
                    .with_sort_columns(&["proxyid", "name"])
                    .with_option(OptionDef::ints("operating_mode", "p.operating_mode", Some(&[0, 1])))
                    .with_option(
                        OptionDef::ints("source", "p.source", None)
                            .with_default(OptionValue::Ints(vec![0])),
                    )
                    .with_resolver(RelationResolver::new(
                        RelationDef::many_through(
                            "selectHosts", "hosts", "host", "hostids", "hosts", "proxyid", "hostid",
                        )
                        .with_count(),
                    )),
            )
            .unwrap();
        catalog
    }

    fn normalize(json: Json) -> Result<GetOptions> {
        let catalog = catalog();
        let entity = catalog.entity("proxy").unwrap();
        OptionNormalizer::new(&catalog).normalize(entity, &json)
    }

    #[test]
    fn test_defaults_fill_every_declared_key() {
        let options = normalize(json!({})).unwrap();
        assert_eq!(options.output, Output::Extend);
        assert_eq!(options.params.get("proxyids"), Some(&None));
        assert_eq!(options.params.get("selectHosts"), Some(&None));
        assert_eq!(options.ints("source"), Some(&[0][..]));
        assert_eq!(normalize(Json::Null).unwrap(), options);
    }

    #[test]
    fn test_scalar_and_array_ids() {
        let scalar = normalize(json!({"proxyids": "5"})).unwrap();
        let array = normalize(json!({"proxyids": [5, "6"]})).unwrap();
        let empty = normalize(json!({"proxyids": []})).unwrap();
        let null = normalize(json!({"proxyids": null})).unwrap();

        assert_eq!(scalar.ids("proxyids"), Some(&[5][..]));
        assert_eq!(array.ids("proxyids"), Some(&[5, 6][..]));
        assert_eq!(empty.ids("proxyids"), Some(&[][..]));
        assert_eq!(null.ids("proxyids"), None);
        assert!(normalize(json!({"proxyids": ["x"]})).is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(normalize(json!({"hostids": [1]})).is_err());
        assert!(normalize(json!({"output": ["tls_psk"]})).is_err());
        assert!(normalize(json!({"filter": {"tls_psk": "x"}})).is_err());
        assert!(normalize(json!({"search": {"operating_mode": "1"}})).is_err());
        assert!(normalize(json!([1, 2])).is_err());
    }

    #[test]
    fn test_limit_is_strict() {
        assert_eq!(
            normalize(json!({"limit": "10"})).unwrap().limit,
            NonZeroU32::new(10)
        );
        assert_eq!(normalize(json!({"limit": null})).unwrap().limit, None);
        for bad in [json!(0), json!("abc"), json!(-1), json!(1.5), json!(4294967296u64)] {
            let err = normalize(json!({ "limit": bad })).unwrap_err();
            assert_eq!(err.kind(), monapi_proto::ErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn test_sort() {
        let options = normalize(json!({"sortfield": ["name", "proxyid"], "sortorder": "DESC"})).unwrap();
        assert_eq!(options.sort, vec![SortSpec::desc("name"), SortSpec::desc("proxyid")]);

        let options =
            normalize(json!({"sortfield": ["name", "proxyid"], "sortorder": ["DESC"]})).unwrap();
        assert_eq!(options.sort, vec![SortSpec::desc("name"), SortSpec::desc("proxyid")]);

        let options =
            normalize(json!({"sortfield": ["name", "proxyid"], "sortorder": ["DESC", "ASC"]}))
                .unwrap();
        assert_eq!(options.sort, vec![SortSpec::desc("name"), SortSpec::asc("proxyid")]);

        assert!(normalize(json!({"sortfield": "tls_psk"})).is_err());
        assert!(normalize(json!({"sortfield": "name", "sortorder": "UP"})).is_err());
    }

    #[test]
    fn test_enum_values() {
        assert!(normalize(json!({"operating_mode": 1})).is_ok());
        assert!(normalize(json!({"operating_mode": [0, 2]})).is_err());
    }

    #[test]
    fn test_selections() {
        let options = normalize(json!({"selectHosts": "count"})).unwrap();
        assert_eq!(options.selection("selectHosts"), Some(&Output::Count));

        let options = normalize(json!({"selectHosts": ["host"]})).unwrap();
        assert_eq!(options.selection("selectHosts"), Some(&Output::fields(["host"])));

        assert!(normalize(json!({"selectHosts": ["name"]})).is_err());
        assert!(normalize(json!({"output": "count"})).is_err());
    }

    #[test]
    fn test_nopermissions_flag() {
        assert!(normalize(json!({"nopermissions": true})).unwrap().no_permissions);
        assert!(!normalize(json!({"nopermissions": false})).unwrap().no_permissions);
        assert!(!normalize(json!({})).unwrap().no_permissions);
        assert!(normalize(json!({"nopermissions": "yes"})).is_err());
    }

    #[test]
    fn test_group_count_requires_count_output() {
        assert!(!normalize(json!({"groupCount": true})).unwrap().group_count);
        let options = normalize(json!({"groupCount": true, "countOutput": true})).unwrap();
        assert!(options.group_count && options.count_output);
    }

    #[test]
    fn test_filter_drops_null_fields() {
        let options = normalize(json!({"filter": {"name": null, "operating_mode": 1}})).unwrap();
        let filter = options.filter.unwrap();
        assert!(!filter.contains_key("name"));
        assert_eq!(filter["operating_mode"], vec![Value::Int(1)]);
    }

    #[test]
    fn test_tags() {
        let catalog = Catalog::standard();
        let problem = catalog.entity("problem").unwrap();
        let options = OptionNormalizer::new(&catalog)
            .normalize(
                problem,
                &json!({"tags": [{"tag": "a"}, {"tag": "b", "value": "y", "operator": "1"}], "evaltype": 2}),
            )
            .unwrap();
        assert_eq!(
            options.tags("tags"),
            Some(&[TagFilter::exists("a"), TagFilter::equal("b", "y")][..])
        );
        assert_eq!(options.eval_type("evaltype"), EvalType::Or);

        assert!(OptionNormalizer::new(&catalog)
            .normalize(problem, &json!({"tags": [{"value": "x"}]}))
            .is_err());
        assert!(OptionNormalizer::new(&catalog)
            .normalize(problem, &json!({"evaltype": 1}))
            .is_err());
    }
}
