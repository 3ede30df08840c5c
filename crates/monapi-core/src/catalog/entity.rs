//! Entity descriptors.

use super::field::FieldDef;
use super::option::{OptionDef, OptionKind};
use super::relation::{ChildCollection, DeleteRestriction};
use crate::error::{Error, Result};
use crate::relation::RelatedResolver;
use crate::security::{AccessRules, PermissionStrategy};
use monapi_proto::GetOptions;

/// A table left-joined into every query of the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeftJoinDef {
    /// Joined table.
    pub table: String,
    /// Alias of the joined table.
    pub alias: String,
    /// Column of the joined table.
    pub column: String,
    /// Qualified base column it matches.
    pub base_column: String,
}

impl LeftJoinDef {
    /// Create a left join definition.
    pub fn new(
        table: impl Into<String>,
        alias: impl Into<String>,
        column: impl Into<String>,
        base_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            column: column.into(),
            base_column: base_column.into(),
        }
    }
}

/// A table holding exactly one row per base row, created and deleted with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companion {
    /// Table name.
    pub table: String,
    /// Column holding the base id.
    pub column: String,
}

/// Picks the base table from an option value (history value types).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelector {
    /// Option key.
    pub option: String,
    /// Option value to table name.
    pub tables: Vec<(i64, String)>,
    /// Value used when the option is not given.
    pub default: i64,
}

impl TableSelector {
    /// Table for a value.
    pub fn table(&self, value: i64) -> Option<&str> {
        self.tables
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, t)| t.as_str())
    }

    /// Accepted values.
    pub fn values(&self) -> Vec<i64> {
        self.tables.iter().map(|(v, _)| *v).collect()
    }
}

/// Static description of one API entity.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Entity name used in method names, e.g. `proxy`.
    pub name: String,
    /// Human readable name used in messages, e.g. `Proxy`.
    pub label: String,
    /// Base table.
    pub table: String,
    /// Base table alias.
    pub alias: String,
    /// Primary key column; `None` for append-only value tables.
    pub pk: Option<String>,
    /// Option filtering by primary key, e.g. `proxyids`.
    pub id_option: Option<String>,
    /// Field naming a row in conflict messages.
    pub name_field: Option<String>,
    /// Fields.
    pub fields: Vec<FieldDef>,
    /// Tables left-joined for joined fields.
    pub left_joins: Vec<LeftJoinDef>,
    /// Fields accepted by `sortfield`.
    pub sort_columns: Vec<String>,
    /// Entity-specific `get` options.
    pub options: Vec<OptionDef>,
    /// Row-level permission strategy.
    pub permission: PermissionStrategy,
    /// Minimum user type per method.
    pub access: AccessRules,
    /// Related-object resolvers, applied in this order.
    pub resolvers: Vec<Box<dyn RelatedResolver>>,
    /// Nested collections accepted by create/update.
    pub children: Vec<ChildCollection>,
    /// One-row-per-base tables.
    pub companions: Vec<Companion>,
    /// References that block deletion.
    pub delete_restrictions: Vec<DeleteRestriction>,
    /// Field sets that must be unique among stored rows.
    pub unique: Vec<Vec<String>>,
    /// Base table chosen by an option.
    pub table_selector: Option<TableSelector>,
    /// Exactly one stored row; update fills the primary key.
    pub singleton: bool,
}

impl EntityDescriptor {
    /// Create a descriptor with no fields.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        table: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            table: table.into(),
            alias: alias.into(),
            pk: None,
            id_option: None,
            name_field: None,
            fields: Vec::new(),
            left_joins: Vec::new(),
            sort_columns: Vec::new(),
            options: Vec::new(),
            permission: PermissionStrategy::Unrestricted,
            access: AccessRules::default(),
            resolvers: Vec::new(),
            children: Vec::new(),
            companions: Vec::new(),
            delete_restrictions: Vec::new(),
            unique: Vec::new(),
            table_selector: None,
            singleton: false,
        }
    }

    /// Set the primary key. Adds the id field and an id option named
    /// `<pk>s` filtering on it.
    pub fn with_pk(mut self, pk: impl Into<String>) -> Self {
        let pk = pk.into();
        let option = format!("{}s", pk);
        self.fields.insert(0, FieldDef::id(pk.clone()));
        self.options
            .insert(0, OptionDef::ids(option.clone(), format!("{}.{}", self.alias, pk)));
        self.id_option = Some(option);
        self.pk = Some(pk);
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Keep a field out of the output. It is still selected when needed
    /// internally.
    pub fn with_hidden(mut self, name: &str) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.output = false;
        }
        self
    }

    /// Name rows by a field in messages.
    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = Some(field.into());
        self
    }

    /// Left-join a table.
    pub fn with_left_join(mut self, join: LeftJoinDef) -> Self {
        self.left_joins.push(join);
        self
    }

    /// Set the sortable fields.
    pub fn with_sort_columns(mut self, columns: &[&str]) -> Self {
        self.sort_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a `get` option.
    pub fn with_option(mut self, option: OptionDef) -> Self {
        self.options.push(option);
        self
    }

    /// Set the permission strategy.
    pub fn with_permission(mut self, permission: PermissionStrategy) -> Self {
        self.permission = permission;
        self
    }

    /// Set the access rules.
    pub fn with_access(mut self, access: AccessRules) -> Self {
        self.access = access;
        self
    }

    /// Register a resolver after the existing ones.
    pub fn with_resolver(mut self, resolver: impl RelatedResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Accept a nested collection on create/update.
    pub fn with_child(mut self, child: ChildCollection) -> Self {
        self.children.push(child);
        self
    }

    /// Keep one row of `table` per base row.
    pub fn with_companion(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.companions.push(Companion {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// Block deletion while referenced.
    pub fn with_delete_restriction(mut self, restriction: DeleteRestriction) -> Self {
        self.delete_restrictions.push(restriction);
        self
    }

    /// Require a field combination to be unique.
    pub fn with_unique(mut self, fields: &[&str]) -> Self {
        self.unique.push(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Choose the base table from an option. Declares the option as well.
    pub fn with_table_selector(
        mut self,
        option: impl Into<String>,
        tables: &[(i64, &str)],
        default: i64,
    ) -> Self {
        let option = option.into();
        self.options
            .push(OptionDef::new(option.clone(), OptionKind::TableSelector));
        self.table_selector = Some(TableSelector {
            option,
            tables: tables.iter().map(|(v, t)| (*v, t.to_string())).collect(),
            default,
        });
        self
    }

    /// Mark as a singleton.
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get an option definition by name.
    pub fn option(&self, name: &str) -> Option<&OptionDef> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Get a resolver by option key.
    pub fn resolver(&self, option: &str) -> Option<&dyn RelatedResolver> {
        self.resolvers
            .iter()
            .find(|r| r.option() == option)
            .map(|r| r.as_ref())
    }

    /// Check if a field may appear in the output.
    pub fn is_output_field(&self, name: &str) -> bool {
        self.field(name).map_or(false, |f| f.output)
    }

    /// Fields returned for `output: "extend"`.
    pub fn output_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.output)
    }

    /// Primary key or an internal error for entities without one.
    pub fn require_pk(&self) -> Result<&str> {
        self.pk
            .as_deref()
            .ok_or_else(|| Error::internal(format!("entity \"{}\" has no primary key", self.name)))
    }

    /// Key of mutation results, e.g. `proxyids`.
    pub fn id_field(&self) -> String {
        self.pk
            .as_deref()
            .map(|pk| format!("{}s", pk))
            .unwrap_or_else(|| format!("{}ids", self.name))
    }

    /// Base table for a query.
    pub fn table_for(&self, options: &GetOptions) -> Result<&str> {
        match &self.table_selector {
            None => Ok(&self.table),
            Some(selector) => {
                let value = options.int(&selector.option).unwrap_or(selector.default);
                selector.table(value).ok_or_else(|| {
                    Error::from(monapi_proto::Error::invalid(
                        format!("/{}", selector.option),
                        format!("value {} is not supported", value),
                    ))
                })
            }
        }
    }

    /// Left join providing a joined field.
    pub fn left_join(&self, alias: &str) -> Option<&LeftJoinDef> {
        self.left_joins.iter().find(|j| j.alias == alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monapi_proto::OptionValue;

    fn proxy() -> EntityDescriptor {
        EntityDescriptor::new("proxy", "Proxy", "proxy", "p")
            .with_pk("proxyid")
            .with_field(FieldDef::string("name").required())
            .with_field(FieldDef::string("tls_psk").write_only())
    }

    #[test]
    fn test_pk_declares_id_option() {
        let entity = proxy();
        assert_eq!(entity.id_option.as_deref(), Some("proxyids"));
        assert_eq!(entity.id_field(), "proxyids");
        assert!(entity.option("proxyids").is_some());
        assert_eq!(entity.fields[0].name, "proxyid");
    }

    #[test]
    fn test_output_fields_skip_write_only() {
        let entity = proxy();
        let names: Vec<&str> = entity.output_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["proxyid", "name"]);
        assert!(!entity.is_output_field("tls_psk"));
    }

    #[test]
    fn test_table_selector() {
        let entity = EntityDescriptor::new("history", "History", "history_uint", "h")
            .with_table_selector("history", &[(0, "history"), (3, "history_uint")], 3);
        assert_eq!(entity.table_for(&GetOptions::new()).unwrap(), "history_uint");

        let float = GetOptions::new().with_param("history", OptionValue::Int(0));
        assert_eq!(entity.table_for(&float).unwrap(), "history");

        let bad = GetOptions::new().with_param("history", OptionValue::Int(7));
        assert!(entity.table_for(&bad).is_err());
    }
}
