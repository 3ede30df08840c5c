//! Relation definitions between entities.

use super::field::FieldDef;

/// Cardinality of a related-object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Single related object or the missing sentinel.
    One,
    /// List of related objects.
    Many,
}

/// Where the association between base and related ids comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationSource {
    /// Foreign key column on the base row.
    LocalColumn(String),
    /// Association table queried for (local, foreign) pairs.
    Through {
        /// Table name.
        table: String,
        /// Column holding base ids.
        local: String,
        /// Column holding related ids.
        foreign: String,
    },
}

/// A related-object selection served by a nested `get` on another entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Option key, e.g. `selectHosts`.
    pub option: String,
    /// Output field attached to each base row.
    pub field: String,
    /// Target entity name.
    pub target: String,
    /// Id option of the target entity, e.g. `hostids`.
    pub target_ids: String,
    /// Cardinality.
    pub cardinality: Cardinality,
    /// Association source.
    pub source: RelationSource,
    /// Whether `"count"` is accepted as the selection.
    pub count_allowed: bool,
}

impl RelationDef {
    /// Many related objects through an association table.
    pub fn many_through(
        option: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
        target_ids: impl Into<String>,
        table: impl Into<String>,
        local: impl Into<String>,
        foreign: impl Into<String>,
    ) -> Self {
        Self {
            option: option.into(),
            field: field.into(),
            target: target.into(),
            target_ids: target_ids.into(),
            cardinality: Cardinality::Many,
            source: RelationSource::Through {
                table: table.into(),
                local: local.into(),
                foreign: foreign.into(),
            },
            count_allowed: false,
        }
    }

    /// Related objects named by a foreign key on the base row.
    pub fn by_column(
        option: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
        target_ids: impl Into<String>,
        column: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            option: option.into(),
            field: field.into(),
            target: target.into(),
            target_ids: target_ids.into(),
            cardinality,
            source: RelationSource::LocalColumn(column.into()),
            count_allowed: false,
        }
    }

    /// Accept `"count"` as the selection.
    pub fn with_count(mut self) -> Self {
        self.count_allowed = true;
        self
    }
}

/// A table of rows owned by one base row.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildTable {
    /// Table name.
    pub table: String,
    /// Primary key column, if the rows have one.
    pub pk: Option<String>,
    /// Column pointing at the owning base row.
    pub foreign_key: String,
    /// Column filled with the 0-based position of the row in the input list.
    pub ordinal: Option<String>,
    /// Fields of each child row.
    pub fields: Vec<FieldDef>,
}

impl ChildTable {
    /// Create a child table definition.
    pub fn new(table: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            pk: None,
            foreign_key: foreign_key.into(),
            ordinal: None,
            fields: Vec::new(),
        }
    }

    /// Set the primary key column; it is also exposed as an output field.
    pub fn with_pk(mut self, pk: impl Into<String>) -> Self {
        let pk = pk.into();
        self.fields.insert(0, FieldDef::id(pk.clone()));
        self.pk = Some(pk);
        self
    }

    /// Fill a column with the input position.
    pub fn with_ordinal(mut self, column: impl Into<String>) -> Self {
        self.ordinal = Some(column.into());
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// How a nested input collection is written.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildKind {
    /// Rows owned by the base row; replaced wholesale on update.
    Rows(ChildTable),
    /// Rows of another entity pointed at the base row through a column.
    Links {
        /// Target entity, checked for write access.
        target: String,
        /// Target table.
        table: String,
        /// Primary key of the target table; also the key in each input object.
        pk: String,
        /// Column set to the base id.
        column: String,
    },
}

/// A nested collection accepted by create/update.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildCollection {
    /// Input field name.
    pub field: String,
    /// Storage.
    pub kind: ChildKind,
    /// Must be present and non-empty on create.
    pub required: bool,
}

impl ChildCollection {
    /// Owned rows.
    pub fn rows(field: impl Into<String>, table: ChildTable) -> Self {
        Self {
            field: field.into(),
            kind: ChildKind::Rows(table),
            required: false,
        }
    }

    /// Links from another entity.
    pub fn links(
        field: impl Into<String>,
        target: impl Into<String>,
        table: impl Into<String>,
        pk: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind: ChildKind::Links {
                target: target.into(),
                table: table.into(),
                pk: pk.into(),
                column: column.into(),
            },
            required: false,
        }
    }

    /// Require on create.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Forbids deleting rows still referenced from another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRestriction {
    /// Referencing table.
    pub table: String,
    /// Column holding the referenced id.
    pub column: String,
    /// Column naming the referencing row in the message.
    pub name_column: String,
    /// Message with `{referrer}` and `{target}` placeholders.
    pub message: String,
}

impl DeleteRestriction {
    /// Create a restriction.
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        name_column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            name_column: name_column.into(),
            message: message.into(),
        }
    }

    /// Render the message.
    pub fn describe(&self, referrer: &str, target: &str) -> String {
        self.message
            .replace("{referrer}", referrer)
            .replace("{target}", target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_table_pk_is_output_field() {
        let table = ChildTable::new("icon_mapping", "iconmapid")
            .with_pk("iconmappingid")
            .with_field(FieldDef::id("iconid").required());
        assert_eq!(table.fields[0].name, "iconmappingid");
        assert!(!table.fields[0].writable);
        assert!(table.field("iconid").is_some());
    }

    #[test]
    fn test_delete_restriction_message() {
        let restriction = DeleteRestriction::new(
            "hosts",
            "proxyid",
            "name",
            "Host \"{referrer}\" is monitored by proxy \"{target}\".",
        );
        assert_eq!(
            restriction.describe("web01", "edge"),
            "Host \"web01\" is monitored by proxy \"edge\"."
        );
    }
}
