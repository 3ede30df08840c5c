//! Entity-specific `get` option definitions.

use crate::query::TagSource;
use monapi_proto::OptionValue;

/// A link table joined into the base query for an id filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    /// Link table name.
    pub table: String,
    /// Link table alias.
    pub alias: String,
    /// Column of the link table matching the base row.
    pub link_column: String,
    /// Qualified base column.
    pub base_column: String,
    /// Column of the link table holding the filtered ids.
    pub target_column: String,
}

impl LinkDef {
    /// Create a link definition.
    pub fn new(
        table: impl Into<String>,
        alias: impl Into<String>,
        link_column: impl Into<String>,
        base_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            link_column: link_column.into(),
            base_column: base_column.into(),
            target_column: target_column.into(),
        }
    }

    /// `table alias` FROM entry.
    pub fn from_entry(&self) -> String {
        format!("{} {}", self.table, self.alias)
    }

    /// Qualified link column.
    pub fn link(&self) -> String {
        format!("{}.{}", self.alias, self.link_column)
    }

    /// Qualified target column.
    pub fn target(&self) -> String {
        format!("{}.{}", self.alias, self.target_column)
    }
}

/// How an option contributes to the query.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    /// Id set on a qualified column.
    Ids {
        /// Qualified column.
        column: String,
        /// Used as the group key for `groupCount`.
        group_by: bool,
    },
    /// Id set on a column of a joined link table.
    IdsThrough {
        /// Link table.
        link: LinkDef,
        /// Used as the group key for `groupCount`.
        group_by: bool,
    },
    /// Integer set on a qualified column.
    Ints {
        /// Qualified column.
        column: String,
        /// Allowed values.
        allowed: Option<Vec<i64>>,
    },
    /// Lower time bound (inclusive).
    TimeFrom {
        /// Qualified column.
        column: String,
    },
    /// Upper time bound (inclusive).
    TimeTill {
        /// Qualified column.
        column: String,
    },
    /// Tag conditions.
    Tags {
        /// Tag table relative to the base row.
        source: TagSource,
        /// Name of the option holding the evaltype.
        eval_option: String,
    },
    /// Tag combination mode.
    EvalType,
    /// Boolean compared to a 0/1 column when specified.
    Bool {
        /// Qualified column.
        column: String,
    },
    /// Unless the flag is set, restrict to rows where the column is null.
    NullUnlessSet {
        /// Qualified column.
        column: String,
    },
    /// Picks the base table (see [`TableSelector`](super::TableSelector)).
    TableSelector,
}

/// An entity-specific option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDef {
    /// Option key.
    pub name: String,
    /// Query contribution.
    pub kind: OptionKind,
    /// Value used when the caller does not supply one.
    pub default: Option<OptionValue>,
}

impl OptionDef {
    /// Create an option without a default.
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Id set on a column.
    pub fn ids(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            name,
            OptionKind::Ids {
                column: column.into(),
                group_by: false,
            },
        )
    }

    /// Id set on a column that also keys `groupCount`.
    pub fn grouped_ids(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            name,
            OptionKind::Ids {
                column: column.into(),
                group_by: true,
            },
        )
    }

    /// Id set through a link table.
    pub fn ids_through(name: impl Into<String>, link: LinkDef) -> Self {
        Self::new(
            name,
            OptionKind::IdsThrough {
                link,
                group_by: false,
            },
        )
    }

    /// Integer set on a column.
    pub fn ints(name: impl Into<String>, column: impl Into<String>, allowed: Option<&[i64]>) -> Self {
        Self::new(
            name,
            OptionKind::Ints {
                column: column.into(),
                allowed: allowed.map(<[i64]>::to_vec),
            },
        )
    }

    /// Set the default value.
    pub fn with_default(mut self, default: OptionValue) -> Self {
        self.default = Some(default);
        self
    }
}
