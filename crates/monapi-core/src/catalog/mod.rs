//! Entity catalog: fields, options, relations and per-entity descriptors.

#[allow(clippy::module_inception)]
mod catalog;
mod entity;
mod field;
mod option;
mod relation;
mod types;

pub use catalog::Catalog;
pub use entity::{Companion, EntityDescriptor, LeftJoinDef, TableSelector};
pub use field::{DefaultValue, FieldDef};
pub use option::{LinkDef, OptionDef, OptionKind};
pub use relation::{
    Cardinality, ChildCollection, ChildKind, ChildTable, DeleteRestriction, RelationDef,
    RelationSource,
};
pub use types::FieldType;
