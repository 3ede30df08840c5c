//! Map elements, visible through the sharing settings of their map.

use crate::catalog::{ChildTable, EntityDescriptor, FieldDef, OptionDef};
use crate::relation::ChildRowsResolver;
use crate::security::{AccessRules, MapSharing, PermissionStrategy, UserRole};

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("mapelement", "Map element", "sysmaps_elements", "se")
        .with_pk("selementid")
        .with_field(FieldDef::id("sysmapid"))
        .with_field(FieldDef::int("elementtype"))
        .with_field(FieldDef::id("iconid_off"))
        .with_field(FieldDef::string("label"))
        .with_field(FieldDef::int("x"))
        .with_field(FieldDef::int("y"))
        .with_option(OptionDef::grouped_ids("sysmapids", "se.sysmapid"))
        .with_resolver(ChildRowsResolver::new(
            "selectUrls",
            "urls",
            ChildTable::new("sysmap_element_url", "selementid")
                .with_pk("sysmapelementurlid")
                .with_field(FieldDef::string("name"))
                .with_field(FieldDef::string("url")),
        ))
        .with_permission(PermissionStrategy::Sharing(MapSharing {
            base_column: "se.sysmapid".into(),
        }))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["selementid", "label"])
}
