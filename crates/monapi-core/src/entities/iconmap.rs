//! Icon maps: ordered inventory expressions choosing map element icons.

use crate::catalog::{
    ChildCollection, ChildTable, DeleteRestriction, EntityDescriptor, FieldDef, LinkDef,
    OptionDef,
};
use crate::relation::ChildRowsResolver;
use crate::security::{AccessRules, PermissionStrategy, UserRole};

fn mappings() -> ChildTable {
    ChildTable::new("icon_mapping", "iconmapid")
        .with_pk("iconmappingid")
        .with_ordinal("sortorder")
        .with_field(FieldDef::id("iconid").required())
        .with_field(FieldDef::int("inventory_link").required())
        .with_field(FieldDef::string("expression").required().max_len(64))
        .with_field(FieldDef::int("sortorder"))
}

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("iconmap", "Icon map", "icon_map", "im")
        .with_pk("iconmapid")
        .with_field(FieldDef::string("name").required().max_len(64))
        .with_field(FieldDef::id("default_iconid").required())
        .with_name_field("name")
        .with_option(OptionDef::ids_through(
            "sysmapids",
            LinkDef::new("sysmaps", "ims", "iconmapid", "im.iconmapid", "sysmapid"),
        ))
        .with_resolver(ChildRowsResolver::new("selectMappings", "mappings", mappings()))
        .with_child(ChildCollection::rows("mappings", mappings()).required())
        .with_delete_restriction(DeleteRestriction::new(
            "sysmaps",
            "iconmapid",
            "name",
            "Icon map \"{target}\" cannot be deleted. Used in map \"{referrer}\".",
        ))
        .with_permission(PermissionStrategy::SuperAdminWrite)
        .with_access(AccessRules::crud(UserRole::User, UserRole::SuperAdmin))
        .with_unique(&["name"])
        .with_sort_columns(&["iconmapid", "name"])
}
