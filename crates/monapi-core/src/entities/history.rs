//! Item history. Values live in one table per value type; the `history`
//! option picks the table.

use crate::catalog::{EntityDescriptor, FieldDef, LinkDef, OptionDef, OptionKind};
use crate::security::{AccessRules, Hop, HostPath, PermissionStrategy, UserRole};

/// Value type to history table.
pub const HISTORY_TABLES: &[(i64, &str)] = &[
    (0, "history"),
    (1, "history_str"),
    (2, "history_log"),
    (3, "history_uint"),
    (4, "history_text"),
];

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("history", "History", "history_uint", "h")
        .with_field(FieldDef::id("itemid"))
        .with_field(FieldDef::int("clock"))
        .with_field(FieldDef::string("value").unfilterable())
        .with_field(FieldDef::int("ns"))
        .with_table_selector("history", HISTORY_TABLES, 3)
        .with_option(OptionDef::ids("itemids", "h.itemid"))
        .with_option(OptionDef::ids_through(
            "hostids",
            LinkDef::new("items", "hi", "itemid", "h.itemid", "hostid"),
        ))
        .with_option(OptionDef::new(
            "time_from",
            OptionKind::TimeFrom {
                column: "h.clock".into(),
            },
        ))
        .with_option(OptionDef::new(
            "time_till",
            OptionKind::TimeTill {
                column: "h.clock".into(),
            },
        ))
        .with_permission(PermissionStrategy::HostGroups(
            HostPath::direct("h.itemid").via(Hop::new("items", "pi", "itemid", "hostid")),
        ))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["itemid", "clock"])
}
