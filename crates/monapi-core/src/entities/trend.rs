//! Hourly trends of numeric items.

use crate::catalog::{EntityDescriptor, FieldDef, OptionDef, OptionKind};
use crate::security::{AccessRules, Hop, HostPath, PermissionStrategy, UserRole};

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("trend", "Trend", "trends", "t")
        .with_field(FieldDef::id("itemid"))
        .with_field(FieldDef::int("clock"))
        .with_field(FieldDef::int("num"))
        .with_field(FieldDef::float("value_min"))
        .with_field(FieldDef::float("value_avg"))
        .with_field(FieldDef::float("value_max"))
        .with_table_selector("value_type", &[(0, "trends"), (3, "trends_uint")], 0)
        .with_option(OptionDef::ids("itemids", "t.itemid"))
        .with_option(OptionDef::new(
            "time_from",
            OptionKind::TimeFrom {
                column: "t.clock".into(),
            },
        ))
        .with_option(OptionDef::new(
            "time_till",
            OptionKind::TimeTill {
                column: "t.clock".into(),
            },
        ))
        .with_permission(PermissionStrategy::HostGroups(
            HostPath::direct("t.itemid").via(Hop::new("items", "pi", "itemid", "hostid")),
        ))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["itemid", "clock"])
}
