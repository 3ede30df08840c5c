//! Graph items: the item lines drawn on a graph.

use crate::catalog::{EntityDescriptor, FieldDef, OptionDef, RelationDef};
use crate::relation::RelationResolver;
use crate::security::{AccessRules, Hop, HostPath, PermissionStrategy, UserRole};

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("graphitem", "Graph item", "graphs_items", "gi")
        .with_pk("gitemid")
        .with_field(FieldDef::id("graphid"))
        .with_field(FieldDef::id("itemid"))
        .with_field(FieldDef::int("drawtype"))
        .with_field(FieldDef::int("sortorder"))
        .with_field(FieldDef::string("color"))
        .with_field(FieldDef::int("yaxisside"))
        .with_field(FieldDef::int("calc_fnc"))
        .with_field(FieldDef::int("type"))
        .with_option(OptionDef::grouped_ids("graphids", "gi.graphid"))
        .with_option(OptionDef::ids("itemids", "gi.itemid"))
        .with_option(OptionDef::ints("type", "gi.type", Some(&[0, 2])))
        .with_resolver(RelationResolver::new(RelationDef::many_through(
            "selectGraphs",
            "graphs",
            "graph",
            "graphids",
            "graphs_items",
            "gitemid",
            "graphid",
        )))
        .with_permission(PermissionStrategy::HostGroups(
            HostPath::direct("gi.itemid").via(Hop::new("items", "pi", "itemid", "hostid")),
        ))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["gitemid", "sortorder"])
}
