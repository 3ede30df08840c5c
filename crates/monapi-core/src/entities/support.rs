//! Entities that mostly serve as targets of related-object selections:
//! hosts, host groups, items, graphs and users.

use crate::catalog::{EntityDescriptor, FieldDef, LinkDef, OptionDef};
use crate::security::{
    AccessRules, Hop, HostPath, MemberScope, Membership, PermissionStrategy, UserRole,
};

pub fn host() -> EntityDescriptor {
    EntityDescriptor::new("host", "Host", "hosts", "h")
        .with_pk("hostid")
        .with_field(FieldDef::string("host"))
        .with_field(FieldDef::string("name"))
        .with_field(FieldDef::int("status"))
        .with_field(FieldDef::id("proxyid"))
        .with_field(FieldDef::int("flags"))
        .with_name_field("host")
        .with_option(OptionDef::ids_through(
            "groupids",
            LinkDef::new("hosts_groups", "hg", "hostid", "h.hostid", "groupid"),
        ))
        .with_option(OptionDef::ids("proxyids", "h.proxyid"))
        .with_permission(PermissionStrategy::HostGroups(HostPath::direct("h.hostid")))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["hostid", "host", "name", "status"])
}

pub fn hostgroup() -> EntityDescriptor {
    EntityDescriptor::new("hostgroup", "Host group", "hstgrp", "g")
        .with_pk("groupid")
        .with_field(FieldDef::string("name"))
        .with_name_field("name")
        .with_option(OptionDef::ids_through(
            "hostids",
            LinkDef::new("hosts_groups", "hg", "groupid", "g.groupid", "hostid"),
        ))
        .with_permission(PermissionStrategy::GroupRights {
            column: "g.groupid".into(),
        })
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["groupid", "name"])
}

pub fn item() -> EntityDescriptor {
    EntityDescriptor::new("item", "Item", "items", "i")
        .with_pk("itemid")
        .with_field(FieldDef::id("hostid"))
        .with_field(FieldDef::string("name"))
        .with_field(FieldDef::string("key_"))
        .with_field(FieldDef::int("value_type"))
        .with_field(FieldDef::int("status"))
        .with_name_field("name")
        .with_option(OptionDef::ids("hostids", "i.hostid"))
        .with_permission(PermissionStrategy::HostGroups(HostPath::direct("i.hostid")))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["itemid", "name", "key_"])
}

pub fn graph() -> EntityDescriptor {
    EntityDescriptor::new("graph", "Graph", "graphs", "g")
        .with_pk("graphid")
        .with_field(FieldDef::string("name"))
        .with_field(FieldDef::int("width"))
        .with_field(FieldDef::int("height"))
        .with_name_field("name")
        .with_option(OptionDef::ids_through(
            "itemids",
            LinkDef::new("graphs_items", "gi", "graphid", "g.graphid", "itemid"),
        ))
        .with_permission(PermissionStrategy::HostGroups(
            HostPath::direct("g.graphid")
                .via(Hop::new("graphs_items", "pgi", "graphid", "itemid"))
                .via(Hop::new("items", "pi", "itemid", "hostid")),
        ))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["graphid", "name"])
}

/// Users see themselves and the members of their own groups.
pub fn user() -> EntityDescriptor {
    EntityDescriptor::new("user", "User", "users", "u")
        .with_pk("userid")
        .with_field(FieldDef::string("username"))
        .with_field(FieldDef::string("name"))
        .with_field(FieldDef::string("surname"))
        .with_field(FieldDef::int("type"))
        .with_name_field("username")
        .with_option(OptionDef::ids_through(
            "usrgrpids",
            LinkDef::new("users_groups", "ug", "userid", "u.userid", "usrgrpid"),
        ))
        .with_permission(PermissionStrategy::Membership(Membership {
            base_column: "u.userid".into(),
            table: "users_groups".into(),
            alias: "uug".into(),
            select_column: "userid".into(),
            match_column: "usrgrpid".into(),
            scope: MemberScope::CallerGroups,
            include_self: true,
        }))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["userid", "username"])
}
