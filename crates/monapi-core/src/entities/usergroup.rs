//! User groups with their members, host group rights and tag filters.

use crate::catalog::{
    ChildCollection, ChildTable, EntityDescriptor, FieldDef, LinkDef, OptionDef, RelationDef,
};
use crate::relation::{ChildRowsResolver, RelationResolver};
use crate::security::{AccessRules, MemberScope, Membership, PermissionStrategy, UserRole};

fn rights() -> ChildTable {
    ChildTable::new("rights", "groupid")
        .with_pk("rightid")
        .with_field(FieldDef::id("id").required())
        .with_field(FieldDef::int("permission").required().allowed(&[0, 2, 3]))
}

fn tag_filters() -> ChildTable {
    ChildTable::new("tag_filter", "usrgrpid")
        .with_pk("tag_filterid")
        .with_field(FieldDef::id("groupid").required())
        .with_field(FieldDef::string("tag").writable().max_len(255))
        .with_field(FieldDef::string("value").writable().max_len(255))
}

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("usergroup", "User group", "usrgrp", "g")
        .with_pk("usrgrpid")
        .with_field(FieldDef::string("name").required().max_len(64))
        .with_field(FieldDef::int("gui_access").writable().allowed(&[0, 1, 2, 3]))
        .with_field(FieldDef::int("users_status").writable().allowed(&[0, 1]))
        .with_field(FieldDef::int("debug_mode").writable().allowed(&[0, 1]))
        .with_name_field("name")
        .with_option(OptionDef::ids_through(
            "userids",
            LinkDef::new("users_groups", "ug", "usrgrpid", "g.usrgrpid", "userid"),
        ))
        .with_option(OptionDef::ints("status", "g.users_status", Some(&[0, 1])))
        .with_resolver(RelationResolver::new(RelationDef::many_through(
            "selectUsers",
            "users",
            "user",
            "userids",
            "users_groups",
            "usrgrpid",
            "userid",
        )))
        .with_resolver(ChildRowsResolver::new(
            "selectHostGroupRights",
            "hostgroup_rights",
            rights(),
        ))
        .with_resolver(ChildRowsResolver::new(
            "selectTagFilters",
            "tag_filters",
            tag_filters(),
        ))
        .with_child(ChildCollection::rows(
            "users",
            ChildTable::new("users_groups", "usrgrpid")
                .with_pk("id")
                .with_field(FieldDef::id("userid").required()),
        ))
        .with_child(ChildCollection::rows("hostgroup_rights", rights()))
        .with_child(ChildCollection::rows("tag_filters", tag_filters()))
        .with_permission(PermissionStrategy::Membership(Membership {
            base_column: "g.usrgrpid".into(),
            table: "users_groups".into(),
            alias: "uug".into(),
            select_column: "usrgrpid".into(),
            match_column: "userid".into(),
            scope: MemberScope::Caller,
            include_self: false,
        }))
        .with_access(AccessRules::crud(UserRole::User, UserRole::SuperAdmin))
        .with_unique(&["name"])
        .with_sort_columns(&["usrgrpid", "name"])
}
