//! Proxies, with their runtime data joined from `proxy_rtdata`.

use crate::catalog::{
    ChildCollection, DeleteRestriction, EntityDescriptor, FieldDef, LeftJoinDef, OptionDef,
    RelationDef,
};
use crate::relation::RelationResolver;
use crate::security::{AccessRules, PermissionStrategy, UserRole};

/// Operating modes: active and passive.
pub const OPERATING_MODES: &[i64] = &[0, 1];

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("proxy", "Proxy", "proxy", "p")
        .with_pk("proxyid")
        .with_field(FieldDef::string("name").required().max_len(128))
        .with_field(
            FieldDef::int("operating_mode")
                .writable()
                .allowed(OPERATING_MODES)
                .with_default(0),
        )
        .with_field(FieldDef::text("description").writable())
        .with_field(FieldDef::id("proxy_groupid").writable())
        .with_field(FieldDef::int("tls_connect").writable().allowed(&[1, 2, 4]))
        .with_field(
            FieldDef::int("tls_accept")
                .writable()
                .allowed(&[1, 2, 3, 4, 5, 6, 7]),
        )
        .with_field(FieldDef::string("tls_issuer").writable().max_len(1024))
        .with_field(FieldDef::string("tls_subject").writable().max_len(1024))
        .with_field(FieldDef::string("tls_psk_identity").write_only().max_len(128))
        .with_field(FieldDef::string("tls_psk").write_only().max_len(512))
        .with_field(FieldDef::string("allowed_addresses").writable().max_len(255))
        .with_field(FieldDef::string("address").writable().max_len(255))
        .with_field(FieldDef::string("port").writable().max_len(64))
        .with_field(FieldDef::int("lastaccess").joined("pr"))
        .with_field(FieldDef::int("version").joined("pr"))
        .with_field(FieldDef::int("compatibility").joined("pr"))
        .with_field(FieldDef::int("state").joined("pr"))
        .with_left_join(LeftJoinDef::new("proxy_rtdata", "pr", "proxyid", "p.proxyid"))
        .with_name_field("name")
        .with_option(OptionDef::ids("proxy_groupids", "p.proxy_groupid"))
        .with_option(OptionDef::ints(
            "operating_mode",
            "p.operating_mode",
            Some(OPERATING_MODES),
        ))
        .with_resolver(RelationResolver::new(
            RelationDef::many_through(
                "selectHosts",
                "hosts",
                "host",
                "hostids",
                "hosts",
                "proxyid",
                "hostid",
            )
            .with_count(),
        ))
        .with_child(ChildCollection::links("hosts", "host", "hosts", "hostid", "proxyid"))
        .with_companion("proxy_rtdata", "proxyid")
        .with_delete_restriction(DeleteRestriction::new(
            "hosts",
            "proxyid",
            "host",
            "Host \"{referrer}\" is monitored by proxy \"{target}\".",
        ))
        .with_permission(PermissionStrategy::SuperAdminWrite)
        .with_access(AccessRules::crud(UserRole::User, UserRole::SuperAdmin))
        .with_unique(&["name"])
        .with_sort_columns(&["proxyid", "name", "operating_mode"])
}
