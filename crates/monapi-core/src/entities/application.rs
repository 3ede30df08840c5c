//! Applications: named item groups on a host.

use crate::catalog::{
    Cardinality, ChildTable, EntityDescriptor, FieldDef, LinkDef, OptionDef, RelationDef,
};
use crate::error::Result;
use crate::query::{condition_id, Predicate, QueryParts, SqlWriter};
use crate::relation::{
    base_ids, fetch_related, pairs_from_rows, ChildRowsResolver, RelatedResolver,
    RelatedSource, RelationResolver, BASE_ID, RELATED_ID,
};
use crate::security::{AccessRules, HostPath, PermissionStrategy, UserRole};
use monapi_proto::{Id, Output, Row};

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("application", "Application", "applications", "a")
        .with_pk("applicationid")
        .with_field(FieldDef::id("hostid").required().references("host"))
        .with_field(FieldDef::string("name").required().max_len(255))
        .with_field(FieldDef::int("flags"))
        .with_name_field("name")
        .with_option(OptionDef::grouped_ids("hostids", "a.hostid"))
        .with_option(OptionDef::ids_through(
            "groupids",
            LinkDef::new("hosts_groups", "hg", "hostid", "a.hostid", "groupid"),
        ))
        .with_option(OptionDef::ids_through(
            "itemids",
            LinkDef::new("items_applications", "ia", "applicationid", "a.applicationid", "itemid"),
        ))
        .with_resolver(RelationResolver::new(RelationDef::by_column(
            "selectHost",
            "host",
            "host",
            "hostids",
            "hostid",
            Cardinality::One,
        )))
        .with_resolver(RelationResolver::new(
            RelationDef::many_through(
                "selectItems",
                "items",
                "item",
                "itemids",
                "items_applications",
                "applicationid",
                "itemid",
            )
            .with_count(),
        ))
        .with_resolver(DiscoveryRuleResolver)
        .with_resolver(ChildRowsResolver::new(
            "selectApplicationDiscovery",
            "applicationDiscovery",
            ChildTable::new("application_discovery", "applicationid")
                .with_pk("application_discoveryid")
                .with_field(FieldDef::id("application_prototypeid"))
                .with_field(FieldDef::string("name"))
                .with_field(FieldDef::int("lastcheck"))
                .with_field(FieldDef::int("ts_delete")),
        ))
        .with_permission(PermissionStrategy::HostGroups(HostPath::direct("a.hostid")))
        .with_access(AccessRules::crud(UserRole::User, UserRole::Admin))
        .with_unique(&["hostid", "name"])
        .with_sort_columns(&["applicationid", "name"])
}

/// The discovery rule (an item) whose prototype created a discovered
/// application. Reached through `application_discovery` and
/// `application_prototype`.
#[derive(Debug, Clone, Copy)]
struct DiscoveryRuleResolver;

impl RelatedResolver for DiscoveryRuleResolver {
    fn option(&self) -> &str {
        "selectDiscoveryRule"
    }

    fn field(&self) -> &str {
        "discoveryRule"
    }

    fn target(&self) -> Option<&str> {
        Some("item")
    }

    fn resolve(
        &self,
        source: &dyn RelatedSource,
        selection: &Output,
        rows: &mut [(Id, Row)],
    ) -> Result<()> {
        let mut parts = QueryParts::new("application_discovery", "ad");
        parts
            .from
            .insert_once("application_prototype", "application_prototype ap".to_string());
        parts.add_select(BASE_ID, format!("ad.applicationid AS {}", BASE_ID));
        parts.add_select(RELATED_ID, format!("ap.itemid AS {}", RELATED_ID));
        parts.push_filter(Predicate::columns_eq(
            "ad.application_prototypeid",
            "ap.application_prototypeid",
        ));
        parts.push_filter(condition_id(
            "ad.applicationid",
            &base_ids(rows),
            source.chunk_size(),
        ));

        let map = pairs_from_rows(&source.select(&SqlWriter::select(&parts))?);
        let related = if map.is_empty() {
            Vec::new()
        } else {
            fetch_related(source, "item", "itemids", map.related_ids(), selection.clone())?
        };
        map.map_one(rows, &related, self.field());
        Ok(())
    }
}
