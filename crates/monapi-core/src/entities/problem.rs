//! Problems: open (and recently resolved) events.

use crate::catalog::{ChildTable, EntityDescriptor, FieldDef, OptionDef, OptionKind};
use crate::query::TagSource;
use crate::relation::ChildRowsResolver;
use crate::security::{AccessRules, Hop, HostPath, PermissionStrategy, UserRole};
use monapi_proto::OptionValue;

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("problem", "Problem", "problem", "p")
        .with_pk("eventid")
        .with_field(FieldDef::int("source"))
        .with_field(FieldDef::int("object"))
        .with_field(FieldDef::id("objectid"))
        .with_field(FieldDef::int("clock"))
        .with_field(FieldDef::int("ns"))
        .with_field(FieldDef::string("name"))
        .with_field(FieldDef::int("severity"))
        .with_field(FieldDef::int("acknowledged"))
        .with_field(FieldDef::id("r_eventid"))
        .with_field(FieldDef::int("r_clock"))
        .with_option(OptionDef::grouped_ids("objectids", "p.objectid"))
        .with_option(
            OptionDef::ints("source", "p.source", Some(&[0, 1, 2, 3]))
                .with_default(OptionValue::Ints(vec![0])),
        )
        .with_option(
            OptionDef::ints("object", "p.object", Some(&[0, 1, 2, 3, 4, 5]))
                .with_default(OptionValue::Ints(vec![0])),
        )
        .with_option(OptionDef::ints(
            "severities",
            "p.severity",
            Some(&[0, 1, 2, 3, 4, 5]),
        ))
        .with_option(OptionDef::new(
            "acknowledged",
            OptionKind::Bool {
                column: "p.acknowledged".into(),
            },
        ))
        .with_option(OptionDef::new(
            "recent",
            OptionKind::NullUnlessSet {
                column: "p.r_eventid".into(),
            },
        ))
        .with_option(OptionDef::new(
            "time_from",
            OptionKind::TimeFrom {
                column: "p.clock".into(),
            },
        ))
        .with_option(OptionDef::new(
            "time_till",
            OptionKind::TimeTill {
                column: "p.clock".into(),
            },
        ))
        .with_option(OptionDef::new(
            "tags",
            OptionKind::Tags {
                source: TagSource::new("problem_tag", "pt", "eventid", "p.eventid"),
                eval_option: "evaltype".into(),
            },
        ))
        .with_option(OptionDef::new("evaltype", OptionKind::EvalType))
        .with_resolver(ChildRowsResolver::new(
            "selectTags",
            "tags",
            ChildTable::new("problem_tag", "eventid")
                .with_field(FieldDef::string("tag"))
                .with_field(FieldDef::string("value")),
        ))
        .with_resolver(ChildRowsResolver::new(
            "selectAcknowledges",
            "acknowledges",
            ChildTable::new("acknowledges", "eventid")
                .with_pk("acknowledgeid")
                .with_field(FieldDef::id("userid"))
                .with_field(FieldDef::int("clock"))
                .with_field(FieldDef::text("message"))
                .with_field(FieldDef::int("action")),
        ))
        .with_permission(PermissionStrategy::HostGroups(
            HostPath::direct("p.objectid")
                .via(Hop::new("functions", "f", "triggerid", "itemid"))
                .via(Hop::new("items", "fi", "itemid", "hostid")),
        ))
        .with_access(AccessRules::read_only(UserRole::User))
        .with_sort_columns(&["eventid", "clock"])
}
