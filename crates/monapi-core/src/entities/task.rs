//! Server tasks such as "check now" and diagnostic requests.

use crate::catalog::{EntityDescriptor, FieldDef};
use crate::security::{AccessRules, UserRole};

/// Diagnostic information request.
pub const TASK_DIAGINFO: i64 = 1;
/// Immediate item check.
pub const TASK_CHECK_NOW: i64 = 6;

pub fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("task", "Task", "task", "t")
        .with_pk("taskid")
        .with_field(
            FieldDef::int("type")
                .required()
                .allowed(&[TASK_DIAGINFO, TASK_CHECK_NOW]),
        )
        .with_field(FieldDef::int("status").with_default(1))
        .with_field(FieldDef::int("clock").created_at())
        .with_field(FieldDef::int("ttl").writable().with_default(3600))
        .with_field(FieldDef::id("proxyid").writable().references("proxy"))
        .with_field(FieldDef::id("itemid").writable().references("item"))
        .with_access(AccessRules {
            get: Some(UserRole::SuperAdmin),
            create: Some(UserRole::SuperAdmin),
            ..AccessRules::default()
        })
        .with_sort_columns(&["taskid", "clock"])
}
