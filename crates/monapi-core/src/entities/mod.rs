//! Entity descriptors served by the standard catalog.
//!
//! Each module builds one descriptor; `support` holds the entities that
//! exist mainly as targets of related-object selections.

mod application;
mod autoregistration;
mod graphitem;
mod history;
mod iconmap;
mod mapelement;
mod problem;
mod proxy;
mod support;
mod task;
mod trend;
mod usergroup;

pub use history::HISTORY_TABLES;
pub use proxy::OPERATING_MODES;
pub use task::{TASK_CHECK_NOW, TASK_DIAGINFO};

use crate::catalog::EntityDescriptor;

/// Every entity of the monitoring API.
pub fn all() -> Vec<EntityDescriptor> {
    vec![
        application::descriptor(),
        autoregistration::descriptor(),
        graphitem::descriptor(),
        history::descriptor(),
        iconmap::descriptor(),
        mapelement::descriptor(),
        problem::descriptor(),
        proxy::descriptor(),
        task::descriptor(),
        trend::descriptor(),
        usergroup::descriptor(),
        support::host(),
        support::hostgroup(),
        support::item(),
        support::graph(),
        support::user(),
    ]
}
