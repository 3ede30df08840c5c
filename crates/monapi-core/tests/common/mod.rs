//! Shared fixture for the integration tests.
//!
//! Seeded callers:
//! - 1 `Admin`: super administrator.
//! - 2 `guest`: user in "Operators", read on "Linux".
//! - 3 `manager`: admin in "Managers", read-write on "Linux", deny on "Windows".
//! - 4 `outsider`: user in "Outsiders", no rights.
//! - 5 `colleague`: user in "Operators".
//!
//! Hosts: 10 `web` (Linux), 11 `db` (Linux and Windows), 12 `win` (Windows).

#![allow(dead_code)]

use monapi_core::proto::{ErrorKind, GetResult, Id, Row, Value};
use monapi_core::{
    ApiService, Catalog, Error, MemoryAuditSink, SqlExecutor, SqliteStore, UserContext,
};
use serde_json::Value as Json;

pub const ADMIN: Id = 1;
pub const GUEST: Id = 2;
pub const MANAGER: Id = 3;
pub const OUTSIDER: Id = 4;

const SEED: &str = "
INSERT INTO users (userid, username, name, surname, type) VALUES
    (1, 'Admin', 'Super', 'Administrator', 3),
    (2, 'guest', 'Guest', '', 1),
    (3, 'manager', 'Mia', 'Manager', 2),
    (4, 'outsider', 'Otto', 'Outsider', 1),
    (5, 'colleague', 'Cole', 'League', 1);

INSERT INTO usrgrp (usrgrpid, name) VALUES (7, 'Operators'), (8, 'Managers'), (9, 'Outsiders');
INSERT INTO users_groups (id, usrgrpid, userid) VALUES (1, 7, 2), (2, 8, 3), (3, 9, 4), (4, 7, 5);

INSERT INTO hstgrp (groupid, name) VALUES (20, 'Linux'), (21, 'Windows');
INSERT INTO rights (rightid, groupid, permission, id) VALUES (1, 7, 2, 20), (2, 8, 3, 20), (3, 8, 0, 21);

INSERT INTO proxy (proxyid, name, operating_mode) VALUES (1, 'alpha', 0), (2, 'beta', 1);
INSERT INTO proxy_rtdata (proxyid, lastaccess, version) VALUES (1, 1700000000, 70000), (2, 0, 0);

INSERT INTO hosts (hostid, host, name, proxyid) VALUES
    (10, 'web', 'Web server', 1),
    (11, 'db', 'Database', 1),
    (12, 'win', 'Windows box', NULL);
INSERT INTO hosts_groups (hostgroupid, hostid, groupid) VALUES (1, 10, 20), (2, 11, 20), (3, 11, 21), (4, 12, 21);

INSERT INTO items (itemid, hostid, name, key_, value_type) VALUES
    (100, 10, 'CPU load', 'system.cpu.load', 0),
    (101, 11, 'Free memory', 'vm.memory.size', 3),
    (102, 12, 'Free disk', 'vfs.fs.size', 3);

INSERT INTO applications (applicationid, hostid, name) VALUES (200, 10, 'CPU'), (201, 11, 'Memory'), (202, 12, 'Disk');
INSERT INTO items_applications (itemappid, applicationid, itemid) VALUES (1, 200, 100), (2, 201, 101), (3, 202, 102);
INSERT INTO application_prototype (application_prototypeid, itemid, name) VALUES (300, 100, 'CPU');
INSERT INTO application_discovery (application_discoveryid, applicationid, application_prototypeid, name)
    VALUES (1, 200, 300, 'CPU');

INSERT INTO graphs (graphid, name) VALUES (40, 'CPU graph');
INSERT INTO graphs_items (gitemid, graphid, itemid) VALUES (50, 40, 100);

INSERT INTO history (itemid, clock, value) VALUES (100, 100, 0.5), (100, 200, 0.75), (100, 300, 1.25);
INSERT INTO history_uint (itemid, clock, value) VALUES (101, 150, 2048), (102, 150, 4096);
INSERT INTO trends (itemid, clock, num, value_min, value_avg, value_max) VALUES (100, 3600, 60, 0.5, 0.8, 1.25);
INSERT INTO trends_uint (itemid, clock, num, value_min, value_avg, value_max) VALUES (101, 3600, 60, 1024, 2048, 4096);

INSERT INTO triggers (triggerid, description) VALUES (500, 'CPU is high'), (501, 'Disk is full');
INSERT INTO functions (functionid, itemid, triggerid) VALUES (1, 100, 500), (2, 102, 501);
INSERT INTO problem (eventid, objectid, clock, name, severity, r_eventid, r_clock) VALUES
    (1000, 500, 100, 'CPU is high', 3, NULL, 0),
    (1001, 501, 200, 'Disk is full', 4, NULL, 0),
    (1002, 500, 50, 'CPU was warm', 2, 1003, 60);
INSERT INTO problem_tag (problemtagid, eventid, tag, value) VALUES
    (1, 1000, 'service', 'web'),
    (2, 1000, 'env', 'prod'),
    (3, 1001, 'service', 'db'),
    (4, 1002, 'service', 'web');
INSERT INTO acknowledges (acknowledgeid, eventid, userid, clock, message) VALUES (1, 1000, 2, 110, 'on it');

INSERT INTO icon_map (iconmapid, name, default_iconid) VALUES (1, 'Servers', 2);
INSERT INTO icon_mapping (iconmappingid, iconmapid, iconid, inventory_link, expression, sortorder)
    VALUES (1, 1, 3, 1, 'srv.*', 0);

INSERT INTO sysmaps (sysmapid, name, userid, private, iconmapid) VALUES
    (1, 'Public map', 1, 0, 1),
    (2, 'Shared map', 1, 1, NULL),
    (3, 'Secret map', 1, 1, NULL);
INSERT INTO sysmap_user (sysmapuserid, sysmapid, userid, permission) VALUES (1, 2, 2, 2);
INSERT INTO sysmaps_elements (selementid, sysmapid, label) VALUES (1, 1, 'router'), (2, 2, 'switch'), (3, 3, 'vault');
INSERT INTO sysmap_element_url (sysmapelementurlid, selementid, name, url) VALUES (1, 1, 'Wiki', 'https://wiki.local/router');
";

pub struct TestContext {
    pub store: SqliteStore,
    pub catalog: Catalog,
    pub audit: MemoryAuditSink,
    _db_dir: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let db_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(db_dir.path().join("monapi.db")).unwrap();
        store.install_schema().unwrap();
        store.execute_batch(SEED).unwrap();

        Self {
            store,
            catalog: Catalog::standard(),
            audit: MemoryAuditSink::default(),
            _db_dir: db_dir,
        }
    }

    pub fn service(&self) -> ApiService<'_> {
        ApiService::new(&self.catalog, &self.store as &dyn SqlExecutor).with_audit(&self.audit)
    }

    pub fn user(&self, user_id: Id) -> UserContext {
        self.store.load_user(user_id).unwrap()
    }

    pub fn get(&self, user_id: Id, entity: &str, params: Json) -> GetResult {
        self.service()
            .get(&self.user(user_id), entity, &params)
            .unwrap()
    }

    pub fn get_err(&self, user_id: Id, entity: &str, params: Json) -> Error {
        self.service()
            .get(&self.user(user_id), entity, &params)
            .unwrap_err()
    }

    /// Count rows straight from the store, bypassing the API.
    pub fn count_rows(&self, sql: &str) -> i64 {
        let rows = self
            .store
            .select(&monapi_core::Sql::new(sql))
            .unwrap();
        rows.first()
            .and_then(|row| row.values().next())
            .and_then(Value::as_i64)
            .unwrap()
    }
}

/// Sorted primary keys of a `preservekeys` result.
pub fn ids(result: &GetResult) -> Vec<Id> {
    let mut keys = result.keys();
    keys.sort_unstable();
    keys
}

/// One row of a `preservekeys` result.
pub fn row(result: &GetResult, id: Id) -> Row {
    match result {
        GetResult::Keyed(rows) => rows
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, row)| row.clone())
            .unwrap_or_else(|| panic!("row {} missing", id)),
        other => panic!("expected a keyed result, got {:?}", other),
    }
}

/// Integer column values in row order.
pub fn int_column(result: &GetResult, field: &str) -> Vec<i64> {
    result
        .column(field)
        .iter()
        .map(|value| value.as_i64().unwrap())
        .collect()
}

pub fn assert_kind(err: &Error, kind: ErrorKind) {
    assert_eq!(err.kind(), kind, "unexpected error: {}", err);
}
