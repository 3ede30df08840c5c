//! Integration tests for the `get` pipeline: option handling, result shaping
//! and related objects.

mod common;

use common::{assert_kind, ids, int_column, row, TestContext, ADMIN, GUEST};
use monapi_core::proto::{ErrorKind, GetOptions, GetResult, Output, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_count_matches_row_count() {
    let ctx = TestContext::new();

    for user in [ADMIN, GUEST] {
        let rows = ctx.get(user, "application", json!({"output": ["applicationid"]}));
        let count = ctx.get(user, "application", json!({"countOutput": true}));
        assert_eq!(count.count(), Some(rows.len() as u64));
    }
}

#[test]
fn test_repeated_calls_are_identical() {
    let ctx = TestContext::new();
    let params = json!({
        "output": "extend",
        "selectItems": ["name"],
        "sortfield": "name",
        "preservekeys": true
    });

    let first = ctx.get(ADMIN, "application", params.clone());
    let second = ctx.get(ADMIN, "application", params);
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_ids_are_ignored() {
    let ctx = TestContext::new();

    let once = ctx.get(ADMIN, "application", json!({"applicationids": [200]}));
    let twice = ctx.get(ADMIN, "application", json!({"applicationids": [200, "200"]}));
    assert_eq!(once, twice);
    assert_eq!(once.len(), 1);
}

#[test]
fn test_empty_id_set_matches_nothing() {
    let ctx = TestContext::new();

    let result = ctx.get(ADMIN, "application", json!({"applicationids": []}));
    assert!(result.is_empty());

    let count = ctx.get(
        ADMIN,
        "application",
        json!({"applicationids": [], "countOutput": true}),
    );
    assert_eq!(count, GetResult::Count(0));
}

#[test]
fn test_keys_match_primary_keys() {
    let ctx = TestContext::new();

    let result = ctx.get(
        ADMIN,
        "application",
        json!({"output": ["applicationid", "name"], "preservekeys": true}),
    );
    let GetResult::Keyed(rows) = &result else {
        panic!("expected a keyed result");
    };
    for (key, row) in rows {
        assert_eq!(row["applicationid"].as_id(), Some(*key));
    }
    assert_eq!(ids(&result), vec![200, 201, 202]);
}

#[test]
fn test_sort_and_limit() {
    let ctx = TestContext::new();

    let result = ctx.get(
        ADMIN,
        "application",
        json!({"output": ["name"], "sortfield": "name", "sortorder": "DESC", "limit": 2}),
    );
    assert_eq!(
        result.column("name"),
        vec![Value::from("Memory"), Value::from("Disk")]
    );
}

#[test]
fn test_invalid_limits_rejected() {
    let ctx = TestContext::new();

    for bad in [json!(0), json!("abc"), json!(-5)] {
        let err = ctx.get_err(ADMIN, "application", json!({ "limit": bad }));
        assert_kind(&err, ErrorKind::InvalidParameter);
    }
}

#[test]
fn test_unknown_names_rejected() {
    let ctx = TestContext::new();

    let err = ctx.get_err(ADMIN, "application", json!({"bogus": 1}));
    assert_kind(&err, ErrorKind::InvalidParameter);

    let err = ctx.get_err(ADMIN, "application", json!({"output": ["nope"]}));
    assert_kind(&err, ErrorKind::InvalidParameter);

    let err = ctx.get_err(ADMIN, "application", json!({"sortfield": "hostid"}));
    assert_kind(&err, ErrorKind::InvalidParameter);

    let err = ctx.get_err(ADMIN, "application", json!({"nopermissions": 1}));
    assert_kind(&err, ErrorKind::InvalidParameter);

    let err = ctx.get_err(ADMIN, "nosuchentity", json!({}));
    assert_kind(&err, ErrorKind::InvalidParameter);
}

#[test]
fn test_filter_and_search() {
    let ctx = TestContext::new();

    let filtered = ctx.get(
        ADMIN,
        "application",
        json!({"filter": {"name": ["CPU", "Disk"]}, "preservekeys": true}),
    );
    assert_eq!(ids(&filtered), vec![200, 202]);

    let searched = ctx.get(
        ADMIN,
        "application",
        json!({"search": {"name": "mem"}, "preservekeys": true}),
    );
    assert_eq!(ids(&searched), vec![201]);

    let excluded = ctx.get(
        ADMIN,
        "application",
        json!({"search": {"name": "mem"}, "excludeSearch": true, "preservekeys": true}),
    );
    assert_eq!(ids(&excluded), vec![200, 202]);
}

#[test]
fn test_search_by_any_with_nothing_to_match() {
    let ctx = TestContext::new();

    for params in [
        json!({"search": {"name": ""}, "searchByAny": true, "preservekeys": true}),
        json!({"filter": {"name": null}, "searchByAny": true, "preservekeys": true}),
        json!({"filter": {}, "searchByAny": true, "preservekeys": true}),
    ] {
        let result = ctx.get(ADMIN, "application", params.clone());
        assert_eq!(ids(&result), vec![200, 201, 202], "params: {}", params);
    }

    let either = ctx.get(
        ADMIN,
        "application",
        json!({
            "filter": {"name": "Disk"},
            "search": {"name": "mem"},
            "searchByAny": true,
            "preservekeys": true
        }),
    );
    assert_eq!(ids(&either), vec![202]);
}

#[test]
fn test_link_table_option() {
    let ctx = TestContext::new();

    let by_group = ctx.get(
        ADMIN,
        "application",
        json!({"groupids": [21], "preservekeys": true}),
    );
    assert_eq!(ids(&by_group), vec![201, 202]);

    let by_item = ctx.get(
        ADMIN,
        "application",
        json!({"itemids": 101, "preservekeys": true}),
    );
    assert_eq!(ids(&by_item), vec![201]);
}

#[test]
fn test_group_count() {
    let ctx = TestContext::new();

    let result = ctx.get(
        ADMIN,
        "application",
        json!({"countOutput": true, "groupCount": true, "hostids": [10, 11, 12]}),
    );
    let GetResult::GroupCounts(rows) = &result else {
        panic!("expected grouped counts, got {:?}", result);
    };
    let mut groups: Vec<(i64, i64)> = rows
        .iter()
        .map(|row| {
            (
                row["hostid"].as_i64().unwrap(),
                row["rowscount"].as_i64().unwrap(),
            )
        })
        .collect();
    groups.sort_unstable();
    assert_eq!(groups, vec![(10, 1), (11, 1), (12, 1)]);
}

#[test]
fn test_related_objects() {
    let ctx = TestContext::new();

    let result = ctx.get(
        GUEST,
        "application",
        json!({
            "output": ["name"],
            "applicationids": [200, 201],
            "selectHost": ["host"],
            "selectItems": "count",
            "selectDiscoveryRule": ["name", "key_"],
            "preservekeys": true
        }),
    );

    let cpu = row(&result, 200);
    let host = cpu["host"].as_object().unwrap();
    assert_eq!(host["host"], Value::from("web"));
    assert_eq!(cpu["items"], Value::Int(1));
    let rule = cpu["discoveryRule"].as_object().unwrap();
    assert_eq!(rule["key_"], Value::from("system.cpu.load"));

    let memory = row(&result, 201);
    assert_eq!(memory["discoveryRule"], Value::Null);
    assert_eq!(memory["items"], Value::Int(1));
}

#[test]
fn test_related_objects_survive_narrow_output() {
    let ctx = TestContext::new();

    // The host id is needed to resolve selectHost but not requested.
    let result = ctx.get(
        ADMIN,
        "application",
        json!({"output": ["name"], "applicationids": 202, "selectHost": "extend"}),
    );
    let rows = result.rows();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].contains_key("hostid"));
    assert!(!rows[0].contains_key("applicationid"));
    let host = rows[0]["host"].as_object().unwrap();
    assert_eq!(host["name"], Value::from("Windows box"));
}

#[test]
fn test_related_selection_is_validated() {
    let ctx = TestContext::new();

    let err = ctx.get_err(
        ADMIN,
        "application",
        json!({"selectDiscoveryRule": "count"}),
    );
    assert_kind(&err, ErrorKind::InvalidParameter);

    let err = ctx.get_err(ADMIN, "application", json!({"selectItems": ["nope"]}));
    assert_kind(&err, ErrorKind::InvalidParameter);
}

#[test]
fn test_typed_options() {
    let ctx = TestContext::new();
    let service = ctx.service();

    let options = GetOptions::new()
        .with_output(Output::fields(["name"]))
        .with_ids("proxyids", [1])
        .select("selectHosts", Output::fields(["host"]))
        .preserve_keys();
    let result = service.get_with(&ctx.user(ADMIN), "proxy", options).unwrap();

    let alpha = row(&result, 1);
    let hosts = alpha["hosts"].as_list().unwrap();
    let mut names: Vec<&str> = hosts
        .iter()
        .map(|host| host.as_object().unwrap()["host"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["db", "web"]);
}

#[test]
fn test_proxy_runtime_fields() {
    let ctx = TestContext::new();

    let result = ctx.get(
        ADMIN,
        "proxy",
        json!({"output": ["name", "lastaccess", "version"], "proxyids": 1}),
    );
    let rows = result.rows();
    assert_eq!(rows[0]["lastaccess"], Value::Int(1700000000));
    assert_eq!(rows[0]["version"], Value::Int(70000));

    let err = ctx.get_err(ADMIN, "proxy", json!({"output": ["tls_psk"]}));
    assert_kind(&err, ErrorKind::InvalidParameter);
}

#[test]
fn test_history_table_selection() {
    let ctx = TestContext::new();

    let floats = ctx.get(
        ADMIN,
        "history",
        json!({"history": 0, "itemids": [100], "sortfield": "clock", "sortorder": "DESC"}),
    );
    assert_eq!(int_column(&floats, "clock"), vec![300, 200, 100]);

    let recent = ctx.get(
        ADMIN,
        "history",
        json!({"history": 0, "itemids": [100], "time_from": 150, "sortfield": "clock"}),
    );
    assert_eq!(int_column(&recent, "clock"), vec![200, 300]);

    let unsigned = ctx.get(ADMIN, "history", json!({"itemids": [101]}));
    assert_eq!(unsigned.column("value"), vec![Value::Int(2048)]);

    let err = ctx.get_err(ADMIN, "history", json!({"history": 9}));
    assert_kind(&err, ErrorKind::InvalidParameter);

    let err = ctx.get_err(ADMIN, "history", json!({"filter": {"value": 1}}));
    assert_kind(&err, ErrorKind::InvalidParameter);
}

#[test]
fn test_trend_table_selection() {
    let ctx = TestContext::new();

    let floats = ctx.get(ADMIN, "trend", json!({"output": ["itemid", "num"]}));
    assert_eq!(int_column(&floats, "itemid"), vec![100]);

    let unsigned = ctx.get(ADMIN, "trend", json!({"value_type": 3, "output": ["itemid"]}));
    assert_eq!(int_column(&unsigned, "itemid"), vec![101]);
}

#[test]
fn test_problem_defaults_hide_resolved() {
    let ctx = TestContext::new();

    let open = ctx.get(ADMIN, "problem", json!({"preservekeys": true}));
    assert_eq!(ids(&open), vec![1000, 1001]);

    let recent = ctx.get(ADMIN, "problem", json!({"recent": true, "preservekeys": true}));
    assert_eq!(ids(&recent), vec![1000, 1001, 1002]);

    let severe = ctx.get(
        ADMIN,
        "problem",
        json!({"severities": [4, 5], "preservekeys": true}),
    );
    assert_eq!(ids(&severe), vec![1001]);
}

#[test]
fn test_problem_tag_filters() {
    let ctx = TestContext::new();

    let like = ctx.get(
        ADMIN,
        "problem",
        json!({"tags": [{"tag": "service", "value": "WE"}], "preservekeys": true}),
    );
    assert_eq!(ids(&like), vec![1000]);

    let exists = ctx.get(
        ADMIN,
        "problem",
        json!({"tags": [{"tag": "service"}], "preservekeys": true}),
    );
    assert_eq!(ids(&exists), vec![1000, 1001]);

    let both = json!([
        {"tag": "service", "value": "db", "operator": 1},
        {"tag": "env", "value": "prod"}
    ]);
    let all = ctx.get(
        ADMIN,
        "problem",
        json!({"tags": both, "evaltype": 0, "preservekeys": true}),
    );
    assert!(all.is_empty());
    let any = ctx.get(
        ADMIN,
        "problem",
        json!({"tags": both, "evaltype": 2, "preservekeys": true}),
    );
    assert_eq!(ids(&any), vec![1000, 1001]);

    // Two values of one tag are alternatives even under AND.
    let same_tag = ctx.get(
        ADMIN,
        "problem",
        json!({
            "tags": [
                {"tag": "service", "value": "web", "operator": 1},
                {"tag": "service", "value": "db", "operator": 1}
            ],
            "evaltype": 0,
            "preservekeys": true
        }),
    );
    assert_eq!(ids(&same_tag), vec![1000, 1001]);

    let err = ctx.get_err(ADMIN, "problem", json!({"evaltype": 1}));
    assert_kind(&err, ErrorKind::InvalidParameter);
}

#[test]
fn test_problem_tag_evaltype() {
    let ctx = TestContext::new();
    ctx.store
        .execute_batch(
            "INSERT INTO problem (eventid, objectid, clock, name, severity) VALUES
                 (1010, 500, 500, 'only a', 1),
                 (1011, 500, 510, 'only b', 1),
                 (1012, 500, 520, 'a and b', 1);
             INSERT INTO problem_tag (problemtagid, eventid, tag, value) VALUES
                 (10, 1010, 'a', 'x'),
                 (11, 1011, 'b', 'y'),
                 (12, 1012, 'a', 'x'),
                 (13, 1012, 'b', 'y');",
        )
        .unwrap();

    let tags = json!([
        {"tag": "a", "value": "x", "operator": 1},
        {"tag": "b", "value": "y", "operator": 1}
    ]);
    let all = ctx.get(
        ADMIN,
        "problem",
        json!({"tags": tags, "evaltype": 0, "preservekeys": true}),
    );
    assert_eq!(ids(&all), vec![1012]);

    let any = ctx.get(
        ADMIN,
        "problem",
        json!({"tags": tags, "evaltype": 2, "preservekeys": true}),
    );
    assert_eq!(ids(&any), vec![1010, 1011, 1012]);

    let seeded = ctx.get(
        ADMIN,
        "problem",
        json!({
            "tags": [
                {"tag": "service", "value": "web", "operator": 1},
                {"tag": "env", "value": "prod", "operator": 1}
            ],
            "evaltype": 0,
            "preservekeys": true
        }),
    );
    assert_eq!(ids(&seeded), vec![1000]);
}

#[test]
fn test_problem_child_rows() {
    let ctx = TestContext::new();

    let result = ctx.get(
        ADMIN,
        "problem",
        json!({
            "output": ["name"],
            "eventids": [1000, 1001],
            "selectTags": "extend",
            "selectAcknowledges": ["message"],
            "preservekeys": true
        }),
    );

    let cpu = row(&result, 1000);
    let mut tags: Vec<(String, String)> = cpu["tags"]
        .as_list()
        .unwrap()
        .iter()
        .map(|tag| {
            let tag = tag.as_object().unwrap();
            (
                tag["tag"].as_str().unwrap().to_string(),
                tag["value"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    tags.sort();
    assert_eq!(
        tags,
        vec![
            ("env".to_string(), "prod".to_string()),
            ("service".to_string(), "web".to_string())
        ]
    );
    let acks = cpu["acknowledges"].as_list().unwrap();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].as_object().unwrap()["message"], Value::from("on it"));

    let disk = row(&result, 1001);
    assert_eq!(disk["acknowledges"], Value::List(Vec::new()));
}

#[test]
fn test_call_dispatch() {
    let ctx = TestContext::new();
    let service = ctx.service();
    let admin = ctx.user(ADMIN);

    let json = service
        .call(&admin, "proxy.get", &json!({"output": ["name"], "proxyids": 2}))
        .unwrap();
    assert_eq!(json, json!([{"name": "beta"}]));

    let keyed = service
        .call(
            &admin,
            "proxy.get",
            &json!({"output": ["name"], "proxyids": 2, "preservekeys": true}),
        )
        .unwrap();
    assert_eq!(keyed, json!({"2": {"name": "beta"}}));

    let count = service
        .call(&admin, "proxy.get", &json!({"countOutput": true}))
        .unwrap();
    assert_eq!(count, json!(2));

    let err = service.call(&admin, "proxy.frobnicate", &json!({})).unwrap_err();
    assert_kind(&err, ErrorKind::InvalidParameter);
}
