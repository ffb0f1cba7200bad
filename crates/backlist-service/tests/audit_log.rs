//! Audit log read and export tests.

mod common;

use common::TestHarness;
use serde_json::{json, Value};

/// Write raw NDJSON lines into the harness's audit file.
fn write_lines(harness: &TestHarness, lines: &[String]) {
    std::fs::write(&harness.audit_path, lines.join("\n") + "\n").expect("write audit file");
}

fn entry(order_id: &str, actor: &str, timestamp: &str) -> String {
    json!({
        "timestamp": timestamp,
        "order_id": order_id,
        "new_status": "shipped",
        "actor": actor,
        "db_available": true
    })
    .to_string()
}

#[tokio::test]
async fn empty_log_returns_empty_page() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/admin/audit")
        .add_header("authorization", harness.admin_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 0);
    assert_eq!(body["page"], 1);
    assert_eq!(body["perPage"], 50);
    assert!(body["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn filters_by_order_id_substring() {
    let harness = TestHarness::new();
    write_lines(
        &harness,
        &[
            entry("cs_alpha_1", "stripe-webhook", "2026-08-01T10:00:00Z"),
            entry("cs_beta_2", "stripe-webhook", "2026-08-02T10:00:00Z"),
            entry("cs_alpha_3", "dana", "2026-08-03T10:00:00Z"),
        ],
    );

    let response = harness
        .server
        .get("/v1/admin/audit")
        .add_query_param("orderId", "alpha")
        .add_header("authorization", harness.admin_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 2);
    let ids: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["order_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["cs_alpha_1", "cs_alpha_3"]);
}

#[tokio::test]
async fn filters_by_actor_and_date_range() {
    let harness = TestHarness::new();
    write_lines(
        &harness,
        &[
            entry("cs_1", "dana", "2026-07-15T09:00:00Z"),
            entry("cs_2", "dana", "2026-08-02T09:00:00Z"),
            entry("cs_3", "dana", "2026-08-20T09:00:00Z"),
            entry("cs_4", "stripe-webhook", "2026-08-02T12:00:00Z"),
        ],
    );

    let response = harness
        .server
        .get("/v1/admin/audit")
        .add_query_param("actor", "dana")
        .add_query_param("startDate", "2026-08-01")
        .add_query_param("endDate", "2026-08-10")
        .add_header("authorization", harness.admin_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"][0]["order_id"], "cs_2");
}

#[tokio::test]
async fn paginates_and_reports_total_count() {
    let harness = TestHarness::new();
    let lines: Vec<String> = (0..7)
        .map(|i| entry(&format!("cs_{i}"), "stripe-webhook", "2026-08-01T10:00:00Z"))
        .collect();
    write_lines(&harness, &lines);

    let response = harness
        .server
        .get("/v1/admin/audit")
        .add_query_param("page", "2")
        .add_query_param("perPage", "3")
        .add_header("authorization", harness.admin_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 7);
    assert_eq!(body["page"], 2);
    assert_eq!(body["perPage"], 3);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["order_id"], "cs_3");
}

#[tokio::test]
async fn malformed_lines_surface_as_raw_values() {
    let harness = TestHarness::new();
    write_lines(
        &harness,
        &[
            entry("cs_ok", "stripe-webhook", "2026-08-01T10:00:00Z"),
            "this line is not json".to_string(),
        ],
    );

    let response = harness
        .server
        .get("/v1/admin/audit")
        .add_header("authorization", harness.admin_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 2);
    assert_eq!(body["entries"][1]["raw"], "this line is not json");
}

#[tokio::test]
async fn export_returns_filtered_ndjson() {
    let harness = TestHarness::new();
    write_lines(
        &harness,
        &[
            entry("cs_keep_1", "dana", "2026-08-01T10:00:00Z"),
            entry("cs_drop", "stripe-webhook", "2026-08-01T11:00:00Z"),
            entry("cs_keep_2", "dana", "2026-08-01T12:00:00Z"),
        ],
    );

    let response = harness
        .server
        .get("/v1/admin/audit/export")
        .add_query_param("actor", "dana")
        .add_header("authorization", harness.admin_auth_header())
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers()["content-type"],
        "application/x-ndjson"
    );

    let body = response.text();
    let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let value: Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["actor"], "dana");
    }
}
