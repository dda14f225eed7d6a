//! SQLite fixtures for tests: telemetry and case schemas with seed rows

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::{Value, json};

pub const TELEMETRY_SCHEMA: &str = "
CREATE TABLE ss_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_type TEXT NOT NULL,
    report_date TEXT,
    ip TEXT,
    port INTEGER,
    asn INTEGER,
    geo TEXT,
    hostname TEXT,
    tag TEXT,
    severity TEXT,
    raw_data TEXT,
    ingested_at TEXT
);
";

pub const INGESTION_LOG_SCHEMA: &str = "
CREATE TABLE ss_ingestion_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_started TEXT,
    run_finished TEXT,
    status TEXT,
    reports_found INTEGER,
    events_ingested INTEGER,
    events_skipped INTEGER,
    error_message TEXT
);
";

pub const CASE_SCHEMA: &str = "
CREATE TABLE cases (
    case_id INTEGER PRIMARY KEY,
    name TEXT, description TEXT, open_date TEXT, close_date TEXT, soc_id TEXT,
    status_id INTEGER, severity_id INTEGER, classification_id INTEGER, owner_id INTEGER,
    custom_attributes TEXT
);
CREATE TABLE case_assets (
    asset_id INTEGER PRIMARY KEY, case_id INTEGER,
    asset_name TEXT, asset_description TEXT, asset_ip TEXT, asset_domain TEXT,
    asset_compromise_status_id INTEGER, asset_type_id INTEGER, analysis_status_id INTEGER,
    date_added TEXT, date_update TEXT, custom_attributes TEXT
);
CREATE TABLE ioc (
    ioc_id INTEGER PRIMARY KEY,
    ioc_value TEXT, ioc_description TEXT, ioc_type_id INTEGER, ioc_tlp_id INTEGER,
    ioc_tags TEXT, custom_attributes TEXT
);
CREATE TABLE ioc_link (ioc_link_id INTEGER PRIMARY KEY, ioc_id INTEGER, case_id INTEGER);
CREATE TABLE cases_events (
    event_id INTEGER PRIMARY KEY, case_id INTEGER,
    event_title TEXT, event_content TEXT, event_raw TEXT, event_source TEXT,
    event_date TEXT, event_tz TEXT, event_in_summary INTEGER, event_in_graph INTEGER,
    event_color TEXT, event_tags TEXT, custom_attributes TEXT, modification_history TEXT
);
CREATE TABLE case_tasks (
    id INTEGER PRIMARY KEY, case_id INTEGER,
    task_title TEXT, task_description TEXT, task_status_id INTEGER, task_tags TEXT,
    task_open_date TEXT, task_close_date TEXT, custom_attributes TEXT
);
CREATE TABLE notes_group (group_id INTEGER PRIMARY KEY, group_title TEXT, group_case_id INTEGER);
CREATE TABLE notes (
    note_id INTEGER PRIMARY KEY, note_group_id INTEGER,
    note_title TEXT, note_content TEXT, note_creationdate TEXT, note_lastupdate TEXT,
    custom_attributes TEXT
);
CREATE TABLE case_received_file (
    id INTEGER PRIMARY KEY, case_id INTEGER,
    filename TEXT, file_description TEXT, file_hash TEXT, file_size INTEGER,
    date_added TEXT, custom_attributes TEXT
);
";

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Insert JSON object rows into `table`, one column per key
pub fn insert_rows(conn: &Connection, table: &str, rows: &[Value]) {
    for row in rows {
        let obj = row.as_object().expect("fixture rows are objects");
        let columns: Vec<&str> = obj.keys().map(String::as_str).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );
        let params: Vec<SqlValue> = obj.values().map(to_sql).collect();
        conn.execute(&sql, rusqlite::params_from_iter(params))
            .expect("fixture insert");
    }
}

/// Seed telemetry rows covering every serialization path
pub fn telemetry_rows() -> Vec<Value> {
    vec![
        json!({"report_type": "scan_http", "report_date": "2024-05-01", "ip": "8.8.8.8",
               "port": 80, "asn": 15169, "geo": "US", "hostname": "dns.google", "tag": "http",
               "severity": "low", "raw_data": r#"{"banner": "nginx"}"#,
               "ingested_at": "2024-05-02 03:04:05"}),
        json!({"report_type": "scan_ssh", "report_date": "2024-05-03", "ip": "10.0.0.5",
               "port": 22, "asn": 64512, "geo": "DE", "hostname": "evil.example.com",
               "tag": "ssh-brute", "severity": "high", "raw_data": r#"{"attempts": 12}"#,
               "ingested_at": "2024-05-04T01:00:00Z"}),
        json!({"report_type": "botnet_drone", "report_date": "2024-04-20", "ip": "192.0.2.10",
               "port": null, "asn": 64512, "geo": "NL", "hostname": null, "tag": "mirai",
               "severity": "critical", "raw_data": r#"{"family": "mirai"}"#,
               "ingested_at": 1714000000}),
        json!({"report_type": "scan_http", "report_date": null, "ip": "203.0.113.7",
               "port": 443, "asn": 13335, "geo": "GB", "hostname": "cdn.example.net",
               "tag": "https", "severity": "medium", "raw_data": "not json",
               "ingested_at": null}),
        json!({"report_type": "scan_ssh", "report_date": "2024-05-03", "ip": 3232235777_i64,
               "port": 22, "asn": null, "geo": "US", "hostname": "host_1.corp.example",
               "tag": "ssh", "severity": "low", "raw_data": null,
               "ingested_at": "2024-05-04 00:00:00"}),
    ]
}

/// Create a telemetry database with the seed rows; `with_log` adds ingestion runs
pub fn telemetry_db(dir: &Path, with_log: bool) -> PathBuf {
    let path = dir.join("telemetry.db");
    let conn = Connection::open(&path).expect("create telemetry db");
    conn.execute_batch(TELEMETRY_SCHEMA).expect("telemetry schema");
    insert_rows(&conn, "ss_events", &telemetry_rows());

    if with_log {
        conn.execute_batch(INGESTION_LOG_SCHEMA).expect("log schema");
        let runs: Vec<Value> = (1..=12)
            .map(|i| {
                json!({"run_started": format!("2024-05-{:02} 00:00:00", i),
                       "run_finished": format!("2024-05-{:02} 00:05:00", i),
                       "status": if i == 12 { "failed" } else { "success" },
                       "reports_found": i, "events_ingested": i * 10, "events_skipped": 0,
                       "error_message": if i == 12 { json!("timeout") } else { Value::Null }})
            })
            .collect();
        insert_rows(&conn, "ss_ingestion_log", &runs);
    }
    path
}

/// Create a case database holding case 42 (fully populated) and case 7 (one asset)
pub fn case_db(dir: &Path) -> PathBuf {
    let path = dir.join("cases.db");
    let conn = Connection::open(&path).expect("create case db");
    conn.execute_batch(CASE_SCHEMA).expect("case schema");

    insert_rows(
        &conn,
        "cases",
        &[
            json!({"case_id": 7, "name": "Old intrusion", "description": "closed",
                   "open_date": "2023-01-10", "soc_id": "SOC-7", "status_id": 2,
                   "custom_attributes": null}),
            json!({"case_id": 42, "name": "Phishing wave", "description": "Credential phish",
                   "open_date": "2024-05-01", "soc_id": "SOC-42", "status_id": 1,
                   "severity_id": 3, "owner_id": 1,
                   "custom_attributes": r#"{"Triage": {"priority": "high"}}"#}),
        ],
    );
    insert_rows(
        &conn,
        "case_assets",
        &[
            json!({"asset_id": 1, "case_id": 42, "asset_name": "WKS-01",
                   "asset_ip": "10.1.1.1", "asset_domain": "Corp.Example",
                   "date_added": "2024-05-01 10:00:00"}),
            json!({"asset_id": 2, "case_id": 42, "asset_name": "MAIL-01",
                   "asset_ip": "", "asset_domain": null,
                   "date_added": "2024-05-02 10:00:00"}),
            json!({"asset_id": 3, "case_id": 7, "asset_name": "DC-01",
                   "asset_ip": "10.9.9.9", "date_added": "2023-01-10 10:00:00"}),
        ],
    );
    insert_rows(
        &conn,
        "ioc",
        &[
            json!({"ioc_id": 1, "ioc_value": "8.8.8.8", "ioc_type_id": 76}),
            json!({"ioc_id": 2, "ioc_value": "evil.example.com", "ioc_type_id": 20}),
            json!({"ioc_id": 3, "ioc_value": "AS64512", "ioc_type_id": 1}),
            json!({"ioc_id": 4, "ioc_value": "unrelated.example.org", "ioc_type_id": 20}),
        ],
    );
    insert_rows(
        &conn,
        "ioc_link",
        &[
            json!({"ioc_link_id": 1, "ioc_id": 1, "case_id": 42}),
            json!({"ioc_link_id": 2, "ioc_id": 2, "case_id": 42}),
            json!({"ioc_link_id": 3, "ioc_id": 3, "case_id": 42}),
            json!({"ioc_link_id": 4, "ioc_id": 4, "case_id": 7}),
        ],
    );
    insert_rows(
        &conn,
        "cases_events",
        &[
            json!({"event_id": 1, "case_id": 42, "event_title": "Mail received",
                   "event_date": "2024-05-01 09:00:00",
                   "modification_history": r#"{"1714554000": {"user": "analyst"}}"#}),
            json!({"event_id": 2, "case_id": 42, "event_title": "Link clicked",
                   "event_date": "2024-05-01 09:05:00"}),
        ],
    );
    insert_rows(
        &conn,
        "case_tasks",
        &[json!({"id": 1, "case_id": 42, "task_title": "Reset passwords",
                 "task_open_date": "2024-05-01"})],
    );
    insert_rows(
        &conn,
        "notes_group",
        &[json!({"group_id": 1, "group_title": "Triage", "group_case_id": 42})],
    );
    insert_rows(
        &conn,
        "notes",
        &[
            json!({"note_id": 1, "note_group_id": 1, "note_title": "First look",
                   "note_lastupdate": "2024-05-01 11:00:00"}),
            json!({"note_id": 2, "note_group_id": 1, "note_title": "Headers",
                   "note_lastupdate": "2024-05-01 12:00:00"}),
        ],
    );
    insert_rows(
        &conn,
        "case_received_file",
        &[json!({"id": 1, "case_id": 42, "filename": "mail.eml",
                 "file_hash": "abc123", "file_size": 2048,
                 "date_added": "2024-05-01 10:30:00"})],
    );
    path
}
