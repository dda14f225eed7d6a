//! Relational backend reading the case tables directly

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{Connection, Params};

use super::CaseSource;
use crate::db::{open_read_only, parse_json_text, row_to_record, run_blocking};
use crate::error::{Error, Result};
use crate::models::{EntityData, EntityKind, Record};

/// Text columns that hold serialized JSON
const JSON_COLUMNS: [&str; 2] = ["custom_attributes", "modification_history"];

const CASES_SQL: &str = "
    SELECT c.case_id, c.name AS case_name, c.description,
           c.open_date, c.close_date, c.soc_id,
           c.status_id, c.severity_id, c.owner_id
    FROM cases c
    ORDER BY c.case_id DESC";

fn entity_sql(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Case => {
            "SELECT c.case_id, c.name AS case_name, c.description,
                    c.open_date, c.close_date, c.soc_id,
                    c.status_id, c.severity_id,
                    c.classification_id, c.owner_id,
                    c.custom_attributes
             FROM cases c
             WHERE c.case_id = ?1"
        }
        EntityKind::Assets => {
            "SELECT ca.asset_id, ca.asset_name, ca.asset_description,
                    ca.asset_ip, ca.asset_domain, ca.asset_compromise_status_id,
                    ca.asset_type_id, ca.analysis_status_id,
                    ca.date_added, ca.date_update,
                    ca.custom_attributes
             FROM case_assets ca
             WHERE ca.case_id = ?1
             ORDER BY ca.date_added DESC"
        }
        EntityKind::Iocs => {
            "SELECT i.ioc_id, i.ioc_value, i.ioc_description,
                    i.ioc_type_id, i.ioc_tlp_id,
                    i.ioc_tags, i.custom_attributes,
                    il.ioc_link_id
             FROM ioc i
             JOIN ioc_link il ON i.ioc_id = il.ioc_id
             WHERE il.case_id = ?1
             ORDER BY i.ioc_id DESC"
        }
        EntityKind::Events => {
            "SELECT ce.event_id, ce.event_title, ce.event_content,
                    ce.event_raw, ce.event_source, ce.event_date,
                    ce.event_tz, ce.event_in_summary,
                    ce.event_in_graph, ce.event_color,
                    ce.event_tags, ce.custom_attributes,
                    ce.modification_history
             FROM cases_events ce
             WHERE ce.case_id = ?1
             ORDER BY ce.event_date DESC"
        }
        EntityKind::Tasks => {
            "SELECT ct.id AS task_id, ct.task_title, ct.task_description,
                    ct.task_status_id, ct.task_tags,
                    ct.task_open_date, ct.task_close_date,
                    ct.custom_attributes
             FROM case_tasks ct
             WHERE ct.case_id = ?1
             ORDER BY ct.task_open_date DESC"
        }
        EntityKind::Notes => {
            "SELECT n.note_id, n.note_title, n.note_content,
                    n.note_creationdate, n.note_lastupdate,
                    n.custom_attributes
             FROM notes n
             JOIN notes_group ng ON n.note_group_id = ng.group_id
             WHERE ng.group_case_id = ?1
             ORDER BY n.note_lastupdate DESC"
        }
        EntityKind::Evidences => {
            "SELECT crf.id AS evidence_id, crf.filename,
                    crf.file_description, crf.file_hash,
                    crf.file_size, crf.date_added,
                    crf.custom_attributes
             FROM case_received_file crf
             WHERE crf.case_id = ?1
             ORDER BY crf.date_added DESC"
        }
    }
}

/// Case source reading a SQLite copy of the case schema
#[derive(Debug, Clone)]
pub struct DbCaseSource {
    path: PathBuf,
}

impl DbCaseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache credential for this backend: one key space per database file
    pub fn credential(&self) -> String {
        format!("db:{}", self.path.display())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn select_records<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let rows = stmt
        .query_map(params, |row| row_to_record(row, &names))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().map(decode_json_columns).collect())
}

fn decode_json_columns(mut record: Record) -> Record {
    for column in JSON_COLUMNS {
        if let Some(value) = record.get_mut(column) {
            *value = parse_json_text(value.take());
        }
    }
    record
}

#[async_trait]
impl CaseSource for DbCaseSource {
    async fn list_cases(&self) -> Result<EntityData> {
        let path = self.path.clone();
        let cases = run_blocking(move || {
            let conn = open_read_only(&path)?;
            select_records(&conn, CASES_SQL, [])
        })
        .await?;
        Ok(EntityData::List(cases))
    }

    async fn fetch_entity(&self, case_id: i64, kind: EntityKind) -> Result<EntityData> {
        let path = self.path.clone();
        let records = run_blocking(move || {
            let conn = open_read_only(&path)?;
            select_records(&conn, entity_sql(kind), [case_id])
        })
        .await?;

        match kind {
            EntityKind::Case => records
                .into_iter()
                .next()
                .map(EntityData::Object)
                .ok_or_else(|| Error::NotFound(format!("Case {}", case_id))),
            _ => Ok(EntityData::List(records)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::error::ErrorKind;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn setup() -> (TempDir, DbCaseSource) {
        let dir = TempDir::new().unwrap();
        let path = fixtures::case_db(dir.path());
        (dir, DbCaseSource::new(path))
    }

    fn field(data: &EntityData, name: &str) -> Vec<Value> {
        data.records().iter().map(|r| r[name].clone()).collect()
    }

    #[tokio::test]
    async fn test_list_cases_newest_first() {
        let (_dir, source) = setup();
        let cases = source.list_cases().await.unwrap();
        assert_eq!(field(&cases, "case_id"), vec![json!(42), json!(7)]);
        assert_eq!(cases.records()[0]["case_name"], "Phishing wave");
    }

    #[tokio::test]
    async fn test_case_summary_parses_custom_attributes() {
        let (_dir, source) = setup();
        let case = source.fetch_entity(42, EntityKind::Case).await.unwrap();
        assert!(matches!(case, EntityData::Object(_)));
        assert_eq!(
            case.records()[0]["custom_attributes"],
            json!({"Triage": {"priority": "high"}})
        );
    }

    #[tokio::test]
    async fn test_missing_case_is_not_found() {
        let (_dir, source) = setup();
        let err = source.fetch_entity(404, EntityKind::Case).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_entities_scoped_to_case_and_ordered() {
        let (_dir, source) = setup();

        let assets = source.fetch_entity(42, EntityKind::Assets).await.unwrap();
        assert_eq!(field(&assets, "asset_name"), vec![json!("MAIL-01"), json!("WKS-01")]);

        let iocs = source.fetch_entity(42, EntityKind::Iocs).await.unwrap();
        assert_eq!(
            field(&iocs, "ioc_value"),
            vec![json!("AS64512"), json!("evil.example.com"), json!("8.8.8.8")]
        );

        let notes = source.fetch_entity(42, EntityKind::Notes).await.unwrap();
        assert_eq!(field(&notes, "note_title"), vec![json!("Headers"), json!("First look")]);

        let tasks = source.fetch_entity(42, EntityKind::Tasks).await.unwrap();
        assert_eq!(tasks.records()[0]["task_id"], 1);

        let evidences = source.fetch_entity(42, EntityKind::Evidences).await.unwrap();
        assert_eq!(evidences.records()[0]["evidence_id"], 1);

        let other = source.fetch_entity(7, EntityKind::Iocs).await.unwrap();
        assert_eq!(field(&other, "ioc_value"), vec![json!("unrelated.example.org")]);
    }

    #[tokio::test]
    async fn test_events_decode_modification_history() {
        let (_dir, source) = setup();
        let events = source.fetch_entity(42, EntityKind::Events).await.unwrap();
        assert_eq!(field(&events, "event_id"), vec![json!(2), json!(1)]);
        assert_eq!(
            events.records()[1]["modification_history"],
            json!({"1714554000": {"user": "analyst"}})
        );
    }

    #[tokio::test]
    async fn test_unknown_case_entities_are_empty() {
        let (_dir, source) = setup();
        let assets = source.fetch_entity(404, EntityKind::Assets).await.unwrap();
        assert_eq!(assets.len(), 0);
    }

    #[test]
    fn test_credential_names_database() {
        let source = DbCaseSource::new("/tmp/cases.db");
        assert_eq!(source.credential(), "db:/tmp/cases.db");
    }
}
