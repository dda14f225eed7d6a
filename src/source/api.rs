//! REST backend: v2 paginated endpoints plus two legacy endpoints

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use super::CaseSource;
use crate::client::{IrisApi, collect_paginated};
use crate::error::{ApiError, Result};
use crate::models::record::into_record;
use crate::models::{EntityData, EntityKind, Record};

const CASES_PATH: &str = "/api/v2/cases";
const TIMELINE_PATH: &str = "/case/timeline/events/list";
const NOTES_PATH: &str = "/case/notes/directories/filter";

/// Case source backed by the case management REST API
pub struct ApiCaseSource<A: IrisApi> {
    api: A,
}

impl<A: IrisApi> ApiCaseSource<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    async fn case_summary(&self, case_id: i64) -> Result<EntityData> {
        let path = format!("{}/{}", CASES_PATH, case_id);
        let body = self.api.get_json(&path, &[]).await?;
        match unwrap_data(body) {
            Value::Object(record) => Ok(EntityData::Object(record)),
            _ => Err(ApiError::InvalidResponse(format!("Expected a case object from {}", path)).into()),
        }
    }

    async fn timeline(&self, case_id: i64) -> Result<EntityData> {
        let body = self
            .api
            .get_json(TIMELINE_PATH, &[("cid", case_id.to_string())])
            .await?;
        let events = match unwrap_data(body) {
            Value::Object(mut obj) => match obj.remove("timeline") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(_) => return Err(invalid(TIMELINE_PATH, "`timeline` is not a list")),
            },
            Value::Array(items) => items,
            _ => return Err(invalid(TIMELINE_PATH, "unexpected body shape")),
        };
        Ok(EntityData::List(records_of(events, TIMELINE_PATH)?))
    }

    /// Notes live inside directories; flatten them in directory order.
    async fn notes(&self, case_id: i64) -> Result<EntityData> {
        let body = self
            .api
            .get_json(NOTES_PATH, &[("cid", case_id.to_string())])
            .await?;
        let Value::Array(directories) = unwrap_data(body) else {
            debug!("Notes for case {} are not a directory list", case_id);
            return Ok(EntityData::List(Vec::new()));
        };

        let notes = directories
            .into_iter()
            .filter_map(|dir| match dir {
                Value::Object(mut dir) => match dir.remove("notes") {
                    Some(Value::Array(notes)) => Some(notes),
                    _ => None,
                },
                _ => None,
            })
            .flatten()
            .filter_map(into_record)
            .collect();
        Ok(EntityData::List(notes))
    }
}

#[async_trait]
impl<A: IrisApi> CaseSource for ApiCaseSource<A> {
    async fn list_cases(&self) -> Result<EntityData> {
        collect_paginated(&self.api, CASES_PATH).await
    }

    async fn fetch_entity(&self, case_id: i64, kind: EntityKind) -> Result<EntityData> {
        match kind {
            EntityKind::Case => self.case_summary(case_id).await,
            EntityKind::Assets | EntityKind::Iocs | EntityKind::Tasks | EntityKind::Evidences => {
                let path = format!("{}/{}/{}", CASES_PATH, case_id, kind.as_str());
                collect_paginated(&self.api, &path).await
            }
            EntityKind::Events => self.timeline(case_id).await,
            EntityKind::Notes => self.notes(case_id).await,
        }
    }
}

/// Legacy endpoints wrap their payload in `data`; some answer bare.
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut obj) if obj.contains_key("data") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn records_of(values: Vec<Value>, path: &str) -> Result<Vec<Record>> {
    values
        .into_iter()
        .map(into_record)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid(path, "non-object item"))
}

fn invalid(path: &str, what: &str) -> crate::error::Error {
    ApiError::InvalidResponse(format!("{} from {}", what, path)).into()
}
