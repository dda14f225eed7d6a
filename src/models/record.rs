//! Schemaless records and entity payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An ordered mapping from field name to value.
pub type Record = serde_json::Map<String, Value>;

/// What an entity fetch produces: a record list, or a single object for
/// non-paginated resources such as the case summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityData {
    List(Vec<Record>),
    Object(Record),
}

impl EntityData {
    /// View the payload as a record slice; a single object is a one-record list.
    pub fn records(&self) -> &[Record] {
        match self {
            EntityData::List(records) => records,
            EntityData::Object(record) => std::slice::from_ref(record),
        }
    }

    /// Number of records carried
    pub fn len(&self) -> usize {
        self.records().len()
    }
}

/// Convert a JSON value that must be an object into a record.
pub fn into_record(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Case-insensitive string form of a field value.
///
/// Missing and null fields are the empty string; strings are used as-is;
/// everything else uses its JSON rendering.
pub fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_is_one_record_list() {
        let record = into_record(json!({"case_id": 1})).unwrap();
        let data = EntityData::Object(record.clone());
        assert_eq!(data.records(), &[record]);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_field_text_coercion() {
        assert_eq!(field_text(None), "");
        assert_eq!(field_text(Some(&Value::Null)), "");
        assert_eq!(field_text(Some(&json!("MiXeD"))), "mixed");
        assert_eq!(field_text(Some(&json!(42))), "42");
        assert_eq!(field_text(Some(&json!(true))), "true");
        assert_eq!(field_text(Some(&json!({"Tag": "A"}))), r#"{"tag":"a"}"#);
    }

    #[test]
    fn test_untagged_serialization() {
        let list = EntityData::List(vec![into_record(json!({"a": 1})).unwrap()]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"[{"a":1}]"#);

        let parsed: EntityData = serde_json::from_str(r#"{"b": 2}"#).unwrap();
        assert!(matches!(parsed, EntityData::Object(_)));
    }
}
