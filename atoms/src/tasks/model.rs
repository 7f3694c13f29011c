use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Store-assigned task identifier. Always >= 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Returns `None` for zero, which is never a valid id.
    pub fn new(value: u64) -> Option<Self> {
        (value >= 1).then_some(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task domain model - the canonical stored entity
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
}

/// Incoming client representation. Every field is optional on the wire;
/// which ones are required depends on the ruleset it is validated under.
/// `id` is informational only and never used for writes, so any integer
/// is accepted there.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// RFC 3339, or an offset-less ISO date-time read as UTC.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_due_date"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Parse a client due date. Timestamps without an offset are taken as UTC.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_due_date(&raw).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "invalid dueDate '{}': expected an ISO-8601 date-time",
                    raw
                ))
            })
        })
        .transpose()
}

/// A validated payload. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

/// A task accepted under the creation ruleset, not yet assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
}

impl NewTask {
    pub fn with_id(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            completed: self.completed,
        }
    }
}

/// Response body for `GET /tasks`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

/// Response body for `POST /tasks`
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct CreatedTask {
    pub id: TaskId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(1))]
    #[case(u64::MAX, Some(u64::MAX))]
    fn task_id_rejects_zero(#[case] raw: u64, #[case] expected: Option<u64>) {
        assert_eq!(TaskId::new(raw).map(TaskId::get), expected);
    }

    #[rstest]
    fn task_serializes_with_camel_case_keys() {
        let task = Task {
            id: TaskId::new(7).unwrap(),
            title: "Buy milk".to_string(),
            description: "2%".to_string(),
            due_date: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
            completed: false,
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "title": "Buy milk",
                "description": "2%",
                "dueDate": "2030-01-02T03:04:05Z",
                "completed": false,
            })
        );
    }

    #[rstest]
    fn payload_treats_null_as_absent() {
        let payload: TaskPayload =
            serde_json::from_str(r#"{"title":null,"completed":true}"#).unwrap();
        assert_eq!(payload.title, None);
        assert_eq!(payload.completed, Some(true));
    }

    #[rstest]
    fn payload_rejects_mistyped_field() {
        let result = serde_json::from_str::<TaskPayload>(r#"{"completed":"yes"}"#);
        assert!(result.is_err());
    }

    #[rstest]
    #[case("2030-01-01T12:00:00+02:00")]
    #[case("2030-01-01T10:00:00Z")]
    #[case("2030-01-01T10:00:00")]
    #[case("2030-01-01T10:00:00.000")]
    fn payload_due_date_accepts_offset_and_local_forms(#[case] raw: &str) {
        let body = serde_json::json!({ "dueDate": raw }).to_string();
        let payload: TaskPayload = serde_json::from_str(&body).unwrap();
        assert_eq!(
            payload.due_date,
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 10, 0, 0).unwrap())
        );
    }

    #[rstest]
    #[case(r#"{"dueDate":"tomorrow"}"#)]
    #[case(r#"{"dueDate":"2030-01-01"}"#)]
    #[case(r#"{"dueDate":1893492000}"#)]
    fn payload_rejects_unparseable_due_date(#[case] body: &str) {
        assert!(serde_json::from_str::<TaskPayload>(body).is_err());
    }

    #[rstest]
    fn payload_due_date_null_is_absent() {
        let payload: TaskPayload = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        assert_eq!(payload.due_date, None);
    }

    #[rstest]
    #[case(-1)]
    #[case(0)]
    #[case(500)]
    fn payload_accepts_any_integer_id(#[case] id: i64) {
        let body = serde_json::json!({ "id": id, "completed": true }).to_string();
        let payload: TaskPayload = serde_json::from_str(&body).unwrap();
        assert_eq!(payload.id, Some(id));
    }
}
