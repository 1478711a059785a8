//! Execution outcomes and the fetch request descriptor

use super::values::Val;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Description of the external operation the script asked for
///
/// Purely informational: the engine never performs the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub id: u64,
    pub url: String,
    /// Always `None`; request options are not extracted from the call
    pub options: Option<Val>,
}

impl FetchRequest {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            options: None,
        }
    }
}

/// Result of a `run` or `resume` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Outcome {
    /// Execution paused at an external call; resume with `continuation_id`
    Suspended {
        continuation_id: u64,
        fetch_request: FetchRequest,
    },
    /// All statements ran
    Completed { value: Val },
}

impl Outcome {
    pub fn is_suspended(&self) -> bool {
        matches!(self, Outcome::Suspended { .. })
    }

    /// Id to pass to `resume`, if suspended
    pub fn continuation_id(&self) -> Option<u64> {
        match self {
            Outcome::Suspended {
                continuation_id, ..
            } => Some(*continuation_id),
            Outcome::Completed { .. } => None,
        }
    }

    /// Render the caller-facing JSON shape
    ///
    /// ```json
    /// {"type":"suspended","continuationId":1,"fetchRequest":{"id":1,"url":"u","options":null}}
    /// {"type":"completed","value":10}
    /// ```
    pub fn to_json(&self) -> JsonValue {
        match self {
            Outcome::Suspended {
                continuation_id,
                fetch_request,
            } => json!({
                "type": "suspended",
                "continuationId": continuation_id,
                "fetchRequest": {
                    "id": fetch_request.id,
                    "url": fetch_request.url,
                    "options": fetch_request.options.as_ref().map(Val::to_json),
                },
            }),
            Outcome::Completed { value } => json!({
                "type": "completed",
                "value": value.to_json(),
            }),
        }
    }
}
