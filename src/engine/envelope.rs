//! Result envelope shared by every engine operation.
//!
//! ```json
//! {"status": "ok", "data": {...}}
//! {"status": "err", "error": "message"}
//! {"status": "err", "error": {"message": "...", "span": {"start": 0, "end": 3}}}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Span;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Err,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Message(String),
    Detailed {
        message: String,
        #[serde(default)]
        span: Option<Value>,
    },
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<ErrorPayload>,
}

impl Envelope {
    /// Decode the envelope from a JSON-RPC `result`
    pub fn from_value(value: Value) -> Result<Self, EngineError> {
        serde_json::from_value(value)
            .map_err(|e| EngineError::protocol(format!("Malformed result envelope: {e}")))
    }

    /// `Ok(None)` for an ok envelope without data.
    ///
    /// An err envelope becomes [`EngineError::Remote`]; its span is kept only
    /// when it decodes as a [`Span`].
    pub fn into_data<T: DeserializeOwned>(self) -> Result<Option<T>, EngineError> {
        match self.status {
            Status::Ok => match self.data {
                None | Some(Value::Null) => Ok(None),
                Some(data) => serde_json::from_value(data)
                    .map(Some)
                    .map_err(|e| EngineError::protocol(format!("Malformed result data: {e}"))),
            },
            Status::Err => Err(remote_error(self.error)),
        }
    }
}

fn remote_error(payload: Option<ErrorPayload>) -> EngineError {
    match payload {
        Some(ErrorPayload::Message(message)) => EngineError::remote(message),
        Some(ErrorPayload::Detailed { message, span }) => EngineError::Remote {
            message,
            span: span.and_then(|span| serde_json::from_value(span).ok()),
        },
        Some(ErrorPayload::Other(value)) => EngineError::remote(value.to_string()),
        None => EngineError::remote("unknown engine error"),
    }
}

/// `data` of a hover reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HoverData {
    #[serde(default)]
    pub contents: String,
    #[serde(default, deserialize_with = "lenient_span")]
    pub span: Option<Span>,
}

/// `data` of a completion reply
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CompletionData {
    #[serde(default)]
    pub items: Vec<RawCompletionItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompletionItem {
    pub label: String,
    /// Free-form kind label such as `function` or `keyword`
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub insert_text: Option<String>,
    /// `insert_text` contains `$1`-style placeholders
    #[serde(default)]
    pub is_snippet: bool,
}

/// `data` of a format reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatData {
    pub formatted: String,
}

/// A span that fails to decode is treated as absent
fn lenient_span<'de, D>(deserializer: D) -> Result<Option<Span>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}
