//! Wire shapes exchanged over the window.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Request asking the page world for a post's framework properties.
pub const GET_VOICE_POST_INFO: &str = "getVoicePostInfo";

/// One-way notification asking the privileged side to save a file.
pub const DOWNLOAD_MEDIA: &str = "downloadMedia";

/// Ties a response to the request that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message on the window.
///
/// Fields beyond the canonical four are kept in `fields`, so responses can
/// carry their payload at top level (`{correlationId, properties,
/// isResponse}`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    #[serde(default)]
    pub is_response: bool,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl BridgeMessage {
    pub fn request(correlation_id: CorrelationId, kind: &str, data: Value) -> Self {
        Self {
            correlation_id: Some(correlation_id),
            kind: Some(kind.to_string()),
            data,
            ..Default::default()
        }
    }

    pub fn notification(kind: &str, data: Value) -> Self {
        Self {
            kind: Some(kind.to_string()),
            data,
            ..Default::default()
        }
    }

    pub fn response(correlation_id: CorrelationId, fields: Map<String, Value>) -> Self {
        Self {
            correlation_id: Some(correlation_id),
            is_response: true,
            fields,
            ..Default::default()
        }
    }

    /// Parse a raw window message. Anything that is not an object with the
    /// expected field types is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// A top-level field outside the canonical four.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Payload of a `downloadMedia` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadMedia {
    pub filename: String,
    pub url: String,
}

impl DownloadMedia {
    pub fn into_value(self) -> Value {
        json!({"filename": self.filename, "url": self.url})
    }
}

/// Payload of a `getVoicePostInfo` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicePostInfoRequest {
    pub post_id: String,
}

impl VoicePostInfoRequest {
    pub fn into_value(self) -> Value {
        json!({"postId": self.post_id})
    }
}
