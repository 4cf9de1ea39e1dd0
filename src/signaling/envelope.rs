use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outer `type` tag every relayed envelope must carry.
pub const PROTOCOL_TAG: &str = "signaling-protocol";

/// `from` used on envelopes the relay synthesizes itself.
pub const SERVER_ID: &str = "signaling-server";

/// Routing wrapper around an opaque negotiation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    /// Required for offers; answers are routed on `to` alone.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub payload: Option<Payload>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadKind {
    Offer,
    Answer,
    Denied,
    Other(String),
}

impl From<&str> for PayloadKind {
    fn from(kind: &str) -> Self {
        match kind {
            "offer" => PayloadKind::Offer,
            "answer" => PayloadKind::Answer,
            "denied" => PayloadKind::Denied,
            other => PayloadKind::Other(other.to_string()),
        }
    }
}

impl Envelope {
    /// The denial the relay sends back when an offer has no eligible receiver.
    pub fn denial(to: &str) -> Self {
        Self {
            kind: PROTOCOL_TAG.to_string(),
            from: SERVER_ID.to_string(),
            to: Some(to.to_string()),
            payload: Some(Payload {
                kind: "denied".to_string(),
                fields: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    pub fn is_signaling(&self) -> bool {
        self.kind == PROTOCOL_TAG
    }

    /// Receiver identifier, if one was given. Absent, `null` and `""` all mean "any peer".
    pub fn target(&self) -> Option<&str> {
        self.to.as_deref().filter(|to| !to.is_empty())
    }

    pub fn payload_kind(&self) -> Option<PayloadKind> {
        self.payload.as_ref().map(|p| PayloadKind::from(p.kind.as_str()))
    }
}
