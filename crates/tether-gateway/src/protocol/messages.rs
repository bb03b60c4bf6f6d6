//! Socket frame format

use super::{HelloPayload, InitializePayload, OpCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One socket frame: `{op, seq?, t?, d?}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketMessage {
    /// Operation code
    pub op: OpCode,

    /// Sequence number (op 0 only; monotonic per server instance)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,

    /// Event name (op 0 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl SocketMessage {
    /// Create an event frame (op 0)
    #[must_use]
    pub fn event(name: impl Into<String>, seq: u64, data: impl Serialize) -> Self {
        Self {
            op: OpCode::Event,
            seq: Some(seq),
            t: Some(name.into()),
            d: Some(serde_json::to_value(data).unwrap_or_default()),
        }
    }

    /// Create a Hello frame (op 1)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            seq: None,
            t: None,
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
        }
    }

    /// Create a heartbeat acknowledgement frame (op 3)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::Heartbeat,
            seq: None,
            t: None,
            d: None,
        }
    }

    /// Try to parse the payload as an Initialize payload (op 2).
    ///
    /// `None` means `d` was missing, null, or not an object (the 4005
    /// close condition). A well-formed object with unusable field types
    /// decodes to an empty payload, which callers reject as an empty
    /// subscription set instead.
    #[must_use]
    pub fn as_initialize(&self) -> Option<InitializePayload> {
        let d = self.d.as_ref()?;
        if !d.is_object() {
            return None;
        }
        Some(serde_json::from_value(d.clone()).unwrap_or_default())
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for SocketMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.t, self.seq) {
            (Some(t), Some(seq)) => write!(f, "SocketMessage(op={}, t={t}, seq={seq})", self.op),
            (Some(t), None) => write!(f, "SocketMessage(op={}, t={t})", self.op),
            _ => write!(f, "SocketMessage(op={})", self.op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_frame() {
        let msg = SocketMessage::event("PRESENCE_UPDATE", 42, json!({"user_id": "1"}));
        assert_eq!(msg.op, OpCode::Event);
        assert_eq!(msg.seq, Some(42));
        assert_eq!(msg.t.as_deref(), Some("PRESENCE_UPDATE"));

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["op"], 0);
        assert_eq!(value["seq"], 42);
    }

    #[test]
    fn test_hello_frame() {
        let json = SocketMessage::hello(HelloPayload::default()).to_json().unwrap();
        assert!(json.contains("30000"));
        assert!(json.contains("\"op\":1"));
    }

    #[test]
    fn test_heartbeat_ack_is_bare() {
        let msg = SocketMessage::heartbeat_ack();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"op": 3}));
    }

    #[test]
    fn test_as_initialize() {
        let msg = SocketMessage {
            op: OpCode::Initialize,
            seq: None,
            t: None,
            d: Some(json!({"subscribe_to_ids": ["1", "2"]})),
        };
        let payload = msg.as_initialize().unwrap();
        assert_eq!(payload.subscription_set(), vec!["1", "2"]);
    }

    #[test]
    fn test_as_initialize_rejects_null_and_non_objects() {
        for d in [None, Some(Value::Null), Some(json!("str")), Some(json!([1]))] {
            let msg = SocketMessage {
                op: OpCode::Initialize,
                seq: None,
                t: None,
                d,
            };
            assert!(msg.as_initialize().is_none());
        }
    }

    #[test]
    fn test_as_initialize_tolerates_bad_field_types() {
        // An object with unusable fields decodes to an empty payload,
        // which the server rejects as an empty subscription set (4006).
        let msg = SocketMessage {
            op: OpCode::Initialize,
            seq: None,
            t: None,
            d: Some(json!({"subscribe_to_ids": 42})),
        };
        let payload = msg.as_initialize().unwrap();
        assert!(payload.subscription_set().is_empty());
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = SocketMessage::event("INIT_STATE", 1, json!({"user_id": "1"}));
        let parsed = SocketMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed.op, msg.op);
        assert_eq!(parsed.seq, msg.seq);
        assert_eq!(parsed.t, msg.t);
        assert_eq!(parsed.d, msg.d);
    }

    #[test]
    fn test_unknown_op_fails_decode() {
        assert!(SocketMessage::from_json("{\"op\":9}").is_err());
    }
}
