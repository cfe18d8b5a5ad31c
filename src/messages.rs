//! Telemetry message wire shape.
//!
//! Messages are handed back to the caller, which forwards them to the
//! telemetry channel wrapped in a `send-message` envelope. The core never
//! transmits anything itself.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire version of the message body.
pub const MESSAGE_VERSION: u32 = 4;

/// Exclusive upper bound of the anti-duplicates nonce.
pub const ANTI_DUPLICATES_BOUND: u32 = 10_000_000;

/// One extracted telemetry message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub body: MessageBody,
    /// Opaque dedup tag copied from the output schema; forwarded untouched.
    #[serde(
        rename = "deduplicateBy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deduplicate_by: Option<String>,
}

/// The transmitted body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub action: String,
    pub payload: Map<String, Value>,
    pub ver: u32,
    /// Uniform nonce so identical observations from different clients do
    /// not collapse server-side.
    #[serde(rename = "anti-duplicates")]
    pub anti_duplicates: u32,
}

impl Message {
    /// Build a message for `action`, drawing a fresh anti-duplicates nonce.
    pub fn new(action: String, payload: Map<String, Value>, deduplicate_by: Option<String>) -> Self {
        Self {
            body: MessageBody {
                action,
                payload,
                ver: MESSAGE_VERSION,
                anti_duplicates: rand::thread_rng().gen_range(0..ANTI_DUPLICATES_BOUND),
            },
            deduplicate_by,
        }
    }

    /// Wrap the message the way the telemetry caller expects it.
    pub fn into_envelope(self) -> SendMessage {
        SendMessage {
            kind: "send-message".to_string(),
            args: self,
        }
    }
}

/// The caller-facing envelope: `{type: "send-message", args: message}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub args: Message,
}
