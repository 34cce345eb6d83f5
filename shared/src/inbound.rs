//! Replies and notifications posted by the engine.

use serde::{Deserialize, Serialize};

use crate::ids::{ListenerId, RequestId};
use crate::tags::InTag;

/// A message from the engine.
///
/// Shred ids are kept raw here: the engine signals failure with `0` or a
/// negative number and the host decides what that means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InMessage {
    #[serde(rename = "initCallback")]
    InitDone,
    #[serde(rename = "console print")]
    Print { message: String },
    #[serde(rename = "eventCallback")]
    Event { callback: ListenerId },

    #[serde(rename = "intCallback")]
    Int { callback: RequestId, result: i64 },
    #[serde(rename = "floatCallback")]
    Float { callback: RequestId, result: f64 },
    #[serde(rename = "stringCallback")]
    String { callback: RequestId, result: String },
    #[serde(rename = "intArrayCallback")]
    IntArray { callback: RequestId, result: Vec<i64> },
    #[serde(rename = "floatArrayCallback")]
    FloatArray { callback: RequestId, result: Vec<f64> },

    #[serde(rename = "newShredCallback")]
    NewShred { callback: RequestId, shred: i64 },
    #[serde(rename = "replacedShredCallback")]
    ReplacedShred {
        callback: RequestId,
        #[serde(rename = "oldShred")]
        old_shred: i64,
        #[serde(rename = "newShred")]
        new_shred: i64,
    },
    #[serde(rename = "removedShredCallback")]
    RemovedShred { callback: RequestId, shred: i64 },

    /// Any `type` the host does not understand.
    #[serde(other)]
    Unknown,
}

impl InMessage {
    /// The message's kind, or `None` for [`InMessage::Unknown`].
    pub fn tag(&self) -> Option<InTag> {
        Some(match self {
            InMessage::InitDone => InTag::InitDone,
            InMessage::Print { .. } => InTag::Print,
            InMessage::Event { .. } => InTag::Event,
            InMessage::Int { .. } => InTag::Int,
            InMessage::Float { .. } => InTag::Float,
            InMessage::String { .. } => InTag::String,
            InMessage::IntArray { .. } => InTag::IntArray,
            InMessage::FloatArray { .. } => InTag::FloatArray,
            InMessage::NewShred { .. } => InTag::NewShred,
            InMessage::ReplacedShred { .. } => InTag::ReplacedShred,
            InMessage::RemovedShred { .. } => InTag::RemovedShred,
            InMessage::Unknown => return None,
        })
    }

    /// The request id this reply settles, if it is a reply.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            InMessage::Int { callback, .. }
            | InMessage::Float { callback, .. }
            | InMessage::String { callback, .. }
            | InMessage::IntArray { callback, .. }
            | InMessage::FloatArray { callback, .. }
            | InMessage::NewShred { callback, .. }
            | InMessage::ReplacedShred { callback, .. }
            | InMessage::RemovedShred { callback, .. } => Some(*callback),
            _ => None,
        }
    }
}
