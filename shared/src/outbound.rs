//! Messages posted from the main thread to the engine.

use serde::{Deserialize, Serialize};

use crate::ids::{ListenerId, RequestId, ShredId};
use crate::tags::OutTag;

/// Contents of a file injected into the engine's virtual filesystem.
///
/// Text files travel as JS strings, everything else as a `Uint8Array`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileData {
    Text(String),
    Binary(Vec<u8>),
}

impl FileData {
    pub fn len(&self) -> usize {
        match self {
            FileData::Text(text) => text.len(),
            FileData::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A command for the engine.
///
/// Variants carrying a `callback` expect exactly one reply echoing that id;
/// the rest are fire-and-forget. Field names match what the worklet
/// processor reads, hence the snake_case `dac_name` next to camelCase tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutMessage {
    #[serde(rename = "createFile")]
    CreateFile {
        directory: String,
        filename: String,
        data: FileData,
    },
    #[serde(rename = "createDirectory")]
    CreateDirectory { directory: String, name: String },

    #[serde(rename = "runChuckCode")]
    RunCode { callback: RequestId, code: String },
    #[serde(rename = "runChuckCodeWithReplacementDac")]
    RunCodeWithReplacementDac {
        callback: RequestId,
        code: String,
        dac_name: String,
    },
    #[serde(rename = "replaceChuckCode")]
    ReplaceCode { callback: RequestId, code: String },
    #[serde(rename = "replaceChuckCodeWithReplacementDac")]
    ReplaceCodeWithReplacementDac {
        callback: RequestId,
        code: String,
        dac_name: String,
    },
    #[serde(rename = "removeLastCode")]
    RemoveLastCode { callback: RequestId },

    #[serde(rename = "runChuckFile")]
    RunFile { callback: RequestId, filename: String },
    #[serde(rename = "runChuckFileWithReplacementDac")]
    RunFileWithReplacementDac {
        callback: RequestId,
        filename: String,
        dac_name: String,
    },
    /// Also used for the args + replacement dac combination, which has no
    /// dedicated tag; the engine checks for `dac_name`.
    #[serde(rename = "runChuckFileWithArgs")]
    RunFileWithArgs {
        callback: RequestId,
        filename: String,
        colon_separated_args: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dac_name: Option<String>,
    },
    #[serde(rename = "replaceChuckFile")]
    ReplaceFile { callback: RequestId, filename: String },
    #[serde(rename = "replaceChuckFileWithReplacementDac")]
    ReplaceFileWithReplacementDac {
        callback: RequestId,
        filename: String,
        dac_name: String,
    },
    #[serde(rename = "replaceChuckFileWithArgs")]
    ReplaceFileWithArgs {
        callback: RequestId,
        filename: String,
        colon_separated_args: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dac_name: Option<String>,
    },

    #[serde(rename = "removeShred")]
    RemoveShred { callback: RequestId, shred: ShredId },
    #[serde(rename = "isShredActive")]
    IsShredActive { callback: RequestId, shred: ShredId },

    #[serde(rename = "signalChuckEvent")]
    SignalEvent { variable: String },
    #[serde(rename = "broadcastChuckEvent")]
    BroadcastEvent { variable: String },
    #[serde(rename = "listenForChuckEventOnce")]
    ListenForEventOnce { callback: ListenerId, variable: String },
    #[serde(rename = "startListeningForChuckEvent")]
    StartListeningForEvent { callback: ListenerId, variable: String },
    #[serde(rename = "stopListeningForChuckEvent")]
    StopListeningForEvent { callback: ListenerId, variable: String },

    #[serde(rename = "setChuckInt")]
    SetInt { variable: String, value: i64 },
    #[serde(rename = "getChuckInt")]
    GetInt { callback: RequestId, variable: String },
    #[serde(rename = "setChuckFloat")]
    SetFloat { variable: String, value: f64 },
    #[serde(rename = "getChuckFloat")]
    GetFloat { callback: RequestId, variable: String },
    #[serde(rename = "setChuckString")]
    SetString { variable: String, value: String },
    #[serde(rename = "getChuckString")]
    GetString { callback: RequestId, variable: String },

    #[serde(rename = "setGlobalIntArray")]
    SetIntArray { variable: String, values: Vec<i64> },
    #[serde(rename = "getGlobalIntArray")]
    GetIntArray { callback: RequestId, variable: String },
    #[serde(rename = "setGlobalIntArrayValue")]
    SetIntArrayValue {
        variable: String,
        index: i64,
        value: i64,
    },
    #[serde(rename = "getGlobalIntArrayValue")]
    GetIntArrayValue {
        callback: RequestId,
        variable: String,
        index: i64,
    },
    #[serde(rename = "setGlobalAssociativeIntArrayValue")]
    SetAssociativeIntArrayValue {
        variable: String,
        key: String,
        value: i64,
    },
    #[serde(rename = "getGlobalAssociativeIntArrayValue")]
    GetAssociativeIntArrayValue {
        callback: RequestId,
        variable: String,
        key: String,
    },

    #[serde(rename = "setGlobalFloatArray")]
    SetFloatArray { variable: String, values: Vec<f64> },
    #[serde(rename = "getGlobalFloatArray")]
    GetFloatArray { callback: RequestId, variable: String },
    #[serde(rename = "setGlobalFloatArrayValue")]
    SetFloatArrayValue {
        variable: String,
        index: i64,
        value: f64,
    },
    #[serde(rename = "getGlobalFloatArrayValue")]
    GetFloatArrayValue {
        callback: RequestId,
        variable: String,
        index: i64,
    },
    #[serde(rename = "setGlobalAssociativeFloatArrayValue")]
    SetAssociativeFloatArrayValue {
        variable: String,
        key: String,
        value: f64,
    },
    #[serde(rename = "getGlobalAssociativeFloatArrayValue")]
    GetAssociativeFloatArrayValue {
        callback: RequestId,
        variable: String,
        key: String,
    },

    #[serde(rename = "setParamInt")]
    SetParamInt { name: String, value: i64 },
    #[serde(rename = "getParamInt")]
    GetParamInt { callback: RequestId, name: String },
    #[serde(rename = "setParamFloat")]
    SetParamFloat { name: String, value: f64 },
    #[serde(rename = "getParamFloat")]
    GetParamFloat { callback: RequestId, name: String },
    #[serde(rename = "setParamString")]
    SetParamString { name: String, value: String },
    #[serde(rename = "getParamString")]
    GetParamString { callback: RequestId, name: String },

    #[serde(rename = "getChuckNow")]
    GetNow { callback: RequestId },

    #[serde(rename = "clearChuckInstance")]
    ClearInstance,
    #[serde(rename = "clearGlobals")]
    ClearGlobals,
}

impl OutMessage {
    pub fn tag(&self) -> OutTag {
        use OutMessage::*;
        match self {
            CreateFile { .. } => OutTag::CreateFile,
            CreateDirectory { .. } => OutTag::CreateDirectory,
            RunCode { .. } => OutTag::RunCode,
            RunCodeWithReplacementDac { .. } => OutTag::RunCodeWithReplacementDac,
            ReplaceCode { .. } => OutTag::ReplaceCode,
            ReplaceCodeWithReplacementDac { .. } => OutTag::ReplaceCodeWithReplacementDac,
            RemoveLastCode { .. } => OutTag::RemoveLastCode,
            RunFile { .. } => OutTag::RunFile,
            RunFileWithReplacementDac { .. } => OutTag::RunFileWithReplacementDac,
            RunFileWithArgs { .. } => OutTag::RunFileWithArgs,
            ReplaceFile { .. } => OutTag::ReplaceFile,
            ReplaceFileWithReplacementDac { .. } => OutTag::ReplaceFileWithReplacementDac,
            ReplaceFileWithArgs { .. } => OutTag::ReplaceFileWithArgs,
            RemoveShred { .. } => OutTag::RemoveShred,
            IsShredActive { .. } => OutTag::IsShredActive,
            SignalEvent { .. } => OutTag::SignalEvent,
            BroadcastEvent { .. } => OutTag::BroadcastEvent,
            ListenForEventOnce { .. } => OutTag::ListenForEventOnce,
            StartListeningForEvent { .. } => OutTag::StartListeningForEvent,
            StopListeningForEvent { .. } => OutTag::StopListeningForEvent,
            SetInt { .. } => OutTag::SetInt,
            GetInt { .. } => OutTag::GetInt,
            SetFloat { .. } => OutTag::SetFloat,
            GetFloat { .. } => OutTag::GetFloat,
            SetString { .. } => OutTag::SetString,
            GetString { .. } => OutTag::GetString,
            SetIntArray { .. } => OutTag::SetIntArray,
            GetIntArray { .. } => OutTag::GetIntArray,
            SetIntArrayValue { .. } => OutTag::SetIntArrayValue,
            GetIntArrayValue { .. } => OutTag::GetIntArrayValue,
            SetAssociativeIntArrayValue { .. } => OutTag::SetAssociativeIntArrayValue,
            GetAssociativeIntArrayValue { .. } => OutTag::GetAssociativeIntArrayValue,
            SetFloatArray { .. } => OutTag::SetFloatArray,
            GetFloatArray { .. } => OutTag::GetFloatArray,
            SetFloatArrayValue { .. } => OutTag::SetFloatArrayValue,
            GetFloatArrayValue { .. } => OutTag::GetFloatArrayValue,
            SetAssociativeFloatArrayValue { .. } => OutTag::SetAssociativeFloatArrayValue,
            GetAssociativeFloatArrayValue { .. } => OutTag::GetAssociativeFloatArrayValue,
            SetParamInt { .. } => OutTag::SetParamInt,
            GetParamInt { .. } => OutTag::GetParamInt,
            SetParamFloat { .. } => OutTag::SetParamFloat,
            GetParamFloat { .. } => OutTag::GetParamFloat,
            SetParamString { .. } => OutTag::SetParamString,
            GetParamString { .. } => OutTag::GetParamString,
            GetNow { .. } => OutTag::GetNow,
            ClearInstance => OutTag::ClearInstance,
            ClearGlobals => OutTag::ClearGlobals,
        }
    }

    /// The request id this message expects a reply for, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        use OutMessage::*;
        match self {
            RunCode { callback, .. }
            | RunCodeWithReplacementDac { callback, .. }
            | ReplaceCode { callback, .. }
            | ReplaceCodeWithReplacementDac { callback, .. }
            | RemoveLastCode { callback }
            | RunFile { callback, .. }
            | RunFileWithReplacementDac { callback, .. }
            | RunFileWithArgs { callback, .. }
            | ReplaceFile { callback, .. }
            | ReplaceFileWithReplacementDac { callback, .. }
            | ReplaceFileWithArgs { callback, .. }
            | RemoveShred { callback, .. }
            | IsShredActive { callback, .. }
            | GetInt { callback, .. }
            | GetFloat { callback, .. }
            | GetString { callback, .. }
            | GetIntArray { callback, .. }
            | GetIntArrayValue { callback, .. }
            | GetAssociativeIntArrayValue { callback, .. }
            | GetFloatArray { callback, .. }
            | GetFloatArrayValue { callback, .. }
            | GetAssociativeFloatArrayValue { callback, .. }
            | GetParamInt { callback, .. }
            | GetParamFloat { callback, .. }
            | GetParamString { callback, .. }
            | GetNow { callback } => Some(*callback),
            _ => None,
        }
    }

    /// The listener id this message registers or unregisters, if any.
    pub fn listener_id(&self) -> Option<ListenerId> {
        match self {
            OutMessage::ListenForEventOnce { callback, .. }
            | OutMessage::StartListeningForEvent { callback, .. }
            | OutMessage::StopListeningForEvent { callback, .. } => Some(*callback),
            _ => None,
        }
    }
}
