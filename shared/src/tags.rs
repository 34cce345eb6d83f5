//! The closed wire vocabulary of the node's message port.
//!
//! Every message crossing the port carries one of these strings in its
//! `type` field. [`OutTag`] flows from the main thread to the engine,
//! [`InTag`] from the engine back.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

macro_rules! wire_tags {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $wire:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// The string carried in the message's `type` field.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)*
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)*
                    _ => Err(UnknownTag(s.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// A `type` string outside the known vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown message type {0:?}")]
pub struct UnknownTag(pub String);

wire_tags! {
    /// Commands sent to the engine.
    pub enum OutTag {
        // filesystem
        CreateFile = "createFile",
        CreateDirectory = "createDirectory",

        // run/replace code
        RunCode = "runChuckCode",
        RunCodeWithReplacementDac = "runChuckCodeWithReplacementDac",
        ReplaceCode = "replaceChuckCode",
        ReplaceCodeWithReplacementDac = "replaceChuckCodeWithReplacementDac",
        RemoveLastCode = "removeLastCode",

        // run/replace file
        RunFile = "runChuckFile",
        RunFileWithReplacementDac = "runChuckFileWithReplacementDac",
        RunFileWithArgs = "runChuckFileWithArgs",
        ReplaceFile = "replaceChuckFile",
        ReplaceFileWithReplacementDac = "replaceChuckFileWithReplacementDac",
        ReplaceFileWithArgs = "replaceChuckFileWithArgs",

        // shreds
        RemoveShred = "removeShred",
        IsShredActive = "isShredActive",

        // events
        SignalEvent = "signalChuckEvent",
        BroadcastEvent = "broadcastChuckEvent",
        ListenForEventOnce = "listenForChuckEventOnce",
        StartListeningForEvent = "startListeningForChuckEvent",
        StopListeningForEvent = "stopListeningForChuckEvent",

        // scalars
        SetInt = "setChuckInt",
        GetInt = "getChuckInt",
        SetFloat = "setChuckFloat",
        GetFloat = "getChuckFloat",
        SetString = "setChuckString",
        GetString = "getChuckString",

        // int[]
        SetIntArray = "setGlobalIntArray",
        GetIntArray = "getGlobalIntArray",
        SetIntArrayValue = "setGlobalIntArrayValue",
        GetIntArrayValue = "getGlobalIntArrayValue",
        SetAssociativeIntArrayValue = "setGlobalAssociativeIntArrayValue",
        GetAssociativeIntArrayValue = "getGlobalAssociativeIntArrayValue",

        // float[]
        SetFloatArray = "setGlobalFloatArray",
        GetFloatArray = "getGlobalFloatArray",
        SetFloatArrayValue = "setGlobalFloatArrayValue",
        GetFloatArrayValue = "getGlobalFloatArrayValue",
        SetAssociativeFloatArrayValue = "setGlobalAssociativeFloatArrayValue",
        GetAssociativeFloatArrayValue = "getGlobalAssociativeFloatArrayValue",

        // vm params
        SetParamInt = "setParamInt",
        GetParamInt = "getParamInt",
        SetParamFloat = "setParamFloat",
        GetParamFloat = "getParamFloat",
        SetParamString = "setParamString",
        GetParamString = "getParamString",

        // vm
        GetNow = "getChuckNow",

        // clear
        ClearInstance = "clearChuckInstance",
        ClearGlobals = "clearGlobals",
    }
}

wire_tags! {
    /// Replies and notifications sent by the engine.
    pub enum InTag {
        InitDone = "initCallback",
        Print = "console print",
        Event = "eventCallback",

        Int = "intCallback",
        Float = "floatCallback",
        String = "stringCallback",
        IntArray = "intArrayCallback",
        FloatArray = "floatArrayCallback",

        NewShred = "newShredCallback",
        ReplacedShred = "replacedShredCallback",
        RemovedShred = "removedShredCallback",
    }
}

impl InTag {
    /// Whether messages of this kind carry a `callback` correlation id.
    pub const fn is_correlated(self) -> bool {
        !matches!(self, InTag::InitDone | InTag::Print)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_back() {
        for tag in OutTag::ALL {
            assert_eq!(tag.as_str().parse::<OutTag>(), Ok(*tag));
        }
        for tag in InTag::ALL {
            assert_eq!(tag.as_str().parse::<InTag>(), Ok(*tag));
        }
    }

    #[test]
    fn test_wire_strings_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for tag in OutTag::ALL {
            assert!(seen.insert(tag.as_str()), "duplicate tag {tag}");
        }
        assert_eq!(OutTag::ALL.len(), 47);
        assert_eq!(InTag::ALL.len(), 11);
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            "bogus".parse::<InTag>(),
            Err(UnknownTag("bogus".to_string()))
        );
        assert!(!InTag::Print.is_correlated());
        assert!(InTag::Event.is_correlated());
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let err: Box<dyn std::error::Error> = Box::new(UnknownTag("bogus".to_string()));
        assert_eq!(err.to_string(), "unknown message type \"bogus\"");
        assert!(err.source().is_none());
    }
}
