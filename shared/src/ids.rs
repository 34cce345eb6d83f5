//! Identifier newtypes carried on the wire.
//!
//! Request and listener ids are separate types so an event callback id can
//! never be looked up in the request table (or the other way round).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation id of a one-shot request/reply pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

/// Correlation id of an event listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(pub u64);

/// Identity of one engine instance, passed to the worklet as `chuckID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChuckId(pub u32);

/// Handle of a shred running inside the engine.
///
/// Only positive values are valid handles. The engine reports failure with
/// `0` or a negative number; use [`ShredId::from_raw`] to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShredId(pub i64);

impl ShredId {
    /// Interpret a raw engine value, mapping the failure sentinel to `None`.
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// Result of a replace operation: the shred that was swapped out and the one
/// that took its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacedShred {
    pub old_shred: ShredId,
    pub new_shred: ShredId,
}

macro_rules! impl_display {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

impl_display!(RequestId, ListenerId, ChuckId, ShredId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shred_sentinel() {
        assert_eq!(ShredId::from_raw(1), Some(ShredId(1)));
        assert_eq!(ShredId::from_raw(0), None);
        assert_eq!(ShredId::from_raw(-3), None);
    }

    #[test]
    fn test_ids_are_transparent_on_the_wire() {
        assert_eq!(serde_json::to_string(&RequestId(7)).unwrap(), "7");
        let id: ListenerId = serde_json::from_str("3").unwrap();
        assert_eq!(id, ListenerId(3));
    }
}
