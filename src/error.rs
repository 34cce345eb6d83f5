use std::sync::Arc;
use thiserror::Error;

/// Everything a node operation can fail with.
///
/// Errors are `Clone` because a deferred result may be awaited by several
/// waiters at once; sources that are not `Clone` are kept behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum ChuckError {
    #[error("Running code failed")]
    RunFailed,

    #[error("Replacing code failed")]
    ReplaceFailed,

    #[error("Removing code failed")]
    RemoveFailed,

    #[error("Expected a {expected} reply, but the engine sent {found}")]
    UnexpectedReply {
        expected: &'static str,
        found: &'static str,
    },

    #[error("The node was closed before the engine replied")]
    Disposed,

    #[error("The request was cancelled")]
    Cancelled,

    #[error("The engine did not reply in time")]
    TimedOut,

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Arc<FetchError>,
    },

    #[error("Error: {0}")]
    Js(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ChuckError {
    pub(crate) fn fetch(url: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            url: url.into(),
            source: Arc::new(source),
        }
    }
}

/// Failures of a [`Fetch`](crate::fs::Fetch) implementation.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("response body is not valid UTF-8")]
    NotUtf8,

    #[error("{0}")]
    Transport(String),

    #[error("no file registered for this location")]
    NotFound,
}

#[cfg(feature = "web")]
mod js {
    use super::ChuckError;
    use core::fmt::Display;
    use wasm_bindgen::JsValue;

    /// Attach a description of what was being attempted to a browser API failure.
    pub trait JsContext<T> {
        fn context(self, context: impl Display) -> Result<T, ChuckError>;
    }

    impl<T> JsContext<T> for Result<T, JsValue> {
        fn context(self, context: impl Display) -> Result<T, ChuckError> {
            self.map_err(|e| ChuckError::Js(format!("{context}: {e:?}")))
        }
    }

    impl<T> JsContext<T> for Option<T> {
        fn context(self, context: impl Display) -> Result<T, ChuckError> {
            self.ok_or_else(|| ChuckError::Js(format!("{context}: not available")))
        }
    }
}

#[cfg(feature = "web")]
pub use js::JsContext;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_messages() {
        assert_eq!(ChuckError::RunFailed.to_string(), "Running code failed");
        assert_eq!(ChuckError::ReplaceFailed.to_string(), "Replacing code failed");
        assert_eq!(ChuckError::RemoveFailed.to_string(), "Removing code failed");
    }

    #[test]
    fn test_fetch_error_is_shared() {
        let err = ChuckError::fetch("https://x/y.wav", FetchError::Status { status: 404 });
        let copy = err.clone();
        assert_eq!(
            copy.to_string(),
            "Failed to fetch https://x/y.wav: server responded with status 404"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
