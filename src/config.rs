use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ChuckError;
use crate::fs::Filename;

pub const DEFAULT_CHUCK_SRC: &str = "https://chuck.stanford.edu/webchuck/src/";

/// How a node is built by the web factory.
///
/// ```ron
/// (
///     chuck_src: "https://chuck.stanford.edu/webchuck/src/",
///     num_out_channels: 2,
///     sample_rate: Some(48000),
///     preload: [(serverFilename: "sounds/kick.wav", virtualFilename: "kick.wav")],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChuckConfig {
    /// Base URL of `webchuck.wasm` and `webchuck.js`, with a trailing slash.
    pub chuck_src: String,
    pub num_out_channels: u32,
    /// Sample rate of a context created by the factory. `None` lets the
    /// browser pick.
    pub sample_rate: Option<NonZeroU32>,
    /// Files placed in the engine's filesystem before it starts.
    pub preload: Vec<Filename>,
}

impl Default for ChuckConfig {
    fn default() -> Self {
        Self {
            chuck_src: DEFAULT_CHUCK_SRC.to_string(),
            num_out_channels: 2,
            sample_rate: None,
            preload: Vec::new(),
        }
    }
}

impl ChuckConfig {
    pub fn from_ron(text: &str) -> Result<Self, ChuckError> {
        ron::from_str(text).map_err(|e| ChuckError::Config(e.to_string()))
    }

    /// Like [`ChuckConfig::from_ron`], but falls back to the defaults when
    /// `text` does not parse.
    pub fn load(text: &str) -> Self {
        match Self::from_ron(text) {
            Ok(config) => {
                info!("loaded node config, engine at '{}'", config.chuck_src);
                config
            }
            Err(e) => {
                warn!("unable to parse node config, switching to defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn to_ron(&self) -> Result<String, ChuckError> {
        ron::ser::to_string_pretty(self, Default::default())
            .map_err(|e| ChuckError::Config(e.to_string()))
    }

    pub fn wasm_url(&self) -> String {
        format!("{}webchuck.wasm", self.chuck_src)
    }

    pub fn worklet_url(&self) -> String {
        format!("{}webchuck.js", self.chuck_src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChuckConfig::default();
        assert_eq!(config.num_out_channels, 2);
        assert_eq!(
            config.wasm_url(),
            "https://chuck.stanford.edu/webchuck/src/webchuck.wasm"
        );
        assert_eq!(
            config.worklet_url(),
            "https://chuck.stanford.edu/webchuck/src/webchuck.js"
        );
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = ChuckConfig::from_ron(
            r#"(
                chuck_src: "/static/chuck/",
                sample_rate: Some(44100),
                preload: [(serverFilename: "a/kick.wav", virtualFilename: "kick.wav")],
            )"#,
        )
        .unwrap();
        assert_eq!(config.chuck_src, "/static/chuck/");
        assert_eq!(config.num_out_channels, 2);
        assert_eq!(config.sample_rate, NonZeroU32::new(44100));
        assert_eq!(config.preload, vec![Filename::new("a/kick.wav", "kick.wav")]);
        assert_eq!(config.worklet_url(), "/static/chuck/webchuck.js");
    }

    #[test]
    fn test_strict_and_lenient_parsing() {
        assert!(matches!(
            ChuckConfig::from_ron("(num_out_channels: \"two\")"),
            Err(ChuckError::Config(_))
        ));
        assert_eq!(ChuckConfig::load("not ron at all"), ChuckConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let config = ChuckConfig {
            num_out_channels: 4,
            ..Default::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(ChuckConfig::from_ron(&text).unwrap(), config);
    }
}
