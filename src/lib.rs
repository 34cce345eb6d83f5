//! Main-thread bindings for the ChucK audio engine running inside a Web Audio
//! worklet.
//!
//! A [`Chuck`] handle turns engine commands into messages for a [`Port`] and
//! matches the engine's replies back to the futures waiting on them. The
//! engine itself is opaque; all this crate knows is the message vocabulary
//! in [`webchuck_shared`].
//!
//! With the `web` feature, [`Chuck::init`] loads the engine into an
//! `AudioWorkletNode`. Without it, attach a node to any transport with
//! [`Chuck::new`] or [`Chuck::with_channel`] and feed replies to
//! [`Chuck::receive`].

mod chugins;
mod config;
mod deferred;
mod demux;
mod error;
mod fs;
mod lifecycle;
mod node;
mod port;
mod tables;

#[cfg(feature = "web")]
pub mod web;

pub use chugins::{CHUGIN_DIR, clear_chugins, load_chugin, loaded_chugins};
pub use config::{ChuckConfig, DEFAULT_CHUCK_SRC};
pub use deferred::{DeferredResult, Outcome, Resolver, deferred};
pub use error::{ChuckError, FetchError};
pub use fs::{
    EmbeddedFiles, Fetch, File, Filename, PLAINTEXT_EXTENSIONS, file_name_from_url,
    is_plaintext_file, preload_files,
};
pub use lifecycle::Lifecycle;
pub use node::{Chuck, Pending};
pub use port::{ChannelPort, Port};
pub use tables::ListenerKind;

#[cfg(feature = "web")]
pub use error::JsContext;

pub use webchuck_shared::{
    ChuckId, FileData, InMessage, InTag, ListenerId, OutMessage, OutTag, ReplacedShred,
    RequestId, ShredId,
};
