//! Wire vocabulary shared by the main-thread node wrapper and anything that
//! speaks the engine's message-port protocol (worklet processors, test
//! doubles, recorders).

pub mod ids;
pub mod inbound;
pub mod outbound;
pub mod tags;

pub use ids::{ChuckId, ListenerId, ReplacedShred, RequestId, ShredId};
pub use inbound::InMessage;
pub use outbound::{FileData, OutMessage};
pub use tags::{InTag, OutTag, UnknownTag};
