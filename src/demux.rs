//! Routing of engine messages to whoever is waiting for them.
//!
//! [`route`] only touches node state. Anything that runs user code (the print
//! hook, event callbacks) is handed back as a [`Followup`] so the caller can
//! run it after releasing its borrow of the state; callbacks are then free to
//! call back into the node.

use std::rc::Rc;

use tracing::debug;
use webchuck_shared::{InMessage, ReplacedShred, RequestId, ShredId};

use crate::deferred::Outcome;
use crate::error::ChuckError;
use crate::lifecycle::Lifecycle;
use crate::node::NodeState;
use crate::tables::Reply;

pub(crate) enum Followup {
    Nothing,
    Print(String),
    Notify(Rc<dyn Fn()>),
}

pub(crate) fn route(state: &mut NodeState, message: InMessage) -> Followup {
    match message {
        InMessage::InitDone => {
            if state.ready.open() {
                if state.lifecycle == Lifecycle::AwaitingReady {
                    state.lifecycle = Lifecycle::Ready;
                }
                debug!("engine reported ready");
            } else {
                debug!("ignoring repeated initCallback");
            }
            Followup::Nothing
        }
        InMessage::Print { message } => Followup::Print(message),
        InMessage::Event { callback } => match state.tables.listener(callback) {
            Some(listener) => Followup::Notify(listener.callback.clone()),
            None => {
                debug!("no listener {callback} for event; dropped");
                Followup::Nothing
            }
        },

        InMessage::Int { callback, result } => settle(state, callback, Ok(Reply::Int(result))),
        InMessage::Float { callback, result } => {
            settle(state, callback, Ok(Reply::Float(result)))
        }
        InMessage::String { callback, result } => {
            settle(state, callback, Ok(Reply::String(result)))
        }
        InMessage::IntArray { callback, result } => {
            settle(state, callback, Ok(Reply::IntArray(result)))
        }
        InMessage::FloatArray { callback, result } => {
            settle(state, callback, Ok(Reply::FloatArray(result)))
        }

        InMessage::NewShred { callback, shred } => {
            let outcome = ShredId::from_raw(shred)
                .map(Reply::Shred)
                .ok_or(ChuckError::RunFailed);
            settle(state, callback, outcome)
        }
        InMessage::ReplacedShred {
            callback,
            old_shred,
            new_shred,
        } => {
            let outcome = ShredId::from_raw(new_shred)
                .map(|new_shred| {
                    Reply::Replaced(ReplacedShred {
                        old_shred: ShredId(old_shred),
                        new_shred,
                    })
                })
                .ok_or(ChuckError::ReplaceFailed);
            settle(state, callback, outcome)
        }
        InMessage::RemovedShred { callback, shred } => {
            let outcome = ShredId::from_raw(shred)
                .map(Reply::Shred)
                .ok_or(ChuckError::RemoveFailed);
            settle(state, callback, outcome)
        }

        InMessage::Unknown => {
            debug!("dropping engine message of unknown type");
            Followup::Nothing
        }
    }
}

fn settle(state: &mut NodeState, id: RequestId, outcome: Outcome<Reply>) -> Followup {
    if !state.tables.settle_request(id, outcome) {
        debug!("no request {id} waiting for reply; dropped");
    }
    Followup::Nothing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ListenerKind;
    use futures::executor::block_on;
    use std::cell::Cell;
    use webchuck_shared::ListenerId;

    #[test]
    fn test_int_reply_settles_and_removes_entry() {
        let mut state = NodeState::new();
        let (id, result) = state.tables.open_request();
        route(
            &mut state,
            InMessage::Int {
                callback: id,
                result: 42,
            },
        );
        assert_eq!(block_on(result).unwrap(), Reply::Int(42));
        assert!(!state.tables.has_request(id));
    }

    #[test]
    fn test_new_shred_sentinel() {
        let mut state = NodeState::new();
        let (ok_id, ok) = state.tables.open_request();
        let (zero_id, zero) = state.tables.open_request();
        let (neg_id, neg) = state.tables.open_request();

        route(&mut state, InMessage::NewShred { callback: ok_id, shred: 1 });
        route(&mut state, InMessage::NewShred { callback: zero_id, shred: 0 });
        route(&mut state, InMessage::NewShred { callback: neg_id, shred: -1 });

        assert_eq!(block_on(ok).unwrap(), Reply::Shred(ShredId(1)));
        let err = block_on(zero).unwrap_err();
        assert_eq!(err.to_string(), "Running code failed");
        assert!(matches!(block_on(neg), Err(ChuckError::RunFailed)));
        assert_eq!(state.tables.pending_requests(), 0);
    }

    #[test]
    fn test_replaced_and_removed_sentinels() {
        let mut state = NodeState::new();
        let (replaced_id, replaced) = state.tables.open_request();
        let (failed_id, failed) = state.tables.open_request();
        let (removed_id, removed) = state.tables.open_request();

        route(
            &mut state,
            InMessage::ReplacedShred {
                callback: replaced_id,
                old_shred: 1,
                new_shred: 2,
            },
        );
        route(
            &mut state,
            InMessage::ReplacedShred {
                callback: failed_id,
                old_shred: 1,
                new_shred: 0,
            },
        );
        route(
            &mut state,
            InMessage::RemovedShred {
                callback: removed_id,
                shred: 0,
            },
        );

        assert_eq!(
            block_on(replaced).unwrap(),
            Reply::Replaced(ReplacedShred {
                old_shred: ShredId(1),
                new_shred: ShredId(2)
            })
        );
        assert_eq!(
            block_on(failed).unwrap_err().to_string(),
            "Replacing code failed"
        );
        assert_eq!(
            block_on(removed).unwrap_err().to_string(),
            "Removing code failed"
        );
    }

    #[test]
    fn test_unknown_callback_is_a_no_op() {
        let mut state = NodeState::new();
        let (id, result) = state.tables.open_request();
        let followup = route(
            &mut state,
            InMessage::Float {
                callback: RequestId(99),
                result: 1.0,
            },
        );
        assert!(matches!(followup, Followup::Nothing));
        assert!(state.tables.has_request(id));
        assert!(!result.is_settled());

        let followup = route(&mut state, InMessage::Event { callback: ListenerId(5) });
        assert!(matches!(followup, Followup::Nothing));
    }

    #[test]
    fn test_event_keeps_listener() {
        let hits = Rc::new(Cell::new(0));
        let mut state = NodeState::new();
        let counter = hits.clone();
        let id = state.tables.add_listener(
            "beat",
            ListenerKind::Persistent,
            Rc::new(move || counter.set(counter.get() + 1)),
        );
        for _ in 0..2 {
            match route(&mut state, InMessage::Event { callback: id }) {
                Followup::Notify(callback) => callback(),
                _ => panic!("expected a notification"),
            }
        }
        assert_eq!(hits.get(), 2);
        assert!(state.tables.listener(id).is_some());
    }

    #[test]
    fn test_init_done_is_idempotent() {
        let mut state = NodeState::new();
        let ready = state.ready.wait();
        route(&mut state, InMessage::InitDone);
        route(&mut state, InMessage::InitDone);
        assert_eq!(state.lifecycle, Lifecycle::Ready);
        assert!(matches!(ready.try_value(), Some(Ok(()))));
    }

    #[test]
    fn test_print_and_unknown() {
        let mut state = NodeState::new();
        match route(
            &mut state,
            InMessage::Print {
                message: "hi".into(),
            },
        ) {
            Followup::Print(text) => assert_eq!(text, "hi"),
            _ => panic!("expected print"),
        }
        assert!(matches!(
            route(&mut state, InMessage::Unknown),
            Followup::Nothing
        ));
    }
}
