//! Per-node correlation tables.
//!
//! Replies are matched to their requests purely by id, never by arrival
//! order, so any number of requests may be outstanding at once.

use std::collections::HashMap;
use std::rc::Rc;

use webchuck_shared::{ListenerId, ReplacedShred, RequestId, ShredId};

use crate::deferred::{DeferredResult, Outcome, Resolver, deferred};
use crate::error::ChuckError;

/// A reply payload, before it is narrowed to the type the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    Int(i64),
    Float(f64),
    String(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    Shred(ShredId),
    Replaced(ReplacedShred),
}

impl Reply {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Reply::Int(_) => "int",
            Reply::Float(_) => "float",
            Reply::String(_) => "string",
            Reply::IntArray(_) => "int[]",
            Reply::FloatArray(_) => "float[]",
            Reply::Shred(_) => "shred",
            Reply::Replaced(_) => "replaced shred",
        }
    }

    fn mismatch<T>(self, expected: &'static str) -> Result<T, ChuckError> {
        Err(ChuckError::UnexpectedReply {
            expected,
            found: self.kind(),
        })
    }

    pub(crate) fn into_int(self) -> Result<i64, ChuckError> {
        match self {
            Reply::Int(value) => Ok(value),
            other => other.mismatch("int"),
        }
    }

    pub(crate) fn into_float(self) -> Result<f64, ChuckError> {
        match self {
            Reply::Float(value) => Ok(value),
            // ChucK ints widen implicitly; the engine may answer a float query with one.
            Reply::Int(value) => Ok(value as f64),
            other => other.mismatch("float"),
        }
    }

    pub(crate) fn into_string(self) -> Result<String, ChuckError> {
        match self {
            Reply::String(value) => Ok(value),
            other => other.mismatch("string"),
        }
    }

    pub(crate) fn into_int_array(self) -> Result<Vec<i64>, ChuckError> {
        match self {
            Reply::IntArray(values) => Ok(values),
            other => other.mismatch("int[]"),
        }
    }

    pub(crate) fn into_float_array(self) -> Result<Vec<f64>, ChuckError> {
        match self {
            Reply::FloatArray(values) => Ok(values),
            other => other.mismatch("float[]"),
        }
    }

    pub(crate) fn into_bool(self) -> Result<bool, ChuckError> {
        self.into_int().map(|value| value != 0)
    }

    pub(crate) fn into_shred(self) -> Result<ShredId, ChuckError> {
        match self {
            Reply::Shred(shred) => Ok(shred),
            other => other.mismatch("shred"),
        }
    }

    pub(crate) fn into_replaced(self) -> Result<ReplacedShred, ChuckError> {
        match self {
            Reply::Replaced(replaced) => Ok(replaced),
            other => other.mismatch("replaced shred"),
        }
    }
}

/// How an event listener was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// The engine notifies at most once.
    Once,
    /// The engine notifies on every signal/broadcast until stopped.
    Persistent,
}

pub(crate) struct Listener {
    pub(crate) variable: String,
    pub(crate) kind: ListenerKind,
    pub(crate) callback: Rc<dyn Fn()>,
}

/// The request and listener tables of one node, with their id counters.
#[derive(Default)]
pub(crate) struct CorrelationTables {
    requests: HashMap<RequestId, Resolver<Reply>>,
    listeners: HashMap<ListenerId, Listener>,
    next_request: u64,
    next_listener: u64,
}

impl CorrelationTables {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate a request id and park an unsettled result under it.
    pub(crate) fn open_request(&mut self) -> (RequestId, DeferredResult<Reply>) {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        let (resolver, result) = deferred();
        self.requests.insert(id, resolver);
        (id, result)
    }

    /// Settle and forget the request `id`. Returns `false` if nothing was
    /// waiting under that id.
    pub(crate) fn settle_request(&mut self, id: RequestId, outcome: Outcome<Reply>) -> bool {
        match self.requests.remove(&id) {
            Some(resolver) => {
                resolver.settle(outcome);
                true
            }
            None => false,
        }
    }

    pub(crate) fn add_listener(
        &mut self,
        variable: &str,
        kind: ListenerKind,
        callback: Rc<dyn Fn()>,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(
            id,
            Listener {
                variable: variable.to_string(),
                kind,
                callback,
            },
        );
        id
    }

    pub(crate) fn remove_listener(&mut self, id: ListenerId) -> Option<Listener> {
        self.listeners.remove(&id)
    }

    pub(crate) fn listener(&self, id: ListenerId) -> Option<&Listener> {
        self.listeners.get(&id)
    }

    #[cfg(test)]
    pub(crate) fn has_request(&self, id: RequestId) -> bool {
        self.requests.contains_key(&id)
    }

    pub(crate) fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Empty both tables, handing back every unsettled resolver.
    pub(crate) fn drain(&mut self) -> Vec<Resolver<Reply>> {
        self.listeners.clear();
        self.requests.drain().map(|(_, resolver)| resolver).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    #[test]
    fn test_request_ids_are_distinct_and_increasing() {
        let mut tables = CorrelationTables::new();
        let ids: Vec<_> = (0..16).map(|_| tables.open_request().0).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ids[0], RequestId(0));
        assert_eq!(tables.pending_requests(), 16);
    }

    #[test]
    fn test_settle_routes_to_exact_entry() {
        let mut tables = CorrelationTables::new();
        let (first, first_result) = tables.open_request();
        let (second, second_result) = tables.open_request();

        assert!(tables.settle_request(second, Ok(Reply::Int(2))));
        assert!(!tables.has_request(second));
        assert!(tables.has_request(first));
        assert!(!first_result.is_settled());
        assert_eq!(block_on(second_result).unwrap(), Reply::Int(2));

        // second settle of the same id finds nothing
        assert!(!tables.settle_request(second, Ok(Reply::Int(3))));
    }

    #[test]
    fn test_listener_ids_are_a_separate_family() {
        let mut tables = CorrelationTables::new();
        tables.open_request();
        tables.open_request();
        let id = tables.add_listener("beat", ListenerKind::Persistent, Rc::new(|| {}));
        assert_eq!(id, ListenerId(0));
        assert_eq!(tables.listener(id).map(|l| l.kind), Some(ListenerKind::Persistent));
        assert_eq!(tables.listener(id).map(|l| l.variable.as_str()), Some("beat"));
    }

    #[test]
    fn test_remove_listener() {
        let hits = Rc::new(Cell::new(0));
        let mut tables = CorrelationTables::new();
        let counter = hits.clone();
        let id = tables.add_listener(
            "beat",
            ListenerKind::Once,
            Rc::new(move || counter.set(counter.get() + 1)),
        );
        (tables.listener(id).unwrap().callback)();
        assert_eq!(hits.get(), 1);
        assert!(tables.remove_listener(id).is_some());
        assert!(tables.listener(id).is_none());
        assert_eq!(tables.listener_count(), 0);
    }

    #[test]
    fn test_drain() {
        let mut tables = CorrelationTables::new();
        let (_, result) = tables.open_request();
        tables.add_listener("beat", ListenerKind::Once, Rc::new(|| {}));
        for resolver in tables.drain() {
            resolver.reject(ChuckError::Disposed);
        }
        assert!(matches!(block_on(result), Err(ChuckError::Disposed)));
        assert_eq!(tables.pending_requests(), 0);
        assert_eq!(tables.listener_count(), 0);
    }

    #[test]
    fn test_reply_projection() {
        assert_eq!(Reply::Int(3).into_float().unwrap(), 3.0);
        assert!(Reply::Int(1).into_bool().unwrap());
        assert!(!Reply::Int(0).into_bool().unwrap());
        assert!(matches!(
            Reply::String("x".into()).into_int(),
            Err(ChuckError::UnexpectedReply {
                expected: "int",
                found: "string"
            })
        ));
    }
}
