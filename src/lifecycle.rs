use crate::deferred::{DeferredResult, Resolver, deferred};
use crate::error::ChuckError;

/// Where a node is in its life.
///
/// Construction (loading the engine, registering the worklet, preloading
/// files) happens before a node handle exists, so every handle starts out
/// [`Lifecycle::AwaitingReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// The worklet exists but the engine has not reported `initCallback` yet.
    AwaitingReady,
    Ready,
    /// [`Chuck::close`](crate::Chuck::close) was called.
    Closed,
}

/// Settled once, when the engine finishes initializing.
pub(crate) struct ReadyGate {
    resolver: Option<Resolver<()>>,
    result: DeferredResult<()>,
}

impl ReadyGate {
    pub(crate) fn new() -> Self {
        let (resolver, result) = deferred();
        Self {
            resolver: Some(resolver),
            result,
        }
    }

    /// Open the gate. Returns `false` if it was already settled.
    pub(crate) fn open(&mut self) -> bool {
        match self.resolver.take() {
            Some(resolver) => {
                resolver.resolve(());
                true
            }
            None => false,
        }
    }

    pub(crate) fn fail(&mut self, error: ChuckError) {
        if let Some(resolver) = self.resolver.take() {
            resolver.reject(error);
        }
    }

    pub(crate) fn wait(&self) -> DeferredResult<()> {
        self.result.clone()
    }
}
