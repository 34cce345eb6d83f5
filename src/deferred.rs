//! One-shot results settled by someone other than their creator.
//!
//! A [`deferred`] call hands out two halves: a [`Resolver`] that the message
//! handler keeps in a correlation table, and a [`DeferredResult`] that is
//! returned to the caller. The resolver is consumed when it settles, so a
//! result can only ever be settled once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::Shared;
use futures_channel::oneshot;

use crate::error::ChuckError;

/// What a deferred result settles to.
pub type Outcome<T> = Result<T, ChuckError>;

/// Create an unsettled deferred result and the capability to settle it.
pub fn deferred<T: Clone>() -> (Resolver<T>, DeferredResult<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        Resolver { sender },
        DeferredResult {
            inner: receiver.shared(),
        },
    )
}

/// The settling half of a deferred result.
///
/// Dropping a resolver without settling it completes the result with
/// [`ChuckError::Disposed`].
#[derive(Debug)]
pub struct Resolver<T> {
    sender: oneshot::Sender<Outcome<T>>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(self, error: ChuckError) {
        self.settle(Err(error));
    }

    pub fn settle(self, outcome: Outcome<T>) {
        // Every waiter may already have gone away; nothing to report then.
        let _ = self.sender.send(outcome);
    }

    /// Whether every [`DeferredResult`] for this resolver has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.sender.is_canceled()
    }
}

/// The awaitable half of a deferred result.
///
/// Cloning is cheap and every clone observes the same outcome.
#[derive(Clone)]
#[must_use = "a deferred result does nothing unless awaited"]
pub struct DeferredResult<T> {
    inner: Shared<oneshot::Receiver<Outcome<T>>>,
}

impl<T> std::fmt::Debug for DeferredResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredResult").finish_non_exhaustive()
    }
}

impl<T: Clone> DeferredResult<T> {
    /// Wait for the outcome.
    pub async fn value(&self) -> Outcome<T> {
        self.clone().await
    }

    /// The outcome, if it has already been settled.
    pub fn try_value(&self) -> Option<Outcome<T>> {
        self.clone().now_or_never()
    }

    pub fn is_settled(&self) -> bool {
        self.try_value().is_some()
    }
}

impl<T: Clone> Future for DeferredResult<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner
            .poll_unpin(cx)
            .map(|received| received.unwrap_or(Err(ChuckError::Disposed)))
    }
}
