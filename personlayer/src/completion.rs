//! Single-shot delivery of an operation's outcome.
//!
//! Every repository operation returns a [`Completion`]: a handle that resolves
//! exactly once to either the result or one [`PersonError`]. Awaiting it is the
//! normal way to consume it. For callback-style callers, [`Completion::on_complete`]
//! invokes an `FnOnce` with the outcome, and [`channel`] hands the outcome across
//! tasks through a one-shot channel.
//!
//! ```ignore
//! let (completer, pending) = completion::channel();
//! tokio::spawn(repository.find_by_id(id).deliver(completer));
//! let person = pending.await?;
//! ```

use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    FutureExt,
    channel::oneshot,
    future::BoxFuture,
};

use crate::error::{PersonError, PersonResult};

/// Handle to an in-flight operation. Resolves once to the operation's outcome.
///
/// Store work starts when the handle is first polled.
#[must_use = "a completion does nothing unless awaited"]
pub struct Completion<'a, T> {
    inner: BoxFuture<'a, PersonResult<T>>,
}

impl<'a, T> Completion<'a, T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = PersonResult<T>> + Send + 'a,
    {
        Self { inner: future.boxed() }
    }

    /// Runs the operation and passes its outcome to `callback`, which is called exactly once.
    pub async fn on_complete<F>(self, callback: F)
    where
        F: FnOnce(PersonResult<T>),
    {
        callback(self.await)
    }

    /// Runs the operation and sends its outcome through `completer`.
    ///
    /// Returns `false` if the receiving side was dropped before delivery.
    pub async fn deliver(self, completer: Completer<T>) -> bool {
        completer.complete(self.await)
    }
}

impl<T> Future for Completion<'_, T> {
    type Output = PersonResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<T> fmt::Debug for Completion<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// Sending half of a completion channel. Consumed by [`Completer::complete`],
/// so an outcome can be delivered at most once.
#[derive(Debug)]
pub struct Completer<T> {
    sender: oneshot::Sender<PersonResult<T>>,
}

impl<T> Completer<T> {
    /// Delivers the outcome. Returns `false` if the [`Pending`] side is gone.
    pub fn complete(self, outcome: PersonResult<T>) -> bool {
        self.sender.send(outcome).is_ok()
    }
}

/// Receiving half of a completion channel.
///
/// If the [`Completer`] is dropped without delivering, this resolves to
/// [`PersonError::Store`], so a waiter always gets an outcome.
#[derive(Debug)]
#[must_use = "a pending completion does nothing unless awaited"]
pub struct Pending<T> {
    receiver: oneshot::Receiver<PersonResult<T>>,
}

impl<T> Future for Pending<T> {
    type Output = PersonResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Err(PersonError::Store(
                "completion dropped before delivering an outcome".to_string(),
            )),
        })
    }
}

/// Creates a linked [`Completer`] / [`Pending`] pair.
pub fn channel<T>() -> (Completer<T>, Pending<T>) {
    let (sender, receiver) = oneshot::channel();

    (Completer { sender }, Pending { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test]
    async fn resolves_to_the_wrapped_outcome() {
        let ok: Completion<'_, u32> = Completion::new(async { Ok(7) });
        assert_eq!(ok.await.unwrap(), 7);

        let err: Completion<'_, u32> = Completion::new(async { Err(PersonError::NotFound("x".into())) });
        assert!(matches!(err.await, Err(PersonError::NotFound(_))));
    }

    #[tokio::test]
    async fn callback_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        Completion::new(async { Ok("done") })
            .on_complete(move |outcome| {
                assert_eq!(outcome.unwrap(), "done");
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channel_carries_the_outcome_across_tasks() {
        let (completer, pending) = channel::<u32>();

        let sender = tokio::spawn(Completion::new(async { Ok(3) }).deliver(completer));

        assert_eq!(pending.await.unwrap(), 3);
        assert!(sender.await.unwrap());
    }

    #[tokio::test]
    async fn dropped_completer_still_yields_an_outcome() {
        let (completer, pending) = channel::<u32>();
        drop(completer);

        assert!(matches!(pending.await, Err(PersonError::Store(_))));
    }

    #[tokio::test]
    async fn delivery_reports_a_gone_receiver() {
        let (completer, pending) = channel::<u32>();
        drop(pending);

        assert!(!Completion::new(async { Ok(1) }).deliver(completer).await);
    }
}
