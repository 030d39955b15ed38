//! Awaitable handles over completion callbacks
//!
//! Gateway procedures report through a single `FnOnce(Result<T, E>)`
//! callback. [`completion`] pairs such a callback with a [`Completion`] that
//! resolves to the same value, for callers that prefer to `.await` or block.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::outcome::{DispatchFailure, FromDispatchFailure};

/// Receiving half created by [`completion`]
#[derive(Debug)]
pub struct Completion<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
}

/// Create a completion callback and the handle it resolves.
///
/// If the callback is dropped without being called the handle resolves to
/// `E::from_dispatch_failure(DispatchFailure::Abandoned)`.
pub fn completion<T, E>() -> (impl FnOnce(Result<T, E>) + Send + 'static, Completion<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let callback = move |result: Result<T, E>| {
        // Receiver gone means nobody is waiting any more.
        let _ = tx.send(result);
    };
    (callback, Completion { rx })
}

impl<T, E: FromDispatchFailure> Completion<T, E> {
    /// Block the current thread until the callback fires.
    ///
    /// Must not be called from within an async runtime.
    pub fn recv_blocking(self) -> Result<T, E> {
        self.rx.blocking_recv().unwrap_or_else(|_| abandoned())
    }

    /// Non-blocking check; `None` while the call is still pending.
    pub fn try_recv(&mut self) -> Option<Result<T, E>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(abandoned()),
        }
    }
}

impl<T, E: FromDispatchFailure> Future for Completion<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| received.unwrap_or_else(|_| abandoned()))
    }
}

fn abandoned<T, E: FromDispatchFailure>() -> Result<T, E> {
    Err(E::from_dispatch_failure(DispatchFailure::Abandoned))
}
