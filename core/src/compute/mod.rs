//! Cooperative async primitives.
//!
//! The editing core is single-threaded; only work such as validation runs
//! asynchronously. These types bridge the two worlds:
//!
//! - [`IoRunner`]: spawns a future on a real async runtime
//! - [`IoHandle`]: channel-backed handle the owner polls for the result
//! - [`CancellationToken`]: linked cooperative cancellation scopes
//! - [`poll_once`] / [`noop_waker`]: manual polling helpers

mod cancellation;
mod io_handle;

pub use cancellation::{CancellationToken, Cancelled, Guarded};
pub use io_handle::{HandleState, IoHandle};

use std::future::Future;
use std::pin::pin;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// Spawns async work on a real runtime.
///
/// Results come back through an [`IoHandle`], so the caller never needs a
/// waker of its own.
///
/// Not object-safe due to the generic method; there is typically one
/// concrete implementation per application.
pub trait IoRunner: Clone + Send + Sync + 'static {
    /// Spawns `future` and returns a handle to its eventual output.
    fn run<T, F>(&self, future: F) -> IoHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static;
}

/// A waker that does nothing, for manual polling.
pub fn noop_waker() -> Waker {
    fn noop(_: *const ()) {}
    fn clone(p: *const ()) -> RawWaker {
        RawWaker::new(p, &VTABLE)
    }
    static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
    // SAFETY: every vtable function ignores the data pointer.
    unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
}

/// Polls `future` exactly once with a [`noop_waker`].
pub fn poll_once<F: Future>(future: F) -> Poll<F::Output> {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    let future = pin!(future);
    future.poll(&mut cx)
}

/// Runner that polls each future once on the calling thread.
///
/// Suitable for providers whose futures are immediately ready (in-memory
/// rule sets, tests). A future that is still pending after one poll is
/// dropped and its handle reports [`HandleState::Dropped`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRunner;

impl IoRunner for InlineRunner {
    fn run<T, F>(&self, future: F) -> IoHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        match poll_once(future) {
            Poll::Ready(value) => IoHandle::ready(value),
            Poll::Pending => {
                log::warn!("inline runner dropped a future that was not immediately ready");
                let (_, receiver) = std::sync::mpsc::channel();
                IoHandle::new(receiver)
            }
        }
    }
}
