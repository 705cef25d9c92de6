use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc;
use std::task::{Context, Poll};

/// State of an [`IoHandle`] as observed by a non-blocking check.
#[derive(Debug, PartialEq, Eq)]
pub enum HandleState<T> {
    /// The task is still running.
    Pending,
    /// The task finished with this value.
    Ready(T),
    /// The task was dropped without producing a value.
    Dropped,
}

/// Handle to a task running on a real async runtime.
///
/// The task itself runs with real wakers on the runtime's threads; only the
/// result travels back through a channel. This lets a single-threaded owner
/// (an editor loop, a test) collect results by polling, without an executor
/// of its own.
///
/// # Example
///
/// ```ignore
/// let handle = runtime.run(async { provider.validate(request).await });
///
/// // Once per frame:
/// match handle.try_take() {
///     HandleState::Ready(result) => apply(result),
///     HandleState::Pending => {}
///     HandleState::Dropped => log::warn!("validation task vanished"),
/// }
/// ```
pub struct IoHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> IoHandle<T> {
    /// Wraps the receiving side of the task's result channel.
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Creates a handle that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        let (sender, receiver) = mpsc::channel();
        // The receiver is alive, so the send cannot fail.
        let _ = sender.send(value);
        Self { receiver }
    }

    /// Checks for the result without blocking.
    ///
    /// The value is handed out once; later calls report [`HandleState::Dropped`].
    pub fn try_take(&self) -> HandleState<T> {
        match self.receiver.try_recv() {
            Ok(value) => HandleState::Ready(value),
            Err(mpsc::TryRecvError::Empty) => HandleState::Pending,
            Err(mpsc::TryRecvError::Disconnected) => HandleState::Dropped,
        }
    }

    /// Blocks until the task completes.
    ///
    /// Returns `None` if the task was dropped without sending, or if the
    /// value was already taken.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

impl<T> Future for IoHandle<T> {
    type Output = Option<T>;

    /// Checks the channel; meant for manual polling with a noop waker.
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.try_take() {
            HandleState::Ready(value) => Poll::Ready(Some(value)),
            HandleState::Pending => Poll::Pending,
            HandleState::Dropped => Poll::Ready(None),
        }
    }
}

impl<T> std::fmt::Debug for IoHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::poll_once;

    #[test]
    fn try_take_pending_then_ready() {
        let (tx, rx) = mpsc::channel();
        let handle = IoHandle::new(rx);
        assert_eq!(handle.try_take(), HandleState::Pending);

        tx.send(42u32).unwrap();
        assert_eq!(handle.try_take(), HandleState::Ready(42));
    }

    #[test]
    fn try_take_after_sender_dropped() {
        let (tx, rx) = mpsc::channel::<u32>();
        drop(tx);
        assert_eq!(IoHandle::new(rx).try_take(), HandleState::Dropped);
    }

    #[test]
    fn ready_handle_resolves_immediately() {
        assert_eq!(IoHandle::ready("done").recv(), Some("done"));
    }

    #[test]
    fn recv_disconnected() {
        let (tx, rx) = mpsc::channel::<u32>();
        drop(tx);
        assert_eq!(IoHandle::new(rx).recv(), None);
    }

    #[test]
    fn future_follows_channel_state() {
        let (tx, rx) = mpsc::channel();
        let handle = IoHandle::new(rx);
        let mut handle = Box::pin(handle);

        let waker = crate::compute::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(handle.as_mut().poll(&mut cx).is_pending());

        tx.send(77u32).unwrap();
        assert_eq!(handle.as_mut().poll(&mut cx), Poll::Ready(Some(77)));
    }

    #[test]
    fn future_disconnected() {
        let (tx, rx) = mpsc::channel::<u32>();
        drop(tx);
        assert_eq!(poll_once(IoHandle::new(rx)), Poll::Ready(None));
    }
}
