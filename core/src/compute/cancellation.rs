use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

/// Marker returned when cancelled work produces no result.
///
/// Cancellation is not a failure: callers drop the outcome silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

struct TokenNode {
    flag: AtomicBool,
    parents: Vec<Arc<TokenNode>>,
}

impl TokenNode {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire) || self.parents.iter().any(|p| p.is_cancelled())
    }
}

/// Cooperative cancellation signal.
///
/// Clones share one flag. A [`child`](Self::child) token has its own flag
/// but also reports cancellation once any ancestor is cancelled. A
/// [`joined`](Self::joined) token has two parents, which lets an owner-wide
/// scope (e.g. an editor being disposed) and a request-wide scope (e.g. a
/// newer import superseding an older one) cancel the same work.
#[derive(Clone)]
pub struct CancellationToken {
    node: Arc<TokenNode>,
}

impl CancellationToken {
    /// Creates a root token (not cancelled).
    pub fn new() -> Self {
        Self::with_parents(Vec::new())
    }

    /// Creates a token cancelled by itself or by `self`.
    pub fn child(&self) -> Self {
        Self::with_parents(vec![self.node.clone()])
    }

    /// Creates a token cancelled by itself, by `self` or by `other`.
    pub fn joined(&self, other: &CancellationToken) -> Self {
        Self::with_parents(vec![self.node.clone(), other.node.clone()])
    }

    fn with_parents(parents: Vec<Arc<TokenNode>>) -> Self {
        Self {
            node: Arc::new(TokenNode {
                flag: AtomicBool::new(false),
                parents,
            }),
        }
    }

    /// Signals cancellation to this token, its clones and its children.
    pub fn cancel(&self) {
        self.node.flag.store(true, Ordering::Release);
    }

    /// Returns whether this token or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.node.is_cancelled()
    }

    /// Returns `Err(Cancelled)` if cancelled, for use with `?`.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wraps `future` so it resolves to `Err(Cancelled)` when the token is
    /// cancelled by the time it is polled or completes.
    pub fn guard<F: Future>(&self, future: F) -> Guarded<F> {
        Guarded {
            future: Box::pin(future),
            token: self.clone(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Future returned by [`CancellationToken::guard`].
///
/// The token is checked before polling the inner future and again once it
/// completes, so a result produced after cancellation is dropped.
pub struct Guarded<F: Future> {
    future: Pin<Box<F>>,
    token: CancellationToken,
}

impl<F: Future> Future for Guarded<F> {
    type Output = Result<F::Output, Cancelled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.token.is_cancelled() {
            return Poll::Ready(Err(Cancelled));
        }
        match self.future.as_mut().poll(cx) {
            Poll::Ready(_) if self.token.is_cancelled() => Poll::Ready(Err(Cancelled)),
            Poll::Ready(value) => Poll::Ready(Ok(value)),
            Poll::Pending => Poll::Pending,
        }
    }
}
