use std::future::Future;
use std::sync::Arc;

use graphedit_core::compute::{IoHandle, IoRunner};

/// Runtime for validation futures and other real async work.
///
/// A tokio multi-thread runtime with one worker thread. Futures run with
/// real wakers on that thread; results travel back through [`IoHandle`]s,
/// which the controller polls from its own thread.
///
/// Clone is cheap (Arc-wrapped).
///
/// # Example
///
/// ```ignore
/// let io = IoRuntime::new()?;
/// let handle = io.run(async { fetch_shapes().await });
/// let shapes = handle.recv();
/// ```
#[derive(Clone)]
pub struct IoRuntime {
    inner: Arc<IoRuntimeInner>,
}

struct IoRuntimeInner {
    runtime: tokio::runtime::Runtime,
}

impl IoRuntime {
    /// Starts a runtime with one worker thread.
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("graphedit-io")
            .enable_all()
            .build()?;

        Ok(Self {
            inner: Arc::new(IoRuntimeInner { runtime }),
        })
    }
}

impl IoRunner for IoRuntime {
    fn run<T, F>(&self, future: F) -> IoHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (sender, receiver) = std::sync::mpsc::channel();

        self.inner.runtime.spawn(async move {
            let result = future.await;
            let _ = sender.send(result);
        });

        IoHandle::new(receiver)
    }
}

impl std::fmt::Debug for IoRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoRuntime").finish_non_exhaustive()
    }
}
