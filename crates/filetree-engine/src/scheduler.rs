//! Cancellable timers.
//!
//! [`Delayer`] runs a future once its delay has elapsed; re-triggering
//! replaces the pending task, `trigger_if_idle` keeps it.
//! [`CoalescingDispatcher`] builds on it to collapse any number of render
//! requests inside one window into exactly one notification.

use crate::event::{Emitter, Subscription};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs a task after a delay unless cancelled first.
///
/// The pending flag is cleared right before the task starts, so a task that
/// is already running is never aborted by [`cancel`](Self::cancel) or a new
/// trigger.
///
/// # Examples
///
/// ```
/// use filetree_engine::scheduler::Delayer;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let delayer = Delayer::new(Duration::from_millis(100));
/// let (tx, rx) = tokio::sync::oneshot::channel();
///
/// delayer.trigger(async move {
///     let _ = tx.send("fired");
/// });
/// assert!(delayer.is_pending());
///
/// assert_eq!(rx.await.unwrap(), "fired");
/// assert!(!delayer.is_pending());
/// # }
/// ```
#[derive(Debug)]
pub struct Delayer {
    delay: Duration,
    pending: Arc<AtomicBool>,
    sleeper: Mutex<Option<JoinHandle<()>>>,
}

impl Delayer {
    /// Creates a delayer with a fixed delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(AtomicBool::new(false)),
            sleeper: Mutex::new(None),
        }
    }

    /// Returns the delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns `true` while a task waits for its delay to elapse.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Schedules `task`, replacing any pending one.
    ///
    /// Outside a Tokio runtime the task is dropped and `false` is returned.
    pub fn trigger<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("delayer triggered outside a tokio runtime, task dropped");
            return false;
        };

        let mut sleeper = self.sleeper.lock();
        if self.pending.swap(true, Ordering::SeqCst)
            && let Some(previous) = sleeper.take()
        {
            previous.abort();
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        *sleeper = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            pending.store(false, Ordering::SeqCst);
            task.await;
        }));
        true
    }

    /// Schedules `task` only if nothing is pending.
    ///
    /// Returns `true` if the task was scheduled.
    pub fn trigger_if_idle<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_pending() {
            return false;
        }
        self.trigger(task)
    }

    /// Cancels the pending task, if any.
    ///
    /// Returns `true` if a pending task was cancelled.
    pub fn cancel(&self) -> bool {
        let mut sleeper = self.sleeper.lock();
        if !self.pending.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Some(previous) = sleeper.take() {
            previous.abort();
        }
        true
    }
}

impl Drop for Delayer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Notification that the visible tree should be re-rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderEvent {
    /// Whether any coalesced request changed the tree structure
    pub structural: bool,
}

/// Coalesces render requests: any number of requests inside one window
/// produce exactly one [`RenderEvent`] when the window elapses.
///
/// Without a Tokio runtime each request renders synchronously.
#[derive(Debug)]
pub struct CoalescingDispatcher {
    delayer: Delayer,
    structural: Arc<AtomicBool>,
    on_render: Emitter<RenderEvent>,
}

impl CoalescingDispatcher {
    /// Creates a dispatcher with the given coalescing window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            delayer: Delayer::new(window),
            structural: Arc::new(AtomicBool::new(false)),
            on_render: Emitter::new(),
        }
    }

    /// Requests a render.
    pub fn dispatch(&self, structural: bool) {
        if structural {
            self.structural.store(true, Ordering::SeqCst);
        }

        if Handle::try_current().is_err() {
            self.flush();
            return;
        }

        let flag = Arc::clone(&self.structural);
        let emitter = self.on_render.clone();
        self.delayer.trigger_if_idle(async move {
            let structural = flag.swap(false, Ordering::SeqCst);
            emitter.fire(&RenderEvent { structural });
        });
    }

    /// Renders immediately, cancelling the pending window.
    pub fn flush(&self) {
        self.delayer.cancel();
        let structural = self.structural.swap(false, Ordering::SeqCst);
        self.on_render.fire(&RenderEvent { structural });
    }

    /// Returns `true` while a render is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.delayer.is_pending()
    }

    /// Registers a render listener.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_render(&self, listener: impl Fn(&RenderEvent) + Send + Sync + 'static) -> Subscription {
        self.on_render.subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let read = Arc::clone(&count);
        (count, move || read.load(Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_replaces_pending_task() {
        let delayer = Delayer::new(Duration::from_millis(100));
        let (count, read) = counter();

        for _ in 0..3 {
            let count = Arc::clone(&count);
            delayer.trigger(async move {
                count.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(read(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_if_idle_keeps_first() {
        let delayer = Delayer::new(Duration::from_millis(100));
        let (tx, rx) = tokio::sync::oneshot::channel();

        assert!(delayer.trigger_if_idle(async move {
            let _ = tx.send(1);
        }));
        assert!(!delayer.trigger_if_idle(async {}));

        assert_eq!(rx.await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let delayer = Delayer::new(Duration::from_millis(100));
        let (count, read) = counter();
        delayer.trigger(async move {
            count.fetch_add(1, Ordering::SeqCst);
        });

        assert!(delayer.cancel());
        assert!(!delayer.is_pending());
        assert!(!delayer.cancel());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(read(), 0);
    }

    #[test]
    fn test_trigger_without_runtime() {
        let delayer = Delayer::new(Duration::from_millis(1));
        assert!(!delayer.trigger(async {}));
        assert!(!delayer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_coalesces_to_one() {
        let dispatcher = CoalescingDispatcher::new(Duration::from_millis(100));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _sub = dispatcher.on_render(move |e| sink.lock().push(*e));

        dispatcher.dispatch(false);
        tokio::time::sleep(Duration::from_millis(30)).await;
        dispatcher.dispatch(true);
        tokio::time::sleep(Duration::from_millis(30)).await;
        dispatcher.dispatch(false);
        assert!(events.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*events.lock(), vec![RenderEvent { structural: true }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_renders_again_after_window() {
        let dispatcher = CoalescingDispatcher::new(Duration::from_millis(100));
        let (count, read) = counter();
        let _sub = dispatcher.on_render(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(false);
        tokio::time::sleep(Duration::from_millis(150)).await;
        dispatcher.dispatch(false);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(read(), 2);
    }

    #[test]
    fn test_dispatcher_without_runtime_is_synchronous() {
        let dispatcher = CoalescingDispatcher::new(Duration::from_millis(100));
        let (count, read) = counter();
        let _sub = dispatcher.on_render(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(true);
        assert_eq!(read(), 1);
    }
}
