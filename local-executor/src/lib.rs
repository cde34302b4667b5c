//! A single-threaded executor for the thread that owns callback state.
//!
//! An [`Executor`] is created on, and never leaves, the thread that owns some
//! `!Send` state (a receiver object, a callback). Any thread may schedule work
//! into its run queue, but the queued work only ever runs on the owning thread,
//! while that thread is inside [`Executor::run_pending()`] or
//! [`Executor::block_on()`].
//!
//! # Example
//!
//! ```
//! # use local_executor::Executor;
//! let executor = Executor::new("consumer");
//!
//! let task = executor.spawn(async {
//!    println!("Hello, world!");
//!    42
//! });
//!
//! assert_eq!(executor.block_on(task), 42);
//! ```

use std::cell::RefCell;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};
use std::thread::{self, JoinHandle, ThreadId};

use async_task::{Runnable, spawn, spawn_local};
use futures_channel::mpsc;
use futures_lite::{StreamExt, future};
use tracing::trace;

/// An executor that runs async tasks on the thread that created it.
///
/// `Executor` is `!Send`. Clones share the same run queue.
#[derive(Clone)]
pub struct Executor {
    queue: Rc<RunQueue>,
}

struct RunQueue {
    label: String,
    thread: ThreadId,
    sender: mpsc::UnboundedSender<Runnable>,
    receiver: RefCell<mpsc::UnboundedReceiver<Runnable>>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("label", &self.queue.label)
            .field("thread", &self.queue.thread)
            .finish()
    }
}

impl Executor {
    /// Creates a new executor owned by the current thread.
    pub fn new(label: &str) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            queue: Rc::new(RunQueue {
                label: label.to_owned(),
                thread: thread::current().id(),
                sender,
                receiver: RefCell::new(receiver),
            }),
        }
    }

    /// Spawns a named thread, creates an executor on it and passes it to `entry`.
    ///
    /// The future returned by `entry` is driven to completion on the new thread while the run
    /// queue is pumped. Its output is returned through the [`JoinHandle`].
    pub fn background<F, Fut>(label: &str, entry: F) -> std::io::Result<JoinHandle<Fut::Output>>
    where
        F: FnOnce(Executor) -> Fut + Send + 'static,
        Fut: Future + 'static,
        Fut::Output: Send + 'static,
    {
        let label = label.to_owned();
        thread::Builder::new().name(label.clone()).spawn(move || {
            let executor = Executor::new(&label);
            let future = entry(executor.clone());
            executor.block_on(future)
        })
    }

    /// The label this executor was created with.
    pub fn label(&self) -> &str {
        &self.queue.label
    }

    /// The id of the thread that owns this executor.
    pub fn thread_id(&self) -> ThreadId {
        self.queue.thread
    }

    /// Whether the calling thread owns this executor.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.queue.thread
    }

    /// Creates a [`WeakExecutor`] that does not keep the run queue alive.
    ///
    /// Futures spawned on this executor should hold a `WeakExecutor` rather than an `Executor`,
    /// otherwise a queued runnable keeps its own queue alive.
    pub fn downgrade(&self) -> WeakExecutor {
        WeakExecutor {
            queue: Rc::downgrade(&self.queue),
        }
    }

    /// Spawns a new asynchronous task, returning a [`Task`] that can be used to await its result.
    ///
    /// Dropping the `Task` will cancel it. If you want the task to run independently, you must
    /// call [`detach()`][Task::detach].
    pub fn spawn<R>(&self, future: impl Future<Output = R> + Send + 'static) -> Task<R>
    where
        R: Send + 'static,
    {
        let (runnable, task) = spawn(future, self.schedule());
        runnable.schedule();
        Task(TaskState::Spawned(task))
    }

    /// Spawns a `!Send` future on this executor.
    ///
    /// The returned [`Task`] may be sent to and dropped on other threads if `R` is `Send`; the
    /// future itself is only ever polled and dropped on the executor's thread.
    pub fn spawn_local<R>(&self, future: impl Future<Output = R> + 'static) -> Task<R>
    where
        R: 'static,
    {
        let (runnable, task) = spawn_local(future, self.schedule());
        runnable.schedule();
        Task(TaskState::Spawned(task))
    }

    /// Runs every runnable that is currently queued without blocking.
    ///
    /// Runnables scheduled while this runs, including tasks that reschedule themselves, wait
    /// for the next call. Returns the number of runnables that were run.
    pub fn run_pending(&self) -> usize {
        let mut cx = Context::from_waker(Waker::noop());
        let mut queued = Vec::new();
        while let Poll::Ready(runnable) = self.poll_runnable(&mut cx) {
            queued.push(runnable);
        }

        let count = queued.len();
        for runnable in queued {
            runnable.run();
        }
        if count > 0 {
            trace!(executor = %self.queue.label, count, "ran pending tasks");
        }
        count
    }

    /// Drives `future` to completion on the current thread, running queued tasks while it is
    /// pending.
    ///
    /// The thread is parked whenever neither `future` nor the run queue can make progress.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        future::block_on(future::or(future, self.pump()))
    }

    async fn pump<T>(&self) -> T {
        loop {
            let runnable = future::poll_fn(|cx| self.poll_runnable(cx)).await;
            runnable.run();
            future::yield_now().await;
        }
    }

    fn poll_runnable(&self, cx: &mut Context<'_>) -> Poll<Runnable> {
        // The queue holds its own sender, so it is never exhausted.
        match self.queue.receiver.borrow_mut().poll_next(cx) {
            Poll::Ready(Some(runnable)) => Poll::Ready(runnable),
            _ => Poll::Pending,
        }
    }

    fn schedule(&self) -> impl Fn(Runnable) + Send + Sync + 'static {
        let sender = self.queue.sender.clone();
        move |runnable: Runnable| {
            if let Err(err) = sender.unbounded_send(runnable) {
                // The executor is gone. Dropping the runnable here would drop its future on a
                // thread that does not own it.
                std::mem::forget(err.into_inner());
            }
        }
    }
}

/// A non-owning reference to an [`Executor`].
#[derive(Debug, Clone)]
pub struct WeakExecutor {
    queue: Weak<RunQueue>,
}

impl WeakExecutor {
    /// Returns the executor if it is still alive.
    pub fn upgrade(&self) -> Option<Executor> {
        self.queue.upgrade().map(|queue| Executor { queue })
    }
}

#[derive(Debug)]
enum TaskState<T> {
    Ready(Option<T>),
    Spawned(async_task::Task<T>),
}

/// A future that resolves to the result of an asynchronous task.
///
/// Dropping a [`Task`] cancels it, which means its future won't be polled again. To drop the
/// [`Task`] handle without canceling it, use [`detach()`][`Task::detach()`] instead.
#[derive(Debug)]
pub struct Task<T>(TaskState<T>);

impl<T> Unpin for Task<T> {}

impl<T> Task<T> {
    /// Creates a new task that is already completed with the given value.
    pub fn ready(val: T) -> Self {
        Task(TaskState::Ready(Some(val)))
    }

    /// Detaches the task, allowing it to run in the background.
    pub fn detach(self) {
        match self {
            Task(TaskState::Ready(_)) => (),
            Task(TaskState::Spawned(task)) => task.detach(),
        }
    }

    /// Whether the task has run to completion.
    pub fn is_finished(&self) -> bool {
        match &self.0 {
            TaskState::Ready(_) => true,
            TaskState::Spawned(task) => task.is_finished(),
        }
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        match &mut self.get_mut().0 {
            TaskState::Ready(val) => {
                Poll::Ready(val.take().expect("`Task` polled after completion"))
            }
            TaskState::Spawned(task) => Pin::new(task).poll(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn run_pending_runs_queued_tasks_in_order() {
        let executor = Executor::new("test");
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            executor.spawn_local(async move { log.borrow_mut().push(i) }).detach();
        }

        assert!(log.borrow().is_empty());
        assert_eq!(executor.run_pending(), 3);
        assert_eq!(*log.borrow(), [0, 1, 2]);
        assert_eq!(executor.run_pending(), 0);
    }

    #[test]
    fn run_pending_leaves_rescheduled_tasks_queued() {
        let executor = Executor::new("test");
        let polls = Rc::new(Cell::new(0));

        executor
            .spawn_local({
                let polls = polls.clone();
                async move {
                    loop {
                        polls.set(polls.get() + 1);
                        future::yield_now().await;
                    }
                }
            })
            .detach();

        assert_eq!(executor.run_pending(), 1);
        assert_eq!(polls.get(), 1);
        assert_eq!(executor.run_pending(), 1);
        assert_eq!(polls.get(), 2);
    }

    #[test]
    fn block_on_drives_spawned_tasks() {
        let executor = Executor::new("test");
        let flag = Rc::new(Cell::new(false));

        let task = executor.spawn_local({
            let flag = flag.clone();
            async move {
                flag.set(true);
                7
            }
        });

        assert_eq!(executor.block_on(task), 7);
        assert!(flag.get());
    }

    #[test]
    fn tasks_scheduled_from_other_threads_run_on_owner() {
        let executor = Executor::new("test");
        let owner = executor.thread_id();
        let (sender, receiver) = futures_channel::oneshot::channel::<usize>();

        let task = executor.spawn_local(async move {
            let value = receiver.await.unwrap();
            assert_eq!(thread::current().id(), owner);
            value * 2
        });
        assert!(executor.is_current());

        let producer = thread::spawn(move || sender.send(21).unwrap());
        assert_eq!(executor.block_on(task), 42);
        producer.join().unwrap();
    }

    #[test]
    fn dropping_task_cancels_it() {
        let executor = Executor::new("test");
        let counter = Arc::new(AtomicUsize::new(0));

        let task = executor.spawn({
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        drop(task);

        executor.run_pending();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ready_task_resolves_immediately() {
        let executor = Executor::new("test");
        let task = Task::ready("done");
        assert!(task.is_finished());
        assert_eq!(executor.block_on(task), "done");
    }

    #[test]
    fn weak_executor_does_not_keep_queue_alive() {
        let executor = Executor::new("test");
        let weak = executor.downgrade();
        assert_eq!(weak.upgrade().unwrap().label(), "test");

        drop(executor);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn background_runs_entry_on_named_thread() {
        let handle = Executor::background("consumer", |executor| async move {
            assert_eq!(executor.label(), "consumer");
            assert_eq!(thread::current().name(), Some("consumer"));
            executor.spawn_local(async { 5 }).await
        })
        .unwrap();

        assert_eq!(handle.join().unwrap(), 5);
    }

    #[test]
    fn scheduling_after_executor_is_dropped_does_not_panic() {
        let executor = Executor::new("test");
        let (sender, receiver) = futures_channel::oneshot::channel::<()>();
        let task = executor.spawn_local(async move {
            let _ = receiver.await;
        });
        executor.run_pending();
        drop(executor);

        thread::spawn(move || {
            let _ = sender.send(());
            drop(task);
        })
        .join()
        .unwrap();
    }
}
