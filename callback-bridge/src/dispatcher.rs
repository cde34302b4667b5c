//! The cross-thread dispatcher.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use futures_channel::mpsc;
use futures_lite::{StreamExt, future};
use local_executor::{Executor, Task, WeakExecutor};
use tracing::{debug, trace};

use crate::error::{Error, ErrorKind, Result};
use crate::options::DispatcherOptions;
use crate::value::{Function, Value};

/// A single-use closure that builds the argument list for one callback invocation.
///
/// It is created on a producer thread, so everything it captures must be owned and `Send`. It
/// runs exactly once, on the consumer thread, or not at all if the call is rejected or discarded
/// at teardown.
pub type ArgumentBuilder = Box<dyn FnOnce(&Scope<'_>) -> Vec<Value> + Send>;

/// Something that can accept argument builders from any thread.
///
/// This is the only capability an event source needs from a [`Dispatcher`].
pub trait Deliver: Send + Sync {
    /// Hands `builder` over for invocation on the consumer thread.
    ///
    /// Failures are absorbed: a rejected builder is dropped without running.
    fn deliver(&self, builder: ArgumentBuilder);
}

/// The consumer-thread context an [`ArgumentBuilder`] runs in.
#[derive(Debug)]
pub struct Scope<'a> {
    executor: &'a Executor,
    name: &'a str,
}

impl Scope<'_> {
    /// The executor that owns the callback.
    pub fn executor(&self) -> &Executor {
        self.executor
    }

    /// The name of the dispatcher running the builder.
    pub fn dispatcher_name(&self) -> &str {
        self.name
    }
}

/// The lifecycle of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatcherState {
    Constructed,
    Active,
    Aborting,
    Aborted,
}

const CONSTRUCTED: u8 = 0;
const ACTIVE: u8 = 1;
const ABORTING: u8 = 2;
const ABORTED: u8 = 3;

impl DispatcherState {
    fn from_u8(state: u8) -> Self {
        match state {
            CONSTRUCTED => DispatcherState::Constructed,
            ACTIVE => DispatcherState::Active,
            ABORTING => DispatcherState::Aborting,
            ABORTED => DispatcherState::Aborted,
            _ => unreachable!("invalid dispatcher state {state}"),
        }
    }
}

struct Shared {
    state: AtomicU8,
    name: String,
    consumer: ThreadId,
    // Held by the pump from its state check until the callback returns.
    invoking: Mutex<()>,
}

impl Shared {
    fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == ACTIVE
    }
}

struct PendingCall {
    builder: ArgumentBuilder,
}

/// Invokes one callback, bound to one receiver, on the consumer thread from any thread.
///
/// A `Dispatcher` is created on the thread that owns the [`Executor`], the receiver and the
/// callback. After that it is `Send` and `Sync`, and may be shared (typically in an [`Arc`])
/// with any number of producer threads.
///
/// Calls submitted by one producer run in submission order. [`submit()`](Self::submit) blocks
/// until the call has been handed to the consumer's queue, which bounds how far producers can
/// get ahead of the consumer.
///
/// Dropping the dispatcher, or calling [`abort()`](Self::abort), tears it down: queued calls are
/// discarded, blocked producers are released and later submissions are ignored.
pub struct Dispatcher {
    shared: Arc<Shared>,
    // Used by producer threads. Held across the blocking hand-off.
    sender: Mutex<mpsc::Sender<PendingCall>>,
    // Never held across a wait. Cloned for submissions from the consumer thread, closed on
    // teardown.
    origin: Mutex<mpsc::Sender<PendingCall>>,
    abort: async_broadcast::Sender<()>,
    aborted: async_broadcast::InactiveReceiver<()>,
    pump: Mutex<Option<Task<()>>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.shared.name)
            .field("state", &self.shared.state())
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with default options.
    ///
    /// See [`with_options()`](Self::with_options).
    pub fn new(executor: &Executor, receiver: Value, callback: Value) -> Result<Self> {
        Self::with_options(executor, receiver, callback, DispatcherOptions::default())
    }

    /// Creates a dispatcher that invokes `callback` with `receiver` bound, on `executor`'s thread.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if `receiver` is neither an object nor a function,
    /// or if `callback` is not a function.
    pub fn with_options(
        executor: &Executor,
        receiver: Value,
        callback: Value,
        options: DispatcherOptions,
    ) -> Result<Self> {
        if !(receiver.is_object() || receiver.is_function()) {
            return Err(Error::with_message(
                ErrorKind::InvalidArgument,
                "callback receiver must be an object or function",
            ));
        }

        let Value::Function(callback) = callback else {
            return Err(Error::with_message(
                ErrorKind::InvalidArgument,
                "callback must be a function",
            ));
        };

        let shared = Arc::new(Shared {
            state: AtomicU8::new(CONSTRUCTED),
            name: options.name().to_owned(),
            consumer: executor.thread_id(),
            invoking: Mutex::new(()),
        });

        let (sender, calls) = mpsc::channel(options.queue_depth());
        let (abort, aborted) = async_broadcast::broadcast(1);

        let pump = executor.spawn_local(pump(
            shared.clone(),
            calls,
            receiver,
            callback,
            executor.downgrade(),
        ));

        shared.state.store(ACTIVE, Ordering::Release);
        debug!(
            dispatcher = %shared.name,
            queue_depth = options.queue_depth(),
            "dispatcher active"
        );

        Ok(Self {
            shared,
            sender: Mutex::new(sender.clone()),
            origin: Mutex::new(sender),
            abort,
            aborted: aborted.deactivate(),
            pump: Mutex::new(Some(pump)),
        })
    }

    /// The name given in [`DispatcherOptions`].
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        self.shared.state()
    }

    /// Submits a call, blocking until it has been handed to the consumer.
    ///
    /// If the dispatcher is being torn down the builder is dropped without running and the
    /// call returns immediately. The failure is logged but not reported.
    ///
    /// When called on the consumer thread itself this never blocks.
    pub fn submit<F>(&self, builder: F)
    where
        F: FnOnce(&Scope<'_>) -> Vec<Value> + Send + 'static,
    {
        self.submit_boxed(Box::new(builder));
    }

    /// Like [`submit()`](Self::submit), but reports a rejected call.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Aborted`] if teardown began before the call was handed off.
    pub fn try_submit<F>(&self, builder: F) -> Result<()>
    where
        F: FnOnce(&Scope<'_>) -> Vec<Value> + Send + 'static,
    {
        self.hand_off(PendingCall {
            builder: Box::new(builder),
        })
    }

    fn submit_boxed(&self, builder: ArgumentBuilder) {
        if let Err(err) = self.hand_off(PendingCall { builder }) {
            debug!(dispatcher = %self.shared.name, "dropping call: {err}");
        }
    }

    fn hand_off(&self, call: PendingCall) -> Result<()> {
        if !self.shared.is_active() {
            return Err(ErrorKind::Aborted.into());
        }

        if thread::current().id() == self.shared.consumer {
            // The consumer cannot wait for itself. A fresh sender always has room for one call,
            // and it still goes through the same queue.
            let mut sender = lock(&self.origin).clone();
            return sender
                .try_send(call)
                .map_err(|_| Error::from(ErrorKind::Aborted));
        }

        let mut aborted = self.aborted.activate_cloned();
        let mut sender = lock(&self.sender);
        if !self.shared.is_active() {
            return Err(ErrorKind::Aborted.into());
        }

        let handoff = async {
            future::poll_fn(|cx| sender.poll_ready(cx))
                .await
                .map_err(|_| Error::from(ErrorKind::Aborted))?;
            sender
                .start_send(call)
                .map_err(|_| Error::from(ErrorKind::Aborted))
        };

        let abort = async {
            // Nothing is ever broadcast; this resolves when the channel is closed.
            let _ = aborted.recv().await;
            Err(Error::from(ErrorKind::Aborted))
        };

        future::block_on(future::or(handoff, abort))?;
        trace!(dispatcher = %self.shared.name, "call handed off");
        Ok(())
    }

    /// Tears the dispatcher down.
    ///
    /// Every producer blocked in [`submit()`](Self::submit) is released, calls that have been
    /// handed off but not yet run are discarded, and the receiver and callback are released the
    /// next time the consumer runs its queue. Calling this more than once has no further
    /// effect.
    ///
    /// Off the consumer thread this waits for a callback that is already running to return.
    /// Once it returns the callback is never invoked again. A call whose arguments were still
    /// being built is skipped.
    pub fn abort(&self) {
        if self
            .shared
            .state
            .compare_exchange(ACTIVE, ABORTING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        debug!(dispatcher = %self.shared.name, "aborting dispatcher");

        self.abort.close();
        lock(&self.origin).close_channel();

        if thread::current().id() != self.shared.consumer {
            drop(lock(&self.shared.invoking));
        }

        drop(lock(&self.pump).take());

        self.shared.state.store(ABORTED, Ordering::Release);
    }
}

impl Deliver for Dispatcher {
    fn deliver(&self, builder: ArgumentBuilder) {
        self.submit_boxed(builder);
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn pump(
    shared: Arc<Shared>,
    mut calls: mpsc::Receiver<PendingCall>,
    receiver: Value,
    callback: Function,
    executor: WeakExecutor,
) {
    while let Some(call) = calls.next().await {
        let Some(consumer) = executor.upgrade() else {
            break;
        };
        let invoked = invoke(&shared, &consumer, &receiver, &callback, call);
        drop(consumer);

        if !invoked {
            trace!(dispatcher = %shared.name, "skipping call after teardown");
            break;
        }

        // Let other tasks run between calls, including calls submitted by the callback itself.
        future::yield_now().await;
    }
}

fn invoke(
    shared: &Shared,
    executor: &Executor,
    receiver: &Value,
    callback: &Function,
    call: PendingCall,
) -> bool {
    let _invoking = lock(&shared.invoking);
    if !shared.is_active() {
        return false;
    }

    let scope = Scope {
        executor,
        name: &shared.name,
    };
    let args = (call.builder)(&scope);

    // Teardown may have begun while the arguments were being built.
    if !shared.is_active() {
        return false;
    }

    callback.call(receiver, args);
    true
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
