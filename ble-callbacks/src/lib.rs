//! Typed Bluetooth LE events, delivered to a callback on its owning thread.
//!
//! An event source (a platform Bluetooth stack binding, a simulator) calls the methods of
//! [`Emit`] from whatever threads it runs on. Each call is copied into an [`Event`] and
//! handed to a [`callback_bridge::Dispatcher`], which invokes the wrapped callback on the
//! consumer thread with the event name followed by the event data.
//!
//! ```
//! # use ble_callbacks::{Emit, Executor, RadioState, Value};
//! let executor = Executor::new("consumer");
//! let mut emit = Emit::default();
//! emit.wrap(
//!     &executor,
//!     Value::object::<&str>([]),
//!     Value::function(|_, args| println!("{:?}", args)),
//! )
//! .unwrap();
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| emit.radio_state(RadioState::PoweredOn));
//! });
//! executor.run_pending();
//! ```

mod emit;
mod event;
mod peripheral;
mod util;

pub use emit::*;
pub use event::*;
pub use peripheral::*;
pub use util::uuid_string;

pub use btuuid::BluetoothUuid;
pub use callback_bridge::{Error, ErrorKind, Result, Value};
pub use local_executor::Executor;
