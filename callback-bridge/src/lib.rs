//! Invoke a callback that lives on one thread from any other thread.
//!
//! A [`Dispatcher`] binds a receiver and a callback, both [`Value`]s owned by the consumer
//! thread, to a thread-safe submission channel. Producer threads submit
//! [`ArgumentBuilder`]s; each builder runs on the consumer thread, inside its
//! [`Executor`], and its result becomes the argument list of one callback invocation.
//!
//! ```
//! # use callback_bridge::{Dispatcher, Executor, Value};
//! # use std::sync::Arc;
//! let executor = Executor::new("consumer");
//! let receiver = Value::object([("name", Value::from("listener"))]);
//! let callback = Value::function(|this, args| {
//!     println!("{:?} got {:?}", this, args);
//! });
//!
//! let dispatcher = Arc::new(Dispatcher::new(&executor, receiver, callback).unwrap());
//!
//! let producer = std::thread::spawn({
//!     let dispatcher = dispatcher.clone();
//!     move || {
//!         let payload = vec![1u8, 2, 3];
//!         dispatcher.submit(move |_| vec![Value::from("data"), Value::buffer(payload)]);
//!     }
//! });
//!
//! producer.join().unwrap();
//! executor.run_pending();
//! ```

mod dispatcher;
pub mod error;
mod options;
mod value;

pub use dispatcher::*;
pub use error::{Error, ErrorKind, Result};
pub use options::*;
pub use value::*;

pub use local_executor::Executor;
