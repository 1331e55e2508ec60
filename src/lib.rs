//! # sysv-mq
//!
//! A client library for System V IPC message queues (`msgget(2)`,
//! `msgsnd(2)`, `msgrcv(2)`, `msgctl(2)`).
//!
//! A queue lives in the kernel, is addressed by an integer key and outlives
//! the processes that use it. Messages are opaque byte strings tagged with a
//! positive integer type, which receivers can filter on.
//!
//! ## Architecture Overview
//!
//! - `ipc`: key derivation, the reusable message buffer, raw syscalls and
//!   the stat/set types
//! - `queue`: [`MessageQueue`], the handle tying a queue id to its buffer
//! - `shared`: [`SharedMessageQueue`] and [`AsyncMessageQueue`] for use
//!   across threads and from Tokio
//! - `config`: [`QueueConfig`], with serde support
//! - `error`: the [`MqError`] taxonomy
//! - `logging`: a colourised `tracing` formatter and subscriber setup
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sysv_mq::{MessageQueue, MsgFlags, QueueConfig, TypeSelector};
//!
//! fn main() -> sysv_mq::Result<()> {
//!     let config = QueueConfig::with_path("/tmp", 1).create().max_size(1024);
//!     let mut mq = MessageQueue::open(config)?;
//!
//!     mq.send_str("Narwhals and ice cream", 4, MsgFlags::NOWAIT)?;
//!     let (message, mtype) = mq.receive_string(TypeSelector::Any, MsgFlags::NOWAIT)?;
//!
//!     println!("{} (type {})", message, mtype);
//!     println!("{} messages left", mq.count()?);
//!     mq.close();
//!     Ok(())
//! }
//! ```
//!
//! ## The message buffer
//!
//! Each handle owns one buffer of `max_size` payload bytes behind a `long`
//! type header, reused for every call. Sends larger than `max_size` fail
//! locally with [`MqError::MessageTooLarge`]. Receives of larger messages
//! fail the same way and leave the message queued, unless the caller opts
//! into truncation with [`MsgFlags::NOERROR`].

/// Queue configuration and JSON loading.
pub mod config;

/// Error types and errno translation.
pub mod error;

/// Kernel interface: keys, buffers, syscalls and metadata types.
pub mod ipc;

pub mod logging;

/// The queue handle.
pub mod queue;

/// Thread-safe and async wrappers around a handle.
pub mod shared;

pub use config::QueueConfig;
pub use error::{MqError, Result};
pub use ipc::{
    MessageBuffer, MessageType, MsgFlags, OpenFlags, QueueId, QueuePermissions, QueueSet,
    QueueStats, TypeSelector,
};
pub use queue::MessageQueue;
pub use shared::{AsyncMessageQueue, SharedMessageQueue};

/// The crate version, from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default payload capacity of a handle's buffer, in bytes.
    pub const MAX_SIZE: usize = 1024;

    /// Default permission bits: read and write for the owner only.
    pub const PERMISSIONS: u32 = 0o600;

    /// Default project id for key derivation.
    pub const PROJECT_ID: i32 = 1;
}
