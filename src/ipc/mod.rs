//! Low-level System V message queue plumbing.
//!
//! The submodules wrap the kernel interface one concern at a time:
//! key derivation (`key`), the reusable `msgbuf` allocation (`buffer`),
//! the raw syscalls with errno translation (`sys`) and the `msqid_ds`
//! snapshot types (`stats`). [`crate::MessageQueue`] ties them together.

use crate::error::{MqError, Result};
use bitflags::bitflags;
use libc::c_int;
use serde::{Deserialize, Serialize};

pub mod buffer;
pub mod key;
pub mod stats;
pub mod sys;

pub use buffer::MessageBuffer;
pub use key::{derive_key, resolve_key};
pub use stats::{QueuePermissions, QueueSet, QueueStats};

/// Raw queue id returned by `msgget(2)`.
pub type QueueId = c_int;

/// Message type tag stored in the `mtype` header word.
pub type MessageType = libc::c_long;

/// Sentinel id of a handle that is not (or no longer) connected.
pub const UNCONNECTED: QueueId = -1;

bitflags! {
    /// Creation flags passed to `msgget(2)` alongside the permission bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct OpenFlags: c_int {
        /// Create the queue if it does not exist.
        const CREATE = libc::IPC_CREAT;
        /// With `CREATE`, fail if the queue already exists.
        const EXCLUSIVE = libc::IPC_EXCL;
    }
}

bitflags! {
    /// Per-call flags for send and receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MsgFlags: c_int {
        /// Fail with `WouldBlock` instead of waiting.
        const NOWAIT = libc::IPC_NOWAIT;
        /// Receive only: truncate an oversize message instead of failing.
        const NOERROR = libc::MSG_NOERROR;
    }
}

/// Which message a receive should take.
///
/// Maps onto the `msgtyp` argument of `msgrcv(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeSelector {
    /// The oldest message of any type (`msgtyp == 0`).
    #[default]
    Any,
    /// The oldest message with exactly this type (`msgtyp > 0`).
    Exact(MessageType),
    /// The oldest message with the lowest type that is `<=` the bound
    /// (`msgtyp == -bound`).
    AtMost(MessageType),
}

impl TypeSelector {
    /// Encode as the raw `msgtyp` value.
    pub fn to_raw(self) -> MessageType {
        match self {
            TypeSelector::Any => 0,
            TypeSelector::Exact(t) => t,
            TypeSelector::AtMost(bound) => bound.saturating_neg(),
        }
    }

    /// Encode as the raw `msgtyp` value, rejecting selectors whose encoding
    /// would change meaning. `Exact` and `AtMost` need a positive type.
    pub fn checked_raw(self) -> Result<MessageType> {
        match self {
            TypeSelector::Exact(t) | TypeSelector::AtMost(t) if t < 1 => Err(
                MqError::InvalidArgument(format!("type selector {:?} needs a positive type", self)),
            ),
            selector => Ok(selector.to_raw()),
        }
    }

    /// Decode a raw `msgtyp` value.
    pub fn from_raw(raw: MessageType) -> Self {
        match raw {
            0 => TypeSelector::Any,
            t if t > 0 => TypeSelector::Exact(t),
            t => TypeSelector::AtMost(t.saturating_neg()),
        }
    }
}
