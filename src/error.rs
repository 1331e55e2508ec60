//! Error taxonomy for queue operations.
//!
//! Every syscall failure is translated into an [`MqError`] at the call site.
//! The same errno means different things to different syscalls (`EINVAL`
//! from `msgctl` is a stale id, from `msgsnd` it is usually a bad type tag),
//! so the translation is keyed by the [`Op`] that failed.

use nix::errno::Errno;
use std::path::PathBuf;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MqError>;

/// Errors returned by queue operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MqError {
    /// `ftok(3)` could not derive a key from the path and project id.
    #[error("failed to derive key from {path:?} (project id {project_id}): {source}")]
    KeyDerivation {
        path: PathBuf,
        project_id: i32,
        #[source]
        source: Errno,
    },

    /// The queue does not exist, or the id no longer refers to a live queue.
    #[error("no such message queue")]
    NoSuchQueue,

    /// Exclusive creation was requested and the queue already exists.
    #[error("message queue already exists")]
    AlreadyExists,

    /// The caller's credentials do not permit the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// A system-wide queue count or size limit was hit.
    #[error("system message queue resource limit exceeded")]
    ResourceLimitExceeded,

    /// The local message buffer could not be allocated.
    #[error("failed to allocate a message buffer of {size} bytes")]
    AllocationFailure { size: usize },

    /// The message does not fit in the handle's buffer.
    ///
    /// `size` is known for sends (checked locally) and unknown for receives,
    /// where the kernel only reports that the next eligible message is longer.
    #[error("message exceeds buffer capacity of {max_size} bytes")]
    MessageTooLarge { size: Option<usize>, max_size: usize },

    /// A non-blocking operation could not complete immediately.
    #[error("operation would block")]
    WouldBlock,

    /// The queue was removed while the operation was in progress.
    #[error("message queue was removed")]
    QueueRemoved,

    /// The kernel rejected the arguments (typically a non-positive send type).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A blocking call was interrupted by a signal.
    #[error("interrupted")]
    Interrupted,

    /// The handle has been closed.
    #[error("message queue handle is closed")]
    Closed,

    /// A received payload was not valid UTF-8.
    #[error("received message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// The queue configuration is incomplete or out of range.
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    /// An errno with no more specific classification.
    #[error("system call failed: {0}")]
    Os(Errno),
}

/// The syscall family an errno came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    /// `msgget(2)`
    Connect,
    /// `msgsnd(2)`; carries whether the type tag was positive.
    Send { valid_type: bool },
    /// `msgrcv(2)`
    Receive,
    /// `msgctl(2)`
    Control,
}

impl MqError {
    /// Translate an errno reported by `op`.
    pub(crate) fn from_errno(errno: Errno, op: Op) -> Self {
        match (errno, op) {
            (Errno::EINTR, _) => MqError::Interrupted,
            (Errno::EIDRM, Op::Control) => MqError::NoSuchQueue,
            (Errno::EIDRM, _) => MqError::QueueRemoved,
            (Errno::EACCES | Errno::EPERM, _) => MqError::PermissionDenied,

            (Errno::ENOENT, Op::Connect) => MqError::NoSuchQueue,
            (Errno::EEXIST, Op::Connect) => MqError::AlreadyExists,
            (Errno::ENOSPC | Errno::ENOMEM, Op::Connect) => MqError::ResourceLimitExceeded,

            (Errno::EAGAIN, Op::Send { .. }) => MqError::WouldBlock,
            (Errno::ENOMEM, Op::Send { .. }) => MqError::ResourceLimitExceeded,
            (Errno::EINVAL, Op::Send { valid_type: false }) => {
                MqError::InvalidArgument("message type must be positive".to_string())
            }
            (Errno::EINVAL, Op::Send { valid_type: true }) => MqError::NoSuchQueue,

            (Errno::ENOMSG | Errno::EAGAIN, Op::Receive) => MqError::WouldBlock,
            (Errno::EINVAL, Op::Receive | Op::Control) => MqError::NoSuchQueue,

            (Errno::EINVAL, Op::Connect) => {
                MqError::InvalidArgument("rejected by msgget".to_string())
            }
            (other, _) => MqError::Os(other),
        }
    }

    /// The underlying OS error code, where one exists.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            MqError::KeyDerivation { source, .. } => Some(*source as i32),
            MqError::Os(errno) => Some(*errno as i32),
            _ => None,
        }
    }

    /// True for failures the caller may reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, MqError::WouldBlock | MqError::Interrupted)
    }
}
