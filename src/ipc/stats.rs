//! Queue metadata: the `msqid_ds` snapshot and the `IPC_SET` request.

use chrono::{DateTime, Utc};
use libc::msqid_ds;
use serde::{Deserialize, Serialize};

/// Ownership and permission bits of a queue (`struct ipc_perm`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePermissions {
    pub uid: u32,
    pub gid: u32,
    pub creator_uid: u32,
    pub creator_gid: u32,
    /// Permission bits as reported by the kernel (`unsigned short`).
    pub mode: u16,
}

/// Snapshot of a queue's `msqid_ds`, taken by [`crate::MessageQueue::stat`].
///
/// Times are seconds since the epoch; `0` means the event has not happened
/// yet (or the platform does not record it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub perm: QueuePermissions,
    pub last_send_time: i64,
    pub last_receive_time: i64,
    pub last_change_time: i64,
    /// Bytes currently queued.
    pub current_bytes: u64,
    /// Messages currently queued.
    pub message_count: u64,
    /// Maximum number of bytes the queue may hold.
    pub max_bytes: u64,
    pub last_send_pid: i32,
    pub last_receive_pid: i32,
}

impl QueueStats {
    pub(crate) fn from_raw(info: &msqid_ds) -> Self {
        Self {
            perm: QueuePermissions {
                uid: info.msg_perm.uid as u32,
                gid: info.msg_perm.gid as u32,
                creator_uid: info.msg_perm.cuid as u32,
                creator_gid: info.msg_perm.cgid as u32,
                mode: info.msg_perm.mode as u16,
            },
            last_send_time: info.msg_stime as i64,
            last_receive_time: info.msg_rtime as i64,
            last_change_time: info.msg_ctime as i64,
            current_bytes: current_bytes(info),
            message_count: info.msg_qnum as u64,
            max_bytes: info.msg_qbytes as u64,
            last_send_pid: info.msg_lspid as i32,
            last_receive_pid: info.msg_lrpid as i32,
        }
    }

    pub fn last_send_at(&self) -> Option<DateTime<Utc>> {
        epoch_seconds(self.last_send_time)
    }

    pub fn last_receive_at(&self) -> Option<DateTime<Utc>> {
        epoch_seconds(self.last_receive_time)
    }

    pub fn last_change_at(&self) -> Option<DateTime<Utc>> {
        epoch_seconds(self.last_change_time)
    }
}

fn epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        None
    } else {
        DateTime::from_timestamp(secs, 0)
    }
}

/// Bytes currently queued. glibc and musl keep this in `__msg_cbytes`.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn current_bytes(info: &msqid_ds) -> u64 {
    info.__msg_cbytes as u64
}

/// Bytes currently queued.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn current_bytes(info: &msqid_ds) -> u64 {
    info.msg_cbytes as u64
}

/// Metadata update applied with `IPC_SET`.
///
/// Raising `max_bytes` above the system default needs privilege; changing
/// ownership needs the caller to be the owner, the creator or privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSet {
    pub uid: u32,
    pub gid: u32,
    /// Only the low nine permission bits are honoured.
    pub mode: u16,
    pub max_bytes: u64,
}

impl QueueSet {
    pub(crate) fn apply_to(&self, info: &mut msqid_ds) {
        info.msg_perm.uid = self.uid as _;
        info.msg_perm.gid = self.gid as _;
        info.msg_perm.mode = self.mode as _;
        info.msg_qbytes = self.max_bytes as _;
    }
}

impl From<&QueueStats> for QueueSet {
    /// The current settings, as a starting point for a read-modify-write.
    fn from(stats: &QueueStats) -> Self {
        Self {
            uid: stats.perm.uid,
            gid: stats.perm.gid,
            mode: stats.perm.mode & 0o777,
            max_bytes: stats.max_bytes,
        }
    }
}
