//! Thin wrappers over `msgget(2)`, `msgsnd(2)`, `msgrcv(2)` and `msgctl(2)`.
//!
//! Each wrapper performs the syscall and translates errno through
//! [`MqError::from_errno`] for its operation. Nothing here retries.

use super::buffer::MessageBuffer;
use super::stats::{QueueSet, QueueStats};
use super::{MessageType, MsgFlags, OpenFlags, QueueId};
use crate::error::{MqError, Op, Result};
use libc::{c_int, key_t, msqid_ds};
use nix::errno::Errno;
use std::mem::MaybeUninit;

/// Obtain the id of the queue identified by `key`.
pub fn msgget(key: key_t, flags: OpenFlags, permissions: u32) -> Result<QueueId> {
    let msgflg = flags.bits() | (permissions & 0o777) as c_int;
    // SAFETY: plain integer arguments.
    let res = unsafe { libc::msgget(key, msgflg) };
    Errno::result(res).map_err(|e| MqError::from_errno(e, Op::Connect))
}

/// Send `message` with type `mtype` through `buffer`.
///
/// The size check happens here, before the kernel is involved, so an
/// oversize message yields a precise `MessageTooLarge`.
pub fn msgsnd(
    id: QueueId,
    buffer: &mut MessageBuffer,
    message: &[u8],
    mtype: MessageType,
    flags: MsgFlags,
) -> Result<()> {
    buffer.write(mtype, message)?;
    let msgp = buffer.as_mut_ptr()?;
    let msgflg = (flags & MsgFlags::NOWAIT).bits();

    // SAFETY: `msgp` points to HEADER_SIZE + capacity bytes and the header
    // plus `message.len() <= capacity` payload bytes were just written.
    let res = unsafe { libc::msgsnd(id, msgp, message.len(), msgflg) };
    Errno::result(res).map_err(|e| match e {
        Errno::EINVAL if mtype > 0 => classify_send_einval(id, message.len()),
        e => MqError::from_errno(
            e,
            Op::Send {
                valid_type: mtype > 0,
            },
        ),
    })?;
    Ok(())
}

/// `msgsnd` reports both a stale id and a message over the kernel's
/// per-message limit (`msgmax`) as `EINVAL`. A live queue means the latter.
fn classify_send_einval(id: QueueId, len: usize) -> MqError {
    match stat(id) {
        Err(MqError::NoSuchQueue) => MqError::NoSuchQueue,
        _ => MqError::InvalidArgument(format!(
            "message of {} bytes exceeds the kernel per-message limit",
            len
        )),
    }
}

/// Receive into `buffer`, returning the payload length and actual type.
///
/// The header is primed with the requested `msgtyp` before the call. The
/// kernel never writes more than `buffer.capacity()` payload bytes.
pub fn msgrcv(
    id: QueueId,
    buffer: &mut MessageBuffer,
    msgtyp: MessageType,
    flags: MsgFlags,
) -> Result<(usize, MessageType)> {
    let max_size = buffer.capacity();
    buffer.set_message_type(msgtyp)?;
    let msgp = buffer.as_mut_ptr()?;

    // SAFETY: `msgp` points to HEADER_SIZE + max_size writable bytes.
    let res = unsafe { libc::msgrcv(id, msgp, max_size, msgtyp, flags.bits()) };
    let len = Errno::result(res).map_err(|e| match e {
        Errno::E2BIG => MqError::MessageTooLarge {
            size: None,
            max_size,
        },
        e => MqError::from_errno(e, Op::Receive),
    })?;

    Ok((len as usize, buffer.message_type()?))
}

fn msgctl(id: QueueId, cmd: c_int, info: &mut msqid_ds) -> Result<()> {
    // SAFETY: `info` is a valid, exclusively borrowed msqid_ds.
    let res = unsafe { libc::msgctl(id, cmd, info) };
    Errno::result(res).map_err(|e| MqError::from_errno(e, Op::Control))?;
    Ok(())
}

fn zeroed_msqid_ds() -> msqid_ds {
    // SAFETY: msqid_ds is a plain C struct for which all-zero bytes is valid.
    unsafe { MaybeUninit::<msqid_ds>::zeroed().assume_init() }
}

/// `msgctl(IPC_STAT)`.
pub fn stat(id: QueueId) -> Result<QueueStats> {
    let mut info = zeroed_msqid_ds();
    msgctl(id, libc::IPC_STAT, &mut info)?;
    Ok(QueueStats::from_raw(&info))
}

/// `msgctl(IPC_SET)`; the kernel applies all fields or none.
pub fn set(id: QueueId, update: &QueueSet) -> Result<()> {
    let mut info = zeroed_msqid_ds();
    update.apply_to(&mut info);
    msgctl(id, libc::IPC_SET, &mut info)
}

/// `msgctl(IPC_RMID)`.
pub fn remove(id: QueueId) -> Result<()> {
    let mut info = zeroed_msqid_ds();
    msgctl(id, libc::IPC_RMID, &mut info)
}
