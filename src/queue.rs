//! The queue handle.
//!
//! A [`MessageQueue`] pairs a kernel queue id with the one [`MessageBuffer`]
//! used for all of its sends and receives. The buffer's capacity is taken
//! from the configuration once, so every call on the handle uses the same
//! `max_size` it was allocated with.
//!
//! ```rust,no_run
//! use sysv_mq::{MessageQueue, MsgFlags, QueueConfig, TypeSelector};
//!
//! # fn main() -> sysv_mq::Result<()> {
//! let mut mq = MessageQueue::open(QueueConfig::with_key(0xDEADBEEFu32 as i32).create())?;
//! mq.send(b"Hello World", 1, MsgFlags::NOWAIT)?;
//! let (message, mtype) = mq.receive(TypeSelector::Any, MsgFlags::NOWAIT)?;
//! assert_eq!((message.as_slice(), mtype), (&b"Hello World"[..], 1));
//! mq.destroy()?;
//! # Ok(())
//! # }
//! ```

use crate::config::QueueConfig;
use crate::error::{MqError, Result};
use crate::ipc::{
    sys, MessageBuffer, MessageType, MsgFlags, QueueId, QueueSet, QueueStats, TypeSelector,
    UNCONNECTED,
};
use libc::key_t;
use tracing::{debug, trace};

/// A connection to a System V message queue.
///
/// `Send` but not `Sync`: sending and receiving overwrite the shared buffer
/// in place, so they take `&mut self`. Wrap the handle in a
/// [`crate::SharedMessageQueue`] to use it from several threads.
#[derive(Debug)]
pub struct MessageQueue {
    id: QueueId,
    key: key_t,
    config: QueueConfig,
    buffer: MessageBuffer,
}

impl MessageQueue {
    /// Resolve the key, obtain the queue id and allocate the buffer.
    pub fn open(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        let key = config.resolve_key()?;
        let id = sys::msgget(key, config.flags, config.permissions)?;
        debug!(
            "Opened message queue key={:#x} id={} flags={:?}",
            key, id, config.flags
        );

        let buffer = MessageBuffer::allocate(config.max_size)?;

        Ok(Self {
            id,
            key,
            config,
            buffer,
        })
    }

    /// The kernel queue id, or `None` once closed.
    pub fn id(&self) -> Option<QueueId> {
        self.is_connected().then_some(self.id)
    }

    /// The resolved key.
    pub fn key(&self) -> key_t {
        self.key
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Size of the largest message this handle can send or receive.
    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    pub fn is_connected(&self) -> bool {
        self.id != UNCONNECTED
    }

    fn connected_id(&self) -> Result<QueueId> {
        if self.is_connected() {
            Ok(self.id)
        } else {
            Err(MqError::Closed)
        }
    }

    /// Send `message` tagged with `msg_type`, which should be positive.
    ///
    /// Blocks while the queue is full unless `flags` contains `NOWAIT`, in
    /// which case a full queue yields `WouldBlock`. A message longer than
    /// `max_size` fails with `MessageTooLarge` without reaching the kernel.
    pub fn send(&mut self, message: &[u8], msg_type: MessageType, flags: MsgFlags) -> Result<()> {
        let id = self.connected_id()?;
        sys::msgsnd(id, &mut self.buffer, message, msg_type, flags)?;
        trace!(
            "Sent {} bytes with type {} to queue {}",
            message.len(),
            msg_type,
            id
        );
        Ok(())
    }

    pub fn send_str(&mut self, message: &str, msg_type: MessageType, flags: MsgFlags) -> Result<()> {
        self.send(message.as_bytes(), msg_type, flags)
    }

    /// Receive the oldest message matching `selector`.
    ///
    /// Returns the payload exactly as sent and its actual type. If the next
    /// eligible message is longer than `max_size` the call fails with
    /// `MessageTooLarge` and leaves it queued, unless `flags` contains
    /// `NOERROR`, in which case it is consumed and truncated. `Exact` and
    /// `AtMost` selectors with a type below 1 fail with `InvalidArgument`.
    pub fn receive(
        &mut self,
        selector: TypeSelector,
        flags: MsgFlags,
    ) -> Result<(Vec<u8>, MessageType)> {
        let id = self.connected_id()?;
        let msgtyp = selector.checked_raw()?;
        let (len, mtype) = sys::msgrcv(id, &mut self.buffer, msgtyp, flags)?;
        trace!("Received {} bytes with type {} from queue {}", len, mtype, id);
        Ok((self.buffer.payload(len)?.to_vec(), mtype))
    }

    /// Receive a message and decode it as UTF-8.
    pub fn receive_string(
        &mut self,
        selector: TypeSelector,
        flags: MsgFlags,
    ) -> Result<(String, MessageType)> {
        let (bytes, mtype) = self.receive(selector, flags)?;
        Ok((String::from_utf8(bytes)?, mtype))
    }

    /// A fresh `IPC_STAT` snapshot.
    pub fn stat(&self) -> Result<QueueStats> {
        sys::stat(self.connected_id()?)
    }

    /// Apply `update` with `IPC_SET`.
    pub fn set(&self, update: &QueueSet) -> Result<()> {
        let id = self.connected_id()?;
        sys::set(id, update)?;
        debug!("Updated message queue {} metadata: {:?}", id, update);
        Ok(())
    }

    /// Number of messages currently queued.
    pub fn count(&self) -> Result<u64> {
        Ok(self.stat()?.message_count)
    }

    /// Number of bytes currently queued.
    pub fn size(&self) -> Result<u64> {
        Ok(self.stat()?.current_bytes)
    }

    /// Remove the queue from the kernel, then close the handle.
    ///
    /// The handle is closed whether or not removal succeeds.
    pub fn destroy(&mut self) -> Result<()> {
        let result = self.connected_id().and_then(sys::remove);
        match &result {
            Ok(()) => debug!("Destroyed message queue key={:#x} id={}", self.key, self.id),
            Err(e) => debug!("Failed to destroy message queue id={}: {}", self.id, e),
        }
        self.close();
        result
    }

    /// Release the buffer and mark the handle unconnected.
    ///
    /// Leaves the kernel queue in place. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.is_connected() {
            debug!("Closing message queue handle id={}", self.id);
            self.buffer.release();
            self.id = UNCONNECTED;
        }
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        self.close();
    }
}
