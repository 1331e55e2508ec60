//! Handles usable from several threads or from async code.
//!
//! [`SharedMessageQueue`] puts one mutex around one [`MessageQueue`], which
//! serialises every use of its buffer. A blocking send or receive holds the
//! lock until the kernel returns, so a producer and a consumer that may both
//! block should each open their own handle; the kernel queue itself is safe
//! to share between any number of handles.
//!
//! [`AsyncMessageQueue`] runs each call on Tokio's blocking pool.

use crate::config::QueueConfig;
use crate::error::{MqError, Result};
use crate::ipc::{MessageType, MsgFlags, QueueSet, QueueStats, TypeSelector};
use crate::queue::MessageQueue;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// A cloneable, thread-safe reference to one queue handle.
#[derive(Debug, Clone)]
pub struct SharedMessageQueue {
    inner: Arc<Mutex<MessageQueue>>,
}

impl SharedMessageQueue {
    /// Open a queue and wrap the new handle.
    pub fn open(config: QueueConfig) -> Result<Self> {
        Ok(Self::new(MessageQueue::open(config)?))
    }

    /// Wrap an already open handle.
    pub fn new(queue: MessageQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    /// Run `f` with exclusive access to the handle.
    pub fn with<T>(&self, f: impl FnOnce(&mut MessageQueue) -> T) -> T {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    /// [`MessageQueue::send`] under the lock. A blocking send holds the
    /// lock until the kernel accepts the message.
    pub fn send(&self, message: &[u8], msg_type: MessageType, flags: MsgFlags) -> Result<()> {
        self.inner.lock().send(message, msg_type, flags)
    }

    /// [`MessageQueue::receive`] under the lock. A blocking receive holds
    /// the lock until a message arrives.
    pub fn receive(&self, selector: TypeSelector, flags: MsgFlags) -> Result<(Vec<u8>, MessageType)> {
        self.inner.lock().receive(selector, flags)
    }

    /// A fresh `IPC_STAT` snapshot.
    pub fn stat(&self) -> Result<QueueStats> {
        self.inner.lock().stat()
    }

    /// Apply `update` with `IPC_SET`.
    pub fn set(&self, update: &QueueSet) -> Result<()> {
        self.inner.lock().set(update)
    }

    /// Number of messages currently queued.
    pub fn count(&self) -> Result<u64> {
        self.inner.lock().count()
    }

    /// Number of bytes currently queued.
    pub fn size(&self) -> Result<u64> {
        self.inner.lock().size()
    }

    /// Remove the queue from the kernel and close the handle for every clone.
    pub fn destroy(&self) -> Result<()> {
        self.inner.lock().destroy()
    }

    /// Close the underlying handle for every clone.
    pub fn close(&self) {
        self.inner.lock().close()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().is_connected()
    }
}

/// Async front end over a [`SharedMessageQueue`].
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone)]
pub struct AsyncMessageQueue {
    shared: SharedMessageQueue,
}

impl AsyncMessageQueue {
    pub async fn open(config: QueueConfig) -> Result<Self> {
        let queue = run_blocking(move || MessageQueue::open(config)).await?;
        Ok(Self {
            shared: SharedMessageQueue::new(queue),
        })
    }

    /// Drive an existing shared handle from async code.
    pub fn from_shared(shared: SharedMessageQueue) -> Self {
        Self { shared }
    }

    pub fn shared(&self) -> &SharedMessageQueue {
        &self.shared
    }

    /// Send on the blocking pool. The payload is owned so it can move there.
    pub async fn send(&self, message: Vec<u8>, msg_type: MessageType, flags: MsgFlags) -> Result<()> {
        let shared = self.shared.clone();
        run_blocking(move || shared.send(&message, msg_type, flags)).await
    }

    /// Receive on the blocking pool.
    pub async fn receive(
        &self,
        selector: TypeSelector,
        flags: MsgFlags,
    ) -> Result<(Vec<u8>, MessageType)> {
        let shared = self.shared.clone();
        run_blocking(move || shared.receive(selector, flags)).await
    }

    pub async fn stat(&self) -> Result<QueueStats> {
        let shared = self.shared.clone();
        run_blocking(move || shared.stat()).await
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.stat().await?.message_count)
    }

    pub async fn size(&self) -> Result<u64> {
        Ok(self.stat().await?.current_bytes)
    }

    /// Remove the queue from the kernel and close the handle.
    pub async fn destroy(&self) -> Result<()> {
        let shared = self.shared.clone();
        run_blocking(move || shared.destroy()).await
    }

    pub fn close(&self) {
        self.shared.close()
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            debug!("Blocking queue task did not complete: {}", e);
            Err(MqError::Interrupted)
        }
    }
}
