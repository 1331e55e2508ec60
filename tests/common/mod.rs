//! Shared helpers for the integration tests.
//!
//! Every test works on its own queue, created exclusively under a random
//! key and removed when the [`TestQueue`] guard drops. When the host does
//! not provide System V message queues (some containers and sandboxes) the
//! tests skip at runtime instead of failing.

#![allow(dead_code)]

use rand::Rng;
use std::ops::{Deref, DerefMut};
use sysv_mq::{MessageQueue, MqError, QueueConfig};

/// Open a fresh queue, or return early with `Ok(())` when SysV IPC is unavailable.
macro_rules! queue_or_skip {
    ($max_size:expr) => {
        match common::TestQueue::create($max_size) {
            Some(queue) => queue,
            None => return Ok(()),
        }
    };
}

/// A freshly created queue that is destroyed on drop.
pub struct TestQueue(MessageQueue);

impl TestQueue {
    pub fn create(max_size: usize) -> Option<Self> {
        sysv_mq::logging::init("sysv_mq=debug");

        let mut rng = rand::thread_rng();
        for _ in 0..16 {
            let key = rng.gen_range(0x1000..i32::MAX);
            let config = QueueConfig::with_key(key).exclusive().max_size(max_size);
            match MessageQueue::open(config) {
                Ok(mq) => return Some(Self(mq)),
                Err(MqError::AlreadyExists) => continue,
                Err(
                    e @ (MqError::Os(_)
                    | MqError::PermissionDenied
                    | MqError::ResourceLimitExceeded),
                ) => {
                    eprintln!("Skipping: System V message queues unavailable: {}", e);
                    return None;
                }
                Err(e) => panic!("failed to create test queue: {}", e),
            }
        }
        panic!("could not find an unused queue key");
    }

    /// Open a second, independent handle on the same queue.
    pub fn attach(&self, max_size: usize) -> MessageQueue {
        MessageQueue::open(QueueConfig::with_key(self.0.key()).max_size(max_size))
            .expect("attach to test queue")
    }
}

impl Deref for TestQueue {
    type Target = MessageQueue;

    fn deref(&self) -> &MessageQueue {
        &self.0
    }
}

impl DerefMut for TestQueue {
    fn deref_mut(&mut self) -> &mut MessageQueue {
        &mut self.0
    }
}

impl Drop for TestQueue {
    fn drop(&mut self) {
        if self.0.is_connected() {
            let _ = self.0.destroy();
        }
    }
}

/// The kernel's per-message size limit, where the host exposes it.
pub fn kernel_msgmax() -> Option<usize> {
    std::fs::read_to_string("/proc/sys/kernel/msgmax")
        .ok()?
        .trim()
        .parse()
        .ok()
}
