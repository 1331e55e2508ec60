//! The reusable `msgbuf` region.
//!
//! The kernel expects `struct msgbuf { long mtype; char mtext[]; }`: one
//! `long` header followed by the payload. Rust has no variable-length
//! trailing member, so the region is allocated by hand with an explicit
//! layout of `HEADER_SIZE + capacity` bytes aligned for `c_long`, and the
//! header and payload are addressed separately.
//!
//! One buffer belongs to one handle and is overwritten in place on every
//! send and receive. Mutating methods take `&mut self`, so two calls can
//! never share it at once.

use crate::error::{MqError, Result};
use crate::ipc::MessageType;
use libc::{c_long, c_void};
use std::alloc::{self, Layout};
use std::mem;
use std::ptr::{self, NonNull};
use tracing::trace;

/// Heap region laid out as a `msgbuf` with `capacity` payload bytes.
#[derive(Debug)]
pub struct MessageBuffer {
    ptr: Option<NonNull<u8>>,
    capacity: usize,
}

// SAFETY: the buffer uniquely owns its allocation; no aliases escape.
unsafe impl Send for MessageBuffer {}

impl MessageBuffer {
    /// Size of the `mtype` header word.
    pub const HEADER_SIZE: usize = mem::size_of::<c_long>();

    /// Allocate a buffer able to hold `capacity` payload bytes.
    pub fn allocate(capacity: usize) -> Result<Self> {
        let layout = Self::layout(capacity).ok_or(MqError::AllocationFailure {
            size: capacity.saturating_add(Self::HEADER_SIZE),
        })?;

        // SAFETY: the layout always has a non-zero size (at least the header).
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(MqError::AllocationFailure {
            size: layout.size(),
        })?;

        // Start from a well-defined header; the payload stays uninitialised
        // until written and is only read back up to a kernel-reported length.
        // SAFETY: the allocation is aligned for `c_long` and at least HEADER_SIZE long.
        unsafe { ptr.as_ptr().cast::<c_long>().write(0) };

        trace!("Allocated message buffer of {} bytes", layout.size());
        Ok(Self {
            ptr: Some(ptr),
            capacity,
        })
    }

    /// Layout of the combined header and payload, or `None` on overflow.
    fn layout(capacity: usize) -> Option<Layout> {
        let size = Self::HEADER_SIZE.checked_add(capacity)?;
        Layout::from_size_align(size, mem::align_of::<c_long>()).ok()
    }

    /// Payload capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total allocation size, header included.
    pub fn allocation_size(&self) -> usize {
        Self::HEADER_SIZE + self.capacity
    }

    /// Whether [`MessageBuffer::release`] has run; a released buffer
    /// rejects reads and writes with `Closed`.
    pub fn is_released(&self) -> bool {
        self.ptr.is_none()
    }

    /// Return the memory to the allocator. Further calls are no-ops.
    pub fn release(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            if let Some(layout) = Self::layout(self.capacity) {
                // SAFETY: `ptr` came from `alloc::alloc` with this exact layout
                // and `take()` guarantees it is freed once.
                unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
                trace!("Released message buffer of {} bytes", layout.size());
            }
        }
    }

    fn live(&self) -> Result<NonNull<u8>> {
        self.ptr.ok_or(MqError::Closed)
    }

    /// Current value of the header word.
    pub fn message_type(&self) -> Result<MessageType> {
        let ptr = self.live()?;
        // SAFETY: the header is initialised at allocation and always in bounds.
        Ok(unsafe { ptr.as_ptr().cast::<c_long>().read() })
    }

    /// Overwrite the header word.
    pub fn set_message_type(&mut self, mtype: MessageType) -> Result<()> {
        let ptr = self.live()?;
        // SAFETY: see `message_type`.
        unsafe { ptr.as_ptr().cast::<c_long>().write(mtype) };
        Ok(())
    }

    /// Stage a message for sending: header then payload.
    ///
    /// Fails with `MessageTooLarge` without touching the buffer when the
    /// payload does not fit.
    pub fn write(&mut self, mtype: MessageType, payload: &[u8]) -> Result<()> {
        if payload.len() > self.capacity {
            return Err(MqError::MessageTooLarge {
                size: Some(payload.len()),
                max_size: self.capacity,
            });
        }

        self.set_message_type(mtype)?;
        if !payload.is_empty() {
            let ptr = self.live()?;
            // SAFETY: the payload region starts HEADER_SIZE bytes in and holds
            // `capacity >= payload.len()` bytes; source and destination are
            // distinct allocations.
            unsafe {
                ptr::copy_nonoverlapping(
                    payload.as_ptr(),
                    ptr.as_ptr().add(Self::HEADER_SIZE),
                    payload.len(),
                );
            }
        }
        Ok(())
    }

    /// The first `len` payload bytes, as reported by the kernel for the
    /// latest receive.
    pub fn payload(&self, len: usize) -> Result<&[u8]> {
        let ptr = self.live()?;
        if len > self.capacity {
            return Err(MqError::MessageTooLarge {
                size: Some(len),
                max_size: self.capacity,
            });
        }
        // SAFETY: in bounds per the check above; the caller only asks for
        // bytes the kernel or `write` has just filled.
        Ok(unsafe { std::slice::from_raw_parts(ptr.as_ptr().add(Self::HEADER_SIZE), len) })
    }

    /// Pointer handed to `msgsnd(2)`/`msgrcv(2)`.
    pub(crate) fn as_mut_ptr(&mut self) -> Result<*mut c_void> {
        Ok(self.live()?.as_ptr().cast())
    }
}

impl Drop for MessageBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_size_includes_header() {
        let buffer = MessageBuffer::allocate(1024).unwrap();
        assert_eq!(buffer.capacity(), 1024);
        assert_eq!(buffer.allocation_size(), 1024 + mem::size_of::<c_long>());
        assert_eq!(buffer.message_type().unwrap(), 0);
    }

    #[test]
    fn test_zero_capacity_buffer() {
        let mut buffer = MessageBuffer::allocate(0).unwrap();
        buffer.write(3, &[]).unwrap();
        assert_eq!(buffer.message_type().unwrap(), 3);
        assert!(buffer.payload(0).unwrap().is_empty());
    }

    #[test]
    fn test_write_then_read_payload() {
        let mut buffer = MessageBuffer::allocate(16).unwrap();
        buffer.write(5, b"narwhal").unwrap();
        assert_eq!(buffer.message_type().unwrap(), 5);
        assert_eq!(buffer.payload(7).unwrap(), b"narwhal");

        // The buffer is reused in place.
        buffer.write(6, b"ice").unwrap();
        assert_eq!(buffer.message_type().unwrap(), 6);
        assert_eq!(buffer.payload(3).unwrap(), b"ice");
    }

    #[test]
    fn test_oversize_write_is_rejected_untouched() {
        let mut buffer = MessageBuffer::allocate(4).unwrap();
        buffer.write(1, b"abcd").unwrap();

        let err = buffer.write(2, b"abcde").unwrap_err();
        assert!(matches!(
            err,
            MqError::MessageTooLarge {
                size: Some(5),
                max_size: 4
            }
        ));
        assert_eq!(buffer.message_type().unwrap(), 1);
        assert_eq!(buffer.payload(4).unwrap(), b"abcd");
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut buffer = MessageBuffer::allocate(32).unwrap();
        buffer.release();
        buffer.release();
        assert!(buffer.is_released());
        assert!(matches!(buffer.write(1, b"x"), Err(MqError::Closed)));
        assert!(matches!(buffer.payload(0), Err(MqError::Closed)));
    }

    #[test]
    fn test_overflowing_capacity_fails() {
        assert!(matches!(
            MessageBuffer::allocate(usize::MAX),
            Err(MqError::AllocationFailure { .. })
        ));
    }
}
