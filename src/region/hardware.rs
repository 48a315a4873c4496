//! Android hardware buffer backend.
//!
//! A BLOB-format buffer of `width = size, height = 1, layers = 1` resolves
//! to a plain byte region; the NDK supplies its own cross-process transfer
//! primitive, so this backend bypasses the SCM_RIGHTS framing entirely.

use std::os::fd::RawFd;
use std::ptr::{self, NonNull};

use crate::error::{MemlinkError, Result};

use super::config::Access;

/// Owned reference to an `AHardwareBuffer` laid out as `size` opaque bytes
#[derive(Debug)]
pub(crate) struct HardwareBuffer {
    raw: NonNull<ndk_sys::AHardwareBuffer>,
    size: usize,
}

// SAFETY: AHardwareBuffer references are process-global and refcounted.
unsafe impl Send for HardwareBuffer {}
unsafe impl Sync for HardwareBuffer {}

impl HardwareBuffer {
    pub(crate) fn allocate_blob(size: usize) -> Result<Self> {
        let desc = ndk_sys::AHardwareBuffer_Desc {
            width: size as u32,
            height: 1,
            layers: 1,
            format: ndk_sys::AHardwareBuffer_Format::AHARDWAREBUFFER_FORMAT_BLOB.0,
            usage: ndk_sys::AHardwareBuffer_UsageFlags::AHARDWAREBUFFER_USAGE_CPU_READ_OFTEN.0
                | ndk_sys::AHardwareBuffer_UsageFlags::AHARDWAREBUFFER_USAGE_CPU_WRITE_OFTEN.0,
            stride: 0,
            rfu0: 0,
            rfu1: 0,
        };

        let mut raw = ptr::null_mut();
        // SAFETY: desc is fully initialized; the out pointer is written on success.
        let rc = unsafe { ndk_sys::AHardwareBuffer_allocate(&desc, &mut raw) };
        if rc != 0 {
            return Err(MemlinkError::allocation(format!(
                "AHardwareBuffer_allocate failed with status {}",
                rc
            )));
        }

        NonNull::new(raw)
            .map(|raw| Self { raw, size })
            .ok_or_else(|| MemlinkError::allocation("AHardwareBuffer_allocate returned null"))
    }

    /// Send this buffer's handle over a connected unix domain socket
    pub(crate) fn send(&self, socket: RawFd) -> Result<()> {
        // SAFETY: raw is a live buffer reference and socket is connected.
        let rc = unsafe { ndk_sys::AHardwareBuffer_sendHandleFromUnixSocket(self.raw.as_ptr(), socket) };
        if rc != 0 {
            return Err(MemlinkError::send(format!(
                "AHardwareBuffer_sendHandleFromUnixSocket failed with status {}",
                rc
            )));
        }
        Ok(())
    }

    /// Receive a buffer handle from a connected unix domain socket
    pub(crate) fn receive(socket: RawFd, size: usize) -> Result<Self> {
        let mut raw = ptr::null_mut();
        // SAFETY: the out pointer is written on success.
        let rc = unsafe { ndk_sys::AHardwareBuffer_recvHandleFromUnixSocket(socket, &mut raw) };
        if rc != 0 {
            return Err(MemlinkError::receive(format!(
                "AHardwareBuffer_recvHandleFromUnixSocket failed with status {}",
                rc
            )));
        }

        NonNull::new(raw)
            .map(|raw| Self { raw, size })
            .ok_or_else(|| MemlinkError::malformed("received null hardware buffer handle"))
    }

    /// Lock the first `len` bytes for CPU access
    pub(crate) fn lock(&self, access: Access, len: usize) -> Result<LockedBuffer> {
        let usage = match access {
            Access::ReadOnly => {
                ndk_sys::AHardwareBuffer_UsageFlags::AHARDWAREBUFFER_USAGE_CPU_READ_OFTEN.0
            }
            Access::ReadWrite => {
                ndk_sys::AHardwareBuffer_UsageFlags::AHARDWAREBUFFER_USAGE_CPU_READ_OFTEN.0
                    | ndk_sys::AHardwareBuffer_UsageFlags::AHARDWAREBUFFER_USAGE_CPU_WRITE_OFTEN.0
            }
        };

        let mut addr = ptr::null_mut();
        // SAFETY: raw is a live buffer reference; -1 means no fence to wait on.
        let rc = unsafe {
            ndk_sys::AHardwareBuffer_lock(self.raw.as_ptr(), usage, -1, ptr::null(), &mut addr)
        };
        if rc != 0 {
            return Err(MemlinkError::mapping(format!(
                "AHardwareBuffer_lock failed with status {}",
                rc
            )));
        }

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| MemlinkError::mapping("AHardwareBuffer_lock returned null"))?;

        // The locked view keeps its own reference so the buffer outlives
        // the handle it was locked from.
        // SAFETY: raw is live; acquire bumps the refcount.
        unsafe { ndk_sys::AHardwareBuffer_acquire(self.raw.as_ptr()) };

        Ok(LockedBuffer {
            raw: self.raw,
            ptr,
            len,
            writable: matches!(access, Access::ReadWrite),
        })
    }
}

impl Drop for HardwareBuffer {
    fn drop(&mut self) {
        // SAFETY: raw holds one reference owned by this value.
        unsafe { ndk_sys::AHardwareBuffer_release(self.raw.as_ptr()) };
    }
}

/// CPU-locked window into a hardware buffer
#[derive(Debug)]
pub(crate) struct LockedBuffer {
    raw: NonNull<ndk_sys::AHardwareBuffer>,
    ptr: NonNull<u8>,
    len: usize,
    writable: bool,
}

// SAFETY: the locked address range stays valid until unlock in Drop.
unsafe impl Send for LockedBuffer {}

impl LockedBuffer {
    pub(crate) fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr spans len readable bytes while the lock is held.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        if !self.writable {
            return Err(MemlinkError::ReadOnly);
        }
        // SAFETY: ptr spans len writable bytes while the lock is held.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) })
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        // SAFETY: raw is locked by this value and holds its own reference.
        unsafe {
            ndk_sys::AHardwareBuffer_unlock(self.raw.as_ptr(), ptr::null_mut());
            ndk_sys::AHardwareBuffer_release(self.raw.as_ptr());
        }
    }
}
