//! Local mappings of a transferred region handle

use memmap2::{Mmap, MmapMut};

use crate::error::{MemlinkError, Result};

use super::config::Access;

/// Width of the value slot at the start of the region
pub const SLOT_SIZE: usize = 8;

#[derive(Debug)]
pub(crate) enum Mapping {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
    #[cfg(target_os = "android")]
    Locked(super::hardware::LockedBuffer),
}

/// A region handle mapped into the local address space.
///
/// The view exposes the first 8 bytes of the region as a native-endian
/// integer slot; every process holding a view of the same handle reads
/// and writes the same kernel object directly, with no socket round-trip.
///
/// The protocol provides no multi-writer coordination: if two processes
/// write the slot concurrently the outcome is a race with no ordering
/// guarantee. Callers needing coordinated access must layer their own
/// synchronization primitive inside the region.
///
/// Dropping the view unmaps it. The kernel retains the backing object
/// until the last descriptor reference closes.
#[derive(Debug)]
pub struct MappedView {
    mapping: Mapping,
    size: usize,
    access: Access,
}

impl MappedView {
    pub(crate) fn new(mapping: Mapping, size: usize, access: Access) -> Self {
        Self {
            mapping,
            size,
            access,
        }
    }

    /// Get the mapped size in bytes
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check whether the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the access the view was mapped with
    pub fn access(&self) -> Access {
        self.access
    }

    /// Get the mapped bytes (read-only)
    pub fn as_slice(&self) -> &[u8] {
        match &self.mapping {
            Mapping::ReadOnly(map) => map,
            Mapping::ReadWrite(map) => map,
            #[cfg(target_os = "android")]
            Mapping::Locked(locked) => locked.as_slice(),
        }
    }

    /// Get the mapped bytes (mutable), failing on a read-only view
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        match &mut self.mapping {
            Mapping::ReadOnly(_) => Err(MemlinkError::ReadOnly),
            Mapping::ReadWrite(map) => Ok(map),
            #[cfg(target_os = "android")]
            Mapping::Locked(locked) => locked.as_mut_slice(),
        }
    }

    /// Read the 8-byte slot at the start of the region
    pub fn read_u64(&self) -> Result<u64> {
        let slot = self
            .as_slice()
            .get(..SLOT_SIZE)
            .ok_or_else(|| MemlinkError::insufficient_space(SLOT_SIZE, self.size))?;
        let mut bytes = [0u8; SLOT_SIZE];
        bytes.copy_from_slice(slot);
        Ok(u64::from_ne_bytes(bytes))
    }

    /// Unmap the view, releasing the address range.
    ///
    /// Equivalent to dropping the view; provided so callers can make the
    /// release explicit. Failing to unmap leaks address space, not
    /// correctness: the kernel retains the backing object until the last
    /// descriptor reference closes.
    pub fn unmap(self) {
        drop(self);
    }

    /// Write the 8-byte slot at the start of the region
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let size = self.size;
        let slot = self
            .as_mut_slice()?
            .get_mut(..SLOT_SIZE)
            .ok_or_else(|| MemlinkError::insufficient_space(SLOT_SIZE, size))?;
        slot.copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }
}
