//! Region handles: allocation and mapping of the shared kernel object

use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use log::{debug, info};
use memmap2::MmapOptions;
use nix::{
    sys::memfd::{memfd_create, MemFdCreateFlag},
    sys::stat::fstat,
    unistd::ftruncate,
};

use crate::error::{MemlinkError, Result};

use super::config::{Access, RegionConfig, RegionKind};
use super::view::{MappedView, Mapping};

/// A transferable handle to a fixed-size shared memory region.
///
/// Created once per server instance and never mutated. Transfers
/// duplicate, not move: each recipient ends up with an independent
/// reference to the same underlying kernel object, so closing one
/// reference does not invalidate the others.
#[derive(Debug)]
pub struct RegionHandle {
    kind: RegionKind,
    repr: HandleRepr,
    size: usize,
    name: String,
}

#[derive(Debug)]
pub(crate) enum HandleRepr {
    MemFd(OwnedFd),
    #[cfg(target_os = "android")]
    HardwareBuffer(super::hardware::HardwareBuffer),
}

impl RegionHandle {
    /// Allocate a kernel-visible shared region of exactly `config.size` bytes
    pub fn allocate(config: RegionConfig) -> Result<Self> {
        config.validate()?;

        let repr = match config.kind {
            RegionKind::AnonymousMemory => Self::allocate_memfd(&config)?,
            RegionKind::PlatformBuffer => Self::allocate_platform_buffer(&config)?,
        };

        info!(
            "allocated {} region '{}' ({} bytes)",
            config.kind.name(),
            config.name,
            config.size
        );

        Ok(Self {
            kind: config.kind,
            repr,
            size: config.size,
            name: config.name,
        })
    }

    fn allocate_memfd(config: &RegionConfig) -> Result<HandleRepr> {
        let name_cstr = CString::new(config.name.clone())
            .map_err(|_| MemlinkError::invalid_parameter("name", "Name contains null bytes"))?;

        let fd = memfd_create(&name_cstr, MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(|e| MemlinkError::allocation(format!("Failed to create memfd: {}", e)))?;

        ftruncate(&fd, config.size as i64)
            .map_err(|e| MemlinkError::allocation(format!("Failed to set memfd size: {}", e)))?;

        Ok(HandleRepr::MemFd(fd))
    }

    #[cfg(target_os = "android")]
    fn allocate_platform_buffer(config: &RegionConfig) -> Result<HandleRepr> {
        let buffer = super::hardware::HardwareBuffer::allocate_blob(config.size)?;
        Ok(HandleRepr::HardwareBuffer(buffer))
    }

    #[cfg(not(target_os = "android"))]
    fn allocate_platform_buffer(config: &RegionConfig) -> Result<HandleRepr> {
        Err(MemlinkError::allocation(format!(
            "{} regions are not available on this platform",
            config.kind.name()
        )))
    }

    /// Rebuild a handle from a descriptor received over the channel.
    ///
    /// Size and name come from the caller's out-of-band configuration;
    /// the wire carries only the descriptor.
    pub(crate) fn from_memfd(fd: OwnedFd, config: &RegionConfig) -> Self {
        Self {
            kind: RegionKind::AnonymousMemory,
            repr: HandleRepr::MemFd(fd),
            size: config.size,
            name: config.name.clone(),
        }
    }

    #[cfg(target_os = "android")]
    pub(crate) fn from_hardware_buffer(
        buffer: super::hardware::HardwareBuffer,
        config: &RegionConfig,
    ) -> Self {
        Self {
            kind: RegionKind::PlatformBuffer,
            repr: HandleRepr::HardwareBuffer(buffer),
            size: config.size,
            name: config.name.clone(),
        }
    }

    /// Get the backend kind
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Get the region size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the diagnostic name of the region
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the transfer descriptor of an anonymous-memory handle.
    ///
    /// Platform buffer handles have no stable descriptor; their transfer
    /// representation is produced by the platform transfer primitive.
    pub fn raw_fd(&self) -> Option<RawFd> {
        match &self.repr {
            HandleRepr::MemFd(fd) => Some(fd.as_raw_fd()),
            #[cfg(target_os = "android")]
            HandleRepr::HardwareBuffer(_) => None,
        }
    }

    #[cfg(target_os = "android")]
    pub(crate) fn hardware_buffer(&self) -> Option<&super::hardware::HardwareBuffer> {
        match &self.repr {
            HandleRepr::MemFd(_) => None,
            HandleRepr::HardwareBuffer(buffer) => Some(buffer),
        }
    }

    /// Map the whole region into the caller's address space
    pub fn map(&self, access: Access) -> Result<MappedView> {
        self.map_len(access, self.size)
    }

    /// Map the first `len` bytes of the region.
    ///
    /// Requesting more bytes than the kernel object holds fails with a
    /// mapping error rather than truncating; a view must never extend
    /// past the region it aliases.
    pub fn map_len(&self, access: Access, len: usize) -> Result<MappedView> {
        if len == 0 {
            return Err(MemlinkError::mapping("Cannot map zero bytes"));
        }

        match &self.repr {
            HandleRepr::MemFd(fd) => {
                let stat = fstat(fd.as_raw_fd()).map_err(|e| {
                    MemlinkError::mapping(format!("Failed to stat region descriptor: {}", e))
                })?;
                let actual = stat.st_size as u64;
                if len as u64 > actual {
                    return Err(MemlinkError::mapping(format!(
                        "Requested {} bytes but region '{}' holds only {}",
                        len, self.name, actual
                    )));
                }

                let mapping = match access {
                    Access::ReadOnly => {
                        // SAFETY: the descriptor refers to shared memory;
                        // aliasing across processes is the intended use.
                        let map = unsafe { MmapOptions::new().len(len).map(fd) }.map_err(|e| {
                            MemlinkError::mapping(format!("Failed to map region: {}", e))
                        })?;
                        Mapping::ReadOnly(map)
                    }
                    Access::ReadWrite => {
                        // SAFETY: as above; writes go straight to the shared object.
                        let map =
                            unsafe { MmapOptions::new().len(len).map_mut(fd) }.map_err(|e| {
                                MemlinkError::mapping(format!("Failed to map region: {}", e))
                            })?;
                        Mapping::ReadWrite(map)
                    }
                };

                debug!("mapped {} bytes of region '{}' ({:?})", len, self.name, access);
                Ok(MappedView::new(mapping, len, access))
            }
            #[cfg(target_os = "android")]
            HandleRepr::HardwareBuffer(buffer) => {
                if len > self.size {
                    return Err(MemlinkError::mapping(format!(
                        "Requested {} bytes but region '{}' holds only {}",
                        len, self.name, self.size
                    )));
                }
                let locked = buffer.lock(access, len)?;
                debug!("locked {} bytes of region '{}' ({:?})", len, self.name, access);
                Ok(MappedView::new(Mapping::Locked(locked), len, access))
            }
        }
    }
}
