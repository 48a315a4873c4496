//! Configuration types for shared memory regions

use serde::{Deserialize, Serialize};

/// Backend used to allocate and transfer a shared region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionKind {
    /// Anonymous shared memory descriptor (memfd)
    AnonymousMemory,
    /// Opaque vendor buffer object with its own transfer primitive
    /// (Android hardware buffer)
    PlatformBuffer,
}

impl Default for RegionKind {
    fn default() -> Self {
        Self::AnonymousMemory
    }
}

impl RegionKind {
    /// Check if this backend is available on the current platform
    pub fn is_supported(&self) -> bool {
        match self {
            RegionKind::AnonymousMemory => true,
            RegionKind::PlatformBuffer => cfg!(target_os = "android"),
        }
    }

    /// Get a human-readable name for the backend
    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::AnonymousMemory => "anonymous-memory",
            RegionKind::PlatformBuffer => "platform-buffer",
        }
    }
}

/// Access requested when mapping a region into the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Configuration for allocating a region, or for receiving one.
///
/// The wire carries only the handle, so size and kind must agree
/// out-of-band between the two endpoints. The name is diagnostic only
/// (it shows up in `/proc/<pid>/fd` for memfd regions); the transferred
/// handle, not the name, identifies the object to the receiver.
#[derive(Debug, Clone)]
pub struct RegionConfig {
    /// Name of the shared memory region
    pub name: String,
    /// Total size of the region in bytes
    pub size: usize,
    /// Backend for the shared memory
    pub kind: RegionKind,
}

impl RegionConfig {
    /// Create a new region configuration
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            kind: RegionKind::default(),
        }
    }

    /// Set the backend kind
    pub fn with_kind(mut self, kind: RegionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        use crate::error::MemlinkError;

        if self.name.is_empty() {
            return Err(MemlinkError::invalid_parameter(
                "name",
                "Region name cannot be empty",
            ));
        }

        if self.name.contains('\0') {
            return Err(MemlinkError::invalid_parameter(
                "name",
                "Region name cannot contain NUL bytes",
            ));
        }

        if self.size == 0 {
            return Err(MemlinkError::invalid_parameter(
                "size",
                "Region size must be greater than 0",
            ));
        }

        Ok(())
    }
}
