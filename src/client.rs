//! Region client: connect once, receive one handle, map it

use crate::channel::HandleReceiver;
use crate::error::Result;
use crate::region::{Access, MappedView, RegionConfig, RegionHandle};

/// A received handle together with its local mapping.
///
/// The handle and the view have independent lifetimes: dropping the
/// handle closes this process's descriptor reference, while the mapping
/// keeps the kernel object alive until the view is dropped too.
#[derive(Debug)]
pub struct AcquiredRegion {
    /// Duplicate handle to the server's region
    pub handle: RegionHandle,
    /// Local mapping of that handle
    pub view: MappedView,
}

/// Client side of the handoff: performs exactly one connect/receive/map
/// sequence per call to [`acquire`](RegionClient::acquire).
#[derive(Debug, Clone)]
pub struct RegionClient {
    config: RegionConfig,
    address: String,
}

impl RegionClient {
    /// Create a client for the given out-of-band region agreement
    pub fn new(config: RegionConfig, address: impl Into<String>) -> Self {
        Self {
            config,
            address: address.into(),
        }
    }

    /// Connect, receive one handle, and map it with the requested access.
    ///
    /// Reconnecting for a fresh handle is a distinct call.
    pub fn acquire(&self, access: Access) -> Result<AcquiredRegion> {
        let receiver = HandleReceiver::connect(&self.address)?;
        let handle = receiver.receive(&self.config)?;
        let view = handle.map(access)?;
        Ok(AcquiredRegion { handle, view })
    }
}
