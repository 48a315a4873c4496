//! Region server: one region, one handle per accepted connection

use log::info;

use crate::channel::HandleSender;
use crate::error::Result;
use crate::region::{Access, MappedView, RegionConfig, RegionHandle};

/// Listen backlog used by the original protocol
pub const DEFAULT_BACKLOG: usize = 8;

/// Owns the authoritative region handle and serves duplicates of it to
/// every client that connects.
///
/// Exactly one region is created per server instance; serving only
/// duplicates the handle, so there is no per-client cleanup and no bound
/// on the number of clients.
#[derive(Debug)]
pub struct RegionServer {
    handle: RegionHandle,
    sender: HandleSender,
}

impl RegionServer {
    /// Allocate the region and bind the listening socket
    pub fn bind(config: RegionConfig, address: &str) -> Result<Self> {
        let handle = RegionHandle::allocate(config)?;
        let sender = HandleSender::bind(address, DEFAULT_BACKLOG)?;
        Ok(Self { handle, sender })
    }

    /// Get the authoritative region handle
    pub fn handle(&self) -> &RegionHandle {
        &self.handle
    }

    /// Map the server's own view of the region
    pub fn map(&self, access: Access) -> Result<MappedView> {
        self.handle.map(access)
    }

    /// Accept one connection and send it one handle
    pub fn serve_one(&self) -> Result<()> {
        self.sender.accept_and_send(&self.handle)
    }

    /// Accept exactly `connections` connections, sending one handle each
    pub fn serve(&self, connections: usize) -> Result<()> {
        for _ in 0..connections {
            self.serve_one()?;
        }
        Ok(())
    }

    /// Serve handles forever.
    ///
    /// Returns only on error; whether that error ends the process is the
    /// caller's decision, not this crate's.
    pub fn run(&self) -> Result<()> {
        info!(
            "serving region '{}' on '@{}'",
            self.handle.name(),
            self.sender.address()
        );
        loop {
            self.serve_one()?;
        }
    }
}
