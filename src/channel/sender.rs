//! Server role of the descriptor channel

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use log::{debug, info};
use nix::errno::Errno;
use nix::sys::socket::{
    accept4, bind, listen, socket, AddressFamily, Backlog, SockFlag, SockType, UnixAddr,
};

use crate::error::{MemlinkError, Result};
use crate::region::{RegionHandle, RegionKind};

use super::framing;

/// Sending half of the descriptor channel.
///
/// State machine: Listening, then Sending on each accepted connection,
/// then back to Listening, indefinitely. Errors are returned to the
/// caller; only the caller decides whether they end the process.
#[derive(Debug)]
pub struct HandleSender {
    listener: OwnedFd,
    address: String,
}

impl HandleSender {
    /// Bind to an abstract-namespace address and listen.
    ///
    /// The address has no filesystem presence; the kernel prefixes the
    /// name with a NUL byte, so two endpoints match by exact name within
    /// a network namespace.
    pub fn bind(address: &str, backlog: usize) -> Result<Self> {
        let addr = UnixAddr::new_abstract(address.as_bytes()).map_err(|e| {
            MemlinkError::connect(format!("Invalid abstract address '{}': {}", address, e))
        })?;

        let listener = socket(
            AddressFamily::Unix,
            SockType::Stream,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(|e| MemlinkError::connect(format!("Failed to create socket: {}", e)))?;

        bind(listener.as_raw_fd(), &addr).map_err(|e| {
            MemlinkError::connect(format!("Failed to bind to '@{}': {}", address, e))
        })?;

        let backlog = Backlog::new(backlog as i32)
            .map_err(|e| MemlinkError::invalid_parameter("backlog", e.to_string()))?;
        listen(&listener, backlog)
            .map_err(|e| MemlinkError::connect(format!("Failed to listen: {}", e)))?;

        info!("listening on abstract address '@{}'", address);
        Ok(Self {
            listener,
            address: address.to_string(),
        })
    }

    /// Block until a client connects, then send it one duplicate of the
    /// handle's transfer representation. The per-client socket closes
    /// after the transfer; the handle itself is never consumed.
    pub fn accept_and_send(&self, handle: &RegionHandle) -> Result<()> {
        let conn = self.accept()?;
        debug!("accepted a client on '@{}'", self.address);

        match handle.kind() {
            RegionKind::AnonymousMemory => {
                let fd = handle.raw_fd().ok_or_else(|| {
                    MemlinkError::send("Anonymous-memory handle has no descriptor")
                })?;
                framing::send_fd(conn.as_raw_fd(), fd)?;
            }
            RegionKind::PlatformBuffer => Self::send_platform(&conn, handle)?,
        }

        info!("sent one {} handle to client", handle.kind().name());
        Ok(())
    }

    /// Get the abstract address this sender is bound to
    pub fn address(&self) -> &str {
        &self.address
    }

    fn accept(&self) -> Result<OwnedFd> {
        loop {
            match accept4(self.listener.as_raw_fd(), SockFlag::SOCK_CLOEXEC) {
                // SAFETY: accept4 returned a fresh descriptor we now own.
                Ok(fd) => return Ok(unsafe { OwnedFd::from_raw_fd(fd) }),
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    return Err(MemlinkError::from_io(
                        std::io::Error::from(e),
                        "Failed to accept connection",
                    ))
                }
            }
        }
    }

    #[cfg(target_os = "android")]
    fn send_platform(conn: &OwnedFd, handle: &RegionHandle) -> Result<()> {
        let buffer = handle
            .hardware_buffer()
            .ok_or_else(|| MemlinkError::send("Platform-buffer handle has no buffer object"))?;
        buffer.send(conn.as_raw_fd())
    }

    #[cfg(not(target_os = "android"))]
    fn send_platform(_conn: &OwnedFd, _handle: &RegionHandle) -> Result<()> {
        Err(MemlinkError::send(
            "Platform-buffer transfer is not available on this platform",
        ))
    }
}
