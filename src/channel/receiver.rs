//! Client role of the descriptor channel

use std::os::fd::{AsRawFd, OwnedFd};

use log::{debug, info};
use nix::sys::socket::{connect, socket, AddressFamily, SockFlag, SockType, UnixAddr};

use crate::error::{MemlinkError, Result};
use crate::region::{RegionConfig, RegionHandle, RegionKind};

use super::framing;

/// Receiving half of the descriptor channel.
///
/// State machine: Connecting, then Receiving, then a terminal state.
/// Each receiver performs exactly one connect/receive sequence; a fresh
/// handle requires a fresh receiver.
#[derive(Debug)]
pub struct HandleReceiver {
    stream: OwnedFd,
    address: String,
}

impl HandleReceiver {
    /// Connect to the abstract-namespace address of a listening sender.
    ///
    /// Fails with a connect error if no listener is present. Retry policy
    /// belongs to the caller; nothing is retried here.
    pub fn connect(address: &str) -> Result<Self> {
        let addr = UnixAddr::new_abstract(address.as_bytes()).map_err(|e| {
            MemlinkError::connect(format!("Invalid abstract address '{}': {}", address, e))
        })?;

        let stream = socket(
            AddressFamily::Unix,
            SockType::Stream,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(|e| MemlinkError::connect(format!("Failed to create socket: {}", e)))?;

        connect(stream.as_raw_fd(), &addr).map_err(|e| {
            MemlinkError::connect(format!("Failed to connect to '@{}': {}", address, e))
        })?;

        debug!("connected to abstract address '@{}'", address);
        Ok(Self {
            stream,
            address: address.to_string(),
        })
    }

    /// Block until the sender transfers one handle, then rebuild it.
    ///
    /// The wire carries only the handle; `config` supplies the size, kind
    /// and name both endpoints agreed on out-of-band. Consumes the
    /// connection: one handle per connection, by contract.
    pub fn receive(self, config: &RegionConfig) -> Result<RegionHandle> {
        config.validate()?;

        let handle = match config.kind {
            RegionKind::AnonymousMemory => {
                let fd = framing::recv_fd(self.stream.as_raw_fd())?;
                RegionHandle::from_memfd(fd, config)
            }
            RegionKind::PlatformBuffer => Self::receive_platform(&self.stream, config)?,
        };

        info!(
            "received one {} handle from '@{}'",
            config.kind.name(),
            self.address
        );
        Ok(handle)
    }

    #[cfg(target_os = "android")]
    fn receive_platform(stream: &OwnedFd, config: &RegionConfig) -> Result<RegionHandle> {
        let buffer =
            crate::region::hardware::HardwareBuffer::receive(stream.as_raw_fd(), config.size)?;
        Ok(RegionHandle::from_hardware_buffer(buffer, config))
    }

    #[cfg(not(target_os = "android"))]
    fn receive_platform(_stream: &OwnedFd, _config: &RegionConfig) -> Result<RegionHandle> {
        Err(MemlinkError::receive(
            "Platform-buffer transfer is not available on this platform",
        ))
    }
}
