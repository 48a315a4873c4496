//! Integration tests for descriptor channel framing

use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;

use memlink::channel::framing;
use memlink::{Access, HandleReceiver, MemlinkError, RegionConfig, RegionHandle};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_roundtrip_over_socketpair() {
        let (a, b) = UnixStream::pair().unwrap();

        let handle = RegionHandle::allocate(RegionConfig::new("framing", 8)).unwrap();
        let fd = handle.raw_fd().unwrap();

        framing::send_fd(a.as_raw_fd(), fd).unwrap();
        let received = framing::recv_fd(b.as_raw_fd()).unwrap();

        // Sending duplicates: the sender's descriptor must still be open.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert_ne!(flags, -1, "sender descriptor unexpectedly closed");

        // The duplicate aliases the same kernel object.
        let mut writer = handle.map(Access::ReadWrite).unwrap();
        writer.write_u64(77).unwrap();

        let map = unsafe { memmap2::MmapOptions::new().len(8).map(&received) }.unwrap();
        let mut slot = [0u8; 8];
        slot.copy_from_slice(&map[..8]);
        assert_eq!(u64::from_ne_bytes(slot), 77);
    }

    #[test]
    fn test_payload_without_control_segment_rejected() {
        let (mut a, b) = UnixStream::pair().unwrap();
        a.write_all(&[0u8]).unwrap();

        let err = framing::recv_fd(b.as_raw_fd()).unwrap_err();
        assert!(matches!(err, MemlinkError::MalformedMessage { .. }));
    }

    #[test]
    fn test_two_descriptors_in_one_message_rejected() {
        use nix::sys::socket::{sendmsg, ControlMessage, MsgFlags, UnixAddr};
        use std::io::IoSlice;

        let (a, b) = UnixStream::pair().unwrap();
        let handle = RegionHandle::allocate(RegionConfig::new("two_fds", 8)).unwrap();
        let fd = handle.raw_fd().unwrap();

        let fds = [fd, fd];
        let iov = [IoSlice::new(&[0u8])];
        let cmsg = [ControlMessage::ScmRights(&fds)];
        sendmsg::<UnixAddr>(a.as_raw_fd(), &iov, &cmsg, MsgFlags::empty(), None).unwrap();

        let err = framing::recv_fd(b.as_raw_fd()).unwrap_err();
        assert!(matches!(err, MemlinkError::MalformedMessage { .. }));
    }

    #[test]
    fn test_peer_close_is_receive_error() {
        let (a, b) = UnixStream::pair().unwrap();
        drop(a);

        let err = framing::recv_fd(b.as_raw_fd()).unwrap_err();
        assert!(matches!(err, MemlinkError::Receive { .. }));
    }

    #[test]
    fn test_connect_without_listener_fails() {
        let address = format!("memlink-test-nobody-home-{}", std::process::id());
        let err = HandleReceiver::connect(&address).unwrap_err();
        assert!(matches!(err, MemlinkError::Connect { .. }));
    }
}
