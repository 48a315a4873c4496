//! SCM_RIGHTS framing for single-descriptor transfer.
//!
//! The wire message is exactly one I/O vector of one byte plus one
//! ancillary segment holding one descriptor. The sentinel byte is
//! required: ancillary data attached to a zero-length message is not
//! delivered on all kernels, so the payload is never empty. Its value
//! is unspecified and ignored.
//!
//! Receive-side validation is strict. A descriptor is an ordinary small
//! integer on the wire; reinterpreting a partial or over-long control
//! segment would silently alias an unrelated kernel object, so every
//! framing violation is fatal and any descriptors that did arrive are
//! closed before the error is returned.

use std::io;
use std::mem;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use log::debug;

use crate::error::{MemlinkError, Result};

/// Dummy payload carried alongside the control segment
const SENTINEL: u8 = 0;

/// Handles carried per message. The protocol fixes this at one; the
/// framing below is sized from it so the bound is changed in one place.
pub const MAX_HANDLES_PER_MESSAGE: usize = 1;

fn handles_size() -> u32 {
    (mem::size_of::<RawFd>() * MAX_HANDLES_PER_MESSAGE) as u32
}

/// Send one descriptor over a connected stream socket.
///
/// The descriptor remains valid in the sender; the kernel installs an
/// independent duplicate in the receiver. Interrupted calls are retried;
/// any other failure is a send error.
pub fn send_fd(socket: RawFd, fd: RawFd) -> Result<()> {
    let mut payload = [SENTINEL];
    let mut iov = libc::iovec {
        iov_base: payload.as_mut_ptr().cast(),
        iov_len: payload.len(),
    };

    let cmsg_space = unsafe { libc::CMSG_SPACE(handles_size()) } as usize;
    let mut control = vec![0u8; cmsg_space];

    // SAFETY: a zeroed msghdr is valid before the pointer fields are set.
    let mut msghdr: libc::msghdr = unsafe { mem::zeroed() };
    msghdr.msg_iov = &mut iov;
    msghdr.msg_iovlen = 1;
    msghdr.msg_control = control.as_mut_ptr().cast();
    msghdr.msg_controllen = control.len() as _;

    // SAFETY: the control buffer holds space for exactly one header.
    unsafe {
        let cmsg = libc::CMSG_FIRSTHDR(&msghdr);
        (*cmsg).cmsg_level = libc::SOL_SOCKET;
        (*cmsg).cmsg_type = libc::SCM_RIGHTS;
        (*cmsg).cmsg_len = libc::CMSG_LEN(handles_size()) as _;
        ptr_write_fd(libc::CMSG_DATA(cmsg), fd);
    }

    loop {
        // SAFETY: msghdr points at live iov and control buffers.
        let rc = unsafe { libc::sendmsg(socket, &msghdr, 0) };
        if rc >= 0 {
            debug!("sent descriptor {} with 1-byte sentinel", fd);
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(MemlinkError::send(format!("sendmsg failed: {}", err)));
    }
}

/// Receive one descriptor from a connected stream socket.
///
/// Blocks until a message arrives. Returns the received descriptor as an
/// owned value; the caller is responsible for what it maps.
pub fn recv_fd(socket: RawFd) -> Result<OwnedFd> {
    let mut payload = [0u8; 1];
    let mut iov = libc::iovec {
        iov_base: payload.as_mut_ptr().cast(),
        iov_len: payload.len(),
    };

    let cmsg_space = unsafe { libc::CMSG_SPACE(handles_size()) } as usize;
    let mut control = vec![0u8; cmsg_space];

    // SAFETY: a zeroed msghdr is valid before the pointer fields are set.
    let mut msghdr: libc::msghdr = unsafe { mem::zeroed() };
    msghdr.msg_iov = &mut iov;
    msghdr.msg_iovlen = 1;
    msghdr.msg_control = control.as_mut_ptr().cast();
    msghdr.msg_controllen = control.len() as _;

    let received = loop {
        // SAFETY: msghdr points at live iov and control buffers.
        let rc = unsafe { libc::recvmsg(socket, &mut msghdr, 0) };
        if rc >= 0 {
            break rc as usize;
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(MemlinkError::receive(format!("recvmsg failed: {}", err)));
    };

    if received == 0 {
        return Err(MemlinkError::receive(
            "peer closed the channel before sending a handle",
        ));
    }
    if received != payload.len() {
        close_control_fds(&msghdr);
        return Err(MemlinkError::malformed(format!(
            "expected a 1-byte sentinel payload, got {} bytes",
            received
        )));
    }
    if msghdr.msg_flags & libc::MSG_CTRUNC != 0 {
        close_control_fds(&msghdr);
        return Err(MemlinkError::malformed("control segment was truncated"));
    }
    if msghdr.msg_controllen == 0 {
        return Err(MemlinkError::malformed(
            "no control segment accompanied the sentinel",
        ));
    }

    // SAFETY: msghdr describes the control buffer recvmsg just filled.
    let cmsg = unsafe { libc::CMSG_FIRSTHDR(&msghdr) };
    if cmsg.is_null() {
        return Err(MemlinkError::malformed("missing control message header"));
    }

    // SAFETY: cmsg is non-null and within the control buffer.
    let (level, ty, len) = unsafe { ((*cmsg).cmsg_level, (*cmsg).cmsg_type, (*cmsg).cmsg_len) };
    if level != libc::SOL_SOCKET || ty != libc::SCM_RIGHTS {
        close_control_fds(&msghdr);
        return Err(MemlinkError::malformed(format!(
            "unexpected control message level {} type {}",
            level, ty
        )));
    }

    let expected_len = unsafe { libc::CMSG_LEN(handles_size()) } as usize;
    if len as usize != expected_len {
        // More (or fewer) descriptors than the single-handle framing
        // allows; close whatever arrived and reject the message.
        close_control_fds(&msghdr);
        return Err(MemlinkError::malformed(format!(
            "control length {} does not match a single-descriptor message ({})",
            len, expected_len
        )));
    }

    // SAFETY: cmsg validated above; its data region holds one descriptor.
    let data = unsafe { libc::CMSG_DATA(cmsg) };
    if data.is_null() {
        return Err(MemlinkError::malformed("control data pointer is null"));
    }
    // SAFETY: data points at cmsg_len - CMSG_LEN(0) == sizeof(fd) bytes.
    let fd = unsafe { ptr_read_fd(data) };
    if fd < 0 {
        return Err(MemlinkError::malformed(format!(
            "received invalid descriptor value {}",
            fd
        )));
    }

    debug!("received descriptor {}", fd);
    // SAFETY: the descriptor came from SCM_RIGHTS and is owned by us now.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Close every descriptor delivered in the control buffer of a message
/// that failed validation.
fn close_control_fds(msghdr: &libc::msghdr) {
    // SAFETY: msghdr describes a control buffer recvmsg has filled; the
    // cmsg macros walk only within msg_controllen.
    unsafe {
        let base_len = libc::CMSG_LEN(0) as usize;
        let mut cmsg = libc::CMSG_FIRSTHDR(msghdr);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_RIGHTS {
                let data_len = ((*cmsg).cmsg_len as usize).saturating_sub(base_len);
                let count = data_len / mem::size_of::<RawFd>();
                let data = libc::CMSG_DATA(cmsg);
                for i in 0..count {
                    let fd = ptr_read_fd(data.add(i * mem::size_of::<RawFd>()));
                    if fd >= 0 {
                        libc::close(fd);
                    }
                }
            }
            cmsg = libc::CMSG_NXTHDR(msghdr, cmsg);
        }
    }
}

// cmsg data is only guaranteed byte-aligned.
unsafe fn ptr_write_fd(data: *mut libc::c_uchar, fd: RawFd) {
    std::ptr::write_unaligned(data.cast::<RawFd>(), fd);
}

unsafe fn ptr_read_fd(data: *const libc::c_uchar) -> RawFd {
    std::ptr::read_unaligned(data.cast::<RawFd>())
}
