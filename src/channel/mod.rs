//! Descriptor channel: unix domain socket transfer of region handles
//!
//! The channel carries no application data. Each accepted connection
//! moves exactly one kernel handle from sender to receiver inside an
//! ancillary message; everything else about the region (size, kind,
//! semantics) is agreed out-of-band.

pub mod framing;
pub mod receiver;
pub mod sender;

pub use receiver::HandleReceiver;
pub use sender::HandleSender;
