//! # Memlink - Cross-Process Shared Memory Handoff
//!
//! Memlink hands a live kernel handle for a shared memory region from one
//! process to others over an abstract-namespace unix domain socket. The
//! handle - not any data - is the payload; once each recipient maps the
//! handle locally, the region's bytes are mutually visible memory and no
//! further socket traffic is required.
//!
//! ## Features
//!
//! - **Dual backends**: anonymous memory descriptors (memfd) and opaque
//!   platform buffer objects (Android hardware buffers)
//! - **Ancillary-message transfer**: one descriptor per connection via
//!   `SCM_RIGHTS`, framed as a 1-byte sentinel plus one control segment
//! - **Abstract-namespace addressing**: no filesystem presence, no cleanup
//! - **Typed failures**: allocation, connection, framing and mapping errors
//!   are surfaced to the caller instead of terminating the process
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────── server process ─────────────┐  ┌──────── client process ────────┐
//! │  RegionHandle ──► HandleSender         │  │  HandleReceiver ──► MappedView │
//! │  (memfd /         (accept loop,        │  │  (connect once,     (mmap or   │
//! │   hw buffer)       one fd per client)  │  │   receive one fd)    lock)     │
//! └──────────────────┬─────────────────────┘  └─────────▲──────────────────────┘
//!                    │    abstract unix domain socket   │
//!                    └──────── SCM_RIGHTS ──────────────┘
//! ```
//!
//! After the handoff both processes address the same kernel object through
//! their own mappings. The protocol supplies no multi-writer coordination:
//! concurrent writers race, and callers needing ordered access must layer
//! their own synchronization inside the region.

// Core modules
pub mod channel;
pub mod client;
pub mod error;
pub mod region;
pub mod server;

// Main API re-exports
pub use channel::{HandleReceiver, HandleSender};
pub use client::{AcquiredRegion, RegionClient};
pub use error::{MemlinkError, Result};
pub use region::{Access, MappedView, RegionConfig, RegionHandle, RegionKind};
pub use server::RegionServer;
