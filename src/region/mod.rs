//! Shared memory region allocation, handles and mappings

pub mod config;
pub mod handle;
pub mod view;

#[cfg(target_os = "android")]
pub(crate) mod hardware;

pub use config::{Access, RegionConfig, RegionKind};
pub use handle::RegionHandle;
pub use view::{MappedView, SLOT_SIZE};
