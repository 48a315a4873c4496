//! Integration tests for region allocation and mapping

use memlink::{Access, MemlinkError, RegionConfig, RegionHandle, RegionKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_config_defaults() {
        let config = RegionConfig::new("test", 4096);
        assert_eq!(config.name, "test");
        assert_eq!(config.size, 4096);
        assert_eq!(config.kind, RegionKind::AnonymousMemory);
    }

    #[test]
    fn test_region_config_builder() {
        let config = RegionConfig::new("test", 64).with_kind(RegionKind::PlatformBuffer);
        assert_eq!(config.kind, RegionKind::PlatformBuffer);
    }

    #[test]
    fn test_region_config_validation() {
        // Empty name should fail
        let config = RegionConfig::new("", 8);
        assert!(config.validate().is_err());

        // Zero size should fail
        let config = RegionConfig::new("test", 0);
        assert!(config.validate().is_err());

        // Interior NUL should fail
        let config = RegionConfig::new("te\0st", 8);
        assert!(config.validate().is_err());

        let config = RegionConfig::new("test", 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RegionKind::AnonymousMemory.name(), "anonymous-memory");
        assert_eq!(RegionKind::PlatformBuffer.name(), "platform-buffer");
        assert!(RegionKind::AnonymousMemory.is_supported());
    }

    #[test]
    fn test_allocate_anonymous_region() {
        let handle = RegionHandle::allocate(RegionConfig::new("alloc_test", 8)).unwrap();

        assert_eq!(handle.kind(), RegionKind::AnonymousMemory);
        assert_eq!(handle.size(), 8);
        assert_eq!(handle.name(), "alloc_test");
        assert!(handle.raw_fd().is_some());
    }

    #[test]
    fn test_slot_roundtrip_through_two_views() {
        let handle = RegionHandle::allocate(RegionConfig::new("roundtrip", 8)).unwrap();

        let mut writer = handle.map(Access::ReadWrite).unwrap();
        writer.write_u64(0xDEAD_BEEF_u64).unwrap();
        writer.unmap();

        // A second, independent mapping of the same handle aliases the
        // same kernel object; the value survives the writer's unmap
        // because the handle still references the backing object.
        let reader = handle.map(Access::ReadOnly).unwrap();
        assert_eq!(reader.read_u64().unwrap(), 0xDEAD_BEEF_u64);
    }

    #[test]
    fn test_map_more_than_region_size_fails() {
        let handle = RegionHandle::allocate(RegionConfig::new("oversize", 8)).unwrap();

        let err = handle.map_len(Access::ReadOnly, 4096).unwrap_err();
        assert!(matches!(err, MemlinkError::Mapping { .. }));
    }

    #[test]
    fn test_read_only_view_rejects_writes() {
        let handle = RegionHandle::allocate(RegionConfig::new("readonly", 8)).unwrap();

        let mut view = handle.map(Access::ReadOnly).unwrap();
        assert_eq!(view.access(), Access::ReadOnly);

        let err = view.write_u64(1).unwrap_err();
        assert!(matches!(err, MemlinkError::ReadOnly));
    }

    #[test]
    fn test_slot_needs_eight_bytes() {
        let handle = RegionHandle::allocate(RegionConfig::new("tiny", 4)).unwrap();

        let view = handle.map(Access::ReadOnly).unwrap();
        let err = view.read_u64().unwrap_err();
        assert!(matches!(err, MemlinkError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_view_accessors() {
        let handle = RegionHandle::allocate(RegionConfig::new("accessors", 16)).unwrap();

        let view = handle.map(Access::ReadOnly).unwrap();
        assert_eq!(view.len(), 16);
        assert!(!view.is_empty());
        assert_eq!(view.as_slice().len(), 16);
    }

    #[cfg(not(target_os = "android"))]
    #[test]
    fn test_platform_buffer_unsupported_off_android() {
        assert!(!RegionKind::PlatformBuffer.is_supported());

        let config = RegionConfig::new("hwbuf", 8).with_kind(RegionKind::PlatformBuffer);
        let err = RegionHandle::allocate(config).unwrap_err();
        assert!(matches!(err, MemlinkError::Allocation { .. }));
    }
}
