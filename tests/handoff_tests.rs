//! End-to-end handoff tests: server, channel and client together

use std::thread;

use memlink::{Access, RegionClient, RegionConfig, RegionServer};

fn test_address(tag: &str) -> String {
    // Abstract names are global per network namespace; suffix with the
    // pid so concurrently running test binaries cannot collide.
    format!("memlink-test-{}-{}", tag, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_scenario_not_deadbeef() {
        // Server creates an 8-byte anonymous region named NOT_DEADBEEF,
        // binds the channel at ABSTRACT_NAMESPACE_NAME, writes 42, then
        // serves one connection. The client must observe 42 with no
        // further socket traffic.
        let config = RegionConfig::new("NOT_DEADBEEF", 8);
        let server = RegionServer::bind(config.clone(), "ABSTRACT_NAMESPACE_NAME").unwrap();

        let mut view = server.map(Access::ReadWrite).unwrap();
        view.write_u64(42).unwrap();

        thread::scope(|s| {
            let serving = s.spawn(|| server.serve(1));

            let client = RegionClient::new(config.clone(), "ABSTRACT_NAMESPACE_NAME");
            let acquired = client.acquire(Access::ReadOnly).unwrap();
            assert_eq!(acquired.view.read_u64().unwrap(), 42);

            serving.join().unwrap().unwrap();
        });
    }

    #[test]
    fn test_one_handle_per_connection() {
        let address = test_address("k-handles");
        let config = RegionConfig::new("k_handles", 8);
        let server = RegionServer::bind(config.clone(), &address).unwrap();

        let mut view = server.map(Access::ReadWrite).unwrap();
        view.write_u64(7).unwrap();

        thread::scope(|s| {
            let serving = s.spawn(|| server.serve(3));

            // Three sequential connections get three independently valid
            // handles, even though only one region was ever created.
            let client = RegionClient::new(config.clone(), address.as_str());
            for _ in 0..3 {
                let acquired = client.acquire(Access::ReadOnly).unwrap();
                assert_eq!(acquired.view.read_u64().unwrap(), 7);
            }

            serving.join().unwrap().unwrap();
        });
    }

    #[test]
    fn test_independent_handles_alias_one_region() {
        let address = test_address("aliasing");
        let config = RegionConfig::new("aliasing", 8);
        let server = RegionServer::bind(config.clone(), &address).unwrap();

        thread::scope(|s| {
            let serving = s.spawn(|| server.serve(2));

            let client = RegionClient::new(config.clone(), address.as_str());
            let mut first = client.acquire(Access::ReadWrite).unwrap();
            let second = client.acquire(Access::ReadOnly).unwrap();

            // A write through one transferred handle is visible through
            // the other, and through the server's own view.
            first.view.write_u64(0x5EED).unwrap();
            assert_eq!(second.view.read_u64().unwrap(), 0x5EED);

            let server_view = server.map(Access::ReadOnly).unwrap();
            assert_eq!(server_view.read_u64().unwrap(), 0x5EED);

            serving.join().unwrap().unwrap();
        });
    }

    #[test]
    fn test_client_writes_are_visible_to_later_clients() {
        let address = test_address("write-then-read");
        let config = RegionConfig::new("write_then_read", 8);
        let server = RegionServer::bind(config.clone(), &address).unwrap();

        thread::scope(|s| {
            let serving = s.spawn(|| server.serve(2));

            let client = RegionClient::new(config.clone(), address.as_str());
            let mut writer = client.acquire(Access::ReadWrite).unwrap();
            writer.view.write_u64(99).unwrap();
            drop(writer);

            // The region outlives the first client's handle and view; the
            // server still holds the authoritative reference.
            let reader = client.acquire(Access::ReadOnly).unwrap();
            assert_eq!(reader.view.read_u64().unwrap(), 99);

            serving.join().unwrap().unwrap();
        });
    }

    #[test]
    fn test_acquired_handle_supports_remapping() {
        let address = test_address("remap");
        let config = RegionConfig::new("remap", 8);
        let server = RegionServer::bind(config.clone(), &address).unwrap();

        let mut view = server.map(Access::ReadWrite).unwrap();
        view.write_u64(13).unwrap();

        thread::scope(|s| {
            let serving = s.spawn(|| server.serve(1));

            let client = RegionClient::new(config.clone(), address.as_str());
            let acquired = client.acquire(Access::ReadOnly).unwrap();

            // The client keeps the handle and can map further views
            // without touching the socket again.
            let remapped = acquired.handle.map(Access::ReadOnly).unwrap();
            assert_eq!(remapped.read_u64().unwrap(), 13);

            serving.join().unwrap().unwrap();
        });
    }
}
