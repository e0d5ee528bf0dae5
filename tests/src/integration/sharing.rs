//! # Bus Sharing Tests
//!
//! `SocketConnector` + `BusCache` + `RefCountingBus`: one bus per options,
//! reference counted, evicted on last release.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use sb_02_socket_transport::{
        Bus, BusCache, ServerMode, SocketConnector, TransportError,
    };

    use crate::integration::support::{collector, loopback, notification, wait_until, WAIT};

    #[test]
    fn test_refcount_eviction_and_third_deactivate() {
        let connector = SocketConnector::new();
        let options = loopback();

        let first = connector.acquire(&options, ServerMode::Server).unwrap();
        let second = connector.acquire(&options, ServerMode::Server).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        first.deactivate().unwrap();
        assert!(second.is_active());
        assert!(connector.server_buses().has_bus(&options));

        second.deactivate().unwrap();
        assert!(!second.is_active());
        assert!(!connector.server_buses().has_bus(&options));

        assert!(matches!(first.deactivate(), Err(TransportError::IllegalState(_))));

        // a fresh acquisition builds a new bus on the released port
        let third = connector.acquire(&options, ServerMode::Server).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(third.is_active());
        third.deactivate().unwrap();
    }

    #[test]
    fn test_auto_mode_pairs_server_and_client() {
        let options = loopback();
        let shared_server_cache = Arc::new(BusCache::new());
        let process_a = SocketConnector::with_caches(Arc::clone(&shared_server_cache), Arc::new(BusCache::new()));
        let process_b = SocketConnector::new();

        let a = process_a.acquire(&options, ServerMode::Auto).unwrap();
        let b = process_b.acquire(&options, ServerMode::Auto).unwrap();
        assert!(shared_server_cache.has_bus(&options));
        assert!(process_b.client_buses().has_bus(&options));

        let (receiver, seen) = collector();
        a.add_notification_receiver(receiver);
        b.handle_outgoing(&notification("/auto/", vec![1])).unwrap();
        assert_eq!(seen.recv_timeout(WAIT).unwrap().data, vec![1]);

        b.deactivate().unwrap();
        a.deactivate().unwrap();
        assert!(shared_server_cache.is_empty());
        assert!(process_b.client_buses().is_empty());
    }

    #[test]
    fn test_concurrent_acquire_creates_one_bus() {
        let connector = SocketConnector::new();
        let options = loopback();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let connector = connector.clone();
                let options = options.clone();
                thread::spawn(move || connector.acquire(&options, ServerMode::Server).unwrap())
            })
            .collect();
        let buses: Vec<Arc<dyn Bus>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for bus in &buses[1..] {
            assert!(Arc::ptr_eq(&buses[0], bus));
        }
        assert_eq!(connector.server_buses().len(), 1);

        for bus in &buses {
            bus.deactivate().unwrap();
        }
        assert!(connector.server_buses().is_empty());
    }

    #[test]
    fn test_client_bus_is_shared_and_released() {
        let options = loopback();
        let server_side = SocketConnector::new();
        let server = server_side.acquire(&options, ServerMode::Server).unwrap();

        let client_side = SocketConnector::new();
        let c1 = client_side.acquire(&options, ServerMode::Client).unwrap();
        let c2 = client_side.acquire(&options, ServerMode::Client).unwrap();
        assert!(Arc::ptr_eq(&c1, &c2));

        c1.deactivate().unwrap();
        c2.deactivate().unwrap();
        assert!(client_side.client_buses().is_empty());
        server.deactivate().unwrap();
    }

    #[test]
    fn test_failed_client_acquire_leaves_no_entry() {
        let connector = SocketConnector::new();
        let options = loopback();
        assert!(matches!(
            connector.acquire(&options, ServerMode::Client),
            Err(TransportError::Connect { .. })
        ));
        assert!(wait_until(WAIT, || connector.client_buses().is_empty()));
    }
}
