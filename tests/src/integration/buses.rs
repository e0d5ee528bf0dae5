//! # Bus Tests
//!
//! One server bus and several client buses in one process, talking over
//! loopback. Covers payload sizes, ordering, fan-out and peer failures.

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpStream;
    use std::sync::Arc;
    use std::thread;

    use sb_02_socket_transport::{
        Bus, ClientBus, NotificationReceiver, ReceiverError, ServerBus, SocketOptions,
    };
    use shared_types::Notification;

    use crate::integration::support::{collector, loopback, notification, wait_until, QUIET, WAIT};

    struct Topology {
        server: ServerBus,
        clients: Vec<ClientBus>,
    }

    impl Topology {
        fn new(clients: usize) -> Self {
            let options = loopback();
            let server = ServerBus::new(options.clone());
            server.activate().unwrap();
            let clients: Vec<_> = (0..clients)
                .map(|_| {
                    let client = ClientBus::new(options.clone());
                    client.activate().unwrap();
                    client
                })
                .collect();
            assert!(wait_until(WAIT, || server.connection_count() == clients.len()));
            Self { server, clients }
        }

        fn options(&self) -> &SocketOptions {
            self.server.socket_options()
        }

        fn shutdown(self) {
            for client in &self.clients {
                client.deactivate().unwrap();
            }
            self.server.deactivate().unwrap();
        }
    }

    // =========================================================================
    // Payloads
    // =========================================================================

    #[test]
    fn test_empty_and_multi_megabyte_payloads() {
        let topology = Topology::new(2);
        let (receiver, seen) = collector();
        topology.clients[1].add_notification_receiver(receiver);

        let empty = notification("/size/empty/", Vec::new());
        topology.clients[0].handle_outgoing(&empty).unwrap();
        assert_eq!(seen.recv_timeout(WAIT).unwrap(), empty);

        let data: Vec<u8> = (0..5 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let large = notification("/size/large/", data);
        topology.clients[0].handle_outgoing(&large).unwrap();
        assert_eq!(seen.recv_timeout(WAIT).unwrap(), large);

        topology.shutdown();
    }

    #[test]
    fn test_order_is_preserved_per_sender() {
        let topology = Topology::new(2);
        let (receiver, seen) = collector();
        topology.clients[1].add_notification_receiver(receiver);

        for i in 0..200_u32 {
            topology.clients[0]
                .handle_outgoing(&notification("/seq/", i.to_le_bytes().to_vec()))
                .unwrap();
        }
        for i in 0..200_u32 {
            assert_eq!(seen.recv_timeout(WAIT).unwrap().data, i.to_le_bytes().to_vec());
        }

        topology.shutdown();
    }

    #[test]
    fn test_concurrent_publishers_lose_nothing() {
        let topology = Arc::new(Topology::new(1));
        let (receiver, seen) = collector();
        topology.server.add_notification_receiver(receiver);

        let publishers: Vec<_> = (0..4)
            .map(|p| {
                let topology = Arc::clone(&topology);
                thread::spawn(move || {
                    for i in 0..50_u8 {
                        topology.clients[0]
                            .handle_outgoing(&notification("/par/", vec![p, i]))
                            .unwrap();
                    }
                })
            })
            .collect();
        for publisher in publishers {
            publisher.join().unwrap();
        }

        let mut received: Vec<Vec<u8>> = (0..200).map(|_| seen.recv_timeout(WAIT).unwrap().data).collect();
        received.sort();
        received.dedup();
        assert_eq!(received.len(), 200);

        match Arc::try_unwrap(topology) {
            Ok(topology) => topology.shutdown(),
            Err(_) => panic!("publisher threads still hold the topology"),
        }
    }

    // =========================================================================
    // Fan-out
    // =========================================================================

    #[test]
    fn test_server_fan_out_reaches_every_client_once() {
        let topology = Topology::new(3);
        let channels: Vec<_> = topology
            .clients
            .iter()
            .map(|client| {
                let (receiver, seen) = collector();
                client.add_notification_receiver(receiver);
                seen
            })
            .collect();

        topology.server.handle_outgoing(&notification("/all/", vec![7])).unwrap();
        for seen in &channels {
            assert_eq!(seen.recv_timeout(WAIT).unwrap().data, vec![7]);
            assert!(seen.recv_timeout(QUIET).is_err());
        }

        topology.shutdown();
    }

    #[test]
    fn test_failing_receiver_on_one_client_does_not_affect_others() {
        let topology = Topology::new(2);
        let refusing: Arc<dyn NotificationReceiver> =
            Arc::new(|_: &Notification| -> Result<(), ReceiverError> { Err("full".into()) });
        let (after_refusing, seen_after) = collector();
        topology.clients[0].add_notification_receiver(refusing);
        topology.clients[0].add_notification_receiver(after_refusing);
        let (other, seen_other) = collector();
        topology.clients[1].add_notification_receiver(other);

        topology.server.handle_outgoing(&notification("/a/", Vec::new())).unwrap();
        topology.server.handle_outgoing(&notification("/b/", Vec::new())).unwrap();

        for seen in [&seen_after, &seen_other] {
            assert_eq!(seen.recv_timeout(WAIT).unwrap().scope, b"/a/");
            assert_eq!(seen.recv_timeout(WAIT).unwrap().scope, b"/b/");
        }
        assert_eq!(topology.server.connection_count(), 2);

        topology.shutdown();
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn test_lost_peer_is_removed_and_others_keep_receiving() {
        let topology = Topology::new(2);
        let (receiver, seen) = collector();
        topology.clients[1].add_notification_receiver(receiver);

        let mut vanishing = TcpStream::connect(("127.0.0.1", topology.options().port())).unwrap();
        let mut token = [0u8; 4];
        vanishing.read_exact(&mut token).unwrap();
        assert!(wait_until(WAIT, || topology.server.connection_count() == 3));
        drop(vanishing);
        assert!(wait_until(WAIT, || topology.server.connection_count() == 2));

        topology.clients[0].handle_outgoing(&notification("/x/", vec![1])).unwrap();
        assert_eq!(seen.recv_timeout(WAIT).unwrap().data, vec![1]);

        topology.shutdown();
    }

    #[test]
    fn test_client_deactivation_is_seen_by_server() {
        let topology = Topology::new(2);
        topology.clients[0].deactivate().unwrap();
        assert!(wait_until(WAIT, || topology.server.connection_count() == 1));
        assert!(matches!(
            topology.clients[0].handle_outgoing(&notification("/x/", Vec::new())),
            Err(sb_02_socket_transport::TransportError::NotActive)
        ));

        topology.clients[1].deactivate().unwrap();
        topology.server.deactivate().unwrap();
    }

    #[test]
    fn test_server_restart_on_same_port() {
        let options = loopback();
        let first = ServerBus::new(options.clone());
        first.activate().unwrap();
        let client = ClientBus::new(options.clone());
        client.activate().unwrap();
        first.deactivate().unwrap();
        assert!(wait_until(WAIT, || !client.is_connected()));
        client.deactivate().unwrap();

        let second = ServerBus::new(options.clone());
        second.activate().unwrap();
        client.activate().unwrap();
        assert!(wait_until(WAIT, || second.connection_count() == 1));

        client.deactivate().unwrap();
        second.deactivate().unwrap();
    }
}
