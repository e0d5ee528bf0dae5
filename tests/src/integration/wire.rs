//! # Wire Protocol Tests
//!
//! Raw sockets on one side, a bus on the other, so every byte on the wire
//! is checked against the framing contract.

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{Shutdown, TcpListener, TcpStream};
    use std::thread;

    use prost::Message;
    use sb_02_socket_transport::{Bus, ClientBus, FramingError, ServerBus, SocketOptions, TransportError};
    use shared_types::Notification;

    use crate::integration::support::{collector, loopback, notification, wait_until, QUIET, WAIT};

    fn raw_connect(server: &ServerBus) -> TcpStream {
        let addr = server.local_addr().unwrap();
        let stream = TcpStream::connect(("127.0.0.1", addr.port())).unwrap();
        stream.set_read_timeout(Some(WAIT)).unwrap();
        stream
    }

    fn write_raw_frame(stream: &mut TcpStream, payload: &[u8]) {
        let len = i32::try_from(payload.len()).unwrap();
        stream.write_all(&len.to_le_bytes()).unwrap();
        stream.write_all(payload).unwrap();
    }

    fn read_raw_frame(stream: &mut TcpStream) -> Vec<u8> {
        let mut prefix = [0u8; 4];
        stream.read_exact(&mut prefix).unwrap();
        let mut payload = vec![0u8; i32::from_le_bytes(prefix) as usize];
        stream.read_exact(&mut payload).unwrap();
        payload
    }

    // =========================================================================
    // Handshake
    // =========================================================================

    #[test]
    fn test_server_sends_zero_handshake_first() {
        let server = ServerBus::new(loopback());
        server.activate().unwrap();

        let mut raw = raw_connect(&server);
        let mut token = [0xffu8; 4];
        raw.read_exact(&mut token).unwrap();
        assert_eq!(token, [0, 0, 0, 0]);
        assert!(wait_until(WAIT, || server.connection_count() == 1));

        server.deactivate().unwrap();
    }

    #[test]
    fn test_client_rejects_corrupted_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let fake_server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(&1_i32.to_le_bytes()).unwrap();
            // hold the socket open until the client gives up
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest);
        });

        let client = ClientBus::new(SocketOptions::new("127.0.0.1", port, true));
        let err = client.activate().unwrap_err();
        assert!(matches!(
            err,
            TransportError::Handshake(FramingError::HandshakeMismatch { expected: 0, actual: 1 })
        ));
        assert!(!client.is_active());
        fake_server.join().unwrap();
    }

    #[test]
    fn test_client_rejects_server_closing_before_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let fake_server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(&[0, 0]).unwrap();
            stream.shutdown(Shutdown::Both).unwrap();
        });

        let client = ClientBus::new(SocketOptions::new("127.0.0.1", port, true));
        assert!(matches!(
            client.activate(),
            Err(TransportError::Handshake(FramingError::Io(_)))
        ));
        fake_server.join().unwrap();
    }

    // =========================================================================
    // Frames
    // =========================================================================

    #[test]
    fn test_frames_from_raw_peer_are_delivered() {
        let server = ServerBus::new(loopback());
        server.activate().unwrap();
        let (receiver, seen) = collector();
        server.add_notification_receiver(receiver);

        let mut raw = raw_connect(&server);
        let mut token = [0u8; 4];
        raw.read_exact(&mut token).unwrap();

        // zero-length frame decodes to an empty envelope
        write_raw_frame(&mut raw, &[]);
        assert_eq!(seen.recv_timeout(WAIT).unwrap(), Notification::default());

        let sent = notification("/raw/", vec![1, 2, 3]);
        write_raw_frame(&mut raw, &sent.encode_to_vec());
        assert_eq!(seen.recv_timeout(WAIT).unwrap(), sent);

        server.deactivate().unwrap();
    }

    #[test]
    fn test_server_frames_are_little_endian_length_prefixed() {
        let server = ServerBus::new(loopback());
        server.activate().unwrap();

        let mut raw = raw_connect(&server);
        let mut token = [0u8; 4];
        raw.read_exact(&mut token).unwrap();
        assert!(wait_until(WAIT, || server.connection_count() == 1));

        let sent = notification("/out/", vec![9; 300]);
        server.handle_outgoing(&sent).unwrap();

        let payload = read_raw_frame(&mut raw);
        assert_eq!(payload, sent.encode_to_vec());
        assert_eq!(Notification::decode(payload.as_slice()).unwrap(), sent);

        server.deactivate().unwrap();
    }

    #[test]
    fn test_malformed_envelope_is_dropped_but_connection_kept() {
        let server = ServerBus::new(loopback());
        server.activate().unwrap();
        let (receiver, seen) = collector();
        server.add_notification_receiver(receiver);

        let mut raw = raw_connect(&server);
        let mut token = [0u8; 4];
        raw.read_exact(&mut token).unwrap();

        // field 6 declared as 100 bytes long, only 1 present
        write_raw_frame(&mut raw, &[0x32, 100, 0]);
        assert!(seen.recv_timeout(QUIET).is_err());
        assert_eq!(server.connection_count(), 1);

        let sent = notification("/after/", Vec::new());
        write_raw_frame(&mut raw, &sent.encode_to_vec());
        assert_eq!(seen.recv_timeout(WAIT).unwrap(), sent);

        server.deactivate().unwrap();
    }

    #[test]
    fn test_truncated_frame_drops_only_that_connection() {
        let server = ServerBus::new(loopback());
        server.activate().unwrap();

        let good = ClientBus::new(server.socket_options().clone());
        good.activate().unwrap();
        let (receiver, seen) = collector();
        good.add_notification_receiver(receiver);

        let mut raw = raw_connect(&server);
        let mut token = [0u8; 4];
        raw.read_exact(&mut token).unwrap();
        assert!(wait_until(WAIT, || server.connection_count() == 2));

        raw.write_all(&10_i32.to_le_bytes()).unwrap();
        raw.write_all(&[1, 2, 3]).unwrap();
        raw.shutdown(Shutdown::Both).unwrap();
        assert!(wait_until(WAIT, || server.connection_count() == 1));

        server.handle_outgoing(&notification("/still/", Vec::new())).unwrap();
        assert_eq!(seen.recv_timeout(WAIT).unwrap().scope, b"/still/");

        good.deactivate().unwrap();
        server.deactivate().unwrap();
    }
}
