//! # Connector Tests
//!
//! Two `RuntimeContext`s stand in for two processes: one owns the server
//! bus, the other connects as a client. Events cross the socket through the
//! converter registry in both directions.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossbeam_channel::{unbounded, Receiver};
    use sb_02_socket_transport::{ServerMode, SocketConfig, SocketOptions, TransportError};
    use sb_03_connectors::{ConnectorError, Event, EventHandler, HandlerError, InPushConnector};
    use sb_runtime::{RuntimeConfig, RuntimeContext};
    use shared_types::{EventId, ParticipantId, Scope};

    use crate::integration::support::{free_port, wait_until, QUIET, WAIT};

    fn config(port: u16, server_mode: ServerMode) -> RuntimeConfig {
        RuntimeConfig {
            socket: SocketConfig {
                options: SocketOptions::new("127.0.0.1", port, true),
                server_mode,
            },
        }
    }

    fn scope(s: &str) -> Scope {
        Scope::parse(s).unwrap()
    }

    /// Handler forwarding a rendering of each event.
    fn recorder() -> (Arc<dyn EventHandler>, Receiver<(String, String)>) {
        let (tx, rx) = unbounded();
        let handler: Arc<dyn EventHandler> = Arc::new(move |event: &Event| -> Result<(), HandlerError> {
            let data = event.data();
            let value = if let Some(v) = data.downcast_ref::<i32>() {
                format!("i32:{v}")
            } else if let Some(v) = data.downcast_ref::<String>() {
                format!("string:{v}")
            } else if let Some(v) = data.downcast_ref::<f64>() {
                format!("f64:{v}")
            } else if let Some(v) = data.downcast_ref::<bool>() {
                format!("bool:{v}")
            } else if let Some(v) = data.downcast_ref::<EventId>() {
                format!("event-id:{v}")
            } else if data.data_type().is_void() {
                "void".to_string()
            } else {
                format!("other:{}", data.data_type())
            };
            let _ = tx.send((event.scope().to_string(), value));
            Ok(())
        });
        (handler, rx)
    }

    fn listening(context: &RuntimeContext, on: &str) -> (InPushConnector, Receiver<(String, String)>) {
        let inbound = context.create_in_push_connector(scope(on)).unwrap();
        let (handler, seen) = recorder();
        inbound.add_handler(handler);
        inbound.activate().unwrap();
        (inbound, seen)
    }

    // =========================================================================
    // End to end
    // =========================================================================

    #[test]
    fn test_typed_events_cross_processes() {
        let port = free_port();
        let server_process = RuntimeContext::new(config(port, ServerMode::Server));
        let client_process = RuntimeContext::new(config(port, ServerMode::Client));

        let (inbound, seen) = listening(&server_process, "/robot/");
        let out = client_process.create_out_connector(scope("/robot/")).unwrap();
        out.activate().unwrap();

        let id = EventId::new(ParticipantId::random(), 41);
        out.push(Event::with_value(scope("/robot/arm/"), -12_i32)).unwrap();
        out.push(Event::with_value(scope("/robot/"), String::from("grüß dich"))).unwrap();
        out.push(Event::with_value(scope("/robot/"), 0.25_f64)).unwrap();
        out.push(Event::with_value(scope("/robot/"), true)).unwrap();
        out.push(Event::with_value(scope("/robot/"), id)).unwrap();
        out.push(Event::with_value(scope("/robot/"), ())).unwrap();

        let expected = [
            ("/robot/arm/", "i32:-12".to_string()),
            ("/robot/", "string:grüß dich".to_string()),
            ("/robot/", "f64:0.25".to_string()),
            ("/robot/", "bool:true".to_string()),
            ("/robot/", format!("event-id:{id}")),
            ("/robot/", "void".to_string()),
        ];
        for (want_scope, want_value) in expected {
            let (got_scope, got_value) = seen.recv_timeout(WAIT).unwrap();
            assert_eq!(got_scope, want_scope);
            assert_eq!(got_value, want_value);
        }

        out.deactivate().unwrap();
        inbound.deactivate().unwrap();
    }

    #[test]
    fn test_meta_data_and_causes_survive_the_wire() {
        let port = free_port();
        let server_process = RuntimeContext::new(config(port, ServerMode::Server));
        let client_process = RuntimeContext::new(config(port, ServerMode::Client));

        let inbound = client_process.create_in_push_connector(scope("/meta/")).unwrap();
        let (tx, rx) = unbounded();
        inbound.add_handler(Arc::new(move |event: &Event| -> Result<(), HandlerError> {
            let meta = event.meta_data();
            let _ = tx.send((
                event.event_id(),
                event.causes().to_vec(),
                event.method().map(str::to_string),
                meta.user_info("unit").map(str::to_string),
                meta.user_time("sampled"),
                (meta.create_time(), meta.send_time(), meta.receive_time(), meta.deliver_time()),
            ));
            Ok(())
        }));

        // server side first so the client can connect
        let out = server_process.create_out_connector(scope("/meta/")).unwrap();
        out.activate().unwrap();
        inbound.activate().unwrap();

        let cause = EventId::new(ParticipantId::random(), 2);
        let mut event = Event::with_value(scope("/meta/"), 3_i32)
            .with_method("REQUEST")
            .with_cause(cause);
        event.meta_data_mut().set_user_info("unit", "mm");
        event.meta_data_mut().set_user_time("sampled", 1_000);
        let sent = out.push(event).unwrap();

        let (id, causes, method, unit, sampled, (create, send, receive, deliver)) = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(id, sent.event_id());
        assert_eq!(causes, vec![cause]);
        assert_eq!(method.as_deref(), Some("REQUEST"));
        assert_eq!(unit.as_deref(), Some("mm"));
        assert_eq!(sampled, Some(1_000));
        assert_eq!(create, sent.meta_data().create_time());
        assert_eq!(send, sent.meta_data().send_time());
        assert!(receive >= send);
        assert!(deliver >= receive);

        inbound.deactivate().unwrap();
        out.deactivate().unwrap();
    }

    #[test]
    fn test_scope_filtering_across_processes() {
        let port = free_port();
        let server_process = RuntimeContext::new(config(port, ServerMode::Server));
        let client_process = RuntimeContext::new(config(port, ServerMode::Client));

        let out = server_process.create_out_connector(scope("/")).unwrap();
        out.activate().unwrap();
        let (left, seen_left) = listening(&client_process, "/sensors/left/");
        let (all, seen_all) = listening(&client_process, "/sensors/");

        out.push(Event::with_value(scope("/sensors/right/"), 1_i32)).unwrap();
        out.push(Event::with_value(scope("/sensors/left/"), 2_i32)).unwrap();
        out.push(Event::with_value(scope("/other/"), 3_i32)).unwrap();

        assert_eq!(seen_all.recv_timeout(WAIT).unwrap().1, "i32:1");
        assert_eq!(seen_all.recv_timeout(WAIT).unwrap().1, "i32:2");
        assert_eq!(seen_left.recv_timeout(WAIT).unwrap().1, "i32:2");
        assert!(seen_all.recv_timeout(QUIET).is_err());
        assert!(seen_left.recv_timeout(QUIET).is_err());

        left.deactivate().unwrap();
        all.deactivate().unwrap();
        out.deactivate().unwrap();
    }

    #[test]
    fn test_clients_reach_each_other_through_the_server() {
        let port = free_port();
        let server_process = RuntimeContext::new(config(port, ServerMode::Server));
        let hub = server_process.create_in_push_connector(scope("/chat/")).unwrap();
        hub.activate().unwrap();

        let alice = RuntimeContext::new(config(port, ServerMode::Client));
        let bob = RuntimeContext::new(config(port, ServerMode::Client));
        let (bob_in, seen_by_bob) = listening(&bob, "/chat/");
        let alice_out = alice.create_out_connector(scope("/chat/")).unwrap();
        alice_out.activate().unwrap();

        alice_out
            .push(Event::with_value(scope("/chat/"), String::from("hi bob")))
            .unwrap();
        assert_eq!(seen_by_bob.recv_timeout(WAIT).unwrap().1, "string:hi bob");

        alice_out.deactivate().unwrap();
        bob_in.deactivate().unwrap();
        hub.deactivate().unwrap();
        assert!(wait_until(WAIT, || server_process.socket_connector().server_buses().is_empty()));
    }

    #[test]
    fn test_push_fails_once_the_server_process_is_gone() {
        let port = free_port();
        let server_process = RuntimeContext::new(config(port, ServerMode::Server));
        let client_process = RuntimeContext::new(config(port, ServerMode::Auto));

        let (inbound, seen) = listening(&server_process, "/gone/");
        let out = client_process.create_out_connector(scope("/gone/")).unwrap();
        out.activate().unwrap();
        assert_eq!(client_process.socket_connector().client_buses().len(), 1);
        out.push(Event::with_value(scope("/gone/"), 1_i32)).unwrap();
        assert_eq!(seen.recv_timeout(WAIT).unwrap().1, "i32:1");

        inbound.deactivate().unwrap();
        assert!(wait_until(WAIT, || {
            matches!(
                out.push(Event::with_value(scope("/gone/"), 2_i32)),
                Err(ConnectorError::Transport(TransportError::NotActive))
            )
        }));

        // a new connector in the same process takes over the port
        let (successor, seen_by_successor) = listening(&client_process, "/gone/");
        assert_eq!(client_process.socket_connector().server_buses().len(), 1);
        assert!(client_process.socket_connector().client_buses().is_empty());
        let replacement = client_process.create_out_connector(scope("/gone/")).unwrap();
        replacement.activate().unwrap();
        replacement.push(Event::with_value(scope("/gone/"), 3_i32)).unwrap();
        assert_eq!(seen_by_successor.recv_timeout(WAIT).unwrap().1, "i32:3");

        out.deactivate().unwrap();
        replacement.deactivate().unwrap();
        successor.deactivate().unwrap();
        assert!(client_process.socket_connector().server_buses().is_empty());
    }

    #[test]
    fn test_auto_mode_contexts() {
        let port = free_port();
        let first = RuntimeContext::new(config(port, ServerMode::Auto));
        let second = RuntimeContext::new(config(port, ServerMode::Auto));

        let (inbound, seen) = listening(&first, "/auto/");
        let out = second.create_out_connector(scope("/auto/")).unwrap();
        out.activate().unwrap();
        assert_eq!(first.socket_connector().server_buses().len(), 1);
        assert_eq!(second.socket_connector().client_buses().len(), 1);

        out.push(Event::with_value(scope("/auto/"), 5_i32)).unwrap();
        assert_eq!(seen.recv_timeout(WAIT).unwrap().1, "i32:5");

        out.deactivate().unwrap();
        inbound.deactivate().unwrap();
    }
}
