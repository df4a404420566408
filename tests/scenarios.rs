//! Routing core behaviour, driven through a recording runtime.

use std::sync::{Arc, Mutex};

use programmable_proxy::{
    BackendId, BackendOptions, BackendRegistry, Command, CommandQueue, Connection,
    ConnectionState, ProcessingMode, RouterError, RoutingTarget,
};

fn registry() -> Arc<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    registry.register("api", BackendOptions::new("10.0.0.1", 8080));
    registry.register("web", BackendOptions::new("10.0.0.2", 80));
    Arc::new(registry)
}

#[test]
fn raw_mode_routes_named_backend() {
    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::raw(|ctx, _chunk| {
        ctx.route_to(BackendId::from("api"));
        Ok(())
    }));

    let mut runtime = CommandQueue::new();
    let state = conn.on_chunk(b"GET / HTTP/1.1\r\n\r\n", &mut runtime).unwrap();

    assert_eq!(state, ConnectionState::Relaying);
    assert_eq!(
        runtime.commands(),
        &[
            Command::SetupBackend {
                name: Some(BackendId::from("api")),
                options: BackendOptions::new("10.0.0.1", 8080),
            },
            Command::Forward(bytes::Bytes::from_static(b"GET / HTTP/1.1\r\n\r\n")),
        ]
    );
}

#[test]
fn header_mode_hook_sees_value_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::header("Host", move |ctx, value| {
        recorder.lock().unwrap().push(value.to_string());
        ctx.route_to(BackendId::from("web"));
        Ok(())
    }));

    let mut runtime = CommandQueue::new();
    let state = conn.on_chunk(b"GET / HTTP/1.1\r\n", &mut runtime).unwrap();
    assert!(!state.is_terminal());
    assert!(runtime.is_empty());

    let state = conn.on_chunk(b"Host: example.com\r\n\r\n", &mut runtime).unwrap();
    assert_eq!(state, ConnectionState::Relaying);
    assert_eq!(*seen.lock().unwrap(), vec!["example.com".to_string()]);

    // Further chunks never re-run the hook.
    conn.on_chunk(b"GET /again HTTP/1.1\r\nHost: other\r\n\r\n", &mut runtime).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn header_mode_without_gating_header_closes() {
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();

    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::header("Host", move |ctx, _| {
        *counter.lock().unwrap() += 1;
        ctx.route_to(BackendId::from("web"));
        Ok(())
    }));

    let mut runtime = CommandQueue::new();
    conn.on_chunk(b"GET / HTTP/1.1\r\n", &mut runtime).unwrap();
    let state = conn.on_chunk(b"Accept: */*\r\n\r\n", &mut runtime).unwrap();

    assert_eq!(state, ConnectionState::Closed);
    assert_eq!(runtime.commands(), &[Command::Close]);
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn unrouted_raw_chunk_closes() {
    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::raw(|_, _| Ok(())));

    let mut runtime = CommandQueue::new();
    let state = conn.on_chunk(b"GET / HTTP/1.1\r\n\r\n", &mut runtime).unwrap();

    assert_eq!(state, ConnectionState::Closed);
    assert_eq!(runtime.commands(), &[Command::Close]);
}

#[test]
fn headers_mode_inline_target_replays_early_body() {
    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::headers(|ctx, headers| {
        assert_eq!(headers.get("content-length"), Some("5"));
        ctx.route_to(("1.2.3.4", 80));
        Ok(())
    }));

    let request = b"POST /upload HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\nhello";
    let mut runtime = CommandQueue::new();
    let state = conn.on_chunk(request, &mut runtime).unwrap();

    assert_eq!(state, ConnectionState::Relaying);
    assert_eq!(
        runtime.commands()[0],
        Command::SetupBackend {
            name: None,
            options: BackendOptions::new("1.2.3.4", 80),
        }
    );
    assert_eq!(runtime.forwarded(), request.to_vec());
}

#[test]
fn hook_error_runs_fallback_once_and_closes() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorder = calls.clone();

    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::raw(|ctx, _| {
        ctx.route_to(BackendId::from("api"));
        Err("inspection exploded".into())
    }));
    conn.on_fallback(move |err, target| {
        recorder
            .lock()
            .unwrap()
            .push((err.to_string(), target.cloned()));
        Ok(())
    });

    let mut runtime = CommandQueue::new();
    let state = conn.on_chunk(b"GET /", &mut runtime).unwrap();

    assert_eq!(state, ConnectionState::Closed);
    assert_eq!(runtime.commands(), &[Command::Close]);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![(
            "hook failed: inspection exploded".to_string(),
            Some(RoutingTarget::named("api"))
        )]
    );

    // The connection is closed; later chunks do not reach hook or fallback.
    conn.on_chunk(b"more", &mut runtime).unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(runtime.commands().len(), 1);
}

#[test]
fn hook_error_without_fallback_propagates() {
    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::headers(|_, _| Err("no".into())));

    let mut runtime = CommandQueue::new();
    let err = conn
        .on_chunk(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n", &mut runtime)
        .unwrap_err();

    assert!(matches!(err, RouterError::Hook(_)));
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(runtime.is_empty());
}

#[test]
fn fallback_replaced_by_later_registration() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let first = calls.clone();
    let second = calls.clone();

    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::raw(|ctx, _| {
        ctx.route_to(BackendId::from("nowhere"));
        Ok(())
    }));
    conn.on_fallback(move |_, _| {
        first.lock().unwrap().push("first");
        Ok(())
    });
    conn.on_fallback(move |err, _| {
        assert!(matches!(err, RouterError::UnknownBackend(_)));
        second.lock().unwrap().push("second");
        Ok(())
    });

    let mut runtime = CommandQueue::new();
    conn.on_chunk(b"x", &mut runtime).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["second"]);
}

#[test]
fn last_route_before_arming_wins() {
    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::raw(|ctx, _| {
        ctx.route_to(BackendId::from("api"));
        ctx.route_to(("192.0.2.1", 9000));
        ctx.route_to(BackendId::from("web"));
        Ok(())
    }));

    let mut runtime = CommandQueue::new();
    conn.on_chunk(b"x", &mut runtime).unwrap();

    let setups: Vec<_> = runtime
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::SetupBackend { .. }))
        .collect();
    assert_eq!(
        setups,
        vec![&Command::SetupBackend {
            name: Some(BackendId::from("web")),
            options: BackendOptions::new("10.0.0.2", 80),
        }]
    );
}

#[test]
fn malformed_target_reaches_fallback() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let recorder = failures.clone();

    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::header("x-route", |ctx, value| {
        ctx.try_route_to(value)?;
        Ok(())
    }));
    conn.on_fallback(move |err, _| {
        recorder
            .lock()
            .unwrap()
            .push(matches!(err, RouterError::MalformedTarget(_)));
        Ok(())
    });

    let mut runtime = CommandQueue::new();
    let state = conn
        .on_chunk(b"GET / HTTP/1.1\r\nX-Route: not/valid\r\n\r\n", &mut runtime)
        .unwrap();
    assert_eq!(state, ConnectionState::Closed);
    assert_eq!(*failures.lock().unwrap(), vec![true]);
}

#[test]
fn every_connection_ends_relaying_or_closed() {
    let request: &[u8] = b"GET / HTTP/1.1\r\nHost: api\r\nX-Mode: route\r\n\r\nbody";

    let modes: [fn() -> ProcessingMode; 6] = [
        || ProcessingMode::raw(|ctx, _| {
            ctx.route_to(BackendId::from("api"));
            Ok(())
        }),
        || ProcessingMode::raw(|_, _| Ok(())),
        || ProcessingMode::headers(|ctx, h| {
            if h.get("x-mode") == Some("route") {
                ctx.route_to(BackendId::from("api"));
            }
            Ok(())
        }),
        || ProcessingMode::header("host", |ctx, v| {
            ctx.try_route_to(v)?;
            Ok(())
        }),
        || ProcessingMode::header("missing", |_, _| Ok(())),
        || ProcessingMode::headers(|ctx, _| {
            ctx.route_to(BackendId::from("unregistered"));
            Ok(())
        }),
    ];

    for (i, make_mode) in modes.iter().enumerate() {
        for split in [1, 7, 20, request.len()] {
            let mut conn = Connection::new(registry());
            conn.on_process(make_mode());
            conn.on_fallback(|_, _| Ok(()));

            let mut runtime = CommandQueue::new();
            for chunk in [&request[..split], &request[split..]] {
                if !chunk.is_empty() {
                    conn.on_chunk(chunk, &mut runtime).unwrap();
                }
            }
            conn.on_eof(&mut runtime);

            let armed = runtime
                .commands()
                .iter()
                .any(|c| matches!(c, Command::SetupBackend { .. }));
            match conn.state() {
                ConnectionState::Relaying => {
                    assert!(armed, "mode {i} split {split}: relaying without backend");
                    assert!(!runtime.close_requested(), "mode {i} split {split}: relaying and closed");
                }
                ConnectionState::Closed => {
                    assert!(!armed, "mode {i} split {split}: closed after arming");
                    assert!(runtime.close_requested(), "mode {i} split {split}: closed silently");
                }
                other => panic!("mode {i} split {split}: left in {other:?}"),
            }
        }
    }
}

#[test]
fn header_block_completes_only_with_terminator_chunk() {
    let request: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\nxyz";
    let terminator_end = request.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;

    // Chunk boundaries at every third byte.
    let chunks: Vec<&[u8]> = request.chunks(3).collect();
    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();

    let mut conn = Connection::new(registry());
    conn.on_process(ProcessingMode::headers(move |ctx, _| {
        *counter.lock().unwrap() += 1;
        ctx.route_to(BackendId::from("api"));
        Ok(())
    }));

    let mut runtime = CommandQueue::new();
    let mut fed = 0;
    for chunk in chunks {
        fed += chunk.len();
        conn.on_chunk(chunk, &mut runtime).unwrap();
        let completed = *calls.lock().unwrap() == 1;
        assert_eq!(completed, fed >= terminator_end, "after {fed} bytes");
        if completed {
            // Replayed bytes are exactly what was fed up to this point.
            assert_eq!(runtime.forwarded(), request[..fed].to_vec());
            break;
        }
    }
}

#[test]
fn registry_lookup_never_defaults() {
    let empty = BackendRegistry::new();
    assert!(matches!(
        empty.lookup(&BackendId::from("api")),
        Err(RouterError::UnknownBackend(_))
    ));

    let registry = registry();
    for id in ["", "API", "apis", "web2"] {
        assert!(matches!(
            registry.lookup(&BackendId::from(id)),
            Err(RouterError::UnknownBackend(_))
        ));
    }
}
