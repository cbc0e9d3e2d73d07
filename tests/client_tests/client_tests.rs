//! Client Tests
//!
//! These tests verify:
//! - Command execution and raw/coerced results
//! - The single reconnect-and-resend on transport failure
//! - That server errors and malformed replies are never resent
//! - Pipelines draining replies in lockstep
//! - End-to-end behavior against a local TCP server

#[path = "../common/mod.rs"]
mod common;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use barbershop::error::BarbershopError;
use barbershop::network::{ConnectionManager, Endpoint, Transport};
use barbershop::protocol::Command;
use barbershop::response::{rules, CoercionTable, Options, STANDARD_RULES};
use barbershop::{Barbershop, Config, InfoValue, Value};
use common::{ScriptedTransport, Session};

// =============================================================================
// Helper Functions
// =============================================================================

fn client(sessions: Vec<Session>) -> Barbershop<ScriptedTransport> {
    Barbershop::with_transport(ScriptedTransport::new(sessions))
}

fn replying(bytes: &[u8]) -> Barbershop<ScriptedTransport> {
    client(vec![Session::Reply(bytes.to_vec())])
}

/// Rules with UPDATE registered under the OK rule
fn update_ok_rules() -> Arc<CoercionTable> {
    let mut table = CoercionTable::standard();
    table.register("UPDATE", rules::equals_ok);
    Arc::new(table)
}

/// Serve one connection per entry; each connection answers one line per
/// scripted reply, then closes. Returns every request line received.
fn spawn_server(connections: Vec<Vec<&'static [u8]>>) -> (u16, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        for replies in connections {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            for reply in replies {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                received.push(line);
                writer.write_all(reply).unwrap();
                writer.flush().unwrap();
            }
        }
        received
    });

    (port, handle)
}

fn tcp_client(port: u16) -> Barbershop {
    Barbershop::new(
        Config::builder()
            .host("127.0.0.1")
            .port(port)
            .connect_timeout_ms(2000)
            .read_timeout_ms(2000)
            .write_timeout_ms(2000)
            .build(),
    )
}

// =============================================================================
// Execution Tests
// =============================================================================

#[test]
fn test_update_without_rule_returns_raw_ok() {
    let client = replying(b"+OK\r\n");

    let value = client.update(5001, 1).unwrap();

    assert_eq!(value, Value::Text("OK".to_string()));
    assert_eq!(client.connection().lock().sent, vec![b"UPDATE 5001 1\r\n".to_vec()]);
}

#[test]
fn test_update_with_ok_rule_returns_true() {
    let client = replying(b"+OK\r\n").with_rules(update_ok_rules());
    assert_eq!(client.update(5001, 1).unwrap(), Value::Bool(true));
}

#[test]
fn test_next_nil() {
    let client = replying(b"$-1\r\n");
    assert_eq!(client.next().unwrap(), Value::Nil);
}

#[test]
fn test_multi_bulk_of_integers() {
    let client = replying(b"*2\r\n:1\r\n:2\r\n");
    let value = client.format_inline(["SCAN"]).unwrap();
    assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn test_execute_pre_encoded_bytes() {
    let client = replying(b"+PONG\r\n");
    let value = client.execute("PING", b"PING\r\n", &Options::default()).unwrap();
    assert_eq!(value, Value::Bool(true));
}

#[test]
fn test_execute_with_options() {
    let client = replying(b"*2\r\n$1\r\na\r\n$1\r\n3\r\n");
    let cmd = Command::new("ZRANGE").arg("z").arg(0).arg(-1).arg("WITHSCORES");
    let value = client.execute_command(&cmd, &Options::withscores()).unwrap();
    assert_eq!(value, Value::Pairs(vec![("a".to_string(), 3.0)]));
}

#[test]
fn test_info_helper() {
    let client = replying(b"$21\r\nuptime:5\r\nversion:1\r\n\r\n");
    match client.info().unwrap() {
        Value::Info(fields) => assert_eq!(fields.len(), 2),
        other => panic!("Expected info, got {:?}", other),
    }
}

#[test]
fn test_info_reads_bare_body() {
    let client = replying(b"uptime:5\r\nversion:0.1\r\nupdates:3\r\nitems:2\r\npools:1\r\n+OK\r\n");

    match client.info().unwrap() {
        Value::Info(fields) => {
            assert_eq!(fields.len(), 5);
            assert_eq!(fields["uptime"], InfoValue::Int(5));
            assert_eq!(fields["version"], InfoValue::Text("0.1".to_string()));
            assert_eq!(fields["pools"], InfoValue::Int(1));
        }
        other => panic!("Expected info, got {:?}", other),
    }

    // The connection is still aligned for the next command
    assert_eq!(client.update(1, 1).unwrap(), Value::Text("OK".to_string()));
    assert_eq!(client.connection().lock().connects, 1);
}

#[test]
fn test_info_malformed_body_does_not_poison_connection() {
    let client = client(vec![
        Session::Reply(b"uptime:5\r\n???\r\nitems:2\r\npools:1\r\n".to_vec()),
        Session::Reply(b"+OK\r\n".to_vec()),
    ]);

    assert!(matches!(
        client.info().unwrap_err(),
        BarbershopError::InvalidResponse { .. }
    ));
    assert_eq!(client.update(1, 1).unwrap(), Value::Text("OK".to_string()));
    assert_eq!(client.connection().lock().connects, 2);
}

#[test]
fn test_info_retried_after_closed_socket() {
    let client = client(vec![
        Session::Reply(Vec::new()),
        Session::Reply(b"items:0\r\npools:1\r\n".to_vec()),
    ]);

    assert!(matches!(client.info().unwrap(), Value::Info(ref fields) if fields.len() == 2));
    assert_eq!(client.connection().lock().sent, vec![b"INFO\r\n".to_vec(); 2]);
}

#[test]
fn test_zero_reply_depth_is_clamped() {
    let client = replying(b"*1\r\n:1\r\n").with_max_reply_depth(0);
    let value = client.format_inline(["SCAN"]).unwrap();
    assert_eq!(value, Value::List(vec![Value::Int(1)]));
}

#[test]
fn test_ping_helper() {
    let client = client(vec![Session::Reply(b"+PONG\r\n+NOPE\r\n".to_vec())]);
    assert_eq!(client.ping().unwrap(), Value::Bool(true));
    assert_eq!(client.ping().unwrap(), Value::Bool(false));
}

#[test]
fn test_score_helper_encodes_item() {
    let client = replying(b"+-1\r\n");
    assert_eq!(client.score(42).unwrap(), Value::Text("-1".to_string()));
    assert_eq!(client.connection().lock().sent, vec![b"SCORE 42\r\n".to_vec()]);
}

#[test]
fn test_default_rules_are_shared() {
    let a = replying(b"");
    let b = replying(b"");
    assert!(std::ptr::eq(a.rules(), b.rules()));
    assert!(std::ptr::eq(a.rules(), &**STANDARD_RULES));
}

#[test]
fn test_endpoint_accessors() {
    let client = replying(b"");
    assert_eq!(client.host(), "scripted");
    assert_eq!(client.port(), 8002);
}

// =============================================================================
// Error Propagation Tests
// =============================================================================

#[test]
fn test_response_error_is_not_retried() {
    let client = client(vec![
        Session::Reply(b"-ERR no such key\r\n".to_vec()),
        Session::Reply(b"+OK\r\n".to_vec()),
    ]);

    let err = client.format_inline(["SCORE", "9"]).unwrap_err();

    match err {
        BarbershopError::Response { command, message } => {
            assert_eq!(command, "SCORE");
            assert_eq!(message, "no such key");
        }
        other => panic!("Expected response error, got {:?}", other),
    }
    let conn = client.connection().lock();
    assert_eq!(conn.connects, 1);
    assert_eq!(conn.sent.len(), 1);
}

#[test]
fn test_invalid_response_is_not_retried() {
    let client = client(vec![
        Session::Reply(b"?garbage\r\n".to_vec()),
        Session::Reply(b"+OK\r\n".to_vec()),
    ]);

    let err = client.peek().unwrap_err();

    assert!(matches!(err, BarbershopError::InvalidResponse { .. }));
    assert_eq!(client.connection().lock().sent.len(), 1);
    assert!(!client.connection().lock().is_connected());

    // The next command starts on a fresh connection
    assert_eq!(client.peek().unwrap(), Value::Text("OK".to_string()));
    assert_eq!(client.connection().lock().connects, 2);
}

#[test]
fn test_invalid_data_is_never_sent() {
    let client = replying(b"+OK\r\n");

    let err = client.format_inline(["SET", "k", "a\r\nFLUSHALL"]).unwrap_err();

    assert!(matches!(err, BarbershopError::InvalidData(_)));
    let conn = client.connection().lock();
    assert!(conn.sent.is_empty());
    assert_eq!(conn.connects, 0);
}

#[test]
fn test_coercion_failure_surfaces() {
    let client = replying(b"+many\r\n");
    let err = client.format_inline(["LLEN", "q"]).unwrap_err();
    assert!(matches!(err, BarbershopError::InvalidResponse { .. }));
}

// =============================================================================
// Retry Tests
// =============================================================================

#[test]
fn test_closed_socket_retried_once() {
    let client = client(vec![
        Session::Reply(Vec::new()),
        Session::Reply(b"+OK\r\n".to_vec()),
    ]);

    assert_eq!(client.update(5001, 1).unwrap(), Value::Text("OK".to_string()));

    let conn = client.connection().lock();
    assert_eq!(conn.connects, 2);
    assert_eq!(conn.sent, vec![b"UPDATE 5001 1\r\n".to_vec(); 2]);
}

#[test]
fn test_broken_pipe_retried_once() {
    let client = client(vec![Session::BrokenPipe, Session::Reply(b":7\r\n".to_vec())]);

    assert_eq!(client.format_inline(["LLEN", "q"]).unwrap(), Value::Int(7));
    assert_eq!(client.connection().lock().connects, 2);
}

#[test]
fn test_refused_connect_retried_once() {
    let client = client(vec![Session::Refuse, Session::Reply(b"+5001\r\n".to_vec())]);
    assert_eq!(client.next().unwrap(), Value::Text("5001".to_string()));
}

#[test]
fn test_second_failure_is_reported() {
    let client = client(vec![Session::Reply(Vec::new()), Session::Refuse]);

    let err = client.next().unwrap_err();

    // The first failure was "socket closed"; the caller sees the second
    match &err {
        BarbershopError::ConnectionFailure { errno, message, command, .. } => {
            assert_eq!(*errno, Some(111));
            assert_eq!(message, "Connection refused");
            assert_eq!(command.as_deref(), Some("NEXT"));
        }
        other => panic!("Expected connection failure, got {:?}", other),
    }
    assert!(err.to_string().contains("during NEXT"));
    assert_eq!(client.connection().lock().connects, 2);
}

#[test]
fn test_no_third_attempt() {
    let client = client(vec![
        Session::Reply(Vec::new()),
        Session::Reply(Vec::new()),
        Session::Reply(b"+OK\r\n".to_vec()),
    ]);

    assert!(client.peek().unwrap_err().is_connection_failure());
    assert_eq!(client.connection().lock().sent.len(), 2);
}

#[test]
fn test_retry_disconnects_before_resend() {
    // First session answers the first command only; the second command
    // finds the stream exhausted and must not reuse it
    let client = client(vec![
        Session::Reply(b"+OK\r\n".to_vec()),
        Session::Reply(b"+5001\r\n".to_vec()),
    ]);

    client.update(5001, 1).unwrap();
    assert_eq!(client.peek().unwrap(), Value::Text("5001".to_string()));

    let conn = client.connection().lock();
    assert_eq!(conn.connects, 2);
    assert!(conn.disconnects >= 1);
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[test]
fn test_pipeline_captures_errors_in_place() {
    let client = replying(b"+OK\r\n-ERR bad\r\n:3\r\n");

    let values = client
        .pipeline()
        .command(Command::new("SET").arg("a").arg(1))
        .command(Command::new("SCORE").arg(0))
        .command(Command::new("LLEN").arg("q"))
        .execute()
        .unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values[0], Value::Bool(true));
    match &values[1] {
        Value::Error(BarbershopError::Response { command, message }) => {
            assert_eq!(command, "SCORE");
            assert_eq!(message, "bad");
        }
        other => panic!("Expected captured error, got {:?}", other),
    }
    assert_eq!(values[2], Value::Int(3));

    let conn = client.connection().lock();
    assert_eq!(conn.sent, vec![b"SET a 1\r\nSCORE 0\r\nLLEN q\r\n".to_vec()]);
    assert_eq!(conn.remaining(), 0);
}

#[test]
fn test_pipeline_connection_failure_is_not_resent() {
    let client = client(vec![
        Session::Reply(b"+OK\r\n".to_vec()),
        Session::Reply(b"+OK\r\n+OK\r\n".to_vec()),
    ]);

    let err = client
        .pipeline()
        .command(Command::new("UPDATE").arg(1).arg(1))
        .command(Command::new("UPDATE").arg(2).arg(1))
        .execute()
        .unwrap_err();

    assert!(err.is_connection_failure());
    assert_eq!(client.connection().lock().connects, 1);
}

#[test]
fn test_pipeline_reports_original_connection_failure() {
    let client = replying(b"*4\r\n:1\r\n");

    let err = client
        .pipeline()
        .command(Command::new("LRANGE").arg("q").arg(0).arg(-1))
        .command(Command::new("PING"))
        .execute()
        .unwrap_err();

    match err {
        BarbershopError::ConnectionFailure { message, command, .. } => {
            assert_eq!(message, "socket closed on remote end");
            assert_eq!(command.as_deref(), Some("LRANGE"));
        }
        other => panic!("Expected connection failure, got {:?}", other),
    }
}

#[test]
fn test_pipeline_malformed_reply_aborts() {
    let client = replying(b"+OK\r\n?what\r\n:3\r\n");

    let err = client
        .pipeline()
        .command(Command::new("UPDATE").arg(1).arg(1))
        .command(Command::new("PEEK"))
        .command(Command::new("LLEN").arg("q"))
        .execute()
        .unwrap_err();

    assert!(matches!(err, BarbershopError::InvalidResponse { ref command, .. } if command == "PEEK"));
    assert!(!client.connection().lock().is_connected());
}

#[test]
fn test_empty_pipeline_sends_nothing() {
    let client = replying(b"");
    let pipeline = client.pipeline();
    assert!(pipeline.is_empty());
    assert!(pipeline.execute().unwrap().is_empty());
    assert!(client.connection().lock().sent.is_empty());
}

// =============================================================================
// TCP Tests
// =============================================================================

#[test]
fn test_tcp_update_next_peek() {
    let (port, server) = spawn_server(vec![vec![b"+OK\r\n", b"+5001\r\n", b"+-1\r\n"]]);
    let client = tcp_client(port);

    assert_eq!(client.update(5001, 1).unwrap(), Value::Text("OK".to_string()));
    assert_eq!(client.next().unwrap(), Value::Text("5001".to_string()));
    assert_eq!(client.peek().unwrap(), Value::Text("-1".to_string()));
    client.disconnect();

    assert_eq!(
        server.join().unwrap(),
        vec!["UPDATE 5001 1\r\n", "NEXT\r\n", "PEEK\r\n"]
    );
}

#[test]
fn test_tcp_reconnects_after_server_drop() {
    // First connection answers once and closes; the retry lands on the second
    let (port, server) = spawn_server(vec![vec![b"+OK\r\n"], vec![b"+5001\r\n"]]);
    let client = tcp_client(port);

    assert_eq!(client.update(5001, 1).unwrap(), Value::Text("OK".to_string()));
    assert_eq!(client.peek().unwrap(), Value::Text("5001".to_string()));
    client.disconnect();

    let received = server.join().unwrap();
    assert_eq!(received.last().map(String::as_str), Some("PEEK\r\n"));
}

#[test]
fn test_tcp_server_error() {
    let (port, server) = spawn_server(vec![vec![b"-ERROR INVALID SCORE\r\n"]]);
    let client = tcp_client(port);

    let err = client.update(5001, 0).unwrap_err();
    assert!(err.is_response_error());
    client.disconnect();
    server.join().unwrap();
}

#[test]
fn test_tcp_clients_from_manager_share_connection() {
    let (port, server) = spawn_server(vec![vec![b"+OK\r\n", b"+5001\r\n"]]);
    let manager = ConnectionManager::default();
    let endpoint = Endpoint::new("127.0.0.1", port);

    let a = Barbershop::from_manager(&manager, &endpoint);
    let b = Barbershop::from_manager(&manager, &endpoint);

    assert_eq!(a.update(5001, 1).unwrap(), Value::Text("OK".to_string()));
    // Same socket: the server only accepts one connection
    assert_eq!(b.next().unwrap(), Value::Text("5001".to_string()));
    assert!(Arc::ptr_eq(a.connection(), b.connection()));

    manager.disconnect_all();
    assert!(!a.connection().lock().is_connected());
    server.join().unwrap();
}
