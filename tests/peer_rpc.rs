// Loopback RPC: a real server on 127.0.0.1, a real client dialed through
// discovery, framed requests over TCP.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cachemesh::{
    destroy_group, new_group, CacheError, Client, DirectDiscovery, Fetcher, Server,
};

const ADDR: &str = "127.0.0.1:53917";

fn wait_until_listening(addr: &str) {
    for _ in 0..100 {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("server on {addr} never came up");
}

#[test]
fn remote_get_round_trips_through_a_live_server() {
    let group = new_group("scores-rpc", 2 << 10, "lru", |key: &str| match key {
        "Tom" => Ok(b"630".to_vec()),
        _ => Err(CacheError::KeyNotFound(key.to_owned())),
    })
    .unwrap();

    let server = Server::new(ADDR).unwrap();
    let serving = {
        let server = server.clone();
        thread::spawn(move || server.start())
    };
    wait_until_listening(ADDR);
    assert!(server.is_running());

    let discovery = Arc::new(DirectDiscovery::default());
    let client = Client::new(format!("cache/{ADDR}"), discovery)
        .with_timeout(Duration::from_secs(2));

    // Hit: bytes come back.
    assert_eq!(client.fetch("scores-rpc", "Tom").unwrap(), b"630".to_vec());

    // Unknown key: the origin's error crosses the wire.
    let err = client.fetch("scores-rpc", "Jack").unwrap_err();
    assert!(err.to_string().contains("Jack"), "{err}");

    // Unknown group and empty key: application-level errors name the
    // offending identifier.
    let err = client.fetch("no-such-group", "Tom").unwrap_err();
    assert!(err.to_string().contains("no-such-group"), "{err}");
    let err = client.fetch("scores-rpc", "").unwrap_err();
    assert!(err.to_string().contains("key required"), "{err}");

    // A started server refuses to start twice.
    assert_eq!(server.start().unwrap_err(), CacheError::ServerAlreadyStarted);

    server.shutdown();
    assert!(serving.join().unwrap().is_ok());
    assert!(!server.is_running());

    // The group survives the server; it just has no peers now.
    assert_eq!(group.get("Tom").unwrap().to_string(), "630");
    destroy_group("scores-rpc");
}
