//! Shared helpers for unit tests.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Response, Server};

use crate::builder::{MmdbWriter, SourceRecord};

/// Serve one canned `(status, body)` response per incoming request, in order.
pub fn serve(responses: Vec<(u16, Vec<u8>)>) -> (String, JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        for (status, body) in responses {
            let request = server.recv().unwrap();
            let response = Response::from_data(body).with_status_code(status);
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}"), handle)
}

/// Announce `length` bytes but close the connection after sending `body`.
pub fn serve_truncated(length: usize, body: &'static [u8]) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {length}\r\nConnection: close\r\n\r\n"
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(body);
    });
    (format!("http://{addr}"), handle)
}

/// Announce `length` bytes, then send one byte per `interval` until the
/// client goes away or the body is complete.
pub fn serve_slowly(length: usize, interval: Duration) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {length}\r\nConnection: close\r\n\r\n"
        );
        if stream.write_all(head.as_bytes()).is_err() {
            return;
        }
        for _ in 0..length {
            thread::sleep(interval);
            if stream.write_all(b"x").and_then(|_| stream.flush()).is_err() {
                return;
            }
        }
    });
    (format!("http://{addr}"), handle)
}

/// Build an MMDB image from `(cidr, asn, organization)` rows.
pub fn mmdb(rows: &[(&str, u32, &str)]) -> Vec<u8> {
    let mut writer = MmdbWriter::new();
    for (network, asn, org) in rows {
        writer.insert(&SourceRecord::new(network.parse().unwrap(), *asn, org));
    }
    writer.write().unwrap()
}

/// Counter shared between a test and the structures it creates.
#[derive(Clone, Default)]
pub struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
