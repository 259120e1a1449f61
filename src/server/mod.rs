//! HTTP front end.
//!
//! The accept loop hands requests to a fixed pool of worker threads over a
//! channel. [`ShutdownHandle::shutdown`] unblocks the accept loop; workers
//! finish the requests already queued and [`HttpServer::run`] returns.

mod handler;
mod response;

pub use handler::{
    client_address, handle, negotiate, render_answer, render_error, Format, Params, Reply,
    MISSING_IP,
};

use crossbeam::channel;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Request, Server};

use crate::config::DEFAULT_WORKERS;
use crate::error::{Error, Result};
use crate::provider::Structure;
use crate::query::QueryEngine;

/// Requests buffered per worker before the accept loop blocks.
const QUEUE_PER_WORKER: usize = 16;

/// Stops a running [`HttpServer`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<Server>);

impl ShutdownHandle {
    /// Stop accepting requests. Safe to call more than once.
    pub fn shutdown(&self) {
        self.0.unblock();
    }
}

/// A bound HTTP server answering lookups from a [`QueryEngine`].
pub struct HttpServer<S> {
    server: Arc<Server>,
    addr: SocketAddr,
    engine: QueryEngine<S>,
    workers: usize,
    trust_proxy: bool,
}

impl<S: Structure> HttpServer<S> {
    /// Bind to `addr`. Port 0 picks a free port; see [`addr`](Self::addr).
    pub fn bind(addr: SocketAddr, engine: QueryEngine<S>) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| Error::Config(format!("failed to bind {}: {}", addr, e)))?;
        let addr = server.server_addr().to_ip().unwrap_or(addr);

        Ok(Self {
            server: Arc::new(server),
            addr,
            engine,
            workers: DEFAULT_WORKERS,
            trust_proxy: true,
        })
    }

    /// Set the number of worker threads (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Whether `X-Forwarded-For` and `X-Real-IP` are honoured.
    pub fn with_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.server))
    }

    /// Serve until shut down, then wait for the workers to drain.
    pub fn run(self) -> Result<()> {
        let (tx, rx) = channel::bounded::<Request>(self.workers * QUEUE_PER_WORKER);

        let workers = (0..self.workers)
            .map(|index| {
                let rx = rx.clone();
                let engine = self.engine.clone();
                let trust_proxy = self.trust_proxy;
                thread::Builder::new()
                    .name(format!("geoasn-http-{}", index))
                    .spawn(move || {
                        for request in rx {
                            let reply = handle(&engine, &request, trust_proxy);
                            if let Err(e) = response::send(request, reply) {
                                log::debug!("Failed to send response: {}", e);
                            }
                        }
                    })
            })
            .collect::<std::io::Result<Vec<JoinHandle<()>>>>()?;
        drop(rx);

        log::info!("Listening on http://{}", self.addr);

        for request in self.server.incoming_requests() {
            if tx.send(request).is_err() {
                break;
            }
        }
        drop(tx);

        for worker in workers {
            if worker.join().is_err() {
                log::error!("HTTP worker panicked");
            }
        }
        log::info!("HTTP server stopped");
        Ok(())
    }
}
