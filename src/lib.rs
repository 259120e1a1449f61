//! geoasn - DN42 IP-to-ASN lookup service.
//!
//! Answers "which autonomous system owns this address?" from an MMDB ASN
//! database that is refreshed in the background and swapped in without
//! interrupting queries.
//!
//! # Features
//!
//! - **Hot swap**: a new database replaces the old one atomically; lookups
//!   already running finish on the structure they started with
//! - **Safe refresh**: downloads land on a staging path and are validated
//!   before anything that is serving is touched
//! - **HTTP API**: JSON or text answers for `/` (caller's address) and `/q`
//! - **Offline builder**: turn a DN42 registry checkout into an MMDB file
//!
//! # Quick Start
//!
//! ```ignore
//! use geoasn::{HotStore, MmdbProvider, QueryEngine, RefreshScheduler, HttpFetcher};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(HotStore::new());
//! let scheduler = Arc::new(RefreshScheduler::new(
//!     geoasn::config::PRIMARY_URL,
//!     Path::new("./GeoLite2-ASN-DN42.mmdb"),
//!     Arc::clone(&store),
//!     MmdbProvider,
//!     HttpFetcher::new(),
//! ));
//!
//! // Load the local copy or download one
//! scheduler.bootstrap(3, std::time::Duration::from_secs(5))?;
//! let refresh = Arc::clone(&scheduler).spawn()?;
//!
//! let engine = QueryEngine::new(store);
//! let answer = engine.query("172.20.0.53")?;
//! println!("AS{:?} {}", answer.asn, answer.organization);
//!
//! refresh.stop();
//! ```
//!
//! # Query errors
//!
//! | Code             | Meaning                                         |
//! |------------------|-------------------------------------------------|
//! | `db_not_ready`   | no database installed yet                       |
//! | `invalid_ip`     | input is not an IPv4/IPv6 address               |
//! | `internal_error` | lookup failed or no network covers the address  |
//! | `missing_ip`     | `/q` without an address (HTTP only)             |

mod error;
mod fetch;
mod metadata;
mod provider;
mod query;
mod refresh;
mod store;

pub mod builder;
pub mod config;
pub mod converter;
pub mod server;

#[cfg(test)]
mod test_support;

// Re-export core types
pub use error::{Error, QueryError, Result};
pub use provider::{AsnRecord, MmdbDatabase, MmdbProvider, Structure, StructureProvider};
pub use store::HotStore;

// Re-export query and refresh
pub use fetch::{Fetch, HttpFetcher};
pub use query::{Answer, QueryEngine};
pub use refresh::{
    CycleOutcome, RefreshHandle, RefreshScheduler, RefreshState, StopSignal, BOOTSTRAP_ATTEMPTS,
    BOOTSTRAP_BACKOFF, REFRESH_INTERVAL,
};

// Re-export metadata
pub use metadata::{file_sha256, UpdateMetadata};
