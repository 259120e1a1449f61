//! Query engine: address string in, ownership answer out.

use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;

use crate::error::QueryError;
use crate::provider::Structure;
use crate::store::HotStore;

/// Successful lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// The address exactly as queried
    pub ip: String,
    /// Origin AS number; absent when unknown or zero
    #[serde(rename = "autonomous_system_number", skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    /// Organization name, possibly empty
    #[serde(rename = "autonomous_system_organization")]
    pub organization: String,
}

/// Resolves addresses against whatever structure the store currently holds.
pub struct QueryEngine<S> {
    store: Arc<HotStore<S>>,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Structure> QueryEngine<S> {
    /// Create an engine reading from `store`.
    pub fn new(store: Arc<HotStore<S>>) -> Self {
        Self { store }
    }

    /// The store this engine reads from.
    pub fn store(&self) -> &Arc<HotStore<S>> {
        &self.store
    }

    /// Look up the network owner of `raw`.
    ///
    /// The address is parsed before the store is consulted, so malformed
    /// input is [`QueryError::InvalidAddress`] whether or not a database is
    /// loaded, and only a well-formed address can be [`QueryError::NotReady`].
    /// A well-formed address with no covering network reports
    /// [`QueryError::Lookup`], the same as a failing lookup.
    pub fn query(&self, raw: &str) -> Result<Answer, QueryError> {
        let ip: IpAddr = raw.parse().map_err(|_| QueryError::InvalidAddress)?;

        // One handle for the whole query, even if a swap lands meanwhile
        let structure = self.store.get().ok_or(QueryError::NotReady)?;

        let record = match structure.lookup(ip) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(QueryError::Lookup),
            Err(e) => {
                log::debug!("Lookup of {} failed: {}", ip, e);
                return Err(QueryError::Lookup);
            }
        };

        Ok(Answer {
            ip: raw.to_string(),
            asn: record.number.filter(|n| *n != 0),
            organization: record.organization.unwrap_or_default(),
        })
    }
}
