//! Loading and querying ASN lookup structures.
//!
//! A structure is immutable once opened. It is shared as an `Arc` between the
//! [`HotStore`](crate::HotStore) and in-flight queries, and released when the
//! last handle drops.

use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::net::IpAddr;
use std::path::Path;

use crate::error::{Error, Result};

/// Ownership record for the network covering an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsnRecord {
    /// Autonomous system number, if recorded
    pub number: Option<u32>,
    /// Organization name, if recorded
    pub organization: Option<String>,
}

/// A loaded longest-prefix lookup table.
pub trait Structure: Send + Sync + 'static {
    /// Look up the most specific network covering `ip`.
    ///
    /// `Ok(None)` means no network covers the address.
    fn lookup(&self, ip: IpAddr) -> Result<Option<AsnRecord>>;
}

/// Opens structures from local files.
pub trait StructureProvider: Send + Sync + 'static {
    type Structure: Structure;

    /// Load the structure stored at `path`.
    fn open(&self, path: &Path) -> Result<Self::Structure>;
}

/// MMDB-backed ASN database.
///
/// The whole file is read into memory, so the path can be replaced or removed
/// once `open` returns.
pub struct MmdbDatabase {
    reader: Reader<Vec<u8>>,
}

impl MmdbDatabase {
    /// Open an MMDB file.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self { reader })
    }

    /// Parse an MMDB image already in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let reader = Reader::from_source(data)?;
        Ok(Self { reader })
    }

    /// `database_type` from the file metadata.
    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }

    /// Build time recorded in the file metadata (unix seconds).
    pub fn build_epoch(&self) -> u64 {
        self.reader.metadata.build_epoch
    }
}

impl Structure for MmdbDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<AsnRecord>> {
        match self.reader.lookup::<geoip2::Asn>(ip) {
            Ok(asn) => Ok(Some(AsnRecord {
                number: asn.autonomous_system_number,
                organization: asn.autonomous_system_organization.map(str::to_string),
            })),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }
}

/// Provider for [`MmdbDatabase`] files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MmdbProvider;

impl StructureProvider for MmdbProvider {
    type Structure = MmdbDatabase;

    fn open(&self, path: &Path) -> Result<MmdbDatabase> {
        MmdbDatabase::open(path)
    }
}
