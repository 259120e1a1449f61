//! Offline MMDB builder.
//!
//! Turns [`SourceRecord`]s into a MaxMind DB file that the
//! [`MmdbProvider`](crate::MmdbProvider) can load. The output uses the
//! `GeoLite2-ASN` record layout:
//!
//! ```text
//! {
//!   "autonomous_system_number": uint32,        // omitted when 0
//!   "autonomous_system_organization": string,  // omitted when empty
//! }
//! ```

mod encode;
mod record;
pub mod writer;


pub use encode::Value;
pub use record::{SourceRecord, ASN_KEY, ORGANIZATION_KEY};
pub use writer::MmdbWriter;
