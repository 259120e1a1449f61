//! Converters producing source records.

mod csv;
mod registry;

pub use csv::{parse_asn, CsvSource};
pub use registry::{parse_route_object, RegistryScan, RegistryScanner};
