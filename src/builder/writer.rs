//! MMDB file writer.
//!
//! Produces an IPv6 database with 24-bit records:
//!
//! ```text
//! +---------------------+
//! |    SEARCH TREE      |  node_count * 6 bytes
//! +---------------------+
//! |    16 zero bytes    |
//! +---------------------+
//! |    DATA SECTION     |  variable
//! +---------------------+
//! | \xAB\xCD\xEFMaxMind.com
//! |    METADATA MAP     |
//! +---------------------+
//! ```

use ahash::AHashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::encode::Value;
use super::record::SourceRecord;
use crate::error::{Error, Result};

/// Marker preceding the metadata map.
pub const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Bits per search tree record.
pub const RECORD_SIZE: u16 = 24;

/// Default `database_type` metadata value.
pub const DEFAULT_DATABASE_TYPE: &str = "GeoLite2-ASN";

/// Default English description.
pub const DEFAULT_DESCRIPTION: &str =
    "GeoLite2 ASN data for DN42. Learn more at https://github.com/rdp-studio/dn42-geoasn";

const DATA_SECTION_SEPARATOR: usize = 16;

/// First bits of `::ffff:0:0/96`, where IPv4-mapped addresses live.
const IPV4_MAPPED: u128 = 0xffff << 32;

/// Child pointer of a search tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
    Empty,
    Node(usize),
    Data(usize),
}

/// In-memory binary trie over 128-bit keys.
struct Tree {
    nodes: Vec<[Child; 2]>,
}

impl Tree {
    fn new() -> Self {
        Self {
            nodes: vec![[Child::Empty; 2]],
        }
    }

    fn push(&mut self, children: [Child; 2]) -> usize {
        self.nodes.push(children);
        self.nodes.len() - 1
    }

    /// Point the subtree for `bits/prefix_len` at `value`.
    ///
    /// Data met on the way is pushed down to both children so that shorter
    /// prefixes keep covering the addresses the new entry does not.
    fn insert(&mut self, bits: u128, prefix_len: u8, value: Child) {
        if prefix_len == 0 {
            self.nodes[0] = [value; 2];
            return;
        }

        let mut node = 0;
        for depth in 0..prefix_len - 1 {
            let bit = bit_at(bits, depth);
            node = match self.nodes[node][bit] {
                Child::Node(next) => next,
                other => {
                    let next = self.push([other; 2]);
                    self.nodes[node][bit] = Child::Node(next);
                    next
                }
            };
        }
        self.nodes[node][bit_at(bits, prefix_len - 1)] = value;
    }

    /// Child reached after following `depth` zero bits from the root.
    fn zero_path(&self, depth: u8) -> Option<Child> {
        let mut node = 0;
        for _ in 0..depth - 1 {
            match self.nodes[node][0] {
                Child::Node(next) => node = next,
                _ => return None,
            }
        }
        Some(self.nodes[node][0])
    }
}

fn bit_at(bits: u128, depth: u8) -> usize {
    ((bits >> (127 - depth as u32)) & 1) as usize
}

/// Builder for MMDB ASN databases.
///
/// Records may be inserted in any order. When networks overlap, the most
/// specific one wins; for identical networks the last insert wins.
pub struct MmdbWriter {
    records: Vec<SourceRecord>,
    database_type: String,
    description: String,
    build_epoch: Option<u64>,
}

impl MmdbWriter {
    /// Create a writer with the default metadata.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            database_type: DEFAULT_DATABASE_TYPE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            build_epoch: None,
        }
    }

    /// Set the `database_type` metadata value.
    pub fn with_database_type(mut self, database_type: &str) -> Self {
        self.database_type = database_type.to_string();
        self
    }

    /// Set the English description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Fix the build timestamp instead of using the current time.
    pub fn with_build_epoch(mut self, epoch: u64) -> Self {
        self.build_epoch = Some(epoch);
        self
    }

    /// Queue a record for the next [`write`](Self::write).
    pub fn insert(&mut self, record: &SourceRecord) {
        self.records.push(record.clone());
    }

    /// Queue many records.
    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a SourceRecord>) {
        self.records.extend(records.into_iter().cloned());
    }

    /// Number of queued records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is queued.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize all queued records into an MMDB image.
    pub fn write(&self) -> Result<Vec<u8>> {
        let (tree, data, offsets) = self.build();

        let node_count = tree.nodes.len();
        let resolve = |child: Child| -> usize {
            match child {
                Child::Empty => node_count,
                Child::Node(index) => index,
                Child::Data(index) => node_count + DATA_SECTION_SEPARATOR + offsets[index],
            }
        };

        let max_pointer = node_count + DATA_SECTION_SEPARATOR + data.len();
        if max_pointer >= 1 << RECORD_SIZE {
            return Err(Error::DatabaseTooLarge(max_pointer));
        }

        let mut out =
            Vec::with_capacity(node_count * 6 + DATA_SECTION_SEPARATOR + data.len() + 512);
        for [left, right] in &tree.nodes {
            out.extend_from_slice(&(resolve(*left) as u32).to_be_bytes()[1..]);
            out.extend_from_slice(&(resolve(*right) as u32).to_be_bytes()[1..]);
        }
        out.extend_from_slice(&[0u8; DATA_SECTION_SEPARATOR]);
        out.extend_from_slice(&data);
        out.extend_from_slice(METADATA_MARKER);
        self.metadata(node_count as u32).encode(&mut out);

        log::debug!(
            "Wrote MMDB: {} records, {} nodes, {} data bytes",
            self.records.len(),
            node_count,
            data.len()
        );

        Ok(out)
    }

    /// Build the search tree and the deduplicated data section.
    fn build(&self) -> (Tree, Vec<u8>, Vec<usize>) {
        let mut order: Vec<&SourceRecord> = self.records.iter().collect();
        // Stable: equal prefixes keep insertion order, so the last one wins
        order.sort_by_key(|record| record.tree_key().1);

        let mut tree = Tree::new();
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        let mut seen: AHashMap<Vec<u8>, usize> = AHashMap::new();

        for record in order {
            let encoded = record.to_value().to_bytes();
            let index = match seen.get(&encoded) {
                Some(index) => *index,
                None => {
                    offsets.push(data.len());
                    data.extend_from_slice(&encoded);
                    let index = offsets.len() - 1;
                    seen.insert(encoded, index);
                    index
                }
            };
            let (bits, prefix_len) = record.tree_key();
            tree.insert(bits, prefix_len, Child::Data(index));
        }

        // IPv4-mapped IPv6 addresses resolve through the IPv4 subtree
        if let Some(ipv4) = tree.zero_path(96) {
            if ipv4 != Child::Empty {
                tree.insert(IPV4_MAPPED, 96, ipv4);
            }
        }

        (tree, data, offsets)
    }

    fn metadata(&self, node_count: u32) -> Value {
        let build_epoch = self.build_epoch.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        });

        Value::Map(vec![
            ("binary_format_major_version".to_string(), Value::Uint16(2)),
            ("binary_format_minor_version".to_string(), Value::Uint16(0)),
            ("build_epoch".to_string(), Value::Uint64(build_epoch)),
            (
                "database_type".to_string(),
                Value::String(self.database_type.clone()),
            ),
            (
                "description".to_string(),
                Value::Map(vec![(
                    "en".to_string(),
                    Value::String(self.description.clone()),
                )]),
            ),
            ("ip_version".to_string(), Value::Uint16(6)),
            (
                "languages".to_string(),
                Value::Array(vec![Value::String("en".to_string())]),
            ),
            ("node_count".to_string(), Value::Uint32(node_count)),
            ("record_size".to_string(), Value::Uint16(RECORD_SIZE)),
        ])
    }
}

impl Default for MmdbWriter {
    fn default() -> Self {
        Self::new()
    }
}
