//! DN42 registry scanner.
//!
//! Reads route objects from `data/route` and `data/route6`, and resolves the
//! origin's `as-name` from `data/aut-num/AS<number>`. Routes whose origin has
//! no name are skipped.

use ahash::AHashMap;
use ipnet::IpNet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use super::csv::parse_asn;
use crate::builder::SourceRecord;
use crate::error::Result;

static ROUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*route6?:\s*(\S+)").unwrap());
static ORIGIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*origin:\s*(\S+)").unwrap());
static AS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*as-name:\s*(\S+)").unwrap());

/// Outcome of a registry scan.
#[derive(Debug, Default)]
pub struct RegistryScan {
    /// Routes with a resolved origin name
    pub records: Vec<SourceRecord>,
    /// Routes dropped because the origin AS has no name
    pub unnamed: usize,
    /// Objects that could not be parsed
    pub invalid: usize,
}

/// Scanner over a checked-out registry.
pub struct RegistryScanner {
    root: PathBuf,
    names: AHashMap<u32, Option<String>>,
}

impl RegistryScanner {
    /// Create a scanner for the registry rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            names: AHashMap::new(),
        }
    }

    /// Scan IPv4 and IPv6 route objects.
    pub fn scan(&mut self) -> Result<RegistryScan> {
        let mut scan = RegistryScan::default();
        for dir in ["route", "route6"] {
            let dir = self.root.join("data").join(dir);
            for path in sorted_entries(&dir)? {
                self.scan_object(&path, &mut scan)?;
            }
        }

        log::info!(
            "Scanned registry: {} routes, {} without AS name, {} invalid",
            scan.records.len(),
            scan.unnamed,
            scan.invalid
        );
        Ok(scan)
    }

    fn scan_object(&mut self, path: &Path, scan: &mut RegistryScan) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let (route, origin) = parse_route_object(&content);

        let (Some(route), Some(origin)) = (route, origin) else {
            scan.invalid += 1;
            return Ok(());
        };

        let network = match route.parse::<IpNet>() {
            Ok(network) => network,
            Err(_) => {
                log::warn!("{:?}: invalid route {}", path, route);
                scan.invalid += 1;
                return Ok(());
            }
        };
        let Some(asn) = parse_asn(&origin) else {
            log::warn!("{:?}: invalid origin {}", path, origin);
            scan.invalid += 1;
            return Ok(());
        };

        match self.as_name(asn) {
            Some(name) => scan.records.push(SourceRecord::new(network, asn, &name)),
            None => {
                log::info!("{} AS{} no name, skipping", network, asn);
                scan.unnamed += 1;
            }
        }
        Ok(())
    }

    /// Cached `as-name` lookup.
    fn as_name(&mut self, asn: u32) -> Option<String> {
        if let Some(name) = self.names.get(&asn) {
            return name.clone();
        }
        let path = self
            .root
            .join("data")
            .join("aut-num")
            .join(format!("AS{}", asn));
        let name = fs::read_to_string(path)
            .ok()
            .and_then(|content| first_capture(&AS_NAME, &content));
        self.names.insert(asn, name.clone());
        name
    }
}

/// Extract the `route`/`route6` and `origin` attributes. Later lines win.
pub fn parse_route_object(content: &str) -> (Option<String>, Option<String>) {
    let mut route = None;
    let mut origin = None;
    for line in content.lines() {
        if let Some(c) = ROUTE.captures(line) {
            route = Some(c[1].to_string());
        } else if let Some(c) = ORIGIN.captures(line) {
            origin = Some(c[1].to_string());
        }
    }
    (route, origin)
}

fn first_capture(re: &Regex, content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| re.captures(line).map(|c| c[1].to_string()))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}
