//! Server configuration.
//!
//! Values come from three layers: built-in defaults, an optional YAML file,
//! then command-line flags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Release download URL of the DN42 ASN database.
pub const PRIMARY_URL: &str =
    "https://github.com/rdp-studio/dn42-geoasn/releases/latest/download/GeoLite2-ASN-DN42.mmdb";

/// Prefix of the mirror serving the same release.
pub const MIRROR_PREFIX: &str = "https://gh-proxy.com/";

/// Default canonical database path.
pub const DEFAULT_DATA_PATH: &str = "./GeoLite2-ASN-DN42.mmdb";

/// Project URL sent in `X-Powered-By`.
pub const PROJECT_URL: &str = "https://github.com/rdp-studio/dn42-geoasn";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 4;

/// Where the database is downloaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MmdbSource {
    /// GitHub release asset
    #[default]
    Github,
    /// Same asset through the proxy mirror
    Mirror,
}

impl MmdbSource {
    /// Name used on the command line and in config files.
    pub fn name(&self) -> &'static str {
        match self {
            MmdbSource::Github => "github",
            MmdbSource::Mirror => "mirror",
        }
    }

    /// Download URL for this source.
    pub fn url(&self) -> String {
        match self {
            MmdbSource::Github => PRIMARY_URL.to_string(),
            MmdbSource::Mirror => format!("{}{}", MIRROR_PREFIX, PRIMARY_URL),
        }
    }
}

impl FromStr for MmdbSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(MmdbSource::Github),
            "mirror" => Ok(MmdbSource::Mirror),
            other => Err(Error::Config(format!(
                "unknown mmdb source '{}', expected github or mirror",
                other
            ))),
        }
    }
}

impl fmt::Display for MmdbSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Database download source
    pub mmdb_source: MmdbSource,
    /// Canonical database path
    pub data: PathBuf,
    /// Request worker threads
    pub workers: usize,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`
    pub trust_proxy_headers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mmdb_source: MmdbSource::default(),
            data: PathBuf::from(DEFAULT_DATA_PATH),
            workers: DEFAULT_WORKERS,
            trust_proxy_headers: true,
        }
    }
}

/// Values given on the command line. `None` keeps the lower layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mmdb_source: Option<MmdbSource>,
    pub data: Option<PathBuf>,
    pub workers: Option<usize>,
    pub no_proxy_headers: bool,
}

impl Config {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Defaults, then the optional file, then `overrides`; validated.
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Layer command-line values over this config.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(source) = overrides.mmdb_source {
            self.mmdb_source = source;
        }
        if let Some(data) = overrides.data {
            self.data = data;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if overrides.no_proxy_headers {
            self.trust_proxy_headers = false;
        }
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.data.as_os_str().is_empty() {
            return Err(Error::Config("data path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve `host:port` to a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("invalid host '{}': {}", self.host, e)))?
            .next()
            .ok_or_else(|| Error::Config(format!("host '{}' did not resolve", self.host)))
    }

    /// Download URL for the configured source.
    pub fn source_url(&self) -> String {
        self.mmdb_source.url()
    }
}
