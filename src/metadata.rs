//! Sidecar metadata for the canonical database file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::Result;

/// Metadata recorded after each successful database install.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct UpdateMetadata {
    #[serde(with = "system_time_serde")]
    pub last_updated: Option<SystemTime>,
    /// URL the database was downloaded from
    pub source: Option<String>,
    /// Hex SHA-256 of the database file
    pub sha256: Option<String>,
}

mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => {
                let duration = t.duration_since(UNIX_EPOCH).unwrap_or_default();
                Some(duration.as_secs()).serialize(serializer)
            }
            None => None::<u64>.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)))
    }
}

impl UpdateMetadata {
    /// Create metadata stamped with the current time.
    pub fn now(source: &str, sha256: String) -> Self {
        Self {
            last_updated: Some(SystemTime::now()),
            source: Some(source.to_string()),
            sha256: Some(sha256),
        }
    }

    /// Sidecar path for a database file (`<file>.meta`).
    pub fn path_for(db_path: &Path) -> PathBuf {
        let mut name = db_path.as_os_str().to_owned();
        name.push(".meta");
        PathBuf::from(name)
    }

    /// Load metadata from a file.
    ///
    /// Returns default metadata if the file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save metadata to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check if an update is needed based on the given interval.
    pub fn needs_update(&self, interval: Duration) -> bool {
        self.remaining(interval).is_zero()
    }

    /// Time left until `interval` has elapsed since the last update.
    ///
    /// Zero when no update was ever recorded or the clock went backwards.
    pub fn remaining(&self, interval: Duration) -> Duration {
        match self.last_updated {
            None => Duration::ZERO,
            Some(last) => match SystemTime::now().duration_since(last) {
                Ok(elapsed) => interval.saturating_sub(elapsed),
                Err(_) => Duration::ZERO,
            },
        }
    }

    /// Whether the recorded digest matches `sha256`.
    pub fn same_digest(&self, sha256: &str) -> bool {
        self.sha256.as_deref() == Some(sha256)
    }
}

/// Hex SHA-256 of a file's contents.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
