//! Atomic download of remote database files.

use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Default connect timeout for downloads.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default read timeout for downloads.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Default limit on a whole download, headers and body.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// User agent sent with every download.
pub const USER_AGENT: &str = concat!("geoasn/", env!("CARGO_PKG_VERSION"));

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Retrieves a remote resource into a local file.
///
/// Implementations must leave `dest` untouched unless the whole resource was
/// received, and replace it atomically when it was. Once `cancel` is set the
/// download should give up promptly with an error.
pub trait Fetch: Send + Sync + 'static {
    /// Download `url` into `dest`, returning the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path, cancel: &AtomicBool) -> Result<u64>;
}

/// HTTP(S) fetcher backed by a `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
    total_timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with default timeouts.
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Create a fetcher with custom timeouts.
    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect)
            .timeout_read(read)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }

    /// Limit the time a whole download may take.
    pub fn with_total_timeout(mut self, total: Duration) -> Self {
        self.total_timeout = total;
        self
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path, cancel: &AtomicBool) -> Result<u64> {
        let deadline = Instant::now() + self.total_timeout;
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => Error::HttpStatus(code),
            ureq::Error::Transport(t) => Error::Fetch(t.to_string()),
        })?;

        if response.status() != 200 {
            return Err(Error::HttpStatus(response.status()));
        }

        // Content-Length describes the encoded body when ureq decodes it
        let expected = match response.header("Content-Encoding") {
            Some(_) => None,
            None => response
                .header("Content-Length")
                .and_then(|v| v.trim().parse::<u64>().ok()),
        };

        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        // Dropped (and deleted) on every early return below
        let mut temp = NamedTempFile::new_in(dir)?;

        let mut body = BufReader::new(CountingReader::new(response.into_reader(), cancel, deadline));
        let gzipped = url.ends_with(".gz")
            || body
                .fill_buf()
                .map_err(read_error)?
                .starts_with(&GZIP_MAGIC);

        let written = if gzipped {
            let written = copy_body(&mut GzDecoder::new(&mut body), temp.as_file_mut())?;
            // Trailing bytes after the gzip member still count toward the body
            io::copy(&mut body, &mut io::sink()).map_err(read_error)?;
            written
        } else {
            copy_body(&mut body, temp.as_file_mut())?
        };

        let received = body.get_ref().count();
        if let Some(expected) = expected {
            if received != expected {
                return Err(Error::Truncated {
                    expected,
                    actual: received,
                });
            }
        }

        temp.as_file().sync_all()?;
        temp.persist(dest).map_err(|e| Error::Io(e.error))?;

        log::debug!(
            "Downloaded {} -> {:?}: {} bytes ({} on the wire)",
            url,
            dest,
            written,
            received
        );

        Ok(written)
    }
}

fn copy_body<R: Read>(body: &mut R, out: &mut fs::File) -> Result<u64> {
    io::copy(body, out).map_err(read_error)
}

fn read_error(e: io::Error) -> Error {
    Error::Fetch(format!("failed to read response: {}", e))
}

/// Counts bytes read from the wrapped reader, failing once `cancel` is set
/// or `deadline` has passed.
struct CountingReader<'a, R> {
    inner: R,
    count: u64,
    cancel: &'a AtomicBool,
    deadline: Instant,
}

impl<'a, R> CountingReader<'a, R> {
    fn new(inner: R, cancel: &'a AtomicBool, deadline: Instant) -> Self {
        Self {
            inner,
            count: 0,
            cancel,
            deadline,
        }
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "download cancelled"));
        }
        if Instant::now() >= self.deadline {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "download exceeded its time limit",
            ));
        }
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
