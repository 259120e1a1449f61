//! Background refresh of the active database.
//!
//! Each cycle walks `Idle -> Fetching -> Loading -> Swapping -> Idle`. The
//! download lands on a staging path next to the canonical file, so a failed
//! fetch or a corrupt download never touches the file or the structure that
//! is currently serving. A stop request is honoured while waiting for the
//! next tick and at every state boundary inside a cycle.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::RwLock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::metadata::{file_sha256, UpdateMetadata};
use crate::provider::StructureProvider;
use crate::store::HotStore;

/// Interval between refresh cycles.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Download attempts before startup gives up.
pub const BOOTSTRAP_ATTEMPTS: u32 = 3;

/// Pause between startup download attempts.
pub const BOOTSTRAP_BACKOFF: Duration = Duration::from_secs(5);

/// Where the scheduler currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching,
    Loading,
    Swapping,
    Stopping,
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new structure was installed
    Updated,
    /// The download matched the installed database
    Unchanged,
    /// A stop request interrupted the cycle
    Abandoned,
}

/// Requests a running scheduler to stop.
///
/// The flag is shared with the scheduler's downloads, which give up as soon
/// as it is set; the channel wakes the scheduler from its wait.
#[derive(Clone)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl StopSignal {
    /// Ask the scheduler to stop. Repeated calls are harmless.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.wake.try_send(());
    }
}

/// Handle to a scheduler running on its own thread.
pub struct RefreshHandle {
    signal: StopSignal,
    thread: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signal to pass to other shutdown paths.
    pub fn signal(&self) -> StopSignal {
        self.signal.clone()
    }

    /// Stop the scheduler and wait for its thread to exit.
    ///
    /// An in-progress download is abandoned, so this returns within one
    /// read timeout of the download's connection.
    pub fn stop(self) {
        self.signal.stop();
        if self.thread.join().is_err() {
            log::error!("Refresh thread panicked");
        }
    }
}

/// Periodically downloads, loads and installs a fresh database.
///
/// The scheduler is the only writer of its [`HotStore`].
pub struct RefreshScheduler<P: StructureProvider, F: Fetch> {
    url: String,
    db_path: PathBuf,
    interval: Duration,
    store: Arc<HotStore<P::Structure>>,
    provider: P,
    fetcher: F,
    state: RwLock<RefreshState>,
    last_outcome: RwLock<Option<std::result::Result<CycleOutcome, String>>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    stopping: Arc<AtomicBool>,
}

impl<P: StructureProvider, F: Fetch> RefreshScheduler<P, F> {
    /// Create a scheduler refreshing `db_path` from `url`.
    pub fn new(
        url: &str,
        db_path: &Path,
        store: Arc<HotStore<P::Structure>>,
        provider: P,
        fetcher: F,
    ) -> Self {
        let (stop_tx, stop_rx) = channel::bounded(1);
        Self {
            url: url.to_string(),
            db_path: db_path.to_path_buf(),
            interval: REFRESH_INTERVAL,
            store,
            provider,
            fetcher,
            state: RwLock::new(RefreshState::Idle),
            last_outcome: RwLock::new(None),
            stop_tx,
            stop_rx,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set a custom refresh interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Canonical database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Download target of a cycle, next to the canonical file.
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self.db_path.as_os_str().to_owned();
        name.push(".new");
        PathBuf::from(name)
    }

    fn metadata_path(&self) -> PathBuf {
        UpdateMetadata::path_for(&self.db_path)
    }

    /// Source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current state.
    pub fn state(&self) -> RefreshState {
        *self.state.read()
    }

    /// Outcome of the most recent cycle, with failures rendered as text.
    pub fn last_outcome(&self) -> Option<std::result::Result<CycleOutcome, String>> {
        self.last_outcome.read().clone()
    }

    /// A signal that stops this scheduler.
    pub fn stop_signal(&self) -> StopSignal {
        StopSignal {
            flag: Arc::clone(&self.stopping),
            wake: self.stop_tx.clone(),
        }
    }

    fn set_state(&self, state: RefreshState) {
        *self.state.write() = state;
    }

    /// Check for a stop request without blocking.
    fn stop_requested(&self) -> bool {
        if self.stopping.load(Ordering::SeqCst) {
            return true;
        }
        match self.stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                self.stopping.store(true, Ordering::SeqCst);
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Sleep for `delay` unless stopped first. Returns `true` on stop.
    fn wait(&self, delay: Duration) -> bool {
        if self.stopping.load(Ordering::SeqCst) {
            return true;
        }
        match self.stop_rx.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.stopping.store(true, Ordering::SeqCst);
                true
            }
        }
    }

    /// Delay before the first cycle: what is left of the interval since the
    /// last recorded update, or the whole interval when nothing is recorded.
    pub fn first_delay(&self) -> Duration {
        let meta = UpdateMetadata::load(self.metadata_path()).unwrap_or_default();
        match meta.last_updated {
            Some(_) => meta.remaining(self.interval),
            None => self.interval,
        }
    }

    /// Install the initial structure before serving starts.
    ///
    /// Loads the canonical file when it exists and is valid. Otherwise the
    /// database is downloaded, retrying up to `attempts` times.
    pub fn bootstrap(&self, attempts: u32, backoff: Duration) -> Result<()> {
        if self.db_path.exists() {
            match self.provider.open(&self.db_path) {
                Ok(structure) => {
                    self.store.swap(Arc::new(structure));
                    log::info!("Loaded database from {:?}", self.db_path);
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("Failed to load {:?}, will download: {}", self.db_path, e);
                }
            }
        }

        let mut last_error = Error::Config("no download attempted".to_string());
        for attempt in 1..=attempts {
            log::info!("Downloading database: {} (attempt {}/{})", self.url, attempt, attempts);
            match self.run_cycle() {
                Ok(CycleOutcome::Abandoned) => {
                    return Err(Error::Config("stopped during startup".to_string()));
                }
                Ok(_) if self.store.is_ready() => return Ok(()),
                Ok(outcome) => {
                    last_error = Error::Config(format!("no database installed ({:?})", outcome));
                }
                Err(e) => {
                    log::warn!("Startup download failed: {}", e);
                    last_error = e;
                }
            }
            if attempt < attempts && self.wait(backoff) {
                return Err(Error::Config("stopped during startup".to_string()));
            }
        }
        Err(last_error)
    }

    /// Run one fetch, load and swap cycle.
    ///
    /// Failures leave the installed structure and the canonical file as they
    /// were, and remove the staged download.
    pub fn run_cycle(&self) -> Result<CycleOutcome> {
        if self.stop_requested() {
            self.set_state(RefreshState::Stopping);
            return Ok(CycleOutcome::Abandoned);
        }

        let staging = self.staging_path();
        let result = self.fetch_and_install(&staging);

        if !matches!(result, Ok(CycleOutcome::Updated)) {
            remove_if_exists(&staging);
        }

        self.set_state(if self.stopping.load(Ordering::SeqCst) {
            RefreshState::Stopping
        } else {
            RefreshState::Idle
        });
        *self.last_outcome.write() = Some(match &result {
            Ok(outcome) => Ok(*outcome),
            Err(e) => Err(e.to_string()),
        });
        result
    }

    fn fetch_and_install(&self, staging: &Path) -> Result<CycleOutcome> {
        self.set_state(RefreshState::Fetching);
        let bytes = match self.fetcher.fetch(&self.url, staging, &self.stopping) {
            Ok(bytes) => bytes,
            Err(_) if self.stop_requested() => return Ok(CycleOutcome::Abandoned),
            Err(e) => return Err(e),
        };

        if self.stop_requested() {
            return Ok(CycleOutcome::Abandoned);
        }

        let digest = file_sha256(staging)?;
        let meta_path = self.metadata_path();
        let meta = UpdateMetadata::load(&meta_path).unwrap_or_default();
        if self.store.is_ready() && meta.same_digest(&digest) {
            log::debug!("Downloaded database is unchanged ({})", digest);
            self.save_metadata(&meta_path, digest);
            return Ok(CycleOutcome::Unchanged);
        }

        self.set_state(RefreshState::Loading);
        let structure = self.provider.open(staging)?;

        if self.stop_requested() {
            return Ok(CycleOutcome::Abandoned);
        }

        self.set_state(RefreshState::Swapping);
        let old = self.store.swap(Arc::new(structure));

        match fs::rename(staging, &self.db_path) {
            Ok(()) => self.save_metadata(&meta_path, digest),
            Err(e) => {
                log::error!(
                    "Installed new database but could not replace {:?}: {}",
                    self.db_path,
                    e
                );
                remove_if_exists(staging);
            }
        }

        // Released once in-flight lookups holding it have finished
        drop(old);

        log::info!(
            "Database updated: {} bytes, generation {}",
            bytes,
            self.store.generation()
        );
        Ok(CycleOutcome::Updated)
    }

    fn save_metadata(&self, path: &Path, digest: String) {
        if let Err(e) = UpdateMetadata::now(&self.url, digest).save(path) {
            log::warn!("Failed to save metadata {:?}: {}", path, e);
        }
    }

    /// Run cycles until stopped.
    pub fn run(&self) {
        let mut delay = self.first_delay();
        log::info!("Next database refresh in {:?}", delay);

        loop {
            self.set_state(RefreshState::Idle);
            if self.wait(delay) {
                break;
            }
            match self.run_cycle() {
                Ok(CycleOutcome::Abandoned) => break,
                Ok(_) => {}
                Err(e) => log::warn!("Refresh failed, keeping current database: {}", e),
            }
            delay = self.interval;
        }

        self.set_state(RefreshState::Stopping);
        log::info!("Refresh scheduler stopped");
    }

    /// Run the loop on a dedicated thread.
    pub fn spawn(self: Arc<Self>) -> Result<RefreshHandle> {
        let signal = self.stop_signal();
        let thread = thread::Builder::new()
            .name("geoasn-refresh".to_string())
            .spawn(move || self.run())?;
        Ok(RefreshHandle { signal, thread })
    }
}

fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpFetcher;
    use crate::provider::{AsnRecord, Structure};
    use crate::test_support::{serve_slowly, DropCounter};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::net::IpAddr;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tempfile::{tempdir, TempDir};

    /// Structure whose content is the file text; counts disposals.
    struct Versioned {
        version: String,
        drops: DropCounter,
    }

    impl Drop for Versioned {
        fn drop(&mut self) {
            self.drops.bump();
        }
    }

    impl Structure for Versioned {
        fn lookup(&self, _ip: IpAddr) -> Result<Option<AsnRecord>> {
            Ok(Some(AsnRecord {
                number: Some(1),
                organization: Some(self.version.clone()),
            }))
        }
    }

    /// Files starting with "bad" fail to load.
    struct TextProvider {
        drops: DropCounter,
    }

    impl StructureProvider for TextProvider {
        type Structure = Versioned;

        fn open(&self, path: &Path) -> Result<Versioned> {
            let version = fs::read_to_string(path)?;
            if version.starts_with("bad") {
                return Err(Error::Database(format!("corrupt: {}", version)));
            }
            Ok(Versioned {
                version,
                drops: self.drops.clone(),
            })
        }
    }

    /// Replays canned downloads; `None` simulates a network failure.
    #[derive(Clone, Default)]
    struct ScriptedFetcher {
        script: Arc<Mutex<VecDeque<Option<&'static str>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetcher {
        fn new(script: &[Option<&'static str>]) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.iter().copied().collect())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for ScriptedFetcher {
        fn fetch(&self, _url: &str, dest: &Path, _cancel: &AtomicBool) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().pop_front().flatten() {
                Some(body) => {
                    fs::write(dest, body)?;
                    Ok(body.len() as u64)
                }
                None => Err(Error::Fetch("simulated network failure".to_string())),
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        drops: DropCounter,
        store: Arc<HotStore<Versioned>>,
        fetcher: ScriptedFetcher,
    }

    impl Fixture {
        fn new(script: &[Option<&'static str>]) -> Self {
            Self {
                dir: tempdir().unwrap(),
                drops: DropCounter::default(),
                store: Arc::new(HotStore::new()),
                fetcher: ScriptedFetcher::new(script),
            }
        }

        fn db_path(&self) -> PathBuf {
            self.dir.path().join("asn.mmdb")
        }

        fn scheduler(&self) -> RefreshScheduler<TextProvider, ScriptedFetcher> {
            RefreshScheduler::new(
                "https://example.com/asn.mmdb",
                &self.db_path(),
                Arc::clone(&self.store),
                TextProvider {
                    drops: self.drops.clone(),
                },
                self.fetcher.clone(),
            )
        }

        /// Canonical file holding `content`, loaded into the store.
        fn with_installed(self, content: &str) -> Self {
            fs::write(self.db_path(), content).unwrap();
            self.scheduler()
                .bootstrap(1, Duration::ZERO)
                .unwrap();
            self
        }

        fn current(&self) -> String {
            self.store.get().unwrap().version.clone()
        }
    }

    #[test]
    fn test_staging_path_is_distinct() {
        let fixture = Fixture::new(&[]);
        let scheduler = fixture.scheduler();
        assert_ne!(scheduler.staging_path(), scheduler.db_path());
        assert_eq!(
            scheduler.staging_path(),
            fixture.dir.path().join("asn.mmdb.new")
        );
    }

    #[test]
    fn test_successful_cycle_swaps_and_disposes_once() {
        let fixture = Fixture::new(&[Some("v2")]).with_installed("v1");
        let scheduler = fixture.scheduler();

        assert_eq!(scheduler.run_cycle().unwrap(), CycleOutcome::Updated);

        assert_eq!(fixture.current(), "v2");
        assert_eq!(fixture.drops.get(), 1);
        assert_eq!(fixture.store.generation(), 2);
        assert_eq!(fs::read_to_string(fixture.db_path()).unwrap(), "v2");
        assert!(!scheduler.staging_path().exists());
        assert_eq!(scheduler.state(), RefreshState::Idle);
        assert_eq!(scheduler.last_outcome(), Some(Ok(CycleOutcome::Updated)));

        let meta = UpdateMetadata::load(UpdateMetadata::path_for(&fixture.db_path())).unwrap();
        assert!(meta.same_digest(&file_sha256(&fixture.db_path()).unwrap()));
        assert_eq!(meta.source.as_deref(), Some("https://example.com/asn.mmdb"));
    }

    #[test]
    fn test_failed_fetch_changes_nothing() {
        let fixture = Fixture::new(&[None]).with_installed("v1");
        let before = fs::read(fixture.db_path()).unwrap();
        let scheduler = fixture.scheduler();

        assert!(matches!(scheduler.run_cycle(), Err(Error::Fetch(_))));

        assert_eq!(fixture.current(), "v1");
        assert_eq!(fixture.store.generation(), 1);
        assert_eq!(fixture.drops.get(), 0);
        assert_eq!(fs::read(fixture.db_path()).unwrap(), before);
        assert!(!scheduler.staging_path().exists());
        assert!(matches!(scheduler.last_outcome(), Some(Err(_))));
    }

    #[test]
    fn test_failed_load_discards_download() {
        let fixture = Fixture::new(&[Some("bad download")]).with_installed("v1");
        let scheduler = fixture.scheduler();

        assert!(matches!(scheduler.run_cycle(), Err(Error::Database(_))));

        assert_eq!(fixture.current(), "v1");
        assert_eq!(fixture.store.generation(), 1);
        assert_eq!(fs::read_to_string(fixture.db_path()).unwrap(), "v1");
        assert!(!scheduler.staging_path().exists());
        // The rejected structure was never built, the live one is untouched
        assert_eq!(fixture.drops.get(), 0);
    }

    #[test]
    fn test_unchanged_download_skips_swap() {
        let fixture = Fixture::new(&[Some("v2"), Some("v2")]).with_installed("v1");
        let scheduler = fixture.scheduler();

        assert_eq!(scheduler.run_cycle().unwrap(), CycleOutcome::Updated);
        assert_eq!(scheduler.run_cycle().unwrap(), CycleOutcome::Unchanged);

        assert_eq!(fixture.store.generation(), 2);
        assert_eq!(fixture.drops.get(), 1);
        assert!(!scheduler.staging_path().exists());
    }

    #[test]
    fn test_in_flight_reader_keeps_old_structure() {
        let fixture = Fixture::new(&[Some("v2")]).with_installed("v1");
        let scheduler = fixture.scheduler();

        let in_flight = fixture.store.get().unwrap();
        scheduler.run_cycle().unwrap();

        assert_eq!(fixture.drops.get(), 0);
        assert_eq!(in_flight.version, "v1");
        drop(in_flight);
        assert_eq!(fixture.drops.get(), 1);
    }

    #[test]
    fn test_stop_before_cycle_abandons_without_fetch() {
        let fixture = Fixture::new(&[Some("v2")]).with_installed("v1");
        let scheduler = fixture.scheduler();

        scheduler.stop_signal().stop();
        assert_eq!(scheduler.run_cycle().unwrap(), CycleOutcome::Abandoned);

        assert_eq!(fixture.fetcher.calls(), 0);
        assert_eq!(fixture.current(), "v1");
        assert_eq!(scheduler.state(), RefreshState::Stopping);
    }

    #[test]
    fn test_bootstrap_downloads_missing_file() {
        let fixture = Fixture::new(&[Some("v1")]);
        let scheduler = fixture.scheduler();

        scheduler.bootstrap(1, Duration::ZERO).unwrap();

        assert_eq!(fixture.current(), "v1");
        assert_eq!(fs::read_to_string(fixture.db_path()).unwrap(), "v1");
        assert_eq!(fixture.fetcher.calls(), 1);
    }

    #[test]
    fn test_bootstrap_uses_existing_file() {
        let fixture = Fixture::new(&[]).with_installed("local");
        assert_eq!(fixture.current(), "local");
        assert_eq!(fixture.fetcher.calls(), 0);
    }

    #[test]
    fn test_bootstrap_retries() {
        let fixture = Fixture::new(&[None, Some("bad"), Some("v1")]);
        let scheduler = fixture.scheduler();

        scheduler.bootstrap(3, Duration::from_millis(1)).unwrap();

        assert_eq!(fixture.current(), "v1");
        assert_eq!(fixture.fetcher.calls(), 3);
    }

    #[test]
    fn test_bootstrap_gives_up() {
        let fixture = Fixture::new(&[None, None]);
        let scheduler = fixture.scheduler();

        assert!(scheduler.bootstrap(2, Duration::from_millis(1)).is_err());
        assert!(!fixture.store.is_ready());
        assert!(!fixture.db_path().exists());
    }

    #[test]
    fn test_bootstrap_replaces_corrupt_local_file() {
        let fixture = Fixture::new(&[Some("v1")]);
        fs::write(fixture.db_path(), "bad local copy").unwrap();

        fixture.scheduler().bootstrap(1, Duration::ZERO).unwrap();

        assert_eq!(fixture.current(), "v1");
        assert_eq!(fs::read_to_string(fixture.db_path()).unwrap(), "v1");
    }

    #[test]
    fn test_first_delay() {
        let fixture = Fixture::new(&[]);
        let scheduler = fixture.scheduler().with_interval(Duration::from_secs(3600));
        assert_eq!(scheduler.first_delay(), Duration::from_secs(3600));

        let meta = UpdateMetadata {
            last_updated: Some(std::time::SystemTime::now() - Duration::from_secs(7200)),
            ..Default::default()
        };
        meta.save(UpdateMetadata::path_for(&fixture.db_path())).unwrap();
        assert_eq!(scheduler.first_delay(), Duration::ZERO);
    }

    #[test]
    fn test_spawned_loop_refreshes_and_stops() {
        let fixture = Fixture::new(&[Some("v2")]).with_installed("v1");
        let scheduler = Arc::new(fixture.scheduler().with_interval(Duration::from_millis(20)));
        let handle = Arc::clone(&scheduler).spawn().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while fixture.store.generation() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop();

        assert_eq!(fixture.current(), "v2");
        assert_eq!(scheduler.state(), RefreshState::Stopping);
    }

    #[test]
    fn test_stop_interrupts_long_wait() {
        let fixture = Fixture::new(&[]).with_installed("v1");
        let scheduler = Arc::new(fixture.scheduler());
        let handle = Arc::clone(&scheduler).spawn().unwrap();

        let started = Instant::now();
        handle.stop();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(fixture.fetcher.calls(), 0);
        assert_eq!(scheduler.state(), RefreshState::Stopping);
        assert_eq!(fixture.current(), "v1");
    }

    #[test]
    fn test_stop_abandons_slow_download() {
        let fixture = Fixture::new(&[]).with_installed("v1");
        // 1000 bytes at one byte per 100ms: far longer than the test runs
        let (url, _server) = serve_slowly(1000, Duration::from_millis(100));

        let scheduler = Arc::new(
            RefreshScheduler::new(
                &url,
                &fixture.db_path(),
                Arc::clone(&fixture.store),
                TextProvider {
                    drops: fixture.drops.clone(),
                },
                HttpFetcher::with_timeouts(Duration::from_secs(5), Duration::from_secs(5)),
            )
            .with_interval(Duration::from_millis(10)),
        );
        let handle = Arc::clone(&scheduler).spawn().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while scheduler.state() != RefreshState::Fetching && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(scheduler.state(), RefreshState::Fetching);
        thread::sleep(Duration::from_millis(300));

        let started = Instant::now();
        handle.stop();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(scheduler.state(), RefreshState::Stopping);
        assert_eq!(scheduler.last_outcome(), Some(Ok(CycleOutcome::Abandoned)));
        assert_eq!(fixture.current(), "v1");
        assert_eq!(fs::read_to_string(fixture.db_path()).unwrap(), "v1");
        assert!(!scheduler.staging_path().exists());
    }
}
