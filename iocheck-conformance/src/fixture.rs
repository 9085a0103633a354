//! Fixture acquisition: local files, downloads and generated samples.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use iocheck_driver::{DriverClass, OpenDriver};
use iocheck_fs::{cleanup_fixture, make_all_directories, Filesystem, FsError};
use iocheck_schema::generate_from_supported;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::Capabilities;
use crate::config::HarnessConfig;
use crate::dispatch::{resolve_writer, Target};
use crate::logger::Logger;
use crate::types::{FailureCause, HarnessError, SetupError, SkipReason};

/// Where a fixture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureOrigin {
    Local,
    Downloaded,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub path: PathBuf,
    pub origin: FixtureOrigin,
}

impl Fixture {
    pub fn new(path: PathBuf, origin: FixtureOrigin) -> Self {
        Self { path, origin }
    }
}

/// Ordered fixtures of one suite. Iteration follows registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureSet {
    fixtures: Vec<Fixture>,
}

impl FixtureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fixture: Fixture) {
        self.fixtures.push(fixture);
    }

    pub fn extend(&mut self, fixtures: impl IntoIterator<Item = Fixture>) {
        self.fixtures.extend(fixtures);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter()
    }

    pub fn as_slice(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn count(&self, origin: FixtureOrigin) -> usize {
        self.fixtures.iter().filter(|f| f.origin == origin).count()
    }

    /// Remove generated fixtures from disk and from the set. Local and
    /// downloaded files are kept for reuse.
    pub fn cleanup_generated<F: Filesystem + ?Sized>(&mut self, fs: &F, dir: &Path) -> Result<usize, FsError> {
        let mut removed = 0;
        for fixture in self.fixtures.iter().filter(|f| f.origin == FixtureOrigin::Generated) {
            cleanup_fixture(fs, &fixture.path, dir)?;
            removed += 1;
        }
        self.fixtures.retain(|f| f.origin != FixtureOrigin::Generated);
        Ok(removed)
    }
}

// ===========================================
// Fetching
// ===========================================

/// Errors fetching a remote fixture.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("IO error reading {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// Retrieves fixture bytes by URL.
pub trait FixtureFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher for `file://` URLs and plain paths, e.g. a local mirror of the
/// fixture repository.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileUrlFetcher;

impl FixtureFetcher for FileUrlFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = match url.strip_prefix("file://") {
            Some(rest) => PathBuf::from(rest),
            None if url.contains("://") => return Err(FetchError::UnsupportedScheme(url.to_string())),
            None => PathBuf::from(url),
        };
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(url.to_string())
            } else {
                FetchError::Io {
                    url: url.to_string(),
                    source: e,
                }
            }
        })
    }
}

/// Default timeout for one fixture download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Fetcher for `http://` and `https://` URLs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    use_proxy: bool,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            use_proxy: true,
        }
    }

    /// Builder: set the per-download timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: ignore proxies configured in the environment.
    pub fn without_proxy(mut self) -> Self {
        self.use_proxy = false;
        self
    }

    fn client(&self) -> Result<reqwest::blocking::Client, FetchError> {
        let mut builder = reqwest::blocking::Client::builder().timeout(self.timeout);
        if !self.use_proxy {
            builder = builder.no_proxy();
        }
        builder.build().map_err(|e| FetchError::Transfer(e.to_string()))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client()?
            .get(url)
            .send()
            .map_err(|e| FetchError::Transfer(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Transfer(format!("{url}: HTTP {status}")));
        }
        let body = response
            .bytes()
            .map_err(|e| FetchError::Transfer(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Fetcher choosing a backend by URL scheme: HTTP(S) over the network,
/// everything else through [`FileUrlFetcher`].
#[derive(Debug, Clone, Default)]
pub struct SchemeFetcher {
    http: HttpFetcher,
    file: FileUrlFetcher,
}

impl SchemeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replace the HTTP backend.
    pub fn with_http(mut self, http: HttpFetcher) -> Self {
        self.http = http;
        self
    }
}

impl FixtureFetcher for SchemeFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.fetch(url)
        } else {
            self.file.fetch(url)
        }
    }
}

/// In-memory fetcher recording every request. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, url: &str, data: &[u8]) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), data.to_vec());
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FixtureFetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

/// URL of a remote fixture: `<base_url><short_name>/<remote_name>`.
pub fn fixture_url(base_url: &str, short_name: &str, remote_name: &str) -> String {
    format!("{base_url}{short_name}/{remote_name}")
}

// ===========================================
// Acquisition
// ===========================================

/// Register files that must already exist in `dir`.
pub fn acquire_local<F: Filesystem + ?Sized>(
    fs: &F,
    dir: &Path,
    names: &[String],
) -> Result<Vec<Fixture>, HarnessError> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            if fs.exists(&path) {
                Ok(Fixture::new(path, FixtureOrigin::Local))
            } else {
                Err(HarnessError::from(SetupError::MissingLocal(path)))
            }
        })
        .collect()
}

/// Download remote fixtures into `dir`, reusing files already present.
///
/// An empty name list never needs the network, so a suite without downloads
/// still runs offline. Otherwise a disabled network skips the suite, and
/// any fetch or write error is fatal.
pub fn acquire_downloaded<F: Filesystem + ?Sized>(
    fs: &F,
    fetcher: &dyn FixtureFetcher,
    config: &HarnessConfig,
    short_name: &str,
    dir: &Path,
    names: &[String],
    logger: &dyn Logger,
) -> Result<Vec<Fixture>, HarnessError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    if !config.use_network {
        return Err(HarnessError::Skip(SkipReason::NetworkDisabled));
    }

    make_all_directories(fs, names, dir).map_err(|source| SetupError::Store {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut fixtures = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(name);
        if fs.exists(&path) {
            logger.debug(&format!("reusing {}", path.display()));
        } else {
            let url = fixture_url(&config.base_url, short_name, name);
            logger.verbose(&format!("downloading {url}"));
            let data = fetcher
                .fetch(&url)
                .map_err(|source| SetupError::Download { url: url.clone(), source })?;
            fs.write_atomic(&path, &data).map_err(|source| SetupError::Store {
                path: path.clone(),
                source,
            })?;
        }
        fixtures.push(Fixture::new(path, FixtureOrigin::Downloaded));
    }
    Ok(fixtures)
}

/// Write a synthetic tree through the driver if its highest kind can be
/// round-tripped generically.
///
/// The target file is removed first. Returns `None` when the driver is not
/// eligible, nothing can be generated, or the class yields no instance.
pub fn generate_if_writable<C, F>(
    class: &C,
    caps: &Capabilities,
    fs: &F,
    dir: &Path,
) -> Result<Option<Fixture>, HarnessError>
where
    C: DriverClass,
    F: Filesystem + ?Sized,
{
    let highest = match caps.highest {
        Some(kind) if caps.eligible_for_generic_round_trip(kind) => kind,
        _ => return Ok(None),
    };
    let descriptor = class.descriptor();
    let sample = match generate_from_supported(descriptor.supported_kinds()) {
        Some(sample) => sample,
        None => return Ok(None),
    };

    let path = dir.join(descriptor.generated_file_name());
    fs.remove_path(&path).map_err(|source| SetupError::Store {
        path: path.clone(),
        source,
    })?;

    let generate_error = |cause: FailureCause| SetupError::Generate {
        path: path.clone(),
        cause,
    };
    let writer = resolve_writer(class, &Target::Kind(highest)).map_err(|e| generate_error(e.into()))?;
    let mut instance = match OpenDriver::open(class, &path).map_err(|e| generate_error(e.into()))? {
        Some(instance) => instance,
        None => return Ok(None),
    };
    writer
        .call(&mut instance, &sample)
        .map_err(|e| generate_error(e.into()))?;
    instance.close().map_err(|e| generate_error(e.into()))?;

    Ok(Some(Fixture::new(path, FixtureOrigin::Generated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MockLogger;
    use iocheck_driver::{DriverDescriptor, JsonDriverClass, ParamSpec};
    use iocheck_fs::{MockFilesystem, RealFilesystem};
    use iocheck_schema::Kind;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use tempfile::tempdir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    fn mirror_config() -> HarnessConfig {
        HarnessConfig::default().with_base_url("mock://repo/")
    }

    // ===========================================
    // Fixture set
    // ===========================================

    #[test]
    fn test_set_keeps_registration_order() {
        let mut set = FixtureSet::new();
        set.push(Fixture::new("/f/b".into(), FixtureOrigin::Downloaded));
        set.push(Fixture::new("/f/a".into(), FixtureOrigin::Generated));

        let first: Vec<_> = set.iter().map(|f| f.path.clone()).collect();
        let second: Vec<_> = set.iter().map(|f| f.path.clone()).collect();
        assert_eq!(first, vec![PathBuf::from("/f/b"), PathBuf::from("/f/a")]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cleanup_generated_only() {
        let fs = MockFilesystem::new();
        let dir = PathBuf::from("/fx/json");
        fs.add_file(dir.join("remote.json"), b"r".to_vec());
        fs.add_file(dir.join("Generated0_JsonIO.json"), b"g".to_vec());

        let mut set = FixtureSet::new();
        set.push(Fixture::new(dir.join("remote.json"), FixtureOrigin::Downloaded));
        set.push(Fixture::new(dir.join("Generated0_JsonIO.json"), FixtureOrigin::Generated));

        assert_eq!(set.cleanup_generated(&fs, &dir).unwrap(), 1);
        assert_eq!(set.len(), 1);
        assert!(fs.exists(&dir.join("remote.json")));
        assert!(!fs.exists(&dir.join("Generated0_JsonIO.json")));
    }

    // ===========================================
    // Local
    // ===========================================

    #[test]
    fn test_acquire_local_present() {
        let fs = MockFilesystem::new();
        let dir = PathBuf::from("/fx/json");
        fs.add_file(dir.join("a.json"), vec![]);

        let fixtures = acquire_local(&fs, &dir, &names(&["a.json"])).unwrap();
        assert_eq!(fixtures, vec![Fixture::new(dir.join("a.json"), FixtureOrigin::Local)]);
    }

    #[test]
    fn test_acquire_local_missing_is_fatal() {
        let fs = MockFilesystem::new();
        let err = acquire_local(&fs, Path::new("/fx/json"), &names(&["gone.json"])).unwrap_err();
        assert!(matches!(err, HarnessError::Fatal(SetupError::MissingLocal(_))));
    }

    // ===========================================
    // Downloads
    // ===========================================

    #[test]
    fn test_fixture_url() {
        assert_eq!(
            fixture_url("https://host/raw/", "json", "sub/a.json"),
            "https://host/raw/json/sub/a.json"
        );
    }

    #[test]
    fn test_empty_download_list_ignores_network() {
        let fs = MockFilesystem::new();
        let fetcher = MockFetcher::new();
        let config = mirror_config().with_network(false);
        let fixtures = acquire_downloaded(
            &fs,
            &fetcher,
            &config,
            "json",
            Path::new("/fx/json"),
            &[],
            &MockLogger::capture_all(),
        )
        .unwrap();
        assert!(fixtures.is_empty());
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_network_disabled_skips() {
        let fs = MockFilesystem::new();
        let config = mirror_config().with_network(false);
        let err = acquire_downloaded(
            &fs,
            &MockFetcher::new(),
            &config,
            "json",
            Path::new("/fx/json"),
            &names(&["a.json"]),
            &MockLogger::capture_all(),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Skip(SkipReason::NetworkDisabled)));
    }

    #[test]
    fn test_download_writes_nested_files() {
        let fs = MockFilesystem::new();
        let fetcher = MockFetcher::new();
        fetcher.add("mock://repo/json/a.json", b"A");
        fetcher.add("mock://repo/json/session/b.json", b"B");
        let dir = PathBuf::from("/fx/json");

        let fixtures = acquire_downloaded(
            &fs,
            &fetcher,
            &mirror_config(),
            "json",
            &dir,
            &names(&["a.json", "session/b.json"]),
            &MockLogger::capture_all(),
        )
        .unwrap();

        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[1].path, dir.join("session/b.json"));
        assert!(fixtures.iter().all(|f| f.origin == FixtureOrigin::Downloaded));
        assert_eq!(fs.get_file(&dir.join("session/b.json")), Some(b"B".to_vec()));
        assert!(fs.exists(&dir.join("session")));
    }

    #[test]
    fn test_download_reuses_present_files() {
        let fs = MockFilesystem::new();
        let fetcher = MockFetcher::new();
        let dir = PathBuf::from("/fx/json");
        fs.add_file(dir.join("a.json"), b"cached".to_vec());
        let logger = MockLogger::capture_all();

        let fixtures = acquire_downloaded(
            &fs,
            &fetcher,
            &mirror_config(),
            "json",
            &dir,
            &names(&["a.json"]),
            &logger,
        )
        .unwrap();

        assert_eq!(fixtures.len(), 1);
        assert!(fetcher.requests().is_empty());
        assert!(logger.contains("reusing"));
    }

    #[test]
    fn test_fetch_error_is_fatal() {
        let fs = MockFilesystem::new();
        let err = acquire_downloaded(
            &fs,
            &MockFetcher::new(),
            &mirror_config(),
            "json",
            Path::new("/fx/json"),
            &names(&["missing.json"]),
            &MockLogger::capture_all(),
        )
        .unwrap_err();
        match err {
            HarnessError::Fatal(SetupError::Download { url, .. }) => {
                assert_eq!(url, "mock://repo/json/missing.json");
            }
            other => panic!("expected download failure, got {other:?}"),
        }
    }

    #[test]
    fn test_file_url_fetcher() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirror.bin");
        std::fs::write(&path, b"bytes").unwrap();

        let fetcher = FileUrlFetcher;
        let url = format!("file://{}", path.display());
        assert_eq!(fetcher.fetch(&url).unwrap(), b"bytes".to_vec());
        assert_eq!(fetcher.fetch(path.to_str().unwrap()).unwrap(), b"bytes".to_vec());
        assert!(matches!(
            fetcher.fetch("https://example.org/a"),
            Err(FetchError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            fetcher.fetch(&format!("file://{}/nope", dir.path().display())),
            Err(FetchError::NotFound(_))
        ));
    }

    /// Answer one HTTP request with `status` and `body`. The handle yields
    /// the request line that was received.
    fn serve_once(status: &'static str, body: &'static [u8]) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
            request_line.trim_end().to_string()
        });
        (base, handle)
    }

    #[test]
    fn test_http_fetcher_returns_body() {
        let (base, server) = serve_once("200 OK", b"payload");
        let fetcher = HttpFetcher::new().without_proxy();

        let url = fixture_url(&base, "json", "a.json");
        assert_eq!(fetcher.fetch(&url).unwrap(), b"payload".to_vec());
        assert_eq!(server.join().unwrap(), "GET /json/a.json HTTP/1.1");
    }

    #[test]
    fn test_http_fetcher_not_found() {
        let (base, server) = serve_once("404 Not Found", b"");
        let fetcher = HttpFetcher::new().without_proxy();

        let err = fetcher.fetch(&format!("{base}missing.json")).unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        server.join().unwrap();
    }

    #[test]
    fn test_http_fetcher_server_error_is_transfer_failure() {
        let (base, server) = serve_once("503 Service Unavailable", b"busy");
        let fetcher = HttpFetcher::new().without_proxy();

        let err = fetcher.fetch(&format!("{base}a.json")).unwrap_err();
        match err {
            FetchError::Transfer(message) => assert!(message.contains("503"), "{message}"),
            other => panic!("expected transfer failure, got {other:?}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_scheme_fetcher_routes_by_scheme() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirror.bin");
        std::fs::write(&path, b"local").unwrap();
        let (base, server) = serve_once("200 OK", b"remote");
        let fetcher = SchemeFetcher::new().with_http(HttpFetcher::new().without_proxy());

        assert_eq!(
            fetcher.fetch(&format!("file://{}", path.display())).unwrap(),
            b"local".to_vec()
        );
        assert_eq!(fetcher.fetch(&format!("{base}a.json")).unwrap(), b"remote".to_vec());
        server.join().unwrap();
        assert!(matches!(
            fetcher.fetch("ftp://example.org/a"),
            Err(FetchError::UnsupportedScheme(_))
        ));
    }

    // ===========================================
    // Generation
    // ===========================================

    #[test]
    fn test_generate_writes_fresh_file() {
        let dir = tempdir().unwrap();
        let class = JsonDriverClass::block_rooted();
        let caps = Capabilities::resolve(class.descriptor());
        let stale = dir.path().join("Generated0_JsonIO.json");
        std::fs::write(&stale, b"stale").unwrap();

        let fixture = generate_if_writable(&class, &caps, &RealFilesystem, dir.path())
            .unwrap()
            .unwrap();

        assert_eq!(fixture.path, stale);
        assert_eq!(fixture.origin, FixtureOrigin::Generated);
        let contents = std::fs::read_to_string(&stale).unwrap();
        assert!(contents.contains("iocheck-json"));
    }

    #[test]
    fn test_generate_skipped_when_ineligible() {
        let dir = tempdir().unwrap();
        let descriptor = DriverDescriptor::new("ParamIO")
            .readable(&[Kind::Block])
            .writeable(&[Kind::Block])
            .supported(&Kind::ALL)
            .read_param(Kind::Block, "sampling_rate", ParamSpec::required("Hz"));
        let caps = Capabilities::resolve(&descriptor);
        let class = JsonDriverClass::block_rooted();

        let generated = generate_if_writable(&class, &caps, &RealFilesystem, dir.path()).unwrap();
        assert!(generated.is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
