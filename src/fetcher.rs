// Resource fetcher - downloads the bank page and the exchange-rate CSV

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::EtlError;
use crate::logger::ProgressLog;

// ============================================================================
// TRANSPORT
// ============================================================================

/// Fetch - anything that can turn a URL into response bytes
///
/// The pipeline only talks to this trait, so tests can serve fixtures
/// without touching the network.
pub trait Fetch {
    /// GET `url` and return the body. Non-success statuses are errors.
    fn get(&self, url: &str) -> Result<Vec<u8>, EtlError>;
}

/// Blocking HTTP transport
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, EtlError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| EtlError::Network(format!("cannot build HTTP client: {}", e)))?;

        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, EtlError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| EtlError::Network(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::Network(format!("{} returned HTTP {}", url, status)));
        }

        let body = response
            .bytes()
            .map_err(|e| EtlError::Network(format!("reading body of {} failed: {}", url, e)))?;

        Ok(body.to_vec())
    }
}

// ============================================================================
// LOGGED OPERATIONS
// ============================================================================

/// Download `url` into memory
pub fn fetch(source: &dyn Fetch, url: &str, log: &ProgressLog) -> Result<Vec<u8>, EtlError> {
    let what = format!("Downloading {}", url);
    log.log_progress(&format!("{} started", what))?;

    match source.get(url) {
        Ok(body) => {
            log.log_progress(&format!("{} completed ({} bytes)", what, body.len()))?;
            Ok(body)
        }
        Err(e) => Err(log.failed(&what, e)),
    }
}

/// Download `url` and write it to `local_path`, replacing any existing file
pub fn fetch_to_file(
    source: &dyn Fetch,
    url: &str,
    local_path: &Path,
    log: &ProgressLog,
) -> Result<(), EtlError> {
    let what = format!("Downloading {} to {}", url, local_path.display());
    log.log_progress(&format!("{} started", what))?;

    let result = source
        .get(url)
        .and_then(|body| fs::write(local_path, body).map_err(|e| EtlError::io(local_path, e)));

    match result {
        Ok(()) => {
            log.log_progress(&format!("{} completed", what))?;
            Ok(())
        }
        Err(e) => Err(log.failed(&what, e)),
    }
}
