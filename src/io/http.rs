use async_trait::async_trait;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderName, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ArchiveSource;
use anyhow::{Result, bail};

/// Size of each ranged request when downloading an archive
const CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Inclusive byte range, as used by the `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Value for the `Range` header, resuming at `from`.
    fn header_from(&self, from: u64) -> String {
        format!("bytes={}-{}", from, self.end)
    }
}

/// Split `size` bytes into consecutive ranges of at most `chunk` bytes.
pub fn chunk_ranges(size: u64, chunk: u64) -> Vec<ByteRange> {
    let chunk = chunk.max(1);
    (0..size.div_ceil(chunk))
        .map(|i| {
            let start = i * chunk;
            ByteRange {
                start,
                end: (start + chunk).min(size) - 1,
            }
        })
        .collect()
}

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * u64::from(attempt))
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Remote archive fetched over HTTP(S)
pub struct HttpSource {
    client: Client,
    url: String,
    size: Option<u64>,
    accepts_ranges: bool,
    chunk_size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpSource {
    /// Create a new HTTP source
    ///
    /// This sends a HEAD request to learn the archive size and whether the
    /// server honours Range requests
    pub async fn new(url: String) -> Result<Self> {
        // Fails only when a provider is already installed
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let resp = client.head(&url).send().await?;
        if !resp.status().is_success() {
            bail!("HEAD {} failed with status: {}", url, resp.status());
        }

        let header = |name: HeaderName| resp.headers().get(name).and_then(|v| v.to_str().ok());
        let accepts_ranges = header(ACCEPT_RANGES).is_some_and(|v| v.contains("bytes"));
        let size = header(CONTENT_LENGTH).and_then(|s| s.parse().ok());

        debug!(%url, ?size, accepts_ranges, "Probed remote archive");

        Ok(Self {
            client,
            url,
            size,
            accepts_ranges,
            chunk_size: CHUNK_SIZE,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    fn account(&self, bytes: usize) {
        self.transferred_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Append `range` to `buf`. Short responses are resumed where they
    /// stopped; timeouts and connection errors are retried with backoff.
    async fn fetch_range(&self, range: ByteRange, buf: &mut Vec<u8>) -> Result<()> {
        let mut next = range.start;
        let mut attempt = 0;

        while next <= range.end {
            let request = self
                .client
                .get(&self.url)
                .header(RANGE, range.header_from(next));
            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) if is_transient(&e) => {
                    attempt += 1;
                    if attempt >= self.max_retry {
                        bail!("giving up on {} after {} attempts: {}", self.url, attempt, e);
                    }
                    warn!(
                        attempt,
                        max = self.max_retry,
                        error = %e,
                        "Range request failed, retrying"
                    );
                    tokio::time::sleep(backoff(attempt)).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if resp.status() != StatusCode::PARTIAL_CONTENT {
                bail!("range request got status {}", resp.status());
            }
            let body = resp.bytes().await?;
            if body.is_empty() {
                bail!("server sent no data for {}", range.header_from(next));
            }

            let wanted = (range.end - next + 1) as usize;
            let take = body.len().min(wanted);
            buf.extend_from_slice(&body[..take]);
            next += take as u64;
            self.account(take);
        }

        Ok(())
    }

    async fn fetch_whole(&self) -> Result<Vec<u8>> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            bail!("GET {} failed with status: {}", self.url, resp.status());
        }
        let body = resp.bytes().await?;
        self.account(body.len());
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ArchiveSource for HttpSource {
    async fn load(&self) -> Result<Vec<u8>> {
        let size = match self.size {
            Some(size) if self.accepts_ranges => size,
            _ => {
                debug!(url = %self.url, "No range support, downloading in one request");
                return self.fetch_whole().await;
            }
        };

        let mut buf = Vec::with_capacity(size as usize);
        for range in chunk_ranges(size, self.chunk_size) {
            self.fetch_range(range, &mut buf).await?;
        }
        Ok(buf)
    }

    fn describe(&self) -> &str {
        &self.url
    }
}
