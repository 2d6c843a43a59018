use crate::error::EpisodeError;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Seam for retrieving episode audio to a local path.
///
/// The trait exists so the batch loop can be exercised without a network;
/// production uses [`HttpFetcher`], tests use [`MockFetcher`].
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download `url` to `dest`, overwriting any previous content.
    ///
    /// On failure the partial file, if any, is left in place; the caller
    /// owns cleanup of the scratch path.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), EpisodeError>;
}

/// Streaming HTTP downloader.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AudioFetcher for HttpFetcher {
    /// Stream the response body to disk chunk by chunk, so arbitrarily
    /// large audio files never sit in memory. When the server advertises a
    /// Content-Length, a short body is reported as a failure.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), EpisodeError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(EpisodeError::Status(response.status()));
        }

        let content_length = response.content_length();
        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;

        if let Some(expected) = content_length {
            if downloaded != expected {
                return Err(EpisodeError::Incomplete {
                    got: downloaded,
                    expected,
                });
            }
        }

        tracing::debug!("downloaded {} bytes to {:?}", downloaded, dest);
        Ok(())
    }
}

/// Fetcher stand-in for tests: writes a fixed payload instead of hitting
/// the network, or fails after leaving a partial file behind.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    payload: Vec<u8>,
    should_fail: bool,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            payload: b"fake audio bytes".to_vec(),
            should_fail: false,
            calls: Default::default(),
        }
    }

    pub fn with_payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    /// Make every fetch fail after writing half the payload, imitating a
    /// connection dropped mid-transfer.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of fetches attempted so far (shared across clones).
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioFetcher for MockFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), EpisodeError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if self.should_fail {
            let half = &self.payload[..self.payload.len() / 2];
            tokio::fs::write(dest, half).await?;
            return Err(EpisodeError::Io(std::io::Error::other(
                "mock download failure",
            )));
        }

        tokio::fs::write(dest, &self.payload).await?;
        Ok(())
    }
}
