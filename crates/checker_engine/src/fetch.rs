use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use checker_core::FailureKind;
use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::{EngineEvent, FetchError, FetchMetadata, FetchOutput};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// Upper bound on body bytes read per probe.
    pub window_bytes: usize,
    pub user_agent: String,
    /// Streaming sources routinely serve broken certificate chains.
    pub accept_invalid_certs: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            redirect_limit: 10,
            window_bytes: 4096,
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_invalid_certs: true,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return at most the configured window of its body.
    ///
    /// Any status other than 200 is reported as [`FailureKind::HttpStatus`].
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

/// Hands each worker its own fetcher, so no connection state is shared.
pub trait FetcherFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Fetcher>, FetchError>;
}

/// Production fetcher. One instance is meant to serve one worker; the
/// reported redirect count assumes fetches do not overlap.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
    redirect_counter: Arc<AtomicUsize>,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = build_client(&settings, redirect_counter.clone())?;
        Ok(Self {
            settings,
            client,
            redirect_counter,
        })
    }
}

fn build_client(
    settings: &FetchSettings,
    redirect_counter: Arc<AtomicUsize>,
) -> Result<reqwest::Client, FetchError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        let hops = attempt.previous().len();
        redirect_counter.store(hops, Ordering::Relaxed);
        if hops > redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .user_agent(settings.user_agent.clone())
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        // A partially read body must not park a connection in the pool.
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let parsed = url::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {}", parsed.scheme()),
            ));
        }
        self.redirect_counter.store(0, Ordering::Relaxed);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = read_window(response, self.settings.window_bytes).await;

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            status: status.as_u16(),
            redirect_count: self.redirect_counter.load(Ordering::Relaxed),
            content_type,
            byte_len: bytes.len(),
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

/// Reads up to `limit` body bytes, then drops the response.
///
/// A body error keeps whatever arrived before it.
async fn read_window(response: reqwest::Response, limit: usize) -> Vec<u8> {
    let mut window = Vec::with_capacity(limit.min(64 * 1024));
    let mut stream = response.bytes_stream();
    while window.len() < limit {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let take = (limit - window.len()).min(chunk.len());
                window.extend_from_slice(&chunk[..take]);
            }
            Some(Err(err)) => {
                engine_debug!("body read stopped after {} bytes: {}", window.len(), err);
                break;
            }
            None => break,
        }
    }
    window
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_connect() {
        return FetchError::new(FailureKind::Connect, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

/// Builds one [`ReqwestFetcher`] per worker from shared settings.
#[derive(Debug, Clone)]
pub struct ReqwestFetcherFactory {
    settings: FetchSettings,
}

impl ReqwestFetcherFactory {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }
}

impl FetcherFactory for ReqwestFetcherFactory {
    fn create(&self) -> Result<Arc<dyn Fetcher>, FetchError> {
        Ok(Arc::new(ReqwestFetcher::new(self.settings.clone())?))
    }
}
