//! Upstream Source - reconnecting Server-Sent-Events client
//!
//! Opens a streaming GET against the configured URL, decodes
//! `text/event-stream` frames and forwards each `message` frame as an
//! `UpstreamItem::Event`. Every session is bracketed by `Connected` and
//! `Disconnected` items so the broadcast loop can track state.
//!
//! # Reconnect
//!
//! - Connection failures and lost sessions are retried with exponential
//!   backoff (`reconnect_initial` doubling up to `reconnect_max`)
//! - A successful connect resets the schedule and the failure count
//! - A server `retry:` field replaces the initial delay
//! - The last seen event ID is sent as `Last-Event-ID`
//! - With `max_retries` set, that many consecutive failed attempts end the
//!   task with `IngestionError::Exhausted` and close the channel

use std::sync::Arc;
use std::time::Duration;

use chirp_config::UpstreamConfig;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::UpstreamItem;
use crate::backoff::Backoff;
use crate::error::{IngestionError, Result};
use crate::metrics::UpstreamMetrics;
use crate::sse::{SseDecoder, decode_event};

#[cfg(test)]
#[path = "upstream_test.rs"]
mod tests;

/// Default ingestion channel capacity
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

const LAST_EVENT_ID: &str = "Last-Event-ID";

/// Upstream source configuration
///
/// Built from the `[upstream]` config section; `Default` uses that section's
/// defaults.
#[derive(Debug, Clone)]
pub struct UpstreamSourceConfig {
    /// SSE endpoint
    pub url: String,

    /// First reconnect delay
    pub reconnect_initial: Duration,

    /// Reconnect delay cap
    pub reconnect_max: Duration,

    /// Consecutive failed attempts before giving up (None = retry forever)
    pub max_retries: Option<u32>,

    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,

    /// No bytes for this long means the session is lost
    pub read_timeout: Duration,

    /// Largest SSE line or frame kept in memory
    pub max_frame_size: usize,

    /// Capacity of the channel to the broadcast loop
    pub channel_capacity: usize,
}

impl From<&UpstreamConfig> for UpstreamSourceConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            url: config.url.clone(),
            reconnect_initial: config.reconnect_initial(),
            reconnect_max: config.reconnect_max(),
            max_retries: config.max_retries,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            max_frame_size: config.max_frame_size,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for UpstreamSourceConfig {
    fn default() -> Self {
        Self::from(&UpstreamConfig::default())
    }
}

/// How a streaming session ended
enum SessionEnd {
    /// Upstream closed, errored or went quiet
    Lost(String),
    /// Broadcast loop dropped its receiver
    ReceiverGone,
    Cancelled,
}

/// Reconnecting SSE client
#[derive(Debug)]
pub struct UpstreamSource {
    config: UpstreamSourceConfig,
    client: reqwest::Client,
    metrics: Arc<UpstreamMetrics>,
}

impl UpstreamSource {
    /// Build the source and its HTTP client
    pub fn new(config: UpstreamSourceConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(IngestionError::InvalidConfig("upstream url is empty".into()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("chirp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestionError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config,
            client,
            metrics: Arc::new(UpstreamMetrics::new()),
        })
    }

    /// Shared handle to the ingestion counters
    pub fn metrics(&self) -> Arc<UpstreamMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run on a new task, returning the receiving end of the ingestion channel
    pub fn spawn(
        self,
        cancel: CancellationToken,
    ) -> (JoinHandle<Result<()>>, mpsc::Receiver<UpstreamItem>) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let handle = tokio::spawn(async move { self.run(tx, cancel).await });
        (handle, rx)
    }

    /// Connect, stream and reconnect until cancelled or exhausted
    pub async fn run(
        &self,
        tx: mpsc::Sender<UpstreamItem>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut backoff = Backoff::new(self.config.reconnect_initial, self.config.reconnect_max);
        let mut failures: u32 = 0;
        let mut last_event_id: Option<String> = None;

        info!(url = %self.config.url, "upstream source starting");

        loop {
            let connected = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                result = self.connect(last_event_id.as_deref()) => result,
            };

            match connected {
                Ok(response) => {
                    failures = 0;
                    backoff.reset();
                    self.metrics.connected();
                    info!(url = %self.config.url, "upstream connected");

                    if tx.send(UpstreamItem::Connected).await.is_err() {
                        return Ok(());
                    }

                    match self
                        .stream(response, &tx, &cancel, &mut last_event_id, &mut backoff)
                        .await
                    {
                        SessionEnd::Cancelled | SessionEnd::ReceiverGone => return Ok(()),
                        SessionEnd::Lost(reason) => {
                            self.metrics.disconnected();
                            warn!(reason = %reason, "upstream session ended");
                            if tx.send(UpstreamItem::disconnected(reason)).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    self.metrics.connect_failed();

                    if let Some(max) = self.config.max_retries
                        && failures > max
                    {
                        error!(attempts = failures, error = %e, "giving up on upstream");
                        return Err(IngestionError::Exhausted { attempts: failures });
                    }
                    warn!(attempt = failures, error = %e, "upstream connect failed");
                }
            }

            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "reconnecting to upstream");
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect(&self, last_event_id: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .get(&self.config.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = last_event_id {
            request = request.header(LAST_EVENT_ID, id);
        }

        let response = request.send().await.map_err(IngestionError::connection)?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestionError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn stream(
        &self,
        response: reqwest::Response,
        tx: &mpsc::Sender<UpstreamItem>,
        cancel: &CancellationToken,
        last_event_id: &mut Option<String>,
        backoff: &mut Backoff,
    ) -> SessionEnd {
        let mut decoder = SseDecoder::with_last_event_id(last_event_id.take())
            .with_max_frame_size(self.config.max_frame_size);
        let mut body = std::pin::pin!(response.bytes_stream());

        let end = 'session: loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break 'session SessionEnd::Cancelled,
                next = tokio::time::timeout(self.config.read_timeout, body.next()) => next,
            };

            let chunk = match next {
                Err(_) => break SessionEnd::Lost("read timeout".into()),
                Ok(None) => break SessionEnd::Lost("stream closed by upstream".into()),
                Ok(Some(Err(e))) => break SessionEnd::Lost(e.to_string()),
                Ok(Some(Ok(chunk))) => chunk,
            };

            self.metrics.bytes(chunk.len() as u64);

            for frame in decoder.push(&chunk) {
                if !frame.is_message() {
                    trace!(event = %frame.event, "skipping non-message frame");
                    continue;
                }

                match decode_event(&frame) {
                    Ok(event) => {
                        self.metrics.event_forwarded();
                        if tx.send(UpstreamItem::event(event)).await.is_err() {
                            break 'session SessionEnd::ReceiverGone;
                        }
                    }
                    Err(e) => {
                        self.metrics.decode_error();
                        warn!(error = %e, "dropping malformed upstream frame");
                    }
                }
            }

            let oversized = decoder.take_oversized();
            if oversized > 0 {
                for _ in 0..oversized {
                    self.metrics.decode_error();
                }
                warn!(
                    dropped = oversized,
                    max_frame_size = self.config.max_frame_size,
                    "dropping oversized upstream frame"
                );
            }

            if let Some(retry) = decoder.take_retry() {
                debug!(retry_ms = retry.as_millis() as u64, "upstream announced retry delay");
                backoff.set_initial(retry);
            }
        };

        *last_event_id = decoder.last_event_id().map(str::to_owned);
        end
    }
}
