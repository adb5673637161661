use crate::decode::ChunkDecoder;
use crate::error::{ConfigError, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use lgview_model::{CommandRequest, NetworkInfo};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Raw response body, one item per network read.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Opens one streamed diagnostic request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str, request: &CommandRequest) -> Result<ByteStream, TransportError>;
}

/// How a call to [`send`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Failed(TransportError),
    Cancelled,
}

/// Streams one request through `transport`, handing each decoded piece of
/// text to `on_chunk` in arrival order.
///
/// The token is checked before the request is opened and raced against the
/// open and every read. Once it fires nothing more reaches `on_chunk` and the
/// outcome is [`StreamOutcome::Cancelled`], even if a read error shows up at
/// the same time.
pub async fn send<T, F>(
    transport: &T,
    url: &str,
    request: &CommandRequest,
    cancel: &CancellationToken,
    mut on_chunk: F,
) -> StreamOutcome
where
    T: Transport + ?Sized,
    F: FnMut(String),
{
    if cancel.is_cancelled() {
        tracing::debug!(url, "request cancelled before dispatch");
        return StreamOutcome::Cancelled;
    }

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return StreamOutcome::Cancelled,
        opened = transport.open(url, request) => opened,
    };

    let mut body = match opened {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(url, error = %err, "failed to open stream");
            return StreamOutcome::Failed(err);
        }
    };

    let mut decoder = ChunkDecoder::new();
    let mut received: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = body.next() => Some(next),
        };

        let Some(next) = next else {
            tracing::debug!(url, received, "stream cancelled mid-read");
            return StreamOutcome::Cancelled;
        };

        match next {
            Some(Ok(bytes)) => {
                if cancel.is_cancelled() {
                    return StreamOutcome::Cancelled;
                }
                received += bytes.len() as u64;
                let text = decoder.decode(&bytes);
                if !text.is_empty() {
                    on_chunk(text);
                }
            }
            Some(Err(err)) => {
                if cancel.is_cancelled() {
                    return StreamOutcome::Cancelled;
                }
                tracing::warn!(url, received, error = %err, "stream read failed");
                return StreamOutcome::Failed(err);
            }
            None => {
                let tail = decoder.finish();
                if !tail.is_empty() {
                    on_chunk(tail);
                }
                tracing::debug!(url, received, "stream completed");
                return StreamOutcome::Completed;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout_ms: u64,
    /// Timeout for non-streaming calls such as the network info fetch.
    pub request_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: 15_000,
        }
    }
}

/// [`Transport`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    settings: HttpSettings,
}

impl HttpTransport {
    pub fn new(settings: HttpSettings) -> Result<Self, ConfigError> {
        // No overall timeout here: diagnostic streams run as long as the server keeps writing.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .build()
            .map_err(|err| ConfigError::Client(err.to_string()))?;
        Ok(Self { client, settings })
    }

    /// `GET {base_url}/network/info`.
    pub async fn network_info(&self, base_url: &str) -> Result<NetworkInfo, TransportError> {
        let url = format!("{}/network/info", base_url.trim_end_matches('/'));
        tracing::debug!(%url, "fetching network info");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(Duration::from_millis(self.settings.request_timeout_ms))
            .send()
            .await
            .map_err(|err| TransportError::Connection(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<NetworkInfo>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &str, request: &CommandRequest) -> Result<ByteStream, TransportError> {
        tracing::debug!(url, host = %request.target, "opening diagnostic stream");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError::Connection(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Err(TransportError::MissingBody);
        }

        let body = response
            .bytes_stream()
            .map(|item| item.map_err(|err| TransportError::Read(err.to_string())));
        Ok(body.boxed())
    }
}
