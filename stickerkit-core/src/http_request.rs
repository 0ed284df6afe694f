use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Method, RequestBuilder, Response};

use crate::config::ClientConfig;
use crate::error::{StickerKitError, StickerKitResult};
use crate::transport::Transport;

/// A simple wrapper on an HTTP client for fetching from the CDN. Sets sensible defaults such as
/// timeouts, user-agent & ensuring HTTPS, and applies retry middleware for transient failures.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    allow_insecure_http: bool,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl HttpTransport {
    /// Initializes a new `HttpTransport` with the timeout and retries of `config`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: config.request_timeout(),
            max_retries: config.retries(),
            allow_insecure_http: config.insecure_http_allowed(),
        }
    }

    /// Creates a request builder with defaults applied.
    fn req(&self, method: Method, url: &str) -> StickerKitResult<RequestBuilder> {
        if !self.allow_insecure_http && !url.starts_with("https://") {
            return Err(StickerKitError::InvalidInput {
                attribute: "url".to_string(),
                reason: format!("refusing to fetch over plain HTTP: {url}"),
            });
        }

        Ok(self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("stickerkit-core/{}", env!("CARGO_PKG_VERSION")),
            ))
    }

    /// Handles sending a request built by `req` with retries for transient failures.
    async fn handle(&self, request_builder: RequestBuilder) -> StickerKitResult<Response> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries as usize);

        (|| async {
            let request_builder = request_builder.try_clone().ok_or_else(|| {
                RequestHandleError::permanent(
                    "<unknown>".to_string(),
                    None,
                    "request cannot be retried because it is not cloneable".to_string(),
                )
            })?;
            execute_request_builder(request_builder).await
        })
        .retry(backoff)
        .when(RequestHandleError::is_retryable)
        .notify(|err, delay| {
            log::warn!("retrying {} in {delay:?}: {}", err.url, err.error);
        })
        .await
        .map_err(Into::into)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> StickerKitResult<Vec<u8>> {
        let response = self.handle(self.req(Method::GET, url)?).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StickerKitError::NetworkError {
                url: url.to_string(),
                status: Some(status.as_u16()),
                error: format!("request failed with status {status}"),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| StickerKitError::NetworkError {
                url: url.to_string(),
                status: Some(status.as_u16()),
                error: format!("failed to read response body: {err}"),
            })?;
        log::trace!("fetched {} bytes from {url}", body.len());
        Ok(body.to_vec())
    }
}

#[derive(Debug)]
struct RequestHandleError {
    url: String,
    status: Option<u16>,
    error: String,
    retryable: bool,
}

impl RequestHandleError {
    const fn retryable(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: true,
        }
    }

    const fn permanent(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: false,
        }
    }

    const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<RequestHandleError> for StickerKitError {
    fn from(value: RequestHandleError) -> Self {
        Self::NetworkError {
            url: value.url,
            status: value.status,
            error: value.error,
        }
    }
}

async fn execute_request_builder(
    request_builder: RequestBuilder,
) -> Result<Response, RequestHandleError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        RequestHandleError::permanent(
            err.url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            None,
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            if status == 429 || (500..600).contains(&status) {
                return Err(RequestHandleError::retryable(
                    url,
                    Some(status),
                    format!("request error with bad status code {status}"),
                ));
            }
            Ok(resp)
        }
        Err(err) => {
            if err.is_timeout() || err.is_connect() {
                return Err(RequestHandleError::retryable(
                    url,
                    None,
                    format!("request timeout/connect error: {err}"),
                ));
            }

            Err(RequestHandleError::permanent(
                url,
                None,
                format!("request failed: {err}"),
            ))
        }
    }
}
