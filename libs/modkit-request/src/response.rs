use crate::blocking;
use crate::charset::Charset;
use crate::collections::CookieCollection;
use crate::config::DEFAULT_MAX_BODY_SIZE;
use crate::error::HttpError;
use crate::transport::{ResponseBody, TransportResponse};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper::ext::ReasonPhrase;
use std::fmt;
use std::time::Duration;
use tower_http::follow_redirect::RequestUri;

/// Body bytes and their decoded text, produced together on first read
struct Materialized {
    bytes: Bytes,
    text: String,
}

/// Executed HTTP response
///
/// Status, headers and the originating request details are available
/// immediately. The body stream is read lazily: the first call to
/// [`body`](Self::body) or [`binary_body`](Self::binary_body) drains it,
/// decodes it with the charset announced in `Content-Type` and caches both
/// forms. Later calls return the cached values without touching the network.
///
/// 4xx and 5xx statuses are ordinary responses here; use
/// [`ensure_success`](Self::ensure_success) to turn them into an error.
pub struct Response {
    status: StatusCode,
    /// Non-canonical reason phrase sent by the server
    reason: Option<String>,
    headers: HeaderMap,
    method: Method,
    request_url: String,
    response_uri: Uri,
    charset: Charset,
    stream: Option<ResponseBody>,
    cached: Option<Materialized>,
    failed: bool,
    max_body_size: usize,
    /// Budget for draining the body, counted from the first body access
    read_timeout: Option<Duration>,
}

impl Response {
    /// Wrap a transport response
    ///
    /// `request_url` is the effective URL the request was sent to. The
    /// response URI is taken from the redirect layer when present, otherwise
    /// it is the request URL.
    #[must_use]
    pub fn from_http(
        response: TransportResponse,
        method: Method,
        request_url: impl Into<String>,
    ) -> Self {
        let request_url = request_url.into();
        let (parts, body) = response.into_parts();
        let response_uri = parts
            .extensions
            .get::<RequestUri>()
            .map(|uri| uri.0.clone())
            .or_else(|| request_url.parse().ok())
            .unwrap_or_default();
        let reason = parts
            .extensions
            .get::<ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
        let charset = Charset::from_content_type(
            parts
                .headers
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        Self {
            status: parts.status,
            reason,
            headers: parts.headers,
            method,
            request_url,
            response_uri,
            charset,
            stream: Some(body),
            cached: None,
            failed: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            read_timeout: None,
        }
    }

    /// Limit the number of bytes the body may materialize to
    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub(crate) fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase sent by the server, or the canonical phrase of the
    /// status (`"Not Found"`); empty if neither is known
    #[must_use]
    pub fn status_description(&self) -> &str {
        self.reason
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Effective URL of the originating request, query string included
    #[must_use]
    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    /// URI that produced this response, after any redirects
    #[must_use]
    pub fn response_uri(&self) -> &Uri {
        &self.response_uri
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Charset used to decode the body, detected once from `Content-Type`
    #[must_use]
    pub fn encoding(&self) -> Charset {
        self.charset
    }

    /// Cookies set by the server through `Set-Cookie`
    #[must_use]
    pub fn cookies(&self) -> CookieCollection {
        CookieCollection::from_set_cookie_headers(&self.headers)
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Decoded body text
    ///
    /// # Errors
    /// Returns `HttpError::BodyTooLarge`, `HttpError::Timeout` or
    /// `HttpError::Transport` if the first read fails, and
    /// `HttpError::BodyUnavailable` on every call after a failed read.
    pub async fn body(&mut self) -> Result<&str, HttpError> {
        self.materialize().await?;
        self.cached().map(|m| m.text.as_str())
    }

    /// Raw body bytes
    ///
    /// # Errors
    /// Same as [`body`](Self::body).
    pub async fn binary_body(&mut self) -> Result<&Bytes, HttpError> {
        self.materialize().await?;
        self.cached().map(|m| &m.bytes)
    }

    /// Blocking variant of [`body`](Self::body)
    ///
    /// # Errors
    /// Same as [`body`](Self::body), plus `HttpError::BlockingInAsyncContext`.
    pub fn body_blocking(&mut self) -> Result<&str, HttpError> {
        blocking::block_on(self.materialize())?;
        self.cached().map(|m| m.text.as_str())
    }

    /// Blocking variant of [`binary_body`](Self::binary_body)
    ///
    /// # Errors
    /// Same as [`body_blocking`](Self::body_blocking).
    pub fn binary_body_blocking(&mut self) -> Result<&Bytes, HttpError> {
        blocking::block_on(self.materialize())?;
        self.cached().map(|m| &m.bytes)
    }

    /// Pass 200 and 201 through, reject every other status
    ///
    /// # Errors
    /// Returns `HttpError::UnsuccessfulStatus` carrying this response.
    pub fn ensure_success(self) -> Result<Self, HttpError> {
        match self.status {
            StatusCode::OK | StatusCode::CREATED => Ok(self),
            _ => Err(HttpError::UnsuccessfulStatus(Box::new(self))),
        }
    }

    fn cached(&self) -> Result<&Materialized, HttpError> {
        self.cached.as_ref().ok_or(HttpError::BodyUnavailable)
    }

    async fn materialize(&mut self) -> Result<(), HttpError> {
        if self.cached.is_some() {
            return Ok(());
        }
        if self.failed {
            return Err(HttpError::BodyUnavailable);
        }

        let bytes = match self.stream.take() {
            Some(stream) => {
                let read = read_limited(stream, self.max_body_size);
                let result = match self.read_timeout {
                    Some(timeout) => tokio::time::timeout(timeout, read)
                        .await
                        .unwrap_or(Err(HttpError::Timeout(timeout))),
                    None => read.await,
                };
                match result {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        self.failed = true;
                        return Err(err);
                    }
                }
            }
            None => Bytes::new(),
        };

        let text = self.charset.decode(&bytes);
        tracing::trace!(
            bytes = bytes.len(),
            charset = %self.charset,
            "materialized response body"
        );
        self.cached = Some(Materialized { bytes, text });
        Ok(())
    }
}

/// Drain `body`, failing as soon as more than `limit` bytes arrive
async fn read_limited(body: ResponseBody, limit: usize) -> Result<Bytes, HttpError> {
    let mut collected = BytesMut::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            let actual = collected.len() + chunk.len();
            if actual > limit {
                return Err(HttpError::BodyTooLarge { limit, actual });
            }
            collected.extend_from_slice(chunk);
        }
    }
    Ok(collected.freeze())
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("method", &self.method)
            .field("request_url", &self.request_url)
            .field("response_uri", &self.response_uri)
            .field("charset", &self.charset)
            .field("materialized", &self.cached.is_some())
            .finish_non_exhaustive()
    }
}
