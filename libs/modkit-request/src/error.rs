use crate::response::Response;
use std::time::Duration;
use thiserror::Error;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// Request execution error types
///
/// HTTP-level outcomes (4xx/5xx) are never reported through this type by the
/// executor; they arrive as an ordinary [`Response`]. Use
/// [`Response::ensure_success`] to opt into [`HttpError::UnsuccessfulStatus`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// Request was executed without a URL
    #[error("Request URL is not set")]
    MissingUrl,

    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Invalid URL (failed to parse)
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field is
    /// a diagnostic message for logging only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        /// The URL that failed to parse
        url: String,
        /// Structured failure classification for programmatic matching
        kind: InvalidUriKind,
        /// Diagnostic message (unstable format, for logging only)
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme {
        /// The URL scheme that was rejected
        scheme: String,
        /// Reason the scheme was rejected
        reason: String,
    },

    /// Post data holds a file part but was serialized as URL-encoded form
    #[error("Post data field '{key}' carries binary content and requires multipart encoding")]
    MultipartRequired {
        /// Key of the first binary field
        key: String,
    },

    /// Request attempt timed out
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Request was cancelled through its cancellation token
    #[error("Request was cancelled")]
    Cancelled,

    /// Transport error (network, connection, etc)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Response body stream failed earlier and cannot be read again
    #[error("Response body is unavailable after a failed read")]
    BodyUnavailable,

    /// Status outside the accepted success set, raised by `ensure_success`
    #[error("HTTP {} returned by {}", .0.status(), .0.request_url())]
    UnsuccessfulStatus(Box<Response>),

    /// A pre-dispatch hook rejected the request
    #[error("Pre-dispatch hook failed: {0}")]
    Hook(String),

    /// Blocking entry point was called from inside an async runtime
    #[error("Blocking call issued from within an async runtime; use the async variant")]
    BlockingInAsyncContext,

    /// Blocking runtime could not be started
    #[error("Failed to start blocking runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parsing error
    #[error("XML parsing failed: {0}")]
    Xml(String),

    /// Form URL encoding error
    #[error("Form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// Form URL decoding error
    #[error("Form decoding failed: {0}")]
    FormDecode(#[from] serde_urlencoded::de::Error),
}

impl HttpError {
    /// Returns the response carried by [`HttpError::UnsuccessfulStatus`].
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            HttpError::UnsuccessfulStatus(response) => Some(response),
            _ => None,
        }
    }

    /// Consumes the error and returns the carried response, if any.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            HttpError::UnsuccessfulStatus(response) => Some(*response),
            _ => None,
        }
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<quick_xml::Error> for HttpError {
    fn from(err: quick_xml::Error) -> Self {
        HttpError::Xml(err.to_string())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    struct TestError(&'static str);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl Error for TestError {}

    #[test]
    fn test_transport_error_preserves_source() {
        let err = HttpError::Transport(Box::new(TestError("connection refused")));

        let source = err.source().expect("transport error should have a source");
        let downcast = source
            .downcast_ref::<TestError>()
            .expect("should downcast to TestError");
        assert_eq!(downcast.0, "connection refused");
    }

    #[test]
    fn test_multipart_required_names_key() {
        let err = HttpError::MultipartRequired {
            key: "avatar".to_owned(),
        };
        assert!(err.to_string().contains("'avatar'"));
        assert!(err.response().is_none());
    }

    #[test]
    fn test_runtime_error_chain() {
        let err = HttpError::Runtime(std::io::Error::other("no threads"));

        let mut count = 0;
        let mut current: Option<&(dyn Error + 'static)> = Some(&err);
        while let Some(e) = current {
            count += 1;
            current = e.source();
        }
        assert_eq!(count, 2, "HttpError and io::Error should both be in the chain");
    }
}
