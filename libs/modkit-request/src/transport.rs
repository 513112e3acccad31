//! Transport seam between the executor and the network.
//!
//! A [`Transport`] is a type-erased tower service. It either returns a
//! response, a protocol error that still carries a response (4xx/5xx surfaced
//! as an error by some transports), or a failure without any response. The
//! executor normalizes the first two into a [`Response`](crate::Response).
//!
//! [`Transport::from_config`] builds the production stack:
//!
//! ```text
//! DefaultHeaders -> Decompression -> FollowRedirect -> hyper client
//! ```
//!
//! Tests plug in any service with [`Transport::from_service`].

use crate::config::{TransportConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::{DefaultHeadersLayer, RedirectPolicy};
use crate::tls;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::fmt;
use thiserror::Error;
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::follow_redirect::FollowRedirectLayer;

/// Type-erased response body (raw or decompressed)
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Wire request handed to a transport
pub type TransportRequest = http::Request<Full<Bytes>>;

/// Wire response returned by a transport
pub type TransportResponse = http::Response<ResponseBody>;

/// Error outcome of a transport call
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered, but the transport reports the answer as an error
    #[error("protocol error: HTTP {}", .0.status())]
    Protocol(Box<TransportResponse>),

    /// No usable response was received
    #[error(transparent)]
    Failure(#[from] HttpError),
}

/// Cloneable, type-erased HTTP transport
#[derive(Clone)]
pub struct Transport {
    service: BoxCloneSyncService<TransportRequest, TransportResponse, TransportError>,
    security: TransportSecurity,
}

impl Transport {
    /// Wrap an arbitrary tower service
    ///
    /// The resulting transport accepts both `http://` and `https://` URLs.
    #[must_use]
    pub fn from_service<S>(service: S) -> Self
    where
        S: Service<TransportRequest, Response = TransportResponse, Error = TransportError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        Self {
            service: BoxCloneSyncService::new(service),
            security: TransportSecurity::AllowInsecureHttp,
        }
    }

    /// Build the hyper-based transport
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails or the user agent is not a
    /// valid header value
    pub fn from_config(config: &TransportConfig) -> Result<Self, HttpError> {
        let https = tls::https_connector(config.tls_roots, config.security)?;

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        let hyper_client = builder.build::<_, Full<Bytes>>(https);

        let service = ServiceBuilder::new()
            .layer(DefaultHeadersLayer::user_agent(&config.user_agent)?)
            .layer(
                DecompressionLayer::new()
                    .gzip(config.decompression)
                    .br(config.decompression)
                    .deflate(config.decompression),
            )
            .layer(FollowRedirectLayer::with_policy(RedirectPolicy::new(
                config.max_redirects,
            )))
            .service(hyper_client)
            .map_response(box_response_body)
            .map_err(|err| TransportError::Failure(HttpError::from(err)));

        tracing::debug!(
            max_redirects = config.max_redirects,
            decompression = config.decompression,
            security = ?config.security,
            "built hyper transport"
        );

        Ok(Self {
            service: BoxCloneSyncService::new(service),
            security: config.security,
        })
    }

    /// Override the security mode reported to the executor
    #[must_use]
    pub fn with_security(mut self, security: TransportSecurity) -> Self {
        self.security = security;
        self
    }

    #[must_use]
    pub fn security(&self) -> TransportSecurity {
        self.security
    }

    /// Dispatch one request
    ///
    /// # Errors
    /// Returns the transport's protocol error or failure
    pub async fn call(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.service.clone().oneshot(request).await
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}

fn box_response_body<B>(response: http::Response<B>) -> TransportResponse
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    http::Response::from_parts(parts, body.map_err(Into::into).boxed())
}

/// Box a fixed body into a [`ResponseBody`]
#[must_use]
pub fn full_body(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}
