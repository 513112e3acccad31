//! Request execution.
//!
//! Turns a populated [`Request`] into a wire request, dispatches it through a
//! [`Transport`] and normalizes the outcome:
//!
//! - a response, or a protocol error carrying a response, becomes a
//!   [`Response`] whatever its status
//! - a failure without a response (DNS, connection refused, timeout,
//!   cancellation) becomes an [`HttpError`]
//!
//! Configuration problems (missing URL, bad scheme, invalid header) are
//! reported before any network activity.

use crate::collections::QueryString;
use crate::config::{TransportConfig, TransportSecurity};
use crate::error::{HttpError, InvalidUriKind};
use crate::multipart;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{Transport, TransportError, TransportRequest};
use bytes::Bytes;
use http::header::{
    ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue,
    USER_AGENT,
};
use http::{Method, Uri};
use http_body_util::Full;
use tokio_util::sync::CancellationToken;

const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";

/// Body selected for the wire, with the content type rule it implies
enum WireBody {
    None,
    /// Text or binary body; content type only if set explicitly
    Raw(Bytes),
    /// Content type forced to `multipart/form-data; boundary=...`
    Multipart { bytes: Bytes, boundary: String },
    /// Content type defaults to `application/x-www-form-urlencoded`
    UrlEncoded(Bytes),
}

/// `url` joined with the serialized query string
///
/// # Errors
/// Returns `HttpError::MissingUrl` for an empty URL, or
/// `HttpError::FormEncode` if the query string cannot be serialized
pub(crate) fn effective_url(url: &str, query_string: &QueryString) -> Result<String, HttpError> {
    if url.is_empty() {
        return Err(HttpError::MissingUrl);
    }
    query_string.append_to(url)
}

fn parse_uri(url: &str, security: TransportSecurity) -> Result<Uri, HttpError> {
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::ParseError,
            reason: e.to_string(),
        })?;

    if uri.authority().is_none() {
        return Err(HttpError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    match uri.scheme_str() {
        Some("https") => Ok(uri),
        Some("http") => match security {
            TransportSecurity::AllowInsecureHttp => Ok(uri),
            TransportSecurity::TlsOnly => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
            }),
        },
        Some(scheme) => Err(HttpError::InvalidScheme {
            scheme: scheme.to_owned(),
            reason: "only http:// and https:// schemes are supported".to_owned(),
        }),
        None => Err(HttpError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::MissingScheme,
            reason: "missing scheme".to_owned(),
        }),
    }
}

/// Methods that send post data; others ignore it
fn carries_post_data(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn resolve_body(request: &Request) -> Result<WireBody, HttpError> {
    if let Some(text) = request.body.as_deref().filter(|text| !text.is_empty()) {
        return Ok(WireBody::Raw(Bytes::from(request.encoding.encode(text))));
    }
    if let Some(binary) = &request.binary_body {
        return Ok(WireBody::Raw(binary.clone()));
    }
    if !carries_post_data(&request.method) || request.post_data.is_empty() {
        return Ok(WireBody::None);
    }

    if request.post_data.is_multipart() {
        let boundary = multipart::generate_boundary();
        let bytes = multipart::encode(&request.post_data, &boundary);
        Ok(WireBody::Multipart { bytes, boundary })
    } else {
        let encoded = request.post_data.to_url_encoded()?;
        Ok(WireBody::UrlEncoded(Bytes::from(encoded)))
    }
}

fn request_headers(request: &Request) -> Result<HeaderMap, HttpError> {
    let mut headers = request.headers.to_header_map()?;

    if let Some(accept) = &request.accept {
        headers.insert(ACCEPT, HeaderValue::try_from(accept.as_str())?);
    }
    if let Some(user_agent) = &request.user_agent {
        headers.insert(USER_AGENT, HeaderValue::try_from(user_agent.as_str())?);
    }
    if let Some(cookie) = request.cookies.to_header_value() {
        headers.append(COOKIE, HeaderValue::try_from(cookie)?);
    }
    if let Some(credentials) = &request.credentials
        && !headers.contains_key(AUTHORIZATION)
    {
        headers.insert(AUTHORIZATION, credentials.basic_header_value()?);
    }
    if let Some(content_type) = &request.content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::try_from(content_type.as_str())?);
    }
    Ok(headers)
}

/// Serialize `request` into a wire request, returning it with the effective URL
pub(crate) fn build_wire_request(
    request: &Request,
    security: TransportSecurity,
) -> Result<(TransportRequest, String), HttpError> {
    let url = effective_url(&request.url, &request.query_string)?;
    let uri = parse_uri(&url, security)?;
    let mut headers = request_headers(request)?;

    let bytes = match resolve_body(request)? {
        WireBody::None => None,
        WireBody::Raw(bytes) => Some(bytes),
        WireBody::Multipart { bytes, boundary } => {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::try_from(multipart::content_type(&boundary))?,
            );
            Some(bytes)
        }
        WireBody::UrlEncoded(bytes) => {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URL_ENCODED));
            }
            Some(bytes)
        }
    };
    if let Some(bytes) = &bytes {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    }

    let mut wire = http::Request::builder()
        .method(request.method.clone())
        .uri(uri)
        .body(Full::new(bytes.unwrap_or_default()))?;
    *wire.headers_mut() = headers;
    Ok((wire, url))
}

/// Run the full request algorithm
pub(crate) async fn execute(
    mut request: Request,
    cancel: Option<CancellationToken>,
) -> Result<Response, HttpError> {
    let security = request
        .transport
        .as_ref()
        .map_or_else(|| TransportConfig::default().security, Transport::security);
    let (mut wire, url) = build_wire_request(&request, security)?;
    let transport = match request.transport.take() {
        Some(transport) => transport,
        None => Transport::from_config(&TransportConfig::default())?,
    };

    for hook in &request.hooks {
        hook(&mut wire)?;
    }

    let method = request.method.clone();
    let timeout = request.timeout;
    tracing::debug!(
        method = %method,
        host = wire.uri().host().unwrap_or_default(),
        path = wire.uri().path(),
        "dispatching request"
    );

    let dispatch = tokio::time::timeout(timeout, transport.call(wire));
    let outcome = match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(method = %method, "request cancelled");
                return Err(HttpError::Cancelled);
            }
            outcome = dispatch => outcome,
        },
        None => dispatch.await,
    };

    let raw = match outcome {
        Err(_elapsed) => {
            tracing::debug!(method = %method, ?timeout, "request timed out");
            return Err(HttpError::Timeout(timeout));
        }
        Ok(Ok(raw)) => raw,
        Ok(Err(TransportError::Protocol(raw))) => {
            tracing::debug!(
                status = raw.status().as_u16(),
                "protocol error normalized into response"
            );
            *raw
        }
        Ok(Err(TransportError::Failure(err))) => {
            tracing::debug!(method = %method, error = %err, "transport failure");
            return Err(err);
        }
    };

    tracing::debug!(method = %method, status = raw.status().as_u16(), "received response");
    Ok(Response::from_http(raw, method, url)
        .with_max_body_size(request.max_body_size)
        .with_read_timeout(timeout))
}
