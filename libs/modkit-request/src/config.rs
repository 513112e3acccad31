use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default User-Agent string for outbound requests
pub const DEFAULT_USER_AGENT: &str = concat!("modkit-request/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout (100 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Default limit for materialized response bodies (10 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default number of redirects the transport follows
pub const DEFAULT_MAX_REDIRECTS: usize = 50;

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration
///
/// Controls whether plain `http://` URLs are accepted by the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Accept both `http://` and `https://` URLs
    #[default]
    AllowInsecureHttp,
    /// Reject `http://` URLs before any network activity
    TlsOnly,
}

/// Configuration of the hyper-based transport
///
/// Redirect following and response decompression are transport concerns;
/// the request executor never sees intermediate 3xx responses or compressed
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// User-Agent injected when a request does not set one
    pub user_agent: String,

    /// Maximum number of redirects to follow (default: 50)
    ///
    /// Set to `0` to hand 3xx responses to the caller unchanged.
    pub max_redirects: usize,

    /// Transparently decompress gzip/br/deflate responses (default: true)
    pub decompression: bool,

    /// Transport security mode (default: `AllowInsecureHttp`)
    pub security: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            decompression: true,
            security: TransportSecurity::default(),
            tls_roots: TlsRootConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Configuration that never follows redirects
    #[must_use]
    pub fn no_redirects() -> Self {
        Self {
            max_redirects: 0,
            ..Default::default()
        }
    }

    /// Configuration that only accepts `https://` URLs
    #[must_use]
    pub fn tls_only() -> Self {
        Self {
            security: TransportSecurity::TlsOnly,
            ..Default::default()
        }
    }
}

/// Configuration of a [`Client`](crate::Client)
///
/// Deserializable from any serde format; durations use humantime notation:
///
/// ```yaml
/// request_timeout: 30s
/// max_body_size: 1048576
/// default_headers:
///   accept: application/json
/// transport:
///   max_redirects: 5
///   security: tls_only
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Transport settings shared by every request of the client
    pub transport: TransportConfig,

    /// Timeout applied to requests created by the client (default: 100s)
    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,

    /// Limit for materialized response bodies (default: 10 MB)
    pub max_body_size: usize,

    /// Headers added to every request that does not set them itself
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            request_timeout: DEFAULT_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            default_headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Configuration for tests against local mock servers
    ///
    /// Short timeout, no redirects, small body limit.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            transport: TransportConfig::no_redirects(),
            request_timeout: Duration::from_secs(5),
            max_body_size: 1024 * 1024,
            default_headers: BTreeMap::new(),
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&raw), &"a duration"))
    }
}
