use crate::collections::HeaderCollection;
use crate::config::{ClientConfig, TransportConfig, TransportSecurity};
use crate::error::HttpError;
use crate::request::{PreDispatchHook, Request, RequestOptions};
use crate::response::Response;
use crate::transport::{Transport, TransportRequest};
use http::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Builder for constructing a [`Client`]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Transport>,
    hooks: Vec<PreDispatchHook>,
}

impl ClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            hooks: Vec::new(),
        }
    }

    /// Set the timeout given to requests created by the client
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the user agent string
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.transport.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set the maximum number of redirects to follow
    ///
    /// Set to `0` to disable redirect following (3xx responses pass through as-is).
    #[must_use]
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.transport.max_redirects = max_redirects;
        self
    }

    /// Reject plain `http://` URLs
    #[must_use]
    pub fn tls_only(mut self) -> Self {
        self.config.transport.security = TransportSecurity::TlsOnly;
        self
    }

    /// Add a header sent with every request that does not set it itself
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    /// Register a hook run before each request of the client
    ///
    /// Client hooks run before the hooks registered on the request itself.
    #[must_use]
    pub fn pre_dispatch<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut TransportRequest) -> Result<(), HttpError> + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Use `transport` instead of building the hyper stack from configuration
    ///
    /// Transport settings of the configuration (user agent, redirects,
    /// decompression, security) are then ignored.
    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails or the user agent is not a
    /// valid header value
    pub fn build(self) -> Result<Client, HttpError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => build_transport(&self.config.transport)?,
        };

        let default_headers: HeaderCollection = self.config.default_headers.into_iter().collect();

        Ok(Client {
            transport,
            timeout: self.config.request_timeout,
            max_body_size: self.config.max_body_size,
            default_headers,
            hooks: self.hooks,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn build_transport(config: &TransportConfig) -> Result<Transport, HttpError> {
    if config.security == TransportSecurity::AllowInsecureHttp {
        tracing::debug!("client accepts plain http:// URLs (TransportSecurity::AllowInsecureHttp)");
    }
    Transport::from_config(config)
}

/// Request factory sharing one transport and a set of defaults
///
/// Requests created or prepared by the client reuse its connection pool and
/// receive its default headers and pre-dispatch hooks. Cloning is cheap.
///
/// ```ignore
/// let client = Client::builder()
///     .default_header("accept", "application/json")
///     .pre_dispatch(|req| {
///         req.headers_mut().insert("x-request-id", new_request_id());
///         Ok(())
///     })
///     .build()?;
///
/// let mut response = client.get_response_async(client.get(url)).await?;
/// ```
#[derive(Clone)]
pub struct Client {
    transport: Transport,
    timeout: Duration,
    max_body_size: usize,
    default_headers: HeaderCollection,
    hooks: Vec<PreDispatchHook>,
}

impl Client {
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, HttpError> {
        ClientBuilder::new().build()
    }

    /// Create a request carrying the client's timeout, body limit, default
    /// headers and hooks
    #[must_use]
    pub fn request(&self, method: Method, url: impl Into<String>) -> Request {
        let request = Request::new(method, url)
            .set_timeout(self.timeout)
            .set_max_body_size(self.max_body_size);
        self.prepare(request)
    }

    #[must_use]
    pub fn get(&self, url: impl Into<String>) -> Request {
        self.request(Method::GET, url)
    }

    #[must_use]
    pub fn post(&self, url: impl Into<String>) -> Request {
        self.request(Method::POST, url)
    }

    #[must_use]
    pub fn put(&self, url: impl Into<String>) -> Request {
        self.request(Method::PUT, url)
    }

    #[must_use]
    pub fn patch(&self, url: impl Into<String>) -> Request {
        self.request(Method::PATCH, url)
    }

    #[must_use]
    pub fn delete(&self, url: impl Into<String>) -> Request {
        self.request(Method::DELETE, url)
    }

    /// Attach the client to a request built elsewhere
    ///
    /// The client transport is used unless the request already has one.
    /// Default headers are added only where the request has no header of the
    /// same name, and client hooks are placed before the request's own.
    /// Timeout and body limit stay as set on the request.
    #[must_use]
    pub fn prepare(&self, mut request: Request) -> Request {
        if request.transport.is_none() {
            request.transport = Some(self.transport.clone());
        }
        request.headers.merge_defaults(&self.default_headers);
        if !self.hooks_attached(&request) {
            let mut hooks = self.hooks.clone();
            hooks.append(&mut request.hooks);
            request.hooks = hooks;
        }
        request
    }

    /// Whether `request` already starts with this client's hooks, e.g. when it
    /// was created by [`Client::request`]
    fn hooks_attached(&self, request: &Request) -> bool {
        request.hooks.len() >= self.hooks.len()
            && self
                .hooks
                .iter()
                .zip(&request.hooks)
                .all(|(ours, theirs)| Arc::ptr_eq(ours, theirs))
    }

    /// Prepare and execute a request
    ///
    /// # Errors
    /// Same as [`Request::get_response_async`]
    pub async fn get_response_async(&self, request: Request) -> Result<Response, HttpError> {
        self.prepare(request).get_response_async().await
    }

    /// Prepare and execute a request, blocking the calling thread
    ///
    /// # Errors
    /// Same as [`Request::get_response`]
    pub fn get_response(&self, request: Request) -> Result<Response, HttpError> {
        self.prepare(request).get_response()
    }

    /// Build a request from `options` and execute it
    ///
    /// # Errors
    /// Returns `HttpError::Json` if the JSON body cannot be serialized, or any
    /// error of [`Request::get_response_async`]
    pub async fn send(
        &self,
        method: Method,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Response, HttpError> {
        let request = Request::from_options(method, url, options)?
            .set_timeout(self.timeout)
            .set_max_body_size(self.max_body_size);
        self.get_response_async(request).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport)
            .field("timeout", &self.timeout)
            .field("max_body_size", &self.max_body_size)
            .field("default_headers", &self.default_headers)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::transport::{TransportError, full_body};
    use http::HeaderMap;
    use http_body_util::BodyExt;
    use httpmock::prelude::*;
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<(String, HeaderMap, String)>>>;

    fn recording(seen: &Seen) -> Transport {
        let seen = seen.clone();
        Transport::from_service(tower::service_fn(move |req: TransportRequest| {
            let seen = seen.clone();
            async move {
                let (parts, body) = req.into_parts();
                let body = body.collect().await.unwrap().to_bytes();
                seen.lock().unwrap().push((
                    parts.uri.to_string(),
                    parts.headers,
                    String::from_utf8(body.to_vec()).unwrap(),
                ));
                Ok::<_, TransportError>(http::Response::new(full_body("done")))
            }
        }))
    }

    #[tokio::test]
    async fn test_default_headers_do_not_override_request() {
        let seen = Seen::default();
        let client = Client::builder()
            .transport(recording(&seen))
            .default_header("accept", "application/json")
            .default_header("x-tenant", "acme")
            .build()
            .unwrap();

        let request = client.get("http://svc/items").set_header("X-Tenant", "other");
        let mut response = client.get_response_async(request).await.unwrap();
        assert_eq!(response.body().await.unwrap(), "done");

        let seen = seen.lock().unwrap();
        let (_, headers, _) = &seen[0];
        assert_eq!(headers["accept"], "application/json");
        assert_eq!(headers.get_all("x-tenant").iter().count(), 1);
        assert_eq!(headers["x-tenant"], "other");
    }

    #[tokio::test]
    async fn test_client_hooks_run_before_request_hooks() {
        let seen = Seen::default();
        let client = Client::builder()
            .transport(recording(&seen))
            .pre_dispatch(|req| {
                req.headers_mut()
                    .insert("x-order", http::HeaderValue::from_static("client"));
                Ok(())
            })
            .build()
            .unwrap();

        let request = Request::get("http://svc/").on_pre_dispatch(|req| {
            let previous = req.headers()["x-order"].to_str().unwrap_or_default().to_owned();
            let value = http::HeaderValue::from_str(&format!("{previous},request")).unwrap();
            req.headers_mut().insert("x-order", value);
            Ok(())
        });
        client.get_response_async(request).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].1["x-order"], "client,request");
    }

    #[tokio::test]
    async fn test_client_request_runs_hooks_once() {
        let seen = Seen::default();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let client = Client::builder()
            .transport(recording(&seen))
            .pre_dispatch(move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();

        client
            .get_response_async(client.get("http://svc/"))
            .await
            .unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_hook_error_aborts_request() {
        let seen = Seen::default();
        let client = Client::builder()
            .transport(recording(&seen))
            .pre_dispatch(|_| Err(HttpError::Hook("signing key unavailable".to_owned())))
            .build()
            .unwrap();

        let err = client
            .get_response_async(client.get("http://svc/"))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Hook(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_inherits_client_settings() {
        let client = Client::builder()
            .transport(recording(&Seen::default()))
            .timeout(Duration::from_secs(3))
            .max_body_size(64)
            .build()
            .unwrap();

        let request = client.post("http://svc/");
        assert_eq!(request.method(), &http::Method::POST);
        assert_eq!(request.timeout(), Duration::from_secs(3));
        assert_eq!(request.max_body_size, 64);
        assert!(request.transport.is_some());
    }

    #[tokio::test]
    async fn test_request_transport_is_kept() {
        let client_seen = Seen::default();
        let request_seen = Seen::default();
        let client = Client::builder()
            .transport(recording(&client_seen))
            .build()
            .unwrap();

        let request = Request::get("http://svc/").set_transport(recording(&request_seen));
        client.get_response_async(request).await.unwrap();

        assert!(client_seen.lock().unwrap().is_empty());
        assert_eq!(request_seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_with_options() {
        let seen = Seen::default();
        let client = Client::builder().transport(recording(&seen)).build().unwrap();

        let options = RequestOptions::new()
            .query_string([("page", "2")])
            .json_body(serde_json::json!({"name": "widget"}));
        client
            .send(http::Method::PUT, "http://svc/items", options)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        let (uri, headers, body) = &seen[0];
        assert_eq!(uri, "http://svc/items?page=2");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(body, r#"{"name":"widget"}"#);
    }

    #[test]
    fn test_blocking_get_response() {
        let seen = Seen::default();
        let client = Client::builder().transport(recording(&seen)).build().unwrap();

        let mut response = client.get_response(client.get("http://svc/")).unwrap();
        assert_eq!(response.body_blocking().unwrap(), "done");
    }

    #[tokio::test]
    async fn test_hyper_client_against_mock_server() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/status")
                .header("user-agent", "inventory-sync/1.0")
                .header("accept", "text/plain");
            then.status(200).body("up");
        });

        let client = ClientBuilder::with_config(ClientConfig::for_testing())
            .user_agent("inventory-sync/1.0")
            .default_header("accept", "text/plain")
            .build()
            .unwrap();

        let mut response = client
            .get_response_async(client.get(server.url("/status")))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(response.body().await.unwrap(), "up");
    }

    #[test]
    fn test_insecure_transport_is_logged_on_build() {
        use tracing_subscriber::layer::SubscriberExt;

        #[derive(Clone, Default)]
        struct MessageCapture {
            messages: Arc<Mutex<Vec<String>>>,
        }

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for MessageCapture {
            fn on_event(
                &self,
                event: &tracing::Event<'_>,
                _ctx: tracing_subscriber::layer::Context<'_, S>,
            ) {
                let mut visitor = MessageVisitor(String::new());
                event.record(&mut visitor);
                self.messages.lock().unwrap().push(visitor.0);
            }
        }

        struct MessageVisitor(String);
        impl tracing::field::Visit for MessageVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.0 = format!("{value:?}");
                }
            }
        }

        let capture = MessageCapture::default();
        let messages = capture.messages.clone();
        let subscriber = tracing_subscriber::registry().with(capture);

        tracing::subscriber::with_default(subscriber, || {
            _ = Client::builder().build();
            _ = Client::builder().tls_only().build();
        });

        let captured = messages.lock().unwrap();
        let insecure = captured
            .iter()
            .filter(|m| m.contains("plain http:// URLs"))
            .count();
        assert_eq!(insecure, 1, "unexpected log messages: {:?}", *captured);
    }

    #[test]
    fn test_tls_only_client_rejects_http() {
        let client = Client::builder().tls_only().build().unwrap();
        let err = client
            .get_response(client.get("http://insecure.example.com/"))
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidScheme { .. }));
    }
}
