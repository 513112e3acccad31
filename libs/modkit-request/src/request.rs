use crate::blocking;
use crate::charset::Charset;
use crate::collections::{
    CookieCollection, FilePart, HeaderCollection, PostData, PostValue, QueryString,
};
use crate::config::{DEFAULT_MAX_BODY_SIZE, DEFAULT_TIMEOUT};
use crate::credentials::Credentials;
use crate::error::HttpError;
use crate::executor;
use crate::response::Response;
use crate::transport::{Transport, TransportRequest};
use base64::Engine;
use base64::engine::general_purpose;
use bytes::Bytes;
use http::Method;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Callback run on the wire request right before dispatch
///
/// Hooks run in registration order and may mutate anything, e.g. add a
/// signature header. Returning an error aborts the request before any network
/// activity.
pub type PreDispatchHook =
    Arc<dyn Fn(&mut TransportRequest) -> Result<(), HttpError> + Send + Sync>;

/// Outbound HTTP request
///
/// A mutable, single-use builder: populate it with the fluent `set_*` methods,
/// then consume it with [`get_response`](Self::get_response) or
/// [`get_response_async`](Self::get_response_async).
///
/// Exactly one body source reaches the wire, in this order:
/// 1. a non-empty text body ([`set_body`](Self::set_body)), encoded with the
///    request [`Charset`]
/// 2. a binary body ([`set_binary_body`](Self::set_binary_body)), even if empty
/// 3. post data, for POST/PUT/PATCH/DELETE only: multipart when any value is a
///    file, URL-encoded otherwise
///
/// ```ignore
/// let mut response = Request::post("https://api.example.com/items")
///     .set_query_string(QueryString::new().with("dry_run", "true"))
///     .set_post_data(PostData::new().with("name", "widget"))
///     .set_accept_header("application/json")
///     .get_response_async()
///     .await?;
/// let body = response.body().await?;
/// ```
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) query_string: QueryString,
    pub(crate) post_data: PostData,
    pub(crate) body: Option<String>,
    pub(crate) binary_body: Option<Bytes>,
    pub(crate) content_type: Option<String>,
    pub(crate) headers: HeaderCollection,
    pub(crate) cookies: CookieCollection,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) encoding: Charset,
    pub(crate) timeout: Duration,
    pub(crate) accept: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) max_body_size: usize,
    pub(crate) transport: Option<Transport>,
    pub(crate) hooks: Vec<PreDispatchHook>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query_string: QueryString::new(),
            post_data: PostData::new(),
            body: None,
            binary_body: None,
            content_type: None,
            headers: HeaderCollection::new(),
            cookies: CookieCollection::new(),
            credentials: None,
            encoding: Charset::default(),
            timeout: DEFAULT_TIMEOUT,
            accept: None,
            user_agent: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            transport: None,
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    #[must_use]
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Build a request from a bag of optional settings
    ///
    /// At most one text body is used: `body` wins over `json_body`, which
    /// wins over `xml_body`. An explicit `content_type` always overrides the
    /// JSON/XML default.
    ///
    /// # Errors
    /// Returns `HttpError::Json` if `json_body` cannot be serialized
    pub fn from_options(
        method: Method,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Self, HttpError> {
        let mut request = Self::new(method, url);
        if let Some(query_string) = options.query_string {
            request.query_string = query_string;
        }
        if let Some(post_data) = options.post_data {
            request.post_data = post_data;
        }

        if let Some(body) = options.body {
            request.body = Some(body);
        } else if let Some(json) = options.json_body {
            request = request.set_json_body(&json)?;
        } else if let Some(xml) = options.xml_body {
            request = request.set_xml_body(xml);
        }

        if let Some(content_type) = options.content_type {
            request.content_type = Some(content_type);
        }
        Ok(request)
    }

    #[must_use]
    pub fn set_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn set_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the query string appended to the URL at execution
    #[must_use]
    pub fn set_query_string(mut self, query_string: impl Into<QueryString>) -> Self {
        self.query_string = query_string.into();
        self
    }

    #[must_use]
    pub fn add_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string.add(key, value);
        self
    }

    #[must_use]
    pub fn set_post_data(mut self, post_data: impl Into<PostData>) -> Self {
        self.post_data = post_data.into();
        self
    }

    #[must_use]
    pub fn add_post_data(mut self, key: impl Into<String>, value: impl Into<PostValue>) -> Self {
        self.post_data.add(key, value);
        self
    }

    /// Add a file part; the request will be sent as `multipart/form-data`
    #[must_use]
    pub fn add_file(mut self, key: impl Into<String>, file: FilePart) -> Self {
        self.post_data.add_file(key, file);
        self
    }

    #[must_use]
    pub fn set_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn set_binary_body(mut self, body: impl Into<Bytes>) -> Self {
        self.binary_body = Some(body.into());
        self
    }

    #[must_use]
    pub fn set_body_with_content_type(
        self,
        body: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        self.set_body(body).set_content_type(content_type)
    }

    /// Serialize `value` as the text body with `application/json`
    ///
    /// # Errors
    /// Returns `HttpError::Json` if serialization fails
    pub fn set_json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_string(value)?;
        Ok(self.set_body_with_content_type(body, "application/json"))
    }

    #[must_use]
    pub fn set_xml_body(self, xml: impl Into<String>) -> Self {
        self.set_body_with_content_type(xml, "application/xml")
    }

    #[must_use]
    pub fn set_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set a raw `Authorization` header value
    #[must_use]
    pub fn set_authorization_header(mut self, value: impl Into<String>) -> Self {
        self.headers.set(http::header::AUTHORIZATION.as_str(), value);
        self
    }

    /// Set `Authorization: Basic <base64(username:password)>`
    #[must_use]
    pub fn set_authorization_basic(self, username: &str, password: &str) -> Self {
        let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.set_authorization_header(format!("Basic {encoded}"))
    }

    #[must_use]
    pub fn set_authorization_bearer(self, token: impl AsRef<str>) -> Self {
        self.set_authorization_header(format!("Bearer {}", token.as_ref()))
    }

    #[must_use]
    pub fn set_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn set_accept_header(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Set a header, replacing existing values with the same name
    #[must_use]
    pub fn set_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Append a header, keeping existing values with the same name
    #[must_use]
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    #[must_use]
    pub fn set_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.set(name, value);
        self
    }

    /// Send preemptive Basic authentication unless an `Authorization`
    /// header is set explicitly
    #[must_use]
    pub fn set_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Charset used to encode the text body (default UTF-8)
    #[must_use]
    pub fn set_encoding(mut self, encoding: Charset) -> Self {
        self.encoding = encoding;
        self
    }

    /// Timeout for dispatch, and separately for draining the response body
    /// once it is first accessed (default 100s)
    #[must_use]
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn set_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Dispatch through `transport` instead of a request-scoped default one
    #[must_use]
    pub fn set_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register a hook run on the wire request right before dispatch
    #[must_use]
    pub fn on_pre_dispatch<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut TransportRequest) -> Result<(), HttpError> + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn query_string(&self) -> &QueryString {
        &self.query_string
    }

    pub fn query_string_mut(&mut self) -> &mut QueryString {
        &mut self.query_string
    }

    #[must_use]
    pub fn post_data(&self) -> &PostData {
        &self.post_data
    }

    pub fn post_data_mut(&mut self) -> &mut PostData {
        &mut self.post_data
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderCollection {
        &mut self.headers
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieCollection {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieCollection {
        &mut self.cookies
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    #[must_use]
    pub fn binary_body(&self) -> Option<&Bytes> {
        self.binary_body.as_ref()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn encoding(&self) -> Charset {
        self.encoding
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True if the post data holds at least one file part
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.post_data.is_multipart()
    }

    /// URL the request will be sent to, query string included
    ///
    /// # Errors
    /// Returns `HttpError::MissingUrl` if no URL is set
    pub fn effective_url(&self) -> Result<String, HttpError> {
        executor::effective_url(&self.url, &self.query_string)
    }

    /// Execute the request, blocking the current thread
    ///
    /// 4xx/5xx statuses are returned as a [`Response`]; only failures without
    /// a response are errors.
    ///
    /// # Errors
    /// Returns `HttpError::BlockingInAsyncContext` when called inside a Tokio
    /// runtime, a configuration error before dispatch, or a transport failure
    pub fn get_response(self) -> Result<Response, HttpError> {
        blocking::block_on(executor::execute(self, None))
    }

    /// Execute the request on the current task
    ///
    /// # Errors
    /// Returns a configuration error before dispatch or a transport failure
    pub async fn get_response_async(self) -> Result<Response, HttpError> {
        executor::execute(self, None).await
    }

    /// Execute the request, aborting with `HttpError::Cancelled` once `token`
    /// is cancelled
    ///
    /// # Errors
    /// Same as [`get_response_async`](Self::get_response_async), plus
    /// `HttpError::Cancelled`
    pub async fn get_response_cancellable(
        self,
        token: CancellationToken,
    ) -> Result<Response, HttpError> {
        executor::execute(self, Some(token)).await
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query_string", &self.query_string)
            .field("headers", &self.headers.len())
            .field("has_body", &self.body.is_some())
            .field("has_binary_body", &self.binary_body.is_some())
            .field("post_data", &self.post_data.len())
            .field("timeout", &self.timeout)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

/// Optional settings accepted by [`Request::from_options`] and
/// [`Client::send`](crate::Client::send)
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query_string: Option<QueryString>,
    pub post_data: Option<PostData>,
    pub body: Option<String>,
    pub content_type: Option<String>,
    pub json_body: Option<serde_json::Value>,
    pub xml_body: Option<String>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn query_string(mut self, query_string: impl Into<QueryString>) -> Self {
        self.query_string = Some(query_string.into());
        self
    }

    #[must_use]
    pub fn post_data(mut self, post_data: impl Into<PostData>) -> Self {
        self.post_data = Some(post_data.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn json_body(mut self, json: serde_json::Value) -> Self {
        self.json_body = Some(json);
        self
    }

    #[must_use]
    pub fn xml_body(mut self, xml: impl Into<String>) -> Self {
        self.xml_body = Some(xml.into());
        self
    }
}
