#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP request/response execution for `ModKit`
//!
//! This crate turns a fluently-built [`Request`] into a [`Response`]:
//! - Query strings appended to the URL, form and multipart post data, raw text
//!   or binary bodies, headers, cookies and Basic/Bearer authorization
//! - One timeout per request, applied to dispatch and again to the body read
//!   from the first body access
//! - Non-success statuses returned as regular responses; only transport
//!   failures are errors
//! - Bodies read once, decoded with the charset of the `Content-Type` header
//!   and capped at a configurable size
//! - Blocking and async execution, plus cancellation via `CancellationToken`
//! - A hyper/rustls [`Transport`] with redirect following and transparent
//!   decompression, replaceable by any tower service
//! - A [`Client`] sharing one transport, default headers and pre-dispatch hooks
//!
//! # Example
//!
//! ```ignore
//! use modkit_request::{PostData, Request};
//!
//! let mut response = Request::post("https://api.example.com/items")
//!     .add_query_param("dry_run", "true")
//!     .set_post_data(PostData::new().with("name", "widget"))
//!     .set_authorization_bearer(token)
//!     .get_response_async()
//!     .await?;
//!
//! if response.is_success() {
//!     println!("{}", response.body().await?);
//! }
//! ```

mod blocking;
pub mod charset;
mod client;
mod collections;
mod config;
mod credentials;
mod error;
mod executor;
mod layers;
mod model;
pub mod multipart;
mod request;
mod response;
pub mod tls;
mod transport;

pub use charset::Charset;
pub use client::{Client, ClientBuilder};
pub use collections::{
    CookieCollection, FilePart, HeaderCollection, PostData, PostValue, QueryString,
};
pub use config::{
    ClientConfig, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT, TlsRootConfig, TransportConfig, TransportSecurity,
};
pub use credentials::Credentials;
pub use error::{HttpError, InvalidUriKind};
pub use layers::{DefaultHeadersLayer, DefaultHeadersService, RedirectPolicy};
pub use model::{
    ResponseModel, XmlElement, parse_json, parse_json_array, parse_json_object, parse_json_value,
    parse_json_with, parse_xml_element, parse_xml_with, try_parse_json, try_parse_json_array,
    try_parse_json_object, try_parse_xml_element,
};
pub use request::{PreDispatchHook, Request, RequestOptions};
pub use response::Response;
pub use transport::{
    ResponseBody, Transport, TransportError, TransportRequest, TransportResponse, full_body,
};
