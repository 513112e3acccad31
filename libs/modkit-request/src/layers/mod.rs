//! Tower layers composed into the transport stack

mod default_headers;
mod redirect;

pub use default_headers::{DefaultHeadersLayer, DefaultHeadersService};
pub use redirect::RedirectPolicy;
