//! Redirect policy for the transport's `FollowRedirectLayer`
//!
//! - Follows at most `max_redirects` hops, then hands the last 3xx response
//!   to the caller
//! - Drops `Authorization`, `Cookie` and `Proxy-Authorization` once the chain
//!   leaves the original origin
//! - Keeps the request body so 307/308 hops can resend it

use http::{Request, Uri, header};
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

const CREDENTIAL_HEADERS: &[header::HeaderName] = &[
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    max_redirects: usize,
    /// Hops followed so far; tower-http clones the policy per request
    followed: usize,
    cross_origin: bool,
}

impl RedirectPolicy {
    #[must_use]
    pub fn new(max_redirects: usize) -> Self {
        Self {
            max_redirects,
            followed: 0,
            cross_origin: false,
        }
    }

    fn same_origin(a: &Uri, b: &Uri) -> bool {
        let scheme_a = a.scheme_str().unwrap_or("https");
        let scheme_b = b.scheme_str().unwrap_or("https");
        scheme_a == scheme_b
            && a.host() == b.host()
            && a.port_u16().unwrap_or_else(|| default_port(scheme_a))
                == b.port_u16().unwrap_or_else(|| default_port(scheme_b))
    }
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "http" => 80,
        "https" => 443,
        _ => 0,
    }
}

impl<B: Clone, E> Policy<B, E> for RedirectPolicy {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        if self.followed >= self.max_redirects {
            tracing::debug!(max = self.max_redirects, "redirect limit reached");
            return Ok(Action::Stop);
        }
        self.followed += 1;

        if !Self::same_origin(attempt.previous(), attempt.location()) {
            self.cross_origin = true;
        }
        tracing::debug!(
            status = attempt.status().as_u16(),
            location = %attempt.location(),
            "following redirect"
        );
        Ok(Action::Follow)
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        if self.cross_origin {
            for name in CREDENTIAL_HEADERS {
                request.headers_mut().remove(name);
            }
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        Some(body.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_same_origin_with_explicit_default_port() {
        assert!(RedirectPolicy::same_origin(
            &uri("https://example.com/a"),
            &uri("https://example.com:443/b")
        ));
    }

    #[test]
    fn test_different_scheme_host_or_port_is_cross_origin() {
        let base = uri("https://example.com/a");
        assert!(!RedirectPolicy::same_origin(&base, &uri("http://example.com/a")));
        assert!(!RedirectPolicy::same_origin(&base, &uri("https://other.com/a")));
        assert!(!RedirectPolicy::same_origin(&base, &uri("https://example.com:8443/a")));
    }

    #[test]
    fn test_credentials_stripped_after_cross_origin_hop() {
        let mut policy = RedirectPolicy::new(5);
        policy.cross_origin = true;

        let mut req = Request::builder()
            .uri("https://other.com/")
            .header(header::AUTHORIZATION, "Bearer t")
            .header(header::COOKIE, "a=1")
            .header(header::ACCEPT, "*/*")
            .body(())
            .unwrap();
        Policy::<(), ()>::on_request(&mut policy, &mut req);

        assert!(!req.headers().contains_key(header::AUTHORIZATION));
        assert!(!req.headers().contains_key(header::COOKIE));
        assert!(req.headers().contains_key(header::ACCEPT));
    }

    #[test]
    fn test_body_is_cloned_for_resend() {
        let policy = RedirectPolicy::new(1);
        assert_eq!(
            Policy::<String, ()>::clone_body(&policy, &"x".to_owned()),
            Some("x".to_owned())
        );
    }
}
