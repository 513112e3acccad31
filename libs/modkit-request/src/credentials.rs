use crate::error::HttpError;
use base64::Engine;
use base64::engine::general_purpose;
use http::HeaderValue;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Username/password pair sent as preemptive HTTP Basic authentication
///
/// The password is zeroed on drop and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Callers must not log or persist the returned slice.
    #[must_use]
    pub fn expose_password(&self) -> &str {
        &self.password
    }

    /// `Authorization` header value (`Basic <base64(user:password)>`), marked sensitive
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the encoded value is not a
    /// valid header value
    pub fn basic_header_value(&self) -> Result<HeaderValue, HttpError> {
        let pair = Zeroizing::new(format!("{}:{}", self.username, self.password));
        let encoded = Zeroizing::new(general_purpose::STANDARD.encode(pair.as_bytes()));
        let raw = Zeroizing::new(format!("Basic {}", &*encoded));
        let mut value = HeaderValue::from_str(&raw)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
