use http::HeaderMap;
use http::header::SET_COOKIE;

/// Cookies sent with a request, or received in `Set-Cookie` headers
///
/// Names are unique: setting an existing cookie replaces its value in place.
/// Cookie attributes (`Path`, `Expires`, ...) are not modelled; only the
/// `name=value` pair travels in the `Cookie` request header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieCollection {
    entries: Vec<(String, String)>,
}

impl CookieCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the `name=value` pairs of every `Set-Cookie` header
    ///
    /// Malformed entries (no `=`, empty name, non-ASCII header value) are skipped.
    #[must_use]
    pub fn from_set_cookie_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::new();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            let pair = raw.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    cookies.set(name, value.trim().trim_matches('"'));
                }
            }
        }
        cookies
    }

    /// Set a cookie, replacing an existing value with the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        before != self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the `Cookie` request header value (`a=1; b=2`)
    ///
    /// Returns `None` when the collection is empty.
    #[must_use]
    pub fn to_header_value(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let rendered: Vec<String> = self
            .entries
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        Some(rendered.join("; "))
    }
}

impl<K, V> FromIterator<(K, V)> for CookieCollection
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut cookies = Self::new();
        for (name, value) in iter {
            cookies.set(name, value);
        }
        cookies
    }
}
