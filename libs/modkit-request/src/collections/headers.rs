use crate::error::HttpError;
use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Ordered request headers with case-insensitive names
///
/// Values are kept as plain strings and validated only when the request is
/// serialized, so fluent setters never fail; an invalid name or value is
/// reported by the executor before any network activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCollection {
    entries: Vec<(String, String)>,
}

impl HeaderCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping existing values with the same name
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    /// Set a header, replacing all existing values with the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
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

    /// Add every header of `defaults` whose name is not present yet
    pub fn merge_defaults(&mut self, defaults: &HeaderCollection) {
        for (name, value) in defaults.iter() {
            if !self.contains_key(name) {
                self.entries.push((name.to_owned(), value.to_owned()));
            }
        }
    }

    /// Validate and convert into an `http::HeaderMap`
    ///
    /// # Errors
    ///
    /// Returns `HttpError::InvalidHeaderName` or
    /// `HttpError::InvalidHeaderValue` for the first invalid entry.
    pub fn to_header_map(&self) -> Result<HeaderMap, HttpError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let name = HeaderName::try_from(name.as_str())?;
            let value = HeaderValue::try_from(value.as_str())?;
            map.append(name, value);
        }
        Ok(map)
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderCollection
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        let mut headers = HeaderCollection::new();
        headers.add("X-Request-Id", "abc");

        assert_eq!(headers.get("x-request-id"), Some("abc"));
        assert!(headers.contains_key("X-REQUEST-ID"));

        headers.set("x-request-id", "def");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-Request-Id"), Some("def"));
    }

    #[test]
    fn test_multi_valued_headers_are_appended() {
        let headers: HeaderCollection = [("accept-language", "en"), ("Accept-Language", "de")]
            .into_iter()
            .collect();

        let map = headers.to_header_map().unwrap();
        let values: Vec<_> = map
            .get_all("accept-language")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["en", "de"]);
    }

    #[test]
    fn test_invalid_header_name_is_reported() {
        let mut headers = HeaderCollection::new();
        headers.add("bad header", "x");
        assert!(matches!(
            headers.to_header_map(),
            Err(HttpError::InvalidHeaderName(_))
        ));
    }

    #[test]
    fn test_invalid_header_value_is_reported() {
        let mut headers = HeaderCollection::new();
        headers.add("x-ok", "line\nbreak");
        assert!(matches!(
            headers.to_header_map(),
            Err(HttpError::InvalidHeaderValue(_))
        ));
    }

    #[test]
    fn test_merge_defaults_keeps_explicit_values() {
        let mut headers = HeaderCollection::new();
        headers.add("Accept", "text/plain");

        let defaults: HeaderCollection = [("accept", "application/json"), ("x-tenant", "t1")]
            .into_iter()
            .collect();
        headers.merge_defaults(&defaults);

        assert_eq!(headers.get("accept"), Some("text/plain"));
        assert_eq!(headers.get("x-tenant"), Some("t1"));
    }
}
