use super::OrderedPairs;
use crate::error::HttpError;
use std::fmt;

/// Ordered multi-map of query parameters
///
/// Keys may repeat. Serialization follows `application/x-www-form-urlencoded`
/// rules, so `{"a": "1", "b": "two words"}` becomes `a=1&b=two+words`.
///
/// # Example
///
/// ```ignore
/// let query = QueryString::new()
///     .with("page", "1")
///     .with("tag", "rust")
///     .with("tag", "http");
///
/// assert_eq!(query.to_string(), "page=1&tag=rust&tag=http");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: OrderedPairs<String>,
}

impl QueryString {
    /// Create an empty query string
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized query string (a leading `?` is ignored)
    ///
    /// # Errors
    ///
    /// Returns `HttpError::FormDecode` if the input is not valid
    /// URL-encoded form data.
    pub fn parse(input: &str) -> Result<Self, HttpError> {
        let trimmed = input.strip_prefix('?').unwrap_or(input);
        let decoded: Vec<(String, String)> = serde_urlencoded::from_str(trimmed)?;
        Ok(decoded.into_iter().collect())
    }

    /// Append a value, keeping any existing values for the key
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.add(key.into(), value.into());
        self
    }

    /// Replace all values of `key` with a single value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.set(key.into(), value.into());
        self
    }

    /// Chainable form of [`add`](Self::add)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(key, value);
        self
    }

    /// First value stored for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// All values stored for `key`, in insertion order
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs.get_all(key).map(String::as_str).collect()
    }

    /// Remove every value of `key`, returning how many were removed
    pub fn remove(&mut self, key: &str) -> usize {
        self.pairs.remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.contains_key(key)
    }

    /// Iterate over `(key, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k, v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialize to `key=value&key2=value2` with percent-encoding
    ///
    /// # Errors
    ///
    /// Returns `HttpError::FormEncode` if the encoder rejects the pairs.
    pub fn serialize(&self) -> Result<String, HttpError> {
        let pairs: Vec<(&str, &str)> = self.iter().collect();
        Ok(serde_urlencoded::to_string(pairs)?)
    }

    /// Append this query string to `url`
    ///
    /// Uses `&` when `url` already carries a `?`, `?` otherwise. An empty
    /// query string leaves the URL untouched.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::FormEncode` if serialization fails.
    pub fn append_to(&self, url: &str) -> Result<String, HttpError> {
        if self.is_empty() {
            return Ok(url.to_owned());
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        Ok(format!("{url}{separator}{}", self.serialize()?))
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.serialize().map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl<K, V> FromIterator<(K, V)> for QueryString
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.add(key, value);
        }
        query
    }
}

impl<K, V> From<Vec<(K, V)>> for QueryString
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for QueryString
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_percent_encodes() {
        let query = QueryString::from([("a", "1"), ("b", "two words"), ("c", "x&y=z")]);
        assert_eq!(query.to_string(), "a=1&b=two+words&c=x%26y%3Dz");
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let query = QueryString::from([("a", "1"), ("b", "two words")]);
        let parsed = QueryString::parse(&query.to_string()).unwrap();

        let pairs: Vec<_> = parsed.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "two words")]);
        assert_eq!(parsed, query);
    }

    #[test]
    fn test_parse_ignores_leading_question_mark() {
        let parsed = QueryString::parse("?q=rust&page=2").unwrap();
        assert_eq!(parsed.get("q"), Some("rust"));
        assert_eq!(parsed.get("page"), Some("2"));
    }

    #[test]
    fn test_multi_valued_keys() {
        let mut query = QueryString::new();
        query.add("tag", "a").add("tag", "b").add("other", "c");

        assert_eq!(query.get("tag"), Some("a"));
        assert_eq!(query.get_all("tag"), vec!["a", "b"]);
        assert_eq!(query.to_string(), "tag=a&tag=b&other=c");

        query.set("tag", "z");
        assert_eq!(query.to_string(), "tag=z&other=c");
    }

    #[test]
    fn test_get_all_outlives_key() {
        let query = QueryString::from([("tag", "a"), ("tag", "b")]);
        let values = {
            let key = String::from("tag");
            query.get_all(&key)
        };
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_append_to_url_without_query() {
        let query = QueryString::from([("a", "2")]);
        assert_eq!(query.append_to("http://x/y").unwrap(), "http://x/y?a=2");
    }

    #[test]
    fn test_append_to_url_with_existing_query() {
        let query = QueryString::from([("a", "2")]);
        assert_eq!(
            query.append_to("http://x/y?z=1").unwrap(),
            "http://x/y?z=1&a=2"
        );
    }

    #[test]
    fn test_empty_query_contributes_nothing() {
        let query = QueryString::new();
        assert!(query.is_empty());
        assert_eq!(query.append_to("http://x/y").unwrap(), "http://x/y");
        assert_eq!(query.to_string(), "");
    }
}
