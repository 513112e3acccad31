use super::OrderedPairs;
use crate::error::HttpError;
use bytes::Bytes;

/// Binary file part of a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// File name announced in `Content-Disposition` (`filename="..."`)
    pub file_name: Option<String>,
    /// Part `Content-Type`; `application/octet-stream` when unset
    pub content_type: Option<String>,
    /// Raw part content
    pub data: Bytes,
}

impl FilePart {
    /// Create a file part from raw bytes
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A single post data value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValue {
    /// Plain text field
    Text(String),
    /// Binary/file field; forces multipart encoding
    File(FilePart),
}

impl PostValue {
    /// Text content, `None` for file parts
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PostValue::Text(text) => Some(text),
            PostValue::File(_) => None,
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, PostValue::File(_))
    }
}

impl From<String> for PostValue {
    fn from(value: String) -> Self {
        PostValue::Text(value)
    }
}

impl From<&str> for PostValue {
    fn from(value: &str) -> Self {
        PostValue::Text(value.to_owned())
    }
}

impl From<FilePart> for PostValue {
    fn from(value: FilePart) -> Self {
        PostValue::File(value)
    }
}

/// Structured form body
///
/// Serialized as `application/x-www-form-urlencoded` while every value is
/// text, and as `multipart/form-data` as soon as one value is a [`FilePart`].
/// The multipart decision is derived from the content on every call, so it
/// can never fall out of sync with the stored values.
///
/// # Example
///
/// ```ignore
/// let form = PostData::new()
///     .with("title", "Quarterly report")
///     .with("attachment", FilePart::new(pdf_bytes).file_name("q3.pdf"));
///
/// assert!(form.is_multipart());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostData {
    pairs: OrderedPairs<PostValue>,
}

impl PostData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping existing values for the key
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<PostValue>) -> &mut Self {
        self.pairs.add(key.into(), value.into());
        self
    }

    /// Append a file part
    pub fn add_file(&mut self, key: impl Into<String>, file: FilePart) -> &mut Self {
        self.pairs.add(key.into(), PostValue::File(file));
        self
    }

    /// Replace all values of `key` with a single value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PostValue>) -> &mut Self {
        self.pairs.set(key.into(), value.into());
        self
    }

    /// Chainable form of [`add`](Self::add)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PostValue>) -> Self {
        self.add(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PostValue> {
        self.pairs.get(key)
    }

    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&PostValue> {
        self.pairs.get_all(key).collect()
    }

    pub fn remove(&mut self, key: &str) -> usize {
        self.pairs.remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostValue)> {
        self.pairs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// True iff at least one value is a file part
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.iter().any(|(_, value)| value.is_file())
    }

    /// Serialize as `application/x-www-form-urlencoded`
    ///
    /// # Errors
    ///
    /// Returns `HttpError::MultipartRequired` naming the first file field
    /// when the data contains binary parts, or `HttpError::FormEncode` if
    /// encoding fails.
    pub fn to_url_encoded(&self) -> Result<String, HttpError> {
        let mut fields = Vec::with_capacity(self.len());
        for (key, value) in self.iter() {
            match value {
                PostValue::Text(text) => fields.push((key, text.as_str())),
                PostValue::File(_) => {
                    return Err(HttpError::MultipartRequired {
                        key: key.to_owned(),
                    });
                }
            }
        }
        Ok(serde_urlencoded::to_string(fields)?)
    }
}

impl<K, V> FromIterator<(K, V)> for PostData
where
    K: Into<String>,
    V: Into<PostValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (key, value) in iter {
            data.add(key, value);
        }
        data
    }
}

impl<K, V> From<Vec<(K, V)>> for PostData
where
    K: Into<String>,
    V: Into<PostValue>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for PostData
where
    K: Into<String>,
    V: Into<PostValue>,
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
    fn test_text_only_is_not_multipart() {
        let data = PostData::from([("name", "Alice"), ("city", "New York")]);
        assert!(!data.is_multipart());
        assert_eq!(data.to_url_encoded().unwrap(), "name=Alice&city=New+York");
    }

    #[test]
    fn test_get_all_outlives_key() {
        let data = PostData::from([("name", "Alice"), ("name", "Bob")]);
        let values = {
            let key = "name".to_owned();
            data.get_all(&key)
        };
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].as_text(), Some("Bob"));
    }

    #[test]
    fn test_file_part_switches_to_multipart() {
        let mut data = PostData::from([("name", "Alice")]);
        assert!(!data.is_multipart());

        data.add_file("avatar", FilePart::new(vec![0u8, 1, 2]).file_name("a.png"));
        assert!(data.is_multipart());

        data.remove("avatar");
        assert!(!data.is_multipart());
    }

    #[test]
    fn test_url_encoding_rejects_binary_parts() {
        let data = PostData::new()
            .with("name", "Alice")
            .with("avatar", FilePart::new(&b"\x89PNG"[..]));

        match data.to_url_encoded() {
            Err(HttpError::MultipartRequired { key }) => assert_eq!(key, "avatar"),
            other => panic!("expected MultipartRequired, got {other:?}"),
        }
    }

    #[test]
    fn test_as_text() {
        let data = PostData::new()
            .with("a", "1")
            .with("f", FilePart::new(Bytes::from_static(b"x")));
        assert_eq!(data.get("a").and_then(PostValue::as_text), Some("1"));
        assert_eq!(data.get("f").and_then(PostValue::as_text), None);
    }
}
