//! Ordered request containers
//!
//! - [`QueryString`] - multi-valued `key=value` pairs appended to the URL
//! - [`PostData`] - multi-valued form fields, text or file parts
//! - [`HeaderCollection`] - case-insensitive request headers
//! - [`CookieCollection`] - last-write-wins cookies sent in the `Cookie` header
//!
//! All containers preserve insertion order so serialization is deterministic.

mod cookies;
mod headers;
mod post_data;
mod query;

pub use cookies::CookieCollection;
pub use headers::HeaderCollection;
pub use post_data::{FilePart, PostData, PostValue};
pub use query::QueryString;

/// Insertion-ordered multi-map shared by the query string and post data.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderedPairs<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedPairs<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedPairs<V> {
    fn add(&mut self, key: String, value: V) {
        self.entries.push((key, value));
    }

    /// Replaces every value of `key` with `value`, keeping the position of the
    /// first occurrence (or appending when the key is new).
    fn set(&mut self, key: String, value: V) {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(k, _)| {
                    let keep = index <= first || *k != key;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((key, value)),
        }
    }

    fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn get_all<'k>(&self, key: &'k str) -> impl Iterator<Item = &V> + use<'_, 'k, V> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn remove(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        before - self.entries.len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_all_values_in_place() {
        let mut pairs = OrderedPairs::default();
        pairs.add("a".to_owned(), 1);
        pairs.add("b".to_owned(), 2);
        pairs.add("a".to_owned(), 3);
        pairs.add("c".to_owned(), 4);

        pairs.set("a".to_owned(), 9);

        let collected: Vec<_> = pairs.iter().map(|(k, v)| (k.to_owned(), *v)).collect();
        assert_eq!(
            collected,
            vec![
                ("a".to_owned(), 9),
                ("b".to_owned(), 2),
                ("c".to_owned(), 4)
            ]
        );
    }

    #[test]
    fn test_set_appends_new_key() {
        let mut pairs = OrderedPairs::default();
        pairs.add("a".to_owned(), 1);
        pairs.set("z".to_owned(), 2);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.get("z"), Some(&2));
    }

    #[test]
    fn test_remove_counts_removed_entries() {
        let mut pairs = OrderedPairs::default();
        pairs.add("a".to_owned(), 1);
        pairs.add("a".to_owned(), 2);
        pairs.add("b".to_owned(), 3);

        assert_eq!(pairs.remove("a"), 2);
        assert!(!pairs.contains_key("a"));
        assert_eq!(pairs.get_all("b").count(), 1);
        assert_eq!(pairs.remove("missing"), 0);
        assert!(!pairs.is_empty());
    }
}
