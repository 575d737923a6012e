use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::Error;

/// An ordered list of `key:value` tag pairs attached to measurements.
///
/// Keys and values are sanitized on insertion: `:` and `#` are replaced
/// with `_` and surrounding whitespace is trimmed, so a rendered entry
/// always contains exactly one `:` separating key from value. Insertion
/// order is preserved in the rendered output.
///
/// The rendered form is cached, so a `Tags` that is attached to many
/// measurements is only formatted once.
///
/// ```
/// use vitals_core::Tags;
///
/// let mut tags = Tags::of("thread", "worker-1");
/// tags.add("group", "pool");
/// assert_eq!(tags.rendered().join(","), "thread:worker-1,group:pool");
/// ```
#[derive(Clone, Default)]
pub struct Tags {
    entries: Vec<String>,
    rendered: OnceLock<Arc<[String]>>,
}

fn sanitize(part: &str) -> String {
    part.replace([':', '#'], "_").trim().to_owned()
}

fn entry(key: &str, value: impl fmt::Display) -> String {
    format!("{}:{}", sanitize(key), sanitize(&value.to_string()))
}

impl Tags {
    /// Creates an empty tag set.
    pub fn new() -> Tags {
        Tags::default()
    }

    /// Creates a tag set holding a single pair.
    pub fn of(key: &str, value: impl fmt::Display) -> Tags {
        let mut tags = Tags::new();
        tags.add(key, value);
        tags
    }

    /// Builds a tag set from a flat `[key, value, key, value, ..]` list.
    ///
    /// Fails with [`Error::UnbalancedTags`] if the list has an odd number
    /// of elements.
    pub fn from_flat<S: AsRef<str>>(parts: &[S]) -> Result<Tags, Error> {
        if parts.len() % 2 != 0 {
            return Err(Error::UnbalancedTags(parts.len()));
        }
        let mut tags = Tags::new();
        for pair in parts.chunks(2) {
            tags.add(pair[0].as_ref(), pair[1].as_ref());
        }
        Ok(tags)
    }

    /// Appends a pair, returning `self` for chaining.
    pub fn add(&mut self, key: &str, value: impl fmt::Display) -> &mut Tags {
        self.entries.push(entry(key, value));
        self.rendered.take();
        self
    }

    /// Replaces the pair at `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, key: &str, value: impl fmt::Display) -> &mut Tags {
        self.entries[index] = entry(key, value);
        self.rendered.take();
        self
    }

    /// The number of pairs in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sanitized `key:value` entries in insertion order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The rendered entries as a shared slice, computed at most once per
    /// mutation.
    pub fn rendered(&self) -> Arc<[String]> {
        self.rendered
            .get_or_init(|| self.entries.clone().into())
            .clone()
    }
}

impl fmt::Debug for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

impl PartialEq for Tags {
    fn eq(&self, other: &Tags) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Tags {}

impl<K: AsRef<str>, V: fmt::Display> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Tags {
        let mut tags = Tags::new();
        tags.extend(iter);
        tags
    }
}

impl<K: AsRef<str>, V: fmt::Display> Extend<(K, V)> for Tags {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add(key.as_ref(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitizes_keys_and_values() {
        let tags = Tags::of(" thread ", "pool:1#a");
        assert_eq!(tags.entries(), ["thread:pool_1_a"]);
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut tags = Tags::new();
        tags.add("b", 2).add("a", 1).add("c", 3);
        assert_eq!(tags.entries(), ["b:2", "a:1", "c:3"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut tags = Tags::of("type", "cpu");
        tags.add("id", 7);
        tags.set(0, "type", "total");
        assert_eq!(tags.entries(), ["type:total", "id:7"]);
    }

    #[test]
    fn test_from_flat_rejects_odd_lists() {
        let err = Tags::from_flat(&["a", "1", "b"]).unwrap_err();
        assert!(matches!(err, Error::UnbalancedTags(3)));
        let tags = Tags::from_flat(&["a", "1", "b", "2"]).unwrap();
        assert_eq!(tags.entries(), ["a:1", "b:2"]);
    }

    #[test]
    fn test_rendered_cache_invalidated_on_mutation() {
        let mut tags = Tags::of("a", 1);
        assert_eq!(&*tags.rendered(), ["a:1".to_owned()]);
        tags.add("b", 2);
        assert_eq!(&*tags.rendered(), ["a:1".to_owned(), "b:2".to_owned()]);
        tags.set(1, "b", 3);
        assert_eq!(&*tags.rendered(), ["a:1".to_owned(), "b:3".to_owned()]);
    }

    #[test]
    fn test_collects_from_pairs() {
        let tags: Tags = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(tags.entries(), ["a:1", "b:2"]);
    }
}
