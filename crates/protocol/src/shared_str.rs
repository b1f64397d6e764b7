use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A reference-counted, immutable string.
///
/// Node names and color keys are cloned into draw queues on every frame;
/// cloning a `SharedStr` is a refcount bump rather than a heap copy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SharedStr(Arc<str>);

impl SharedStr {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of `char`s (not bytes) in the string.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl PartialEq<str> for SharedStr {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SharedStr {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl std::ops::Deref for SharedStr {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for SharedStr {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedStr {
    fn from(s: &str) -> Self {
        SharedStr(Arc::from(s))
    }
}

impl From<String> for SharedStr {
    fn from(s: String) -> Self {
        SharedStr(Arc::from(s))
    }
}

impl std::fmt::Display for SharedStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// Hand-rolled to avoid serde's `rc` feature.
impl Serialize for SharedStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SharedStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SharedStr::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_equal() {
        let a = SharedStr::from("rgb(1, 2, 3)");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a, "rgb(1, 2, 3)");
    }

    #[test]
    fn char_count_counts_scalars() {
        assert_eq!(SharedStr::from("a…b").char_count(), 3);
        assert_eq!(SharedStr::from("a…b").len(), 5);
    }

    #[test]
    fn usable_as_map_key_by_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(SharedStr::from("#fff"), 1);
        assert_eq!(map.get("#fff"), Some(&1));
    }

    #[test]
    fn deserializes_from_escaped_json() {
        let s: SharedStr = serde_json::from_str("\"a\\\"b\"").unwrap_or_else(|_| SharedStr::from(""));
        assert_eq!(s, "a\"b");
    }
}
