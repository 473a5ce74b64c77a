//! Path handling for the virtual filesystem view of a bucket.
//!
//! Object storage has no real directories; keys are flat strings. A
//! [`RemotePath`] models the hierarchy convention instead: components joined
//! by `/`, with a trailing separator marking a folder. The string form of a
//! folder path always ends in `/` and the string form of a file path never
//! does, so a path round-trips through [`RemotePath::parse`] unchanged.

use std::fmt;

/// A normalized, separator-delimited address of an object or folder.
///
/// Mutating operations (`push`, `pop`, `concat`, `rebase`) act on the
/// receiver and return it for chaining. Callers that need an independent
/// copy must [`clone`](Clone::clone) first.
#[derive(Debug, Clone, Default)]
pub struct RemotePath {
    /// Components between separators. Never contains empty strings.
    parts: Vec<String>,
    /// Whether the path refers to a folder.
    folder: bool,
}

impl RemotePath {
    /// Parse a path string.
    ///
    /// Empty components are dropped (`a//b` collapses to `a/b`) and a
    /// trailing separator marks the path as a folder.
    pub fn parse(path: &str) -> Self {
        Self {
            parts: split_components(path),
            folder: path.ends_with('/'),
        }
    }

    /// The root folder path (empty string form, folder flag set).
    pub fn root() -> Self {
        Self {
            parts: Vec::new(),
            folder: true,
        }
    }

    /// Get the path components.
    pub fn components(&self) -> &[String] {
        &self.parts
    }

    /// Get the file or folder name (last component).
    ///
    /// Returns an empty string for the root path.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    /// Append one or more components.
    ///
    /// The folder flag is reset from the trailing separator of `subpath`:
    /// pushing `"docs/"` yields a folder path, pushing `"a.txt"` a file path.
    pub fn push(&mut self, subpath: &str) -> &mut Self {
        self.parts.extend(split_components(subpath));
        self.folder = subpath.ends_with('/');
        self
    }

    /// Drop the last component. No-op on an empty path.
    pub fn pop(&mut self) -> &mut Self {
        self.parts.pop();
        self
    }

    /// Append all of `other`'s components, taking its folder flag.
    pub fn concat(&mut self, other: &RemotePath) -> &mut Self {
        self.parts.extend(other.parts.iter().cloned());
        self.folder = other.folder;
        self
    }

    /// Strip a shared leading-component run with `ancestor`.
    ///
    /// Components are removed from the front while they match `ancestor`'s
    /// components in order; the first non-match halts the strip. A partial
    /// prefix match is not an error, the strip just stops early.
    pub fn rebase(&mut self, ancestor: &RemotePath) -> &mut Self {
        let shared = self
            .parts
            .iter()
            .zip(ancestor.parts.iter())
            .take_while(|(a, b)| a == b)
            .count();
        self.parts.drain(..shared);
        self
    }

    /// Whether this path refers to a folder.
    pub fn is_folder(&self) -> bool {
        self.folder
    }

    /// Whether this path has no components.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Percent-encode each component, leaving separators intact.
    pub fn uri_encoded(&self) -> String {
        let encoded: Vec<String> = self
            .parts
            .iter()
            .map(|part| urlencoding::encode(part).into_owned())
            .collect();
        if encoded.is_empty() {
            return String::new();
        }
        let joined = encoded.join("/");
        if self.folder {
            format!("{}/", joined)
        } else {
            joined
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return Ok(());
        }
        write!(f, "{}", self.parts.join("/"))?;
        if self.folder {
            write!(f, "/")?;
        }
        Ok(())
    }
}

/// Equality is defined by string form: `a/b/` != `a/b`.
impl PartialEq for RemotePath {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts && (self.folder == other.folder || self.parts.is_empty())
    }
}

impl Eq for RemotePath {}

/// Serialized as the string form, so `a/b/` survives a round trip as a
/// folder path.
impl serde::Serialize for RemotePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for RemotePath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(RemotePath::parse(&raw))
    }
}

fn split_components(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for p in ["", "a", "a/b", "a/b/", "a//b", "/a/b/c", "x/"] {
            let once = RemotePath::parse(p).to_string();
            let twice = RemotePath::parse(&once).to_string();
            assert_eq!(once, twice, "round-trip failed for {:?}", p);
        }
    }

    #[test]
    fn test_folder_detection() {
        assert!(RemotePath::parse("a/b/").is_folder());
        assert!(!RemotePath::parse("a/b").is_folder());
        assert_eq!(RemotePath::parse("").to_string(), "");
    }

    #[test]
    fn test_collapses_empty_components() {
        assert_eq!(RemotePath::parse("a//b").to_string(), "a/b");
        assert_eq!(RemotePath::parse("/a/b").to_string(), "a/b");
    }

    #[test]
    fn test_push_resets_folder_flag() {
        let mut path = RemotePath::parse("a/");
        path.push("b/c");
        assert_eq!(path.to_string(), "a/b/c");
        assert!(!path.is_folder());

        path.push("d/");
        assert_eq!(path.to_string(), "a/b/c/d/");
        assert!(path.is_folder());
    }

    #[test]
    fn test_pop() {
        let mut path = RemotePath::parse("a/b/c");
        path.pop();
        assert_eq!(path.components(), ["a", "b"]);

        let mut empty = RemotePath::parse("");
        empty.pop();
        assert_eq!(empty.to_string(), "");
    }

    #[test]
    fn test_concat() {
        let mut base = RemotePath::parse("a/b/");
        let other = RemotePath::parse("c/d");
        base.concat(&other);
        assert_eq!(base.to_string(), "a/b/c/d");
        assert!(!base.is_folder());
    }

    #[test]
    fn test_rebase() {
        let mut path = RemotePath::parse("foo/bar/xyz");
        path.rebase(&RemotePath::parse("foo"));
        assert_eq!(path.to_string(), "bar/xyz");
    }

    #[test]
    fn test_rebase_partial_prefix_stops_early() {
        let mut path = RemotePath::parse("foo/bar/xyz");
        path.rebase(&RemotePath::parse("foo/other"));
        assert_eq!(path.to_string(), "bar/xyz");

        let mut unrelated = RemotePath::parse("foo/bar");
        unrelated.rebase(&RemotePath::parse("baz"));
        assert_eq!(unrelated.to_string(), "foo/bar");
    }

    #[test]
    fn test_name() {
        assert_eq!(RemotePath::parse("a/b/c.txt").name(), "c.txt");
        assert_eq!(RemotePath::parse("a/b/").name(), "b");
        assert_eq!(RemotePath::parse("").name(), "");
    }

    #[test]
    fn test_uri_encoding_preserves_separators() {
        let path = RemotePath::parse("my docs/r&d notes.txt");
        assert_eq!(path.uri_encoded(), "my%20docs/r%26d%20notes.txt");

        let folder = RemotePath::parse("a b/");
        assert_eq!(folder.uri_encoded(), "a%20b/");
    }

    #[test]
    fn test_equality_by_string_form() {
        assert_eq!(RemotePath::parse("a/b"), RemotePath::parse("a//b"));
        assert_ne!(RemotePath::parse("a/b"), RemotePath::parse("a/b/"));
    }

    #[test]
    fn test_serde_round_trip() {
        let path = RemotePath::parse("docs/reports/");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"docs/reports/\"");

        let restored: RemotePath = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, path);
        assert!(restored.is_folder());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = RemotePath::parse("a/b/");
        let copy = original.clone();
        original.push("c");
        assert_eq!(copy.to_string(), "a/b/");
        assert_eq!(original.to_string(), "a/b/c");
    }
}
