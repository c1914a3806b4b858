//! Structured addressing into the status tree.
//!
//! Observers and transports speak in `/`-joined strings (`scene-manager/state`),
//! but inside the crate a path is an ordered list of segments so that
//! comparisons are exact and walking the tree never re-parses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Location in the status tree.
///
/// The empty path is the root.
///
/// # Examples
///
/// ```
/// use scene_mirror::Path;
///
/// let path = Path::parse("scene-manager/state");
/// assert_eq!(path.segments().len(), 2);
/// assert_eq!(path.to_string(), "scene-manager/state");
/// assert_eq!(Path::root().child("scene-manager").child("state"), path);
/// ```
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<String>);

impl Path {
    /// Separator used by the external string form.
    pub const SEPARATOR: char = '/';

    /// The root path (no segments).
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse the `/`-joined external form. The empty string is the root.
    ///
    /// Segments are taken literally, so `a//b` has an empty middle segment.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        Self(s.split(Self::SEPARATOR).map(str::to_owned).collect())
    }

    /// Parse a dotted widget key such as `scene-manager.diagram-uri`.
    pub fn from_dotted(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        Self(s.split('.').map(str::to_owned).collect())
    }

    /// Return a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment.into());
        Self(segments)
    }

    /// Append a segment in place.
    #[inline]
    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// Remove and return the last segment.
    #[inline]
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.to_string())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = Path::parse("scene-manager/available-transitions");
        assert_eq!(path.segments(), ["scene-manager", "available-transitions"]);
        assert_eq!(path.to_string(), "scene-manager/available-transitions");
    }

    #[test]
    fn test_empty_string_is_root() {
        let path = Path::parse("");
        assert_eq!(path, Path::root());
        assert!(path.segments().is_empty());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn test_dotted_widget_key() {
        assert_eq!(
            Path::from_dotted("scene-manager.diagram-uri"),
            Path::parse("scene-manager/diagram-uri")
        );
    }

    #[test]
    fn test_push_pop_child() {
        let mut path = Path::root();
        path.push("a");
        path.push("b");
        assert_eq!(path, Path::root().child("a").child("b"));
        assert_eq!(path.pop().as_deref(), Some("b"));
        assert_eq!(path.segments(), ["a"]);
    }

    #[test]
    fn test_segment_with_separator_is_distinct() {
        // A key containing '/' is one segment, so it never aliases a nested path.
        let single = Path::root().child("a/b");
        assert_ne!(single, Path::parse("a/b"));
        assert_eq!(single.segments().len(), 1);
    }

    #[test]
    fn test_serde_as_string() {
        let path = Path::parse("characters/alice");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"characters/alice\"");
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
