//! Store paths for addressing locations in the remote tree
//!
//! Provides [`StorePath`], a validated `/`-separated location such as
//! `properties/Delaware/Westover Pointe`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Characters the remote tree refuses inside a key
const FORBIDDEN: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// Location within the remote tree
///
/// Every segment is a key of the tree. Segments are kept verbatim (spaces and
/// mixed case are fine), only the characters the backend cannot store are
/// rejected.
///
/// # Examples
/// - `["properties"]` → `properties`
/// - `["properties", "Delaware", "Westover Pointe"]` → `properties/Delaware/Westover Pointe`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StorePath(Vec<String>);

impl StorePath {
    /// Create path from segments, validating each one
    ///
    /// # Errors
    /// Returns [`PathError`] for empty segments or forbidden characters
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(|seg| {
                let seg = seg.into();
                validate_segment(&seg)?;
                Ok(seg)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }

    /// Empty path (root of the tree)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning new path
    ///
    /// # Errors
    /// Returns [`PathError`] if the segment is not a valid key
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut new = self.clone();
        new.0.push(segment);
        Ok(new)
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Check if paths overlap (one is prefix of other)
    ///
    /// A write at one path changes the snapshot seen at the other.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl Display for StorePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for StorePath {
    type Err = PathError;

    /// Parse `a/b/c`; leading and trailing slashes are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::new(trimmed.split('/'))
    }
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment);
    }
    if segment
        .chars()
        .any(|c| FORBIDDEN.contains(&c) || c.is_ascii_control())
    {
        return Err(PathError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

/// Errors related to store paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid key '{0}' (must not contain . $ # [ ] / or control characters)")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_new_and_segments() {
        let path = StorePath::new(["properties", "Delaware"]).unwrap();
        assert_eq!(path.segments(), &["properties", "Delaware"]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_keeps_spaces_verbatim() {
        let path = StorePath::new(["properties", "Delaware", "Westover Pointe"]).unwrap();
        assert_eq!(path.last(), Some("Westover Pointe"));
        assert_eq!(path.to_string(), "properties/Delaware/Westover Pointe");
    }

    #[test]
    fn path_root() {
        let path = StorePath::root();
        assert!(path.is_root());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn path_child_validates() {
        let base = StorePath::new(["properties"]).unwrap();
        assert!(base.child("Delaware").is_ok());
        assert!(matches!(
            base.child("St. Mary"),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(matches!(base.child(""), Err(PathError::EmptySegment)));
    }

    #[test]
    fn path_overlaps() {
        let state: StorePath = "properties/Delaware".parse().unwrap();
        let property: StorePath = "properties/Delaware/Westover Pointe".parse().unwrap();
        let other: StorePath = "properties/Ohio".parse().unwrap();

        assert!(state.overlaps(&property));
        assert!(property.overlaps(&state));
        assert!(!state.overlaps(&other));
        assert!(StorePath::root().overlaps(&other));
    }

    #[test]
    fn path_from_str_trims_slashes() {
        let path: StorePath = "/properties/Delaware/".parse().unwrap();
        assert_eq!(path.segments(), &["properties", "Delaware"]);
    }

    #[test]
    fn path_from_str_rejects_forbidden_chars() {
        for bad in ["a/b#c", "a/[b]", "a/$b"] {
            let result: Result<StorePath, _> = bad.parse();
            assert!(matches!(result, Err(PathError::InvalidSegment(_))), "{bad}");
        }
        let result: Result<StorePath, _> = "a//b".parse();
        assert!(matches!(result, Err(PathError::EmptySegment)));
    }
}
