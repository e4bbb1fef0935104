//! Source descriptors for dependency content.

use std::fmt;

/// Where a dependency's content comes from.
///
/// The manifest encodes a source type as snake-case text (`archive`, `git`);
/// the mapping in both directions is the static table below rather than a
/// runtime case conversion, so the accepted spellings are exactly the two
/// listed and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// A git repository containing the library source code.
    ///
    /// Recognized by the manifest schema but not supported by the fetch
    /// engine; fetching a git dependency fails explicitly.
    Git = 1,

    /// A downloadable archive containing the library content.
    Archive = 2,
}

impl SourceType {
    /// Resolve the manifest text for a source type.
    ///
    /// Returns `None` for any text outside the static mapping.
    pub fn from_manifest_str(s: &str) -> Option<Self> {
        match s {
            "git" => Some(Self::Git),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }

    /// The manifest encoding of this source type.
    pub fn as_manifest_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Archive => "archive",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_manifest_str())
    }
}
