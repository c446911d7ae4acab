//! Index access methods.

use std::fmt;

/// A PostgreSQL index access method. "No index" is `Option::<IndexType>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    /// Balanced tree, the default method.
    #[default]
    Btree,
    /// Hash table.
    Hash,
    /// Generalized search tree.
    Gist,
    /// Space-partitioned generalized search tree.
    SpGist,
    /// Generalized inverted index.
    Gin,
    /// Block range index.
    Brin,
}

impl IndexType {
    /// All index methods.
    pub const ALL: &'static [Self] = &[
        Self::Btree,
        Self::Hash,
        Self::Gist,
        Self::SpGist,
        Self::Gin,
        Self::Brin,
    ];

    /// Returns the method name as used after `USING`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Btree => "btree",
            Self::Hash => "hash",
            Self::Gist => "gist",
            Self::SpGist => "spgist",
            Self::Gin => "gin",
            Self::Brin => "brin",
        }
    }

    /// Parses a method name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(IndexType::parse("btree"), Some(IndexType::Btree));
        assert_eq!(IndexType::parse("GIN"), Some(IndexType::Gin));
        assert_eq!(IndexType::parse("spgist"), Some(IndexType::SpGist));
        assert_eq!(IndexType::parse("rtree"), None);
        assert_eq!(IndexType::parse(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(IndexType::Brin.to_string(), "brin");
        assert_eq!(IndexType::default(), IndexType::Btree);
    }
}
