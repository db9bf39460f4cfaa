//! Deterministic document identifiers.
//!
//! Identifiers are derived from `(tag, path, chunk_index)` so that
//! re-indexing an unchanged file reproduces the same identifiers and
//! replaces the stored documents instead of duplicating them.

use crate::models::Tag;

/// Build a document identifier.
///
/// Per-chunk mode yields `"{tag}:{path}:{chunk_index}"`; whole-file mode
/// (`chunk_index = None`) yields `"{tag}:{path}"`.
///
/// ```rust
/// use repo_rag_core::identity::identity;
/// use repo_rag_core::models::Tag;
///
/// assert_eq!(identity(Tag::Source, "src/calc.py", Some(2)), "source:src/calc.py:2");
/// assert_eq!(identity(Tag::Doc, "README.md", None), "doc:README.md");
/// ```
pub fn identity(tag: Tag, path: &str, chunk_index: Option<u32>) -> String {
    match chunk_index {
        Some(idx) => format!("{}:{}:{}", tag, path, idx),
        None => format!("{}:{}", tag, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_different_tags_never_collide() {
        let a = identity(Tag::Source, "calc.py", Some(0));
        let b = identity(Tag::Test, "calc.py", Some(0));
        assert_ne!(a, b);
        assert_ne!(identity(Tag::Source, "calc.py", None), identity(Tag::Doc, "calc.py", None));
    }

    #[test]
    fn test_stable_across_calls() {
        assert_eq!(
            identity(Tag::Test, "test/test_calc.py", Some(7)),
            identity(Tag::Test, "test/test_calc.py", Some(7))
        );
    }

    #[test]
    fn test_chunk_index_distinguishes() {
        assert_ne!(
            identity(Tag::Doc, "a.md", Some(0)),
            identity(Tag::Doc, "a.md", Some(1))
        );
        assert_ne!(identity(Tag::Doc, "a.md", Some(0)), identity(Tag::Doc, "a.md", None));
    }
}
