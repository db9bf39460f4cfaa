//! Core data models shared by the indexing and retrieval pipeline.
//!
//! A [`SourceFile`] is read once per indexing run and split into chunks;
//! each chunk becomes a [`Document`] owned by a vector-store collection.
//! Retrieval returns a [`RetrievalResult`] of text and metadata pairs.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse category assigned by the caller when indexing a batch of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Source,
    Test,
    Doc,
}

impl Tag {
    pub const ALL: [Tag; 3] = [Tag::Source, Tag::Test, Tag::Doc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Source => "source",
            Tag::Test => "test",
            Tag::Doc => "doc",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(Tag::Source),
            "test" => Ok(Tag::Test),
            "doc" => Ok(Tag::Doc),
            other => Err(format!(
                "unknown tag '{}': expected source, test, or doc",
                other
            )),
        }
    }
}

/// Language detected from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    Markdown,
    Unknown,
}

impl Language {
    /// Detect the language of `path` from its extension (case-insensitive).
    ///
    /// ```rust
    /// use repo_rag_core::models::Language;
    ///
    /// assert_eq!(Language::from_path("src/calc.PY"), Language::Python);
    /// assert_eq!(Language::from_path("README"), Language::Unknown);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("py") => Language::Python,
            Some("java") => Language::Java,
            Some("md") => Language::Markdown,
            _ => Language::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::Markdown => "markdown",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "markdown" => Ok(Language::Markdown),
            "unknown" => Ok(Language::Unknown),
            other => Err(format!(
                "unknown language '{}': expected python, java, markdown, or unknown",
                other
            )),
        }
    }
}

/// A file read for indexing. Never mutated and never persisted itself.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
    pub language: Language,
    pub tag: Tag,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>, tag: Tag) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            content: content.into(),
            language,
            tag,
        }
    }

    /// Read `path` from disk, replacing invalid UTF-8 sequences.
    pub fn load(path: &Path, tag: Tag) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::new(path.to_string_lossy(), content, tag))
    }

    /// Base name of the file, or the full path when it has none.
    pub fn file_name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.clone())
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Metadata persisted alongside every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_path: String,
    pub file_name: String,
    pub tag: Tag,
    pub language: Language,
    pub chunk_index: u32,
}

/// The persisted unit of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Conjunctive equality filter over `tag` and `language`.
///
/// Absent fields impose no constraint; the default filter matches
/// every document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub tag: Option<Tag>,
    pub language: Option<Language>,
}

impl QueryFilter {
    pub fn tag(tag: Tag) -> Self {
        Self {
            tag: Some(tag),
            language: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        self.tag.map_or(true, |t| t == metadata.tag)
            && self.language.map_or(true, |l| l == metadata.language)
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.language.is_none()
    }
}

/// One ranked match returned by a store query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Cosine similarity to the query embedding.
    pub score: f32,
}

/// Ranked matches, most similar first, at most `top_k` long.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }
}
