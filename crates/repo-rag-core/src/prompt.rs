//! Test-generation prompt templates.
//!
//! Three styles: `unit` tests for a source file, `api` tests from a
//! description plus API docs, and `ui` Playwright tests for a user flow.
//! Retrieved context chunks are appended under a `### Related context:`
//! heading, separated by `---` rules.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TestStyle {
    #[default]
    Unit,
    Api,
    Ui,
}

impl TestStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStyle::Unit => "unit",
            TestStyle::Api => "api",
            TestStyle::Ui => "ui",
        }
    }

    /// Whether the style is driven by a source file rather than a prompt.
    pub fn needs_source(&self) -> bool {
        matches!(self, TestStyle::Unit)
    }
}

impl fmt::Display for TestStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown names fall back to [`TestStyle::Unit`]; the CLI only passes
/// `unit`, `api` or `ui`.
impl FromStr for TestStyle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "api" => TestStyle::Api,
            "ui" => TestStyle::Ui,
            _ => TestStyle::Unit,
        })
    }
}

/// Render the `### Related context:` block, or `""` without context.
pub fn context_block<S: AsRef<str>>(chunks: &[S]) -> String {
    if chunks.is_empty() {
        return String::new();
    }
    let joined = chunks
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    format!("\n\n### Related context:\n{}", joined)
}

/// Build the generation prompt for `style`.
pub fn build_test_prompt<S: AsRef<str>>(
    style: TestStyle,
    source_code: &str,
    context_chunks: &[S],
    user_prompt: Option<&str>,
) -> String {
    let context = context_block(context_chunks);
    let user_prompt = user_prompt.unwrap_or("");

    match style {
        TestStyle::Unit => format!(
            "You are a professional software engineer.\n\n\
             Write both **positive and negative** unit tests for the following Python source code.\n\n\
             ### Source code:\n{}\n\n{}\n\n\
             Use idiomatic Python (e.g. pytest or unittest). Include assertions and edge cases.\n\
             Return only the test code with necessary imports.\n",
            source_code, context
        ),
        TestStyle::Api => format!(
            "You are a professional backend QA engineer.\n\n\
             Given the API documentation and related context below, write automated tests **based on this prompt**:\n\n\
             ▶️ {}\n\n\
             ### Related API docs and code:\n{}\n\n\
             Return only the test code. You can assume a standard test client like `requests` or a test framework.\n",
            user_prompt, context
        ),
        TestStyle::Ui => format!(
            "You are a frontend test automation engineer.\n\n\
             Write a **Playwright test** for the following user flow:\n\n\
             ▶️ {}\n\n\
             ### Related frontend context (optional):\n{}\n\n\
             Return only the Playwright test code in Python. Include required imports.\n",
            user_prompt, context
        ),
    }
}
