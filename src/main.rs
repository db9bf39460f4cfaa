//! # repo-rag CLI (`rag`)
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag init` | Create the SQLite database and run schema migrations |
//! | `rag index --src DIR --test DIR --doc DIR` | Chunk, embed, and upsert files |
//! | `rag query "<text>"` | Ranked chunks, optionally with a grounded answer |
//! | `rag generate --style unit\|api\|ui` | Retrieval-augmented test generation |
//! | `rag collections list` | Collections with document counts |
//! | `rag collections drop <NAME\|ALL>` | Drop a collection |
//! | `rag completions <shell>` | Print a shell completion script |
//!
//! `OPENAI_API_KEY` and `OPENAI_API_BASE` are read once here and handed
//! to the providers. Logs go to stderr; set `RUST_LOG` to adjust.

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use repo_rag::collections;
use repo_rag::config;
use repo_rag::embedding::OpenAiCredentials;
use repo_rag::generate_cmd::{self, GenerateArgs};
use repo_rag::index_cmd::{self, IndexDirs};
use repo_rag::migrate;
use repo_rag::query_cmd::{self, QueryArgs};
use repo_rag_core::models::{Language, Tag};
use repo_rag_core::prompt::TestStyle;

/// repo-rag: retrieval over your repository's code, tests, and docs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "Index source, test, and doc files into a local vector store and retrieve grounded context",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Index source, test, and documentation directories.
    ///
    /// Files are split into overlapping line windows, embedded, and
    /// upserted under deterministic IDs, so re-running replaces rather
    /// than duplicates.
    Index {
        /// Source code directory (tag `source`).
        #[arg(long)]
        src: Option<PathBuf>,

        /// Test code directory (tag `test`).
        #[arg(long)]
        test: Option<PathBuf>,

        /// Documentation directory (tag `doc`).
        #[arg(long)]
        doc: Option<PathBuf>,

        /// Target collection (defaults to `retrieval.collection`).
        #[arg(long)]
        collection: Option<String>,
    },

    /// Retrieve the chunks most similar to a query.
    Query {
        /// Query text.
        query: String,

        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Restrict to one tag: source, test, or doc.
        #[arg(long)]
        tag: Option<Tag>,

        /// Restrict to one language: python, java, markdown, unknown.
        #[arg(long)]
        language: Option<Language>,

        #[arg(long)]
        collection: Option<String>,

        /// Also synthesize an answer grounded in the results.
        #[arg(long)]
        answer: bool,
    },

    /// Generate tests with retrieved project context.
    Generate {
        /// Test style: unit (from --file), api or ui (from --prompt).
        #[arg(long, default_value = "unit", value_parser = style_parser())]
        style: TestStyle,

        /// Source file to test (unit style).
        #[arg(long)]
        file: Option<PathBuf>,

        /// What to test (api and ui styles).
        #[arg(long)]
        prompt: Option<String>,

        /// Revise the last answer in --history instead of starting over.
        #[arg(long, requires = "history")]
        correction: Option<String>,

        /// Number of context chunks (defaults to `retrieval.context_top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        collection: Option<String>,

        /// Write the generated code to this file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// JSON chat history to continue and update.
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Manage collections.
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },

    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum CollectionsAction {
    /// List collections and their document counts.
    List,
    /// Drop a collection, or every collection with `ALL`.
    Drop {
        name: String,

        /// Confirm dropping ALL collections.
        #[arg(long)]
        yes: bool,
    },
}

/// Only the known style names are accepted on the command line.
fn style_parser() -> impl TypedValueParser<Value = TestStyle> {
    PossibleValuesParser::new(["unit", "api", "ui"])
        .map(|name| name.parse::<TestStyle>().unwrap_or_default())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("repo_rag=info,repo_rag_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "rag", &mut std::io::stdout());
        return Ok(());
    }

    init_logging();
    let cfg = config::load_config(&cli.config)?;
    let creds = OpenAiCredentials::from_env();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index {
            src,
            test,
            doc,
            collection,
        } => {
            let dirs = IndexDirs { src, test, doc };
            index_cmd::run_index(&cfg, &creds, &dirs, collection.as_deref()).await?;
        }
        Commands::Query {
            query,
            top_k,
            tag,
            language,
            collection,
            answer,
        } => {
            let args = QueryArgs {
                text: query,
                top_k,
                tag,
                language,
                collection,
                answer,
            };
            query_cmd::run_query(&cfg, &creds, &args).await?;
        }
        Commands::Generate {
            style,
            file,
            prompt,
            correction,
            top_k,
            collection,
            output,
            history,
        } => {
            let args = GenerateArgs {
                style,
                file,
                prompt,
                correction,
                top_k,
                collection,
                output,
                history,
            };
            generate_cmd::run_generate(&cfg, &creds, &args).await?;
        }
        Commands::Collections { action } => match action {
            CollectionsAction::List => collections::run_list(&cfg).await?,
            CollectionsAction::Drop { name, yes } => {
                collections::run_drop(&cfg, &name, yes).await?
            }
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed_style(args: &[&str]) -> Result<TestStyle, clap::Error> {
        let cli = Cli::try_parse_from(args)?;
        match cli.command {
            Commands::Generate { style, .. } => Ok(style),
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_generate_style_values() {
        assert_eq!(parsed_style(&["rag", "generate"]).unwrap(), TestStyle::Unit);
        assert_eq!(
            parsed_style(&["rag", "generate", "--style", "api"]).unwrap(),
            TestStyle::Api
        );
        assert_eq!(
            parsed_style(&["rag", "generate", "--style", "ui"]).unwrap(),
            TestStyle::Ui
        );
    }

    #[test]
    fn test_unknown_generate_style_rejected() {
        let err = parsed_style(&["rag", "generate", "--style", "e2e"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
