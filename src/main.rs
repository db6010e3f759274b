mod logging;

use clap::{Parser, Subcommand};
use figment::providers::Serialized;
use offwiki_config::Config;
use offwiki_library::error::{ErrorKind, Result};
use offwiki_library::{Library, LoadHandle};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file; defaults to the per-user location.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Multistream archive, overriding the configuration.
    #[arg(long, global = true)]
    archive: Option<PathBuf>,
    /// Index source, overriding the configuration.
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    /// Only log warnings and errors (unless RUST_LOG is set).
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search article titles.
    Search {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the wikitext of an article.
    Get {
        title: String,
        /// Redirect pages to follow, overriding the configuration.
        #[arg(long)]
        follow_redirects: Option<u8>,
        /// Print the article's categories instead of its text.
        #[arg(long)]
        categories: bool,
    },
    /// Load the whole index and report what it holds.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(if cli.quiet { "warn" } else { "info" });
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Search { query, limit } => {
            let (library, loading) = Library::open(&config)?;
            // Ranking needs every title; a partial index would hide better matches.
            wait(loading).await?;
            for title in library.search(&query, limit) {
                println!("{title}");
            }
        },
        Command::Get { title, follow_redirects, categories } => {
            let mut config = config;
            if let Some(hops) = follow_redirects {
                config.retrieval.follow_redirects = hops;
            }
            let (library, loading) = Library::open(&config)?;
            let result = match library.get_article(&title).await {
                // Not indexed yet: wait for the rest of the index and ask again.
                Err(err) if matches!(*err, ErrorKind::NotFound { .. }) && err.is_retryable() => {
                    wait(loading).await?;
                    library.get_article(&title).await
                },
                result => result,
            };
            let article = match result {
                Err(err) if matches!(*err, ErrorKind::NotFound { .. }) => {
                    for candidate in library.suggest(&title) {
                        eprintln!("did you mean {candidate:?}?");
                    }
                    return Err(err);
                },
                result => result?,
            };
            if categories {
                for category in article.categories() {
                    println!("{category}");
                }
            } else {
                println!("{}", article.text);
            }
        },
        Command::Status => {
            let (library, loading) = Library::open(&config)?;
            wait(loading).await?;
            let status = library.index_status();
            println!("state:      {}", status.state);
            println!("entries:    {}", status.entries_loaded);
            println!("blocks:     {}", library.index().block_count());
            println!("malformed:  {}", status.malformed_lines);
            println!("duplicates: {}", status.duplicate_lines);
        },
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut figment = Config::figment(cli.config.as_deref());
    if let Some(archive) = &cli.archive {
        figment = figment.merge(Serialized::default("archive", archive));
    }
    if let Some(index) = &cli.index {
        figment = figment.merge(Serialized::default("index", index));
    }
    if let Some(path) = &cli.config
        && !path.is_file()
    {
        exn::bail!(ErrorKind::Config(offwiki_config::error::ErrorKind::MissingFile(path.clone())));
    }
    Config::from_figment(&figment).map_err(ErrorKind::config)
}

async fn wait(loading: LoadHandle) -> Result<()> {
    let summary = loading.wait().await.map_err(ErrorKind::index)?;
    tracing::debug!(entries = summary.entries, elapsed_ms = summary.elapsed.as_millis() as u64, "index ready");
    Ok(())
}
