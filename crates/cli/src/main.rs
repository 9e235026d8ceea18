// ABOUTME: newsdesk CLI: scrape a single URL or run one feed intake pass and print JSON.
// ABOUTME: Logs go to stderr through tracing so stdout stays machine-readable.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use newsdesk_feed::config::DEFAULT_CONFIG_PATH;
use newsdesk_feed::dedup::DEFAULT_CACHE_PATH;
use newsdesk_feed::{DedupCache, FeedFetcher, Intake, IntakeConfigStore, SuggestionSink};
use newsdesk_scraper::{Client, RequestType, ScrapeOptions, ScrapeRequest, ScrapeResult};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "newsdesk")]
#[command(about = "Scrape articles and run feed intake from the command line", long_about = None)]
struct Args {
    /// Output compact JSON instead of pretty.
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,

    /// Allow fetching private, loopback and link-local addresses.
    #[arg(long, global = true, default_value_t = false)]
    allow_private: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape one URL and print the result.
    Scrape {
        url: String,

        #[arg(long = "type", value_enum, default_value_t = TypeArg::Auto)]
        kind: TypeArg,

        /// Include the raw HTML in the output.
        #[arg(long)]
        return_html: bool,

        /// Request timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Feed intake commands.
    Feeds {
        #[command(subcommand)]
        command: FeedsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FeedsCommand {
    /// Run one intake pass and print the summary plus extracted items.
    Check {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        #[arg(long, default_value = DEFAULT_CACHE_PATH)]
        cache: PathBuf,

        /// Feeds processed at once.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TypeArg {
    Auto,
    Html,
    Pdf,
}

impl From<TypeArg> for RequestType {
    fn from(value: TypeArg) -> Self {
        match value {
            TypeArg::Auto => RequestType::Auto,
            TypeArg::Html => RequestType::Html,
            TypeArg::Pdf => RequestType::Pdf,
        }
    }
}

/// Collects extracted items so they can be printed with the summary.
#[derive(Default)]
struct CollectingSink {
    items: Mutex<Vec<ScrapeResult>>,
}

#[async_trait]
impl SuggestionSink for CollectingSink {
    async fn suggest(&self, result: ScrapeResult, _source: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.push(result);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = Arc::new(
        Client::builder()
            .allow_private_networks(args.allow_private)
            .build(),
    );

    match args.command {
        Command::Scrape {
            url,
            kind,
            return_html,
            timeout_ms,
        } => {
            let request = ScrapeRequest {
                url,
                request_type: Some(kind.into()),
                options: ScrapeOptions {
                    return_html: Some(return_html),
                    timeout_ms,
                    ..Default::default()
                },
            };
            let result = client.scrape(request).await;
            print_json(&result, args.compact)?;
        }
        Command::Feeds {
            command:
                FeedsCommand::Check {
                    config,
                    cache,
                    concurrency,
                },
        } => {
            let sink = Arc::new(CollectingSink::default());
            let intake = Intake::new(
                IntakeConfigStore::load(&config),
                DedupCache::open(&cache).await,
                client.clone(),
                sink.clone(),
            )
            .with_fetcher(FeedFetcher::new(args.allow_private))
            .with_feed_concurrency(concurrency);

            let summary = intake.run_pass().await;
            let items = sink
                .items
                .lock()
                .map(|items| items.clone())
                .unwrap_or_default();
            print_json(
                &serde_json::json!({ "summary": summary, "items": items }),
                args.compact,
            )?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    if compact {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
