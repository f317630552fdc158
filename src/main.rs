use anyhow::Result;
use aurora::commands::{self, ChatArgs, DEFAULT_HOST, DEFAULT_PORT, SearchArgs};
use aurora::config::{API_KEY_ENV, Config, DEFAULT_TIMEOUT_SECS};
use aurora::http::{BackoffPolicy, MAX_RETRIES, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS};
use aurora::perplexity::Perplexity;
use aurora::schema::{Model, RecencyFilter, SearchMode};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// aurora - Perplexity API wrapper
///
/// Serves a JSON API and a small web UI that forward chat and search requests
/// to Perplexity, retrying rate limits and network errors with exponential backoff.
///
/// The PERPLEXITY_API_KEY environment variable (or --api-key) is required.
///
/// Examples:
///   aurora serve --port 8000
///   aurora chat "What is new in Rust 2024?"
///   aurora search "tokio runtime" --recency week
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Perplexity API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Upstream API URL (defaults to https://api.perplexity.ai)
    #[arg(long, env = "AURORA_BASE_URL", value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Per-attempt network timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_name = "SECS", global = true)]
    timeout_secs: u64,

    /// Retries after the first attempt on rate limits and network errors
    #[arg(long, default_value_t = MAX_RETRIES, value_name = "N", global = true)]
    max_retries: u32,

    /// Delay before the first retry; doubles on every further retry
    #[arg(long, default_value_t = RETRY_BASE_DELAY_MS, value_name = "MS", global = true)]
    retry_base_ms: u64,

    /// Upper bound for a single retry delay
    #[arg(long, default_value_t = RETRY_MAX_DELAY_MS, value_name = "MS", global = true)]
    retry_max_ms: u64,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and web UI
    Serve(ServeArgs),

    /// Send a single chat message
    Chat(ChatCliArgs),

    /// Search the web
    Search(SearchCliArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_HOST)]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, short = 'p', env = "AURORA_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[derive(clap::Args, Debug)]
struct ChatCliArgs {
    /// The message to send
    #[arg(value_name = "MESSAGE")]
    message: String,

    /// sonar, sonar-pro, sonar-reasoning-pro or sonar-deep-research
    #[arg(long, short = 'm', default_value = "sonar")]
    model: Model,

    /// Randomness (0-2)
    #[arg(long, short = 't', default_value_t = 0.2)]
    temperature: f64,

    /// web, academic or sec
    #[arg(long, default_value = "web")]
    search_mode: SearchMode,
}

#[derive(clap::Args, Debug)]
struct SearchCliArgs {
    /// The search query
    #[arg(value_name = "QUERY")]
    query: String,

    /// Number of results (1-50)
    #[arg(long, short = 'n', default_value_t = 5)]
    max_results: u32,

    /// day, week, month or year
    #[arg(long)]
    recency: Option<RecencyFilter>,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let backoff = BackoffPolicy::new(
            Duration::from_millis(self.retry_base_ms),
            Duration::from_millis(self.retry_max_ms),
            self.max_retries,
        );
        Ok(Config::new(self.api_key.clone(), self.base_url.clone())?
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_backoff(backoff))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.config()?;

    match cli.command {
        Commands::Serve(args) => {
            commands::serve(config, SocketAddr::new(args.host, args.port)).await?
        }
        Commands::Chat(args) => {
            let api = Perplexity::from_config(&config)?;
            let out = commands::chat(
                &api,
                ChatArgs {
                    message: args.message,
                    model: args.model,
                    temperature: args.temperature,
                    search_mode: args.search_mode,
                },
            )
            .await?;
            println!("{}", out);
        }
        Commands::Search(args) => {
            let api = Perplexity::from_config(&config)?;
            let out = commands::search(
                &api,
                SearchArgs {
                    query: args.query,
                    max_results: args.max_results,
                    recency: args.recency,
                },
            )
            .await?;
            println!("{}", out);
        }
    }
    Ok(())
}
