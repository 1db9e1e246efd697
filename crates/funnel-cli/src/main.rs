use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use funnel_client::fetcher::DEFAULT_USER_AGENT;
use funnel_client::{Listing, ReqwestFetcher, TitleParser};
use funnel_core::{
    AppError, DelayConfig, DelayedFetcher, DispatchConfig, Dispatcher, calculate_delays,
};

#[derive(Parser)]
#[command(name = "funnel", version, about = "Polite, throttled page scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the delay schedule for a batch of items as JSON
    Delays {
        /// Number of items in the batch
        #[arg(short, long)]
        count: usize,

        #[command(flatten)]
        delay: DelayArgs,

        /// Pretty-print the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Fetch and parse every URL in a file under a delay schedule
    Scrape {
        /// File with one URL per line (`#` starts a comment)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        delay: DelayArgs,

        /// Maximum number of concurrent fetches
        #[arg(short, long, env = "FUNNEL_MAX_WORKERS", default_value_t = 8)]
        workers: usize,

        /// Give up on a fetch after this many seconds (on top of its delay)
        #[arg(long, env = "FUNNEL_FETCH_TIMEOUT")]
        fetch_timeout: Option<f64>,

        /// User-Agent header sent with every request
        #[arg(long, env = "FUNNEL_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,

        /// Allow URLs pointing at private/reserved IP addresses
        #[arg(long, default_value_t = false)]
        allow_private: bool,
    },
}

/// Delay schedule options shared by all subcommands.
///
/// Flags override values from `--delay-config`, which in turn override
/// the built-in defaults.
#[derive(Args, Debug, Clone, Default)]
struct DelayArgs {
    /// JSON file holding a delay configuration
    #[arg(long, env = "FUNNEL_DELAY_CONFIG")]
    delay_config: Option<PathBuf>,

    /// Delay curve: constant, linear or sigmoid
    #[arg(long, env = "FUNNEL_DELAY_ALGORITHM")]
    algorithm: Option<String>,

    /// Ceiling of the delay curve, in seconds
    #[arg(long, env = "FUNNEL_DELAY_MAX")]
    max_delay: Option<f64>,

    /// Floor applied to the start of the curve, in seconds (`min_duration`)
    #[arg(long, env = "FUNNEL_DELAY_MIN_DURATION")]
    min_duration: Option<f64>,

    /// Randomise each delay below the curve
    #[arg(long, default_value_t = false)]
    random: bool,

    /// Randomise each delay between the curve and the ceiling
    #[arg(long, default_value_t = false)]
    converge: bool,

    /// Lower bound for random delays when not converging, in seconds (`min_delay`)
    #[arg(long, env = "FUNNEL_DELAY_MIN_DELAY")]
    min_delay: Option<f64>,
}

impl DelayArgs {
    fn resolve(&self) -> Result<DelayConfig> {
        let mut config = match &self.delay_config {
            Some(path) => load_delay_config(path)?,
            None => DelayConfig::default(),
        };

        if let Some(tag) = &self.algorithm {
            config = config.with_algorithm_tag(tag)?;
        }
        if let Some(max) = self.max_delay {
            config.max_duration = max;
        }
        if let Some(min) = self.min_duration {
            config.min_duration = min;
        }
        if let Some(floor) = self.min_delay {
            config.min_delay = floor;
        }
        if self.random {
            config.random = true;
        }
        if self.converge {
            config.random = true;
            config.converge = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("funnel=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Delays {
            count,
            delay,
            pretty,
        } => {
            let config = delay.resolve()?;
            cmd_delays(count, &config, pretty)?;
        }
        Commands::Scrape {
            input,
            delay,
            workers,
            fetch_timeout,
            user_agent,
            allow_private,
        } => {
            let config = delay.resolve()?;
            let mut dispatch_config = DispatchConfig::new(workers);
            if let Some(secs) = fetch_timeout {
                let timeout = Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("Invalid --fetch-timeout: {secs}"))?;
                dispatch_config = dispatch_config.with_fetch_timeout(timeout);
            }
            cmd_scrape(
                &input,
                &config,
                dispatch_config,
                &user_agent,
                allow_private,
            )
            .await?;
        }
    }

    Ok(())
}

/// Read a [`DelayConfig`] from a JSON file. Missing fields take defaults.
fn load_delay_config(path: &Path) -> Result<DelayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read delay config: {}", path.display()))?;
    let config: DelayConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid delay config in {}", path.display()))?;
    Ok(config)
}

fn cmd_delays(count: usize, config: &DelayConfig, pretty: bool) -> Result<()> {
    let delays = calculate_delays(count, config)?;
    let json = if pretty {
        serde_json::to_string_pretty(&delays)?
    } else {
        serde_json::to_string(&delays)?
    };
    println!("{json}");
    Ok(())
}

async fn cmd_scrape(
    input: &Path,
    delay_config: &DelayConfig,
    dispatch_config: DispatchConfig,
    user_agent: &str,
    allow_private: bool,
) -> Result<()> {
    // 1. Load URLs
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let listings = Listing::from_lines(&text);
    if listings.is_empty() {
        tracing::warn!("No URLs found in {}", input.display());
        return Ok(());
    }

    // 2. Schedule
    let delays = calculate_delays(listings.len(), delay_config)?;
    let total_wait: f64 = delays.iter().sum();
    tracing::info!(
        items = listings.len(),
        algorithm = %delay_config.algorithm,
        max_delay = delay_config.max_duration,
        "Scheduled {:.1}s of delays",
        total_wait
    );

    // 3. Fetch + parse
    let mut fetcher = ReqwestFetcher::with_user_agent(user_agent, Duration::from_secs(30))
        .context("Failed to create HTTP client")?;
    if allow_private {
        fetcher = fetcher.allow_private_urls();
    }
    let fetcher = DelayedFetcher::new(fetcher);
    let mut parser = TitleParser::new()?;

    let dispatcher = Dispatcher::new(dispatch_config);
    let pool = dispatcher.pool();
    let summary = dispatcher
        .dispatch(listings, &fetcher, &mut parser, &pool, &delays)
        .await
        .map_err(|e| {
            let reason = dispatch_failure(&e);
            anyhow::Error::new(e).context(reason)
        })?;

    // 4. Output JSON lines to stdout
    for listing in &summary.items {
        println!("{}", serde_json::to_string(listing)?);
    }

    tracing::info!(
        parsed = parser.parsed(),
        "Scraped {} pages in {:.3}s",
        summary.items.len(),
        summary.elapsed.as_secs_f64()
    );

    Ok(())
}

fn dispatch_failure(err: &AppError) -> &'static str {
    if err.is_precondition() {
        "Scrape was not started"
    } else if err.is_fetch_error() {
        "Scrape aborted: a page could not be fetched"
    } else {
        "Scrape aborted"
    }
}
