//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `obs_client` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - JSON output of extracted records and analytics
//!
//! All core functionality is implemented in the library crate.

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use obs_client::config::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use obs_client::initialization::init_logger;
use obs_client::models::CourseEntry;
use obs_client::{
    AnalyticsResult, Config, Credentials, ExtractorRegistry, LogFormat, LogLevel, ObsClient, PageKind,
};

/// Command-line options.
///
/// Credentials are read from `OBS_USERNAME` and `OBS_PASSWORD` (a `.env`
/// file is loaded first), never from flags.
///
/// # Examples
///
/// ```bash
/// # Extracted transcript as JSON
/// obs_client --base-url https://obs.example.edu.tr page transcript
///
/// # Notifications as of a given date
/// obs_client analytics notifications --as-of 2025-03-01
///
/// # Re-extract a saved page without logging in
/// obs_client extract fees ./HarcBilgileri.html
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "obs_client",
    about = "Reads academic records from a student information system."
)]
struct Opt {
    /// Base URL of the records system (falls back to OBS_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Path of the login page
    #[arg(long)]
    login_path: Option<String>,

    /// Maximum number of announcements to return
    #[arg(long)]
    announcement_limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in, fetch a page and print its records
    Page {
        /// profile|transcript|courses|fees|attendance|announcements|weekly_schedule|messages|
        /// library|registration|thesis|internships|petitions|materials|events|online_education
        page: PageKind,
    },
    /// Extract records from a saved HTML file (no network)
    Extract { page: PageKind, file: PathBuf },
    /// Log in and compute analytics
    Analytics {
        #[command(subcommand)]
        which: AnalyticsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum AnalyticsCommand {
    /// GPA per term and trend
    GpaTrend,
    /// Credits earned and terms remaining
    CreditProjection,
    /// Prerequisite and schedule check for candidate courses
    CourseAdvisory {
        /// JSON file with an array of candidate courses
        #[arg(long)]
        candidates: PathBuf,
    },
    /// Academic, attendance and payment notifications
    Notifications {
        /// Reference date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

impl Opt {
    /// Builds the client configuration; the base URL may still be empty here
    /// since `extract` never contacts the server.
    fn to_config(&self) -> Config {
        let base_url = self
            .base_url
            .clone()
            .or_else(|| std::env::var("OBS_BASE_URL").ok())
            .unwrap_or_default();
        let mut config = Config {
            base_url,
            timeout_seconds: self.timeout_seconds,
            user_agent: self.user_agent.clone(),
            announcement_limit: self.announcement_limit,
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            ..Default::default()
        };
        if let Some(path) = &self.login_path {
            config.login_path = path.clone();
        }
        config
    }
}

fn credentials_from_env() -> Result<Credentials> {
    let username = std::env::var("OBS_USERNAME").context("OBS_USERNAME must be set")?;
    let password = std::env::var("OBS_PASSWORD").context("OBS_PASSWORD must be set")?;
    Ok(Credentials::new(username, password))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

async fn run(opt: Opt, config: Config) -> Result<()> {
    if let Command::Extract { page, file } = &opt.command {
        let html = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let result = ExtractorRegistry::default()
            .with_link_limit(opt.announcement_limit)
            .extract(*page, &html)
            .with_context(|| format!("Failed to extract {page} from {}", file.display()))?;
        return print_json(&result);
    }

    if config.base_url.is_empty() {
        bail!("--base-url or OBS_BASE_URL must be set");
    }
    let mut client = ObsClient::new(config).context("Failed to initialize client")?;
    client
        .login(credentials_from_env()?)
        .await
        .context("Login failed")?;

    let outcome = match opt.command {
        Command::Page { page } => match client.fetch_page(page).await {
            Ok(result) => print_json(&result),
            Err(e) => Err(e).with_context(|| format!("Failed to fetch {page}")),
        },
        Command::Analytics { which } => analytics(&mut client, which)
            .await
            .and_then(|result| print_json(&result)),
        Command::Extract { .. } => Ok(()),
    };

    client.logout().await;
    outcome
}

async fn analytics(client: &mut ObsClient, which: AnalyticsCommand) -> Result<AnalyticsResult> {
    let result = match which {
        AnalyticsCommand::GpaTrend => AnalyticsResult::GpaTrend(client.gpa_trend().await?),
        AnalyticsCommand::CreditProjection => AnalyticsResult::CreditProjection(client.credit_projection().await?),
        AnalyticsCommand::CourseAdvisory { candidates } => {
            let text = std::fs::read_to_string(&candidates)
                .with_context(|| format!("Failed to read {}", candidates.display()))?;
            let courses: Vec<CourseEntry> =
                serde_json::from_str(&text).context("Candidate courses are not valid JSON")?;
            AnalyticsResult::CourseAdvisory(client.course_advisory(&courses).await?)
        }
        AnalyticsCommand::Notifications { as_of } => {
            let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
            AnalyticsResult::Notifications(client.notifications(as_of).await?)
        }
    };
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load OBS_USERNAME / OBS_PASSWORD from .env (if it exists)
    let _ = dotenvy::dotenv();

    let opt = Opt::parse();
    let config = opt.to_config();
    init_logger(&config).context("Failed to initialize logger")?;

    if let Err(e) = run(opt, config).await {
        eprintln!("obs_client error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
