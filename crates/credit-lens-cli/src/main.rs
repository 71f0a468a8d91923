use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use credit_lens_core::{
    client_from_settings, render_breakdown, render_snapshot, render_weight_table, score_breakdown,
    AggregationRequest, Aggregator, BureauScores, BureauSettings, LoanPurpose, Notification,
    NotificationKind, NotificationSink, OutputFormat, SourceKind,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "credit-lens",
    author,
    version,
    about = "Multi-bureau credit report aggregator"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON) with `bureau` settings and `default_purpose`
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch all four bureau reports and print the aggregated view
    Fetch {
        /// Subject identifier (PAN); placeholder reports are shown when omitted
        #[arg(long)]
        subject: Option<String>,
        /// Loan purpose: personal, business, home, car or education
        #[arg(long)]
        purpose: Option<String>,
        /// Override the configured bureau source
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
        #[arg(long, value_enum, default_value_t = FormatArg::Human)]
        format: FormatArg,
    },
    /// Compute a normalized score from four bureau scores
    Normalize {
        #[arg(long)]
        cibil: u32,
        #[arg(long)]
        crif: u32,
        #[arg(long)]
        equifax: u32,
        #[arg(long)]
        experian: u32,
        #[arg(long, default_value = "personal")]
        purpose: String,
    },
    /// Print the bureau weight table for every loan purpose
    Weights,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Http,
    Fixture,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Http => SourceKind::Http,
            SourceArg::Fixture => SourceKind::Fixture,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Human,
    Json,
    Yaml,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Human => OutputFormat::Human,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

/// Settings read from `--config` and `CREDIT_LENS__*` variables.
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    #[serde(default)]
    bureau: Option<BureauSettings>,
    #[serde(default)]
    default_purpose: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let app = load_config(cli.config.as_deref())?;
    match cli.command.unwrap_or(Commands::Weights) {
        Commands::Fetch {
            subject,
            purpose,
            source,
            format,
        } => fetch(app, subject, purpose, source, format).await?,
        Commands::Normalize {
            cibil,
            crif,
            equifax,
            experian,
            purpose,
        } => normalize(
            BureauScores {
                cibil,
                crif,
                equifax,
                experian,
            },
            &purpose,
        )?,
        Commands::Weights => print!("{}", render_weight_table()?),
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("CREDIT_LENS")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    let settings = builder.build().with_context(|| match path {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration from environment".to_string(),
    })?;
    settings
        .try_deserialize()
        .context("configuration has an unexpected shape")
}

async fn fetch(
    app: AppConfig,
    subject: Option<String>,
    purpose: Option<String>,
    source: Option<SourceArg>,
    format: FormatArg,
) -> Result<()> {
    let mut settings = match app.bureau {
        Some(settings) => settings,
        None => BureauSettings::from_env()?,
    };
    if let Some(source) = source {
        settings.source = source.into();
    }

    let client = client_from_settings(&settings)?;
    let aggregator = Aggregator::new(client, Arc::new(ConsoleNotifier));
    let request = AggregationRequest::new(subject, purpose.or(app.default_purpose));
    let snapshot = aggregator.refresh(&request).await?;
    print!("{}", render_snapshot(&snapshot, format.into())?);
    if matches!(format, FormatArg::Json) {
        println!();
    }
    Ok(())
}

fn normalize(scores: BureauScores, purpose: &str) -> Result<()> {
    let purpose: LoanPurpose = purpose.parse()?;
    let breakdown = score_breakdown(&scores, purpose);
    print!("{}", render_breakdown(&breakdown)?);
    Ok(())
}

/// Prints aggregation notifications to stderr so stdout stays machine-readable.
struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let title = match notification.kind {
            NotificationKind::Success => notification.title.green().bold(),
            NotificationKind::Failure => notification.title.red().bold(),
        };
        eprintln!("{title}: {}", notification.description);
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
