//! CLI command definitions, routing, and tracing setup.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadgen_core::{
    Collaborators, GeneratorConfig, OpenAiCompatGenerator, ProgressReporter, RunReport,
    SecondaryStatus, run_pipeline,
};
use leadgen_crawler::{FetcherConfig, HttpFetcher, PageFetcher};
use leadgen_discovery::{AgencyDirectory, AgencySource, ClutchSource, SortlistSource};
use leadgen_shared::{
    AppConfig, PipelineConfig, init_config, load_config, load_config_from, mask_secret,
};
use leadgen_sinks::{CsvSink, RowSink, ServiceAccountTokenSource, SheetsSink};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Agency LeadGen: discover agencies and turn them into scored, ready-to-send leads.
#[derive(Parser)]
#[command(
    name = "leadgen",
    version,
    about = "Discover marketing agencies, find decision-makers, and export scored leads.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.leadgen/leadgen.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full lead generation pipeline.
    Run(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for one run. Each flag falls back to its environment variable,
/// then to the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Country to search in.
    #[arg(long, env = "TARGET_COUNTRY")]
    pub country: Option<String>,

    /// Number of agencies to collect.
    #[arg(long, env = "TARGET_COUNT")]
    pub count: Option<usize>,

    /// Directory search query.
    #[arg(long, env = "SEARCH_QUERY")]
    pub query: Option<String>,

    /// CSV output path.
    #[arg(long, env = "OUTPUT_FILE")]
    pub output: Option<String>,

    /// Log file path.
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<String>,

    /// Chat model identifier.
    #[arg(long, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// Append to the CSV instead of replacing it.
    #[arg(long)]
    pub append: bool,

    /// Also append rows to a Google Sheet.
    #[arg(
        long,
        env = "USE_GOOGLE_SHEETS",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new(),
    )]
    pub sheets: Option<bool>,

    /// Google Sheet id.
    #[arg(long, env = "GOOGLE_SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Service-account JSON key file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<String>,
}

impl RunArgs {
    /// Layer these overrides on top of the file config.
    pub(crate) fn apply(&self, config: &mut AppConfig) {
        if let Some(country) = &self.country {
            config.search.target_country = country.clone();
        }
        if let Some(count) = self.count {
            config.search.target_count = count;
        }
        if let Some(query) = &self.query {
            config.search.search_query = query.clone();
        }
        if let Some(output) = &self.output {
            config.output.output_file = output.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.output.log_file = log_file.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if self.append {
            config.output.append = true;
        }
        if let Some(enabled) = self.sheets {
            config.google_sheets.enabled = enabled;
        }
        if let Some(id) = &self.sheet_id {
            config.google_sheets.sheet_id = Some(id.clone());
        }
        if let Some(path) = &self.credentials {
            config.google_sheets.credentials_path = Some(path.clone());
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing: stdout in the chosen format, plus a plain-text copy in
/// `log_file` when given.
pub(crate) fn init_tracing(cli: &Cli, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

    let filter = match cli.verbose {
        0 => "leadgen=info",
        1 => "leadgen=debug",
        _ => "leadgen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(match cli.log_format {
        LogFormat::Text => fmt::layer().with_target(false).boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    });

    if let Some(path) = log_file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| eyre!("cannot create log directory {}: {e}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eyre!("cannot open log file {}: {e}", path.display()))?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match &cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            init_tracing(&cli, Some(Path::new(&config.output.log_file)))?;
            cmd_run(&config).await
        }
        Command::Config { action } => {
            init_tracing(&cli, None)?;
            match action {
                ConfigAction::Init => cmd_config_init(cli.config.as_deref()).await,
                ConfigAction::Show => cmd_config_show(&config).await,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    // Validate everything before any network traffic
    config.validate()?;
    let pipeline = PipelineConfig::from(config);

    info!(
        country = %pipeline.target_country,
        count = pipeline.target_count,
        query = %pipeline.search_query,
        model = %pipeline.model,
        "starting lead generation"
    );

    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(FetcherConfig::from(&pipeline))?);
    let sources: Vec<Box<dyn AgencySource>> = vec![
        Box::new(ClutchSource::new(fetcher.clone())?),
        Box::new(SortlistSource::new(fetcher.clone())?),
    ];
    let directory = AgencyDirectory::new(sources);
    let generator = OpenAiCompatGenerator::new(GeneratorConfig::from(&pipeline))?;
    let primary = CsvSink::new(&pipeline.output_file, pipeline.append);

    let sheets = match &pipeline.sheets {
        Some(target) => {
            let client = reqwest::Client::new();
            let tokens = ServiceAccountTokenSource::from_file(&target.credentials_path, client.clone())?;
            Some(SheetsSink::new(target.sheet_id.clone(), client, Box::new(tokens))?)
        }
        None => None,
    };

    let collaborators = Collaborators {
        directory: &directory,
        fetcher: fetcher.as_ref(),
        generator: &generator,
        primary: &primary,
        secondary: sheets.as_ref().map(|s| s as &dyn RowSink),
    };

    let reporter = CliProgress::new();
    let report = run_pipeline(&pipeline, &collaborators, &reporter).await?;

    print_summary(&report, &config.output.log_file);
    Ok(())
}

fn print_summary(report: &RunReport, log_file: &str) {
    let export = &report.export;
    let counts = &report.counts;

    println!();
    println!("  Leads exported successfully!");
    println!("  Run:       {}", report.run_id);
    println!(
        "  Leads:     {} (Hot {} / Warm {} / Cold {})",
        export.total, export.hot, export.warm, export.cold
    );
    println!(
        "  Enriched:  {}   Contacts: {}   Messages: {}",
        counts.enriched_complete, counts.contacts_found, counts.messages_generated
    );
    if counts.over_limit > 0 {
        println!("  Over word limit: {}", counts.over_limit);
    }
    println!("  Output:    {}", export.destination);
    match (&export.secondary, &export.secondary_destination) {
        (SecondaryStatus::NotConfigured, _) => {}
        (status, Some(dest)) => println!("  Sheets:    {status} ({dest})"),
        (status, None) => println!("  Sheets:    {status}"),
    }
    println!("  Log:       {log_file}");
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_done(&self, current: usize, total: usize, agency: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {agency}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    let key = config
        .api_key()
        .map(|k| mask_secret(&k))
        .unwrap_or_else(|| "(not set)".into());
    println!("# {} = {key}", config.llm.api_key_env);
    Ok(())
}
