//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use paperdigest_core::{ingest_batch, DefaultKeywords, IngestConfig};
use paperdigest_shared::{init_config, load_config, AppConfig, Paper, PaperLinks, ProgressReporter};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PaperDigest: section extraction and asset crawling for scientific papers.
#[derive(Parser)]
#[command(
    name = "paperdigest",
    version,
    about = "Ingest HTML renderings of papers: extract key sections and download figure assets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Ingest one or more papers by arXiv id, HTML URL, or JSON list.
    Ingest {
        /// Paper identifiers (arXiv ids like 2401.12345v1) or HTML URLs.
        ids_or_urls: Vec<String>,

        /// Read papers from a JSON file (array of paper records).
        #[arg(long, value_name = "FILE")]
        from_json: Option<PathBuf>,

        /// Output directory (defaults to the configured output_dir).
        #[arg(short, long)]
        out: Option<String>,

        /// Concurrent asset downloads per paper.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Extract sections only; skip the asset crawl and downloads.
        #[arg(long)]
        skip_assets: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "paperdigest=info",
        1 => "paperdigest=debug",
        _ => "paperdigest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest {
            ids_or_urls,
            from_json,
            out,
            concurrency,
            skip_assets,
        } => {
            cmd_ingest(
                &ids_or_urls,
                from_json.as_deref(),
                out.as_deref(),
                concurrency,
                skip_assets,
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

async fn cmd_ingest(
    ids_or_urls: &[String],
    from_json: Option<&std::path::Path>,
    out: Option<&str>,
    concurrency: Option<usize>,
    skip_assets: bool,
) -> Result<()> {
    let config = load_config()?;

    let mut ingest = IngestConfig::from(&config);
    if let Some(out) = out {
        ingest.output_dir = PathBuf::from(out);
    }
    if let Some(n) = concurrency {
        ingest.download_concurrency = n;
    }
    ingest.skip_assets = skip_assets;

    let mut papers: Vec<Paper> = Vec::new();
    if let Some(path) = from_json {
        let data = std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;
        let listed: Vec<Paper> = serde_json::from_str(&data)
            .map_err(|e| eyre!("invalid paper list in '{}': {e}", path.display()))?;
        papers.extend(listed);
    }
    for arg in ids_or_urls {
        papers.push(paper_from_arg(arg)?);
    }
    if papers.is_empty() {
        return Err(eyre!("nothing to ingest: pass paper ids/URLs or --from-json"));
    }

    info!(
        papers = papers.len(),
        output = %ingest.output_dir.display(),
        skip_assets,
        "starting ingest"
    );

    let reporter = CliProgress::new();
    let outcome = ingest_batch(&papers, &ingest, &DefaultKeywords, &reporter).await;

    for report in &outcome.reports {
        let report_path = ingest
            .output_dir
            .join(&report.paper_id)
            .join("report.json");
        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| eyre!("cannot create '{}': {e}", parent.display()))?;
        }
        std::fs::write(&report_path, serde_json::to_string_pretty(report)?)
            .map_err(|e| eyre!("cannot write '{}': {e}", report_path.display()))?;

        println!();
        println!("  {}  {}", report.paper_id, report.title);
        println!(
            "  Assets:  {} downloaded, {} failed",
            report.assets.len(),
            report.errors.len()
        );
        if let Some(url) = &report.github_url {
            println!("  GitHub:  {url}");
        }
        if let Some(url) = &report.project_url {
            println!("  Project: {url}");
        }
        println!("  Report:  {}", report_path.display());
        println!("  Time:    {:.1}s", report.duration_secs);
    }

    if !outcome.errors.is_empty() {
        println!();
        for (id, err) in &outcome.errors {
            println!("  {id}: failed ({err})");
        }
    }

    println!();
    println!(
        "  {} ingested, {} failed",
        outcome.reports.len(),
        outcome.errors.len()
    );
    println!();

    if outcome.reports.is_empty() {
        return Err(eyre!("all {} papers failed", outcome.errors.len()));
    }
    Ok(())
}

/// Turn a positional argument into a paper record.
///
/// Absolute URLs are taken as the HTML rendering directly, with the id
/// derived from the last path segment. Anything else is treated as an arXiv
/// id and pointed at the standard arxiv.org endpoints.
fn paper_from_arg(arg: &str) -> Result<Paper> {
    if let Ok(url) = Url::parse(arg) {
        if url.has_host() {
            let id = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| eyre!("cannot derive a paper id from '{arg}'"))?
                .to_string();
            return Ok(Paper {
                id: id.clone(),
                title: id,
                links: PaperLinks {
                    html: Some(url.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }
    }

    let id = arg.trim();
    if id.is_empty() {
        return Err(eyre!("empty paper id"));
    }
    Ok(Paper {
        id: id.to_string(),
        title: id.to_string(),
        links: PaperLinks {
            abs: Some(format!("https://arxiv.org/abs/{id}")),
            pdf: Some(format!("https://arxiv.org/pdf/{id}")),
            html: Some(format!("https://arxiv.org/html/{id}")),
            e_print: None,
        },
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

const TICK_MS: u64 = 80;

/// Progress rendering using a single indicatif bar that switches between
/// spinner, byte-bar, and count-bar shapes as the pipeline moves through
/// its phases.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::spinner_style());
        bar.enable_steady_tick(std::time::Duration::from_millis(TICK_MS));
        Self { bar }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        // the bar is reused across papers in a batch
        if self.bar.is_finished() {
            self.bar.reset();
        }
        self.bar.set_style(Self::spinner_style());
        self.bar.enable_steady_tick(std::time::Duration::from_millis(TICK_MS));
        self.bar.set_message(name.to_string());
    }

    fn stream_started(&self, total_bytes: Option<u64>) {
        self.bar.set_position(0);
        match total_bytes {
            Some(len) => {
                self.bar.disable_steady_tick();
                self.bar.set_style(
                    ProgressStyle::with_template("{bar:30.cyan/blue} {bytes}/{total_bytes} {msg}")
                        .unwrap(),
                );
                self.bar.set_length(len);
            }
            None => {
                self.bar.unset_length();
                self.bar
                    .set_style(ProgressStyle::with_template("{spinner:.cyan} {bytes} {msg}").unwrap());
            }
        }
        self.bar.set_message("streaming document".to_string());
    }

    fn stream_advanced(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn download_started(&self, total: usize) {
        self.bar.disable_steady_tick();
        self.bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}").unwrap(),
        );
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message("downloading assets".to_string());
    }

    fn download_advanced(&self, filename: &str) {
        self.bar.inc(1);
        self.bar.set_message(filename.to_string());
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
