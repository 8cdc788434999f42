//! CLI entry point for the demerit dashboard.
//!
//! Loads a merit/demerit point workbook (or its CSV export), normalizes it, and
//! prints or exports the per-grade summary views.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use demerit_dashboard::analyzers::analyzer::{DashboardOptions, build_dashboard};
use demerit_dashboard::config::DashboardConfig;
use demerit_dashboard::loader::RawTable;
use demerit_dashboard::normalize::{Category, Dataset};
use demerit_dashboard::output::{print_json, print_pretty, render_text, write_views_csv};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "demerit_dashboard")]
#[command(about = "Summarize school merit/demerit point records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Point record workbook (.xlsx, .xls, .ods) or its CSV export
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// JSON config file (defaults to $DASHBOARD_CONFIG when set)
    #[arg(short, long, value_name = "JSON")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct Scope {
    /// Grade key to report on (first digit of the student number); all grades when omitted
    #[arg(short, long)]
    grade: Option<String>,

    /// Record category to summarize
    #[arg(long, value_enum, default_value_t = CategoryArg::Demerit)]
    category: CategoryArg,

    /// Fold reasons at or below this share into "기타" (overrides config)
    #[arg(long, conflicts_with = "no_merge")]
    merge_threshold: Option<f64>,

    /// Disable the long-tail merge
    #[arg(long, default_value_t = false)]
    no_merge: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Merit,
    Demerit,
}

impl From<CategoryArg> for Category {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Merit => Category::Merit,
            CategoryArg::Demerit => Category::Demerit,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List grade keys found in the input with their record counts
    Grades {
        #[command(flatten)]
        source: Source,
    },
    /// Print every summary view for one grade and category
    Summary {
        #[command(flatten)]
        source: Source,

        #[command(flatten)]
        scope: Scope,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Write every summary view to a CSV file
    Export {
        #[command(flatten)]
        source: Source,

        #[command(flatten)]
        scope: Scope,

        /// CSV file to write
        #[arg(short, long, default_value = "dashboard.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/demerit_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("demerit_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info")?);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug")?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grades { source } => {
            let (_, dataset) = load(&source)?;
            for (grade, count) in dataset.grade_counts() {
                println!("{grade}\t{count}");
            }
        }
        Commands::Summary {
            source,
            scope,
            format,
        } => {
            let (config, dataset) = load(&source)?;
            let options = options(&config, &scope)?;
            let dashboard = build_dashboard(&dataset, scope.grade.as_deref(), &options);
            print_pretty(&dashboard);

            match format {
                Format::Text => print!("{}", render_text(&dashboard)),
                Format::Json => print_json(&dashboard)?,
            }
        }
        Commands::Export {
            source,
            scope,
            output,
        } => {
            let (config, dataset) = load(&source)?;
            let options = options(&config, &scope)?;
            let dashboard = build_dashboard(&dataset, scope.grade.as_deref(), &options);
            write_views_csv(&output, &dashboard)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
    }

    Ok(())
}

fn env_filter(var: &str, default: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_env(var).add_directive(default.parse()?))
}

/// Reads the config (if any) and the input table, then normalizes it.
#[tracing::instrument(skip(source), fields(input = %source.input.display()))]
fn load(source: &Source) -> Result<(DashboardConfig, Dataset)> {
    let config_path = source
        .config
        .clone()
        .or_else(|| std::env::var_os("DASHBOARD_CONFIG").map(PathBuf::from));

    let config = match config_path {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            DashboardConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => DashboardConfig::default(),
    };

    let table = RawTable::from_path(&source.input)
        .with_context(|| format!("failed to read {}", source.input.display()))?;
    let dataset = config
        .normalizer()
        .normalize(&table, &config.columns, &config.markers)
        .context("failed to normalize records")?;

    if dataset.is_empty() {
        warn!("No records survived normalization");
    }
    Ok((config, dataset))
}

fn options(config: &DashboardConfig, scope: &Scope) -> Result<DashboardOptions> {
    if let Some(t) = scope.merge_threshold {
        anyhow::ensure!(
            (0.0..=1.0).contains(&t),
            "--merge-threshold must be within 0.0..=1.0, got {t}"
        );
    }
    let merge_threshold = if scope.no_merge {
        None
    } else {
        scope.merge_threshold.or(config.merge_threshold)
    };
    Ok(DashboardOptions {
        category: scope.category.into(),
        merge_threshold,
    })
}
