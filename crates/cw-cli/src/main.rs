use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cwr")]
#[command(about = "Cauldron drain detection and ticket reconciliation", long_about = None)]
struct Cli {
    /// Layered config paths in merge order. Defaults to config/base.yaml when present.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Fail instead of warn when the config carries keys the command does not read.
    #[arg(long, global = true, default_value_t = false)]
    strict_config: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect drain events per vessel per date and print the drain report
    Analyze {
        /// Dates to analyse (YYYY-MM-DD)
        #[arg(long = "date")]
        dates: Vec<String>,

        /// Analyse every date in the window table
        #[arg(long, conflicts_with = "dates")]
        all: bool,

        #[arg(long)]
        std_multiplier: Option<f64>,

        #[arg(long)]
        min_duration: Option<i64>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        out: Option<String>,
    },

    /// Compare tickets against drain volumes over a date range
    Compare {
        /// One date (through today) or several (earliest..latest)
        #[arg(long = "date", conflicts_with = "request_file")]
        dates: Vec<String>,

        #[arg(long, conflicts_with = "request_file")]
        std_multiplier: Option<f64>,

        #[arg(long, conflicts_with = "request_file")]
        min_duration: Option<i64>,

        #[arg(long, conflicts_with = "request_file")]
        tolerance: Option<f64>,

        /// four_state | relative_blend
        #[arg(long, conflicts_with = "request_file")]
        policy: Option<String>,

        /// statistical | raw_drop
        #[arg(long, conflicts_with = "request_file")]
        drain_method: Option<String>,

        /// Path to a JSON request body ({"dates_to_analyze": [...], ...})
        #[arg(long = "request-file")]
        request_file: Option<String>,

        #[arg(long)]
        out: Option<String>,
    },

    /// Single-window ticket vs raw level-drop check
    CheckDiscrepancies {
        #[arg(long)]
        out: Option<String>,
    },

    /// List supported dates and their epoch windows
    Windows,

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience: pick up CW_BASE_URL / RUST_LOG from .env.local if present.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let strict = cli.strict_config;

    match cli.cmd {
        Commands::Analyze {
            dates,
            all,
            std_multiplier,
            min_duration,
            out,
        } => {
            let req = cw_runtime::AnalyzeRequest {
                dates,
                all_dates: all,
                std_multiplier,
                min_duration,
            };
            commands::analysis::run_analyze(&cli.config_paths, strict, req, out).await?;
        }

        Commands::Compare {
            dates,
            std_multiplier,
            min_duration,
            tolerance,
            policy,
            drain_method,
            request_file,
            out,
        } => {
            let req = match request_file {
                Some(path) => commands::load_request_file(&path)?,
                None => cw_runtime::CompareRequest {
                    dates_to_analyze: dates,
                    std_multiplier,
                    min_duration,
                    tolerance,
                    policy,
                    drain_method,
                },
            };
            commands::analysis::run_compare(&cli.config_paths, strict, req, out).await?;
        }

        Commands::CheckDiscrepancies { out } => {
            commands::analysis::run_check_discrepancies(&cli.config_paths, strict, out).await?;
        }

        Commands::Windows => {
            let (_, cfg) = commands::load_config(&cli.config_paths, None, strict)?;
            for (date, w) in cfg.windows.iter() {
                println!("{} start={} end={}", date, w.start, w.end);
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = cw_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}
