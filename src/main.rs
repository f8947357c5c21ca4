// Matchup projection entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr; reports go to files)
// 2. Parse CLI arguments
// 3. Materialize default config files on first run, then load config
// 4. Dispatch to the requested engine mode

use gridcast::config;
use gridcast::engine;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "gridcast")]
#[command(about = "Weekly wide receiver matchup projections", version)]
struct Cli {
    /// Which run to perform.
    #[arg(long, value_enum, default_value = "season")]
    mode: Mode,

    /// Week number, week mode only (1-18).
    #[arg(long, default_value_t = 1)]
    week: u32,

    /// Override the projection CSV path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Project every scheduled week.
    Season,
    /// Project a single week.
    #[value(alias = "test")]
    Week,
    /// Check input files without projecting.
    Validate,
}

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (stderr; reports go to files)
    init_tracing()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Load config (writes config/*.toml from defaults/ on first run)
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "gridcast starting: season {}, mode {:?}, output dir {}",
        config.model.season_year, cli.mode, config.output.dir
    );

    // 4. Dispatch to the requested engine mode
    match cli.mode {
        Mode::Season => engine::run_season(&config, cli.output.as_deref()),
        Mode::Week => {
            anyhow::ensure!(
                (1..=18).contains(&cli.week),
                "invalid week number {}, must be between 1 and 18",
                cli.week
            );
            engine::run_week(&config, cli.week, cli.output.as_deref())
        }
        Mode::Validate => engine::run_validate(&config),
    }
}

/// Initialize tracing to stderr so stdout and the report files stay clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridcast=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
