// Run orchestration.
//
// Season sequence:
// 1. Load schedule, receivers, defenders (fatal if missing) plus the
//    optional coverage, stadium, and multiplier inputs
// 2. Build the environment map and append the weather log (single-threaded)
// 3. Fan one task per schedule week out over the rayon pool; workers share
//    immutable snapshots and keep their own penalty cache and ledger
// 4. Flatten results in week order, then write every report serially

use crate::config::Config;
use crate::data::{self, SeasonData};
use crate::projection::{self, PenaltyCache, ProjectionContext, ProjectionLedger, WeekProjection};
use crate::report;
use crate::weather::{boost, ClimatePhase, EnvironmentMap, ForecastSource};
use anyhow::Context;
use rayon::prelude::*;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tracing::{info, warn};

/// Build the environment map for the given weeks and append its rows to the
/// weather log. A log write failure is a warning, not a run failure.
fn build_environment(config: &Config, data: &SeasonData, weeks: &[u32]) -> EnvironmentMap {
    let phase = ClimatePhase::parse(&config.weather.climate_phase);
    let source = ForecastSource::from_config(&config.weather);
    info!(
        "building environment map from {}",
        if source.is_active() { "live forecasts" } else { "stadium climatology" }
    );
    let (environment, log_rows) =
        boost::build_environment_map(&data.schedule, &data.stadiums, weeks, &source, phase);
    if let Err(e) = boost::append_weather_log(Path::new(&config.output.weather_log), &log_rows) {
        warn!("could not append weather log: {e}");
    }
    environment
}

/// Project every receiver for one week, in load order. Each call owns a
/// fresh penalty cache and ledger, so output does not depend on which
/// worker ran which week.
fn project_week(ctx: &ProjectionContext<'_>, week: u32) -> Vec<WeekProjection> {
    let mut penalties = PenaltyCache::new();
    let mut ledger = ProjectionLedger::new();
    let mut rows = Vec::new();
    for receiver in &ctx.data.receivers {
        if let Some(row) = projection::project(ctx, receiver, week, &mut penalties, &mut ledger) {
            rows.push(row);
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Season mode
// ---------------------------------------------------------------------------

pub fn run_season(config: &Config, output: Option<&Path>) -> anyhow::Result<()> {
    info!("1. loading season inputs");
    let data = data::load_season_data(config).context("failed to load season inputs")?;
    info!(
        "2. loaded {} receivers, {} defensive units, {} schedule rows",
        data.receivers.len(),
        data.defenders.len(),
        data.schedule.rows().len()
    );
    let weeks = data.schedule.weeks();
    anyhow::ensure!(!weeks.is_empty(), "schedule has no usable rows");

    info!("3. preparing weather for {} weeks", weeks.len());
    let environment = build_environment(config, &data, &weeks);

    info!("4. projecting {} weeks across the worker pool", weeks.len());
    let ctx = ProjectionContext {
        config,
        data: &data,
        environment: &environment,
    };
    let outcomes: Vec<(u32, Option<Vec<WeekProjection>>)> = weeks
        .par_iter()
        .map(|&week| {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| project_week(&ctx, week)));
            (week, result.ok())
        })
        .collect();

    let mut rows = Vec::new();
    let mut failed_weeks = Vec::new();
    for (week, outcome) in outcomes {
        match outcome {
            Some(mut week_rows) => rows.append(&mut week_rows),
            None => {
                warn!("week {week} projection failed and is excluded from season output");
                failed_weeks.push(week);
            }
        }
    }

    info!("5. writing reports ({} projection rows)", rows.len());
    let dir = Path::new(&config.output.dir);
    let season_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join("season_projections.csv"));
    report::write_projections(&season_path, &rows)?;
    for &week in &weeks {
        if failed_weeks.contains(&week) {
            continue;
        }
        report::write_game_script_report(dir, week, &rows)?;
    }
    report::write_team_summary(dir, &rows)?;

    if failed_weeks.is_empty() {
        info!(
            "season run complete: {} rows across {} weeks",
            rows.len(),
            weeks.len()
        );
    } else {
        warn!(
            "season run complete with {} failed week(s): {:?}",
            failed_weeks.len(),
            failed_weeks
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Week mode
// ---------------------------------------------------------------------------

pub fn run_week(config: &Config, week: u32, output: Option<&Path>) -> anyhow::Result<()> {
    info!("1. loading season inputs");
    let data = data::load_season_data(config).context("failed to load season inputs")?;
    let game_count = data.schedule.for_week(week).count();
    info!("2. week {week}: {game_count} scheduled games");
    if game_count == 0 {
        warn!("no schedule rows for week {week}; output will be empty");
    }

    info!("3. preparing weather for week {week}");
    let environment = build_environment(config, &data, &[week]);

    info!("4. projecting week {week}");
    let ctx = ProjectionContext {
        config,
        data: &data,
        environment: &environment,
    };
    let rows = project_week(&ctx, week);

    info!("5. writing reports ({} projection rows)", rows.len());
    let dir = Path::new(&config.output.dir);
    let week_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(format!("week{week}_projections.csv")));
    report::write_projections(&week_path, &rows)?;
    report::write_game_script_report(dir, week, &rows)?;
    report::write_weekly_summary(dir, week, &rows)?;

    info!("week {week} run complete: {} receivers projected", rows.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Validate mode
// ---------------------------------------------------------------------------

/// Check that every configured input file exists and carries its required
/// columns, without projecting anything. Problems become a nonzero exit.
pub fn run_validate(config: &Config) -> anyhow::Result<()> {
    info!("validating configured input files");
    let issues = data::validate_inputs(&config.data);
    if issues.is_empty() {
        println!("all configured input files are present and carry their required columns");
        return Ok(());
    }
    for issue in &issues {
        println!("- {issue}");
    }
    anyhow::bail!("{} input problem(s) found", issues.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
