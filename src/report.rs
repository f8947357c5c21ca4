// CSV report writers. Projection rows arrive fully rounded from the
// projector; everything here is ordering, aggregation, and file layout.
// All report writes happen on one thread after the worker pool joins.

use crate::projection::WeekProjection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create output directory {path}: {source}")]
    Dir {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write report {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

fn ensure_parent(path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Dir {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    Ok(())
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> ReportError + '_ {
    move |source| ReportError::Csv {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Projection CSV
// ---------------------------------------------------------------------------

/// Write projection rows as-is (column order follows the row struct).
pub fn write_projections(path: &Path, rows: &[WeekProjection]) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(csv_err(path))?;
    for row in rows {
        writer.serialize(row).map_err(csv_err(path))?;
    }
    writer.flush().map_err(|source| ReportError::Csv {
        path: path.display().to_string(),
        source: source.into(),
    })?;
    info!("wrote {} projection rows to {}", rows.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Game-script sub-report
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ScriptReportRow<'a> {
    wr_name: &'a str,
    team: &'a str,
    opp_team: &'a str,
    week: u32,
    base_pts: f64,
    adj_pts: f64,
    game_script_boost: f64,
    env_boost: f64,
    final_pts: f64,
}

/// One week's rows ranked by script boost, largest first, name as the
/// tiebreaker so reruns produce identical files.
pub fn write_game_script_report(
    dir: &Path,
    week: u32,
    rows: &[WeekProjection],
) -> Result<PathBuf, ReportError> {
    let path = dir.join(format!("game_script_report_week{week}.csv"));
    ensure_parent(&path)?;

    let mut ranked: Vec<&WeekProjection> = rows.iter().filter(|r| r.week == week).collect();
    ranked.sort_by(|a, b| {
        b.game_script_boost
            .total_cmp(&a.game_script_boost)
            .then_with(|| a.wr_name.cmp(&b.wr_name))
    });

    let mut writer = csv::Writer::from_path(&path).map_err(csv_err(&path))?;
    for row in ranked {
        writer
            .serialize(ScriptReportRow {
                wr_name: &row.wr_name,
                team: &row.team,
                opp_team: &row.opp_team,
                week: row.week,
                base_pts: row.base_pts,
                adj_pts: row.adj_pts,
                game_script_boost: row.game_script_boost,
                env_boost: row.env_boost,
                final_pts: row.final_pts,
            })
            .map_err(csv_err(&path))?;
    }
    writer.flush().map_err(|source| ReportError::Csv {
        path: path.display().to_string(),
        source: source.into(),
    })?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Team aggregate summary
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TeamTotals {
    games: usize,
    base: f64,
    adj: f64,
    final_pts: f64,
    script: f64,
    p50: f64,
    p50_count: usize,
}

/// Per-team averages across every projected row, teams in alphabetical
/// order. The median column appears only when simulation produced one.
pub fn write_team_summary(dir: &Path, rows: &[WeekProjection]) -> Result<PathBuf, ReportError> {
    let path = dir.join("team_projection_summary.csv");
    ensure_parent(&path)?;

    let mut totals: BTreeMap<&str, TeamTotals> = BTreeMap::new();
    for row in rows {
        let entry = totals.entry(row.team.as_str()).or_default();
        entry.games += 1;
        entry.base += row.base_pts;
        entry.adj += row.adj_pts;
        entry.final_pts += row.final_pts;
        entry.script += row.game_script_boost;
        if let Some(p50) = row.adj_pts_p50 {
            entry.p50 += p50;
            entry.p50_count += 1;
        }
    }
    let with_median = rows.iter().any(|r| r.adj_pts_p50.is_some());

    let mut writer = csv::Writer::from_path(&path).map_err(csv_err(&path))?;
    let mut header = vec![
        "Team",
        "Avg Base Pts",
        "Total Adj Pts",
        "Avg Adj Pts",
        "Avg Final Pts",
        "Avg Script Boost",
    ];
    if with_median {
        header.push("Avg Median Pts");
    }
    writer.write_record(&header).map_err(csv_err(&path))?;

    for (team, t) in &totals {
        let n = t.games as f64;
        let mut record = vec![
            team.to_string(),
            format!("{:.2}", t.base / n),
            format!("{:.2}", t.adj),
            format!("{:.2}", t.adj / n),
            format!("{:.2}", t.final_pts / n),
            format!("{:.3}", t.script / n),
        ];
        if with_median {
            let median = if t.p50_count > 0 {
                t.p50 / t.p50_count as f64
            } else {
                0.0
            };
            record.push(format!("{median:.2}"));
        }
        writer.write_record(&record).map_err(csv_err(&path))?;
    }
    writer.flush().map_err(|source| ReportError::Csv {
        path: path.display().to_string(),
        source: source.into(),
    })?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Weekly scouting summary
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WeeklySummaryRow<'a> {
    week: u32,
    wr_name: &'a str,
    team: &'a str,
    opp_team: &'a str,
    slot_weight: f64,
    wide_weight: f64,
    safety_weight: f64,
    lb_weight: f64,
    base_pts: f64,
    adj_pts: f64,
    env_boost: f64,
    game_script_boost: f64,
    final_pts: f64,
    #[serde(rename = "Notes")]
    notes: String,
}

fn scouting_notes(row: &WeekProjection) -> String {
    let mut notes = Vec::new();
    if row.env_boost > 1.02 {
        notes.push("Dome or favorable weather");
    } else if row.env_boost < 0.98 {
        notes.push("Bad weather risk");
    }
    if row.game_script_boost > 0.05 {
        notes.push("Trailing game script boost");
    } else if row.game_script_boost < -0.05 {
        notes.push("Game script downgrade");
    }
    notes.join("; ")
}

/// Scouting summary for one week, written under `summaries/` with a
/// zero-padded week number.
pub fn write_weekly_summary(
    dir: &Path,
    week: u32,
    rows: &[WeekProjection],
) -> Result<PathBuf, ReportError> {
    let path = dir
        .join("summaries")
        .join(format!("wr_weekly_summary_{week:02}.csv"));
    ensure_parent(&path)?;

    let mut writer = csv::Writer::from_path(&path).map_err(csv_err(&path))?;
    for row in rows.iter().filter(|r| r.week == week) {
        writer
            .serialize(WeeklySummaryRow {
                week: row.week,
                wr_name: &row.wr_name,
                team: &row.team,
                opp_team: &row.opp_team,
                slot_weight: row.slot_weight,
                wide_weight: row.wide_weight,
                safety_weight: row.safety_weight,
                lb_weight: row.lb_weight,
                base_pts: row.base_pts,
                adj_pts: row.adj_pts,
                env_boost: row.env_boost,
                game_script_boost: row.game_script_boost,
                final_pts: row.final_pts,
                notes: scouting_notes(row),
            })
            .map_err(csv_err(&path))?;
    }
    writer.flush().map_err(|source| ReportError::Csv {
        path: path.display().to_string(),
        source: source.into(),
    })?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
