// Schedule loading: one row per game, with kickoff timestamps for the
// forecast lookup.

use super::{lenient_opt_f64, LoadError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MatchupRow {
    pub week: u32,
    pub home: String,
    pub away: String,
    pub date: NaiveDate,
    /// Local kickoff, from the schedule's Time column (1 PM when absent).
    pub kickoff: NaiveDateTime,
    pub projected_home: Option<f64>,
    pub projected_away: Option<f64>,
}

impl MatchupRow {
    pub fn involves(&self, team: &str) -> bool {
        self.home == team || self.away == team
    }

    /// The other side of this game from `team`'s perspective. A team that is
    /// not the listed home side is treated as the visitor.
    pub fn opponent_of(&self, team: &str) -> &str {
        if self.home == team {
            &self.away
        } else {
            &self.home
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    rows: Vec<MatchupRow>,
}

impl Schedule {
    pub fn new(rows: Vec<MatchupRow>) -> Schedule {
        Schedule { rows }
    }

    pub fn rows(&self) -> &[MatchupRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct week numbers in ascending order.
    pub fn weeks(&self) -> Vec<u32> {
        let mut weeks: Vec<u32> = self.rows.iter().map(|r| r.week).collect();
        weeks.sort_unstable();
        weeks.dedup();
        weeks
    }

    pub fn for_week(&self, week: u32) -> impl Iterator<Item = &MatchupRow> + '_ {
        self.rows.iter().filter(move |r| r.week == week)
    }

    pub fn matchup_for(&self, week: u32, team: &str) -> Option<&MatchupRow> {
        self.rows
            .iter()
            .find(|r| r.week == week && r.involves(team))
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(dead_code, non_snake_case)]
struct RawScheduleRow {
    Week: u32,
    Date: String,
    Home: String,
    Visitor: String,
    #[serde(default)]
    Time: String,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    ProjectedHomeScore: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    ProjectedAwayScore: Option<f64>,
    /// Absorb any extra columns the export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Accepts ISO dates ("2025-09-07"), full month-name dates
/// ("September 7, 2025"), and the year-less month-name form the league
/// schedule export uses ("September 7"), resolved against the season year.
fn parse_game_date(raw: &str, season_year: i32) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%B %d, %Y") {
        return Some(d);
    }
    let with_year = format!("{raw}, {season_year}");
    NaiveDate::parse_from_str(&with_year, "%B %d, %Y").ok()
}

fn parse_kickoff_time(raw: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| default_kickoff())
}

fn default_kickoff() -> NaiveTime {
    NaiveTime::from_hms_opt(13, 0, 0).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn load_schedule_from_reader<R: Read>(
    rdr: R,
    season_year: i32,
) -> Result<Schedule, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawScheduleRow>() {
        match result {
            Ok(raw) => {
                let Some(date) = parse_game_date(&raw.Date, season_year) else {
                    warn!(
                        "skipping week {} game {} at {}: unparseable date '{}'",
                        raw.Week, raw.Visitor, raw.Home, raw.Date
                    );
                    continue;
                };
                let kickoff = date.and_time(parse_kickoff_time(&raw.Time));
                rows.push(MatchupRow {
                    week: raw.Week,
                    home: raw.Home.trim().to_string(),
                    away: raw.Visitor.trim().to_string(),
                    date,
                    kickoff,
                    projected_home: raw.ProjectedHomeScore,
                    projected_away: raw.ProjectedAwayScore,
                });
            }
            Err(e) => {
                warn!("skipping malformed schedule row: {}", e);
            }
        }
    }
    Ok(Schedule::new(rows))
}

/// Load the season schedule from a CSV file. Year-less dates are resolved
/// against `season_year`.
pub fn load_schedule(path: &Path, season_year: i32) -> Result<Schedule, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_schedule_from_reader(file, season_year).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
