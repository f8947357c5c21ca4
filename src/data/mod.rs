// Input data loading: schedule, receiver/defender stats, coverage tags,
// stadium profiles, and the optional multiplier tables.

pub mod coverage;
pub mod defenders;
pub mod multipliers;
pub mod receivers;
pub mod schedule;
pub mod stadium;

use crate::config::{Config, DataPaths};
use std::path::Path;
use tracing::{debug, warn};

pub use coverage::{CoverageMap, Scheme};
pub use defenders::{CoverageStats, Defender, DefenderMap, DefenderPosition};
pub use multipliers::{MultiplierRegistry, ScalarTable};
pub use receivers::{Receiver, ReceiverRole, SchemeSplit};
pub use schedule::{MatchupRow, Schedule};
pub use stadium::{HumidityControl, StadiumMap, StadiumProfile, TurfType};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Lenient numeric cells
// ---------------------------------------------------------------------------

/// Deserialize a numeric CSV cell, treating empty, unparseable, or non-finite
/// values as 0.0. Stat exports routinely leave cells blank for players with
/// no qualifying sample; a blank stat is a neutral stat, not a bad row.
pub(crate) fn lenient_f64<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let raw = String::deserialize(de)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => {
            debug!("treating unparseable numeric cell `{trimmed}` as 0");
            Ok(0.0)
        }
    }
}

/// Like `lenient_f64` but keeps "absent" distinct from zero. Used for the
/// projected game scores, where a missing value must disable the script
/// boost rather than pretend the total is nil.
pub(crate) fn lenient_opt_f64<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let raw = String::deserialize(de)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => {
            debug!("treating unparseable numeric cell `{trimmed}` as missing");
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Season data bundle
// ---------------------------------------------------------------------------

/// Every input the projection engine needs, loaded once up front. Workers
/// receive shared references to this; nothing here is mutated after load.
#[derive(Debug, Clone)]
pub struct SeasonData {
    pub receivers: Vec<Receiver>,
    pub defenders: DefenderMap,
    pub coverage: CoverageMap,
    pub schedule: Schedule,
    pub stadiums: StadiumMap,
    pub multipliers: MultiplierRegistry,
}

/// Load all season inputs using paths from the config.
pub fn load_season_data(config: &Config) -> Result<SeasonData, LoadError> {
    load_season_data_from_paths(&config.data, config.model.season_year)
}

/// Load all season inputs from explicit paths. Exposed for testing and
/// flexibility. The season year resolves schedule dates that omit one.
///
/// Schedule, receiver, and defender files are required; coverage tags,
/// stadium profiles, and multiplier tables degrade to neutral defaults
/// when absent.
pub fn load_season_data_from_paths(
    paths: &DataPaths,
    season_year: i32,
) -> Result<SeasonData, LoadError> {
    let receivers = receivers::load_receivers(Path::new(&paths.receivers))?;
    let defenders = defenders::load_defenders(Path::new(&paths.defenders))?;
    let schedule = schedule::load_schedule(Path::new(&paths.schedule), season_year)?;

    if receivers.is_empty() {
        return Err(LoadError::Validation(
            "receiver CSV produced zero valid rows".into(),
        ));
    }
    if defenders.is_empty() {
        return Err(LoadError::Validation(
            "defender CSV produced zero valid rows".into(),
        ));
    }
    if schedule.is_empty() {
        return Err(LoadError::Validation(
            "schedule CSV produced zero valid rows".into(),
        ));
    }

    let coverage_path = Path::new(&paths.coverage);
    let coverage = if coverage_path.exists() {
        coverage::load_coverage(coverage_path)?
    } else {
        warn!(
            "coverage tag file {} not found, every matchup defaults to man coverage",
            paths.coverage
        );
        CoverageMap::default()
    };

    let stadium_path = Path::new(&paths.stadiums);
    let stadiums = if stadium_path.exists() {
        stadium::load_stadiums(stadium_path)?
    } else {
        warn!(
            "stadium profile file {} not found, environment boosts default to neutral",
            paths.stadiums
        );
        StadiumMap::new()
    };

    let multipliers = multipliers::load_multipliers(Path::new(&paths.multiplier_dir));

    Ok(SeasonData {
        receivers,
        defenders,
        coverage,
        schedule,
        stadiums,
        multipliers,
    })
}

// ---------------------------------------------------------------------------
// Input validation (headers only)
// ---------------------------------------------------------------------------

const SCHEDULE_REQUIRED: &[&str] = &[
    "Week",
    "Date",
    "Home",
    "Visitor",
    "ProjectedHomeScore",
    "ProjectedAwayScore",
];

const RECEIVER_REQUIRED: &[&str] = &[
    "Player",
    "Team",
    "SlotSnapRate",
    "FantasyPointsPerTargetVsMan",
    "FantasyPointsPerTargetVsZone",
];

const DEFENDER_REQUIRED: &[&str] = &["Team", "Position"];

const COVERAGE_REQUIRED: &[&str] = &[
    "week",
    "team",
    "man_coverage_rate",
    "zone_coverage_rate",
];

const STADIUM_REQUIRED: &[&str] = &[
    "Team",
    "Latitude",
    "Longitude",
    "TurfType",
    "HumidityControl",
];

/// Check that each input CSV exists and carries the headers its loader needs.
/// Returns a list of human-readable issues; empty means everything passed.
/// Only headers are inspected, so a pass here does not guarantee every row
/// parses.
pub fn validate_inputs(paths: &DataPaths) -> Vec<String> {
    let mut issues = Vec::new();

    check_headers(&paths.schedule, SCHEDULE_REQUIRED, &mut issues);
    check_headers(&paths.receivers, RECEIVER_REQUIRED, &mut issues);
    check_headers(&paths.defenders, DEFENDER_REQUIRED, &mut issues);
    check_headers(&paths.coverage, COVERAGE_REQUIRED, &mut issues);
    check_headers(&paths.stadiums, STADIUM_REQUIRED, &mut issues);

    // The defender file accepts either name column.
    if let Some(headers) = read_headers(&paths.defenders) {
        if !headers.iter().any(|h| h == "Player" || h == "PlayerYear") {
            issues.push(format!(
                "{} is missing columns: Player (or PlayerYear)",
                paths.defenders
            ));
        }
    }

    issues
}

fn read_headers(path: &str) -> Option<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).ok()?;
    let headers = reader.headers().ok()?;
    Some(headers.iter().map(|h| h.to_string()).collect())
}

fn check_headers(path: &str, required: &[&str], issues: &mut Vec<String>) {
    if !Path::new(path).exists() {
        issues.push(format!("missing file: {path}"));
        return;
    }
    let Some(headers) = read_headers(path) else {
        issues.push(format!("error reading {path}"));
        return;
    };
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();
    if !missing.is_empty() {
        issues.push(format!("{path} is missing columns: {}", missing.join(", ")));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    fn valid_paths_in(dir: &Path) -> DataPaths {
        DataPaths {
            schedule: write_csv(
                dir,
                "schedule.csv",
                "Week,Date,Home,Visitor,Time,ProjectedHomeScore,ProjectedAwayScore\n\
                 1,\"September 7, 2025\",BUF,NYJ,13:00,27.5,20.5\n",
            ),
            receivers: write_csv(
                dir,
                "wr.csv",
                "Player,Team,SlotSnapRate,SnapShare,RoutesRun,\
                 RoutesVsMan,WinRateVsMan,TargetRateVsMan,TargetSeparationVsMan,FantasyPointsPerTargetVsMan,\
                 RoutesVsZone,WinRateVsZone,TargetRateVsZone,TargetSeparationVsZone,FantasyPointsPerTargetVsZone\n\
                 Test Receiver,NYJ,0.4,0.9,300,120,0.5,0.22,2.1,1.9,180,0.55,0.2,2.4,1.7\n",
            ),
            defenders: write_csv(
                dir,
                "db.csv",
                "Player,Team,Position,Targets Allowed,Catch Rate Allowed,Passer Rating Allowed,\
                 Fantasy Points Allowed Per Target,Fantasy Points Allowed Per Game,\
                 Man Coverage Success Rate,Man Coverage Rate,Target Separation\n\
                 Test Corner,BUF,CB,80,0.6,88.0,1.5,12.0,0.55,0.6,2.2\n",
            ),
            coverage: write_csv(
                dir,
                "coverage.csv",
                "week,team,man_coverage_rate,zone_coverage_rate\n1,BUF,0.6,0.4\n",
            ),
            stadiums: write_csv(
                dir,
                "stadiums.csv",
                "Team,Latitude,Longitude,Dome,ColdProne,WindProne,HighAltitude,TurfType,HumidityControl,State\n\
                 BUF,42.77,-78.79,no,yes,yes,no,hybrid,no,NY\n",
            ),
            multiplier_dir: dir.join("multipliers").display().to_string(),
        }
    }

    #[test]
    fn load_season_data_from_valid_files() {
        let tmp = std::env::temp_dir().join("gridcast_data_test_load_valid");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let paths = valid_paths_in(&tmp);
        let data = load_season_data_from_paths(&paths, 2025).expect("should load");

        assert_eq!(data.receivers.len(), 1);
        assert_eq!(data.receivers[0].name, "Test Receiver");
        assert_eq!(data.defenders.get("BUF").map(|v| v.len()), Some(1));
        assert_eq!(data.schedule.weeks(), vec![1]);
        assert!(data.stadiums.contains_key("BUF"));
        // No multiplier dir exists: registry is empty and everything defaults.
        assert!((data.multipliers.pace(1, "BUF") - 1.0).abs() < f64::EPSILON);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_required_file_is_fatal() {
        let tmp = std::env::temp_dir().join("gridcast_data_test_missing_required");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let mut paths = valid_paths_in(&tmp);
        paths.receivers = tmp.join("does_not_exist.csv").display().to_string();

        let err = load_season_data_from_paths(&paths, 2025).unwrap_err();
        match &err {
            LoadError::Io { path, .. } => assert!(path.contains("does_not_exist")),
            other => panic!("expected Io error, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_optional_files_degrade_to_defaults() {
        let tmp = std::env::temp_dir().join("gridcast_data_test_missing_optional");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let mut paths = valid_paths_in(&tmp);
        paths.coverage = tmp.join("no_coverage.csv").display().to_string();
        paths.stadiums = tmp.join("no_stadiums.csv").display().to_string();

        let data = load_season_data_from_paths(&paths, 2025).expect("should still load");
        assert_eq!(data.coverage.scheme_for(1, "BUF"), Scheme::Man);
        assert!(data.stadiums.is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn validate_inputs_passes_on_valid_files() {
        let tmp = std::env::temp_dir().join("gridcast_data_test_validate_ok");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let paths = valid_paths_in(&tmp);
        let issues = validate_inputs(&paths);
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn validate_inputs_reports_missing_file_and_columns() {
        let tmp = std::env::temp_dir().join("gridcast_data_test_validate_bad");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let mut paths = valid_paths_in(&tmp);
        paths.schedule = tmp.join("gone.csv").display().to_string();
        paths.coverage = write_csv(&tmp, "bad_coverage.csv", "week,team\n1,BUF\n");

        let issues = validate_inputs(&paths);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("missing file"));
        assert!(issues[1].contains("man_coverage_rate"));
        assert!(issues[1].contains("zone_coverage_rate"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn validate_inputs_accepts_playeryear_name_column() {
        let tmp = std::env::temp_dir().join("gridcast_data_test_validate_playeryear");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let mut paths = valid_paths_in(&tmp);
        paths.defenders = write_csv(
            &tmp,
            "db_playeryear.csv",
            "PlayerYear,Team,Position\nTest Corner 2024,BUF,CB\n",
        );

        let issues = validate_inputs(&paths);
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");

        let _ = fs::remove_dir_all(&tmp);
    }
}
