// Defender stat loading, grouped by defensive unit.

use super::{lenient_f64, LoadError};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Listed position of a defender. Only safeties and linebackers are treated
/// specially; corners and anything unrecognized share the stat-driven path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenderPosition {
    Corner,
    Safety,
    Linebacker,
    Other,
}

impl DefenderPosition {
    pub fn parse(s: &str) -> DefenderPosition {
        match s.trim().to_uppercase().as_str() {
            "CB" => DefenderPosition::Corner,
            "S" => DefenderPosition::Safety,
            "LB" => DefenderPosition::Linebacker,
            _ => DefenderPosition::Other,
        }
    }
}

/// Coverage stat line for one defender.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageStats {
    pub targets_allowed: f64,
    pub catch_rate: f64,
    pub passer_rating: f64,
    pub fpts_per_target: f64,
    pub fpts_per_game: f64,
    pub man_success: f64,
    pub man_rate: f64,
    pub separation: f64,
}

#[derive(Debug, Clone)]
pub struct Defender {
    pub name: String,
    pub team: String,
    pub position: DefenderPosition,
    pub stats: CoverageStats,
}

/// Defensive units keyed by team. Per-team order matches the CSV, which
/// keeps penalty aggregation order-stable across runs.
pub type DefenderMap = HashMap<String, Vec<Defender>>;

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// Blended defender CSV row. The stat headers carry spaces; multi-year
/// blends name the player column `PlayerYear` instead of `Player`. Numeric
/// cells are lenient because the blend leaves blanks for small samples.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawDefenderRow {
    #[serde(rename = "Player", alias = "PlayerYear")]
    player: String,
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Position")]
    position: String,
    #[serde(rename = "Targets Allowed", default, deserialize_with = "lenient_f64")]
    targets_allowed: f64,
    #[serde(rename = "Catch Rate Allowed", default, deserialize_with = "lenient_f64")]
    catch_rate: f64,
    #[serde(rename = "Passer Rating Allowed", default, deserialize_with = "lenient_f64")]
    passer_rating: f64,
    #[serde(
        rename = "Fantasy Points Allowed Per Target",
        default,
        deserialize_with = "lenient_f64"
    )]
    fpts_per_target: f64,
    #[serde(
        rename = "Fantasy Points Allowed Per Game",
        default,
        deserialize_with = "lenient_f64"
    )]
    fpts_per_game: f64,
    #[serde(
        rename = "Man Coverage Success Rate",
        default,
        deserialize_with = "lenient_f64"
    )]
    man_success: f64,
    #[serde(rename = "Man Coverage Rate", default, deserialize_with = "lenient_f64")]
    man_rate: f64,
    #[serde(rename = "Target Separation", default, deserialize_with = "lenient_f64")]
    separation: f64,
    /// Absorb any extra columns the export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn load_defenders_from_reader<R: Read>(rdr: R) -> Result<DefenderMap, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut map: DefenderMap = HashMap::new();
    for result in reader.deserialize::<RawDefenderRow>() {
        match result {
            Ok(raw) => {
                let name = raw.player.trim().to_string();
                if name.is_empty() {
                    warn!("skipping defender row with empty name cell");
                    continue;
                }
                let team = raw.team.trim().to_string();
                map.entry(team.clone()).or_default().push(Defender {
                    name,
                    team,
                    position: DefenderPosition::parse(&raw.position),
                    stats: CoverageStats {
                        targets_allowed: raw.targets_allowed,
                        catch_rate: raw.catch_rate,
                        passer_rating: raw.passer_rating,
                        fpts_per_target: raw.fpts_per_target,
                        fpts_per_game: raw.fpts_per_game,
                        man_success: raw.man_success,
                        man_rate: raw.man_rate,
                        separation: raw.separation,
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed defender row: {}", e);
            }
        }
    }
    Ok(map)
}

/// Load defender profiles from a CSV file, grouped by team.
pub fn load_defenders(path: &Path) -> Result<DefenderMap, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_defenders_from_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Player,Team,Position,Targets Allowed,Catch Rate Allowed,\
Passer Rating Allowed,Fantasy Points Allowed Per Target,Fantasy Points Allowed Per Game,\
Man Coverage Success Rate,Man Coverage Rate,Target Separation";

    #[test]
    fn defender_csv_basic_load() {
        let csv_data = format!(
            "{HEADER}\n\
             Sauce Gardner,NYJ,CB,78,0.52,72.4,1.31,9.8,0.61,0.58,1.9\n\
             Jordan Whitehead,NYJ,S,40,0.66,95.0,1.6,8.2,0.3,0.2,2.6\n\
             Fred Warner,SF,LB,65,0.74,98.1,1.5,11.0,0.35,0.3,2.8"
        );

        let map = load_defenders_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(map.len(), 2);

        let jets = &map["NYJ"];
        assert_eq!(jets.len(), 2);
        assert_eq!(jets[0].name, "Sauce Gardner");
        assert_eq!(jets[0].position, DefenderPosition::Corner);
        assert!((jets[0].stats.catch_rate - 0.52).abs() < f64::EPSILON);
        assert!((jets[0].stats.man_rate - 0.58).abs() < f64::EPSILON);
        assert_eq!(jets[1].position, DefenderPosition::Safety);

        let sf = &map["SF"];
        assert_eq!(sf[0].position, DefenderPosition::Linebacker);
        assert!((sf[0].stats.fpts_per_game - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn playeryear_alias_accepted() {
        let csv_data = "\
PlayerYear,Team,Position,Catch Rate Allowed
Sauce Gardner 2024,NYJ,CB,0.52";

        let map = load_defenders_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(map["NYJ"][0].name, "Sauce Gardner 2024");
    }

    #[test]
    fn unknown_position_kept_as_other() {
        let csv_data = "\
Player,Team,Position,Catch Rate Allowed
Hybrid Guy,NYJ,STAR,0.6";

        let map = load_defenders_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(map["NYJ"][0].position, DefenderPosition::Other);
    }

    #[test]
    fn position_parse_trims_and_uppercases() {
        assert_eq!(DefenderPosition::parse(" cb "), DefenderPosition::Corner);
        assert_eq!(DefenderPosition::parse("s"), DefenderPosition::Safety);
        assert_eq!(DefenderPosition::parse("lb"), DefenderPosition::Linebacker);
        assert_eq!(DefenderPosition::parse("EDGE"), DefenderPosition::Other);
    }

    #[test]
    fn blank_stat_cells_default_to_zero() {
        let csv_data = format!(
            "{HEADER}\n\
             Thin Sample,NYJ,CB,,,,,,,,"
        );

        let map = load_defenders_from_reader(csv_data.as_bytes()).unwrap();
        let d = &map["NYJ"][0];
        assert!((d.stats.catch_rate - 0.0).abs() < f64::EPSILON);
        assert!((d.stats.separation - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn per_team_order_matches_csv() {
        let csv_data = "\
Player,Team,Position,Catch Rate Allowed
Third,NYJ,CB,0.3
First,NYJ,S,0.1
Second,NYJ,LB,0.2";

        let map = load_defenders_from_reader(csv_data.as_bytes()).unwrap();
        let names: Vec<&str> = map["NYJ"].iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Third", "First", "Second"]);
    }

    #[test]
    fn missing_stat_columns_default_to_zero() {
        // Only the identity columns and one stat are present.
        let csv_data = "\
Player,Team,Position,Man Coverage Rate
Corner,NYJ,CB,0.61";

        let map = load_defenders_from_reader(csv_data.as_bytes()).unwrap();
        let d = &map["NYJ"][0];
        assert!((d.stats.man_rate - 0.61).abs() < f64::EPSILON);
        assert!((d.stats.fpts_per_game - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_row_skipped() {
        // Second row has too few fields.
        let csv_data = "\
Player,Team,Position,Catch Rate Allowed
Good Row,NYJ,CB,0.5
Bad Row,NYJ
Also Good,NYJ,S,0.6";

        let map = load_defenders_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(map["NYJ"].len(), 2);
    }
}
