// Receiver stat loading (blended per-scheme coverage splits).

use super::coverage::Scheme;
use super::{lenient_f64, LoadError};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Depth-chart role tag for a receiver, as carried in the stats CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverRole {
    Wr1,
    Wr2,
    Wr3,
    Slot,
}

impl ReceiverRole {
    pub fn parse(s: &str) -> Option<ReceiverRole> {
        match s.trim().to_uppercase().as_str() {
            "WR1" => Some(ReceiverRole::Wr1),
            "WR2" => Some(ReceiverRole::Wr2),
            "WR3" => Some(ReceiverRole::Wr3),
            "SLOT" => Some(ReceiverRole::Slot),
            _ => None,
        }
    }
}

/// A receiver's production profile against one coverage scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemeSplit {
    pub routes: f64,
    pub win_rate: f64,
    pub target_rate: f64,
    pub separation: f64,
    pub fpts_per_target: f64,
}

#[derive(Debug, Clone)]
pub struct Receiver {
    pub name: String,
    pub team: String,
    /// Starting quarterback, when the export tags one. Keys the QB-level
    /// multiplier tables.
    pub quarterback: Option<String>,
    pub role: Option<ReceiverRole>,
    pub slot_snap_rate: f64,
    pub wide_snap_rate: f64,
    pub snap_share: f64,
    pub routes_run: f64,
    pub vs_man: SchemeSplit,
    pub vs_zone: SchemeSplit,
}

impl Receiver {
    pub fn split(&self, scheme: Scheme) -> &SchemeSplit {
        match scheme {
            Scheme::Man => &self.vs_man,
            Scheme::Zone => &self.vs_zone,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// Blended receiver CSV row. Numeric cells are lenient: stat exports leave
/// blanks where a player has no qualifying sample. Extra columns are
/// silently ignored via `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
#[allow(dead_code, non_snake_case)]
struct RawReceiverRow {
    Player: String,
    Team: String,
    #[serde(default, alias = "Quarterback")]
    QB: String,
    #[serde(default)]
    Role: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    SlotSnapRate: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    SnapShare: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    RoutesRun: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    RoutesVsMan: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    WinRateVsMan: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    TargetRateVsMan: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    TargetSeparationVsMan: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    FantasyPointsPerTargetVsMan: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    RoutesVsZone: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    WinRateVsZone: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    TargetRateVsZone: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    TargetSeparationVsZone: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    FantasyPointsPerTargetVsZone: f64,
    /// Absorb any extra columns the export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn load_receivers_from_reader<R: Read>(rdr: R) -> Result<Vec<Receiver>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut receivers = Vec::new();
    for result in reader.deserialize::<RawReceiverRow>() {
        match result {
            Ok(raw) => {
                let name = raw.Player.trim().to_string();
                if name.is_empty() {
                    warn!("skipping receiver row with empty Player cell");
                    continue;
                }
                let role = match raw.Role.trim() {
                    "" => None,
                    tag => {
                        let parsed = ReceiverRole::parse(tag);
                        if parsed.is_none() {
                            warn!("receiver '{}': unknown role tag '{}', ignoring", name, tag);
                        }
                        parsed
                    }
                };
                let quarterback = match raw.QB.trim() {
                    "" => None,
                    qb => Some(qb.to_string()),
                };
                receivers.push(Receiver {
                    name,
                    team: raw.Team.trim().to_string(),
                    quarterback,
                    role,
                    slot_snap_rate: raw.SlotSnapRate,
                    wide_snap_rate: 1.0 - raw.SlotSnapRate,
                    snap_share: raw.SnapShare,
                    routes_run: raw.RoutesRun,
                    vs_man: SchemeSplit {
                        routes: raw.RoutesVsMan,
                        win_rate: raw.WinRateVsMan,
                        target_rate: raw.TargetRateVsMan,
                        separation: raw.TargetSeparationVsMan,
                        fpts_per_target: raw.FantasyPointsPerTargetVsMan,
                    },
                    vs_zone: SchemeSplit {
                        routes: raw.RoutesVsZone,
                        win_rate: raw.WinRateVsZone,
                        target_rate: raw.TargetRateVsZone,
                        separation: raw.TargetSeparationVsZone,
                        fpts_per_target: raw.FantasyPointsPerTargetVsZone,
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed receiver row: {}", e);
            }
        }
    }
    Ok(receivers)
}

/// Load receiver profiles from a CSV file. Row order is preserved; it
/// determines the iteration order of every projection pass.
pub fn load_receivers(path: &Path) -> Result<Vec<Receiver>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_receivers_from_reader(file).map_err(|e| LoadError::Csv {
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

    const HEADER: &str = "Player,Team,QB,Role,SlotSnapRate,SnapShare,RoutesRun,\
RoutesVsMan,WinRateVsMan,TargetRateVsMan,TargetSeparationVsMan,FantasyPointsPerTargetVsMan,\
RoutesVsZone,WinRateVsZone,TargetRateVsZone,TargetSeparationVsZone,FantasyPointsPerTargetVsZone";

    #[test]
    fn receiver_csv_basic_load() {
        let csv_data = format!(
            "{HEADER}\n\
             Garrett Wilson,NYJ,Justin Fields,WR1,0.35,0.92,310,130,0.52,0.24,2.1,1.95,180,0.56,0.21,2.4,1.72\n\
             Wandale Robinson,NYG,,Slot,0.78,0.81,280,90,0.46,0.26,2.0,1.60,190,0.51,0.23,2.2,1.55"
        );

        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(receivers.len(), 2);

        let gw = &receivers[0];
        assert_eq!(gw.name, "Garrett Wilson");
        assert_eq!(gw.team, "NYJ");
        assert_eq!(gw.quarterback.as_deref(), Some("Justin Fields"));
        assert_eq!(gw.role, Some(ReceiverRole::Wr1));
        assert!((gw.slot_snap_rate - 0.35).abs() < f64::EPSILON);
        assert!((gw.wide_snap_rate - 0.65).abs() < f64::EPSILON);
        assert!((gw.vs_man.fpts_per_target - 1.95).abs() < f64::EPSILON);
        assert!((gw.vs_zone.fpts_per_target - 1.72).abs() < f64::EPSILON);
        assert!((gw.vs_man.win_rate - 0.52).abs() < f64::EPSILON);

        let wr = &receivers[1];
        assert!(wr.quarterback.is_none());
        assert_eq!(wr.role, Some(ReceiverRole::Slot));
    }

    #[test]
    fn scheme_split_selection() {
        let csv_data = format!(
            "{HEADER}\n\
             Test,NYJ,,,0.4,0.9,300,120,0.5,0.22,2.1,1.9,180,0.55,0.2,2.4,1.7"
        );
        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        let r = &receivers[0];
        assert!((r.split(Scheme::Man).fpts_per_target - 1.9).abs() < f64::EPSILON);
        assert!((r.split(Scheme::Zone).fpts_per_target - 1.7).abs() < f64::EPSILON);
    }

    #[test]
    fn optional_columns_absent_entirely() {
        // No QB or Role columns at all.
        let csv_data = "\
Player,Team,SlotSnapRate,FantasyPointsPerTargetVsMan,FantasyPointsPerTargetVsZone
Test Receiver,NYJ,0.4,1.9,1.7";

        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(receivers.len(), 1);
        assert!(receivers[0].quarterback.is_none());
        assert!(receivers[0].role.is_none());
        // Absent numeric columns default to zero.
        assert!((receivers[0].snap_share - 0.0).abs() < f64::EPSILON);
        assert!((receivers[0].vs_man.routes - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn role_parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(ReceiverRole::parse("wr2"), Some(ReceiverRole::Wr2));
        assert_eq!(ReceiverRole::parse(" SLOT "), Some(ReceiverRole::Slot));
        assert_eq!(ReceiverRole::parse("TE1"), None);
    }

    #[test]
    fn unknown_role_tag_ignored_but_row_kept() {
        let csv_data = format!(
            "{HEADER}\n\
             Test,NYJ,,FLEX,0.4,0.9,300,120,0.5,0.22,2.1,1.9,180,0.55,0.2,2.4,1.7"
        );
        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(receivers.len(), 1);
        assert!(receivers[0].role.is_none());
    }

    #[test]
    fn blank_numeric_cells_default_to_zero() {
        let csv_data = format!(
            "{HEADER}\n\
             Test,NYJ,,,0.4,,,120,0.5,0.22,2.1,1.9,180,0.55,0.2,2.4,"
        );
        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        let r = &receivers[0];
        assert!((r.snap_share - 0.0).abs() < f64::EPSILON);
        assert!((r.routes_run - 0.0).abs() < f64::EPSILON);
        assert!((r.vs_zone.fpts_per_target - 0.0).abs() < f64::EPSILON);
        // Cells that were present still parse.
        assert!((r.vs_man.fpts_per_target - 1.9).abs() < f64::EPSILON);
    }

    #[test]
    fn extra_columns_ignored() {
        let csv_data = "\
Player,Team,SlotSnapRate,FantasyPointsPerTargetVsMan,FantasyPointsPerTargetVsZone,AirYards,ADOT
Test Receiver,NYJ,0.4,1.9,1.7,820,12.4";

        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(receivers.len(), 1);
        assert_eq!(receivers[0].name, "Test Receiver");
    }

    #[test]
    fn names_trimmed_and_empty_names_skipped() {
        let csv_data = "\
Player,Team,SlotSnapRate,FantasyPointsPerTargetVsMan,FantasyPointsPerTargetVsZone
  Padded Name  , NYJ ,0.4,1.9,1.7
,NYJ,0.4,1.9,1.7";

        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(receivers.len(), 1);
        assert_eq!(receivers[0].name, "Padded Name");
        assert_eq!(receivers[0].team, "NYJ");
    }

    #[test]
    fn csv_load_order_preserved() {
        let csv_data = "\
Player,Team,SlotSnapRate,FantasyPointsPerTargetVsMan,FantasyPointsPerTargetVsZone
Zed,NYJ,0.4,1.9,1.7
Abel,NYJ,0.4,1.9,1.7
Mike,NYJ,0.4,1.9,1.7";

        let receivers = load_receivers_from_reader(csv_data.as_bytes()).unwrap();
        let names: Vec<&str> = receivers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Abel", "Mike"]);
    }
}
