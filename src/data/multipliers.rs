// Scalar multiplier tables for the advanced game-script model. Each table is
// a small two-column CSV under the multiplier directory; missing files are
// normal (the model treats an absent table as "no adjustment").

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Table registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarTable {
    TeamScriptResponse,
    PaceMultiplier,
    DefPassRateAllowed,
    DefPressureRateAllowed,
    QbScriptResponse,
    QbAggressiveness,
    WrScriptSensitivity,
    WrTargetCompetition,
    WrAirYardsShare,
    WrInjuryStatus,
}

impl ScalarTable {
    pub const ALL: [ScalarTable; 10] = [
        ScalarTable::TeamScriptResponse,
        ScalarTable::PaceMultiplier,
        ScalarTable::DefPassRateAllowed,
        ScalarTable::DefPressureRateAllowed,
        ScalarTable::QbScriptResponse,
        ScalarTable::QbAggressiveness,
        ScalarTable::WrScriptSensitivity,
        ScalarTable::WrTargetCompetition,
        ScalarTable::WrAirYardsShare,
        ScalarTable::WrInjuryStatus,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ScalarTable::TeamScriptResponse => "team_script_response.csv",
            ScalarTable::PaceMultiplier => "pace_multiplier.csv",
            ScalarTable::DefPassRateAllowed => "def_pass_rate_allowed.csv",
            ScalarTable::DefPressureRateAllowed => "def_pressure_rate_allowed.csv",
            ScalarTable::QbScriptResponse => "qb_script_response.csv",
            ScalarTable::QbAggressiveness => "qb_aggressiveness.csv",
            ScalarTable::WrScriptSensitivity => "wr_script_sensitivity.csv",
            ScalarTable::WrTargetCompetition => "wr_target_competition.csv",
            ScalarTable::WrAirYardsShare => "wr_air_yards_share.csv",
            ScalarTable::WrInjuryStatus => "wr_injury_status.csv",
        }
    }

    /// Column holding the lookup key. The value column is always `Value`.
    pub fn key_column(self) -> &'static str {
        match self {
            ScalarTable::TeamScriptResponse => "Team",
            ScalarTable::PaceMultiplier => "Key",
            ScalarTable::DefPassRateAllowed => "Key",
            ScalarTable::DefPressureRateAllowed => "Team",
            ScalarTable::QbScriptResponse => "Player",
            ScalarTable::QbAggressiveness => "Player",
            ScalarTable::WrScriptSensitivity => "Player",
            ScalarTable::WrTargetCompetition => "Player",
            ScalarTable::WrAirYardsShare => "Player",
            ScalarTable::WrInjuryStatus => "Player",
        }
    }
}

const WEEKLY_PACE_FILE: &str = "pace_multiplier_weekly.csv";
const VALUE_COLUMN: &str = "Value";

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MultiplierRegistry {
    scalars: HashMap<ScalarTable, HashMap<String, f64>>,
    weekly_pace: HashMap<(u32, String), f64>,
}

impl MultiplierRegistry {
    /// Look up a scalar multiplier. Unknown keys and absent tables are
    /// neutral (1.0).
    pub fn scalar(&self, table: ScalarTable, key: &str) -> f64 {
        self.scalars
            .get(&table)
            .and_then(|t| t.get(key))
            .copied()
            .unwrap_or(1.0)
    }

    /// Pace multiplier for a team, preferring the week-specific entry over
    /// the season-static one.
    pub fn pace(&self, week: u32, team: &str) -> f64 {
        if let Some(v) = self.weekly_pace.get(&(week, team.to_string())) {
            return *v;
        }
        self.scalar(ScalarTable::PaceMultiplier, team)
    }

    /// Share of a receiver's production coming on downfield routes, used to
    /// blend deep and short weather penalties. Defaults to 0.4 when the
    /// receiver has no entry.
    pub fn air_yards_share(&self, player: &str) -> f64 {
        self.scalars
            .get(&ScalarTable::WrAirYardsShare)
            .and_then(|t| t.get(player))
            .copied()
            .unwrap_or(0.4)
    }

    pub fn table_count(&self) -> usize {
        self.scalars.len()
    }

    pub fn weekly_pace_count(&self) -> usize {
        self.weekly_pace.len()
    }

    #[cfg(test)]
    pub fn insert_scalar(&mut self, table: ScalarTable, key: &str, value: f64) {
        self.scalars
            .entry(table)
            .or_default()
            .insert(key.to_string(), value);
    }

    #[cfg(test)]
    pub fn insert_weekly_pace(&mut self, week: u32, team: &str, value: f64) {
        self.weekly_pace.insert((week, team.to_string()), value);
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn load_scalar_table_from_reader<R: Read>(
    rdr: R,
    key_column: &str,
) -> Result<HashMap<String, f64>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut table = HashMap::new();
    for result in reader.deserialize::<HashMap<String, String>>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping malformed multiplier row: {}", e);
                continue;
            }
        };
        let key = match row.get(key_column) {
            Some(k) if !k.trim().is_empty() => k.trim().to_string(),
            _ => {
                debug!("multiplier row missing key column '{}'", key_column);
                continue;
            }
        };
        let value = match row.get(VALUE_COLUMN).and_then(|v| v.trim().parse::<f64>().ok()) {
            Some(v) if v.is_finite() => v,
            _ => {
                debug!("multiplier row for '{}' has unusable value", key);
                continue;
            }
        };
        table.insert(key, value);
    }
    Ok(table)
}

fn load_weekly_pace_from_reader<R: Read>(
    rdr: R,
) -> Result<HashMap<(u32, String), f64>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut table = HashMap::new();
    for result in reader.deserialize::<HashMap<String, String>>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping malformed weekly pace row: {}", e);
                continue;
            }
        };
        let week = match row.get("Week").and_then(|w| w.trim().parse::<u32>().ok()) {
            Some(w) => w,
            None => continue,
        };
        let team = match row.get("Team") {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => continue,
        };
        let value = match row.get(VALUE_COLUMN).and_then(|v| v.trim().parse::<f64>().ok()) {
            Some(v) if v.is_finite() => v,
            _ => continue,
        };
        table.insert((week, team), value);
    }
    Ok(table)
}

/// Load every multiplier table found under `dir`. Files that do not exist
/// are skipped with a warning; the registry answers 1.0 for their keys.
pub fn load_multipliers(dir: &Path) -> MultiplierRegistry {
    let mut registry = MultiplierRegistry::default();

    for table in ScalarTable::ALL {
        let path = dir.join(table.file_name());
        if !path.exists() {
            warn!("multiplier file not found, skipping: {}", path.display());
            continue;
        }
        match std::fs::File::open(&path)
            .map_err(csv::Error::from)
            .and_then(|f| load_scalar_table_from_reader(f, table.key_column()))
        {
            Ok(map) => {
                debug!("loaded {} rows from {}", map.len(), path.display());
                registry.scalars.insert(table, map);
            }
            Err(e) => {
                warn!("failed to read {}: {}", path.display(), e);
            }
        }
    }

    let weekly_path = dir.join(WEEKLY_PACE_FILE);
    if weekly_path.exists() {
        match std::fs::File::open(&weekly_path)
            .map_err(csv::Error::from)
            .and_then(load_weekly_pace_from_reader)
        {
            Ok(map) => {
                debug!(
                    "loaded {} weekly pace rows from {}",
                    map.len(),
                    weekly_path.display()
                );
                registry.weekly_pace = map;
            }
            Err(e) => {
                warn!("failed to read {}: {}", weekly_path.display(), e);
            }
        }
    } else {
        warn!(
            "multiplier file not found, skipping: {}",
            weekly_path.display()
        );
    }

    info!(
        "multiplier registry ready: {} tables, {} weekly pace rows",
        registry.table_count(),
        registry.weekly_pace_count()
    );
    registry
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
