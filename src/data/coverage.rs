// Team coverage tendency tags: man/zone rates per (week, team).

use super::{lenient_f64, LoadError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The dominant coverage shell a defense is expected to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Man,
    Zone,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Man => write!(f, "man"),
            Scheme::Zone => write!(f, "zone"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchemeRates {
    pub man: f64,
    pub zone: f64,
}

/// Week-by-team coverage tendencies. Lookups that find nothing resolve to
/// man, the more common shell against top receivers.
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    rates: HashMap<(u32, String), SchemeRates>,
}

impl CoverageMap {
    pub fn insert(&mut self, week: u32, team: &str, rates: SchemeRates) {
        self.rates.insert((week, team.to_string()), rates);
    }

    pub fn get(&self, week: u32, team: &str) -> Option<SchemeRates> {
        self.rates.get(&(week, team.to_string())).copied()
    }

    /// Resolve the scheme for a defense in a given week. Ties go to man.
    pub fn scheme_for(&self, week: u32, team: &str) -> Scheme {
        match self.get(week, team) {
            Some(rates) if rates.zone > rates.man => Scheme::Zone,
            _ => Scheme::Man,
        }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawCoverageRow {
    week: u32,
    team: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    man_coverage_rate: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    zone_coverage_rate: f64,
    /// Absorb any extra columns the export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn load_coverage_from_reader<R: Read>(rdr: R) -> Result<CoverageMap, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut map = CoverageMap::default();
    for result in reader.deserialize::<RawCoverageRow>() {
        match result {
            Ok(raw) => {
                map.insert(
                    raw.week,
                    raw.team.trim(),
                    SchemeRates {
                        man: raw.man_coverage_rate,
                        zone: raw.zone_coverage_rate,
                    },
                );
            }
            Err(e) => {
                warn!("skipping malformed coverage row: {}", e);
            }
        }
    }
    Ok(map)
}

/// Load coverage tendency tags from a CSV file.
pub fn load_coverage(path: &Path) -> Result<CoverageMap, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_coverage_from_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
