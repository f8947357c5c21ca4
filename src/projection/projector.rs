// Per-receiver week projection: the pipeline that turns one (receiver, week)
// pair into an output row.

use crate::config::Config;
use crate::data::{Receiver, SeasonData};
use crate::projection::alignment::{self, RoleSet};
use crate::projection::script::{self, ScriptInputs};
use crate::weather::EnvironmentMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Shared context and per-worker state
// ---------------------------------------------------------------------------

/// Immutable snapshot every projection reads from. Safe to share across
/// worker threads by reference.
pub struct ProjectionContext<'a> {
    pub config: &'a Config,
    pub data: &'a SeasonData,
    pub environment: &'a EnvironmentMap,
}

/// Opponent-team penalty profiles, filled on first use so a defensive unit
/// is aggregated at most once per week.
pub type PenaltyCache = HashMap<String, RoleSet>;

/// Adjusted-point history per receiver, feeding the recent-form factor.
/// Each worker owns its own ledger; entries never cross weeks between
/// workers, which keeps season output independent of work partitioning.
#[derive(Debug, Default)]
pub struct ProjectionLedger {
    history: HashMap<String, Vec<(u32, f64)>>,
}

impl ProjectionLedger {
    pub fn new() -> ProjectionLedger {
        ProjectionLedger::default()
    }

    pub fn record(&mut self, name: &str, week: u32, adj_pts: f64) {
        self.history
            .entry(name.to_string())
            .or_default()
            .push((week, adj_pts));
    }

    /// `1 + (mean of the last up-to-3 recorded weeks before `week` - 10) / 30`,
    /// or 1.0 with no history.
    pub fn recent_form(&self, name: &str, week: u32) -> f64 {
        let Some(entries) = self.history.get(name) else {
            return 1.0;
        };
        let mut prior: Vec<(u32, f64)> = entries
            .iter()
            .filter(|(w, _)| *w < week)
            .copied()
            .collect();
        if prior.is_empty() {
            return 1.0;
        }
        prior.sort_by_key(|(w, _)| *w);
        let recent = &prior[prior.len().saturating_sub(3)..];
        let mean = recent.iter().map(|(_, pts)| pts).sum::<f64>() / recent.len() as f64;
        1.0 + (mean - 10.0) / 30.0
    }
}

// ---------------------------------------------------------------------------
// Output row
// ---------------------------------------------------------------------------

/// One projection result, shaped for direct CSV serialization. Percentile
/// and explanation columns stay empty unless their features are enabled.
#[derive(Debug, Clone, Serialize)]
pub struct WeekProjection {
    pub week: u32,
    pub wr_name: String,
    pub team: String,
    pub opp_team: String,
    pub scheme: crate::data::Scheme,
    pub base_pts: f64,
    pub adj_pts: f64,
    pub slot_weight: f64,
    pub wide_weight: f64,
    pub safety_weight: f64,
    pub lb_weight: f64,
    pub env_boost: f64,
    pub game_script_boost: f64,
    pub route_weather_mult: f64,
    pub final_pts: f64,
    pub adj_pts_p25: Option<f64>,
    pub adj_pts_p50: Option<f64>,
    pub adj_pts_p75: Option<f64>,
    pub game_script_explanation: Option<String>,
}

// ---------------------------------------------------------------------------
// The projection pipeline
// ---------------------------------------------------------------------------

/// Project one receiver for one week. `None` means the receiver has no game
/// that week (bye or schedule gap), which callers treat as "skip".
pub fn project(
    ctx: &ProjectionContext<'_>,
    receiver: &Receiver,
    week: u32,
    penalty_cache: &mut PenaltyCache,
    ledger: &mut ProjectionLedger,
) -> Option<WeekProjection> {
    // 1. Matchup row, or bye.
    let Some(matchup) = ctx.data.schedule.matchup_for(week, &receiver.team) else {
        debug!("{} ({}) has no matchup in week {}", receiver.name, receiver.team, week);
        return None;
    };
    let opponent = matchup.opponent_of(&receiver.team);

    // 2. Which coverage the opposing defense plays most this week.
    let scheme = ctx.data.coverage.scheme_for(week, opponent);

    // 3. Game-script boost.
    let (boost, trace) = if ctx.config.model.game_script_boost {
        let inputs = ScriptInputs {
            receiver,
            opponent,
            week,
            registry: &ctx.data.multipliers,
            role_multipliers: &ctx.config.role_multipliers,
        };
        let (boost, trace) = script::script_boost(
            &inputs,
            matchup,
            ctx.config.model.advanced_game_script,
        );
        (boost, Some(trace))
    } else {
        (0.0, None)
    };

    // 4. Scheme-conditioned base rate.
    let base_pts = receiver.split(scheme).fpts_per_target;

    // 5. Opponent penalty profile, cached per week.
    let soft = ctx.config.model.soft_alignment;
    let penalties = *penalty_cache.entry(opponent.to_string()).or_insert_with(|| {
        let unit = ctx
            .data
            .defenders
            .get(opponent)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if unit.is_empty() {
            warn!("no defender rows for {}, matchup penalties stay neutral", opponent);
        }
        alignment::unit_penalties(unit, soft)
    });

    let weights = alignment::alignment_weights(receiver, &ctx.config.weights);
    let matchup_adjusted = alignment::adjusted_points(base_pts, &weights, &penalties);

    // 6. Recent form.
    let form = ledger.recent_form(&receiver.name, week);
    let adj_pts = matchup_adjusted * form;

    // 7-9. Environment, script, and route-weather factors.
    let env_key = (week, opponent.to_string());
    let (env_boost, deep_penalty, short_penalty) = match ctx.environment.get(&env_key) {
        Some(entry) => (entry.boost, entry.deep_penalty, entry.short_penalty),
        None => (1.0, 1.0, 1.0),
    };
    let air_share = ctx.data.multipliers.air_yards_share(&receiver.name);
    let route_mult = air_share * deep_penalty + (1.0 - air_share) * short_penalty;
    let final_pts = adj_pts * env_boost * (1.0 + boost) * route_mult;

    // 10. Optional percentile spread, then record and return.
    let sim = &ctx.config.simulation;
    let seed = sim.seed ^ fxhash::hash64(&(receiver.name.as_str(), week));
    let spread = percentile_spread(final_pts, sim.std_dev, sim.samples, seed);

    let recorded_adj = round2(adj_pts);
    ledger.record(&receiver.name, week, recorded_adj);

    Some(WeekProjection {
        week,
        wr_name: receiver.name.clone(),
        team: receiver.team.clone(),
        opp_team: opponent.to_string(),
        scheme,
        base_pts: round2(base_pts),
        adj_pts: recorded_adj,
        slot_weight: round2(weights.slot),
        wide_weight: round2(weights.wide),
        safety_weight: round2(weights.safety),
        lb_weight: round2(weights.linebacker),
        env_boost: round3(env_boost),
        game_script_boost: round3(boost),
        route_weather_mult: round3(route_mult),
        final_pts: round2(final_pts),
        adj_pts_p25: spread.map(|s| round2(s.0)),
        adj_pts_p50: spread.map(|s| round2(s.1)),
        adj_pts_p75: spread.map(|s| round2(s.2)),
        game_script_explanation: if ctx.config.model.explain_game_script {
            trace.map(|t| t.to_string())
        } else {
            None
        },
    })
}

// ---------------------------------------------------------------------------
// Percentile spread
// ---------------------------------------------------------------------------

/// Draw `samples` normal values and report (p25, p50, p75). The seed is
/// derived per (receiver, week), so results do not depend on how receivers
/// are ordered or partitioned.
fn percentile_spread(
    mean: f64,
    std_dev: f64,
    samples: usize,
    seed: u64,
) -> Option<(f64, f64, f64)> {
    if samples == 0 {
        return None;
    }
    let normal = Normal::new(mean, std_dev).ok()?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut draws: Vec<f64> = (0..samples).map(|_| normal.sample(&mut rng)).collect();
    draws.sort_by(f64::total_cmp);
    Some((
        percentile(&draws, 25.0),
        percentile(&draws, 50.0),
        percentile(&draws, 75.0),
    ))
}

/// Linear interpolation between closest ranks over a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
