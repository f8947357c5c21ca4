// Defensive role assignment and matchup penalties.
//
// Every defender is scored against four coverage roles. Hard assignment
// picks one role by a priority rule; soft assignment spreads the defender
// across all four proportionally to what their stats imply. Per-role
// penalties then aggregate across the opposing unit and are applied to the
// receiver's base points as `1 - penalty`, weighted by how often the
// receiver lines up against each role.

use crate::config::RoleWeights;
use crate::data::{CoverageStats, Defender, DefenderPosition, Receiver};
use tracing::warn;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Slot,
    Wide,
    Safety,
    Linebacker,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Slot, Role::Wide, Role::Safety, Role::Linebacker];
}

/// One value per coverage role. Used for soft distributions, alignment
/// weights, and penalty profiles alike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleSet {
    pub slot: f64,
    pub wide: f64,
    pub safety: f64,
    pub linebacker: f64,
}

impl RoleSet {
    pub const fn uniform(value: f64) -> RoleSet {
        RoleSet {
            slot: value,
            wide: value,
            safety: value,
            linebacker: value,
        }
    }

    pub fn from_fn(mut f: impl FnMut(Role) -> f64) -> RoleSet {
        RoleSet {
            slot: f(Role::Slot),
            wide: f(Role::Wide),
            safety: f(Role::Safety),
            linebacker: f(Role::Linebacker),
        }
    }

    pub fn get(&self, role: Role) -> f64 {
        match role {
            Role::Slot => self.slot,
            Role::Wide => self.wide,
            Role::Safety => self.safety,
            Role::Linebacker => self.linebacker,
        }
    }

    pub fn sum(&self) -> f64 {
        self.slot + self.wide + self.safety + self.linebacker
    }
}

// ---------------------------------------------------------------------------
// Per-defender role assignment
// ---------------------------------------------------------------------------

/// Deterministic single-role assignment. Position wins outright; otherwise
/// a heavy man-coverage rate reads as a boundary corner and a high catch
/// rate allowed reads as a slot defender.
pub fn hard_role(defender: &Defender) -> Role {
    match defender.position {
        DefenderPosition::Safety => Role::Safety,
        DefenderPosition::Linebacker => Role::Linebacker,
        DefenderPosition::Corner | DefenderPosition::Other => {
            let stats = &defender.stats;
            if stats.man_rate > 0.5 {
                Role::Wide
            } else if stats.catch_rate > 0.7 {
                Role::Slot
            } else {
                Role::Wide
            }
        }
    }
}

/// Probability-style weights over the four roles, normalized to sum to 1.
/// A defender with no usable signal gets a uniform 0.25 per role.
pub fn soft_role_distribution(defender: &Defender) -> RoleSet {
    let stats = &defender.stats;
    let raw = RoleSet {
        slot: stats.catch_rate.max(0.0),
        wide: stats.man_rate.max(0.0),
        safety: if defender.position == DefenderPosition::Safety {
            1.0
        } else {
            0.0
        },
        linebacker: if defender.position == DefenderPosition::Linebacker {
            1.0
        } else {
            0.0
        },
    };
    let total = raw.sum();
    if total <= 0.0 {
        return RoleSet::uniform(0.25);
    }
    RoleSet::from_fn(|role| raw.get(role) / total)
}

/// How strongly a defender suppresses production in a given role. Higher
/// means the defender allows more, so callers apply it as `1 - penalty`.
pub fn role_penalty(stats: &CoverageStats, role: Role) -> f64 {
    match role {
        Role::Slot => (stats.catch_rate + stats.fpts_per_target) / 2.0,
        Role::Wide => (stats.separation + stats.passer_rating) / 2.0 / 100.0,
        Role::Safety => 0.7 * stats.catch_rate + 0.3 * stats.separation,
        Role::Linebacker => stats.fpts_per_game / 15.0,
    }
}

// ---------------------------------------------------------------------------
// Unit aggregation
// ---------------------------------------------------------------------------

/// Aggregate a defensive unit's per-role penalties. Soft mode blends every
/// defender into every role by their soft distribution; hard mode averages
/// only the defenders assigned to each role. A role nobody covers stays at
/// the neutral 1.0, as does the whole profile for an empty unit.
pub fn unit_penalties(defenders: &[Defender], soft: bool) -> RoleSet {
    if defenders.is_empty() {
        return RoleSet::uniform(1.0);
    }
    if soft {
        soft_unit_penalties(defenders)
    } else {
        hard_unit_penalties(defenders)
    }
}

fn soft_unit_penalties(defenders: &[Defender]) -> RoleSet {
    let count = defenders.len() as f64;
    let distributions: Vec<RoleSet> = defenders.iter().map(soft_role_distribution).collect();
    RoleSet::from_fn(|role| {
        let weighted: f64 = defenders
            .iter()
            .zip(&distributions)
            .map(|(d, dist)| dist.get(role) * role_penalty(&d.stats, role))
            .sum();
        weighted / count
    })
}

fn hard_unit_penalties(defenders: &[Defender]) -> RoleSet {
    RoleSet::from_fn(|role| {
        let values: Vec<f64> = defenders
            .iter()
            .filter(|d| hard_role(d) == role)
            .map(|d| role_penalty(&d.stats, role))
            .collect();
        if values.is_empty() {
            1.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    })
}

// ---------------------------------------------------------------------------
// Receiver-side weights and the adjusted score
// ---------------------------------------------------------------------------

/// How much of each defensive role a receiver actually sees, scaled by the
/// configured role weights. Slot-heavy receivers draw more safety and
/// linebacker attention over the middle.
pub fn alignment_weights(receiver: &Receiver, weights: &RoleWeights) -> RoleSet {
    let slot_rate = receiver.slot_snap_rate;
    let safety_rate = if slot_rate > 0.3 { 0.2 } else { 0.05 };
    let lb_rate = if slot_rate > 0.2 { 0.1 } else { 0.0 };
    RoleSet {
        slot: slot_rate * weights.slot,
        wide: (1.0 - slot_rate) * weights.wide,
        safety: safety_rate * weights.safety,
        linebacker: lb_rate * weights.lb,
    }
}

/// Weighted penalty application: `base * sum(w_r * (1 - p_r)) / sum(w_r)`.
/// Zero total weight leaves the base untouched rather than dividing by it.
pub fn adjusted_points(base: f64, weights: &RoleSet, penalties: &RoleSet) -> f64 {
    let total = weights.sum();
    if total <= 0.0 {
        warn!("alignment weights sum to zero, leaving base points unadjusted");
        return base;
    }
    let blended: f64 = Role::ALL
        .iter()
        .map(|&role| weights.get(role) * (1.0 - penalties.get(role)))
        .sum();
    base * blended / total
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
