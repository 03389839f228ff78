//! Centralized balance and tuning constants for the Astromule engine.
//!
//! These values define the deterministic math shared by the planner and
//! the replay engine. Keeping them together ensures the cost model can
//! only drift via reviewed code changes, never via data assets.

// Cost model ---------------------------------------------------------------
/// Energy spent per light-year traveled. Shared verbatim between the
/// planner and the replay engine; the two must never disagree.
pub(crate) const ENERGY_COST_PER_LIGHT_YEAR: f64 = 0.1;
pub(crate) const ENERGY_MAX: f64 = 100.0;
/// Eating is triggered whenever post-research energy drops below this.
pub(crate) const EAT_TRIGGER_ENERGY: f64 = 50.0;
/// Half the time spent at a star is available for grazing, and one kg
/// takes exactly `time_to_eat`, so at most one kg fits per stop.
pub(crate) const MAX_KG_PER_STOP: f64 = 1.0;

// Health tier boundaries ---------------------------------------------------
pub(crate) const TIER_EXCELLENT_MIN: f64 = 75.0;
pub(crate) const TIER_GOOD_MIN: f64 = 50.0;
pub(crate) const TIER_POOR_MIN: f64 = 25.0;

// Energy gained per kg of grass, by health tier ----------------------------
pub(crate) const GAIN_EXCELLENT: f64 = 5.0;
pub(crate) const GAIN_GOOD: f64 = 3.0;
pub(crate) const GAIN_POOR: f64 = 2.0;
pub(crate) const GAIN_CRITICAL: f64 = 1.0;
pub(crate) const GAIN_DEAD: f64 = 0.0;

// Open-ended greedy planner guards -----------------------------------------
/// Abort the walk when a step would cost more than this share of the
/// current energy. Tunable; no documented derivation exists.
pub(crate) const GREEDY_STEP_COST_RATIO: f64 = 0.30;
/// Abort the walk when a step would leave less energy than this.
pub(crate) const GREEDY_ENERGY_FLOOR: f64 = 25.0;

// Hypergiant boost ---------------------------------------------------------
pub(crate) const HYPERGIANT_ENERGY_FACTOR: f64 = 1.5;
pub(crate) const HYPERGIANT_GRASS_FACTOR: f64 = 2.0;

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
