use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    GAIN_CRITICAL, GAIN_DEAD, GAIN_EXCELLENT, GAIN_GOOD, GAIN_POOR, TIER_EXCELLENT_MIN,
    TIER_GOOD_MIN, TIER_POOR_MIN,
};
use crate::data::{ConstellationData, StarId};

/// Visit history stored inline for typical route lengths.
pub type VisitedList = SmallVec<[StarId; 8]>;

/// Health tier derived from the current energy level.
///
/// Tiers are ordered by energy band; the tier also fixes how much
/// energy one kg of grass restores. Always re-derive the tier from the
/// energy at the point of use - a stored tier goes stale the moment
/// energy changes within a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    #[default]
    Excellent,
    Good,
    Poor,
    Critical,
    Dead,
}

impl HealthTier {
    /// Tier for a given energy level: >=75 / >=50 / >=25 / >0 / dead.
    #[must_use]
    pub fn from_energy(energy: f64) -> Self {
        if energy >= TIER_EXCELLENT_MIN {
            Self::Excellent
        } else if energy >= TIER_GOOD_MIN {
            Self::Good
        } else if energy >= TIER_POOR_MIN {
            Self::Poor
        } else if energy > 0.0 {
            Self::Critical
        } else {
            Self::Dead
        }
    }

    /// Energy restored per kg of grass grazed at this tier.
    #[must_use]
    pub const fn energy_gain_per_kg(self) -> f64 {
        match self {
            Self::Excellent => GAIN_EXCELLENT,
            Self::Good => GAIN_GOOD,
            Self::Poor => GAIN_POOR,
            Self::Critical => GAIN_CRITICAL,
            Self::Dead => GAIN_DEAD,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Poor => "poor",
            Self::Critical => "critical",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for HealthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excellent" => Ok(Self::Excellent),
            "good" => Ok(Self::Good),
            "poor" => Ok(Self::Poor),
            "critical" => Ok(Self::Critical),
            "dead" => Ok(Self::Dead),
            _ => Err(()),
        }
    }
}

impl From<HealthTier> for String {
    fn from(value: HealthTier) -> Self {
        value.as_str().to_string()
    }
}

/// Mutable resource record for one planning or replay run.
///
/// Created fresh per run from the description's initial values; never
/// shared across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuleState {
    pub current_star: StarId,
    /// Energy in percent, 0-100.
    pub energy: f64,
    pub health: HealthTier,
    /// Remaining grass in kg.
    pub grass: f64,
    /// Accumulated distance in light-years.
    pub age: f64,
    /// Death threshold; shifted by life adjustments during a run.
    pub death_age: f64,
    pub visited: VisitedList,
    pub is_alive: bool,
}

impl MuleState {
    /// Fresh state at `origin` from the description's initial values.
    #[must_use]
    pub fn from_description(data: &ConstellationData, origin: StarId) -> Self {
        Self {
            current_star: origin,
            energy: data.initial_energy,
            health: data.initial_health,
            grass: data.grass,
            age: data.start_age,
            death_age: data.death_age,
            visited: VisitedList::new(),
            is_alive: true,
        }
    }

    /// Light-years of life left before the death threshold.
    #[must_use]
    pub fn remaining_life(&self) -> f64 {
        (self.death_age - self.age).max(0.0)
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.age >= self.death_age || self.health == HealthTier::Dead
    }

    /// Re-derive the health tier from the current energy.
    pub fn refresh_health(&mut self) {
        self.health = HealthTier::from_energy(self.energy);
    }
}
