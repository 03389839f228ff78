use serde::{Deserialize, Serialize};

use crate::state::HealthTier;

/// Stable identifier assigned to every star in a loaded description.
pub type StarId = u32;

/// Position of a star on the chart. Presentation only; planning never
/// reads coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// Declared connection between two stars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarLink {
    pub star_id: StarId,
    /// Distance in light-years. Always positive in validated input.
    pub distance: f64,
}

/// A single star as declared by the loaded description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Star {
    pub id: StarId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub linked_to: Vec<StarLink>,
    pub radius: f64,
    /// Light-years-equivalent time to graze one kg of grass.
    pub time_to_eat: f64,
    /// Energy cost of the research performed on arrival.
    pub amount_of_energy: f64,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub hypergiant: bool,
    /// Research side effect; may be edited by the host before a run.
    #[serde(default)]
    pub life_years_gained: f64,
    /// Research side effect; may be edited by the host before a run.
    #[serde(default)]
    pub life_years_lost: f64,
}

impl Star {
    /// Display name, falling back from `label` to `name` to the id.
    #[must_use]
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("Star {}", self.id))
    }

    /// Net shift applied to the death threshold when this star's
    /// research completes.
    #[must_use]
    pub fn life_adjustment(&self) -> f64 {
        self.life_years_gained - self.life_years_lost
    }
}

/// A named group of stars. A star may appear in several constellations
/// ("shared"); the caller guarantees at most two hypergiants per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constellation {
    pub name: String,
    pub stars: Vec<Star>,
}

/// Complete, already-validated expedition description handed over by
/// the host layer. The engine performs no re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationData {
    pub constellations: Vec<Constellation>,
    /// Initial energy, 0-100.
    pub initial_energy: f64,
    pub initial_health: HealthTier,
    /// Initial grass supply in kg.
    pub grass: f64,
    /// Opaque run number carried through from the description.
    #[serde(default)]
    pub number: i64,
    /// Starting age in light-years.
    pub start_age: f64,
    /// Age at which the traveler dies. Shifts during a run as life
    /// adjustments are applied.
    pub death_age: f64,
}

impl ConstellationData {
    /// Parse a description from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid
    /// description.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Aggregate statistics over the loaded description.
    #[must_use]
    pub fn statistics(&self) -> DescriptionStats {
        let mut stats = DescriptionStats {
            total_constellations: self.constellations.len(),
            ..DescriptionStats::default()
        };
        for constellation in &self.constellations {
            let hypergiants = constellation
                .stars
                .iter()
                .filter(|star| star.hypergiant)
                .count();
            stats.total_stars += constellation.stars.len();
            stats.hypergiant_stars += hypergiants;
            for star in &constellation.stars {
                stats.total_connections += star.linked_to.len();
            }
            stats.constellations.push(ConstellationStats {
                name: constellation.name.clone(),
                star_count: constellation.stars.len(),
                hypergiant_count: hypergiants,
            });
        }
        // Links are declared from both endpoints.
        stats.total_connections /= 2;
        stats
    }
}

/// Per-constellation breakdown inside [`DescriptionStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstellationStats {
    pub name: String,
    pub star_count: usize,
    pub hypergiant_count: usize,
}

/// Summary the host can show after loading a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DescriptionStats {
    pub total_constellations: usize,
    pub total_stars: usize,
    /// Unique connections; bidirectional declarations counted once.
    pub total_connections: usize,
    pub hypergiant_stars: usize,
    pub constellations: Vec<ConstellationStats>,
}
