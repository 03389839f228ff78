//! Stepwise replay of a planned route against a mutable resource
//! state.
//!
//! The journey owns its route and advances one star transition per
//! call. The shared graph handle is only read during a step; the host
//! may block or unblock edges strictly between steps, and the replay
//! reacts by re-routing the unexplored suffix or declaring the
//! traveler trapped.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::CoreError;
use crate::constants::{
    ENERGY_COST_PER_LIGHT_YEAR, EAT_TRIGGER_ENERGY, ENERGY_MAX, HYPERGIANT_ENERGY_FACTOR,
    HYPERGIANT_GRASS_FACTOR,
};
use crate::data::{Star, StarId};
use crate::graph::StarGraph;
use crate::planner::graze;
use crate::state::{HealthTier, MuleState};

/// What happened during one replay step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Start,
    Travel,
    EatAndResearch,
    RouteRecalculated,
    HypergiantBoost,
    DeathByEnergyTravel,
    DeathByAge,
    DeathByEnergyResearch,
    DeathByEnergy,
    DeathByBlockedPath,
    DeathByExhaustion,
}

impl StepAction {
    /// Whether this action ends the run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::DeathByEnergyTravel
                | Self::DeathByAge
                | Self::DeathByEnergyResearch
                | Self::DeathByEnergy
                | Self::DeathByBlockedPath
                | Self::DeathByExhaustion
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Travel => "travel",
            Self::EatAndResearch => "eat_and_research",
            Self::RouteRecalculated => "route_recalculated",
            Self::HypergiantBoost => "hypergiant_boost",
            Self::DeathByEnergyTravel => "death_by_energy_travel",
            Self::DeathByAge => "death_by_age",
            Self::DeathByEnergyResearch => "death_by_energy_research",
            Self::DeathByEnergy => "death_by_energy",
            Self::DeathByBlockedPath => "death_by_blocked_path",
            Self::DeathByExhaustion => "death_by_exhaustion",
        }
    }
}

/// One recorded replay step: where the traveler landed, the full
/// resource snapshot afterwards, and a narrative for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub star: StarId,
    pub star_label: String,
    pub state: MuleState,
    pub action: StepAction,
    pub message: String,
}

/// Aggregate counts for a run, available at any point including
/// mid-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneySummary {
    pub total_steps: usize,
    pub stars_visited: usize,
    pub final_energy: f64,
    pub final_health: HealthTier,
    pub remaining_grass: f64,
    pub age: f64,
    pub remaining_life: f64,
    pub is_alive: bool,
    pub route: Vec<StarId>,
    pub visited: Vec<StarId>,
}

/// Replay state machine for one precomputed route.
#[derive(Debug, Clone)]
pub struct Journey {
    graph: Rc<RefCell<StarGraph>>,
    route: Vec<StarId>,
    state: MuleState,
    current_step: usize,
    log: Vec<StepRecord>,
    complete: bool,
}

impl Journey {
    /// Bind a route and a fresh resource state to a shared graph.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyRoute`] for an empty route and
    /// [`CoreError::UnknownStar`] when the route references a star the
    /// graph does not contain.
    pub fn new(
        graph: Rc<RefCell<StarGraph>>,
        route: Vec<StarId>,
        state: MuleState,
    ) -> Result<Self, CoreError> {
        if route.is_empty() {
            return Err(CoreError::EmptyRoute);
        }
        {
            let graph = graph.borrow();
            if let Some(&missing) = route.iter().find(|&&id| !graph.contains(id)) {
                return Err(CoreError::UnknownStar(missing));
            }
        }
        Ok(Self {
            graph,
            route,
            state,
            current_step: 0,
            log: Vec::new(),
            complete: false,
        })
    }

    /// Execute the next transition. `None` once the run is complete.
    pub fn advance(&mut self) -> Option<StepRecord> {
        if self.complete {
            return None;
        }
        if self.current_step >= self.route.len() {
            return self.exhaustion_step();
        }
        if self.current_step == 0 {
            return self.start_step();
        }
        self.travel_step()
    }

    /// Replay every remaining step and return the full log.
    pub fn run_to_end(&mut self) -> &[StepRecord] {
        while self.advance().is_some() {}
        &self.log
    }

    /// Steps recorded so far, in order.
    #[must_use]
    pub fn log(&self) -> &[StepRecord] {
        &self.log
    }

    /// The route as currently planned, re-routes included.
    #[must_use]
    pub fn route(&self) -> &[StarId] {
        &self.route
    }

    #[must_use]
    pub fn state(&self) -> &MuleState {
        &self.state
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn summary(&self) -> JourneySummary {
        JourneySummary {
            total_steps: self.log.len(),
            stars_visited: self.state.visited.len(),
            final_energy: self.state.energy,
            final_health: self.state.health,
            remaining_grass: self.state.grass,
            age: self.state.age,
            remaining_life: self.state.remaining_life(),
            is_alive: self.state.is_alive,
            route: self.route.clone(),
            visited: self.state.visited.to_vec(),
        }
    }

    fn star(&self, id: StarId) -> Option<Star> {
        self.graph.borrow().get_star(id).cloned()
    }

    /// First invocation: the traveler is already at the origin.
    fn start_step(&mut self) -> Option<StepRecord> {
        let star_id = self.route[0];
        let star = self.star(star_id)?;
        self.state.visited.push(star_id);
        self.state.current_star = star_id;
        let message = format!("The mule sets off from {}", star.display_label());
        let record = self.push_record(star_id, &star, StepAction::Start, message);
        self.current_step += 1;
        Some(record)
    }

    /// Past the final star while still alive: one synthetic terminal
    /// step so every completed run ends in a recorded death.
    fn exhaustion_step(&mut self) -> Option<StepRecord> {
        if !(self.state.is_alive && self.state.energy > 0.0) {
            self.complete = true;
            return None;
        }
        let star_id = *self.route.last()?;
        let star = self.star(star_id)?;
        self.state.energy = 0.0;
        self.state.is_alive = false;
        self.state.health = HealthTier::Dead;
        self.complete = true;
        let message = format!(
            "The mule died of exhaustion at {}; there is no energy left to continue",
            star.display_label()
        );
        Some(self.push_record(star_id, &star, StepAction::DeathByExhaustion, message))
    }

    fn travel_step(&mut self) -> Option<StepRecord> {
        let index = self.current_step;
        let previous_id = self.route[index - 1];
        let target_id = self.route[index];

        if self.graph.borrow().is_blocked(previous_id, target_id) {
            return self.reroute_step(previous_id, target_id);
        }

        let previous = self.star(previous_id)?;
        let star = self.star(target_id)?;
        let distance = self
            .graph
            .borrow()
            .edge_distance(previous_id, target_id)
            .unwrap_or_default();

        // Travel: energy drains and the traveled distance ages the
        // mule. An in-transit death skips all arrival effects.
        let travel_cost = distance * ENERGY_COST_PER_LIGHT_YEAR;
        self.state.energy -= travel_cost;
        self.state.age += distance;
        let mut message = format!(
            "Traveling from {} to {} ({distance:.2} ly); the flight drained {travel_cost:.1}% energy",
            previous.display_label(),
            star.display_label()
        );
        if self.state.energy <= 0.0 {
            message.push_str("; the mule ran out of energy mid-flight");
            return Some(self.fatal(target_id, &star, StepAction::DeathByEnergyTravel, message));
        }
        if self.state.age >= self.state.death_age {
            message.push_str(&format!(
                "; the mule died of old age at {:.2} ly",
                self.state.age
            ));
            return Some(self.fatal(target_id, &star, StepAction::DeathByAge, message));
        }

        // Arrival.
        self.state.visited.push(target_id);
        self.state.current_star = target_id;
        self.state.refresh_health();

        self.state.energy -= star.amount_of_energy;
        message.push_str(&format!(
            "; research consumed {:.1}% energy",
            star.amount_of_energy
        ));
        if self.state.energy <= 0.0 {
            message.push_str("; the mule did not survive the research");
            return Some(self.fatal(target_id, &star, StepAction::DeathByEnergyResearch, message));
        }

        let life_change = star.life_adjustment();
        self.state.death_age += life_change;
        if life_change != 0.0 {
            let verb = if life_change > 0.0 { "extended" } else { "shortened" };
            message.push_str(&format!(
                "; research {verb} the lifespan by {:.2} ly",
                life_change.abs()
            ));
        }

        let mut action = StepAction::Travel;
        if self.state.energy < EAT_TRIGGER_ENERGY && self.state.grass > 0.0 {
            // The gain rate follows the tier at the post-research
            // energy, not any earlier snapshot.
            self.state.refresh_health();
            let (gained, eaten) = graze(self.state.energy, self.state.grass);
            self.state.energy += gained;
            self.state.grass -= eaten;
            message.push_str(&format!(
                "; grazed {eaten:.2} kg of grass for {gained:.1}% energy"
            ));
            action = StepAction::EatAndResearch;
        }

        self.state.refresh_health();
        if self.state.energy <= 0.0 {
            message.push_str("; the mule ran out of energy");
            return Some(self.fatal(target_id, &star, StepAction::DeathByEnergy, message));
        }

        if star.hypergiant && self.state.is_alive {
            self.state.energy = (self.state.energy * HYPERGIANT_ENERGY_FACTOR).min(ENERGY_MAX);
            self.state.grass *= HYPERGIANT_GRASS_FACTOR;
            message.push_str(&format!(
                "; hypergiant flare recharged energy to {:.1}% and doubled the grass",
                self.state.energy
            ));
            action = StepAction::HypergiantBoost;
        }

        let record = self.push_record(target_id, &star, action, message);
        self.current_step += 1;
        if self.current_step >= self.route.len() && !(self.state.is_alive && self.state.energy > 0.0)
        {
            self.complete = true;
        }
        Some(record)
    }

    /// The upcoming edge is blocked: splice a fresh shortest path to
    /// the route's final star onto the visited prefix, or declare the
    /// traveler trapped. The step index does not move either way.
    fn reroute_step(&mut self, previous_id: StarId, target_id: StarId) -> Option<StepRecord> {
        let previous = self.star(previous_id)?;
        let destination = *self.route.last()?;
        let (path, total) = self.graph.borrow().shortest_path(previous_id, destination);
        if path.is_empty() {
            let message = format!(
                "The passage from {} is blocked and no detour exists; the mule is trapped",
                previous.display_label()
            );
            return Some(self.fatal(
                previous_id,
                &previous,
                StepAction::DeathByBlockedPath,
                message,
            ));
        }
        log::debug!(
            "edge {previous_id}-{target_id} blocked, rerouting through {} stops ({total:.2} ly)",
            path.len() - 1
        );
        self.route.truncate(self.current_step);
        self.route.extend_from_slice(&path[1..]);
        let message = format!(
            "The passage from {} is blocked; recalculated a detour of {} stops over {total:.2} ly",
            previous.display_label(),
            path.len() - 1
        );
        Some(self.push_record(previous_id, &previous, StepAction::RouteRecalculated, message))
    }

    fn fatal(
        &mut self,
        star_id: StarId,
        star: &Star,
        action: StepAction,
        message: String,
    ) -> StepRecord {
        if self.state.energy < 0.0 {
            self.state.energy = 0.0;
        }
        self.state.is_alive = false;
        self.state.health = HealthTier::Dead;
        self.complete = true;
        self.push_record(star_id, star, action, message)
    }

    fn push_record(
        &mut self,
        star_id: StarId,
        star: &Star,
        action: StepAction,
        message: String,
    ) -> StepRecord {
        let record = StepRecord {
            step: self.current_step,
            star: star_id,
            star_label: star.display_label(),
            state: self.state.clone(),
            action,
            message,
        };
        self.log.push(record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use crate::data::{Constellation, ConstellationData, Coordinates, StarLink};

    fn star(id: StarId, links: &[(StarId, f64)], research: f64, hypergiant: bool) -> Star {
        Star {
            id,
            name: None,
            label: Some(format!("S{id}")),
            linked_to: links
                .iter()
                .map(|&(star_id, distance)| StarLink { star_id, distance })
                .collect(),
            radius: 1.0,
            time_to_eat: 1.0,
            amount_of_energy: research,
            coordinates: Coordinates::default(),
            hypergiant,
            life_years_gained: 0.0,
            life_years_lost: 0.0,
        }
    }

    fn journey(
        stars: Vec<Star>,
        route: Vec<StarId>,
        energy: f64,
        grass: f64,
        death_age: f64,
    ) -> Journey {
        let data = ConstellationData {
            constellations: vec![Constellation {
                name: "Test".into(),
                stars,
            }],
            initial_energy: energy,
            initial_health: HealthTier::from_energy(energy),
            grass,
            number: 0,
            start_age: 0.0,
            death_age,
        };
        let graph = Rc::new(RefCell::new(StarGraph::from_description(&data)));
        let state = MuleState::from_description(&data, route[0]);
        Journey::new(graph, route, state).unwrap()
    }

    #[test]
    fn construction_rejects_bad_routes() {
        let data = ConstellationData {
            constellations: vec![Constellation {
                name: "Solo".into(),
                stars: vec![star(1, &[], 0.0, false)],
            }],
            initial_energy: 100.0,
            initial_health: HealthTier::Excellent,
            grass: 0.0,
            number: 0,
            start_age: 0.0,
            death_age: 100.0,
        };
        let graph = Rc::new(RefCell::new(StarGraph::from_description(&data)));
        let state = MuleState::from_description(&data, 1);
        assert_eq!(
            Journey::new(graph.clone(), Vec::new(), state.clone()).unwrap_err(),
            CoreError::EmptyRoute
        );
        assert_eq!(
            Journey::new(graph, vec![1, 9], state).unwrap_err(),
            CoreError::UnknownStar(9)
        );
    }

    #[test]
    fn start_step_has_no_resource_deltas() {
        let mut journey = journey(
            vec![star(1, &[(2, 5.0)], 0.0, false), star(2, &[(1, 5.0)], 0.0, false)],
            vec![1, 2],
            80.0,
            3.0,
            100.0,
        );
        let step = journey.advance().unwrap();
        assert_eq!(step.action, StepAction::Start);
        assert_eq!(step.star, 1);
        assert!((step.state.energy - 80.0).abs() < FLOAT_EPSILON);
        assert!((step.state.grass - 3.0).abs() < FLOAT_EPSILON);
        assert!(step.state.age.abs() < FLOAT_EPSILON);
        assert_eq!(step.state.visited.as_slice(), [1]);
    }

    #[test]
    fn hypergiant_boost_caps_energy_and_doubles_grass() {
        // Arrive at the hypergiant with exactly 80 energy and 10 kg.
        let mut journey = journey(
            vec![
                star(1, &[(2, 5.0)], 0.0, false),
                star(2, &[(1, 5.0)], 0.0, true),
            ],
            vec![1, 2],
            80.5,
            10.0,
            1000.0,
        );
        journey.advance();
        let step = journey.advance().unwrap();
        assert_eq!(step.action, StepAction::HypergiantBoost);
        assert!((step.state.energy - 100.0).abs() < FLOAT_EPSILON);
        assert!((step.state.grass - 20.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn in_transit_energy_death_skips_arrival_effects() {
        // 1.0 energy cannot cover a 20 ly flight.
        let mut journey = journey(
            vec![
                star(1, &[(2, 20.0)], 0.0, false),
                star(2, &[(1, 20.0)], 50.0, false),
            ],
            vec![1, 2],
            1.0,
            5.0,
            1000.0,
        );
        journey.advance();
        let step = journey.advance().unwrap();
        assert_eq!(step.action, StepAction::DeathByEnergyTravel);
        assert!(step.state.energy.abs() < FLOAT_EPSILON);
        assert!(!step.state.is_alive);
        // Arrival never happened: grass untouched, star not visited.
        assert!((step.state.grass - 5.0).abs() < FLOAT_EPSILON);
        assert_eq!(step.state.visited.as_slice(), [1]);
        assert!(journey.advance().is_none());
    }

    #[test]
    fn life_adjustment_shifts_death_threshold() {
        let mut longevity = star(2, &[(1, 5.0)], 0.0, false);
        longevity.life_years_gained = 40.0;
        longevity.life_years_lost = 10.0;
        let mut journey = journey(
            vec![star(1, &[(2, 5.0)], 0.0, false), longevity],
            vec![1, 2],
            100.0,
            0.0,
            100.0,
        );
        journey.advance();
        let step = journey.advance().unwrap();
        assert!((step.state.death_age - 130.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn summary_is_available_before_any_step() {
        let journey = journey(
            vec![star(1, &[(2, 5.0)], 0.0, false), star(2, &[(1, 5.0)], 0.0, false)],
            vec![1, 2],
            60.0,
            2.0,
            100.0,
        );
        let summary = journey.summary();
        assert_eq!(summary.total_steps, 0);
        assert_eq!(summary.stars_visited, 0);
        assert!(summary.is_alive);
        assert!((summary.remaining_life - 100.0).abs() < FLOAT_EPSILON);
    }
}
