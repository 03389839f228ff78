//! Astromule Engine
//!
//! Platform-agnostic route planning and journey simulation for the
//! Astromule expedition. This crate holds all graph, planning, and
//! replay logic without any web or presentation dependencies: the host
//! layer hands over an already-validated constellation description and
//! receives plain routes, statistics, and step records back.

pub mod constants;
pub mod data;
pub mod graph;
pub mod planner;
pub mod simulation;
pub mod state;

// Re-export commonly used types
pub use data::{
    Constellation, ConstellationData, ConstellationStats, Coordinates, DescriptionStats, Star,
    StarId, StarLink,
};
pub use graph::{NO_PATH, StarGraph};
pub use planner::{DeathCause, PlannedRoute, RoutePlanner, RouteStats};
pub use simulation::{Journey, JourneySummary, StepAction, StepRecord};
pub use state::{HealthTier, MuleState, VisitedList};

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Contract violations surfaced to the host. Domain outcomes - death,
/// unreachability, infeasibility - are ordinary results, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown star id {0}")]
    UnknownStar(StarId),
    #[error("a journey requires a non-empty route")]
    EmptyRoute,
}

/// One loaded expedition: the graph built from a description plus the
/// initial resource values every run starts from.
///
/// The graph handle is shared single-threaded with running journeys;
/// blocking mutations must happen strictly between simulation steps.
#[derive(Debug, Clone)]
pub struct Expedition {
    graph: Rc<RefCell<StarGraph>>,
    description: ConstellationData,
}

impl Expedition {
    /// Build the expedition from an already-validated description.
    #[must_use]
    pub fn new(description: ConstellationData) -> Self {
        let graph = Rc::new(RefCell::new(StarGraph::from_description(&description)));
        Self { graph, description }
    }

    /// Shared handle to the underlying graph.
    #[must_use]
    pub fn graph(&self) -> Rc<RefCell<StarGraph>> {
        Rc::clone(&self.graph)
    }

    #[must_use]
    pub fn description(&self) -> &ConstellationData {
        &self.description
    }

    /// Fresh resource state at `origin` for a new run.
    #[must_use]
    pub fn initial_state(&self, origin: StarId) -> MuleState {
        MuleState::from_description(&self.description, origin)
    }

    /// Plan the route visiting as many stars as possible before death.
    /// Unknown origins yield an empty route, never a panic.
    #[must_use]
    pub fn plan_maximize(&self, origin: StarId) -> PlannedRoute {
        let graph = self.graph.borrow();
        RoutePlanner::new(&graph, self.initial_state(origin)).plan_maximize(origin)
    }

    /// Plan the cheapest route, either to a destination or open-ended.
    #[must_use]
    pub fn plan_minimize_cost(&self, origin: StarId, destination: Option<StarId>) -> PlannedRoute {
        let graph = self.graph.borrow();
        RoutePlanner::new(&graph, self.initial_state(origin)).plan_minimize_cost(origin, destination)
    }

    /// Start a stepwise replay of a computed route.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty route or one that references
    /// unknown stars.
    pub fn start_journey(&self, route: Vec<StarId>) -> Result<Journey, CoreError> {
        let origin = route.first().copied().ok_or(CoreError::EmptyRoute)?;
        Journey::new(self.graph(), route, self.initial_state(origin))
    }

    /// Block the `a`-`b` passage in both directions.
    pub fn block(&self, a: StarId, b: StarId) {
        self.graph.borrow_mut().block(a, b);
    }

    /// Reopen the `a`-`b` passage.
    pub fn unblock(&self, a: StarId, b: StarId) {
        self.graph.borrow_mut().unblock(a, b);
    }

    #[must_use]
    pub fn is_blocked(&self, a: StarId, b: StarId) -> bool {
        self.graph.borrow().is_blocked(a, b)
    }

    #[must_use]
    pub fn blocked_pairs(&self) -> Vec<(StarId, StarId)> {
        self.graph.borrow().blocked_pairs()
    }

    /// Update a star's research life-adjustment values before a run.
    pub fn set_life_effects(&self, star: StarId, gained: f64, lost: f64) -> bool {
        self.graph.borrow_mut().set_life_effects(star, gained, lost)
    }
}
