//! Route optimization over an immutable snapshot of the traveler's
//! initial resources.
//!
//! Two independent strategies share one per-edge cost model: an
//! exhaustive maximizer (visit as many distinct stars as possible
//! before dying) and a cost-bounded selector (pure shortest path to a
//! destination, or a conservative greedy walk that stops before
//! resources run critically low).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::{
    ENERGY_COST_PER_LIGHT_YEAR, EAT_TRIGGER_ENERGY, GREEDY_ENERGY_FLOOR, GREEDY_STEP_COST_RATIO,
    MAX_KG_PER_STOP,
};
use crate::data::{Star, StarId};
use crate::graph::StarGraph;
use crate::state::{HealthTier, MuleState};

/// Terminal condition a planned route ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeathCause {
    /// Accumulated distance reached the death threshold.
    Age,
    /// Energy reached zero.
    Energy,
}

/// Aggregate outcome of a planned route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    pub stars_visited: usize,
    pub total_distance: f64,
    /// Travel plus research energy, gross of grazing gains.
    pub total_energy_consumed: f64,
    pub total_grass_consumed: f64,
    pub final_energy: f64,
    pub final_age: f64,
    pub final_grass: f64,
    pub is_alive: bool,
    pub cause_of_death: Option<DeathCause>,
    /// Destination mode only.
    pub destination_reached: Option<bool>,
}

/// A computed route with its statistics. An empty route signals a
/// failed request (unknown origin), never a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub route: Vec<StarId>,
    pub stats: RouteStats,
}

impl PlannedRoute {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }
}

/// Grazing at the current stop: energy gained and kg eaten, under the
/// one-kg-per-stop ceiling and the remaining supply. The gain rate is
/// derived from the tier at the *current* (post-research) energy.
pub(crate) fn graze(energy: f64, grass: f64) -> (f64, f64) {
    if energy >= EAT_TRIGGER_ENERGY || grass <= 0.0 {
        return (0.0, 0.0);
    }
    let rate = HealthTier::from_energy(energy).energy_gain_per_kg();
    if rate <= 0.0 {
        return (0.0, 0.0);
    }
    let desired = (EAT_TRIGGER_ENERGY - energy) / rate;
    let kg = desired.min(MAX_KG_PER_STOP).min(grass);
    (kg * rate, kg)
}

/// Resource effect of traversing one edge and stopping at its far star.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgeOutcome {
    energy: f64,
    age: f64,
    grass: f64,
    travel_cost: f64,
    research_cost: f64,
    energy_gained: f64,
    grass_eaten: f64,
}

/// Evaluate one candidate traversal. `None` means the step is
/// infeasible: the traveler would cross the death threshold, or energy
/// would hit zero after travel or after research-plus-grazing.
fn evaluate_edge(
    star: &Star,
    distance: f64,
    energy: f64,
    age: f64,
    grass: f64,
    death_age: f64,
) -> Option<EdgeOutcome> {
    let new_age = age + distance;
    if new_age >= death_age {
        return None;
    }
    let travel_cost = distance * ENERGY_COST_PER_LIGHT_YEAR;
    let after_travel = energy - travel_cost;
    if after_travel <= 0.0 {
        return None;
    }
    let after_research = after_travel - star.amount_of_energy;
    let (energy_gained, grass_eaten) = graze(after_research, grass);
    let final_energy = after_research + energy_gained;
    if final_energy <= 0.0 {
        return None;
    }
    Some(EdgeOutcome {
        energy: final_energy,
        age: new_age,
        grass: grass - grass_eaten,
        travel_cost,
        research_cost: star.amount_of_energy,
        energy_gained,
        grass_eaten,
    })
}

/// Running resource totals threaded through a search.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
    energy: f64,
    age: f64,
    grass: f64,
    distance: f64,
    energy_spent: f64,
    grass_eaten: f64,
}

impl Cursor {
    fn initial(start: &MuleState) -> Self {
        Self {
            energy: start.energy,
            age: start.age,
            grass: start.grass,
            distance: 0.0,
            energy_spent: 0.0,
            grass_eaten: 0.0,
        }
    }

    fn advance(&self, distance: f64, outcome: &EdgeOutcome) -> Self {
        Self {
            energy: outcome.energy,
            age: outcome.age,
            grass: outcome.grass,
            distance: self.distance + distance,
            energy_spent: self.energy_spent + outcome.travel_cost + outcome.research_cost,
            grass_eaten: self.grass_eaten + outcome.grass_eaten,
        }
    }
}

/// Best branch found so far by the exhaustive search. Threaded through
/// the recursion by exclusive reference; only a strictly greater
/// distinct-star count replaces it, so the first branch found wins
/// ties.
#[derive(Debug, Clone)]
struct BestBranch {
    route: Vec<StarId>,
    cursor: Cursor,
    cause: Option<DeathCause>,
}

impl BestBranch {
    fn consider(&mut self, route: &[StarId], cursor: Cursor, cause: Option<DeathCause>) {
        if route.len() > self.route.len() {
            self.route = route.to_vec();
            self.cursor = cursor;
            self.cause = cause;
        }
    }
}

/// Planner over a graph snapshot and the traveler's initial state.
pub struct RoutePlanner<'a> {
    graph: &'a StarGraph,
    start: MuleState,
}

impl<'a> RoutePlanner<'a> {
    #[must_use]
    pub fn new(graph: &'a StarGraph, start: MuleState) -> Self {
        Self { graph, start }
    }

    /// Visit as many distinct stars as possible before death.
    ///
    /// Exhaustive depth-first search with backtracking over direct
    /// unvisited neighbors, pruned by the shared infeasibility rules.
    /// If the best branch ends with the traveler still alive, one
    /// forced extension into the nearest unvisited neighbor is
    /// committed even when fatal, so every reported result ends in a
    /// definite death or provable exhaustion of reachable stars.
    #[must_use]
    pub fn plan_maximize(&self, origin: StarId) -> PlannedRoute {
        if !self.graph.contains(origin) {
            return self.failed();
        }
        let mut visited = BTreeSet::from([origin]);
        let mut route = vec![origin];
        let mut best = BestBranch {
            route: Vec::new(),
            cursor: Cursor::initial(&self.start),
            cause: None,
        };
        self.search(
            origin,
            &mut visited,
            &mut route,
            Cursor::initial(&self.start),
            &mut best,
        );
        if best.cause.is_none() {
            self.force_terminal_extension(&mut best);
        }
        self.report(best.route, best.cursor, best.cause, None)
    }

    fn search(
        &self,
        current: StarId,
        visited: &mut BTreeSet<StarId>,
        route: &mut Vec<StarId>,
        cursor: Cursor,
        best: &mut BestBranch,
    ) {
        if cursor.age >= self.start.death_age {
            best.consider(route, cursor, Some(DeathCause::Age));
            return;
        }
        if cursor.energy <= 0.0 {
            best.consider(route, cursor, Some(DeathCause::Energy));
            return;
        }
        for (neighbor, distance) in self.graph.open_neighbors(current) {
            if visited.contains(&neighbor) {
                continue;
            }
            let Some(star) = self.graph.get_star(neighbor) else {
                continue;
            };
            let Some(outcome) = evaluate_edge(
                star,
                distance,
                cursor.energy,
                cursor.age,
                cursor.grass,
                self.start.death_age,
            ) else {
                continue;
            };
            visited.insert(neighbor);
            route.push(neighbor);
            self.search(neighbor, visited, route, cursor.advance(distance, &outcome), best);
            route.pop();
            visited.remove(&neighbor);
        }
        best.consider(route, cursor, None);
    }

    /// Push the best still-alive branch into its nearest unvisited
    /// neighbor, fatal or not. Ties in distance resolve to the lowest
    /// star id via the graph's ascending iteration order.
    fn force_terminal_extension(&self, best: &mut BestBranch) {
        let Some(&last) = best.route.last() else {
            return;
        };
        let visited: BTreeSet<StarId> = best.route.iter().copied().collect();
        let nearest = self
            .graph
            .open_neighbors(last)
            .into_iter()
            .filter(|(id, _)| !visited.contains(id))
            .reduce(|keep, candidate| if candidate.1 < keep.1 { candidate } else { keep });
        let Some((neighbor, distance)) = nearest else {
            return;
        };
        let Some(star) = self.graph.get_star(neighbor) else {
            return;
        };

        let cursor = &mut best.cursor;
        cursor.age += distance;
        cursor.distance += distance;
        let travel_cost = distance * ENERGY_COST_PER_LIGHT_YEAR;
        cursor.energy -= travel_cost;
        cursor.energy_spent += travel_cost;

        let cause = if cursor.age >= self.start.death_age {
            Some(DeathCause::Age)
        } else if cursor.energy <= 0.0 {
            Some(DeathCause::Energy)
        } else {
            cursor.energy -= star.amount_of_energy;
            cursor.energy_spent += star.amount_of_energy;
            let (gained, eaten) = graze(cursor.energy, cursor.grass);
            cursor.energy += gained;
            cursor.grass -= eaten;
            cursor.grass_eaten += eaten;
            if cursor.energy <= 0.0 {
                Some(DeathCause::Energy)
            } else {
                None
            }
        };
        best.route.push(neighbor);
        best.cause = cause;
        log::debug!(
            "forced terminal extension into star {neighbor} at {distance:.2} ly, cause {cause:?}"
        );
    }

    /// Cheapest-route selection.
    ///
    /// With a destination: pure shortest path replayed under the cost
    /// model, halting the instant the traveler dies en route. Without
    /// one: a conservative greedy walk over direct neighbors that
    /// never knowingly commits a fatal or resource-draining step.
    #[must_use]
    pub fn plan_minimize_cost(&self, origin: StarId, destination: Option<StarId>) -> PlannedRoute {
        if !self.graph.contains(origin) {
            return self.failed();
        }
        match destination {
            Some(target) => self.plan_to_destination(origin, target),
            None => self.plan_greedy(origin),
        }
    }

    fn plan_to_destination(&self, origin: StarId, destination: StarId) -> PlannedRoute {
        let (path, _) = self.graph.shortest_path(origin, destination);
        if path.is_empty() {
            let mut result = self.report(vec![origin], Cursor::initial(&self.start), None, None);
            result.stats.destination_reached = Some(false);
            return result;
        }

        let mut route = vec![origin];
        let mut cursor = Cursor::initial(&self.start);
        let mut cause = None;
        for pair in path.windows(2) {
            let next = pair[1];
            let distance = self.graph.edge_distance(pair[0], next).unwrap_or_default();
            let Some(star) = self.graph.get_star(next) else {
                break;
            };
            route.push(next);
            cursor.age += distance;
            cursor.distance += distance;
            let travel_cost = distance * ENERGY_COST_PER_LIGHT_YEAR;
            cursor.energy -= travel_cost;
            cursor.energy_spent += travel_cost;
            if cursor.energy <= 0.0 {
                cause = Some(DeathCause::Energy);
                break;
            }
            if cursor.age >= self.start.death_age {
                cause = Some(DeathCause::Age);
                break;
            }
            cursor.energy -= star.amount_of_energy;
            cursor.energy_spent += star.amount_of_energy;
            if cursor.energy <= 0.0 {
                cause = Some(DeathCause::Energy);
                break;
            }
            let (gained, eaten) = graze(cursor.energy, cursor.grass);
            cursor.energy += gained;
            cursor.grass -= eaten;
            cursor.grass_eaten += eaten;
        }
        let reached = cause.is_none() && route.last() == Some(&destination);
        self.report(route, cursor, cause, Some(reached))
    }

    fn plan_greedy(&self, origin: StarId) -> PlannedRoute {
        let mut route = vec![origin];
        let mut visited = BTreeSet::from([origin]);
        let mut cursor = Cursor::initial(&self.start);
        let mut current = origin;

        loop {
            let mut chosen: Option<(StarId, f64, EdgeOutcome, f64)> = None;
            for (neighbor, distance) in self.graph.open_neighbors(current) {
                if visited.contains(&neighbor) {
                    continue;
                }
                let Some(star) = self.graph.get_star(neighbor) else {
                    continue;
                };
                // Fatal candidates are excluded outright; this mode
                // never knowingly walks into death.
                let Some(outcome) = evaluate_edge(
                    star,
                    distance,
                    cursor.energy,
                    cursor.age,
                    cursor.grass,
                    self.start.death_age,
                ) else {
                    continue;
                };
                let score = outcome.travel_cost + outcome.research_cost - outcome.energy_gained;
                if chosen.as_ref().is_none_or(|&(_, _, _, best)| score < best) {
                    chosen = Some((neighbor, distance, outcome, score));
                }
            }
            let Some((neighbor, distance, outcome, _)) = chosen else {
                break;
            };
            // Conservative guards, armed once a traversal has been
            // committed: stop before an expensive or draining step.
            if route.len() > 1 {
                let step_cost = outcome.travel_cost + outcome.research_cost;
                if step_cost > GREEDY_STEP_COST_RATIO * cursor.energy {
                    log::debug!(
                        "greedy walk stops: step cost {step_cost:.2} exceeds \
                         {GREEDY_STEP_COST_RATIO} of energy {:.2}",
                        cursor.energy
                    );
                    break;
                }
                if outcome.energy < GREEDY_ENERGY_FLOOR {
                    log::debug!(
                        "greedy walk stops: post-step energy {:.2} under floor",
                        outcome.energy
                    );
                    break;
                }
            }
            cursor = cursor.advance(distance, &outcome);
            visited.insert(neighbor);
            route.push(neighbor);
            current = neighbor;
        }
        self.report(route, cursor, None, None)
    }

    /// Empty-route failure result for an unknown origin.
    fn failed(&self) -> PlannedRoute {
        self.report(Vec::new(), Cursor::initial(&self.start), None, None)
    }

    fn report(
        &self,
        route: Vec<StarId>,
        cursor: Cursor,
        cause: Option<DeathCause>,
        destination_reached: Option<bool>,
    ) -> PlannedRoute {
        let stats = RouteStats {
            stars_visited: route.len(),
            total_distance: cursor.distance,
            total_energy_consumed: cursor.energy_spent,
            total_grass_consumed: cursor.grass_eaten,
            final_energy: cursor.energy.max(0.0),
            final_age: cursor.age,
            final_grass: cursor.grass,
            is_alive: cause.is_none(),
            cause_of_death: cause,
            destination_reached,
        };
        PlannedRoute { route, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use crate::data::{Constellation, ConstellationData, Coordinates, StarLink};

    fn star(id: StarId, links: &[(StarId, f64)], research: f64) -> Star {
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
            hypergiant: false,
            life_years_gained: 0.0,
            life_years_lost: 0.0,
        }
    }

    fn description(stars: Vec<Star>, energy: f64, grass: f64, death_age: f64) -> ConstellationData {
        ConstellationData {
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
        }
    }

    fn planner_parts(data: &ConstellationData, origin: StarId) -> (StarGraph, MuleState) {
        let graph = StarGraph::from_description(data);
        let start = MuleState::from_description(data, origin);
        (graph, start)
    }

    #[test]
    fn graze_respects_per_stop_ceiling() {
        // Energy 40 at tier poor gains 2.0/kg; reaching 50 would need
        // 5 kg but only one fits per stop.
        let (gained, eaten) = graze(40.0, 10.0);
        assert!((eaten - 1.0).abs() < FLOAT_EPSILON);
        assert!((gained - 2.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn graze_limited_by_supply() {
        let (gained, eaten) = graze(49.0, 0.1);
        assert!((eaten - 0.1).abs() < FLOAT_EPSILON);
        assert!((gained - 0.3).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn graze_skipped_above_trigger() {
        assert_eq!(graze(50.0, 10.0), (0.0, 0.0));
        assert_eq!(graze(80.0, 10.0), (0.0, 0.0));
    }

    #[test]
    fn edge_infeasible_when_age_crosses_threshold() {
        let star = star(2, &[], 0.0);
        assert!(evaluate_edge(&star, 10.0, 100.0, 95.0, 0.0, 100.0).is_none());
        assert!(evaluate_edge(&star, 10.0, 100.0, 80.0, 0.0, 100.0).is_some());
    }

    #[test]
    fn edge_infeasible_when_energy_exhausted_by_travel() {
        let star = star(2, &[], 0.0);
        assert!(evaluate_edge(&star, 50.0, 5.0, 0.0, 0.0, 1000.0).is_none());
    }

    #[test]
    fn grazing_can_rescue_a_research_heavy_stop() {
        // 10 energy - 1 travel - 9.5 research = -0.5, but the tier at
        // -0.5 is dead, so no rescue is possible.
        let dead_stop = star(2, &[], 9.5);
        assert!(evaluate_edge(&dead_stop, 10.0, 10.0, 0.0, 5.0, 1000.0).is_none());
        // 10 - 1 - 8 = 1.0 at tier critical gains 1.0/kg for one kg.
        let close_stop = star(2, &[], 8.0);
        let outcome = evaluate_edge(&close_stop, 10.0, 10.0, 0.0, 5.0, 1000.0).unwrap();
        assert!((outcome.energy - 2.0).abs() < FLOAT_EPSILON);
        assert!((outcome.grass_eaten - 1.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn maximize_fails_cleanly_for_unknown_origin() {
        let data = description(vec![star(1, &[], 0.0)], 100.0, 0.0, 100.0);
        let (graph, start) = planner_parts(&data, 1);
        let plan = RoutePlanner::new(&graph, start).plan_maximize(77);
        assert!(plan.is_empty());
        assert_eq!(plan.stats.stars_visited, 0);
    }

    #[test]
    fn maximize_explores_branch_with_more_stars() {
        // 1 branches to a dead end (2) and a two-star arm (3, 4).
        let data = description(
            vec![
                star(1, &[(2, 1.0), (3, 1.0)], 0.0),
                star(2, &[(1, 1.0)], 0.0),
                star(3, &[(1, 1.0), (4, 1.0)], 0.0),
                star(4, &[(3, 1.0)], 0.0),
            ],
            100.0,
            0.0,
            1000.0,
        );
        let (graph, start) = planner_parts(&data, 1);
        let plan = RoutePlanner::new(&graph, start).plan_maximize(1);
        assert_eq!(plan.route, vec![1, 3, 4]);
        // Forced extension has nowhere to go from 4; traveler survives.
        assert!(plan.stats.is_alive);
        assert_eq!(plan.stats.cause_of_death, None);
    }

    #[test]
    fn maximize_forces_fatal_extension_when_still_alive() {
        // Visiting 2 is feasible; the only onward star 3 kills by age,
        // so the search stops at 2 alive and the forced extension
        // commits the fatal hop.
        let data = description(
            vec![
                star(1, &[(2, 10.0)], 0.0),
                star(2, &[(1, 10.0), (3, 50.0)], 0.0),
                star(3, &[(2, 50.0)], 0.0),
            ],
            100.0,
            0.0,
            30.0,
        );
        let (graph, start) = planner_parts(&data, 1);
        let plan = RoutePlanner::new(&graph, start).plan_maximize(1);
        assert_eq!(plan.route, vec![1, 2, 3]);
        assert!(!plan.stats.is_alive);
        assert_eq!(plan.stats.cause_of_death, Some(DeathCause::Age));
        assert!((plan.stats.final_age - 60.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn greedy_prefers_cheaper_step() {
        let data = description(
            vec![
                star(1, &[(2, 10.0), (3, 4.0)], 0.0),
                star(2, &[(1, 10.0)], 0.0),
                star(3, &[(1, 4.0)], 0.0),
            ],
            100.0,
            0.0,
            1000.0,
        );
        let (graph, start) = planner_parts(&data, 1);
        let plan = RoutePlanner::new(&graph, start).plan_minimize_cost(1, None);
        assert_eq!(plan.route[1], 3);
        assert!(plan.stats.is_alive);
    }

    #[test]
    fn greedy_guard_stops_expensive_second_step() {
        // First hop is cheap. The second costs 32.3 energy, above 30%
        // of the ~99.7 remaining.
        let data = description(
            vec![
                star(1, &[(2, 3.0)], 0.0),
                star(2, &[(1, 3.0), (3, 3.0)], 0.0),
                star(3, &[(2, 3.0)], 32.0),
            ],
            100.0,
            0.0,
            1000.0,
        );
        let (graph, start) = planner_parts(&data, 1);
        let plan = RoutePlanner::new(&graph, start).plan_minimize_cost(1, None);
        assert_eq!(plan.route, vec![1, 2]);
        assert!(plan.stats.is_alive);
        assert_eq!(plan.stats.cause_of_death, None);
    }

    #[test]
    fn greedy_floor_guard_protects_reserves() {
        // Second hop would land at 24 energy, under the 25 floor.
        let data = description(
            vec![
                star(1, &[(2, 10.0)], 0.0),
                star(2, &[(1, 10.0), (3, 10.0)], 4.0),
                star(3, &[(2, 10.0)], 0.0),
            ],
            30.0,
            0.0,
            1000.0,
        );
        let (graph, start) = planner_parts(&data, 1);
        let plan = RoutePlanner::new(&graph, start).plan_minimize_cost(1, None);
        assert_eq!(plan.route, vec![1, 2]);
        assert!(plan.stats.is_alive);
    }
}
