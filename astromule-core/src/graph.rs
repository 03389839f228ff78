//! Star graph construction, dynamic edge blocking, and shortest paths.
//!
//! The graph is built once per loaded description and is read-mostly
//! afterwards. Blocked edges are tracked in a separate pair set that is
//! consulted at every traversal and path query; edges are never removed
//! from the adjacency itself, so unblocking restores the exact
//! pre-block topology.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::data::{ConstellationData, Star, StarId};

/// Sentinel distance returned when no path exists.
pub const NO_PATH: f64 = f64::INFINITY;

/// Undirected weighted graph over the stars of a loaded description.
///
/// All maps are keyed in ascending star id order, which fixes the
/// iteration order every "first seen wins" selection relies on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StarGraph {
    stars: BTreeMap<StarId, Star>,
    adjacency: BTreeMap<StarId, BTreeMap<StarId, f64>>,
    memberships: BTreeMap<StarId, Vec<String>>,
    blocked: BTreeSet<(StarId, StarId)>,
}

impl StarGraph {
    /// Build the graph from an already-validated description.
    ///
    /// Duplicate edge declarations (within or across constellations)
    /// merge by keeping the minimum distance, regardless of the order
    /// the declarations appear in.
    #[must_use]
    pub fn from_description(data: &ConstellationData) -> Self {
        let mut graph = Self::default();
        for constellation in &data.constellations {
            for star in &constellation.stars {
                graph
                    .memberships
                    .entry(star.id)
                    .or_default()
                    .push(constellation.name.clone());
                graph.stars.entry(star.id).or_insert_with(|| star.clone());
                graph.adjacency.entry(star.id).or_default();
            }
        }
        for constellation in &data.constellations {
            for star in &constellation.stars {
                for link in &star.linked_to {
                    graph.insert_edge(star.id, link.star_id, link.distance);
                }
            }
        }
        graph
    }

    fn insert_edge(&mut self, a: StarId, b: StarId, distance: f64) {
        for (from, to) in [(a, b), (b, a)] {
            let slot = self.adjacency.entry(from).or_default().entry(to);
            slot.and_modify(|current| {
                if distance < *current {
                    *current = distance;
                }
            })
            .or_insert(distance);
        }
    }

    #[must_use]
    pub fn contains(&self, id: StarId) -> bool {
        self.stars.contains_key(&id)
    }

    #[must_use]
    pub fn get_star(&self, id: StarId) -> Option<&Star> {
        self.stars.get(&id)
    }

    /// Update a star's research life-adjustment values. Returns false
    /// when the star is unknown.
    pub fn set_life_effects(&mut self, id: StarId, gained: f64, lost: f64) -> bool {
        match self.stars.get_mut(&id) {
            Some(star) => {
                star.life_years_gained = gained;
                star.life_years_lost = lost;
                true
            }
            None => false,
        }
    }

    /// All neighbors with their distances, blocked edges included.
    /// Empty for unknown or isolated stars.
    #[must_use]
    pub fn neighbors(&self, id: StarId) -> Vec<(StarId, f64)> {
        self.adjacency
            .get(&id)
            .map(|edges| edges.iter().map(|(&to, &d)| (to, d)).collect())
            .unwrap_or_default()
    }

    /// Neighbors reachable right now: pairs currently blocked are
    /// excluded.
    #[must_use]
    pub fn open_neighbors(&self, id: StarId) -> Vec<(StarId, f64)> {
        self.adjacency
            .get(&id)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|&(&to, _)| !self.blocked.contains(&(id, to)))
                    .map(|(&to, &d)| (to, d))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct edge weight between two stars, if one exists.
    #[must_use]
    pub fn edge_distance(&self, a: StarId, b: StarId) -> Option<f64> {
        self.adjacency.get(&a).and_then(|edges| edges.get(&b)).copied()
    }

    /// Dijkstra over edge weights, excluding currently blocked pairs.
    ///
    /// Returns `(path, total_distance)`; unreachable or unknown
    /// endpoints yield `(vec![], NO_PATH)`. The result is a pure
    /// function of the graph and the blocked set at call time.
    #[must_use]
    pub fn shortest_path(&self, source: StarId, target: StarId) -> (Vec<StarId>, f64) {
        if !self.contains(source) || !self.contains(target) {
            return (Vec::new(), NO_PATH);
        }
        if source == target {
            return (vec![source], 0.0);
        }

        let mut dist: BTreeMap<StarId, f64> = BTreeMap::new();
        let mut prev: BTreeMap<StarId, StarId> = BTreeMap::new();
        let mut heap = BinaryHeap::new();
        dist.insert(source, 0.0);
        heap.push(HeapEntry {
            dist: 0.0,
            star: source,
        });

        while let Some(HeapEntry { dist: d, star }) = heap.pop() {
            if star == target {
                break;
            }
            if dist.get(&star).is_some_and(|&best| d > best) {
                continue;
            }
            for (next, weight) in self.open_neighbors(star) {
                let candidate = d + weight;
                if dist.get(&next).is_none_or(|&best| candidate < best) {
                    dist.insert(next, candidate);
                    prev.insert(next, star);
                    heap.push(HeapEntry {
                        dist: candidate,
                        star: next,
                    });
                }
            }
        }

        let Some(&total) = dist.get(&target) else {
            return (Vec::new(), NO_PATH);
        };
        let mut path = vec![target];
        let mut cursor = target;
        while let Some(&before) = prev.get(&cursor) {
            path.push(before);
            cursor = before;
        }
        path.reverse();
        (path, total)
    }

    /// Block traversal of the `a`-`b` edge in both directions.
    /// Idempotent; unknown pairs are tolerated.
    pub fn block(&mut self, a: StarId, b: StarId) {
        self.blocked.insert((a, b));
        self.blocked.insert((b, a));
    }

    /// Remove a block in both directions. Idempotent.
    pub fn unblock(&mut self, a: StarId, b: StarId) {
        self.blocked.remove(&(a, b));
        self.blocked.remove(&(b, a));
    }

    #[must_use]
    pub fn is_blocked(&self, a: StarId, b: StarId) -> bool {
        self.blocked.contains(&(a, b))
    }

    /// Currently blocked pairs, each unordered pair reported once.
    #[must_use]
    pub fn blocked_pairs(&self) -> Vec<(StarId, StarId)> {
        self.blocked
            .iter()
            .filter(|(a, b)| a <= b)
            .copied()
            .collect()
    }

    /// All star ids in ascending order.
    #[must_use]
    pub fn star_ids(&self) -> Vec<StarId> {
        self.stars.keys().copied().collect()
    }

    #[must_use]
    pub fn hypergiant_ids(&self) -> Vec<StarId> {
        self.stars
            .values()
            .filter(|star| star.hypergiant)
            .map(|star| star.id)
            .collect()
    }

    /// Stars that belong to more than one constellation.
    #[must_use]
    pub fn shared_star_ids(&self) -> Vec<StarId> {
        self.memberships
            .iter()
            .filter(|(_, names)| names.len() > 1)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Names of the constellations containing a star.
    #[must_use]
    pub fn constellations_of(&self, id: StarId) -> &[String] {
        self.memberships.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Whether every star can reach every other star, ignoring blocks.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let Some(&start) = self.stars.keys().next() else {
            return true;
        };
        let mut seen = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(star) = stack.pop() {
            for (next, _) in self.neighbors(star) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen.len() == self.stars.len()
    }

    /// Total distance along consecutive direct edges of a route.
    /// Missing edges contribute nothing.
    #[must_use]
    pub fn route_distance(&self, route: &[StarId]) -> f64 {
        route
            .windows(2)
            .filter_map(|pair| self.edge_distance(pair[0], pair[1]))
            .sum()
    }
}

/// Min-heap entry for Dijkstra; ordering is reversed so the smallest
/// tentative distance pops first, with the star id as a stable
/// tie-break.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    dist: f64,
    star: StarId,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.star.cmp(&self.star))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
