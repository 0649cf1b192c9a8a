//! Road connectivity graph
//!
//! Routes are ordered road sequences, so the natural graph has one node per
//! road and an edge wherever one road's end point meets another road's start
//! point. Built on demand at construction time to validate generator routes
//! and to search for a route between two roads.

use std::collections::HashMap;

use anyhow::{bail, Result};
use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::road::Road;
use super::types::RoadId;

/// Distance within which two road endpoints count as the same junction
const SNAP_DISTANCE: f64 = 1e-3;

/// Directed graph of road-to-road connectivity
pub struct RoadNetwork {
    graph: DiGraph<RoadId, OrderedFloat<f64>>,
    road_to_node: HashMap<RoadId, NodeIndex>,
}

impl RoadNetwork {
    /// Build the connectivity graph for the given roads. Edge weights are
    /// the successor road's length, so a shortest route minimizes driven
    /// distance past the first road.
    pub fn from_roads(roads: &[Road]) -> Self {
        let mut graph = DiGraph::new();
        let mut road_to_node = HashMap::new();

        for i in 0..roads.len() {
            let id = RoadId(i);
            let node = graph.add_node(id);
            road_to_node.insert(id, node);
        }

        for (i, from) in roads.iter().enumerate() {
            for (j, to) in roads.iter().enumerate() {
                if i == j {
                    continue;
                }
                if from.end.distance(&to.start) <= SNAP_DISTANCE {
                    graph.add_edge(
                        road_to_node[&RoadId(i)],
                        road_to_node[&RoadId(j)],
                        OrderedFloat(to.length),
                    );
                }
            }
        }

        Self { graph, road_to_node }
    }

    /// Whether `to` starts where `from` ends
    pub fn are_linked(&self, from: RoadId, to: RoadId) -> bool {
        match (self.road_to_node.get(&from), self.road_to_node.get(&to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    /// Reject routes that reference unknown roads or chain roads whose
    /// endpoints do not meet
    pub fn validate_route(&self, route: &[RoadId], road_count: usize) -> Result<()> {
        if route.is_empty() {
            bail!("route must not be empty");
        }
        for id in route {
            if id.0 >= road_count {
                bail!("route references road {} but only {} roads exist", id.0, road_count);
            }
        }
        for pair in route.windows(2) {
            if !self.are_linked(pair[0], pair[1]) {
                bail!(
                    "route roads {} and {} are not connected end-to-start",
                    pair[0].0,
                    pair[1].0
                );
            }
        }
        Ok(())
    }

    /// Shortest chain of connected roads from `from` to `to`, inclusive of
    /// both endpoints. Dijkstra via A* with a null heuristic.
    pub fn find_route(&self, from: RoadId, to: RoadId) -> Option<Vec<RoadId>> {
        let start = *self.road_to_node.get(&from)?;
        let goal = *self.road_to_node.get(&to)?;

        let (_, node_path) = astar(
            &self.graph,
            start,
            |node| node == goal,
            |edge| *edge.weight(),
            |_| OrderedFloat(0.0),
        )?;

        Some(node_path.iter().map(|n| self.graph[*n]).collect())
    }
}
