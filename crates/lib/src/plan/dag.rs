//! Dependency graph over build descriptors.
//!
//! Nodes are descriptors, edges run from a dependency to its dependent. Layers
//! are computed with Kahn's algorithm: every node in layer N depends only on
//! nodes in layers before N.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::descriptor::BuildDescriptor;

/// A DAG of descriptors, indexed by input position.
///
/// Node indices are assigned in input order, so `NodeIndex::index()` is the
/// descriptor's position in the slice the graph was built from.
pub struct DeploymentDag<'a> {
  graph: DiGraph<&'a BuildDescriptor, ()>,
}

impl<'a> DeploymentDag<'a> {
  /// Build the graph. Dependencies outside `descriptors` add no edge.
  pub fn new(descriptors: &[&'a BuildDescriptor]) -> Self {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for descriptor in descriptors {
      let idx = graph.add_node(*descriptor);
      nodes.insert(descriptor.deployment_name.as_str(), idx);
    }

    for (position, descriptor) in descriptors.iter().enumerate() {
      let dependent = NodeIndex::new(position);
      for dependency in descriptor.dependencies() {
        if let Some(&dep_idx) = nodes.get(dependency.as_str()) {
          graph.add_edge(dep_idx, dependent, ());
        }
      }
    }

    Self { graph }
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Every descriptor that sits on a cycle, in input order.
  ///
  /// Members of a strongly connected component with more than one node, plus
  /// nodes that depend on themselves.
  pub fn cycle_members(&self) -> Vec<&'a BuildDescriptor> {
    let mut members: Vec<NodeIndex> = tarjan_scc(&self.graph)
      .into_iter()
      .filter(|scc| scc.len() > 1 || scc.iter().any(|&n| self.graph.contains_edge(n, n)))
      .flatten()
      .collect();
    members.sort();

    members.into_iter().map(|idx| self.graph[idx]).collect()
  }

  /// Kahn layers. Within a layer, descriptors keep input order.
  ///
  /// Returns `None` if the graph has a cycle.
  pub fn layers(&self) -> Option<Vec<Vec<&'a BuildDescriptor>>> {
    let mut in_degree: Vec<usize> = self
      .graph
      .node_indices()
      .map(|idx| self.graph.neighbors_directed(idx, Direction::Incoming).count())
      .collect();
    let mut placed = vec![false; self.len()];
    let mut remaining = self.len();
    let mut layers = Vec::new();

    while remaining > 0 {
      let ready: Vec<NodeIndex> = self
        .graph
        .node_indices()
        .filter(|idx| !placed[idx.index()] && in_degree[idx.index()] == 0)
        .collect();

      if ready.is_empty() {
        return None;
      }

      for &idx in &ready {
        placed[idx.index()] = true;
        remaining -= 1;

        for edge_target in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          in_degree[edge_target.index()] = in_degree[edge_target.index()].saturating_sub(1);
        }
      }

      layers.push(ready.into_iter().map(|idx| self.graph[idx]).collect());
    }

    Some(layers)
  }
}
