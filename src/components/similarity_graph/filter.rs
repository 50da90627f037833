use log::debug;

use super::types::{GraphEdge, GraphNode};

/// A named visibility predicate. Installing one replaces any filter with the same name.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
	/// Hide edges smaller than the threshold.
	MinEdgeSize(f64),
	/// Hide edges lighter than the threshold.
	MinEdgeWeight(f64),
	/// Hide nodes whose adjacent edges are all hidden.
	DisconnectedNodes,
}

impl Filter {
	pub const MIN_EDGE_SIZE: &'static str = "min-edge-size";
	pub const MIN_EDGE_WEIGHT: &'static str = "min-edge-weight";
	pub const DISCONNECTED_NODES: &'static str = "disconnected-nodes";

	pub fn name(&self) -> &'static str {
		match self {
			Filter::MinEdgeSize(_) => Self::MIN_EDGE_SIZE,
			Filter::MinEdgeWeight(_) => Self::MIN_EDGE_WEIGHT,
			Filter::DisconnectedNodes => Self::DISCONNECTED_NODES,
		}
	}

	fn run(&self, nodes: &mut [GraphNode], edges: &mut [GraphEdge], adjacency: &[Vec<usize>]) {
		match *self {
			Filter::MinEdgeSize(min) => hide_edges(edges, |e| e.size >= min),
			Filter::MinEdgeWeight(min) => hide_edges(edges, |e| e.weight >= min),
			Filter::DisconnectedNodes => {
				for (idx, node) in nodes.iter_mut().enumerate() {
					if adjacency[idx].iter().all(|&e| edges[e].hidden) {
						node.hidden = true;
					}
				}
			}
		}
	}
}

fn hide_edges(edges: &mut [GraphEdge], keep: impl Fn(&GraphEdge) -> bool) {
	for edge in edges.iter_mut().filter(|e| !keep(e)) {
		edge.hidden = true;
	}
}

/// Filters in installation order; they compose by conjunction.
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
	filters: Vec<Filter>,
}

impl FilterChain {
	pub fn undo(&mut self, name: &str) -> &mut Self {
		self.filters.retain(|f| f.name() != name);
		self
	}

	pub fn install(&mut self, filter: Filter) -> &mut Self {
		self.undo(filter.name());
		self.filters.push(filter);
		self
	}

	pub fn clear(&mut self) {
		self.filters.clear();
	}

	pub fn filters(&self) -> &[Filter] {
		&self.filters
	}

	/// Threshold of the installed weight filter, or 0.
	pub fn min_edge_weight(&self) -> f64 {
		self.filters
			.iter()
			.find_map(|f| match *f {
				Filter::MinEdgeWeight(min) => Some(min),
				_ => None,
			})
			.unwrap_or(0.0)
	}

	pub fn hides_disconnected(&self) -> bool {
		self.filters.contains(&Filter::DisconnectedNodes)
	}

	/// Recomputes every hidden flag from scratch.
	pub fn apply(&self, nodes: &mut [GraphNode], edges: &mut [GraphEdge], adjacency: &[Vec<usize>]) {
		nodes.iter_mut().for_each(|n| n.hidden = false);
		edges.iter_mut().for_each(|e| e.hidden = false);
		for filter in &self.filters {
			filter.run(nodes, edges, adjacency);
		}
		debug!(
			"filters {:?}: {} of {} nodes, {} of {} edges visible",
			self.filters.iter().map(Filter::name).collect::<Vec<_>>(),
			nodes.iter().filter(|n| !n.hidden).count(),
			nodes.len(),
			edges.iter().filter(|e| !e.hidden).count(),
			edges.len(),
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_name_replaces_instead_of_stacking() {
		let mut chain = FilterChain::default();
		chain
			.install(Filter::MinEdgeWeight(3.0))
			.install(Filter::DisconnectedNodes)
			.install(Filter::MinEdgeWeight(1.0));
		assert_eq!(
			chain.filters(),
			&[Filter::DisconnectedNodes, Filter::MinEdgeWeight(1.0)]
		);
	}

	#[test]
	fn undo_only_removes_the_named_filter() {
		let mut chain = FilterChain::default();
		chain
			.install(Filter::MinEdgeSize(10.0))
			.install(Filter::MinEdgeWeight(2.0));
		chain.undo(Filter::MIN_EDGE_SIZE);
		assert_eq!(chain.filters(), &[Filter::MinEdgeWeight(2.0)]);
		chain.undo("no-such-filter");
		assert_eq!(chain.filters().len(), 1);
		chain.clear();
		assert!(chain.filters().is_empty());
	}

	#[test]
	fn installed_thresholds_are_readable() {
		let mut chain = FilterChain::default();
		assert_eq!(chain.min_edge_weight(), 0.0);
		assert!(!chain.hides_disconnected());
		chain
			.install(Filter::MinEdgeSize(5.0))
			.install(Filter::MinEdgeWeight(3.0))
			.install(Filter::DisconnectedNodes);
		assert_eq!(chain.min_edge_weight(), 3.0);
		assert!(chain.hides_disconnected());
		chain.undo(Filter::MIN_EDGE_WEIGHT);
		assert_eq!(chain.min_edge_weight(), 0.0);
	}
}
