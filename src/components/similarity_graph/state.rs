use std::collections::HashMap;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, warn};

use super::filter::{Filter, FilterChain};
use super::types::{GraphData, GraphEdge, GraphNode};
use crate::config::GraphSettings;

pub const NODE_RADIUS: f64 = 4.0;
/// Pointer slop around nodes and edges, in screen pixels.
pub const HIT_RADIUS: f64 = 8.0;
const FIT_MARGIN: f64 = 24.0;
/// Graph units are roughly unit-sized; the simulation wants room to push.
const LAYOUT_SPREAD: f64 = 400.0;

/// Pan and zoom on top of the fitted view. `x`, `y` is where the graph centre lands.
#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

/// Graph-to-screen mapping for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
	center_x: f64,
	center_y: f64,
	scale: f64,
	origin_x: f64,
	origin_y: f64,
}

impl Projection {
	pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
		(
			self.origin_x + (x - self.center_x) * self.scale,
			self.origin_y + (y - self.center_y) * self.scale,
		)
	}

	pub fn to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			self.center_x + (sx - self.origin_x) / self.scale,
			self.center_y + (sy - self.origin_y) / self.scale,
		)
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
	/// The view is held still while a node is dragged.
	pub frozen: Option<Projection>,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<usize>,
	pub edge: Option<usize>,
}

/// Force-directed positions, off unless started explicitly.
pub struct ForceLayout {
	graph: ForceGraph<usize, ()>,
	handles: Vec<DefaultNodeIdx>,
	running: bool,
}

impl ForceLayout {
	fn new(nodes: &[GraphNode], edges: &[GraphEdge]) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});
		let handles: Vec<DefaultNodeIdx> = nodes
			.iter()
			.enumerate()
			.map(|(i, node)| {
				graph.add_node(NodeData {
					x: (node.x * LAYOUT_SPREAD) as f32,
					y: (node.y * LAYOUT_SPREAD) as f32,
					mass: 10.0,
					is_anchor: false,
					user_data: i,
				})
			})
			.collect();
		for edge in edges {
			graph.add_edge(handles[edge.source], handles[edge.target], EdgeData::default());
		}
		Self {
			graph,
			handles,
			running: false,
		}
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	fn start(&mut self, nodes: &[GraphNode]) {
		self.graph.visit_nodes_mut(|node| {
			let n = &nodes[node.data.user_data];
			node.data.x = (n.x * LAYOUT_SPREAD) as f32;
			node.data.y = (n.y * LAYOUT_SPREAD) as f32;
			node.data.is_anchor = false;
		});
		self.running = true;
	}

	fn stop(&mut self) {
		self.running = false;
	}

	fn step(&mut self, dt: f32, nodes: &mut [GraphNode]) {
		self.graph.update(dt);
		self.graph.visit_nodes(|node| {
			let n = &mut nodes[node.data.user_data];
			n.x = node.x() as f64 / LAYOUT_SPREAD;
			n.y = node.y() as f64 / LAYOUT_SPREAD;
		});
	}

	fn pin(&mut self, idx: usize, x: f64, y: f64) {
		let handle = self.handles[idx];
		self.graph.visit_nodes_mut(|node| {
			if node.index() == handle {
				node.data.x = (x * LAYOUT_SPREAD) as f32;
				node.data.y = (y * LAYOUT_SPREAD) as f32;
				node.data.is_anchor = true;
			}
		});
	}
}

pub struct GraphState {
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
	pub settings: GraphSettings,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub layout: ForceLayout,
	filters: FilterChain,
	/// Edge indices per node.
	adjacency: Vec<Vec<usize>>,
	max_edge_size: f64,
	dirty: bool,
}

impl GraphState {
	pub fn new(data: &GraphData, settings: GraphSettings, width: f64, height: f64) -> Self {
		let mut id_to_idx = HashMap::new();
		let mut nodes = Vec::with_capacity(data.nodes.len());
		for id in &data.nodes {
			if id_to_idx.contains_key(id) {
				warn!("duplicate node {id} ignored");
				continue;
			}
			id_to_idx.insert(id.clone(), nodes.len());
			nodes.push(GraphNode {
				id: id.clone(),
				label: id.clone(),
				size: settings.node_size,
				color: settings.node_color.clone(),
				x: 0.0,
				y: 0.0,
				hidden: false,
			});
		}

		let mut edges = Vec::with_capacity(data.edges.len());
		let mut adjacency = vec![Vec::new(); nodes.len()];
		for (i, edge) in data.edges.iter().enumerate() {
			let (Some(&source), Some(&target)) =
				(id_to_idx.get(&edge.source), id_to_idx.get(&edge.target))
			else {
				warn!("edge {} -> {} names an unknown node", edge.source, edge.target);
				continue;
			};
			let match_count = edge.match_count();
			adjacency[source].push(edges.len());
			if target != source {
				adjacency[target].push(edges.len());
			}
			edges.push(GraphEdge {
				id: format!("e{i}"),
				source,
				target,
				size: match_count as f64 * settings.edge_size_factor,
				weight: match_count as f64,
				label: match_count.to_string(),
				color: settings.edge_color.clone(),
				hover_color: settings.edge_hover_color.clone(),
				max_similarity: edge.max_similarity(),
				hidden: false,
			});
		}

		let max_edge_size = edges.iter().map(|e| e.size).fold(0.0, f64::max);
		debug!("graph built: {} nodes, {} edges", nodes.len(), edges.len());
		let layout = ForceLayout::new(&nodes, &edges);
		Self {
			nodes,
			edges,
			settings,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			layout,
			filters: FilterChain::default(),
			adjacency,
			max_edge_size,
			dirty: true,
		}
	}

	/// Asks for a redraw on the next frame.
	pub fn invalidate(&mut self) {
		self.dirty = true;
	}

	pub fn take_dirty(&mut self) -> bool {
		std::mem::take(&mut self.dirty)
	}

	pub fn adjacent_edges(&self, node: usize) -> impl Iterator<Item = &GraphEdge> {
		self.adjacency[node].iter().map(|&e| &self.edges[e])
	}

	pub fn filters(&self) -> &FilterChain {
		&self.filters
	}

	pub fn apply_filter(&mut self, filter: Filter) {
		self.filters.install(filter);
		self.refilter();
	}

	pub fn undo_filter(&mut self, name: &str) {
		self.filters.undo(name);
		self.refilter();
	}

	pub fn clear_filters(&mut self) {
		self.filters.clear();
		self.refilter();
	}

	fn refilter(&mut self) {
		self.filters
			.apply(&mut self.nodes, &mut self.edges, &self.adjacency);
		if self.hover.edge.is_some_and(|e| !self.edge_visible(e)) {
			self.hover.edge = None;
		}
		if self.hover.node.is_some_and(|n| self.nodes[n].hidden) {
			self.hover.node = None;
		}
		self.dirty = true;
	}

	/// Stops the layout and scatters every node over `[-0.5, 0.5)²`.
	pub fn shuffle(&mut self, mut random: impl FnMut() -> f64) {
		self.layout.stop();
		for node in &mut self.nodes {
			node.x = random() - 0.5;
			node.y = random() - 0.5;
		}
		self.dirty = true;
	}

	pub fn start_layout(&mut self) {
		self.layout.start(&self.nodes);
	}

	pub fn stop_layout(&mut self) {
		self.layout.stop();
	}

	pub fn tick(&mut self, dt: f32) {
		if self.layout.is_running() {
			self.layout.step(dt, &mut self.nodes);
			self.dirty = true;
		}
	}

	pub fn edge_visible(&self, idx: usize) -> bool {
		let edge = &self.edges[idx];
		!edge.hidden && !self.nodes[edge.source].hidden && !self.nodes[edge.target].hidden
	}

	pub fn edge_width(&self, idx: usize) -> f64 {
		self.settings.edge_width(self.edges[idx].size, self.max_edge_size)
	}

	/// Fits all nodes, hidden or not, into the canvas, then applies pan and zoom.
	pub fn projection(&self) -> Projection {
		if let Some(frozen) = self.drag.frozen {
			return frozen;
		}
		let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
		for node in &self.nodes {
			min_x = min_x.min(node.x);
			min_y = min_y.min(node.y);
			max_x = max_x.max(node.x);
			max_y = max_y.max(node.y);
		}
		if self.nodes.is_empty() {
			(min_x, min_y, max_x, max_y) = (0.0, 0.0, 0.0, 0.0);
		}
		let span = |lo: f64, hi: f64| if hi - lo > f64::EPSILON { hi - lo } else { 1.0 };
		let fit = ((self.width - 2.0 * FIT_MARGIN) / span(min_x, max_x))
			.min((self.height - 2.0 * FIT_MARGIN) / span(min_y, max_y))
			.max(f64::EPSILON);
		Projection {
			center_x: (min_x + max_x) / 2.0,
			center_y: (min_y + max_y) / 2.0,
			scale: fit * self.transform.k,
			origin_x: self.transform.x,
			origin_y: self.transform.y,
		}
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let projection = self.projection();
		let mut found = None;
		for (idx, node) in self.nodes.iter().enumerate() {
			if node.hidden {
				continue;
			}
			let (x, y) = projection.to_screen(node.x, node.y);
			if ((x - sx).powi(2) + (y - sy).powi(2)).sqrt() < HIT_RADIUS {
				found = Some(idx);
			}
		}
		found
	}

	pub fn edge_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let projection = self.projection();
		let mut found = None;
		for idx in 0..self.edges.len() {
			if !self.edge_visible(idx) {
				continue;
			}
			let edge = &self.edges[idx];
			let (s, t) = (&self.nodes[edge.source], &self.nodes[edge.target]);
			let (x1, y1) = projection.to_screen(s.x, s.y);
			let (x2, y2) = projection.to_screen(t.x, t.y);
			let reach = (self.edge_width(idx) / 2.0).max(HIT_RADIUS / 2.0);
			if segment_distance(sx, sy, x1, y1, x2, y2) < reach {
				found = Some(idx);
			}
		}
		found
	}

	pub fn set_hover(&mut self, node: Option<usize>, edge: Option<usize>) {
		let edge = if node.is_some() { None } else { edge };
		if (self.hover.node, self.hover.edge) != (node, edge) {
			self.hover = HoverState { node, edge };
			self.dirty = true;
		}
	}

	pub fn is_highlighted(&self, idx: usize) -> bool {
		if self.hover.node == Some(idx) {
			return true;
		}
		self.settings.edge_hover_extremities
			&& self
				.hover
				.edge
				.is_some_and(|e| self.edges[e].touches(idx))
	}

	pub fn begin_drag(&mut self, idx: usize, sx: f64, sy: f64) {
		let projection = self.projection();
		self.drag = DragState {
			active: true,
			node_idx: Some(idx),
			start_x: sx,
			start_y: sy,
			node_start_x: self.nodes[idx].x,
			node_start_y: self.nodes[idx].y,
			frozen: Some(projection),
		};
	}

	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		let (Some(idx), Some(projection)) = (self.drag.node_idx, self.drag.frozen) else {
			return;
		};
		let (gx, gy) = projection.to_graph(sx, sy);
		let (ox, oy) = projection.to_graph(self.drag.start_x, self.drag.start_y);
		let (nx, ny) = (
			self.drag.node_start_x + gx - ox,
			self.drag.node_start_y + gy - oy,
		);
		self.nodes[idx].x = nx;
		self.nodes[idx].y = ny;
		if self.layout.is_running() {
			self.layout.pin(idx, nx, ny);
		}
		self.dirty = true;
	}

	pub fn end_drag(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
		self.dirty = true;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
		self.dirty = true;
	}
}

fn segment_distance(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
	let (dx, dy) = (x2 - x1, y2 - y1);
	let len2 = dx * dx + dy * dy;
	let t = if len2 < f64::EPSILON {
		0.0
	} else {
		(((px - x1) * dx + (py - y1) * dy) / len2).clamp(0.0, 1.0)
	};
	let (cx, cy) = (x1 + t * dx, y1 + t * dy);
	((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
	use super::super::types::EdgeDescriptor;
	use super::*;

	fn edge(source: &str, target: &str, matches: &[f64]) -> EdgeDescriptor {
		EdgeDescriptor {
			source: source.into(),
			target: target.into(),
			matches_in_exercises: matches.to_vec(),
		}
	}

	fn sample() -> GraphState {
		let data = GraphData {
			nodes: ["a", "b", "c", "d"].map(String::from).to_vec(),
			edges: vec![
				edge("a", "b", &[0.9]),
				edge("b", "c", &[0.4, 0.7, 0.5]),
				edge("a", "c", &[0.3, 0.2]),
			],
		};
		GraphState::new(&data, GraphSettings::default(), 800.0, 600.0)
	}

	fn visible_edges(state: &GraphState) -> Vec<&str> {
		state
			.edges
			.iter()
			.filter(|e| !e.hidden)
			.map(|e| e.id.as_str())
			.collect()
	}

	fn hidden_nodes(state: &GraphState) -> Vec<&str> {
		state
			.nodes
			.iter()
			.filter(|n| n.hidden)
			.map(|n| n.id.as_str())
			.collect()
	}

	#[test]
	fn edges_are_sized_by_match_count() {
		let state = sample();
		let e1 = &state.edges[1];
		assert_eq!((e1.id.as_str(), e1.size, e1.weight), ("e1", 30.0, 3.0));
		assert_eq!(e1.label, "3");
		assert_eq!(e1.max_similarity, Some(0.7));
		assert_eq!((e1.color.as_str(), e1.hover_color.as_str()), ("#ccc", "#222"));
		let node = &state.nodes[0];
		assert_eq!((node.label.as_str(), node.size, node.color.as_str()), ("a", 1.0, "#444"));
	}

	#[test]
	fn unknown_endpoints_are_skipped() {
		let data = GraphData {
			nodes: vec!["a".into(), "b".into(), "a".into()],
			edges: vec![edge("a", "zz", &[1.0]), edge("a", "b", &[])],
		};
		let state = GraphState::new(&data, GraphSettings::default(), 100.0, 100.0);
		assert_eq!(state.nodes.len(), 2);
		assert_eq!(state.edges.len(), 1);
		assert_eq!(state.edges[0].id, "e1");
		assert_eq!(state.edges[0].max_similarity, None);
		assert_eq!(state.adjacent_edges(0).count(), 1);
	}

	#[test]
	fn min_edge_weight_hides_light_edges() {
		let mut state = sample();
		state.apply_filter(Filter::MinEdgeWeight(2.0));
		assert_eq!(visible_edges(&state), ["e1", "e2"]);
	}

	#[test]
	fn reapplying_a_filter_drops_the_old_threshold() {
		let mut state = sample();
		state.apply_filter(Filter::MinEdgeWeight(3.0));
		assert_eq!(visible_edges(&state), ["e1"]);
		state.apply_filter(Filter::MinEdgeWeight(1.0));
		assert_eq!(visible_edges(&state), ["e0", "e1", "e2"]);
		assert_eq!(state.filters().filters().len(), 1);
	}

	#[test]
	fn min_edge_size_compares_sizes() {
		let mut state = sample();
		state.apply_filter(Filter::MinEdgeSize(20.0));
		assert_eq!(visible_edges(&state), ["e1", "e2"]);
		state.undo_filter(Filter::MIN_EDGE_SIZE);
		assert_eq!(visible_edges(&state).len(), 3);
	}

	#[test]
	fn disconnected_nodes_follow_hidden_edges() {
		let mut state = sample();
		state.apply_filter(Filter::DisconnectedNodes);
		assert_eq!(hidden_nodes(&state), ["d"]);

		state.apply_filter(Filter::MinEdgeWeight(3.0));
		// Ran before the new edge filter, so only the isolated node is hidden.
		assert_eq!(hidden_nodes(&state), ["d"]);

		state.apply_filter(Filter::DisconnectedNodes);
		assert_eq!(hidden_nodes(&state), ["a", "d"]);
	}

	#[test]
	fn clearing_filters_shows_everything() {
		let mut state = sample();
		state.apply_filter(Filter::MinEdgeWeight(5.0));
		state.apply_filter(Filter::DisconnectedNodes);
		state.clear_filters();
		assert!(hidden_nodes(&state).is_empty());
		assert_eq!(visible_edges(&state).len(), 3);
	}

	#[test]
	fn shuffle_scatters_in_the_unit_square_and_stops_the_layout() {
		let mut state = sample();
		state.start_layout();
		assert!(state.layout.is_running());
		let mut seq = [0.0, 0.75, 0.25, 0.999].into_iter().cycle();
		state.shuffle(|| seq.next().unwrap_or(0.0));
		assert!(!state.layout.is_running());
		for node in &state.nodes {
			assert!((-0.5..0.5).contains(&node.x), "x = {}", node.x);
			assert!((-0.5..0.5).contains(&node.y), "y = {}", node.y);
		}
		assert_eq!((state.nodes[0].x, state.nodes[0].y), (-0.5, 0.25));
	}

	#[test]
	fn tick_moves_nothing_while_stopped() {
		let mut state = sample();
		let mut seq = [0.1, 0.9, 0.3, 0.7].into_iter().cycle();
		state.shuffle(|| seq.next().unwrap_or(0.0));
		let before: Vec<(f64, f64)> = state.nodes.iter().map(|n| (n.x, n.y)).collect();
		state.tick(0.016);
		let after: Vec<(f64, f64)> = state.nodes.iter().map(|n| (n.x, n.y)).collect();
		assert_eq!(before, after);
	}

	#[test]
	fn projection_round_trips_and_fits() {
		let mut state = sample();
		let mut seq = [0.0, 0.2, 0.9, 0.4, 0.5, 0.99, 0.3, 0.6].into_iter().cycle();
		state.shuffle(|| seq.next().unwrap_or(0.0));
		let projection = state.projection();
		for node in &state.nodes {
			let (sx, sy) = projection.to_screen(node.x, node.y);
			assert!((0.0..=800.0).contains(&sx) && (0.0..=600.0).contains(&sy));
			let (gx, gy) = projection.to_graph(sx, sy);
			assert!((gx - node.x).abs() < 1e-9 && (gy - node.y).abs() < 1e-9);
		}
	}

	#[test]
	fn hit_tests_find_nodes_then_edges() {
		let mut state = sample();
		let mut seq = [0.0, 0.5, 0.99, 0.5, 0.5, 0.0, 0.5, 0.99].into_iter().cycle();
		state.shuffle(|| seq.next().unwrap_or(0.0));
		let projection = state.projection();
		let (ax, ay) = projection.to_screen(state.nodes[0].x, state.nodes[0].y);
		let (bx, by) = projection.to_screen(state.nodes[1].x, state.nodes[1].y);
		assert_eq!(state.node_at_position(ax + 1.0, ay), Some(0));
		let (mx, my) = ((ax + bx) / 2.0, (ay + by) / 2.0);
		assert_eq!(state.node_at_position(mx, my), None);
		assert_eq!(state.edge_at_position(mx, my), Some(0));

		state.set_hover(None, Some(0));
		assert!(state.is_highlighted(0) && state.is_highlighted(1));
		assert!(!state.is_highlighted(2));

		state.apply_filter(Filter::MinEdgeWeight(2.0));
		assert_eq!(state.hover.edge, None);
		assert_eq!(state.edge_at_position(mx, my), None);
	}

	#[test]
	fn dragging_moves_the_node_under_a_still_view() {
		let mut state = sample();
		let mut seq = [0.1, 0.2, 0.8, 0.9, 0.4, 0.6, 0.7, 0.3].into_iter().cycle();
		state.shuffle(|| seq.next().unwrap_or(0.0));
		let projection = state.projection();
		let (sx, sy) = projection.to_screen(state.nodes[2].x, state.nodes[2].y);
		state.begin_drag(2, sx, sy);
		state.drag_to(sx + 40.0, sy - 10.0);
		assert_eq!(state.projection(), projection);
		let (nx, ny) = projection.to_screen(state.nodes[2].x, state.nodes[2].y);
		assert!((nx - sx - 40.0).abs() < 1e-9 && (ny - sy + 10.0).abs() < 1e-9);
		state.end_drag();
		assert!(state.drag.frozen.is_none());
	}

	#[test]
	fn changes_request_a_redraw() {
		let mut state = sample();
		assert!(state.take_dirty());
		assert!(!state.take_dirty());
		state.set_hover(Some(1), None);
		assert!(state.take_dirty());
		state.set_hover(Some(1), Some(0));
		assert!(!state.take_dirty());
		assert_eq!(state.hover.edge, None);
		state.apply_filter(Filter::MinEdgeWeight(2.0));
		assert!(state.take_dirty());
	}

	#[test]
	fn segment_distance_clamps_to_endpoints() {
		assert_eq!(segment_distance(5.0, 3.0, 0.0, 0.0, 10.0, 0.0), 3.0);
		assert_eq!(segment_distance(-4.0, 3.0, 0.0, 0.0, 10.0, 0.0), 5.0);
		assert_eq!(segment_distance(1.0, 1.0, 0.0, 0.0, 0.0, 0.0), 2f64.sqrt());
	}
}
