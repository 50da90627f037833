//! Student similarity graph: one node per student, one edge per pair with
//! matching submissions, sized by how many exercises matched.

mod component;
mod filter;
mod render;
mod state;
mod types;

use std::cell::RefCell;
use std::rc::Rc;

use leptos::mount::mount_to;
use leptos::prelude::*;
use log::info;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

pub use component::{ControlState, GraphControls, SharedGraph, SimilarityGraphCanvas};
pub use filter::{Filter, FilterChain};
pub use state::GraphState;
pub use types::{EdgeDescriptor, GraphData, GraphEdge, GraphNode};

use crate::config::GraphSettings;
use crate::error::{Error, Result};

const DEFAULT_WIDTH: f64 = 800.0;
const DEFAULT_HEIGHT: f64 = 600.0;

/// Handle to a drawn graph. Page scripts drive filters and layout through it.
#[wasm_bindgen]
pub struct GraphRenderer {
	state: SharedGraph,
	controls: ControlState,
}

/// Builds the graph, scatters it at random and mounts it into the settings' container.
pub fn draw_graph(data: &GraphData, settings: GraphSettings) -> Result<GraphRenderer> {
	let container = web_sys::window()
		.and_then(|w| w.document())
		.and_then(|d| d.get_element_by_id(&settings.container_id))
		.ok_or_else(|| Error::MissingElement(format!("#{}", settings.container_id)))?;
	let container: HtmlElement = container
		.dyn_into()
		.map_err(|_| Error::Dom(format!("#{} is not an HTML element", settings.container_id)))?;
	let size = |measured: i32, fallback: f64| {
		if measured > 0 { measured as f64 } else { fallback }
	};
	let (w, h) = (
		size(container.client_width(), DEFAULT_WIDTH),
		size(container.client_height(), DEFAULT_HEIGHT),
	);

	let mut state = GraphState::new(data, settings, w, h);
	state.shuffle(js_sys::Math::random);
	let max_weight = state.edges.iter().map(|e| e.weight).fold(0.0, f64::max);
	info!(
		"drawing graph: {} nodes, {} edges",
		state.nodes.len(),
		state.edges.len()
	);

	let renderer = GraphRenderer::from_state(state);
	let (canvas_graph, controls_graph) = (renderer.state.clone(), renderer.state.clone());
	let controls = renderer.controls.clone();
	// Mounted for the lifetime of the page.
	mount_to(container, move || {
		view! {
			<SimilarityGraphCanvas graph=canvas_graph />
			<GraphControls graph=controls_graph controls=controls max_weight=max_weight />
		}
	})
	.forget();

	Ok(renderer)
}

impl GraphRenderer {
	pub fn from_state(state: GraphState) -> Self {
		Self {
			controls: ControlState::new(&state),
			state: Rc::new(RefCell::new(state)),
		}
	}

	pub fn state(&self) -> &SharedGraph {
		&self.state
	}

	pub fn controls(&self) -> &ControlState {
		&self.controls
	}

	/// Runs `f` on the graph and brings the on-page controls up to date.
	fn update(&self, f: impl FnOnce(&mut GraphState)) {
		let mut s = self.state.borrow_mut();
		f(&mut s);
		self.controls.sync(&s);
	}

	pub fn apply(&self, filter: Filter) {
		self.update(|s| s.apply_filter(filter));
	}

	/// [`shuffle`](Self::shuffle) with a caller-supplied source of randomness.
	pub fn shuffle_with(&self, random: impl FnMut() -> f64) {
		self.update(|s| s.shuffle(random));
	}
}

#[wasm_bindgen]
impl GraphRenderer {
	/// Hides edges whose size is below `min`.
	#[wasm_bindgen(js_name = applyMinEdgeSizeFilter)]
	pub fn apply_min_edge_size(&self, min: f64) {
		self.apply(Filter::MinEdgeSize(min));
	}

	/// Hides edges whose weight is below `min`.
	#[wasm_bindgen(js_name = applyMinEdgeWeightFilter)]
	pub fn apply_min_edge_weight(&self, min: f64) {
		self.apply(Filter::MinEdgeWeight(min));
	}

	/// Hides nodes whose adjacent edges are all hidden right now.
	#[wasm_bindgen(js_name = applyDisconnectedNodesFilter)]
	pub fn apply_disconnected_nodes(&self) {
		self.apply(Filter::DisconnectedNodes);
	}

	/// Removes the filter called `name`; unknown names are ignored.
	#[wasm_bindgen(js_name = undoFilter)]
	pub fn undo_filter(&self, name: &str) {
		self.update(|s| s.undo_filter(name));
	}

	/// Removes every filter and shows the whole graph again.
	#[wasm_bindgen(js_name = clearFilters)]
	pub fn clear_filters(&self) {
		self.update(GraphState::clear_filters);
	}

	/// Stops the force layout and scatters the nodes at random.
	#[wasm_bindgen(js_name = shuffleGraphLayout)]
	pub fn shuffle(&self) {
		self.shuffle_with(js_sys::Math::random);
	}

	/// Starts the force layout from the current positions.
	#[wasm_bindgen(js_name = startLayout)]
	pub fn start_layout(&self) {
		self.update(GraphState::start_layout);
	}

	/// Freezes the nodes where they are.
	#[wasm_bindgen(js_name = stopLayout)]
	pub fn stop_layout(&self) {
		self.update(GraphState::stop_layout);
	}

	/// Resizes the canvas to `width` x `height` pixels.
	pub fn resize(&self, width: f64, height: f64) {
		self.state.borrow_mut().resize(width, height);
	}

	/// Forces a redraw on the next frame.
	pub fn refresh(&self) {
		self.state.borrow_mut().invalidate();
	}

	#[wasm_bindgen(getter, js_name = visibleNodes)]
	pub fn visible_nodes(&self) -> usize {
		self.state.borrow().nodes.iter().filter(|n| !n.hidden).count()
	}

	#[wasm_bindgen(getter, js_name = visibleEdges)]
	pub fn visible_edges(&self) -> usize {
		let s = self.state.borrow();
		(0..s.edges.len()).filter(|&i| s.edge_visible(i)).count()
	}
}
