use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::filter::Filter;
use super::render;
use super::state::GraphState;

pub type SharedGraph = Rc<RefCell<GraphState>>;

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

fn request_frame(cb: &Closure<dyn FnMut()>) {
	if let Some(window) = web_sys::window() {
		let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
	}
}

fn canvas_offset(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Canvas view of a similarity graph. Redraws only after something changed.
#[component]
pub fn SimilarityGraphCanvas(graph: SharedGraph) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init) = (graph.clone(), animate.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(ctx) = context_2d(&canvas) else {
			warn!("graph canvas has no 2d context");
			return;
		};

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			{
				let mut s = state_anim.borrow_mut();
				s.tick(0.016);
				let (w, h) = (s.width as u32, s.height as u32);
				if canvas.width() != w || canvas.height() != h {
					canvas.set_width(w);
					canvas.set_height(h);
					s.invalidate();
				}
				if s.take_dirty() {
					render::render(&s, &ctx);
				}
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				request_frame(cb);
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			request_frame(cb);
		}
	});

	let state_md = graph.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_offset(canvas_ref, &ev) else {
			return;
		};
		let mut s = state_md.borrow_mut();
		if let Some(idx) = s.node_at_position(x, y) {
			s.begin_drag(idx, x, y);
		} else {
			s.pan.active = true;
			s.pan.start_x = x;
			s.pan.start_y = y;
			s.pan.transform_start_x = s.transform.x;
			s.pan.transform_start_y = s.transform.y;
		}
	};

	let state_mm = graph.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_offset(canvas_ref, &ev) else {
			return;
		};
		let mut s = state_mm.borrow_mut();
		if s.drag.active {
			s.drag_to(x, y);
			return;
		}
		let node = s.node_at_position(x, y);
		let edge = if node.is_none() {
			s.edge_at_position(x, y)
		} else {
			None
		};
		s.set_hover(node, edge);
		if s.pan.active {
			s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
			s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
			s.invalidate();
		}
	};

	let state_mu = graph.clone();
	let on_mouseup = move |_: MouseEvent| state_mu.borrow_mut().end_drag();

	let state_ml = graph.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let mut s = state_ml.borrow_mut();
		s.end_drag();
		s.set_hover(None, None);
	};

	let state_wh = graph;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_offset(canvas_ref, &ev) else {
			return;
		};
		let mut s = state_wh.borrow_mut();
		let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
		let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / s.transform.k;
		s.transform.x = x - (x - s.transform.x) * ratio;
		s.transform.y = y - (y - s.transform.y) * ratio;
		s.transform.k = new_k;
		s.invalidate();
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="similarity-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}

/// Widget values read back from the graph state. Shared with
/// [`GraphRenderer`](super::GraphRenderer), so changes made from page scripts
/// show up in the controls too.
#[derive(Clone)]
pub struct ControlState {
	pub min_weight: ArcRwSignal<f64>,
	pub hide_disconnected: ArcRwSignal<bool>,
	pub layout_running: ArcRwSignal<bool>,
}

impl ControlState {
	pub fn new(state: &GraphState) -> Self {
		Self {
			min_weight: ArcRwSignal::new(state.filters().min_edge_weight()),
			hide_disconnected: ArcRwSignal::new(state.filters().hides_disconnected()),
			layout_running: ArcRwSignal::new(state.layout.is_running()),
		}
	}

	/// Call after every change to the filters or the layout.
	pub fn sync(&self, state: &GraphState) {
		self.min_weight.set(state.filters().min_edge_weight());
		self.hide_disconnected.set(state.filters().hides_disconnected());
		self.layout_running.set(state.layout.is_running());
	}
}

/// Filter and layout controls under the graph.
#[component]
pub fn GraphControls(graph: SharedGraph, controls: ControlState, max_weight: f64) -> impl IntoView {
	let (state_weight, controls_weight) = (graph.clone(), controls.clone());
	let on_weight = move |ev: web_sys::Event| {
		let value = event_target_value(&ev).parse::<f64>().unwrap_or(0.0);
		let mut s = state_weight.borrow_mut();
		s.apply_filter(Filter::MinEdgeWeight(value));
		// Node visibility depends on the edges, so it is recomputed after them.
		if s.filters().hides_disconnected() {
			s.apply_filter(Filter::DisconnectedNodes);
		}
		controls_weight.sync(&s);
	};

	let (state_disconnected, controls_disconnected) = (graph.clone(), controls.clone());
	let on_disconnected = move |ev: web_sys::Event| {
		let mut s = state_disconnected.borrow_mut();
		if event_target_checked(&ev) {
			s.apply_filter(Filter::DisconnectedNodes);
		} else {
			s.undo_filter(Filter::DISCONNECTED_NODES);
		}
		controls_disconnected.sync(&s);
	};

	let (state_shuffle, controls_shuffle) = (graph.clone(), controls.clone());
	let on_shuffle = move |_: MouseEvent| {
		let mut s = state_shuffle.borrow_mut();
		s.shuffle(js_sys::Math::random);
		controls_shuffle.sync(&s);
	};

	let (state_layout, controls_layout) = (graph, controls.clone());
	let on_layout = move |_: MouseEvent| {
		let mut s = state_layout.borrow_mut();
		if s.layout.is_running() {
			s.stop_layout();
		} else {
			s.start_layout();
		}
		controls_layout.sync(&s);
	};

	let ControlState {
		min_weight,
		hide_disconnected,
		layout_running,
	} = controls;
	let weight_label = min_weight.clone();

	view! {
		<div class="graph-controls form-inline">
			<label>
				"Minimum matches: " {move || weight_label.get()}
				<input
					type="range"
					min="0"
					max=max_weight.to_string()
					step="1"
					prop:value=move || min_weight.get().to_string()
					on:input=on_weight
				/>
			</label>
			<label>
				<input
					type="checkbox"
					prop:checked=move || hide_disconnected.get()
					on:change=on_disconnected
				/>
				" Hide disconnected students"
			</label>
			<button type="button" class="btn btn-default btn-sm" on:click=on_shuffle>
				"Shuffle"
			</button>
			<button type="button" class="btn btn-default btn-sm" on:click=on_layout>
				{move || if layout_running.get() { "Stop layout" } else { "Run layout" }}
			</button>
		</div>
	}
}
