use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{GraphState, NODE_RADIUS, Projection};

const BACKGROUND: &str = "#fff";
const LABEL_COLOR: &str = "#333";
const NODE_LABEL_SIZE: f64 = 11.0;

pub fn render(state: &GraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	let projection = state.projection();
	draw_edges(state, ctx, &projection);
	draw_nodes(state, ctx, &projection);
}

fn draw_edges(state: &GraphState, ctx: &CanvasRenderingContext2d, projection: &Projection) {
	ctx.set_line_cap("round");
	// Hovered edge last so it sits on top.
	let order = (0..state.edges.len())
		.filter(|&i| Some(i) != state.hover.edge)
		.chain(state.hover.edge);

	for idx in order {
		if !state.edge_visible(idx) {
			continue;
		}
		let edge = &state.edges[idx];
		let (s, t) = (&state.nodes[edge.source], &state.nodes[edge.target]);
		let (x1, y1) = projection.to_screen(s.x, s.y);
		let (x2, y2) = projection.to_screen(t.x, t.y);
		let hovered = state.hover.edge == Some(idx);
		let width = state.edge_width(idx);

		let color = if hovered { &edge.hover_color } else { &edge.color };
		ctx.set_stroke_style_str(color);
		ctx.set_line_width(width);
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2, y2);
		ctx.stroke();

		draw_edge_label(state, ctx, idx, (x1 + x2) / 2.0, (y1 + y2) / 2.0, hovered);
	}
}

fn draw_edge_label(
	state: &GraphState,
	ctx: &CanvasRenderingContext2d,
	idx: usize,
	x: f64,
	y: f64,
	hovered: bool,
) {
	let edge = &state.edges[idx];
	let size = state.settings.edge_label_font(state.edge_width(idx));
	ctx.set_font(&format!(
		"{}{:.1}px sans-serif",
		if hovered { "bold " } else { "" },
		size
	));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	ctx.set_fill_style_str(if hovered { edge.hover_color.as_str() } else { LABEL_COLOR });
	let _ = ctx.fill_text(&edge.label, x, y);
	ctx.set_text_align("start");
	ctx.set_text_baseline("alphabetic");
}

fn draw_nodes(state: &GraphState, ctx: &CanvasRenderingContext2d, projection: &Projection) {
	for (idx, node) in state.nodes.iter().enumerate() {
		if node.hidden {
			continue;
		}
		let (x, y) = projection.to_screen(node.x, node.y);
		let highlighted = state.is_highlighted(idx);
		let radius = NODE_RADIUS * node.size * if highlighted { 1.5 } else { 1.0 };

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.color);
		ctx.fill();

		if highlighted {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&state.settings.edge_hover_color);
			ctx.set_line_width(1.5);
			ctx.stroke();
		}

		ctx.set_fill_style_str(LABEL_COLOR);
		ctx.set_font(&format!(
			"{}{}px sans-serif",
			if highlighted { "bold " } else { "" },
			NODE_LABEL_SIZE
		));
		let _ = ctx.fill_text(&node.label, x + radius + 3.0, y + 3.0);
	}
}
