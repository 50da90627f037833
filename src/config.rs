//! Validated settings read from page markup.
//!
//! Pages describe their data sources and review endpoints through
//! attributes. Each struct here reads those attributes once and rejects
//! anything unusable, so the components never look attributes up again.

use web_sys::Element;

use crate::error::{Error, Result};

/// Id of the `<pre>` region the [`Logger`](crate::logger::Logger) writes to.
pub const LOG_REGION_ID: &str = "js";

/// Name of the hidden input carrying the anti-forgery token.
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

fn attr(element: &Element, name: &'static str) -> Result<String> {
	element
		.get_attribute(name)
		.ok_or(Error::MissingAttribute(name))
}

fn non_empty(name: &'static str, value: String) -> Result<String> {
	let value = value.trim().to_owned();
	if value.is_empty() {
		return Err(Error::InvalidAttribute { name, value });
	}
	Ok(value)
}

/// Parses a `data-review` value the way the page writes it.
pub fn parse_rating(value: &str) -> Result<i32> {
	value
		.trim()
		.parse()
		.map_err(|_| Error::InvalidAttribute {
			name: "data-review",
			value: value.to_owned(),
		})
}

/// A remote JSON endpoint named by `data-url`.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceConfig {
	pub url: String,
}

impl SourceConfig {
	pub fn new(url: impl Into<String>) -> Result<Self> {
		Ok(Self {
			url: non_empty("data-url", url.into())?,
		})
	}

	pub fn from_element(element: &Element) -> Result<Self> {
		Self::new(attr(element, "data-url")?)
	}
}

/// Where and how a quick-review form submits.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewConfig {
	pub action: String,
	pub csrf_token: String,
}

impl ReviewConfig {
	pub fn from_element(container: &Element) -> Result<Self> {
		let action = non_empty("action", attr(container, "action")?)?;
		let selector = format!("input[name=\"{CSRF_FIELD}\"]");
		let token = container
			.query_selector(&selector)
			.map_err(crate::error::dom_error)?
			.ok_or(Error::MissingElement(selector))?;
		Ok(Self {
			action,
			csrf_token: attr(&token, "value")?,
		})
	}
}

/// One selectable rating inside a quick-review control.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewAction {
	pub rating: i32,
	pub label: String,
	pub style: String,
}

impl ReviewAction {
	pub fn from_element(action: &Element) -> Result<Self> {
		Ok(Self {
			rating: parse_rating(&attr(action, "data-review")?)?,
			label: action.text_content().unwrap_or_default().trim().to_owned(),
			style: attr(action, "data-class")?,
		})
	}
}

/// Rendering constants for the similarity graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphSettings {
	pub container_id: String,
	pub min_edge_size: f64,
	pub max_edge_size: f64,
	pub node_size: f64,
	pub node_color: String,
	pub edge_color: String,
	pub edge_hover_color: String,
	pub edge_hover_extremities: bool,
	/// Screen size of an edge label at unit edge width.
	pub edge_label_size: f64,
	/// Labels grow with `width^(1 - 1/ratio)`.
	pub edge_label_pow_ratio: f64,
	/// Edge size is the match count times this factor.
	pub edge_size_factor: f64,
}

impl Default for GraphSettings {
	fn default() -> Self {
		Self {
			container_id: "graph-container".into(),
			min_edge_size: 1.0,
			max_edge_size: 10.0,
			node_size: 1.0,
			node_color: "#444".into(),
			edge_color: "#ccc".into(),
			edge_hover_color: "#222".into(),
			edge_hover_extremities: true,
			edge_label_size: 10.0,
			edge_label_pow_ratio: 1.5,
			edge_size_factor: 10.0,
		}
	}
}

impl GraphSettings {
	/// Screen width of an edge, mapped from `[0, max_size]` into the size bounds.
	pub fn edge_width(&self, size: f64, max_size: f64) -> f64 {
		if max_size <= 0.0 {
			return self.min_edge_size;
		}
		let t = (size / max_size).clamp(0.0, 1.0);
		self.min_edge_size + t * (self.max_edge_size - self.min_edge_size)
	}

	/// Font size of a label drawn on an edge of the given screen width.
	pub fn edge_label_font(&self, width: f64) -> f64 {
		self.edge_label_size * width.powf(1.0 - 1.0 / self.edge_label_pow_ratio)
	}
}
