//! Browser helpers for the similarity review pages: heat colouring,
//! quick reviews and the student similarity graph.

use log::{Level, info, warn};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

// Modules
pub mod components;
pub mod config;
pub mod error;
pub mod heat;
pub mod loader;
pub mod logger;

use crate::components::quick_review::QuickReview;
use crate::components::similarity_graph::{self, GraphData, GraphRenderer};
use crate::config::{GraphSettings, SourceConfig};
pub use crate::error::{Error, Result};
use crate::heat::HeatMap;
use crate::logger::Logger;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Module entry point.
#[wasm_bindgen(start)]
pub fn start() {
	init_logging();
}

fn to_js(value: &serde_json::Value) -> Result<JsValue> {
	value
		.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
		.map_err(|e| Error::Malformed(e.to_string()))
}

/// The toolbox page scripts call from their event handlers.
#[wasm_bindgen]
pub struct Radar {
	logger: Logger,
	heat_map: HeatMap,
}

impl Default for Radar {
	fn default() -> Self {
		Self::new()
	}
}

#[wasm_bindgen]
impl Radar {
	/// Toolbox bound to the page's `#js` log region.
	#[wasm_bindgen(constructor)]
	pub fn new() -> Radar {
		Radar {
			logger: Logger::new(),
			heat_map: HeatMap::default(),
		}
	}

	/// Appends `message` to the page's log region and the console.
	pub fn log(&self, message: &str) {
		self.logger.log(message);
	}

	/// Fetches the array behind `element`'s `data-url`; calls exactly one of the callbacks.
	///
	/// `fail` runs when the element names no source or the load fails. An
	/// exception thrown by `success` is logged and does not trigger `fail`.
	#[wasm_bindgen(js_name = getJSON)]
	pub fn get_json(&self, element: &Element, success: js_sys::Function, fail: js_sys::Function) {
		let source = match SourceConfig::from_element(element) {
			Ok(source) => source,
			Err(e) => {
				warn!("getJSON: {e}");
				let _ = fail.call0(&JsValue::NULL);
				return;
			}
		};
		let logger = self.logger.clone();
		spawn_local(async move {
			let result = loader::get_json::<serde_json::Value>(&source, &logger).await;
			loader::deliver(
				result,
				|data| to_js(&serde_json::Value::Array(data)),
				|data| success.call1(&JsValue::NULL, &data).map(drop),
				|| {
					let _ = fail.call0(&JsValue::NULL);
				},
			);
		});
	}

	/// Inline JSON in `element`'s text; `[]` when blank. Throws on invalid JSON.
	#[wasm_bindgen(js_name = parseJSON)]
	pub fn parse_json(&self, element: &Element) -> std::result::Result<JsValue, JsValue> {
		Ok(to_js(&loader::parse_json(element)?)?)
	}

	/// Rebuilds the heat thresholds from a column of similarity values.
	#[wasm_bindgen(js_name = buildHeat)]
	pub fn build_heat(&mut self, similarity: Vec<f64>) {
		self.heat_map = HeatMap::build_logged(&similarity, &self.logger);
	}

	/// Median of the values the heat map was last built from.
	#[wasm_bindgen(getter)]
	pub fn median(&self) -> f64 {
		self.heat_map.median()
	}

	/// Current thresholds, hottest first.
	#[wasm_bindgen(getter, js_name = heatMap)]
	pub fn heat_map(&self) -> Vec<f64> {
		self.heat_map.thresholds().to_vec()
	}

	/// Class name (`heat-1` .. `heat-4`) for one similarity value.
	pub fn heat(&self, value: f64) -> String {
		self.heat_map.heat(value).to_string()
	}

	/// Tags every cell under `element` that carries a similarity value with its heat class.
	#[wasm_bindgen(js_name = applyHeat)]
	pub fn apply_heat(&self, element: &Element) -> std::result::Result<(), JsValue> {
		heat::apply_heat(element, &self.heat_map)?;
		Ok(())
	}

	/// Wires the review buttons inside `element` and shows the stored rating.
	#[wasm_bindgen(js_name = quickReview)]
	pub fn quick_review(&self, element: Element) -> std::result::Result<(), JsValue> {
		QuickReview::attach(element, self.logger.clone())?;
		Ok(())
	}

	/// Draws the similarity graph into `#graph-container` and returns its handle.
	#[wasm_bindgen(js_name = drawGraph)]
	pub fn draw_graph(&self, data: JsValue) -> std::result::Result<GraphRenderer, JsValue> {
		let data: GraphData =
			serde_wasm_bindgen::from_value(data).map_err(|e| Error::Malformed(e.to_string()))?;
		Ok(similarity_graph::draw_graph(&data, GraphSettings::default())?)
	}
}
