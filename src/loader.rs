//! JSON from the server and from inline `<script type="application/json">` islands.

use std::fmt::Debug;

use gloo_net::http::Request;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::logger::Logger;

/// Fetches the array behind `source`. An empty array counts as failure.
pub async fn get_json<T: DeserializeOwned>(source: &SourceConfig, logger: &Logger) -> Result<Vec<T>> {
	logger.log(&format!("Getting JSON from {}...", source.url));
	let response = Request::get(&source.url).send().await?;
	if !response.ok() {
		return Err(Error::Http {
			status: response.status(),
		});
	}
	non_empty(response.json::<Vec<T>>().await?)
}

/// Callback form of [`get_json`]: exactly one of the two callbacks runs.
pub fn get_json_with<T, S, F>(source: SourceConfig, logger: Logger, on_success: S, on_failure: F)
where
	T: DeserializeOwned + 'static,
	S: FnOnce(Vec<T>) + 'static,
	F: FnOnce() + 'static,
{
	spawn_local(async move {
		let result = get_json(&source, &logger).await;
		dispatch(result, on_success, on_failure);
	});
}

pub(crate) fn non_empty<T>(data: Vec<T>) -> Result<Vec<T>> {
	if data.is_empty() {
		return Err(Error::EmptyData);
	}
	Ok(data)
}

pub(crate) fn dispatch<T>(result: Result<Vec<T>>, on_success: impl FnOnce(Vec<T>), on_failure: impl FnOnce()) {
	deliver(
		result,
		Ok,
		|data| {
			on_success(data);
			Ok::<(), ()>(())
		},
		on_failure,
	);
}

/// Converts loaded data and hands it to `on_success`, which may itself fail.
/// `on_failure` runs only when the data never reached `on_success`.
pub(crate) fn deliver<T, D, E: Debug>(
	result: Result<Vec<T>>,
	convert: impl FnOnce(Vec<T>) -> Result<D>,
	on_success: impl FnOnce(D) -> std::result::Result<(), E>,
	on_failure: impl FnOnce(),
) {
	match result.and_then(convert) {
		Ok(data) => {
			if let Err(e) = on_success(data) {
				warn!("JSON success callback failed: {e:?}");
			}
		}
		Err(err) => {
			debug!("JSON load failed: {err}");
			on_failure();
		}
	}
}

/// Parses the trimmed text of `element`. Blank text yields `[]`.
pub fn parse_json(element: &Element) -> Result<Value> {
	parse_inline(&element.text_content().unwrap_or_default())
}

pub fn parse_inline(text: &str) -> Result<Value> {
	let text = text.trim();
	if text.is_empty() {
		return Ok(Value::Array(Vec::new()));
	}
	Ok(serde_json::from_str(text)?)
}
