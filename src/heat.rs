//! Heat classes for similarity cells.
//!
//! Thresholds are scaled from the median of the current scores and kept in
//! descending order, so bucket 1 holds the strongest similarities and
//! bucket 4 everything below `1.2 * median`.

use std::fmt;

use wasm_bindgen::JsCast;
use web_sys::Element;

use crate::error::{Result, dom_error};
use crate::logger::Logger;

const MEDIAN_FLOOR: f64 = 0.01;
const FACTORS: [f64; 3] = [1.4, 1.3, 1.2];

/// Median of the numeric scores, skipping NaN.
pub fn median(scores: &[f64]) -> Option<f64> {
	let mut values: Vec<f64> = scores.iter().copied().filter(|v| !v.is_nan()).collect();
	if values.is_empty() {
		return None;
	}
	values.sort_by(f64::total_cmp);
	let mid = values.len() / 2;
	Some(if values.len() % 2 == 1 {
		values[mid]
	} else {
		(values[mid - 1] + values[mid]) / 2.0
	})
}

/// A heat class, 1 (hottest) through 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeatBucket(u8);

impl HeatBucket {
	pub fn index(self) -> u8 {
		self.0
	}
}

impl fmt::Display for HeatBucket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "heat-{}", self.0)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeatMap {
	median: f64,
	thresholds: [f64; 3],
}

impl Default for HeatMap {
	fn default() -> Self {
		Self::from_median(MEDIAN_FLOOR)
	}
}

impl HeatMap {
	pub fn build(scores: &[f64]) -> Self {
		let m = median(scores).map_or(MEDIAN_FLOOR, |m| m.max(MEDIAN_FLOOR));
		Self::from_median(m)
	}

	/// [`HeatMap::build`] with the diagnostics lines the page shows.
	pub fn build_logged(scores: &[f64], logger: &Logger) -> Self {
		let map = Self::build(scores);
		logger.log(&format!("Similarity median {}", map.median));
		let joined: Vec<String> = map.thresholds.iter().map(f64::to_string).collect();
		logger.log(&format!("Heat map {}", joined.join(",")));
		map
	}

	fn from_median(m: f64) -> Self {
		Self {
			median: m,
			thresholds: FACTORS.map(|f| f * m),
		}
	}

	pub fn median(&self) -> f64 {
		self.median
	}

	pub fn thresholds(&self) -> &[f64; 3] {
		&self.thresholds
	}

	pub fn heat(&self, value: f64) -> HeatBucket {
		let i = self
			.thresholds
			.iter()
			.position(|&t| value >= t)
			.unwrap_or(self.thresholds.len());
		HeatBucket(i as u8 + 1)
	}

	/// Heat of an attribute value; text that is not a number is NaN and lands last.
	pub fn heat_str(&self, value: &str) -> HeatBucket {
		self.heat(value.trim().parse().unwrap_or(f64::NAN))
	}
}

/// Adds the heat class to every `[data-similarity]` element under `container`.
pub fn apply_heat(container: &Element, map: &HeatMap) -> Result<()> {
	let cells = container
		.query_selector_all("[data-similarity]")
		.map_err(dom_error)?;
	for i in 0..cells.length() {
		let Some(cell) = cells.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
			continue;
		};
		let value = cell.get_attribute("data-similarity").unwrap_or_default();
		cell.class_list()
			.add_1(&map.heat_str(&value).to_string())
			.map_err(dom_error)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: &[f64], b: &[f64]) -> bool {
		a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
	}

	#[test]
	fn median_handles_odd_even_and_nan() {
		assert_eq!(median(&[0.6, 0.2, 0.4]), Some(0.4));
		assert_eq!(median(&[0.1, 0.4, 0.2, 0.3]), Some(0.25));
		assert_eq!(median(&[f64::NAN, 0.3]), Some(0.3));
		assert_eq!(median(&[]), None);
		assert_eq!(median(&[f64::NAN]), None);
	}

	#[test]
	fn empty_scores_use_the_floor() {
		let map = HeatMap::build(&[]);
		assert_eq!(map.median(), 0.01);
		assert!(close(map.thresholds(), &[0.014, 0.013, 0.012]));
	}

	#[test]
	fn tiny_medians_are_floored() {
		assert_eq!(HeatMap::build(&[0.0, 0.001, 0.002]).median(), 0.01);
	}

	#[test]
	fn thresholds_scale_the_median() {
		let map = HeatMap::build(&[0.2, 0.4, 0.6]);
		assert_eq!(map.median(), 0.4);
		assert!(close(map.thresholds(), &[0.56, 0.52, 0.48]));
	}

	#[test]
	fn buckets_follow_stored_order() {
		let map = HeatMap::build(&[0.2, 0.4, 0.6]);
		assert_eq!(map.heat(0.5).to_string(), "heat-3");
		assert_eq!(map.heat(0.9).to_string(), "heat-1");
		assert_eq!(map.heat(0.53).to_string(), "heat-2");
		assert_eq!(map.heat(0.1).to_string(), "heat-4");
		assert_eq!(map.heat(f64::NAN).to_string(), "heat-4");
	}

	#[test]
	fn higher_values_never_get_a_cooler_bucket() {
		let map = HeatMap::build(&[0.15, 0.3, 0.45, 0.9]);
		let mut last = HeatBucket(4);
		for step in 0..=200 {
			let bucket = map.heat(step as f64 * 0.01);
			assert!(bucket <= last, "bucket rose at {step}");
			last = bucket;
		}
		assert_eq!(last.index(), 1);
	}

	#[test]
	fn attribute_text_is_parsed() {
		let map = HeatMap::build(&[0.2, 0.4, 0.6]);
		assert_eq!(map.heat_str(" 0.7 ").index(), 1);
		assert_eq!(map.heat_str("n/a").index(), 4);
	}
}
