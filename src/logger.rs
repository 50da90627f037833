use log::info;
use web_sys::Element;

use crate::config::LOG_REGION_ID;

/// Developer-facing log lines on the page, mirrored to the console.
#[derive(Clone, Debug, Default)]
pub struct Logger {
	region: Option<Element>,
}

impl Logger {
	/// Binds to the page's log region. Without one, only the console copy is kept.
	pub fn new() -> Self {
		let region = web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.get_element_by_id(LOG_REGION_ID));
		Self { region }
	}

	pub fn with_region(region: Element) -> Self {
		Self {
			region: Some(region),
		}
	}

	/// A logger that only writes to the console.
	pub fn console() -> Self {
		Self { region: None }
	}

	pub fn log(&self, message: &str) {
		info!("{message}");
		if let Some(region) = &self.region {
			let mut text = region.text_content().unwrap_or_default();
			text.push_str(message);
			text.push('\n');
			region.set_text_content(Some(&text));
		}
	}
}
