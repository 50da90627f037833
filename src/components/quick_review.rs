use std::cell::RefCell;
use std::rc::Rc;

use gloo_net::http::Request;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlButtonElement, MouseEvent};

use crate::config::{ReviewAction, ReviewConfig};
use crate::error::{Error, Result, dom_error};
use crate::logger::Logger;

const BUTTON_STYLES: [&str; 6] = [
	"btn-default",
	"btn-primary",
	"btn-success",
	"btn-info",
	"btn-warning",
	"btn-danger",
];

/// The rating a control currently displays.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewState {
	pub rating: i32,
	pub label: String,
	pub style: String,
}

impl From<ReviewAction> for ReviewState {
	fn from(action: ReviewAction) -> Self {
		Self {
			rating: action.rating,
			label: action.label,
			style: action.style,
		}
	}
}

/// Client-side copy of the server's review state. Only moves on acknowledgment.
#[derive(Clone, Debug, Default)]
pub struct ReviewMirror {
	shown: Option<ReviewState>,
}

impl ReviewMirror {
	pub fn shown(&self) -> Option<&ReviewState> {
		self.shown.as_ref()
	}

	pub fn show(&mut self, state: ReviewState) {
		self.shown = Some(state);
	}

	/// Applies the outcome of submitting `chosen`. Returns whether the display changes.
	pub fn settle(&mut self, chosen: ReviewState, outcome: &Result<()>) -> bool {
		if outcome.is_err() {
			return false;
		}
		self.shown = Some(chosen);
		true
	}
}

#[derive(Serialize)]
struct ReviewForm<'a> {
	csrfmiddlewaretoken: &'a str,
	review: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReviewResponse {
	#[serde(default)]
	pub success: bool,
}

impl ReviewResponse {
	pub fn into_result(self) -> Result<()> {
		if self.success {
			Ok(())
		} else {
			Err(Error::ReviewRejected)
		}
	}
}

pub fn encode_form(config: &ReviewConfig, rating: i32) -> Result<String> {
	serde_urlencoded::to_string(ReviewForm {
		csrfmiddlewaretoken: &config.csrf_token,
		review: rating,
	})
	.map_err(|e| Error::Malformed(e.to_string()))
}

/// Posts one rating. The server only answers JSON to requests marked as XHR.
pub async fn post_review(config: &ReviewConfig, rating: i32) -> Result<()> {
	let response = Request::post(&config.action)
		.header("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
		.header("X-Requested-With", "XMLHttpRequest")
		.header("Accept", "application/json")
		.body(encode_form(config, rating)?)?
		.send()
		.await?;
	if !response.ok() {
		return Err(Error::Http {
			status: response.status(),
		});
	}
	response.json::<ReviewResponse>().await?.into_result()
}

/// The `.btn-group` around a clicked review link, or `fallback` outside one.
pub fn review_group(anchor: &Element, fallback: &Element) -> Element {
	anchor
		.closest(".btn-group")
		.ok()
		.flatten()
		.unwrap_or_else(|| fallback.clone())
}

/// Restyles the group's button to show `state`.
pub fn show(group: &Element, state: &ReviewState) -> Result<()> {
	let button = group
		.query_selector("button")
		.map_err(dom_error)?
		.ok_or_else(|| Error::MissingElement("button".into()))?;
	let classes = button.class_list();
	for style in BUTTON_STYLES {
		classes.remove_1(style).map_err(dom_error)?;
	}
	classes
		.add_1(&format!("btn-{}", state.style))
		.map_err(dom_error)?;
	if let Some(button) = button.dyn_ref::<HtmlButtonElement>() {
		button.set_value(&state.rating.to_string());
	}
	if let Some(text) = button.query_selector(".text").map_err(dom_error)? {
		text.set_text_content(Some(&state.label));
	}
	Ok(())
}

/// An inline rating form: a button showing the current rating plus one link per rating.
pub struct QuickReview {
	container: Element,
	config: ReviewConfig,
	logger: Logger,
	mirror: RefCell<ReviewMirror>,
}

impl QuickReview {
	/// Shows the preselected rating and wires every rating link to submit.
	pub fn attach(container: Element, logger: Logger) -> Result<Rc<Self>> {
		let config = ReviewConfig::from_element(&container)?;
		let control = Rc::new(Self {
			container,
			config,
			logger,
			mirror: RefCell::new(ReviewMirror::default()),
		});
		control.show_current()?;

		let links = control.container.query_selector_all("a").map_err(dom_error)?;
		for i in 0..links.length() {
			let Some(link) = links.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
				continue;
			};
			let (control, anchor) = (control.clone(), link.clone());
			let on_click = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
				ev.prevent_default();
				let action = match ReviewAction::from_element(&anchor) {
					Ok(action) => action,
					Err(e) => {
						warn!("ignoring review link: {e}");
						return;
					}
				};
				let (control, anchor) = (control.clone(), anchor.clone());
				spawn_local(async move { control.submit(&anchor, action).await });
			});
			link.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
				.map_err(dom_error)?;
			// Listeners live as long as the page.
			on_click.forget();
		}
		Ok(control)
	}

	pub fn shown(&self) -> Option<ReviewState> {
		self.mirror.borrow().shown().cloned()
	}

	fn show_current(&self) -> Result<()> {
		let Some(button) = self.container.query_selector("button").map_err(dom_error)? else {
			return Ok(());
		};
		let value = button
			.dyn_ref::<HtmlButtonElement>()
			.map(HtmlButtonElement::value)
			.unwrap_or_default();
		let selector = format!("a[data-review=\"{}\"]", value.replace('"', "\\\""));
		let Some(anchor) = self.container.query_selector(&selector).map_err(dom_error)? else {
			return Ok(());
		};
		let state = ReviewState::from(ReviewAction::from_element(&anchor)?);
		show(&self.container, &state)?;
		self.mirror.borrow_mut().show(state);
		Ok(())
	}

	async fn submit(&self, anchor: &Element, action: ReviewAction) {
		let outcome = post_review(&self.config, action.rating).await;
		let chosen = ReviewState::from(action);
		if !self.mirror.borrow_mut().settle(chosen.clone(), &outcome) {
			if let Err(e) = outcome {
				debug!("review not stored: {e}");
			}
			return;
		}
		self.logger.log("Review stored.");
		let group = review_group(anchor, &self.container);
		if let Err(e) = show(&group, &chosen) {
			warn!("could not show review: {e}");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn state(rating: i32, label: &str, style: &str) -> ReviewState {
		ReviewState {
			rating,
			label: label.into(),
			style: style.into(),
		}
	}

	#[test]
	fn acknowledged_reviews_update_the_display() {
		let mut mirror = ReviewMirror::default();
		assert!(mirror.settle(state(5, "Plagiate", "danger"), &Ok(())));
		assert_eq!(mirror.shown(), Some(&state(5, "Plagiate", "danger")));
		assert!(mirror.settle(state(1, "Fine", "success"), &Ok(())));
		assert_eq!(mirror.shown().map(|s| s.rating), Some(1));
	}

	#[test]
	fn failed_reviews_leave_the_display_alone() {
		let mut mirror = ReviewMirror::default();
		mirror.show(state(3, "Suspicious", "warning"));
		assert!(!mirror.settle(state(5, "Plagiate", "danger"), &Err(Error::ReviewRejected)));
		assert!(!mirror.settle(state(6, "x", "danger"), &Err(Error::Http { status: 500 })));
		assert_eq!(mirror.shown(), Some(&state(3, "Suspicious", "warning")));
	}

	#[test]
	fn unset_stays_unset_on_failure() {
		let mut mirror = ReviewMirror::default();
		mirror.settle(state(2, "Ok", "info"), &Err(Error::Transport("offline".into())));
		assert!(mirror.shown().is_none());
	}

	#[test]
	fn responses_need_an_explicit_success() {
		let ok: ReviewResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
		assert!(ok.into_result().is_ok());
		let rejected: ReviewResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
		assert!(matches!(rejected.into_result(), Err(Error::ReviewRejected)));
		let missing: ReviewResponse = serde_json::from_str("{}").unwrap();
		assert!(missing.into_result().is_err());
	}

	#[test]
	fn form_body_carries_token_and_rating() {
		let config = ReviewConfig {
			action: "/review/1".into(),
			csrf_token: "a b&c".into(),
		};
		assert_eq!(
			encode_form(&config, 4).unwrap(),
			"csrfmiddlewaretoken=a+b%26c&review=4"
		);
	}
}
