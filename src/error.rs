use thiserror::Error;
use wasm_bindgen::{JsError, JsValue};

/// Everything that can go wrong between the page and the review server.
#[derive(Debug, Error)]
pub enum Error {
	#[error("no element matches `{0}`")]
	MissingElement(String),

	#[error("element has no `{0}` attribute")]
	MissingAttribute(&'static str),

	#[error("attribute `{name}` has an invalid value: {value:?}")]
	InvalidAttribute { name: &'static str, value: String },

	#[error("request failed: {0}")]
	Transport(String),

	#[error("server answered with HTTP {status}")]
	Http { status: u16 },

	#[error("malformed JSON: {0}")]
	Malformed(String),

	#[error("response contained no data")]
	EmptyData,

	#[error("server did not accept the review")]
	ReviewRejected,

	#[error("DOM call failed: {0}")]
	Dom(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Malformed(err.to_string())
	}
}

impl From<gloo_net::Error> for Error {
	fn from(err: gloo_net::Error) -> Self {
		match err {
			gloo_net::Error::SerdeError(e) => Error::Malformed(e.to_string()),
			other => Error::Transport(other.to_string()),
		}
	}
}

impl From<Error> for JsValue {
	fn from(err: Error) -> Self {
		JsError::new(&err.to_string()).into()
	}
}

/// Formats a thrown JS value for [`Error::Dom`].
pub(crate) fn dom_error(value: JsValue) -> Error {
	Error::Dom(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_errors_map_to_malformed() {
		let err: Error = serde_json::from_str::<serde_json::Value>("{")
			.unwrap_err()
			.into();
		assert!(matches!(err, Error::Malformed(_)));
	}

	#[test]
	fn messages_name_the_problem() {
		let err = Error::InvalidAttribute {
			name: "data-review",
			value: "x".into(),
		};
		assert_eq!(
			err.to_string(),
			"attribute `data-review` has an invalid value: \"x\""
		);
		assert_eq!(Error::Http { status: 404 }.to_string(), "server answered with HTTP 404");
	}
}
