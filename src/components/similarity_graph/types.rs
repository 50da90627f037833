use serde::Deserialize;

/// Graph payload as served by the exercise graph endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphData {
	pub nodes: Vec<String>,
	pub edges: Vec<EdgeDescriptor>,
}

/// Two students with similar submissions in one or more exercises.
#[derive(Clone, Debug, Deserialize)]
pub struct EdgeDescriptor {
	pub source: String,
	pub target: String,
	#[serde(default)]
	pub matches_in_exercises: Vec<f64>,
}

impl EdgeDescriptor {
	pub fn match_count(&self) -> usize {
		self.matches_in_exercises.len()
	}

	pub fn max_similarity(&self) -> Option<f64> {
		self.matches_in_exercises
			.iter()
			.copied()
			.reduce(f64::max)
	}
}

#[derive(Clone, Debug)]
pub struct GraphNode {
	pub id: String,
	pub label: String,
	pub size: f64,
	pub color: String,
	pub x: f64,
	pub y: f64,
	pub hidden: bool,
}

#[derive(Clone, Debug)]
pub struct GraphEdge {
	pub id: String,
	pub source: usize,
	pub target: usize,
	pub size: f64,
	pub weight: f64,
	pub label: String,
	pub color: String,
	pub hover_color: String,
	/// Highest similarity among the matches; not drawn yet.
	pub max_similarity: Option<f64>,
	pub hidden: bool,
}

impl GraphEdge {
	pub fn touches(&self, node: usize) -> bool {
		self.source == node || self.target == node
	}
}
