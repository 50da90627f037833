pub mod quick_review;
pub mod similarity_graph;
