pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod source;

pub use document::Document;
pub use error::DocumentError;
pub use id::NodeId;
pub use model::*;
pub use source::{DocumentSource, ElementSource};

// Re-export graph and geometry types so downstream crates share versions.
pub use kurbo;
pub use petgraph::graph::NodeIndex;
