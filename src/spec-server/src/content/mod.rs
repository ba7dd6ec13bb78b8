pub mod handler;
pub mod render;
pub mod types;

pub use handler::{ContentHandler, LocalOverrides, Reply, ResolvedArtifact};
