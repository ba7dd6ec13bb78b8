pub mod map;
pub mod resolver;

pub use map::{is_alpha, HealthSnapshot, VersionMap, VersionTag};
pub use resolver::VersionResolver;
