pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod metrics;
pub mod server;
pub mod upstream;
pub mod versions;

pub use cache::ContentCache;
pub use config::Config;
pub use content::{ContentHandler, Reply, ResolvedArtifact};
pub use error::{ContentError, Result, SpecServerError};
pub use metrics::{MetricsSink, NoopMetrics, StatsdMetrics};
pub use server::{build_router, start_server, AppState, RunningServer};
pub use upstream::{FetchResult, UpstreamClient};
pub use versions::{VersionMap, VersionResolver, VersionTag};
