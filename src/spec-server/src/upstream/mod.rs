pub mod client;

pub use client::{FetchResult, UpstreamClient};
