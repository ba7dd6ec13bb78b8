pub mod content;

pub use content::ContentCache;
