pub mod config;
pub mod error;
pub mod fence;
pub mod json_utils;

// Convenient re-exports
pub use config::ExtractConfig;
pub use error::ExtractError;
pub use json_utils::{extract, extract_as, extract_from_reader, extract_value, JsonMap};
