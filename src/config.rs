use std::env;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_READ_BUF: usize = 8192;
const MIN_READ_BUF: usize = 1024;

/// Output and I/O settings shared by the CLI and library callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Pretty-print extracted JSON
    pub pretty: bool,
    /// Chunk size for streaming reads
    pub read_buf: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { pretty: false, read_buf: DEFAULT_READ_BUF }
    }
}

impl ExtractConfig {
    pub const PRETTY_KEY: &'static str = "JSON_EXTRACT_PRETTY";
    pub const READ_BUF_KEY: &'static str = "JSON_EXTRACT_READ_BUF";

    /// Load from environment variables, reading a `.env` file first if present.
    pub fn from_env() -> Self {
        // Silently fail if there is no .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Bad values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let pretty = parse_or(Self::PRETTY_KEY, lookup(Self::PRETTY_KEY), defaults.pretty);
        let read_buf = parse_or(Self::READ_BUF_KEY, lookup(Self::READ_BUF_KEY), defaults.read_buf);
        Self::default().with_pretty(pretty).with_read_buf(read_buf)
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Values below 1024 are raised to 1024.
    pub fn with_read_buf(mut self, read_buf: usize) -> Self {
        self.read_buf = read_buf.max(MIN_READ_BUF);
        self
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().to_lowercase().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable config value");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_gives_defaults() {
        assert_eq!(ExtractConfig::from_lookup(|_| None), ExtractConfig::default());
    }

    #[test]
    fn reads_values() {
        let config = ExtractConfig::from_lookup(lookup(&[
            (ExtractConfig::PRETTY_KEY, "TRUE"),
            (ExtractConfig::READ_BUF_KEY, "65536"),
        ]));
        assert!(config.pretty);
        assert_eq!(config.read_buf, 65536);
    }

    #[test]
    fn bad_values_fall_back() {
        let config = ExtractConfig::from_lookup(lookup(&[
            (ExtractConfig::PRETTY_KEY, "sometimes"),
            (ExtractConfig::READ_BUF_KEY, "12"),
        ]));
        assert!(!config.pretty);
        assert_eq!(config.read_buf, 1024);
    }
}
