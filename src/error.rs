use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No balanced JSON object found in input ({raw_len} bytes)")]
    NoObject { raw_len: usize },
    #[error("JSON deserialization error: {0}. Candidate: {1}")]
    JsonDeserialization(#[source] serde_json::Error, String),
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// True when the input was read but held no decodable object.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::NoObject { .. } | Self::JsonDeserialization(..))
    }
}
