use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::ops::Range;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument, trace};

use crate::error::ExtractError;
use crate::fence::{has_fence, strip_fence};

/// Decoded top-level object. Keys keep the order they appear in the document.
pub type JsonMap = Map<String, Value>;

/// Brace/quote automaton. Works on bytes: every structural character is ASCII,
/// so offsets it reports always land on UTF-8 char boundaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanState {
    pub depth: usize,
    pub in_string: bool,
    pub escaped: bool,
}

impl ScanState {
    /// Advance over one byte. Returns true when this byte closes the outermost object.
    pub fn step(&mut self, b: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
                return false;
            }
            match b {
                b'\\' => self.escaped = true,
                b'"' => self.in_string = false,
                _ => {}
            }
            return false;
        }

        match b {
            b'"' => self.in_string = true,
            b'{' => self.depth += 1,
            // A stray `}` outside any object is ignored.
            b'}' if self.depth > 0 => {
                self.depth -= 1;
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }
}

/// Byte range of the first balanced `{...}` span (end exclusive).
///
/// The first `{` in the text is taken as the object start; there is no retry
/// from a later brace if that one never balances.
#[instrument(target = "llm_json_extract::scan", skip(text), fields(text_len = text.len()))]
pub fn find_object_span(text: &str) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;

    let mut state = ScanState::default();
    for (i, &b) in bytes[start..].iter().enumerate() {
        if state.step(b) {
            let end = start + i + 1;
            debug!(target = "llm_json_extract::scan", start, end, "found balanced object");
            return Some(start..end);
        }
    }

    debug!(
        target = "llm_json_extract::scan",
        start,
        depth = state.depth,
        "braces never balanced"
    );
    None
}

/// Incremental variant of [`find_object_span`] for text arriving in chunks.
///
/// Ranges are absolute offsets into the concatenation of every fed chunk.
#[derive(Debug, Default)]
pub struct ObjectScanner {
    state: ScanState,
    start: Option<usize>,
    span: Option<Range<usize>>,
    /// Bytes consumed so far across all chunks.
    offset: usize,
}

impl ObjectScanner {
    pub fn new() -> Self { Self::default() }

    /// Feed the next chunk. Returns the object's range the first time it closes.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Range<usize>> {
        if self.span.is_some() {
            self.offset += chunk.len();
            return None;
        }

        let mut found = None;
        for (i, &b) in chunk.iter().enumerate() {
            let idx = self.offset + i;
            let start = match self.start {
                Some(start) => start,
                None if b == b'{' => {
                    self.start = Some(idx);
                    idx
                }
                None => continue,
            };
            if self.state.step(b) {
                found = Some(start..idx + 1);
                break;
            }
        }

        self.offset += chunk.len();
        if let Some(span) = &found {
            trace!(
                target = "llm_json_extract::scan",
                start = span.start,
                end = span.end,
                "object closed"
            );
            self.span = Some(span.clone());
        }
        found
    }

    pub fn span(&self) -> Option<Range<usize>> {
        self.span.clone()
    }

    pub fn is_done(&self) -> bool {
        self.span.is_some()
    }

    /// An object start was seen but has not closed yet.
    pub fn is_open(&self) -> bool {
        self.start.is_some() && self.span.is_none()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The substring handed to the JSON decoder, after fence removal.
pub fn candidate(text: &str) -> Option<&str> {
    let body = strip_fence(text);
    find_object_span(body).map(|span| &body[span])
}

/// Extract the first JSON object in `text` and decode it into `T`.
#[instrument(target = "llm_json_extract::extract", skip(text), fields(text_len = text.len()))]
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    let fenced = has_fence(text);
    let slice = candidate(text).ok_or_else(|| {
        debug!(target = "llm_json_extract::extract", fenced, "no candidate object");
        ExtractError::NoObject { raw_len: text.len() }
    })?;
    serde_json::from_str::<T>(slice).map_err(|e| {
        debug!(
            target = "llm_json_extract::extract",
            error = %e,
            fenced,
            candidate_len = slice.len(),
            "candidate failed to decode"
        );
        ExtractError::JsonDeserialization(e, slice.to_string())
    })
}

/// Extract the first JSON object in `text` as a key/value map.
///
/// Handles a wrapping markdown fence (```` ```json ```` in any case), prose before
/// and after the object, and braces or escaped quotes inside string values.
/// Failing to find a balanced span and failing to decode it are both errors.
pub fn extract(text: &str) -> Result<JsonMap, ExtractError> {
    extract_as::<JsonMap>(text)
}

/// Same as [`extract`], wrapped as `Value::Object`.
pub fn extract_value(text: &str) -> Result<Value, ExtractError> {
    extract(text).map(Value::Object)
}

/// Read from `reader` until the first object closes, then decode it.
///
/// Reading stops early once the object is complete; the rest of the stream is
/// left unread. Fence lines contain no braces and are skipped like any prose.
pub async fn extract_from_reader<R>(
    mut reader: R,
    buf_size: usize,
) -> Result<JsonMap, ExtractError>
where
    R: AsyncRead + Unpin,
{
    let mut scanner = ObjectScanner::new();
    let mut accum: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; buf_size.max(1024)];

    let span = loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break None;
        }
        // Bytes before the object start are never needed again.
        if !scanner.is_open() && !scanner.is_done() {
            accum.clear();
        }
        // Absolute offset of accum[0].
        let kept_from = scanner.offset - accum.len();
        accum.extend_from_slice(&buf[..n]);
        if let Some(span) = scanner.feed(&buf[..n]) {
            break Some((span.start - kept_from)..(span.end - kept_from));
        }
    };

    debug!(
        target = "llm_json_extract::extract",
        read = scanner.offset,
        found = span.is_some(),
        "reader scan complete"
    );
    let span = span.ok_or(ExtractError::NoObject { raw_len: scanner.offset })?;
    let slice = &accum[span];
    serde_json::from_slice::<JsonMap>(slice).map_err(|e| {
        ExtractError::JsonDeserialization(e, String::from_utf8_lossy(slice).into_owned())
    })
}
