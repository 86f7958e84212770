//! Line-delimited JSON relay from Ollama's streaming chat endpoint.
//!
//! Ollama answers a `stream: true` chat request with one JSON object per line:
//! ```text
//! {"model":"gemma3:1b","message":{"role":"assistant","content":"Hel"},"done":false}
//! {"model":"gemma3:1b","message":{"role":"assistant","content":"lo"},"done":false}
//! ```
//! The transport chunks those bytes arbitrarily. [`LineDecoder`] reassembles
//! complete lines, [`extract_content`] pulls the text out of each one and
//! [`frame_fragments`] turns the whole byte stream into [`Fragment`]s that are
//! re-serialized as `{"result": ...}` lines for the caller.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::RelayError;
use crate::ollama::ChatRequest;

/// What to do with bytes left in the buffer when upstream closes without a final newline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingLine {
    /// Drop the residue. A reply whose last record lacks a newline loses that record.
    #[default]
    Discard,
    /// Try to parse the residue as one last record on a clean end of stream.
    Parse,
}

/// One forwarded piece of model output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub result: String,
}

impl Fragment {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }

    /// Parse one upstream line. `None` for blank, malformed or content-free lines.
    pub fn from_line(line: &str) -> Option<Self> {
        extract_content(line).map(Self::new)
    }

    /// `{"result": ...}` followed by a newline.
    pub fn to_json_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"));
        line.push('\n');
        line
    }
}

/// Pull the text out of one upstream record: `message.content` first, then `response`.
///
/// Empty strings count as missing. Anything that is not valid JSON yields `None`.
pub fn extract_content(line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }

    let record: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, line, "Skipping non-JSON upstream line");
            return None;
        }
    };

    let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_owned);

    let content = non_empty(&record["message"]["content"]).or_else(|| non_empty(&record["response"]));
    if content.is_none() {
        debug!(line, "Upstream line carries no content");
    }
    content
}

/// Incremental UTF-8 decoder and newline framer for one relay session.
///
/// `buffer` only ever holds the unterminated tail of what has been received;
/// `pending` holds the leading bytes of a UTF-8 sequence cut by a chunk boundary.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    buffer: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completes, terminators excluded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        self.pending.extend_from_slice(chunk);
        self.decode_pending();

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.buffer, tail);
        complete.pop(); // the final '\n'
        complete.split('\n').map(str::to_owned).collect()
    }

    /// End of input. Returns the unterminated tail if it holds anything but whitespace.
    pub fn finish(mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&rest));
        }
        if self.buffer.trim().is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }

    /// Move every complete UTF-8 sequence from `pending` into `buffer`.
    fn decode_pending(&mut self) {
        let bytes = std::mem::take(&mut self.pending);
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Truncated sequence at the end: wait for the next chunk.
                        None => {
                            rest = after;
                            break;
                        }
                        Some(len) => {
                            warn!(len, "Replacing invalid UTF-8 in upstream stream");
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
    }
}

/// Frame a chunked byte stream into fragments.
///
/// Fragments are yielded as soon as the line that carries them is complete.
/// The first upstream error is yielded as-is and ends the stream.
pub fn frame_fragments<S, B, E>(chunks: S, trailing: TrailingLine) -> impl Stream<Item = Result<Fragment, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    async_stream::stream! {
        let mut decoder = LineDecoder::new();
        let mut chunks = std::pin::pin!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for line in decoder.push(chunk.as_ref()) {
                if let Some(fragment) = Fragment::from_line(&line) {
                    yield Ok(fragment);
                }
            }
        }

        if let Some(residue) = decoder.finish() {
            match trailing {
                TrailingLine::Discard => {
                    debug!(len = residue.len(), "Discarding unterminated trailing line");
                }
                TrailingLine::Parse => {
                    if let Some(fragment) = Fragment::from_line(&residue) {
                        yield Ok(fragment);
                    }
                }
            }
        }
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, RelayError>> + Send>>;

/// A configured relay to one upstream chat endpoint. Cheap to clone; every call
/// to [`Relay::relay`] is an independent session.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    endpoint: Url,
    trailing: TrailingLine,
}

impl Relay {
    pub fn new(client: Client, endpoint: &str) -> Result<Self, RelayError> {
        let endpoint = Url::parse(endpoint).map_err(|e| RelayError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RelayError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: format!("unsupported scheme {:?}", endpoint.scheme()),
            });
        }

        Ok(Self {
            client,
            endpoint,
            trailing: TrailingLine::default(),
        })
    }

    pub fn with_trailing_line(mut self, trailing: TrailingLine) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Open a streaming chat request and return its fragments.
    ///
    /// Dropping the returned stream drops the upstream response and closes the connection.
    #[instrument(skip(self, payload), fields(endpoint = %self.endpoint, model = %payload.model))]
    pub async fn relay(&self, payload: &ChatRequest) -> Result<FragmentStream, RelayError> {
        let payload = payload.clone().streaming();

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Ollama streaming request failed");
            return Err(RelayError::UpstreamStatus { status, body });
        }

        info!(status = %response.status(), "Upstream stream opened");

        let fragments = frame_fragments(response.bytes_stream(), self.trailing)
            .map(|item| item.map_err(RelayError::from));
        Ok(Box::pin(fragments))
    }
}
