pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod ollama;
pub mod prompt;
pub mod relay;
pub mod weather;
pub mod web_server;

pub use config::Config;
pub use error::{ChatError, RelayError};
pub use ollama::{ChatClient, ChatMessage, ChatRequest};
pub use relay::{extract_content, frame_fragments, Fragment, FragmentStream, LineDecoder, Relay, TrailingLine};
pub use weather::WeatherClient;
