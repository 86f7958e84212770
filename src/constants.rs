// Defaults for settings that can be overridden from the command line or environment.

pub const OLLAMA_API_URL: &str = "http://localhost:11434/api/chat";
pub const OLLAMA_MODEL: &str = "gemma3:1b";
pub const OPENWEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/forecast";
pub const OPENWEATHER_API_KEY: &str = "YOUR_API_KEY_HERE";
pub const DEFAULT_PORT: u16 = 5001;

pub const DEFAULT_LOCATION: &str = "Hyderabad";
pub const DEFAULT_DATE: &str = "today";

/// Timeout for one-shot (non-streaming) chat requests, in seconds
pub const CHAT_TIMEOUT_SECS: u64 = 60;

/// Reply used when the model answers without a `message.content` field
pub const NO_RESPONSE: &str = "No response.";
