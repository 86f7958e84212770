use clap::Args;

use crate::constants;
use crate::relay::TrailingLine;

/// Settings shared by every subcommand. Each one falls back to an environment
/// variable (a `.env` file is loaded first) and then to a built-in default.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Ollama chat endpoint that replies are streamed from.
    #[arg(long, env = "OLLAMA_API_URL", default_value = constants::OLLAMA_API_URL, global = true)]
    pub ollama_url: String,

    /// Model name sent with every upstream request.
    #[arg(long, env = "OLLAMA_MODEL", default_value = constants::OLLAMA_MODEL, global = true)]
    pub model: String,

    /// OpenWeatherMap forecast endpoint.
    #[arg(long, env = "OPENWEATHER_URL", default_value = constants::OPENWEATHER_URL, global = true)]
    pub weather_url: String,

    /// OpenWeatherMap API key.
    #[arg(
        long,
        env = "OPENWEATHER_API_KEY",
        default_value = constants::OPENWEATHER_API_KEY,
        hide_env_values = true,
        global = true
    )]
    pub weather_api_key: String,

    /// Parse a final upstream line that arrives without a trailing newline instead of dropping it.
    #[arg(long, env = "RELAY_PARSE_TRAILING_LINE", global = true)]
    pub parse_trailing_line: bool,
}

impl Config {
    pub fn trailing_line(&self) -> TrailingLine {
        if self.parse_trailing_line {
            TrailingLine::Parse
        } else {
            TrailingLine::Discard
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: constants::OLLAMA_API_URL.to_string(),
            model: constants::OLLAMA_MODEL.to_string(),
            weather_url: constants::OPENWEATHER_URL.to_string(),
            weather_api_key: constants::OPENWEATHER_API_KEY.to_string(),
            parse_trailing_line: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "--ollama-url",
            "http://gpu-box:11434/api/chat",
            "--model",
            "llama3.2",
            "--parse-trailing-line",
        ]);
        assert_eq!(cli.config.ollama_url, "http://gpu-box:11434/api/chat");
        assert_eq!(cli.config.model, "llama3.2");
        assert_eq!(cli.config.trailing_line(), TrailingLine::Parse);
    }

    #[test]
    fn test_default_trailing_line_is_discard() {
        assert_eq!(Config::default().trailing_line(), TrailingLine::Discard);
    }
}
