use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use tracing::{error, info};

use ollama_relay::{chat, constants, web_server, ChatClient, Config};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the streaming relay and the browser chat page.
    Serve {
        #[arg(long, env = "PORT", default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
    },
    /// Chat with the model from the terminal.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (OPENWEATHER_API_KEY, OLLAMA_API_URL, ...)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g. RUST_LOG=info,ollama_relay=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    info!(
        ollama_url = %cli.config.ollama_url,
        model = %cli.config.model,
        "ollama-relay starting with command: {:?}",
        cli.command
    );

    match cli.command {
        Commands::Serve { port } => {
            let state = web_server::AppState::new(&cli.config).context("Failed to build server state")?;

            let mut web_server_handle =
                tokio::spawn(async move { web_server::start_web_server(port, state).await });

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, shutting down...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(Ok(())) => info!("Web server task completed unexpectedly."),
                        Ok(Err(e)) => {
                            error!("Web server failed: {:?}", e);
                            return Err(e);
                        }
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }
            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Chat => {
            let client = ChatClient::new(Client::new(), cli.config.ollama_url.clone(), cli.config.model.clone());
            chat::run_terminal_chat(&client)
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
