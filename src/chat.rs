// Interactive terminal chat against the same model the browser page uses.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::ollama::ChatClient;

const QUIT: &str = "/quit";

/// Chat over stdin/stdout until EOF or `/quit`.
pub async fn run_terminal_chat(client: &ChatClient) -> Result<()> {
    let turns = run_chat(client, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!(turns, "Chat session finished");
    Ok(())
}

/// Drive one chat session over arbitrary input and output; returns the number of answered turns.
///
/// Upstream failures are printed and the session continues.
pub async fn run_chat<R, W>(client: &ChatClient, input: R, mut output: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut turns = 0;

    output
        .write_all(format!("Chatting with {} ({} to exit)\n> ", client.model(), QUIT).as_bytes())
        .await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await.context("Failed to read chat input")? {
        let message = line.trim();
        if message == QUIT {
            break;
        }
        if !message.is_empty() {
            let reply = match client.chat(message).await {
                Ok(reply) => {
                    turns += 1;
                    reply
                }
                Err(e) => {
                    warn!("Chat turn failed: {}", e);
                    e.to_string()
                }
            };
            output.write_all(format!("{reply}\n").as_bytes()).await?;
        }
        output.write_all(b"> ").await?;
        output.flush().await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(turns)
}
