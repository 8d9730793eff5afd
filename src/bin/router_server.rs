use anyhow::Context;
use std::io::{self, BufRead, Write};
use trace_router::server::{handle_line, ServerState};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    trace_router::init_logging()?;
    info!("[Server] Starting trace router server...");

    let mut state = ServerState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("[Server] Error reading stdin: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(&mut state, &line);
        let text = serde_json::to_string(&response).context("serializing response")?;
        writeln!(stdout, "{}", text).context("writing response")?;
        stdout.flush().context("flushing stdout")?;
    }

    info!("[Server] stdin closed, shutting down");
    Ok(())
}
