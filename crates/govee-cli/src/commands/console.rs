//! Console command implementation.
//!
//! Reads one command per line (`power on`, `color3 #ff8000`, `asm r/01,04`)
//! and prints the JSON result. `quit` or end of input leaves.

use anyhow::{Context, Result};
use govee_cli::{Config, handle_command};
use govee_core::{Light, LightEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::DeviceArgs;
use crate::util::{command_timeout, connect_light};

/// Split a console line into command and data.
fn split_line(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((command, data)) => (command, data.trim_start()),
        None => (line, ""),
    }
}

fn print_events(light: &Light, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    let mut events = light.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(LightEvent::Send { frame }) => eprintln!("-> {}", frame),
                    Ok(LightEvent::Recv { key, value }) => eprintln!("<- {} {}", key, value),
                    Ok(other) => eprintln!("!! {:?}", other),
                    Err(RecvError::Lagged(n)) => warn!("Missed {} events", n),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    })
}

pub async fn cmd_console(args: &DeviceArgs, events: bool, config: &Config) -> Result<()> {
    let light = connect_light(args, config).await?;
    let limit = command_timeout(config);

    let cancel = CancellationToken::new();
    let printer = events.then(|| print_events(&light, cancel.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"Command: ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let (command, data) = split_line(&line);
        match command {
            "" => continue,
            "quit" | "exit" => break,
            _ => {}
        }
        if !light.is_connected() {
            eprintln!("Light disconnected");
            break;
        }

        let result = handle_command(&light, command, data, limit).await;
        println!("{}", result);
    }

    cancel.cancel();
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    light.disconnect().await.context("Failed to disconnect")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("  power on "), ("power", "on"));
        assert_eq!(split_line("poke 04  32"), ("poke", "04  32"));
        assert_eq!(split_line("mode"), ("mode", ""));
        assert_eq!(split_line("   "), ("", ""));
    }
}
