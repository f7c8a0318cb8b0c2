//! Headless host event loop.
//!
//! Single-threaded: reads one JSON line at a time, fires handoff timers when
//! they come due and writes everything the host did as JSON lines.

use crate::ipc::commands::{handle_command, handle_content_message};
use crate::ipc::{HostCommand, IpcResponse};
use crate::state::AppState;
use crate::surface::ActionLog;
use shopview_core::{Clock, Millis, ShopviewResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Wake-up interval when no timer is pending
const IDLE_WAIT_MS: Millis = 60_000;

/// Handle one input line. Returns the reply for commands; content messages
/// get none.
pub fn handle_line(state: &Arc<Mutex<AppState>>, now: Millis, line: &str) -> Option<IpcResponse> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Ok(command) = serde_json::from_str::<HostCommand>(line) {
        return Some(handle_command(state, now, command));
    }
    if is_command_like(line) {
        return Some(IpcResponse::error("Unknown or malformed command"));
    }
    handle_content_message(state, now, line);
    None
}

fn is_command_like(line: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(line)
        .map(|value| value.get("cmd").is_some())
        .unwrap_or(false)
}

fn wait_for(state: &Arc<Mutex<AppState>>, now: Millis) -> Duration {
    let deadline = state.lock().ok().and_then(|state| state.next_deadline());
    let wait = match deadline {
        Some(deadline) => deadline.saturating_sub(now),
        None => IDLE_WAIT_MS,
    };
    Duration::from_millis(wait)
}

async fn write_json<W, T>(writer: &mut W, value: &T) -> ShopviewResult<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

async fn flush_actions<W>(log: &ActionLog, writer: &mut W) -> ShopviewResult<()>
where
    W: AsyncWrite + Unpin,
{
    for action in log.drain() {
        write_json(writer, &action).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Run until `input` is exhausted.
pub async fn run<C, R, W>(
    state: Arc<Mutex<AppState>>,
    log: ActionLog,
    clock: C,
    input: R,
    mut output: W,
) -> ShopviewResult<()>
where
    C: Clock,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    info!("Host loop started");

    loop {
        let wait = wait_for(&state, clock.now_ms());
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                let reply = handle_line(&state, clock.now_ms(), &line);
                flush_actions(&log, &mut output).await?;
                if let Some(reply) = reply {
                    write_json(&mut output, &reply).await?;
                    output.flush().await?;
                }
            }
            _ = tokio::time::sleep(wait) => {
                if let Ok(mut state) = state.lock() {
                    state.poll(clock.now_ms());
                }
                flush_actions(&log, &mut output).await?;
            }
        }
    }

    flush_actions(&log, &mut output).await?;
    info!("Host loop stopped");
    Ok(())
}
