//! JSON-lines transport for the editing API.
//!
//! One request per input line, one response per output line. The studio
//! only talks to the process that launched it.

use std::path::Path;
use std::sync::Arc;

use deck_core::{DeckConfig, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::autosave::spawn_autosave;
use crate::commands::{handle_line, Response};
use crate::state::StudioState;

/// Answer requests from `reader` until it closes.
pub async fn serve<R, W>(state: Arc<StudioState>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let worker = Arc::clone(&state);
        let response = tokio::task::spawn_blocking(move || handle_line(&worker, &line))
            .await
            .unwrap_or_else(|e| Response::failure("RUNTIME_ERROR", format!("Request worker failed: {}", e)));

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Open the studio for `project` and serve stdin/stdout until stdin closes.
///
/// Autosave runs in the background; unsaved edits are saved once more on exit.
pub async fn run_stdio(project: &Path, config: DeckConfig) -> Result<()> {
    let state = Arc::new(StudioState::open(project, config)?);
    for warning in &state.context().warnings {
        log::warn!("{}", warning);
    }
    let autosave = spawn_autosave(Arc::clone(&state));

    let served = serve(
        Arc::clone(&state),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    if let Some(handle) = autosave {
        handle.shutdown().await;
    }
    let final_save = tokio::task::spawn_blocking({
        let state = Arc::clone(&state);
        move || state.autosave()
    })
    .await;
    match final_save {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => log::warn!("Final session save failed: {}", e),
        Err(e) => log::warn!("Final session save worker failed: {}", e),
    }
    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::open_state;
    use serde_json::Value;

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let (_dir, state) = open_state(false);
        let input = b"{\"command\": \"validate\"}\n\n{\"command\": \"get_session\"}\nnot json\n";
        let mut output = Vec::new();

        serve(Arc::new(state), BufReader::new(&input[..]), &mut output)
            .await
            .unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert!(responses[0]["data"]["quality_report"].is_object());
        assert!(responses[1]["data"]["session"]["slide_order"].is_array());
        assert_eq!(responses[2]["ok"], false);
    }
}
