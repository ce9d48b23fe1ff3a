//! Child-process helpers for engines and players

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error};

use crate::error::SpeechError;

/// Substitute `{name}` placeholders in an argument template
pub(crate) fn expand_args(template: &[String], values: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            values.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        })
        .collect()
}

/// Run `program` until it exits
///
/// The child is killed when the returned future is dropped, which is how
/// an aborted playback task stops the audio.
pub(crate) async fn run_to_completion(program: &str, args: &[String]) -> Result<(), SpeechError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program, "Spawning speech process");

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SpeechError::NotAvailable(format!("'{program}' not found. Please install it."))
        } else {
            SpeechError::SynthesisFailed(format!("Failed to run {program}: {e}"))
        }
    })?;

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| SpeechError::SynthesisFailed(format!("Failed to wait for {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(program, status = %output.status, stderr = %stderr.trim(), "Speech process failed");
        return Err(SpeechError::SynthesisFailed(format!(
            "{program} exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}
