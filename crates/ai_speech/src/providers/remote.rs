//! Remote speech proxy adapter
//!
//! Posts the reply to a TTS proxy, which answers with base64 audio. The
//! audio is written to a temporary file, played with a local player and
//! deleted again whichever way the playback ends.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::process::{expand_args, run_to_completion};
use crate::config::RemoteSynthesizerConfig;
use crate::error::SpeechError;
use crate::ports::{SpeechSynthesizer, SynthesisEvent, validate_text};
use crate::session::Session;

/// Synthesizer backed by a remote TTS proxy
#[derive(Debug)]
pub struct RemoteProxySynthesizer {
    client: Client,
    config: Arc<RemoteSynthesizerConfig>,
    session: Arc<Session<SynthesisEvent>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    text: &'a str,
    speaking_rate: f32,
    pitch: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyResponse {
    audio: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyError {
    error: String,
}

impl RemoteProxySynthesizer {
    /// Create a new remote synthesizer
    pub fn new(config: RemoteSynthesizerConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SpeechError::Configuration(e.to_string()))?;

        info!(url = %config.url, player = %config.player, "Initialized remote synthesizer");

        Ok(Self {
            client,
            config: Arc::new(config),
            session: Arc::new(Session::new()),
        })
    }
}

/// Cut text to at most `max_chars` characters, preferring a word boundary
fn truncate_for_proxy(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        None => text,
        Some((end, _)) => {
            let head = &text[..end];
            let cut = head.rfind(char::is_whitespace).unwrap_or(end);
            warn!(max_chars, "Reply too long for the speech proxy; truncating");
            head[..cut].trim_end()
        },
    }
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.unwrap_or_default() {
        "audio/wav" | "audio/x-wav" | "audio/wave" => ".wav",
        "audio/ogg" | "audio/opus" => ".ogg",
        _ => ".mp3",
    }
}

fn transport_error(err: &reqwest::Error, timeout_ms: u64) -> SpeechError {
    if err.is_timeout() {
        SpeechError::Timeout(timeout_ms)
    } else {
        SpeechError::Network(err.to_string())
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> SpeechError {
    let message = serde_json::from_str::<ProxyError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| format!("HTTP {status}"));
    match status.as_u16() {
        400 => SpeechError::InvalidInput(message),
        429 => SpeechError::RateLimited,
        503 => SpeechError::ServiceUnavailable(message),
        _ => SpeechError::SynthesisFailed(format!("TTS request failed: {message}")),
    }
}

async fn fetch_audio(
    client: &Client,
    config: &RemoteSynthesizerConfig,
    text: &str,
) -> Result<(Vec<u8>, Option<String>), SpeechError> {
    let body = ProxyRequest {
        text,
        speaking_rate: config.speaking_rate,
        pitch: config.pitch,
        voice_name: config.voice_name.as_deref(),
    };

    let response = client
        .post(&config.url)
        .json(&body)
        .send()
        .await
        .map_err(|e| transport_error(&e, config.timeout_ms))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = status_error(status, &body);
        warn!(status = %status, error = %err, "Speech proxy request failed");
        return Err(err);
    }

    let payload: ProxyResponse = response.json().await.map_err(|e| {
        if e.is_timeout() {
            SpeechError::Timeout(config.timeout_ms)
        } else {
            SpeechError::SynthesisFailed(format!("Invalid TTS response: {e}"))
        }
    })?;

    let audio = STANDARD
        .decode(payload.audio.as_bytes())
        .map_err(|e| SpeechError::SynthesisFailed(format!("Invalid audio payload: {e}")))?;
    if audio.is_empty() {
        return Err(SpeechError::SynthesisFailed("Empty audio payload".to_string()));
    }

    debug!(bytes = audio.len(), content_type = ?payload.content_type, "Fetched speech audio");
    Ok((audio, payload.content_type))
}

async fn play(
    config: &RemoteSynthesizerConfig,
    audio: &[u8],
    content_type: Option<&str>,
) -> Result<(), SpeechError> {
    // Deleted when dropped: after playback, on failure, or when the task is aborted
    let file = tempfile::Builder::new()
        .prefix("palaver-tts-")
        .suffix(extension_for(content_type))
        .tempfile()
        .map_err(|e| SpeechError::SynthesisFailed(format!("Failed to create temp file: {e}")))?;

    tokio::fs::write(file.path(), audio)
        .await
        .map_err(|e| SpeechError::SynthesisFailed(format!("Failed to write audio: {e}")))?;

    let path = file.path().to_string_lossy();
    let args = expand_args(&config.player_args, &[("file", path.as_ref())]);
    run_to_completion(&config.player, &args).await
}

async fn speak_remote(
    client: &Client,
    config: &RemoteSynthesizerConfig,
    text: &str,
) -> Result<(), SpeechError> {
    let (audio, content_type) = fetch_audio(client, config, text).await?;
    play(config, &audio, content_type.as_deref()).await
}

impl SpeechSynthesizer for RemoteProxySynthesizer {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let text = truncate_for_proxy(validate_text(text)?, self.config.max_chars).to_string();

        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let id = self.session.replace();
        let session = Arc::clone(&self.session);

        let task = tokio::spawn(async move {
            let event = match speak_remote(&client, &config, &text).await {
                Ok(()) => SynthesisEvent::Finished,
                Err(e) => SynthesisEvent::Failed(e),
            };
            session.finish(id, event);
        });
        self.session.attach(id, task);
        Ok(())
    }

    fn stop(&self) {
        if self.session.stop() {
            debug!("Remote speech stopped");
        }
    }

    fn is_speaking(&self) -> bool {
        self.session.is_active()
    }

    fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent> {
        self.session.subscribe()
    }
}
