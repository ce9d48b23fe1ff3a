//! Speech ports - capability interfaces for capture and synthesis
//!
//! Both ports are event based: starting a session returns immediately and the
//! outcome is published on a broadcast channel obtained from `subscribe()`.
//! Implementations must be usable from inside a Tokio runtime.

use tokio::sync::broadcast;

use crate::error::SpeechError;

/// Terminal outcome of one capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Non-empty recognized text
    Recognized(String),
    /// Capture failed or heard nothing
    Failed(SpeechError),
}

/// Terminal outcome of one playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    /// Playback completed naturally
    Finished,
    /// Synthesis or playback failed
    Failed(SpeechError),
}

/// Speech-to-text source with single-session semantics
///
/// Every session that is not stopped explicitly ends with exactly one
/// [`CaptureEvent`]. A session stopped through [`SpeechCapture::stop_recording`]
/// emits nothing.
pub trait SpeechCapture: Send + Sync {
    /// Ask for microphone/recognition access; idempotent and non-blocking
    fn request_permission(&self);

    /// Begin a session; returns `false` without side effects if one is active
    fn start_recording(&self) -> bool;

    /// End the active session, if any
    fn stop_recording(&self);

    /// Whether a session is active
    fn is_recording(&self) -> bool;

    /// Receive terminal events of future sessions
    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent>;
}

/// Text-to-speech playback with interrupt-and-replace semantics
///
/// Every playback that is not stopped ends with exactly one
/// [`SynthesisEvent`]; `Finished` is never emitted after [`SpeechSynthesizer::stop`].
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking `text`, replacing any playback in progress
    ///
    /// Empty or whitespace-only text fails immediately with
    /// [`SpeechError::InvalidInput`] and starts nothing.
    fn speak(&self, text: &str) -> Result<(), SpeechError>;

    /// Halt playback and release its transient resources; idempotent
    fn stop(&self);

    /// Whether playback is in progress
    fn is_speaking(&self) -> bool;

    /// Receive terminal events of future playbacks
    fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent>;
}

/// Shared input check for synthesizers
pub fn validate_text(text: &str) -> Result<&str, SpeechError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SpeechError::InvalidInput("Empty text provided".to_string()));
    }
    Ok(trimmed)
}
