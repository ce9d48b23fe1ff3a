//! Local speech engine adapter
//!
//! Speaks by running a command-line engine once per utterance. The default
//! template targets espeak-ng; macOS `say` works with
//! `args = ["-v", "{voice}", "-r", "{wpm}", "{text}"]`.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use super::process::{expand_args, run_to_completion};
use crate::config::LocalSynthesizerConfig;
use crate::error::SpeechError;
use crate::ports::{SpeechSynthesizer, SynthesisEvent, validate_text};
use crate::session::Session;

/// Synthesizer backed by a local speech engine process
#[derive(Debug)]
pub struct CommandSynthesizer {
    config: LocalSynthesizerConfig,
    session: Arc<Session<SynthesisEvent>>,
}

impl CommandSynthesizer {
    /// Create a new local synthesizer
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if no program is configured.
    pub fn new(config: LocalSynthesizerConfig) -> Result<Self, SpeechError> {
        if config.program.trim().is_empty() {
            return Err(SpeechError::Configuration(
                "Local synthesizer program must not be empty".to_string(),
            ));
        }

        info!(program = %config.program, voice = %config.voice, "Initialized local synthesizer");

        Ok(Self {
            config,
            session: Arc::new(Session::new()),
        })
    }

    fn build_args(&self, text: &str) -> Vec<String> {
        let wpm = self.config.words_per_minute().to_string();
        let pitch = self.config.pitch_level().to_string();
        // Text goes last so its content is never treated as a placeholder
        expand_args(
            &self.config.args,
            &[
                ("voice", self.config.voice.as_str()),
                ("wpm", wpm.as_str()),
                ("pitch", pitch.as_str()),
                ("text", text),
            ],
        )
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let text = validate_text(text)?;
        let args = self.build_args(text);
        let program = self.config.program.clone();

        let id = self.session.replace();
        let session = Arc::clone(&self.session);
        let task = tokio::spawn(async move {
            let event = match run_to_completion(&program, &args).await {
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
            debug!("Speech stopped");
        }
    }

    fn is_speaking(&self) -> bool {
        self.session.is_active()
    }

    fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_args_follow_espeak_conventions() {
        let config = LocalSynthesizerConfig {
            rate: 0.5,
            pitch: 1.0,
            ..LocalSynthesizerConfig::default()
        };
        let synth = CommandSynthesizer::new(config).unwrap();
        let args = synth.build_args("Hello {voice}");
        assert_eq!(args, vec!["-v", "en-us", "-s", "175", "-p", "50", "Hello {voice}"]);
    }

    #[test]
    fn empty_program_is_rejected() {
        let config = LocalSynthesizerConfig {
            program: "  ".into(),
            ..LocalSynthesizerConfig::default()
        };
        assert!(matches!(
            CommandSynthesizer::new(config),
            Err(SpeechError::Configuration(_))
        ));
    }

    #[test]
    fn blank_text_fails_without_starting() {
        let synth = CommandSynthesizer::new(LocalSynthesizerConfig::default()).unwrap();
        assert!(matches!(synth.speak("  "), Err(SpeechError::InvalidInput(_))));
        assert!(!synth.is_speaking());
    }
}
