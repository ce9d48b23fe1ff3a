//! AI Speech - speech capture and synthesis abstractions
//!
//! Provides the two capability interfaces the conversation loop depends on:
//! - `SpeechCapture` - recognized text from the user (STT)
//! - `SpeechSynthesizer` - audible playback of replies (TTS)
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the traits (ports)
//! - `providers` module contains concrete implementations (adapters)
//!
//! Both ports report outcomes as broadcast events and guarantee at most one
//! terminal event per session, none for sessions stopped by the caller.
//!
//! # Example
//!
//! ```ignore
//! use ai_speech::{CommandSynthesizer, SpeechSynthesizer, SynthesisEvent};
//!
//! let synth = CommandSynthesizer::new(config.local)?;
//! let mut events = synth.subscribe();
//! synth.speak("Hello, world!")?;
//! assert_eq!(events.recv().await?, SynthesisEvent::Finished);
//! ```

pub mod config;
pub mod error;
pub mod ports;
pub mod providers;
mod session;

pub use config::{LocalSynthesizerConfig, RemoteSynthesizerConfig, SpeechConfig, SynthesizerKind};
pub use error::SpeechError;
pub use ports::{CaptureEvent, SpeechCapture, SpeechSynthesizer, SynthesisEvent};
pub use providers::{CommandSynthesizer, RemoteProxySynthesizer, TerminalCapture};
