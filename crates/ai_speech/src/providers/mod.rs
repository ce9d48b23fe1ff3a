//! Speech adapters
//!
//! - [`TerminalCapture`]: typed lines stand in for recognized speech
//! - [`CommandSynthesizer`]: local speech engine process (espeak-ng, say, ...)
//! - [`RemoteProxySynthesizer`]: remote TTS proxy plus a local audio player

pub mod command;
mod process;
pub mod remote;
pub mod terminal;

pub use command::CommandSynthesizer;
pub use remote::RemoteProxySynthesizer;
pub use terminal::TerminalCapture;
