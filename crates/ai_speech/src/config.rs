//! Configuration for speech capture and synthesis

use serde::{Deserialize, Serialize};

/// Configuration for speech processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Silence after which a capture session ends, in milliseconds
    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,

    /// How long terminal capture waits for a typed line, in milliseconds
    #[serde(default = "default_typing_timeout_ms")]
    pub typing_timeout_ms: u64,

    /// Synthesizer selection
    #[serde(default)]
    pub synthesizer: SynthesizerKind,

    /// Local speech engine settings
    #[serde(default)]
    pub local: LocalSynthesizerConfig,

    /// Remote speech proxy settings
    #[serde(default)]
    pub remote: RemoteSynthesizerConfig,
}

/// Which synthesizer speaks replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesizerKind {
    /// Local speech engine process
    #[default]
    Local,
    /// Remote speech proxy plus a local audio player
    Remote,
    /// No synthesis; replies are only published as events
    None,
}

/// Local speech engine (espeak-ng by default)
///
/// `args` is a template; `{voice}`, `{wpm}`, `{pitch}` and `{text}` are
/// substituted per utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSynthesizerConfig {
    /// Engine executable
    #[serde(default = "default_local_program")]
    pub program: String,

    /// Argument template
    #[serde(default = "default_local_args")]
    pub args: Vec<String>,

    /// Voice identifier passed as `{voice}`
    #[serde(default = "default_local_voice")]
    pub voice: String,

    /// Speaking rate, 0.0 to 1.0 where 0.5 is a normal pace
    #[serde(default = "default_local_rate")]
    pub rate: f32,

    /// Pitch multiplier, 0.5 to 2.0 where 1.0 is the voice's natural pitch
    #[serde(default = "default_local_pitch")]
    pub pitch: f32,
}

/// Remote speech proxy returning base64 audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSynthesizerConfig {
    /// Proxy endpoint
    #[serde(default = "default_remote_url")]
    pub url: String,

    /// Optional voice name forwarded to the proxy
    #[serde(default)]
    pub voice_name: Option<String>,

    /// Speaking rate forwarded as `speakingRate`
    #[serde(default = "default_remote_speaking_rate")]
    pub speaking_rate: f32,

    /// Pitch in semitones forwarded as `pitch`
    #[serde(default = "default_remote_pitch")]
    pub pitch: f32,

    /// Request timeout in milliseconds
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,

    /// The proxy rejects longer text; replies are cut at a word boundary
    #[serde(default = "default_remote_max_chars")]
    pub max_chars: usize,

    /// Audio player executable
    #[serde(default = "default_player")]
    pub player: String,

    /// Player argument template; `{file}` is the downloaded audio
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
}

const fn default_silence_timeout_ms() -> u64 {
    2000
}

const fn default_typing_timeout_ms() -> u64 {
    60_000
}

fn default_local_program() -> String {
    "espeak-ng".to_string()
}

fn default_local_args() -> Vec<String> {
    ["-v", "{voice}", "-s", "{wpm}", "-p", "{pitch}", "{text}"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_local_voice() -> String {
    "en-us".to_string()
}

const fn default_local_rate() -> f32 {
    0.48
}

const fn default_local_pitch() -> f32 {
    1.15 // a little higher than natural
}

fn default_remote_url() -> String {
    "http://localhost:3100/api/text-to-speech".to_string()
}

const fn default_remote_speaking_rate() -> f32 {
    1.0
}

const fn default_remote_pitch() -> f32 {
    4.0
}

const fn default_remote_timeout_ms() -> u64 {
    20000 // 20 seconds
}

const fn default_remote_max_chars() -> usize {
    1000
}

fn default_player() -> String {
    "mpg123".to_string()
}

fn default_player_args() -> Vec<String> {
    vec!["-q".to_string(), "{file}".to_string()]
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            silence_timeout_ms: default_silence_timeout_ms(),
            typing_timeout_ms: default_typing_timeout_ms(),
            synthesizer: SynthesizerKind::default(),
            local: LocalSynthesizerConfig::default(),
            remote: RemoteSynthesizerConfig::default(),
        }
    }
}

impl Default for LocalSynthesizerConfig {
    fn default() -> Self {
        Self {
            program: default_local_program(),
            args: default_local_args(),
            voice: default_local_voice(),
            rate: default_local_rate(),
            pitch: default_local_pitch(),
        }
    }
}

impl Default for RemoteSynthesizerConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            voice_name: None,
            speaking_rate: default_remote_speaking_rate(),
            pitch: default_remote_pitch(),
            timeout_ms: default_remote_timeout_ms(),
            max_chars: default_remote_max_chars(),
            player: default_player(),
            player_args: default_player_args(),
        }
    }
}

impl LocalSynthesizerConfig {
    /// Rate as words per minute; 0.5 maps to espeak's default of 175
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn words_per_minute(&self) -> u32 {
        (self.rate * 350.0).round().clamp(80.0, 450.0) as u32
    }

    /// Pitch on espeak's 0-99 scale; 1.0 maps to its default of 50
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pitch_level(&self) -> u32 {
        (self.pitch * 50.0).round().clamp(0.0, 99.0) as u32
    }
}

impl SpeechConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.silence_timeout_ms == 0 {
            return Err("Silence timeout must be greater than 0".to_string());
        }
        if self.typing_timeout_ms == 0 {
            return Err("Typing timeout must be greater than 0".to_string());
        }

        match self.synthesizer {
            SynthesizerKind::Local => {
                if self.local.program.trim().is_empty() {
                    return Err("Local synthesizer program must not be empty".to_string());
                }
                if !(0.0..=1.0).contains(&self.local.rate) {
                    return Err(format!(
                        "Local speech rate must be between 0.0 and 1.0, got {}",
                        self.local.rate
                    ));
                }
                if !(0.5..=2.0).contains(&self.local.pitch) {
                    return Err(format!(
                        "Local pitch must be between 0.5 and 2.0, got {}",
                        self.local.pitch
                    ));
                }
            },
            SynthesizerKind::Remote => {
                let remote = &self.remote;
                if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
                    return Err("Remote synthesizer URL must be an http(s) URL".to_string());
                }
                if !(0.25..=4.0).contains(&remote.speaking_rate) {
                    return Err(format!(
                        "Speaking rate must be between 0.25 and 4.0, got {}",
                        remote.speaking_rate
                    ));
                }
                if !(-20.0..=20.0).contains(&remote.pitch) {
                    return Err(format!(
                        "Pitch must be between -20.0 and 20.0, got {}",
                        remote.pitch
                    ));
                }
                if remote.timeout_ms == 0 {
                    return Err("Timeout must be greater than 0".to_string());
                }
                if remote.max_chars == 0 {
                    return Err("Maximum text length must be greater than 0".to_string());
                }
                if !remote.player_args.iter().any(|a| a.contains("{file}")) {
                    return Err("Player arguments must contain a {file} placeholder".to_string());
                }
            },
            SynthesizerKind::None => {},
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SpeechConfig::default();

        assert_eq!(config.silence_timeout_ms, 2000);
        assert_eq!(config.typing_timeout_ms, 60_000);
        assert_eq!(config.synthesizer, SynthesizerKind::Local);
        assert_eq!(config.local.program, "espeak-ng");
        assert_eq!(config.remote.url, "http://localhost:3100/api/text-to-speech");
        assert_eq!(config.remote.timeout_ms, 20000);
        assert_eq!(config.remote.max_chars, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml = r#"
            silence_timeout_ms = 3500
            synthesizer = "remote"

            [remote]
            url = "https://tts.example.com/api/text-to-speech"
            pitch = 2.5
        "#;

        let config: SpeechConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.silence_timeout_ms, 3500);
        assert_eq!(config.synthesizer, SynthesizerKind::Remote);
        assert!((config.remote.pitch - 2.5).abs() < f32::EPSILON);
        assert_eq!(config.remote.player, "mpg123");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rate_and_pitch_map_to_engine_scale() {
        let mut local = LocalSynthesizerConfig::default();
        local.rate = 0.5;
        local.pitch = 1.0;
        assert_eq!(local.words_per_minute(), 175);
        assert_eq!(local.pitch_level(), 50);

        local.pitch = 1.2;
        assert_eq!(local.pitch_level(), 60);

        local.pitch = 3.0;
        assert_eq!(local.pitch_level(), 99);
    }

    #[test]
    fn validate_fails_with_zero_silence_timeout() {
        let config = SpeechConfig {
            silence_timeout_ms: 0,
            ..SpeechConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_fails_with_invalid_local_rate() {
        let mut config = SpeechConfig::default();
        config.local.rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_file_placeholder_for_remote() {
        let mut config = SpeechConfig::default();
        config.synthesizer = SynthesizerKind::Remote;
        config.remote.player_args = vec!["-q".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn disabled_synthesizer_skips_engine_checks() {
        let mut config = SpeechConfig::default();
        config.synthesizer = SynthesizerKind::None;
        config.local.program = String::new();
        assert!(config.validate().is_ok());
    }
}
