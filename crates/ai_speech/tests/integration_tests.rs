//! Integration tests for ai_speech crate
//!
//! Exercises the synthesizers end to end: the remote proxy against a mocked
//! HTTP server and both synthesizers against real child processes.

#![cfg(unix)]

use std::time::Duration;

use ai_speech::{
    CommandSynthesizer, LocalSynthesizerConfig, RemoteProxySynthesizer, RemoteSynthesizerConfig,
    SpeechError, SpeechSynthesizer, SynthesisEvent,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::broadcast;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Shell-backed engine: the spoken text is run as a shell snippet
fn shell_synthesizer() -> CommandSynthesizer {
    CommandSynthesizer::new(LocalSynthesizerConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "{text}".to_string()],
        ..Default::default()
    })
    .expect("Failed to create synthesizer")
}

/// Remote synthesizer whose "player" records the file path it was given
fn remote_config(url: String, marker: &std::path::Path) -> RemoteSynthesizerConfig {
    remote_config_then(url, marker, "true")
}

/// Like [`remote_config`], with `then` run by the player after recording
fn remote_config_then(url: String, marker: &std::path::Path, then: &str) -> RemoteSynthesizerConfig {
    RemoteSynthesizerConfig {
        url,
        timeout_ms: 5000,
        player: "sh".to_string(),
        player_args: vec![
            "-c".to_string(),
            format!("echo \"$0\" > {}; {then}", marker.display()),
            "{file}".to_string(),
        ],
        ..Default::default()
    }
}

/// Audio file path the player was handed, once it has started
async fn played_file(marker: &std::path::Path) -> std::path::PathBuf {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(contents) = std::fs::read_to_string(marker) {
                if contents.ends_with('\n') {
                    return std::path::PathBuf::from(contents.trim());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("player never started")
}

async fn wait_until_removed(file: &std::path::Path) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while file.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("temp audio file was not deleted");
}

fn audio_response() -> serde_json::Value {
    serde_json::json!({
        "audio": STANDARD.encode([0xFF_u8, 0xFB, 0x90, 0x00, 0x00, 0x00]),
        "contentType": "audio/mpeg"
    })
}

async fn next_event(events: &mut broadcast::Receiver<SynthesisEvent>) -> SynthesisEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for synthesis event")
        .expect("event channel closed")
}

async fn assert_no_event(events: &mut broadcast::Receiver<SynthesisEvent>) {
    let waited = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
    assert!(waited.is_err(), "unexpected event: {waited:?}");
}

// ============ Local engine ============

#[tokio::test]
async fn local_playback_finishes_once() {
    let synth = shell_synthesizer();
    let mut events = synth.subscribe();

    synth.speak("exit 0").unwrap();
    assert!(synth.is_speaking());

    assert_eq!(next_event(&mut events).await, SynthesisEvent::Finished);
    assert!(!synth.is_speaking());
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn local_engine_failure_is_reported() {
    let synth = shell_synthesizer();
    let mut events = synth.subscribe();

    synth.speak("echo broken >&2; exit 3").unwrap();

    match next_event(&mut events).await {
        SynthesisEvent::Failed(SpeechError::SynthesisFailed(msg)) => {
            assert!(msg.contains("broken"), "unexpected message: {msg}");
        },
        other => panic!("expected synthesis failure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_engine_is_not_available() {
    let synth = CommandSynthesizer::new(LocalSynthesizerConfig {
        program: "palaver-no-such-engine".to_string(),
        ..Default::default()
    })
    .unwrap();
    let mut events = synth.subscribe();

    synth.speak("hello").unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SynthesisEvent::Failed(SpeechError::NotAvailable(_))
    ));
}

#[tokio::test]
async fn stop_suppresses_finished() {
    let synth = shell_synthesizer();
    let mut events = synth.subscribe();

    synth.speak("sleep 5").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    synth.stop();
    synth.stop();

    assert!(!synth.is_speaking());
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn speak_replaces_current_playback() {
    let synth = shell_synthesizer();
    let mut events = synth.subscribe();

    synth.speak("sleep 5").unwrap();
    synth.speak("exit 0").unwrap();

    assert_eq!(next_event(&mut events).await, SynthesisEvent::Finished);
    assert_no_event(&mut events).await;
}

// ============ Remote proxy ============

#[tokio::test]
async fn remote_playback_uses_and_removes_temp_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/text-to-speech"))
        .and(body_partial_json(serde_json::json!({
            "text": "I love blue!",
            "speakingRate": 1.0,
            "pitch": 4.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(audio_response()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("played.txt");
    let synth = RemoteProxySynthesizer::new(remote_config(
        format!("{}/api/text-to-speech", server.uri()),
        &marker,
    ))
    .unwrap();
    let mut events = synth.subscribe();

    synth.speak("I love blue!").unwrap();
    assert_eq!(next_event(&mut events).await, SynthesisEvent::Finished);

    let played = std::fs::read_to_string(&marker).unwrap();
    let played = std::path::Path::new(played.trim());
    assert!(played.extension().is_some_and(|ext| ext == "mp3"));
    assert!(!played.exists(), "temp audio file should be deleted");
}

#[tokio::test]
async fn remote_blank_text_never_calls_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(audio_response()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let synth =
        RemoteProxySynthesizer::new(remote_config(server.uri(), &dir.path().join("m"))).unwrap();

    assert_eq!(
        synth.speak("   "),
        Err(SpeechError::InvalidInput("Empty text provided".to_string()))
    );
    assert!(!synth.is_speaking());
}

#[tokio::test]
async fn remote_proxy_errors_are_classified() {
    let cases: [(u16, serde_json::Value); 4] = [
        (400, serde_json::json!({"error": "Text too long (max 1000 characters)"})),
        (429, serde_json::json!({"error": "Too many requests"})),
        (503, serde_json::json!({"error": "Google Cloud TTS not configured"})),
        (500, serde_json::json!({"error": "Failed to synthesize speech"})),
    ];

    for (status, body) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let synth =
            RemoteProxySynthesizer::new(remote_config(server.uri(), &dir.path().join("m")))
                .unwrap();
        let mut events = synth.subscribe();
        synth.speak("hello").unwrap();

        let SynthesisEvent::Failed(err) = next_event(&mut events).await else {
            panic!("status {status} should fail");
        };
        let expected = match status {
            400 => SpeechError::InvalidInput("Text too long (max 1000 characters)".into()),
            429 => SpeechError::RateLimited,
            503 => SpeechError::ServiceUnavailable("Google Cloud TTS not configured".into()),
            _ => SpeechError::SynthesisFailed("TTS request failed: Failed to synthesize speech".into()),
        };
        assert_eq!(err, expected, "status {status}");
        assert!(!dir.path().join("m").exists(), "player must not run");
    }
}

#[tokio::test]
async fn remote_invalid_audio_is_synthesis_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "audio": "!!! not base64 !!!",
            "contentType": "audio/mpeg"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let synth =
        RemoteProxySynthesizer::new(remote_config(server.uri(), &dir.path().join("m"))).unwrap();
    let mut events = synth.subscribe();
    synth.speak("hello").unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        SynthesisEvent::Failed(SpeechError::SynthesisFailed(_))
    ));
}

#[tokio::test]
async fn remote_stop_during_fetch_discards_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(audio_response())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("m");
    let synth = RemoteProxySynthesizer::new(remote_config(server.uri(), &marker)).unwrap();
    let mut events = synth.subscribe();

    synth.speak("hello").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    synth.stop();

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(events.try_recv().is_err());
    assert!(!marker.exists(), "player must not run after stop");
}

#[tokio::test]
async fn remote_stop_during_playback_removes_temp_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(audio_response()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("m");
    let synth =
        RemoteProxySynthesizer::new(remote_config_then(server.uri(), &marker, "sleep 10"))
            .unwrap();
    let mut events = synth.subscribe();

    synth.speak("hello").unwrap();
    let file = played_file(&marker).await;
    assert!(file.exists());
    assert!(synth.is_speaking());

    synth.stop();
    assert!(!synth.is_speaking());
    wait_until_removed(&file).await;
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn remote_player_failure_removes_temp_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(audio_response()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("m");
    let synth = RemoteProxySynthesizer::new(remote_config_then(
        server.uri(),
        &marker,
        "echo 'no audio device' >&2; exit 3",
    ))
    .unwrap();
    let mut events = synth.subscribe();

    synth.speak("hello").unwrap();
    let SynthesisEvent::Failed(SpeechError::SynthesisFailed(message)) =
        next_event(&mut events).await
    else {
        panic!("player failure should be reported");
    };
    assert!(message.contains("no audio device"));

    let file = played_file(&marker).await;
    assert!(!file.exists(), "temp audio file should be deleted");
}

#[tokio::test]
async fn remote_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(audio_response())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = remote_config(server.uri(), &dir.path().join("m"));
    config.timeout_ms = 100;
    let synth = RemoteProxySynthesizer::new(config).unwrap();
    let mut events = synth.subscribe();
    synth.speak("hello").unwrap();

    assert_eq!(
        next_event(&mut events).await,
        SynthesisEvent::Failed(SpeechError::Timeout(100))
    );
}
