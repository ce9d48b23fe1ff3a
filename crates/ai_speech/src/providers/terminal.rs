//! Terminal capture adapter
//!
//! Treats a line typed on stdin as the recognized utterance, so the whole
//! conversation loop can run on machines without a speech recognizer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, instrument};

use crate::error::SpeechError;
use crate::ports::{CaptureEvent, SpeechCapture};
use crate::session::Session;

/// Capture source fed by lines of text
#[derive(Debug)]
pub struct TerminalCapture {
    lines: Arc<Mutex<mpsc::Receiver<String>>>,
    timeout: Duration,
    session: Arc<Session<CaptureEvent>>,
    permission_requested: AtomicBool,
    input_closed: Arc<AtomicBool>,
}

impl TerminalCapture {
    /// Read lines from the process's stdin
    ///
    /// Must be called inside a Tokio runtime; a background task owns stdin.
    pub fn stdin(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let mut reader = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });
        Self::from_lines(rx, timeout)
    }

    /// Read lines from an arbitrary channel
    pub fn from_lines(lines: mpsc::Receiver<String>, timeout: Duration) -> Self {
        Self {
            lines: Arc::new(Mutex::new(lines)),
            timeout,
            session: Arc::new(Session::new()),
            permission_requested: AtomicBool::new(false),
            input_closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a session has observed the end of the input stream
    pub fn input_closed(&self) -> bool {
        self.input_closed.load(Ordering::SeqCst)
    }
}

fn discard_queued(lines: &mut mpsc::Receiver<String>) {
    let mut discarded = 0_usize;
    while lines.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "Discarded input typed while not recording");
    }
}

impl SpeechCapture for TerminalCapture {
    fn request_permission(&self) {
        if !self.permission_requested.swap(true, Ordering::SeqCst) {
            debug!("Terminal capture needs no permission");
        }
    }

    #[instrument(skip(self))]
    fn start_recording(&self) -> bool {
        let Some(id) = self.session.begin() else {
            debug!("Already recording");
            return false;
        };

        // Lines typed between sessions belong to no one
        let drained_now = match self.lines.try_lock() {
            Ok(mut lines) => {
                discard_queued(&mut lines);
                true
            },
            // The previous session's task is still letting go of the input
            Err(_) => false,
        };

        let lines = Arc::clone(&self.lines);
        let session = Arc::clone(&self.session);
        let timeout = self.timeout;
        let input_closed = Arc::clone(&self.input_closed);

        let task = tokio::spawn(async move {
            let mut lines = lines.lock().await;
            if !drained_now {
                discard_queued(&mut lines);
            }
            let event = match tokio::time::timeout(timeout, lines.recv()).await {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    CaptureEvent::Recognized(line.trim().to_string())
                },
                Ok(Some(_)) | Err(_) => CaptureEvent::Failed(SpeechError::NoSpeechDetected),
                Ok(None) => {
                    input_closed.store(true, Ordering::SeqCst);
                    CaptureEvent::Failed(SpeechError::CaptureFailed(
                        "Input stream closed".to_string(),
                    ))
                },
            };
            debug!(?event, "Capture session ended");
            session.finish(id, event);
        });
        self.session.attach(id, task);
        true
    }

    fn stop_recording(&self) {
        if self.session.stop() {
            debug!("Recording stopped");
        }
    }

    fn is_recording(&self) -> bool {
        self.session.is_active()
    }

    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(timeout_ms: u64) -> (mpsc::Sender<String>, TerminalCapture) {
        let (tx, rx) = mpsc::channel(8);
        (tx, TerminalCapture::from_lines(rx, Duration::from_millis(timeout_ms)))
    }

    #[tokio::test]
    async fn typed_line_is_recognized() {
        let (tx, capture) = capture(1000);
        let mut events = capture.subscribe();

        assert!(capture.start_recording());
        assert!(capture.is_recording());
        tx.send("  What's your favorite color?  ".into()).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Recognized("What's your favorite color?".into())
        );
        assert!(!capture.is_recording());
    }

    #[tokio::test]
    async fn silence_ends_session_with_no_speech() {
        let (_tx, capture) = capture(50);
        let mut events = capture.subscribe();

        assert!(capture.start_recording());
        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Failed(SpeechError::NoSpeechDetected)
        );
        assert!(!capture.is_recording());
    }

    #[tokio::test]
    async fn blank_line_is_no_speech() {
        let (tx, capture) = capture(1000);
        let mut events = capture.subscribe();

        capture.start_recording();
        tx.send("   ".into()).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Failed(SpeechError::NoSpeechDetected)
        );
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (_tx, capture) = capture(1000);
        assert!(capture.start_recording());
        assert!(!capture.start_recording());
        capture.stop_recording();
    }

    #[tokio::test]
    async fn stopped_session_emits_nothing() {
        let (tx, capture) = capture(1000);
        let mut events = capture.subscribe();

        capture.start_recording();
        capture.stop_recording();
        capture.stop_recording();
        assert!(!capture.is_recording());

        // A line typed after stopping must not surface as an event
        let _ = tx.send("too late".into()).await;
        let waited = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn input_typed_between_sessions_is_discarded() {
        let (tx, capture) = capture(1000);
        let mut events = capture.subscribe();

        capture.start_recording();
        capture.stop_recording();
        tx.send("too late".into()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(capture.start_recording());
        tx.send("fresh".into()).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Recognized("fresh".into())
        );
    }

    #[tokio::test]
    async fn closed_input_is_capture_failure() {
        let (tx, capture) = capture(1000);
        let mut events = capture.subscribe();
        drop(tx);

        assert!(!capture.input_closed());
        capture.start_recording();
        assert!(matches!(
            events.recv().await.unwrap(),
            CaptureEvent::Failed(SpeechError::CaptureFailed(_))
        ));
        assert!(capture.input_closed());
    }

    #[test]
    fn request_permission_is_idempotent() {
        let (_tx, capture) = capture(10);
        capture.request_permission();
        capture.request_permission();
        assert!(capture.permission_requested.load(Ordering::SeqCst));
    }
}
