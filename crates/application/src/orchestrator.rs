//! Conversation orchestrator
//!
//! Runs the `Idle → Listening → Processing → Speaking → Idle` cycle. All
//! state lives in a single actor task; [`ConversationOrchestrator`] is a
//! cheap, cloneable handle that sends commands to it and waits for the
//! acknowledgement.
//!
//! The actor waits on at most one collaborator at a time (capture outcome,
//! AI reply or playback outcome). Cancelling drops that wait, so results
//! that arrive afterwards are never seen.

use std::future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;

use ai_core::{AiService, AiServiceError};
use ai_speech::{CaptureEvent, SpeechCapture, SpeechError, SpeechSynthesizer, SynthesisEvent};
use domain::response_filter;
use domain::{ConversationHistory, ConversationState, ErrorKind, Message, MessageRole};
use futures::FutureExt;
use futures::future::BoxFuture;
use secrecy::SecretString;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Sleep;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::ApplicationError;
use crate::events::{ConversationError, ConversationEvent};
use crate::humanize::friendly_message;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

const START_FAILED: &str = "Failed to start listening. Check microphone permissions.";
const EMPTY_REPLY: &str = "AI returned empty response";
const NO_SYNTHESIZER: &str = "Text-to-Speech not initialized";

/// Handle to a running conversation
///
/// Every method is acknowledged by the actor, so the state observed right
/// after a call already reflects it.
#[derive(Debug, Clone)]
pub struct ConversationOrchestrator {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConversationState>,
    events: broadcast::Sender<ConversationEvent>,
}

enum Command {
    StartListening(oneshot::Sender<bool>),
    StopListening(oneshot::Sender<()>),
    Cancel(oneshot::Sender<()>),
    SetApiKey(SecretString, oneshot::Sender<Result<(), ApplicationError>>),
    ClearHistory(oneshot::Sender<()>),
    History(oneshot::Sender<Vec<Message>>),
    Shutdown(oneshot::Sender<()>),
}

impl ConversationOrchestrator {
    /// Start the orchestrator task
    ///
    /// Must be called from within a Tokio runtime. The task ends on
    /// [`shutdown`](Self::shutdown) or when the last handle is dropped.
    pub fn spawn(
        ai: Arc<dyn AiService>,
        capture: Arc<dyn SpeechCapture>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        config: OrchestratorConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConversationState::Idle);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        info!(
            service = ai.service_name(),
            history = config.enable_history,
            max_history = config.max_history,
            speech_output = synthesizer.is_some(),
            "Starting conversation orchestrator"
        );

        let actor = Actor {
            history: ConversationHistory::new(config.max_history),
            ai,
            capture,
            synthesizer,
            config,
            state: state_tx,
            events: events.clone(),
            pending: Pending::Nothing,
            recovery: None,
            cycle: None,
        };
        tokio::spawn(actor.run(command_rx));

        Self {
            commands: command_tx,
            state: state_rx,
            events,
        }
    }

    /// Begin a cycle; returns whether the orchestrator is now listening
    ///
    /// Ignored unless idle. A missing AI credential or a capture source that
    /// refuses to start moves the orchestrator to `Error` instead.
    pub async fn start_listening(&self) -> bool {
        self.request(Command::StartListening).await.unwrap_or(false)
    }

    /// Stop capturing and return to idle without asking the AI
    pub async fn stop_listening(&self) {
        let _ = self.request(Command::StopListening).await;
    }

    /// Abort whatever is in progress and return to idle
    pub async fn cancel(&self) {
        let _ = self.request(Command::Cancel).await;
    }

    /// Replace the AI credential; used from the next request on
    pub async fn set_api_key(&self, key: SecretString) -> Result<(), ApplicationError> {
        self.request(|ack| Command::SetApiKey(key, ack)).await?
    }

    /// Forget previous exchanges
    pub async fn clear_history(&self) {
        let _ = self.request(Command::ClearHistory).await;
    }

    /// Snapshot of the conversation history
    pub async fn history(&self) -> Vec<Message> {
        self.request(Command::History).await.unwrap_or_default()
    }

    /// Current state
    pub fn state(&self) -> ConversationState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn state_changes(&self) -> watch::Receiver<ConversationState> {
        self.state.clone()
    }

    /// Receive conversation events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Cancel any cycle and stop the orchestrator task
    pub async fn shutdown(&self) {
        let _ = self.request(Command::Shutdown).await;
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ApplicationError> {
        let (ack, reply) = oneshot::channel();
        self.commands
            .send(command(ack))
            .await
            .map_err(|_| ApplicationError::OrchestratorStopped)?;
        reply.await.map_err(|_| ApplicationError::OrchestratorStopped)
    }
}

/// The single collaborator outcome the actor is waiting for
enum Pending {
    Nothing,
    Capture(broadcast::Receiver<CaptureEvent>),
    Reply(BoxFuture<'static, Result<String, AiServiceError>>),
    Playback(broadcast::Receiver<SynthesisEvent>),
}

enum Outcome {
    Captured(Result<CaptureEvent, RecvError>),
    Replied(Result<String, AiServiceError>),
    Played(Result<SynthesisEvent, RecvError>),
}

impl Pending {
    async fn next(&mut self) -> Outcome {
        match self {
            Self::Nothing => future::pending().await,
            Self::Capture(events) => Outcome::Captured(events.recv().await),
            Self::Reply(reply) => Outcome::Replied(reply.as_mut().await),
            Self::Playback(events) => Outcome::Played(events.recv().await),
        }
    }
}

async fn recovery_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}

struct Actor {
    ai: Arc<dyn AiService>,
    capture: Arc<dyn SpeechCapture>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    config: OrchestratorConfig,
    history: ConversationHistory,
    state: watch::Sender<ConversationState>,
    events: broadcast::Sender<ConversationEvent>,
    pending: Pending,
    recovery: Option<Pin<Box<Sleep>>>,
    cycle: Option<Uuid>,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.capture.request_permission();

        let shutdown = loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else { break None };
                    if let ControlFlow::Break(ack) = self.handle_command(command).await {
                        break Some(ack);
                    }
                },
                outcome = self.pending.next() => self.handle_outcome(outcome),
                () = recovery_elapsed(&mut self.recovery) => self.recover(),
            }
        };

        self.cancel();
        info!("Conversation orchestrator stopped");
        if let Some(ack) = shutdown {
            let _ = ack.send(());
        }
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<oneshot::Sender<()>> {
        match command {
            Command::StartListening(ack) => {
                let _ = ack.send(self.start_listening());
            },
            Command::StopListening(ack) => {
                self.stop_listening();
                let _ = ack.send(());
            },
            Command::Cancel(ack) => {
                self.cancel();
                let _ = ack.send(());
            },
            Command::SetApiKey(key, ack) => {
                let result = self.ai.set_api_key(key).await;
                match &result {
                    Ok(()) => info!(service = self.ai.service_name(), "API key updated"),
                    Err(e) => warn!(service = self.ai.service_name(), error = %e, "Failed to update API key"),
                }
                let _ = ack.send(result.map_err(ApplicationError::from));
            },
            Command::ClearHistory(ack) => {
                self.history.clear();
                info!("Conversation history cleared");
                let _ = ack.send(());
            },
            Command::History(ack) => {
                let _ = ack.send(self.history.messages());
            },
            Command::Shutdown(ack) => return ControlFlow::Break(ack),
        }
        ControlFlow::Continue(())
    }

    fn handle_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Captured(Ok(CaptureEvent::Recognized(text))) => self.on_recognized(&text),
            Outcome::Captured(Ok(CaptureEvent::Failed(err))) => self.fail_speech(&err),
            Outcome::Captured(Err(RecvError::Closed)) => {
                self.fail(ErrorKind::CaptureError, "Speech capture stopped unexpectedly");
            },
            Outcome::Replied(result) => self.on_reply(result),
            Outcome::Played(Ok(SynthesisEvent::Finished)) => {
                self.pending = Pending::Nothing;
                info!(cycle = ?self.cycle, "Cycle complete");
                self.set_state(ConversationState::Idle);
            },
            Outcome::Played(Ok(SynthesisEvent::Failed(err))) => self.fail_speech(&err),
            Outcome::Played(Err(RecvError::Closed)) => {
                self.fail(ErrorKind::SynthesisError, "Speech output stopped unexpectedly");
            },
            Outcome::Captured(Err(RecvError::Lagged(skipped)))
            | Outcome::Played(Err(RecvError::Lagged(skipped))) => {
                warn!(skipped, "Speech events were dropped");
            },
        }
    }

    fn current_state(&self) -> ConversationState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConversationState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(state = %next, "State changed");
            let _ = self.events.send(ConversationEvent::StateChanged(next));
        }
    }

    fn start_listening(&mut self) -> bool {
        let state = self.current_state();
        if state != ConversationState::Idle {
            debug!(%state, "Ignoring start request; conversation is busy");
            return false;
        }

        let cycle = Uuid::now_v7();
        self.cycle = Some(cycle);

        if !self.ai.is_configured() {
            warn!(%cycle, service = self.ai.service_name(), "AI service has no credential");
            let err = AiServiceError::not_configured(self.ai.service_name());
            self.fail(err.kind(), err.to_string());
            return false;
        }

        // A spoken error phrase can outlast the error state
        if let Some(synthesizer) = &self.synthesizer {
            if synthesizer.is_speaking() {
                debug!(%cycle, "Stopping playback before listening");
                synthesizer.stop();
            }
        }

        // Subscribe first so an immediate outcome cannot be missed
        let outcomes = self.capture.subscribe();
        if !self.capture.start_recording() {
            self.fail(ErrorKind::CaptureError, START_FAILED);
            return false;
        }

        self.pending = Pending::Capture(outcomes);
        info!(%cycle, "Listening");
        self.set_state(ConversationState::Listening);
        true
    }

    fn stop_listening(&mut self) {
        let state = self.current_state();
        if state != ConversationState::Listening {
            debug!(%state, "Ignoring stop request; not listening");
            return;
        }
        self.pending = Pending::Nothing;
        self.capture.stop_recording();
        info!(cycle = ?self.cycle, "Listening stopped");
        self.set_state(ConversationState::Idle);
    }

    fn cancel(&mut self) {
        self.pending = Pending::Nothing;
        self.recovery = None;

        if self.capture.is_recording() {
            self.capture.stop_recording();
        }
        if let Some(synthesizer) = &self.synthesizer {
            if synthesizer.is_speaking() {
                synthesizer.stop();
            }
        }

        if self.current_state() != ConversationState::Idle {
            info!(cycle = ?self.cycle, "Conversation cancelled");
        }
        self.cycle = None;
        self.set_state(ConversationState::Idle);
    }

    fn recover(&mut self) {
        self.recovery = None;
        if self.current_state() == ConversationState::Error {
            debug!("Recovered from error");
            self.set_state(ConversationState::Idle);
        }
    }

    fn on_recognized(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.fail_speech(&SpeechError::NoSpeechDetected);
            return;
        }

        info!(cycle = ?self.cycle, chars = text.len(), "User speech recognized");
        let _ = self
            .events
            .send(ConversationEvent::UserSpeechRecognized(text.to_string()));

        let messages = self.build_request(text);
        let ai = Arc::clone(&self.ai);
        let span = info_span!(
            "ai_request",
            cycle = ?self.cycle,
            service = ai.service_name(),
            messages = messages.len()
        );
        let reply = async move { ai.get_response(&messages).await }
            .instrument(span)
            .boxed();

        self.pending = Pending::Reply(reply);
        self.set_state(ConversationState::Processing);
    }

    /// System prompt followed by the history, or by the new utterance alone
    /// when history is disabled
    fn build_request(&mut self, text: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(self.config.system_prompt.as_str())];
        if self.config.enable_history {
            self.history.add_message(MessageRole::User, text);
            messages.extend(self.history.iter().cloned());
        } else {
            messages.push(Message::user(text));
        }
        messages
    }

    fn on_reply(&mut self, result: Result<String, AiServiceError>) {
        self.pending = Pending::Nothing;

        let reply = match result {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                self.fail(ErrorKind::MalformedResponse, EMPTY_REPLY);
                return;
            },
            Err(err) => {
                self.fail(err.kind(), err.to_string());
                return;
            },
        };

        debug!(cycle = ?self.cycle, reply = %reply, "AI reply received");
        if self.config.enable_history {
            self.history.add_message(MessageRole::Assistant, reply.as_str());
        }
        let spoken = response_filter::filter(&reply);
        let _ = self.events.send(ConversationEvent::ResponseReceived(reply));
        let _ = self
            .events
            .send(ConversationEvent::ResponseSpeaking(spoken.clone()));

        let Some(synthesizer) = self.synthesizer.clone() else {
            self.fail(ErrorKind::SynthesisError, NO_SYNTHESIZER);
            return;
        };

        let outcomes = synthesizer.subscribe();
        match synthesizer.speak(&spoken) {
            Ok(()) => {
                self.pending = Pending::Playback(outcomes);
                self.set_state(ConversationState::Speaking);
            },
            Err(err) => self.fail_speech(&err),
        }
    }

    fn fail_speech(&mut self, err: &SpeechError) {
        self.fail(err.kind(), err.to_string());
    }

    /// Enter `Error`, report it once and arm the return to idle
    fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let error = ConversationError::new(kind, message);
        error!(cycle = ?self.cycle, kind = %error.kind, message = %error.message, "Conversation failed");

        self.pending = Pending::Nothing;
        self.set_state(ConversationState::Error);
        let _ = self.events.send(ConversationEvent::Error(error));

        self.speak_error(kind);
        self.recovery = Some(Box::pin(tokio::time::sleep(
            self.config.error_recovery_delay(),
        )));
    }

    fn speak_error(&self, kind: ErrorKind) {
        if !self.config.speak_errors {
            return;
        }
        let Some(synthesizer) = &self.synthesizer else {
            return;
        };
        if synthesizer.is_speaking() {
            return;
        }
        if let Err(e) = synthesizer.speak(friendly_message(kind)) {
            debug!(error = %e, "Could not speak error message");
        }
    }
}
