//! Interactive conversation in the terminal

use std::io::Write;
use std::sync::Arc;

use ai_speech::{SpeechCapture, TerminalCapture};
use application::{ConversationEvent, ConversationOrchestrator};
use domain::{ConversationState, ErrorKind};
use infrastructure::{
    AppConfig, build_ai_service, build_synthesizer, build_terminal_capture, credential_store,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Run turns until stdin closes or Ctrl-C is pressed
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let ai = build_ai_service(&config, credential_store(&config)).await?;
    let synthesizer = build_synthesizer(&config.speech)?;
    let speech_output = synthesizer.is_some();
    let capture = build_terminal_capture(&config.speech);

    let orchestrator = ConversationOrchestrator::spawn(
        ai,
        Arc::clone(&capture) as Arc<dyn SpeechCapture>,
        synthesizer,
        config.conversation.clone(),
    );
    let mut events = orchestrator.subscribe();

    println!(
        "Talking to {}. Type a message and press Enter; Ctrl-D or Ctrl-C quits.",
        config.ai.backend.display_name()
    );

    let outcome = tokio::select! {
        outcome = converse(&orchestrator, &capture, &mut events, speech_output) => outcome,
        _ = tokio::signal::ctrl_c() => {
            println!();
            Ok(())
        },
    };

    orchestrator.shutdown().await;
    outcome
}

async fn converse(
    orchestrator: &ConversationOrchestrator,
    capture: &TerminalCapture,
    events: &mut broadcast::Receiver<ConversationEvent>,
    speech_output: bool,
) -> anyhow::Result<()> {
    begin_turn(orchestrator).await;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Conversation events dropped");
                continue;
            },
            Err(RecvError::Closed) => return Ok(()),
        };

        match event {
            ConversationEvent::StateChanged(ConversationState::Idle) => {
                if capture.input_closed() {
                    return Ok(());
                }
                begin_turn(orchestrator).await;
            },
            ConversationEvent::StateChanged(state) => debug!(%state, "State changed"),
            ConversationEvent::ResponseSpeaking(text) => println!("palaver> {text}"),
            ConversationEvent::Error(error) => {
                if capture.input_closed() {
                    return Ok(());
                }
                match error.kind {
                    ErrorKind::Unauthenticated => {
                        anyhow::bail!("{}\nStore one with `palaver set-key`.", error.message);
                    },
                    // Speech output is off; the reply was already printed
                    ErrorKind::SynthesisError if !speech_output => {},
                    _ => println!("(!) {}", error.message),
                }
            },
            ConversationEvent::UserSpeechRecognized(_) | ConversationEvent::ResponseReceived(_) => {},
        }
    }
}

async fn begin_turn(orchestrator: &ConversationOrchestrator) {
    if orchestrator.start_listening().await {
        show_prompt(&mut std::io::stdout());
    }
}

/// Write the input prompt; returns whether it reached the terminal
fn show_prompt(out: &mut impl Write) -> bool {
    match out.write_all(b"you> ").and_then(|()| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Failed to show prompt");
            false
        },
    }
}
