//! Child-friendly phrasing of errors for speech output

use domain::ErrorKind;

/// Sentence to speak aloud for a failure of the given kind
pub const fn friendly_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Unauthenticated => "Oops! I need to be set up first. Ask a grown-up to help!",
        ErrorKind::NetworkUnavailable | ErrorKind::ServerUnavailable => {
            "Oh no! I can't connect right now. Check your internet!"
        },
        ErrorKind::Timeout => "That's taking too long. Let's try again!",
        ErrorKind::PermissionDenied => {
            "I need permission to hear you. Can you allow it in settings?"
        },
        ErrorKind::RateLimited => "I'm a bit tired! Can you try again in a minute?",
        ErrorKind::InvalidInput
        | ErrorKind::MalformedResponse
        | ErrorKind::CaptureError
        | ErrorKind::SynthesisError => "Oops! Something went wrong. Let's try again!",
    }
}
