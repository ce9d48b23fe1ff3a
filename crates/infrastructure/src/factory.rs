//! Adapter wiring driven by [`AppConfig`]

use std::sync::Arc;
use std::time::Duration;

use ai_core::{
    AiBackend, AiService, AiServiceError, AnthropicService, ApiKey, CredentialStore,
    LocalLlmService, OpenAiService,
};
use ai_speech::{
    CommandSynthesizer, RemoteProxySynthesizer, SpeechConfig, SpeechError, SpeechSynthesizer,
    SynthesizerKind, TerminalCapture,
};
use tracing::info;

use crate::config::AppConfig;
use crate::credentials::FileCredentialStore;

/// Persistent credential store at the configured location
pub fn credential_store(config: &AppConfig) -> Option<Arc<dyn CredentialStore>> {
    config.credentials.resolve_path().map(|path| {
        info!(path = %path.display(), "Using credential file");
        Arc::new(FileCredentialStore::new(path)) as Arc<dyn CredentialStore>
    })
}

/// Build the configured AI backend
///
/// The key is resolved from `store` first, then the configuration file and,
/// in development only, the `PALAVER_<BACKEND>_API_KEY` variable.
pub async fn build_ai_service(
    config: &AppConfig,
    store: Option<Arc<dyn CredentialStore>>,
) -> Result<Arc<dyn AiService>, AiServiceError> {
    let ai = &config.ai;
    let backend = ai.backend;
    let allow_env = config.environment.allows_env_credentials();

    let service: Arc<dyn AiService> = match backend {
        AiBackend::OpenAi => {
            let key = ApiKey::resolve(backend, ai.configured_key(backend), store, allow_env).await;
            Arc::new(OpenAiService::new(ai.openai.clone(), key, ai.log_requests)?)
        },
        AiBackend::Anthropic => {
            let key = ApiKey::resolve(backend, ai.configured_key(backend), store, allow_env).await;
            Arc::new(AnthropicService::new(
                ai.anthropic.clone(),
                key,
                ai.log_requests,
            )?)
        },
        AiBackend::Local => Arc::new(LocalLlmService::new(ai.local.clone(), ai.log_requests)?),
    };

    info!(
        backend = %backend,
        configured = service.is_configured(),
        "AI service ready"
    );
    Ok(service)
}

/// Build the configured synthesizer; `None` when speech output is disabled
pub fn build_synthesizer(
    config: &SpeechConfig,
) -> Result<Option<Arc<dyn SpeechSynthesizer>>, SpeechError> {
    let synthesizer: Arc<dyn SpeechSynthesizer> = match config.synthesizer {
        SynthesizerKind::Local => Arc::new(CommandSynthesizer::new(config.local.clone())?),
        SynthesizerKind::Remote => Arc::new(RemoteProxySynthesizer::new(config.remote.clone())?),
        SynthesizerKind::None => {
            info!("Speech output disabled");
            return Ok(None);
        },
    };
    Ok(Some(synthesizer))
}

/// Capture source reading typed lines from stdin
///
/// Must be called inside a Tokio runtime.
pub fn build_terminal_capture(config: &SpeechConfig) -> Arc<TerminalCapture> {
    Arc::new(TerminalCapture::stdin(Duration::from_millis(
        config.typing_timeout_ms,
    )))
}
