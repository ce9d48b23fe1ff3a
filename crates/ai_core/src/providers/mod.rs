//! HTTP backends implementing [`AiService`](crate::ports::AiService)

mod anthropic;
mod http;
mod local;
mod openai;

pub use anthropic::AnthropicService;
pub use local::LocalLlmService;
pub use openai::OpenAiService;
