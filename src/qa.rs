//! Question answering: provider resolution, the multimodal round-trip,
//! and the error-as-text contract.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent.
//! Exponential backoff (`retry_backoff_ms * 2^attempt`) avoids hammering a
//! recovering endpoint: with 500 ms base and 3 retries the wait sequence is
//! 500 ms → 1 s → 2 s.
//!
//! ## Why never `Err`?
//!
//! [`ask`] always returns a well-formed answer string. When the provider
//! cannot be resolved or every retry fails, the answer slot carries a
//! textual error payload instead — the caller renders it like any other
//! answer rather than handling a second failure channel.

use crate::config::LecternConfig;
use crate::context::{assemble_context, PromptContext};
use crate::document::DocumentRecord;
use crate::error::LecternError;
use crate::pipeline::encode;
use crate::postprocess::postprocess_answer;
use crate::prompts::{question_prompt, TUTOR_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Answer a question about a document.
///
/// Assembles the prompt context (scoped to `target_page` when given),
/// builds the multimodal message list, calls the provider with retries,
/// and rewrites the reply into HTML. LLM failures surface as a textual
/// error payload, never as `Err`.
pub async fn ask(
    document: &DocumentRecord,
    question: &str,
    target_page: Option<u32>,
    include_visual: bool,
    config: &LecternConfig,
) -> String {
    let context = match assemble_context(document, question, target_page, include_visual, config) {
        Ok(c) => c,
        Err(e) => return error_payload(&e.to_string()),
    };

    let provider = match resolve_provider(config) {
        Ok(p) => p,
        Err(e) => return error_payload(&e.to_string()),
    };

    let answer = answer_with_retries(&provider, &context, config).await;
    match answer {
        Ok(raw) => postprocess_answer(&raw),
        Err(detail) => error_payload(&detail),
    }
}

/// Synchronous wrapper around [`ask`]. Creates a temporary tokio runtime.
pub fn ask_sync(
    document: &DocumentRecord,
    question: &str,
    target_page: Option<u32>,
    include_visual: bool,
    config: &LecternConfig,
) -> String {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(ask(document, question, target_page, include_visual, config)),
        Err(e) => error_payload(&format!("failed to create runtime: {e}")),
    }
}

/// The textual error payload placed in the answer slot.
fn error_payload(detail: &str) -> String {
    format!("Error: Failed to get a response from the model. {detail}")
}

async fn answer_with_retries(
    provider: &Arc<dyn LLMProvider>,
    context: &PromptContext,
    config: &LecternConfig,
) -> Result<String, String> {
    let messages = build_messages(context);
    let options = CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                attempt,
                max = config.max_retries,
                backoff_ms = backoff,
                "retrying model call"
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    input_tokens = response.prompt_tokens,
                    output_tokens = response.completion_tokens,
                    "model call succeeded"
                );
                return Ok(response.content);
            }
            Err(e) => {
                let msg = format!("{e}");
                warn!(attempt = attempt + 1, error = %msg, "model call failed");
                last_err = Some(msg);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "Unknown error".to_string()))
}

/// Build the message list: the tutor system prompt, then one user turn
/// carrying the assembled prompt plus any raster attachments.
fn build_messages(context: &PromptContext) -> Vec<ChatMessage> {
    let prompt = question_prompt(context);

    let images: Vec<ImageData> = context
        .attachments
        .iter()
        .filter_map(|a| match encode::split_data_uri(&a.data_uri) {
            Some((mime, payload)) => {
                Some(ImageData::new(payload.to_string(), mime.to_string()).with_detail("high"))
            }
            None => {
                warn!(page = a.page_number, "attachment is not a data URI; skipped");
                None
            }
        })
        .collect();

    let mut messages = vec![ChatMessage::system(TUTOR_SYSTEM_PROMPT)];
    if images.is_empty() {
        messages.push(ChatMessage::user(prompt));
    } else {
        messages.push(ChatMessage::user_with_images(prompt, images));
    }
    messages
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; this is how
///    tests inject fakes.
/// 2. **Named provider + model** (`config.provider_name`) — the factory
///    reads the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    honoured before auto-detection so an explicit model choice wins even
///    when several API keys are present.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`), preferring
///    OpenAI when its key is set.
fn resolve_provider(config: &LecternConfig) -> Result<Arc<dyn LLMProvider>, LecternError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| LecternError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                 Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, LecternError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        LecternError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_attachment() -> PromptContext {
        PromptContext {
            question: "what is this?".into(),
            scope_notice: "This answer is based only on slide 1 of 1.".into(),
            context_text: "Title\nBody".into(),
            visual_summary: None,
            attachments: vec![crate::context::VisualAttachment {
                page_number: 1,
                kind: crate::context::AttachmentKind::PageImage,
                data_uri: "data:image/png;base64,aGVsbG8=".into(),
            }],
        }
    }

    #[test]
    fn error_payload_is_well_formed() {
        let p = error_payload("boom");
        assert!(p.starts_with("Error: Failed to get a response from the model."));
        assert!(p.contains("boom"));
    }

    #[test]
    fn messages_carry_system_then_user() {
        let messages = build_messages(&context_with_attachment());
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn malformed_attachment_is_skipped_not_fatal() {
        let mut ctx = context_with_attachment();
        ctx.attachments[0].data_uri = "not a data uri".into();
        let messages = build_messages(&ctx);
        // Still a system + user pair; the broken image is simply absent.
        assert_eq!(messages.len(), 2);
    }
}
