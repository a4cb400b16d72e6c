//! Vision-model classification adapter.
//!
//! [`VisionClassifier`] implements [`Classifier`] on top of any
//! `edgequake-llm` provider. All prompt text lives in [`crate::prompts`] and
//! all reply cleanup in [`super::postprocess`]; this module owns the request
//! layout, the retry loop and the mapping of failures into rejections.
//!
//! ## Retry Strategy
//!
//! Transport errors, timeouts and unparseable replies are retried with
//! exponential backoff (`retry_backoff_ms * 2^(attempt - 1)`, saturating). With the defaults
//! (one retry, 2 s) a broken call costs at most two requests and a 2 s wait.

use super::encode::{encode_bytes, encode_page};
use super::postprocess::parse_classification;
use super::render::render_pages;
use crate::config::IntakeConfig;
use crate::model::{ClassificationResult, SubmittedFile};
use crate::ports::{ClassificationRequest, Classifier};
use crate::prompts::{context_hint, CLASSIFICATION_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// MIME types every supported vision provider accepts inline.
const NATIVE_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Classifies submissions with a vision-capable LLM.
pub struct VisionClassifier {
    provider: Arc<dyn LLMProvider>,
    config: IntakeConfig,
}

impl VisionClassifier {
    pub fn new(provider: Arc<dyn LLMProvider>, config: IntakeConfig) -> Self {
        Self { provider, config }
    }

    async fn try_classify(&self, request: ClassificationRequest<'_>) -> Result<ClassificationResult, String> {
        let images = self.prepare_images(request.file).await?;
        let messages = build_messages(
            self.config.system_prompt.as_deref(),
            context_hint(request.expected_side, request.expected_kind),
            images,
        );
        let options = build_options(&self.config);
        let provider = &self.provider;
        let (messages, options) = (&messages, &options);
        let name = request.file.name.as_str();
        let start = Instant::now();

        let call = move || async move {
            let response = provider
                .chat(messages, Some(options))
                .await
                .map_err(|e| e.to_string())?;
            debug!(
                "{}: {} input tokens, {} output tokens, {:?}",
                name,
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );
            Ok::<_, String>(response.content)
        };
        with_retries(name, &self.config, call).await
    }

    /// PDFs are rasterised; images are forwarded, converted to PNG when the
    /// provider would not accept their format.
    async fn prepare_images(&self, file: &SubmittedFile) -> Result<Vec<ImageData>, String> {
        if file.is_pdf() {
            let pages = render_pages(
                &file.name,
                Arc::clone(&file.data),
                self.config.classification_pages,
                self.config.max_rendered_pixels,
            )
            .await
            .map_err(|e| e.to_string())?;
            return pages
                .iter()
                .map(|page| encode_page(page).map_err(|e| e.to_string()))
                .collect();
        }

        if NATIVE_IMAGE_TYPES.contains(&file.mime_type.as_str()) {
            return Ok(vec![encode_bytes(&file.data, &file.mime_type)]);
        }

        let img = image::load_from_memory(&file.data)
            .map_err(|e| format!("{} could not be decoded: {}", file.name, e))?;
        Ok(vec![encode_page(&img).map_err(|e| e.to_string())?])
    }
}

#[async_trait]
impl Classifier for VisionClassifier {
    /// Never fails: every error becomes a rejection-shaped result carrying
    /// the technical detail as feedback.
    async fn classify(&self, request: ClassificationRequest<'_>) -> ClassificationResult {
        match self.try_classify(request).await {
            Ok(result) => result,
            Err(detail) => {
                warn!("Classification of {} failed: {}", request.file.name, detail);
                failure_result(&detail)
            }
        }
    }
}

fn failure_result(detail: &str) -> ClassificationResult {
    ClassificationResult::failed(format!(
        "We could not analyse the document ({detail}). Please try again."
    ))
}

/// Runs `call` until its reply parses, at most `max_retries + 1` times.
async fn with_retries<F, Fut>(name: &str, config: &IntakeConfig, call: F) -> Result<ClassificationResult, String>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, String>>,
{
    let mut last_err = String::from("Unknown error");
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!("{}: retry {}/{} after {}ms", name, attempt, config.max_retries, backoff);
            sleep(Duration::from_millis(backoff)).await;
        }

        let content = match timeout(Duration::from_secs(config.api_timeout_secs), call()).await {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", name, attempt + 1, e);
                last_err = e;
                continue;
            }
            Err(_) => {
                last_err = format!("no answer within {}s", config.api_timeout_secs);
                warn!("{}: attempt {} timed out", name, attempt + 1);
                continue;
            }
        };

        match parse_classification(&content) {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!("{}: attempt {} returned an unusable reply: {}", name, attempt + 1, e);
                last_err = e;
            }
        }
    }

    Err(last_err)
}

/// `base * 2^(attempt - 1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Request layout:
/// 1. system prompt (built-in or override)
/// 2. context hint naming the side and kind expected *(second side only)*
/// 3. user message with the image(s)
fn build_messages(
    system_prompt: Option<&str>,
    hint: Option<String>,
    images: Vec<ImageData>,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_prompt.unwrap_or(CLASSIFICATION_PROMPT))];
    if let Some(hint) = hint {
        messages.push(ChatMessage::system(hint));
    }
    messages.push(ChatMessage::user_with_images(
        "Classify this document and extract its data.",
        images,
    ));
    messages
}

fn build_options(config: &IntakeConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&IntakeConfig::default());
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn messages_include_hint_only_when_given() {
        let img = || encode_bytes(&[0xFF, 0xD8, 0xFF], "image/jpeg");
        assert_eq!(build_messages(None, None, vec![img()]).len(), 2);
        assert_eq!(build_messages(None, Some("hint".into()), vec![img()]).len(), 3);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(2000, 1), 2000);
        assert_eq!(backoff_ms(2000, 3), 8000);
        assert_eq!(backoff_ms(2000, 200), u64::MAX);
    }

    #[tokio::test]
    async fn every_attempt_failing_yields_a_rejection() {
        use crate::model::DocumentSide;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let config = IntakeConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(0)
            .build()
            .unwrap();
        let calls = AtomicUsize::new(0);
        let call = || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("connection reset".to_string())
                } else {
                    Ok("I think this is an ID card.".to_string())
                }
            }
        };

        let detail = with_retries("front.jpg", &config, call).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let result = failure_result(&detail);
        assert!(!result.is_valid);
        assert!(!result.is_legible);
        assert_eq!(result.detected_side, DocumentSide::Unknown);
        assert!(result.feedback.contains("Please try again"));
    }

    #[tokio::test]
    async fn retry_stops_at_first_parseable_reply() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let config = IntakeConfig::builder()
            .max_retries(3)
            .retry_backoff_ms(0)
            .build()
            .unwrap();
        let calls = AtomicUsize::new(0);
        let call = || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("HTTP 503".to_string())
                } else {
                    Ok(r#"{"documentType": "cedula_ciudadania", "documentSide": "front", "isValidDocument": true, "isLegible": true}"#.to_string())
                }
            }
        };

        let result = with_retries("front.jpg", &config, call).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(result.is_valid);
    }
}
