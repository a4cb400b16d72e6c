//! Configuration types for a document-intake session.
//!
//! Every knob lives in [`IntakeConfig`], built via [`IntakeConfigBuilder`].
//! The same config drives the input pipeline (size limits, enhancement), the
//! vision classifier (provider, retries, timeouts) and the state machine's
//! policy (review threshold, optional rejection limit).

use crate::error::IntakeError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default upper bound on a submitted file: 20 MiB.
pub const DEFAULT_MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

/// Upper bound on retries per classification.
pub const MAX_RETRIES: u32 = 10;

/// Configuration for an intake session.
///
/// # Example
/// ```rust
/// use edgequake_intake::IntakeConfig;
///
/// let config = IntakeConfig::builder()
///     .model("gpt-4.1-mini")
///     .max_retries(2)
///     .max_consecutive_rejections(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_consecutive_rejections, Some(5));
/// ```
#[derive(Clone)]
pub struct IntakeConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano", "gemini-2.0-flash".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for classification. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate per classification. Default: 2048.
    ///
    /// The JSON verdict plus twenty extracted fields stays well under 1 500
    /// tokens; the margin absorbs verbose feedback text.
    pub max_tokens: usize,

    /// Extra attempts after a failed classification call. Default: 1.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 2000.
    pub retry_backoff_ms: u64,

    /// Per-call timeout for the vision model in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom classification prompt. If None, uses the built-in prompt.
    pub system_prompt: Option<String>,

    /// Largest accepted file in bytes. Default: 20 MiB.
    pub max_file_bytes: usize,

    /// Download timeout for URL inputs in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Clean up photos (contrast, sharpening) before classification. Default: true.
    pub enhance_images: bool,

    /// Longest edge, in pixels, of images sent to the model or rendered from
    /// PDF pages. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Number of PDF pages rasterised for classification. Default: 2.
    pub classification_pages: usize,

    /// Confidence below which a critical field raises a review alert. Default: 0.85.
    pub confidence_threshold: f32,

    /// Number of alerts at which the result is flagged for manual review. Default: 2.
    pub review_alert_limit: usize,

    /// Consecutive rejections after which the session enters `Error`.
    /// Default: None (never; the user may retry indefinitely).
    pub max_consecutive_rejections: Option<u32>,

    /// Observer for state changes and transcript messages.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 2048,
            max_retries: 1,
            retry_backoff_ms: 2000,
            api_timeout_secs: 60,
            system_prompt: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            download_timeout_secs: 30,
            enhance_images: true,
            max_rendered_pixels: 2000,
            classification_pages: 2,
            confidence_threshold: 0.85,
            review_alert_limit: 2,
            max_consecutive_rejections: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IntakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("enhance_images", &self.enhance_images)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("max_consecutive_rejections", &self.max_consecutive_rejections)
            .finish()
    }
}

impl IntakeConfig {
    /// Create a new builder for `IntakeConfig`.
    pub fn builder() -> IntakeConfigBuilder {
        IntakeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IntakeConfig`].
pub struct IntakeConfigBuilder {
    config: IntakeConfig,
}

impl IntakeConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    /// Clamped to 10.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_file_bytes(mut self, n: usize) -> Self {
        self.config.max_file_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn enhance_images(mut self, v: bool) -> Self {
        self.config.enhance_images = v;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn classification_pages(mut self, n: usize) -> Self {
        self.config.classification_pages = n;
        self
    }

    pub fn confidence_threshold(mut self, t: f32) -> Self {
        self.config.confidence_threshold = t;
        self
    }

    pub fn review_alert_limit(mut self, n: usize) -> Self {
        self.config.review_alert_limit = n;
        self
    }

    pub fn max_consecutive_rejections(mut self, n: u32) -> Self {
        self.config.max_consecutive_rejections = Some(n);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IntakeConfig, IntakeError> {
        let c = &self.config;
        if c.max_file_bytes == 0 {
            return Err(IntakeError::InvalidConfig(
                "max_file_bytes must be ≥ 1".into(),
            ));
        }
        if c.classification_pages == 0 {
            return Err(IntakeError::InvalidConfig(
                "classification_pages must be ≥ 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.confidence_threshold) {
            return Err(IntakeError::InvalidConfig(format!(
                "confidence_threshold must be 0.0–1.0, got {}",
                c.confidence_threshold
            )));
        }
        if c.review_alert_limit == 0 {
            return Err(IntakeError::InvalidConfig(
                "review_alert_limit must be ≥ 1".into(),
            ));
        }
        if c.max_consecutive_rejections == Some(0) {
            return Err(IntakeError::InvalidConfig(
                "max_consecutive_rejections must be ≥ 1 when set".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(IntakeError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = IntakeConfig::default();
        assert_eq!(c.max_file_bytes, 20 * 1024 * 1024);
        assert_eq!(c.max_retries, 1);
        assert_eq!(c.retry_backoff_ms, 2000);
        assert_eq!(c.download_timeout_secs, 30);
        assert!((c.confidence_threshold - 0.85).abs() < f32::EPSILON);
        assert_eq!(c.max_consecutive_rejections, None);
        assert!(c.enhance_images);
    }

    #[test]
    fn builder_rejects_out_of_range_threshold() {
        let err = IntakeConfig::builder()
            .confidence_threshold(1.5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn builder_rejects_zero_rejection_limit() {
        assert!(IntakeConfig::builder()
            .max_consecutive_rejections(0)
            .build()
            .is_err());
    }

    #[test]
    fn builder_clamps_temperature_and_pixels() {
        let c = IntakeConfig::builder()
            .temperature(5.0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_clamps_retries() {
        let c = IntakeConfig::builder().max_retries(500).build().unwrap();
        assert_eq!(c.max_retries, 10);
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", IntakeConfig::default());
        assert!(s.contains("IntakeConfig"));
        assert!(!s.contains("progress_callback"));
    }
}
