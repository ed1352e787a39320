//! Configuration types for prescription processing.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across threads and to diff two runs to
//! understand why their outputs differ.
//!
//! Credentials and endpoints are never embedded in source: the SMTP relay
//! comes from [`SmtpConfig`] (builder-supplied or `RXSCAN_SMTP_*` env vars)
//! and the interaction API base URL is a config field a caller or the CLI
//! can override.

use crate::error::RxScanError;
use crate::pipeline::ner::EntityRecognizer;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default interaction-label search endpoint (openFDA drug labels).
pub const DEFAULT_INTERACTION_API: &str = "https://api.fda.gov/drug/label.json";

/// Configuration for one prescription-processing pipeline.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use rxscan::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .ocr_languages("eng")
///     .model_dir("models/med-ner")
///     .lookup_timeout_secs(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Tesseract language codes, `+`-joined (e.g. `"eng"`, `"eng+fra"`).
    /// Default: `"eng"`.
    pub ocr_languages: String,

    /// Minimum model confidence for a span to enter the entity set.
    /// Range 0.0–1.0. Default: 0.0 (keep everything the model emits).
    pub min_entity_score: f32,

    /// Pre-constructed entity recognizer. Takes precedence over
    /// `model_dir`. Useful in tests or when the caller shares one loaded
    /// model across several configs.
    pub recognizer: Option<Arc<dyn EntityRecognizer>>,

    /// Directory holding `model.onnx`, `tokenizer.json`, and `config.json`
    /// for the token-classification model. If `None` along with
    /// `recognizer`, the `RXSCAN_MODEL_DIR` environment variable is
    /// consulted at process time.
    pub model_dir: Option<PathBuf>,

    /// Base URL of the interaction-label search endpoint.
    /// Default: [`DEFAULT_INTERACTION_API`].
    pub interaction_api: String,

    /// Per-lookup timeout in seconds. A timed-out lookup degrades to the
    /// lookup-unavailable sentinel rather than failing the request.
    /// Default: 5.
    pub lookup_timeout_secs: u64,

    /// Outbound mail relay settings for reminders. If `None`,
    /// [`SmtpConfig::from_env`] is consulted when a reminder is sent.
    pub smtp: Option<SmtpConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_languages: "eng".to_string(),
            min_entity_score: 0.0,
            recognizer: None,
            model_dir: None,
            interaction_api: DEFAULT_INTERACTION_API.to_string(),
            lookup_timeout_secs: 5,
            smtp: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("ocr_languages", &self.ocr_languages)
            .field("min_entity_score", &self.min_entity_score)
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn EntityRecognizer>"),
            )
            .field("model_dir", &self.model_dir)
            .field("interaction_api", &self.interaction_api)
            .field("lookup_timeout_secs", &self.lookup_timeout_secs)
            .field("smtp", &self.smtp)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn ocr_languages(mut self, langs: impl Into<String>) -> Self {
        self.config.ocr_languages = langs.into();
        self
    }

    pub fn min_entity_score(mut self, score: f32) -> Self {
        self.config.min_entity_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.model_dir = Some(dir.into());
        self
    }

    pub fn interaction_api(mut self, url: impl Into<String>) -> Self {
        self.config.interaction_api = url.into();
        self
    }

    pub fn lookup_timeout_secs(mut self, secs: u64) -> Self {
        self.config.lookup_timeout_secs = secs.max(1);
        self
    }

    pub fn smtp(mut self, smtp: SmtpConfig) -> Self {
        self.config.smtp = Some(smtp);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, RxScanError> {
        let c = &self.config;
        if c.ocr_languages.is_empty() {
            return Err(RxScanError::InvalidConfig(
                "OCR languages must not be empty".into(),
            ));
        }
        if !c.interaction_api.starts_with("http://") && !c.interaction_api.starts_with("https://")
        {
            return Err(RxScanError::InvalidConfig(format!(
                "Interaction API must be an HTTP(S) URL, got '{}'",
                c.interaction_api
            )));
        }
        Ok(self.config)
    }
}

/// Outbound mail relay settings.
///
/// The password is deliberately excluded from `Debug` output so configs can
/// be logged without leaking credentials.
#[derive(Clone)]
pub struct SmtpConfig {
    /// Relay hostname (e.g. `smtp.gmail.com`).
    pub host: String,
    /// Submission port. Default: 587 (STARTTLS).
    pub port: u16,
    /// Account username.
    pub username: String,
    /// Account password or app token.
    pub password: String,
    /// Sender mailbox for the `From` header.
    pub from: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

impl SmtpConfig {
    /// Read relay settings from `RXSCAN_SMTP_HOST`, `RXSCAN_SMTP_PORT`
    /// (optional, default 587), `RXSCAN_SMTP_USERNAME`,
    /// `RXSCAN_SMTP_PASSWORD`, and `RXSCAN_SMTP_FROM` (optional, defaults
    /// to the username).
    ///
    /// Returns `None` when any required variable is missing or empty.
    pub fn from_env() -> Option<Self> {
        let host = non_empty_env("RXSCAN_SMTP_HOST")?;
        let username = non_empty_env("RXSCAN_SMTP_USERNAME")?;
        let password = non_empty_env("RXSCAN_SMTP_PASSWORD")?;
        let port = std::env::var("RXSCAN_SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);
        let from = non_empty_env("RXSCAN_SMTP_FROM").unwrap_or_else(|| username.clone());
        Some(Self {
            host,
            port,
            username,
            password,
            from,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.ocr_languages, "eng");
        assert_eq!(config.interaction_api, DEFAULT_INTERACTION_API);
        assert_eq!(config.lookup_timeout_secs, 5);
        assert!(config.recognizer.is_none());
    }

    #[test]
    fn builder_clamps_score_and_timeout() {
        let config = PipelineConfig::builder()
            .min_entity_score(7.5)
            .lookup_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(config.min_entity_score, 1.0);
        assert_eq!(config.lookup_timeout_secs, 1);
    }

    #[test]
    fn builder_rejects_non_http_endpoint() {
        let err = PipelineConfig::builder()
            .interaction_api("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("HTTP"));
    }

    #[test]
    fn smtp_debug_redacts_password() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "reminders@example.com".into(),
            password: "hunter2".into(),
            from: "reminders@example.com".into(),
        };
        let debug = format!("{smtp:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
