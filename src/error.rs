//! Error types for the rxscan library.
//!
//! Two distinct failure modes exist, and only one of them is an error:
//!
//! * [`RxScanError`] — **Fatal**: the request cannot produce a report at all
//!   (undecodable image, OCR engine failure, entity model failure, reminder
//!   dispatch failure). Returned as `Err(RxScanError)` from the top-level
//!   entry points.
//!
//! * **Degraded lookup** — a failed drug-interaction lookup is *not* an
//!   error. The pipeline completes and the report carries
//!   [`crate::output::InteractionResult::LookupUnavailable`] instead of real
//!   interaction data. Callers distinguish degraded-but-complete responses
//!   from aborted ones by construction.
//!
//! Every fatal error maps to an [`ErrorClass`] so a transport layer can pick
//! a response code without matching on individual variants, and pipeline
//! errors additionally carry the [`Stage`] at which the request died.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the rxscan library.
#[derive(Debug, Error)]
pub enum RxScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The uploaded payload was empty.
    #[error("Empty image payload")]
    EmptyImage,

    /// The payload does not decode as a raster image.
    #[error("Payload is not a valid image: {detail}")]
    NotAnImage { detail: String },

    /// The image file could not be read from disk.
    #[error("Failed to read image '{path}': {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine reported an error. Engine failures never propagate
    /// raw; they always surface as this variant.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// OCR completed but produced no usable text (blank output).
    #[error("No text could be extracted from the image")]
    NoTextExtracted,

    // ── Entity-model errors ───────────────────────────────────────────────
    /// A required model file is missing from the model directory.
    #[error("Model file not found: '{path}'\nExpected model.onnx, tokenizer.json, and config.json in the model directory.")]
    ModelNotFound { path: PathBuf },

    /// The ONNX session or tokenizer failed to initialise.
    #[error("Entity model failed to load: {detail}")]
    ModelInit { detail: String },

    /// Model inference failed at request time.
    #[error("Entity extraction failed: {detail}")]
    EntityModelFailed { detail: String },

    /// No recognizer was configured and none could be resolved from the
    /// environment.
    #[error("No entity recognizer configured.\n{hint}")]
    RecognizerNotConfigured { hint: String },

    // ── Reminder errors ───────────────────────────────────────────────────
    /// The recipient address does not parse as a mailbox.
    #[error("Invalid reminder recipient: '{address}'")]
    InvalidRecipient { address: String },

    /// SMTP submission failed (connect, STARTTLS, auth, or send).
    #[error("Reminder dispatch failed: {detail}")]
    ReminderFailed { detail: String },

    /// Reminder requested but no SMTP relay is configured.
    #[error("SMTP relay not configured.\nSet RXSCAN_SMTP_HOST / RXSCAN_SMTP_USERNAME / RXSCAN_SMTP_PASSWORD / RXSCAN_SMTP_FROM, or supply SmtpConfig in the pipeline config.")]
    SmtpNotConfigured,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error. Logged in full server-side; callers should
    /// show only a generic message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The pipeline stage at which a request failed.
///
/// The orchestrator walks `decode → ocr → nlp → interactions`; the
/// interactions stage never fails (it degrades to a sentinel), so it has no
/// stage tag here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Payload-to-image decoding.
    Decode,
    /// Optical character recognition.
    Ocr,
    /// Entity recognition and bucketing.
    Nlp,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Decode => write!(f, "decode"),
            Stage::Ocr => write!(f, "ocr"),
            Stage::Nlp => write!(f, "nlp"),
        }
    }
}

/// Coarse error classification for transport layers.
///
/// A front door maps these to response codes: `InvalidInput` → client
/// error, `Extraction`/`Classification` → unprocessable entity,
/// `Notification` → reminder-specific failure, `Internal` → generic server
/// error whose detail must never reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidInput,
    Extraction,
    Classification,
    Notification,
    Internal,
}

impl RxScanError {
    /// The pipeline stage this error aborted, if it is a pipeline error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::EmptyImage | Self::NotAnImage { .. } | Self::ImageRead { .. } => {
                Some(Stage::Decode)
            }
            Self::OcrFailed { .. } | Self::NoTextExtracted => Some(Stage::Ocr),
            Self::ModelNotFound { .. }
            | Self::ModelInit { .. }
            | Self::EntityModelFailed { .. }
            | Self::RecognizerNotConfigured { .. } => Some(Stage::Nlp),
            _ => None,
        }
    }

    /// Classify this error for response-code selection.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::EmptyImage | Self::NotAnImage { .. } | Self::ImageRead { .. } => {
                ErrorClass::InvalidInput
            }
            Self::OcrFailed { .. } | Self::NoTextExtracted => ErrorClass::Extraction,
            Self::ModelNotFound { .. }
            | Self::ModelInit { .. }
            | Self::EntityModelFailed { .. }
            | Self::RecognizerNotConfigured { .. } => ErrorClass::Classification,
            Self::InvalidRecipient { .. } | Self::ReminderFailed { .. } | Self::SmtpNotConfigured => {
                ErrorClass::Notification
            }
            Self::InvalidConfig(_) | Self::Internal(_) => ErrorClass::Internal,
        }
    }
}
