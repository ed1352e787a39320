//! # rxscan
//!
//! Extract structured medical information from photographed prescriptions.
//!
//! ## Why this crate?
//!
//! A prescription photo is unstructured pixels. Downstream safety checks —
//! drug-interaction lookups, dosage validation, reminders — need structured
//! `drug / dosage / frequency` triples. This crate runs OCR over the image,
//! pushes the recognised text through a clinical token-classification model,
//! buckets the resulting spans, and attaches an interaction verdict, all in
//! one linear per-request pipeline with no shared mutable state.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Decode        validate the payload as a raster image, in memory
//!  ├─ 2. OCR           Tesseract via leptess (CPU-bound, spawn_blocking)
//!  ├─ 3. Entities      ONNX token-classification + simple span aggregation
//!  ├─ 4. Classify      bucket spans into DRUG / DOSAGE / FREQUENCY
//!  ├─ 5. Interactions  openFDA label search — degrades, never aborts
//!  └─ 6. Report        raw text + entity set + interaction verdict + stats
//! ```
//!
//! Dosage validation ([`validate_dosage`]) and reminders
//! ([`send_reminder`]) operate on the extracted data on demand; they are
//! not pipeline stages.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rxscan::{process, validate_dosage, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Model resolved from config.model_dir or RXSCAN_MODEL_DIR
//!     let config = PipelineConfig::builder()
//!         .model_dir("models/med-ner")
//!         .build()?;
//!
//!     let bytes = std::fs::read("prescription.jpg")?;
//!     let report = process(&bytes, &config).await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     if let Some((drug, dosage)) = report.first_drug_and_dosage() {
//!         println!("{}", validate_dosage(drug, dosage));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Sharing the model
//!
//! Loading the NER model is a one-time, process-wide step. Services should
//! call [`OnnxRecognizer::load`] once at startup and pass the `Arc` through
//! [`PipelineConfig`]; the recognizer is safe for concurrent inference
//! (session access is internally serialised).
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rxscan` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! rxscan = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, SmtpConfig, DEFAULT_INTERACTION_API};
pub use error::{ErrorClass, RxScanError, Stage};
pub use output::{
    EntitySet, InteractionResult, PipelineStats, PrescriptionReport, ValidationVerdict,
};
pub use pipeline::dosage::validate_dosage;
pub use pipeline::interactions::check_interactions;
pub use pipeline::ner::{EntityRecognizer, OnnxRecognizer, TokenSpan};
pub use pipeline::reminder::{format_reminder, send_reminder, REMINDER_SUBJECT};
pub use process::{extract_entities, process, process_from_file, process_sync};
