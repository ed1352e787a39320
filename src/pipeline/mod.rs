//! Pipeline stages for prescription processing.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch OCR backend) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! decode ──▶ ocr ──▶ ner ──▶ classify ──▶ interactions
//! (image)  (leptess) (ort)  (bucketing)  (openFDA)
//! ```
//!
//! 1. [`decode`] — validate the payload decodes as a raster image, in memory
//! 2. [`ocr`]    — recognise text; runs in `spawn_blocking` because
//!    Tesseract is not async-safe
//! 3. [`ner`]    — token-classification inference, simple span aggregation
//! 4. [`classify`] — bucket spans into DRUG / DOSAGE / FREQUENCY
//! 5. [`interactions`] — the only stage with network I/O; degrades to a
//!    sentinel instead of failing the request
//!
//! [`dosage`] and [`reminder`] are on-demand operations against
//! already-extracted data, not pipeline stages.

pub mod classify;
pub mod decode;
pub mod dosage;
pub mod interactions;
pub mod ner;
pub mod ocr;
pub mod reminder;
