//! Optical character recognition: image → raw text via Tesseract.
//!
//! ## Why spawn_blocking?
//!
//! `leptess` wraps the Tesseract/Leptonica C libraries, which are CPU-bound
//! and not safe to call from async contexts. `tokio::task::spawn_blocking`
//! moves the work onto the blocking thread pool so Tokio worker threads are
//! not stalled for the duration of a recognition pass.
//!
//! ## Why re-encode to PNG?
//!
//! Leptonica reads images from memory in its own supported container
//! formats, not from the `DynamicImage` pixel buffer. Re-encoding the
//! already-validated image to an in-memory PNG is lossless and keeps the
//! whole exchange off the filesystem.
//!
//! Engine failures of any kind surface as [`RxScanError::OcrFailed`] — the
//! caller can rely on that single variant and never sees a raw engine error.
//! Blank output is returned as-is; deciding that blank means failure is the
//! orchestrator's call.

use crate::error::RxScanError;
use image::DynamicImage;
use leptess::LepTess;
use std::io::Cursor;
use tracing::debug;

/// Recognise text in a decoded image.
///
/// `languages` is a Tesseract language spec such as `"eng"` or `"eng+fra"`;
/// the matching traineddata files must be installed on the host.
pub async fn extract_text(image: &DynamicImage, languages: &str) -> Result<String, RxScanError> {
    let image = image.clone();
    let languages = languages.to_string();

    tokio::task::spawn_blocking(move || extract_text_blocking(&image, &languages))
        .await
        .map_err(|e| RxScanError::Internal(format!("OCR task panicked: {e}")))?
}

/// Blocking implementation of text recognition.
fn extract_text_blocking(image: &DynamicImage, languages: &str) -> Result<String, RxScanError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| RxScanError::OcrFailed {
            detail: format!("image re-encoding failed: {e}"),
        })?;

    let mut engine = LepTess::new(None, languages).map_err(|e| RxScanError::OcrFailed {
        detail: format!("engine init failed for '{languages}': {e}"),
    })?;

    engine
        .set_image_from_mem(&png)
        .map_err(|e| RxScanError::OcrFailed {
            detail: format!("engine rejected image: {e}"),
        })?;

    let text = engine.get_utf8_text().map_err(|e| RxScanError::OcrFailed {
        detail: format!("recognition failed: {e}"),
    })?;

    debug!("OCR produced {} bytes of text", text.len());
    Ok(text)
}
