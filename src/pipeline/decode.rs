//! Image decoding: validate the uploaded payload before any OCR work.
//!
//! ## Why decode in memory?
//!
//! The payload is decoded straight from the request buffer — no temp file.
//! Rejecting undecodable bytes here, before the OCR engine ever runs, gives
//! callers a precise client-error instead of a confusing engine failure, and
//! guarantees the rest of the pipeline only ever sees a valid raster image.

use crate::error::RxScanError;
use image::DynamicImage;
use tracing::debug;

/// True when a declared content type names an image category.
///
/// Front doors use this to reject uploads before buffering the body; it is
/// advisory only — [`decode_image`] still verifies the actual bytes.
pub fn is_image_mime(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .starts_with("image/")
}

/// Decode the payload into a raster image, rejecting anything that is not
/// a valid image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, RxScanError> {
    if bytes.is_empty() {
        return Err(RxScanError::EmptyImage);
    }

    let image = image::load_from_memory(bytes).map_err(|e| RxScanError::NotAnImage {
        detail: e.to_string(),
    })?;

    debug!(
        "Decoded image: {}x{} px, {} bytes input",
        image.width(),
        image.height(),
        bytes.len()
    );

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn valid_png_decodes() {
        let image = decode_image(&png_bytes()).unwrap();
        assert_eq!(image.width(), 8);
        assert_eq!(image.height(), 8);
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(decode_image(&[]), Err(RxScanError::EmptyImage)));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        let err = decode_image(b"this is definitely not an image").unwrap_err();
        assert!(matches!(err, RxScanError::NotAnImage { .. }));
    }

    #[test]
    fn truncated_image_is_rejected() {
        let mut bytes = png_bytes();
        bytes.truncate(12);
        assert!(matches!(
            decode_image(&bytes),
            Err(RxScanError::NotAnImage { .. })
        ));
    }

    #[test]
    fn mime_gate() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("image/jpeg; charset=binary"));
        assert!(!is_image_mime("application/pdf"));
        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime(""));
    }
}
