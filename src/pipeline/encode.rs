//! Image encoding for the recognizers.
//!
//! Both engines receive the page as PNG: tesseract reads it from a file,
//! the vision recognizer gets it base64-wrapped in an [`ImageData`]. PNG
//! is lossless, and JPEG artefacts around glyph edges hurt recognition of
//! small print such as quotation numbers.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// PNG bytes of a rendered page.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Base64 PNG ready for a vision-model request.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let b64 = STANDARD.encode(encode_png(img)?);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
