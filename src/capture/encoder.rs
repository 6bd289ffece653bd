// encoder.rs: JPEG-encodes a captured frame and base64-wraps it twice over:
// a bare payload for the vision endpoint and a `data:` URL for display.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use super::CaptureError;

/// Photographic preset, matching a browser canvas' default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

const JPEG_DATA_HEADER: &str = "data:image/jpeg;base64,";

/// An encoded frame in both of its forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Base64 JPEG with no `data:` header; what the vision endpoint expects.
    pub payload: String,
    /// `data:image/jpeg;base64,<payload>`; self-contained, stored in the gallery.
    pub display_ref: String,
    pub width: u32,
    pub height: u32,
}

pub struct ImageEncoder {
    /// JPEG compression quality (1–100).
    jpeg_quality: u8,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageEncoder {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Encode at native resolution. Alpha is dropped; JPEG has none.
    pub fn encode(&self, frame: &DynamicImage) -> Result<EncodedImage, CaptureError> {
        let rgb = frame.to_rgb8();
        let (w, h) = rgb.dimensions();
        if w == 0 || h == 0 {
            return Err(CaptureError::EncodeFailed(format!("empty frame {w}x{h}")));
        }

        let mut jpeg_buf: Vec<u8> = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg_buf, self.jpeg_quality)
            .encode(rgb.as_raw(), w, h, image::ExtendedColorType::Rgb8)
            .map_err(|e| CaptureError::EncodeFailed(format!("jpeg encode: {e}")))?;

        let payload = BASE64.encode(&jpeg_buf);
        let display_ref = format!("{JPEG_DATA_HEADER}{payload}");
        log::debug!(
            "ImageEncoder: {}x{} -> {} bytes JPEG (q={})",
            w,
            h,
            jpeg_buf.len(),
            self.jpeg_quality
        );

        Ok(EncodedImage {
            payload,
            display_ref,
            width: w,
            height: h,
        })
    }
}

/// Remove a leading `data:image/<type>;base64,` header, if any.
pub fn strip_data_header(data: &str) -> &str {
    let Some(rest) = data.strip_prefix("data:image/") else {
        return data;
    };
    let Some((media_type, payload)) = rest.split_once(";base64,") else {
        return data;
    };
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if !media_type.is_empty() && media_type.chars().all(is_word) {
        payload
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Helper: create a solid-colour RGBA image.
    fn solid_image(r: u8, g: u8, b: u8, w: u32, h: u32) -> DynamicImage {
        let mut img = RgbaImage::new(w, h);
        for pixel in img.pixels_mut() {
            *pixel = Rgba([r, g, b, 255]);
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn encode_produces_jpeg_in_both_forms() {
        let encoded = ImageEncoder::default()
            .encode(&solid_image(200, 120, 40, 32, 24))
            .unwrap();

        assert_eq!((encoded.width, encoded.height), (32, 24));
        assert_eq!(
            encoded.display_ref,
            format!("data:image/jpeg;base64,{}", encoded.payload)
        );

        let bytes = BASE64.decode(&encoded.payload).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn payload_is_display_ref_without_header() {
        let encoded = ImageEncoder::new(75)
            .encode(&solid_image(0, 0, 0, 8, 8))
            .unwrap();
        assert_eq!(strip_data_header(&encoded.display_ref), encoded.payload);
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(ImageEncoder::new(0).jpeg_quality(), 1);
        assert_eq!(ImageEncoder::new(250).jpeg_quality(), 100);
    }

    #[test]
    fn empty_frame_is_an_error() {
        let result = ImageEncoder::default().encode(&DynamicImage::new_rgb8(0, 0));
        assert!(matches!(result, Err(CaptureError::EncodeFailed(_))));
    }

    #[test]
    fn strip_data_header_cases() {
        assert_eq!(strip_data_header("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_header("data:image/jpeg;base64,"), "");
        assert_eq!(strip_data_header("QUJD"), "QUJD");
        assert_eq!(
            strip_data_header("data:text/plain;base64,QUJD"),
            "data:text/plain;base64,QUJD"
        );
        assert_eq!(
            strip_data_header("data:image/svg+xml;base64,QUJD"),
            "data:image/svg+xml;base64,QUJD"
        );
    }
}
