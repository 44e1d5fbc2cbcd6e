//! # Image Processing Module
//!
//! Questo modulo transcodifica una singola immagine di un archivio nel
//! formato di output configurato.
//!
//! ## Pipeline di Transcodifica
//!
//! 1. **Decodifica**: formato dedotto dall'estensione del membro (PNG/JPEG)
//! 2. **Normalizzazione colore**:
//!    - immagini con canale alpha composte su sfondo bianco opaco
//!      (`out = a * src + (1 - a) * 255`, per pixel)
//!    - ogni altra modalità convertita in RGB 8 bit
//! 3. **Encoding** alla qualità richiesta con il massimo sforzo di compressione
//! 4. **Rinomina**: estensione del membro sostituita con quella del formato target
//!
//! ## Formati Supportati
//!
//! | Formato | Input | Output | Codec                    |
//! |---------|-------|--------|--------------------------|
//! | PNG     | ✅    | ❌     | `image`                  |
//! | JPEG    | ✅    | ✅     | `image` (JpegEncoder)    |
//! | WebP    | ❌    | ✅     | `webp` (libwebp, lossy)  |
//!
//! ## Concorrenza
//!
//! `ImageProcessor` è `Copy` e non ha stato mutabile condiviso: ogni worker
//! del pool ne riceve una copia e può chiamare `transcode` in parallelo.
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = ImageProcessor::new(OutputFormat::Webp);
//! let entry = processor.transcode(&raw, "pages/001.png", 85)?;
//! assert_eq!(entry.output_name, "pages/001.webp");
//! ```

use crate::{
    config::OutputFormat,
    error::{CompressError, Result},
};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::Path;

/// libwebp method: 0 = fastest, 6 = slowest with best compression
const WEBP_METHOD: i32 = 6;

/// Output of one transcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodedEntry {
    /// Member name with the extension rewritten for the target encoding
    pub output_name: String,
    pub encoded_bytes: Vec<u8>,
}

/// Stateless image transcoder
#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    format: OutputFormat,
}

impl ImageProcessor {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Decode `raw`, flatten it to opaque RGB and encode it at `quality`.
    ///
    /// `quality` must already be validated to 1-100.
    pub fn transcode(&self, raw: &[u8], source_name: &str, quality: u8) -> Result<TranscodedEntry> {
        let decoded = Self::decode(raw, source_name)?;
        let rgb = Self::flatten(decoded);

        let encoded_bytes = match self.format {
            OutputFormat::Webp => Self::encode_webp(&rgb, source_name, quality)?,
            OutputFormat::Jpeg => Self::encode_jpeg(&rgb, source_name, quality)?,
        };

        Ok(TranscodedEntry {
            output_name: Self::output_name(source_name, self.format.extension()),
            encoded_bytes,
        })
    }

    fn decode(raw: &[u8], source_name: &str) -> Result<DynamicImage> {
        let ext = Path::new(source_name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        let format = match ext.as_deref() {
            Some("png") => ImageFormat::Png,
            Some("jpg") | Some("jpeg") => ImageFormat::Jpeg,
            _ => {
                return Err(CompressError::DecodeError {
                    member: source_name.to_string(),
                    reason: "unsupported image format".to_string(),
                })
            }
        };

        image::load_from_memory_with_format(raw, format).map_err(|e| CompressError::DecodeError {
            member: source_name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Strip transparency by compositing onto white; convert everything else to RGB8
    pub fn flatten(image: DynamicImage) -> RgbImage {
        if !image.color().has_alpha() {
            return match image {
                DynamicImage::ImageRgb8(rgb) => rgb,
                other => other.to_rgb8(),
            };
        }

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut flattened = RgbImage::new(width, height);

        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = u32::from(a);
            let blend = |channel: u8| -> u8 {
                ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
            };
            flattened.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
        }

        flattened
    }

    fn encode_webp(rgb: &RgbImage, source_name: &str, quality: u8) -> Result<Vec<u8>> {
        let mut config = webp::WebPConfig::new().map_err(|_| CompressError::EncodeError {
            member: source_name.to_string(),
            reason: "failed to initialise WebP encoder config".to_string(),
        })?;
        config.lossless = 0;
        config.quality = f32::from(quality);
        config.method = WEBP_METHOD;

        let encoder = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height());
        let memory = encoder.encode_advanced(&config).map_err(|e| CompressError::EncodeError {
            member: source_name.to_string(),
            reason: format!("{:?}", e),
        })?;

        Ok(memory.to_vec())
    }

    fn encode_jpeg(rgb: &RgbImage, source_name: &str, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| CompressError::EncodeError {
                member: source_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }

    /// Replace the extension of an archive member name (`/`-separated)
    pub fn output_name(source_name: &str, extension: &str) -> String {
        let stem_end = match source_name.rfind('.') {
            Some(dot) if !source_name[dot..].contains('/') => dot,
            _ => source_name.len(),
        };
        format!("{}.{}", &source_name[..stem_end], extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{solid_jpeg, transparent_png};
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn test_output_name_rewrites_extension() {
        assert_eq!(ImageProcessor::output_name("001.png", "webp"), "001.webp");
        assert_eq!(ImageProcessor::output_name("ch1/p.02.JPEG", "webp"), "ch1/p.02.webp");
        assert_eq!(ImageProcessor::output_name("v1.0/cover", "jpg"), "v1.0/cover.jpg");
    }

    #[test]
    fn test_solid_jpeg_transcodes_to_smaller_webp() {
        let source = solid_jpeg(100, 100, [200, 40, 40], 95);
        let processor = ImageProcessor::new(OutputFormat::Webp);

        let entry = processor.transcode(&source, "pages/001.jpg", 85).unwrap();
        assert_eq!(entry.output_name, "pages/001.webp");
        assert!(entry.encoded_bytes.len() < source.len());

        let decoded = image::load_from_memory_with_format(&entry.encoded_bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.dimensions(), (100, 100));
    }

    #[test]
    fn test_jpeg_output_format() {
        let source = solid_jpeg(64, 32, [10, 120, 250], 95);
        let processor = ImageProcessor::new(OutputFormat::Jpeg);

        let entry = processor.transcode(&source, "002.jpeg", 50).unwrap();
        assert_eq!(entry.output_name, "002.jpg");
        let decoded = image::load_from_memory_with_format(&entry.encoded_bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
    }

    #[test]
    fn test_flatten_composites_alpha_onto_white() {
        let mut rgba = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        rgba.put_pixel(2, 2, Rgba([0, 0, 0, 128]));

        let flattened = ImageProcessor::flatten(DynamicImage::ImageRgba8(rgba));
        assert_eq!(flattened.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flattened.get_pixel(1, 1), &Rgb([0, 0, 0]));
        assert_eq!(flattened.get_pixel(2, 2), &Rgb([127, 127, 127]));
    }

    #[test]
    fn test_flatten_converts_grayscale_to_rgb() {
        let gray = image::GrayImage::from_pixel(3, 3, image::Luma([90]));
        let flattened = ImageProcessor::flatten(DynamicImage::ImageLuma8(gray));
        assert_eq!(flattened.get_pixel(1, 1), &Rgb([90, 90, 90]));
    }

    #[test]
    fn test_transparent_png_renders_white() {
        let source = transparent_png(32, 32);
        let processor = ImageProcessor::new(OutputFormat::Webp);

        let entry = processor.transcode(&source, "alpha.png", 90).unwrap();
        let decoded = image::load_from_memory_with_format(&entry.encoded_bytes, ImageFormat::WebP)
            .unwrap()
            .to_rgb8();

        // Left half of the fixture is fully transparent
        for (x, y) in [(0, 0), (3, 10), (8, 31)] {
            let Rgb([r, g, b]) = *decoded.get_pixel(x, y);
            assert!(r >= 250 && g >= 250 && b >= 250, "pixel ({x},{y}) = {:?}", (r, g, b));
        }
    }

    #[test]
    fn test_truncated_jpeg_is_decode_error() {
        let mut source = solid_jpeg(100, 100, [0, 200, 0], 90);
        source.truncate(20);
        let processor = ImageProcessor::new(OutputFormat::Webp);

        let err = processor.transcode(&source, "broken.jpg", 85).unwrap_err();
        assert!(matches!(err, CompressError::DecodeError { .. }));
        assert_eq!(err.member(), Some("broken.jpg"));
    }

    #[test]
    fn test_transcode_is_safe_across_threads() {
        let source = solid_jpeg(48, 48, [30, 30, 200], 95);
        let processor = ImageProcessor::new(OutputFormat::Webp);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let source = source.clone();
                std::thread::spawn(move || processor.transcode(&source, &format!("{i}.jpg"), 80))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let entry = handle.join().unwrap().unwrap();
            assert_eq!(entry.output_name, format!("{i}.webp"));
        }
    }
}
