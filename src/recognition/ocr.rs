use image::{DynamicImage, GrayImage};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::Path;

use crate::error::RecognitionError;

/// Seam between the pipeline and the OCR engine. The engine needs on-disk
/// models, so tests substitute their own reader.
pub trait DigitReader {
    /// Read the digits printed in the region. An empty string means no
    /// digits were recognized and is a normal outcome.
    fn read_digits(&self, region: &GrayImage) -> Result<String, RecognitionError>;
}

/// Digit recognition backed by the ocrs engine.
pub struct OcrDigitReader {
    engine: OcrEngine,
}

impl OcrDigitReader {
    /// Load the detection and recognition models from the standard cache
    /// location and construct the engine.
    pub fn new() -> Result<Self, RecognitionError> {
        let engine = init_ocr_engine()?;
        Ok(Self { engine })
    }
}

impl DigitReader for OcrDigitReader {
    fn read_digits(&self, region: &GrayImage) -> Result<String, RecognitionError> {
        // Small crops recognize poorly; upscale before inference.
        let prepared = prepare_region(region);
        let img = DynamicImage::ImageLuma8(prepared).to_rgb8();

        let source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| RecognitionError::EngineUnavailable(e.to_string()))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| RecognitionError::EngineUnavailable(e.to_string()))?;

        match self.engine.get_text(&input) {
            Ok(text) => Ok(clean_digits(&text)),
            // The engine ran but found nothing legible in this region.
            Err(_) => Ok(String::new()),
        }
    }
}

/// Initialize the OCR engine with models from the standard cache location.
fn init_ocr_engine() -> Result<OcrEngine, RecognitionError> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| RecognitionError::EngineUnavailable("no home directory".to_string()))?;

    let cache_dir = Path::new(&home_dir).join(".cache/ocrs");
    let detection_model_path = cache_dir.join("text-detection.rten");
    let recognition_model_path = cache_dir.join("text-recognition.rten");

    if !detection_model_path.exists() || !recognition_model_path.exists() {
        return Err(RecognitionError::EngineUnavailable(format!(
            "OCR models not found, expected:\n  - {}\n  - {}",
            detection_model_path.display(),
            recognition_model_path.display()
        )));
    }

    let detection_model = Model::load_file(&detection_model_path)
        .map_err(|e| RecognitionError::EngineUnavailable(e.to_string()))?;
    let recognition_model = Model::load_file(&recognition_model_path)
        .map_err(|e| RecognitionError::EngineUnavailable(e.to_string()))?;

    OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })
    .map_err(|e| RecognitionError::EngineUnavailable(e.to_string()))
}

/// Restrict raw OCR output to the digit alphabet. Bib numbers contain only
/// '0'-'9'; everything else the engine emits is discarded.
pub fn clean_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Upscale small regions so the recognition model sees glyphs at a usable
/// size. Glyph height tracks the smaller dimension, so that is what gets
/// scaled up to the target; regions already that large pass through.
pub fn prepare_region(region: &GrayImage) -> GrayImage {
    const TARGET: u32 = 100;

    let (width, height) = region.dimensions();
    if width.min(height) >= TARGET {
        return region.clone();
    }

    let scale = TARGET as f32 / width.min(height) as f32;
    let scaled_w = (width as f32 * scale).round().max(1.0) as u32;
    let scaled_h = (height as f32 * scale).round().max(1.0) as u32;

    image::imageops::resize(
        region,
        scaled_w,
        scaled_h,
        image::imageops::FilterType::CatmullRom,
    )
}
