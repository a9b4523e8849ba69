pub mod locator;
pub mod ocr;
pub mod preprocessing;

use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::RecognitionError;
use crate::models::{Diagnostics, RecognitionResult, Rect};
pub use locator::{LocatedRoi, LocatorParams};
pub use ocr::{DigitReader, OcrDigitReader};

/// Bib-number recognition pipeline: photo in, digit string out.
///
/// Stateless and reentrant: each call operates only on its input photo and
/// the reference template read fresh from disk, so concurrent calls for
/// different photos are safe.
pub struct RecognitionPipeline {
    pub params: LocatorParams,
    /// Reference image of the printed bib-number frame. Its absence only
    /// disables the template tier.
    pub template_path: Option<PathBuf>,
}

impl RecognitionPipeline {
    pub fn new() -> Self {
        Self {
            params: LocatorParams::default(),
            template_path: None,
        }
    }

    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    pub fn with_params(mut self, params: LocatorParams) -> Self {
        self.params = params;
        self
    }

    /// Recognize the bib number in one arrival photo.
    ///
    /// Never fails for image-content reasons: an unreadable frame produces a
    /// result with an empty digit string. The only errors are engine
    /// construction faults.
    pub fn recognize(&self, photo: &DynamicImage) -> Result<RecognitionResult, RecognitionError> {
        let reader = OcrDigitReader::new()?;
        let (result, _) = self.recognize_with(photo, &reader)?;
        Ok(result)
    }

    /// Like [`recognize`](Self::recognize), but also returns the
    /// intermediate artifacts for display.
    pub fn recognize_detailed(
        &self,
        photo: &DynamicImage,
    ) -> Result<(RecognitionResult, Diagnostics), RecognitionError> {
        let reader = OcrDigitReader::new()?;
        self.recognize_with(photo, &reader)
    }

    /// Run the pipeline with a caller-supplied digit reader.
    pub fn recognize_with(
        &self,
        photo: &DynamicImage,
        reader: &dyn DigitReader,
    ) -> Result<(RecognitionResult, Diagnostics), RecognitionError> {
        let gray = preprocessing::to_grayscale(photo);
        let template = self.load_template();
        let located = locator::locate(&gray, template.as_ref(), &self.params);

        let roi_image = match located.rect {
            Some(rect) => crop(&gray, rect),
            None => gray.clone(),
        };

        let digits = reader.read_digits(&roi_image)?;

        let result = RecognitionResult {
            digits,
            strategy: located.strategy,
            roi: located.rect,
        };
        let diagnostics = Diagnostics {
            gray,
            binary: located.binary,
            roi_image,
            template_score: located.score,
            template_loaded: template.is_some(),
        };
        Ok((result, diagnostics))
    }

    /// Run only the ROI search, skipping OCR.
    pub fn locate_roi(&self, photo: &DynamicImage) -> LocatedRoi {
        let gray = preprocessing::to_grayscale(photo);
        let template = self.load_template();
        locator::locate(&gray, template.as_ref(), &self.params)
    }

    /// Load the reference template, if configured. A missing or unreadable
    /// template is an advisory, not an error: the template tier is simply
    /// disabled for this run.
    fn load_template(&self) -> Option<GrayImage> {
        let path = self.template_path.as_ref()?;
        let reader = match image::ImageReader::open(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "reference template unavailable, template tier disabled");
                return None;
            }
        };
        match reader.decode() {
            Ok(img) => Some(img.to_luma8()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "reference template unreadable, template tier disabled");
                None
            }
        }
    }
}

impl Default for RecognitionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a photo from raw bytes. Invalid bytes are a fatal decode failure
/// for that request; no partial result is produced.
pub fn decode_photo(bytes: &[u8]) -> Result<DynamicImage, RecognitionError> {
    image::load_from_memory(bytes).map_err(RecognitionError::Decode)
}

/// Decode a photo from a file path.
///
/// A failed read (missing file, permissions) surfaces as
/// [`RecognitionError::Decode`] like invalid bytes do, carrying the
/// underlying I/O error so the caller's error line names the cause.
pub fn load_photo(path: &Path) -> Result<DynamicImage, RecognitionError> {
    let bytes = std::fs::read(path).map_err(|e| {
        RecognitionError::Decode(image::ImageError::IoError(e))
    })?;
    decode_photo(&bytes)
}

fn crop(gray: &GrayImage, rect: Rect) -> GrayImage {
    image::imageops::crop_imm(gray, rect.x, rect.y, rect.width, rect.height).to_image()
}
