use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::path::Path;

/// Axis-aligned rectangle in original-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Which search tier produced the region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoiStrategy {
    Template,
    Contour,
    WholeImage,
}

impl std::fmt::Display for RoiStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoiStrategy::Template => write!(f, "template"),
            RoiStrategy::Contour => write!(f, "contour"),
            RoiStrategy::WholeImage => write!(f, "whole-image"),
        }
    }
}

/// Outcome of recognizing one arrival photo.
///
/// An empty `digits` string means "no digits recognized" and is a normal,
/// reportable outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionResult {
    pub digits: String,
    pub strategy: RoiStrategy,
    /// Region the digits were read from; None when the whole frame was used.
    pub roi: Option<Rect>,
}

impl RecognitionResult {
    pub fn is_recognized(&self) -> bool {
        !self.digits.is_empty()
    }
}

/// Intermediate artifacts from one recognition run, kept for display and
/// debugging. Nothing in the recognition path depends on them.
pub struct Diagnostics {
    /// Normalized grayscale frame.
    pub gray: GrayImage,
    /// Thresholded frame, present only when the contour tier ran.
    pub binary: Option<GrayImage>,
    /// The crop handed to OCR.
    pub roi_image: GrayImage,
    /// Best template-matching score, present only when the template tier ran.
    pub template_score: Option<f32>,
    /// Whether a reference template was loaded for this run.
    pub template_loaded: bool,
}

impl Diagnostics {
    /// Save all artifacts as PNGs into `dir`, creating it if needed.
    pub fn save_to(&self, dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir)?;
        DynamicImage::ImageLuma8(self.gray.clone()).save(dir.join("gray.png"))?;
        if let Some(binary) = &self.binary {
            DynamicImage::ImageLuma8(binary.clone()).save(dir.join("binary.png"))?;
        }
        DynamicImage::ImageLuma8(self.roi_image.clone()).save(dir.join("roi.png"))?;
        Ok(())
    }
}
