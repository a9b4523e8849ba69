use thiserror::Error;

/// Fatal failures of the recognition pipeline.
///
/// Ambiguous frames are not errors: an unreadable bib yields a
/// `RecognitionResult` with an empty digit string, and a missing reference
/// template merely disables the template tier.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Input bytes are not a valid image. Fatal for that request only.
    #[error("failed to decode input image: {0}")]
    Decode(#[from] image::ImageError),

    /// The OCR engine could not be constructed, usually because the
    /// recognition models are not installed. Fatal; callers should stop
    /// submitting photos until resolved.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),
}
