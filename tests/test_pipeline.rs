//! End-to-end pipeline tests. The real OCR engine needs on-disk models, so
//! these use a stub digit reader behind the `DigitReader` seam.

mod common;

use image::{DynamicImage, GrayImage};
use std::path::PathBuf;

use bibtime::{
    DigitReader, RecognitionError, RecognitionPipeline, Rect, RoiStrategy, decode_photo,
};
use common::*;

/// Reader that always returns the same digit string.
struct FixedReader(&'static str);

impl DigitReader for FixedReader {
    fn read_digits(&self, _region: &GrayImage) -> Result<String, RecognitionError> {
        Ok(self.0.to_string())
    }
}

/// Reader that records the dimensions of the region it was handed.
struct ProbeReader(std::cell::Cell<(u32, u32)>);

impl DigitReader for ProbeReader {
    fn read_digits(&self, region: &GrayImage) -> Result<String, RecognitionError> {
        self.0.set(region.dimensions());
        Ok("042".to_string())
    }
}

#[test]
fn template_scenario_reads_bib_from_matched_region() {
    let patch = checker_patch(60);
    let mut frame = blank_frame(320, 240);
    plant_patch(&mut frame, &patch, 100, 50);
    let template_file = save_template(&patch);

    let pipeline = RecognitionPipeline::new().with_template(template_file.path());
    let photo = DynamicImage::ImageLuma8(frame);
    let (result, diagnostics) = pipeline
        .recognize_with(&photo, &FixedReader("042"))
        .expect("stub reader cannot fail");

    assert_eq!(result.digits, "042");
    assert_eq!(result.strategy, RoiStrategy::Template);
    assert_eq!(
        result.roi,
        Some(Rect {
            x: 100,
            y: 50,
            width: 60,
            height: 60
        })
    );
    assert!(result.is_recognized());
    assert!(diagnostics.template_loaded);
    assert!(diagnostics.template_score.unwrap() > 0.999);
    // Template tier short-circuits before any thresholding happens.
    assert!(diagnostics.binary.is_none());
}

#[test]
fn missing_template_degrades_to_contour_strategy() {
    let mut frame = blank_frame(320, 240);
    paint_dark_rect(&mut frame, 120, 80, 40, 40);

    let pipeline =
        RecognitionPipeline::new().with_template(PathBuf::from("/nonexistent/template.png"));
    let photo = DynamicImage::ImageLuma8(frame);
    let probe = ProbeReader(std::cell::Cell::new((0, 0)));
    let (result, diagnostics) = pipeline.recognize_with(&photo, &probe).unwrap();

    assert!(!diagnostics.template_loaded);
    assert_ne!(result.strategy, RoiStrategy::Template);
    assert_eq!(result.strategy, RoiStrategy::Contour);
    assert_eq!(result.digits, "042");
    assert_eq!(
        result.roi,
        Some(Rect {
            x: 120,
            y: 80,
            width: 40,
            height: 40
        })
    );
    // OCR sees the isolated region, not the whole frame.
    assert_eq!(probe.0.get(), (40, 40));
}

#[test]
fn blank_photo_reports_whole_image_without_error() {
    let frame = blank_frame(160, 120);

    let pipeline = RecognitionPipeline::new();
    let photo = DynamicImage::ImageLuma8(frame);
    let (result, diagnostics) = pipeline.recognize_with(&photo, &FixedReader("")).unwrap();

    assert_eq!(result.digits, "");
    assert!(!result.is_recognized());
    assert_eq!(result.strategy, RoiStrategy::WholeImage);
    assert_eq!(result.roi, None);
    // The whole frame was handed to OCR.
    assert_eq!(diagnostics.roi_image.dimensions(), (160, 120));
}

#[test]
fn grayscale_conversion_preserves_dimensions() {
    let rgb = image::RgbImage::from_pixel(123, 77, image::Rgb([200, 30, 90]));
    let photo = DynamicImage::ImageRgb8(rgb);

    let pipeline = RecognitionPipeline::new();
    let (_, diagnostics) = pipeline.recognize_with(&photo, &FixedReader("")).unwrap();

    assert_eq!(diagnostics.gray.dimensions(), (123, 77));
}

#[test]
fn binary_artifact_contains_only_black_and_white() {
    let mut frame = blank_frame(120, 100);
    paint_dark_rect(&mut frame, 30, 40, 20, 20);

    let pipeline = RecognitionPipeline::new();
    let photo = DynamicImage::ImageLuma8(frame);
    let (_, diagnostics) = pipeline.recognize_with(&photo, &FixedReader("")).unwrap();

    let binary = diagnostics.binary.expect("contour tier ran");
    assert!(binary.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
}

#[test]
fn malformed_bytes_are_a_decode_failure() {
    let err = decode_photo(b"definitely not an image").unwrap_err();
    assert!(matches!(err, RecognitionError::Decode(_)));
}

#[test]
fn unreadable_photo_path_reports_underlying_io_cause() {
    let err = bibtime::load_photo(std::path::Path::new("/nonexistent/photo.png")).unwrap_err();
    assert!(matches!(err, RecognitionError::Decode(_)));
    // The message names the filesystem failure, not an image-format one.
    assert!(err.to_string().contains("os error"), "got: {err}");
}

#[test]
fn short_regions_are_upscaled_for_recognition() {
    use bibtime::recognition::ocr::prepare_region;

    // A wide-but-short crop still has tiny glyphs; the smaller dimension
    // drives the scaling.
    let wide = GrayImage::from_pixel(150, 20, image::Luma([128]));
    assert_eq!(prepare_region(&wide).dimensions(), (750, 100));

    let tall = GrayImage::from_pixel(30, 120, image::Luma([128]));
    assert_eq!(prepare_region(&tall).dimensions(), (100, 400));

    let large = GrayImage::from_pixel(200, 150, image::Luma([128]));
    assert_eq!(prepare_region(&large).dimensions(), (200, 150));
}

#[test]
fn diagnostics_save_writes_pngs() {
    let mut frame = blank_frame(120, 100);
    paint_dark_rect(&mut frame, 30, 40, 20, 20);

    let pipeline = RecognitionPipeline::new();
    let photo = DynamicImage::ImageLuma8(frame);
    let (_, diagnostics) = pipeline.recognize_with(&photo, &FixedReader("7")).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    diagnostics.save_to(dir.path()).unwrap();
    assert!(dir.path().join("gray.png").exists());
    assert!(dir.path().join("binary.png").exists());
    assert!(dir.path().join("roi.png").exists());
}

#[test]
fn ocr_output_is_restricted_to_digits() {
    use bibtime::recognition::ocr::clean_digits;

    assert_eq!(clean_digits(" O42\n"), "42");
    assert_eq!(clean_digits("0 4 2"), "042");
    assert_eq!(clean_digits("bib#107!"), "107");
    assert_eq!(clean_digits("no digits here"), "");
    assert!(clean_digits("a1b2c3").chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn strategy_serializes_in_kebab_case() {
    assert_eq!(
        serde_json::to_value(RoiStrategy::WholeImage).unwrap(),
        serde_json::json!("whole-image")
    );
    assert_eq!(
        serde_json::to_value(RoiStrategy::Template).unwrap(),
        serde_json::json!("template")
    );
}
