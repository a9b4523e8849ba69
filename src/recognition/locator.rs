use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use tracing::debug;

use crate::models::{Rect, RoiStrategy};
use crate::recognition::preprocessing;

/// Tunable constants for the two search tiers. The defaults come from the
/// tuning of the original timing rig and have not been validated beyond it.
#[derive(Debug, Clone)]
pub struct LocatorParams {
    /// Minimum normalized cross-correlation score for a template match.
    pub match_confidence: f32,
    /// Admissible width/height range for a candidate bounding box.
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Candidates with bounding-box area at or below this are noise.
    pub min_area: u64,
    /// Neighbourhood size for adaptive thresholding.
    pub block_size: u32,
    /// Constant subtracted from the local mean before thresholding.
    pub offset: f32,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            match_confidence: 0.6,
            min_aspect: 0.7,
            max_aspect: 1.3,
            min_area: 100,
            block_size: 15,
            offset: 4.0,
        }
    }
}

/// Outcome of the ROI search, including artifacts the tiers produced
/// along the way.
pub struct LocatedRoi {
    /// None means the whole frame is the ROI.
    pub rect: Option<Rect>,
    pub strategy: RoiStrategy,
    /// Best template score, when the template tier ran.
    pub score: Option<f32>,
    /// Thresholded image, when the contour tier ran.
    pub binary: Option<GrayImage>,
}

/// Find the sub-region most likely to contain the bib digits.
///
/// Tiers are tried in strict order: template matching (when a template is
/// available), contour search, then the whole frame. The last tier cannot
/// fail, so a region is always produced.
pub fn locate(gray: &GrayImage, template: Option<&GrayImage>, params: &LocatorParams) -> LocatedRoi {
    let mut best_score = None;

    if let Some(template) = template {
        match match_template_tier(gray, template, params.match_confidence) {
            TierOutcome::Matched(rect, score) => {
                debug!(score, ?rect, "template tier matched");
                return LocatedRoi {
                    rect: Some(rect),
                    strategy: RoiStrategy::Template,
                    score: Some(score),
                    binary: None,
                };
            }
            TierOutcome::BelowConfidence(score) => {
                debug!(score, "template tier below confidence, falling through");
                best_score = Some(score);
            }
            TierOutcome::Skipped => {
                debug!("template larger than frame, template tier skipped");
            }
        }
    }

    let denoised = preprocessing::denoise(gray);
    let binary = preprocessing::adaptive_threshold_inv(&denoised, params.block_size, params.offset);

    match best_candidate(&binary, params) {
        Some(rect) => {
            debug!(?rect, "contour tier selected a candidate");
            LocatedRoi {
                rect: Some(rect),
                strategy: RoiStrategy::Contour,
                score: best_score,
                binary: Some(binary),
            }
        }
        None => {
            debug!("no qualifying contour, using the whole frame");
            LocatedRoi {
                rect: None,
                strategy: RoiStrategy::WholeImage,
                score: best_score,
                binary: Some(binary),
            }
        }
    }
}

enum TierOutcome {
    Matched(Rect, f32),
    BelowConfidence(f32),
    Skipped,
}

/// Slide the template over the frame scoring zero-mean normalized
/// cross-correlation at every position; succeed when the best score reaches
/// the confidence threshold.
fn match_template_tier(gray: &GrayImage, template: &GrayImage, confidence: f32) -> TierOutcome {
    let (img_w, img_h) = gray.dimensions();
    let (tpl_w, tpl_h) = template.dimensions();
    if tpl_w > img_w || tpl_h > img_h || tpl_w == 0 || tpl_h == 0 {
        return TierOutcome::Skipped;
    }

    let mut best_score = f32::MIN;
    let mut best_loc = (0u32, 0u32);
    for y in 0..=(img_h - tpl_h) {
        for x in 0..=(img_w - tpl_w) {
            let score = normalized_cross_correlation(gray, template, x, y);
            if score > best_score {
                best_score = score;
                best_loc = (x, y);
            }
        }
    }

    if best_score >= confidence {
        TierOutcome::Matched(
            Rect {
                x: best_loc.0,
                y: best_loc.1,
                width: tpl_w,
                height: tpl_h,
            },
            best_score,
        )
    } else {
        TierOutcome::BelowConfidence(best_score)
    }
}

/// Zero-mean normalized cross-correlation of the template against the
/// window at (x, y). Scores are clamped to [0, 1]; a flat window scores 0.
fn normalized_cross_correlation(image: &GrayImage, template: &GrayImage, x: u32, y: u32) -> f32 {
    let (tpl_w, tpl_h) = template.dimensions();

    let mut sum_it = 0.0f64;
    let mut sum_i2 = 0.0f64;
    let mut sum_t2 = 0.0f64;
    let mut sum_i = 0.0f64;
    let mut sum_t = 0.0f64;

    for ty in 0..tpl_h {
        for tx in 0..tpl_w {
            let img_val = image.get_pixel(x + tx, y + ty).0[0] as f64;
            let tpl_val = template.get_pixel(tx, ty).0[0] as f64;
            sum_it += img_val * tpl_val;
            sum_i2 += img_val * img_val;
            sum_t2 += tpl_val * tpl_val;
            sum_i += img_val;
            sum_t += tpl_val;
        }
    }

    let count = (tpl_w * tpl_h) as f64;
    let mean_i = sum_i / count;
    let mean_t = sum_t / count;

    let numerator = sum_it - count * mean_i * mean_t;
    let denom_i = (sum_i2 - count * mean_i * mean_i).max(0.0).sqrt();
    let denom_t = (sum_t2 - count * mean_t * mean_t).max(0.0).sqrt();
    let denominator = denom_i * denom_t;

    if denominator < 1e-10 {
        return 0.0;
    }

    (numerator / denominator).clamp(0.0, 1.0) as f32
}

/// Pick the best bib-box candidate from the binary image: among the outer
/// contours whose bounding box is near-square and larger than the noise
/// floor, the one with the largest bounding-box area wins. Ties keep the
/// first candidate in contour-scan order.
fn best_candidate(binary: &GrayImage, params: &LocatorParams) -> Option<Rect> {
    let contours = find_contours::<u32>(binary);
    let mut best: Option<Rect> = None;

    for contour in &contours {
        // Only the outermost silhouette of each blob matters; bib numbers
        // are enclosed by a printed border.
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let Some(rect) = bounding_rect(contour) else {
            continue;
        };
        let aspect = rect.aspect_ratio();
        if aspect < params.min_aspect || aspect > params.max_aspect {
            continue;
        }
        if rect.area() <= params.min_area {
            continue;
        }
        if best.is_none_or(|b| rect.area() > b.area()) {
            best = Some(rect);
        }
    }

    best
}

fn bounding_rect(contour: &imageproc::contours::Contour<u32>) -> Option<Rect> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}
