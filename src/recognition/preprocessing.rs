use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};

/// Convert a photo to grayscale. Dimensions are preserved so ROI
/// coordinates found downstream remain valid in the original frame.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply a 3x3 median blur to suppress speckle noise.
pub fn denoise(gray: &GrayImage) -> GrayImage {
    median_filter(gray, 1, 1)
}

/// Adaptive Gaussian thresholding with inverted polarity: a pixel becomes
/// foreground (255) when it is darker than its Gaussian-weighted
/// neighbourhood mean minus `offset`, so printed ink ends up as foreground.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    // Sigma matched to the block size the same way OpenCV derives it
    // from a kernel size.
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(gray, sigma);

    let (width, height) = gray.dimensions();
    let mut binary = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as f32 - offset;
        let value = if (pixel[0] as f32) <= threshold { 255 } else { 0 };
        binary.put_pixel(x, y, Luma([value]));
    }
    binary
}
