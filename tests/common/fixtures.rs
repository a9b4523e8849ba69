use image::{GrayImage, Luma};

/// Uniform light-gray frame, roughly the brightness of a printed bib.
pub fn blank_frame(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([220u8]))
}

/// Paint a filled dark rectangle onto the frame.
pub fn paint_dark_rect(frame: &mut GrayImage, x: u32, y: u32, width: u32, height: u32) {
    for yy in y..y + height {
        for xx in x..x + width {
            frame.put_pixel(xx, yy, Luma([10u8]));
        }
    }
}

/// A checkerboard patch, distinctive under normalized cross-correlation.
pub fn checker_patch(size: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Luma([30u8])
        } else {
            Luma([200u8])
        }
    })
}

/// Copy `patch` into `frame` with its top-left corner at (x, y).
pub fn plant_patch(frame: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
    for (px, py, pixel) in patch.enumerate_pixels() {
        frame.put_pixel(x + px, y + py, *pixel);
    }
}

/// Write `patch` to a temporary PNG file and return the handle.
pub fn save_template(patch: &GrayImage) -> tempfile::NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("failed to create temp template file");
    patch
        .save_with_format(file.path(), image::ImageFormat::Png)
        .expect("failed to save template");
    file
}
