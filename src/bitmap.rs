use std::path::Path;

use image::{DynamicImage, GrayImage, ImageReader};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::config::{PuzzleConfig, ThresholdMethod};
use crate::error::DotsError;

/// Load an image and convert it to a binary mask.
///
/// Foreground (shape) pixels are 255, background pixels are 0.
pub fn load_mask(path: &Path, config: &PuzzleConfig) -> Result<GrayImage, DotsError> {
    let img = ImageReader::open(path)
        .map_err(|e| DotsError::ImageLoad(e.to_string()))?
        .decode()
        .map_err(|e| DotsError::ImageLoad(e.to_string()))?;
    Ok(mask_from_image(&img, config))
}

/// Threshold an already-decoded image into a mask.
///
/// Transparent pixels count as background regardless of their color.
pub fn mask_from_image(img: &DynamicImage, config: &PuzzleConfig) -> GrayImage {
    let mut gray = img.to_luma8();
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        for (g, p) in gray.pixels_mut().zip(rgba.pixels()) {
            if p.0[3] < 255 {
                g.0[0] = 255;
            }
        }
    }
    mask_from_luma(&gray, config)
}

/// Threshold a grayscale image (dark ink = foreground) into a mask.
pub fn mask_from_luma(gray: &GrayImage, config: &PuzzleConfig) -> GrayImage {
    let level = match config.threshold {
        ThresholdMethod::Fixed(t) => t,
        ThresholdMethod::Otsu => {
            let t = otsu_level(gray);
            log::debug!("Otsu threshold = {}", t);
            t
        }
    };

    let mut binary = threshold(gray, level, ThresholdType::BinaryInverted);

    if config.invert {
        for pixel in binary.pixels_mut() {
            pixel.0[0] = 255 - pixel.0[0];
        }
    }

    if config.clean {
        binary = morphology::open(&binary, Norm::LInf, 1);
        binary = morphology::close(&binary, Norm::LInf, 1);
    }

    binary
}
