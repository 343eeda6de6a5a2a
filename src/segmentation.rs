// src/segmentation.rs - Stain mask, grayscale reference and percentage for one image

use std::path::Path;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::map::map_colors2;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{QuantError, Result};
use crate::image_io::{load_image, save_image, InputImage};
use crate::image_utils::{
    count_non_zero, in_range, invert, invert_mask, to_grayscale, to_hsv, HsvBand, STAIN_BAND,
};
use crate::results::{round_percentage, QuantificationResult};
use crate::scratch::ScratchArea;

/// Which image is rendered to the scratch area
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Stained pixels in colour over the grayscale background
    #[default]
    Composite,
    /// Stained pixels only, everything else black
    Foreground,
}

/// Intermediate products of segmenting one image
pub struct Segmentation {
    pub mask: GrayImage,
    pub grayscale: GrayImage,
    pub foreground: RgbImage,
    pub composite: RgbImage,
    pub white_count: usize,
    pub gray_count: usize,
}

impl Segmentation {
    /// Mask pixels over non-black grayscale pixels, in percent.
    /// `None` when the grayscale reference is entirely black.
    pub fn percentage(&self) -> Option<f64> {
        if self.gray_count == 0 {
            return None;
        }
        Some(round_percentage(self.white_count as f64 * 100.0 / self.gray_count as f64))
    }

    pub fn rendered(&self, mode: RenderMode) -> &RgbImage {
        match mode {
            RenderMode::Composite => &self.composite,
            RenderMode::Foreground => &self.foreground,
        }
    }
}

/// Segment an image against the stain band
pub fn segment(image: &RgbImage) -> Segmentation {
    segment_with_band(image, &STAIN_BAND)
}

pub fn segment_with_band(image: &RgbImage, band: &HsvBand) -> Segmentation {
    // Stain shows up dark on light; inverting makes it bright for thresholding
    let inverted = invert(image);
    let hsv = to_hsv(&inverted);
    let grayscale = to_grayscale(&inverted);

    let mask = in_range(&hsv, band);
    let mask_inv = invert_mask(&mask);

    let foreground = map_colors2(&inverted, &mask, |px: Rgb<u8>, m: Luma<u8>| {
        if m[0] > 0 { px } else { Rgb([0, 0, 0]) }
    });
    let background = map_colors2(&grayscale, &mask_inv, |g: Luma<u8>, m: Luma<u8>| {
        let v = if m[0] > 0 { g[0] } else { 0 };
        Rgb([v, v, v])
    });
    let composite = map_colors2(&foreground, &background, |f: Rgb<u8>, b: Rgb<u8>| {
        Rgb([
            f[0].saturating_add(b[0]),
            f[1].saturating_add(b[1]),
            f[2].saturating_add(b[2]),
        ])
    });

    let white_count = count_non_zero(&mask);
    let gray_count = count_non_zero(&grayscale);

    Segmentation {
        mask,
        grayscale,
        foreground,
        composite,
        white_count,
        gray_count,
    }
}

/// Quantify one decoded image and write its rendered result into `scratch`
pub fn quantify_image(
    input: &InputImage,
    scratch: &ScratchArea,
    mode: RenderMode,
) -> Result<QuantificationResult> {
    let segmentation = segment(&input.image);

    let percentage = segmentation.percentage().ok_or_else(|| QuantError::DivisionByZero {
        path: input.path.clone(),
    })?;

    debug!(
        "{}: {} stained of {} non-background pixels -> {}%",
        input.filename, segmentation.white_count, segmentation.gray_count, percentage
    );

    let result_image_path = scratch.result_path(&input.filename);
    save_image(segmentation.rendered(mode), &result_image_path)?;

    Ok(QuantificationResult {
        source_path: input.path.clone(),
        result_image_path,
        percentage,
    })
}

/// Load the image at `image_path` and quantify it
pub fn quantify<P: AsRef<Path>>(
    image_path: P,
    scratch: &ScratchArea,
    mode: RenderMode,
) -> Result<QuantificationResult> {
    let input = load_image(image_path)?;
    quantify_image(&input, scratch, mode)
}
