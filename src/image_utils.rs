use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::map::map_colors;

/// Fixed-point precision used by the colour conversions
const SHIFT: u32 = 12;
const GRAY_SHIFT: u32 = 14;

// Luminance weights scaled by 2^14 (0.299, 0.587, 0.114)
const R_TO_Y: u32 = 4899;
const G_TO_Y: u32 = 9617;
const B_TO_Y: u32 = 1868;

/// Upper bound of the 8-bit hue scale (degrees halved)
pub const HUE_RANGE: i32 = 180;

/// Inclusive hue/saturation/value band defining the stain mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

/// The stain band. Hue spans the whole scale, so only saturation and
/// value actually gate membership.
pub const STAIN_BAND: HsvBand = HsvBand {
    lower: [0, 30, 30],
    upper: [180, 255, 255],
};

impl HsvBand {
    /// Check whether an HSV pixel lies inside the band on all three channels
    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

/// Invert every channel (v -> 255 - v)
pub fn invert(image: &RgbImage) -> RgbImage {
    let mut inverted = image.clone();
    image::imageops::invert(&mut inverted);
    inverted
}

/// Convert an 8-bit RGB pixel to HSV with hue in 0..180 and
/// saturation/value in 0..=255, rounding like the usual 8-bit lookup tables.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(i32::from);
    let v = r.max(g).max(b);
    let vmin = r.min(g).min(b);
    let diff = v - vmin;
    let round = 1 << (SHIFT - 1);

    let s = if v == 0 {
        0
    } else {
        let sdiv = fixed_div(255 << SHIFT, v);
        (diff * sdiv + round) >> SHIFT
    };

    let h = if diff == 0 {
        0
    } else {
        let raw = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let hdiv = fixed_div(HUE_RANGE << SHIFT, 6 * diff);
        let h = (raw * hdiv + round) >> SHIFT;
        if h < 0 { h + HUE_RANGE } else { h }
    };

    [h as u8, s as u8, v as u8]
}

/// Rounded integer division of positive values
#[inline]
fn fixed_div(numerator: i32, denominator: i32) -> i32 {
    (numerator + denominator / 2) / denominator
}

/// Luminance of an RGB pixel using the Rec. 601 weights
#[inline]
pub fn luminance(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0.map(u32::from);
    ((r * R_TO_Y + g * G_TO_Y + b * B_TO_Y + (1 << (GRAY_SHIFT - 1))) >> GRAY_SHIFT) as u8
}

/// HSV representation of a whole image, stored channel-wise in an `RgbImage`
pub fn to_hsv(image: &RgbImage) -> RgbImage {
    map_colors(image, |p| Rgb(rgb_to_hsv(p)))
}

/// Single-channel luminance image
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    map_colors(image, |p| Luma([luminance(p)]))
}

/// Binary mask: 255 where the HSV pixel falls inside `band`, 0 elsewhere
pub fn in_range(hsv: &RgbImage, band: &HsvBand) -> GrayImage {
    map_colors(hsv, |p| Luma([if band.contains(p.0) { 255 } else { 0 }]))
}

/// Bitwise complement of a mask
pub fn invert_mask(mask: &GrayImage) -> GrayImage {
    map_colors(mask, |p| Luma([!p[0]]))
}

/// Number of non-zero pixels in a single-channel image
pub fn count_non_zero(image: &GrayImage) -> usize {
    image.pixels().filter(|p| p[0] > 0).count()
}
