//! Pixel-level building blocks shared by the region, orientation and
//! normalization stages. Every function returns a new buffer.

use image::{imageops, DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::median_filter;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use imageproc::morphology::{grayscale_dilate, Mask};
use imageproc::point::Point;

/// Dilation radius of the background estimate (7×7 window).
const SHADOW_DILATE_RADIUS: u8 = 3;
/// Median radius of the background estimate (21×21 window).
const SHADOW_MEDIAN_RADIUS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise90,
    Half,
}

pub fn to_gray(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

pub fn rotate_gray(img: &GrayImage, rotation: Rotation) -> GrayImage {
    match rotation {
        Rotation::Clockwise90 => imageops::rotate90(img),
        Rotation::Half => imageops::rotate180(img),
    }
}

pub fn rotate_image(img: &DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::Clockwise90 => img.rotate90(),
        Rotation::Half => img.rotate180(),
    }
}

/// Illumination estimate: grayscale dilation removes thin dark strokes, a
/// wide median smooths what is left.
pub fn estimate_background(gray: &GrayImage) -> GrayImage {
    let dilated = grayscale_dilate(gray, &Mask::square(SHADOW_DILATE_RADIUS));
    median_filter(&dilated, SHADOW_MEDIAN_RADIUS, SHADOW_MEDIAN_RADIUS)
}

/// Flatten uneven illumination: `255 - |orig - background|`, stretched to
/// the full range.
pub fn remove_shadows(gray: &GrayImage) -> GrayImage {
    let background = estimate_background(gray);

    let diff: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let o = gray.get_pixel(x, y)[0];
        let b = background.get_pixel(x, y)[0];
        Luma([255 - o.abs_diff(b)])
    });

    stretch_contrast(&diff)
}

/// Min-max contrast stretch to 0–255. Uniform images come back unchanged.
pub fn stretch_contrast(gray: &GrayImage) -> GrayImage {
    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px == min_px {
        return gray.clone();
    }

    let range = (max_px - min_px) as u32;
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = (gray.get_pixel(x, y)[0] - min_px) as u32;
        Luma([((p * 255 + range / 2) / range) as u8])
    })
}

/// Global Otsu binarization. With `inverted`, dark pixels (ink) become 255.
pub fn otsu_binarize(gray: &GrayImage, inverted: bool) -> GrayImage {
    let kind = if inverted { ThresholdType::BinaryInverted } else { ThresholdType::Binary };
    threshold(gray, otsu_level(gray), kind)
}

/// Local-mean threshold, inverted: a pixel is ink (255) when it is at least
/// `offset` darker than the mean of its `(2r+1)²` neighbourhood.
///
/// The window is clipped at the borders.
pub fn adaptive_binarize_inv(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let sums = integral_image::<_, u64>(gray);

    ImageBuffer::from_fn(w, h, |x, y| {
        let left = x.saturating_sub(block_radius);
        let top = y.saturating_sub(block_radius);
        let right = (x + block_radius).min(w - 1);
        let bottom = (y + block_radius).min(h - 1);
        let [sum] = sum_image_pixels(&sums, left, top, right, bottom);
        let count = ((right - left + 1) * (bottom - top + 1)) as u64;
        let mean = (sum / count) as i32;
        let v = gray.get_pixel(x, y)[0] as i32;
        Luma([if v > mean - offset { 0 } else { 255 }])
    })
}

pub fn count_foreground(img: &GrayImage) -> usize {
    img.pixels().filter(|p| p[0] > 0).count()
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum();
    twice.abs() / 2.0
}

/// Width and height of the axis-aligned box around `points`, inclusive.
pub fn bounding_extent(points: &[Point<u32>]) -> Option<(u32, u32)> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some((max_x - min_x + 1, max_y - min_y + 1))
}
