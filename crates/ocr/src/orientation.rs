//! Page orientation checks.
//!
//! Both analyses only ever *recommend* a rotation; they never touch the image.
//! When the evidence is thin they abstain and the page is left as it is.

use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, Contour};
use tracing::{debug, info};

use crate::geometry::{self, Rotation};
use crate::region::RegionMask;

/// Long side the page is rescaled to before stroke analysis.
const ANALYSIS_LONG_SIDE: f32 = 1600.0;
const ADAPTIVE_BLOCK_RADIUS: u32 = 12;
const ADAPTIVE_OFFSET: i32 = 10;

const MIN_BLOB_FRACTION: f64 = 0.0005;
const MAX_BLOB_SIDE_FRACTION: f64 = 0.5;
const HORIZONTAL_ASPECT: f64 = 1.5;
const VERTICAL_ASPECT: f64 = 0.7;

const MIN_TOTAL_VOTES: u32 = 3;
const VERTICAL_MAJORITY: f64 = 1.2;

const BAND_MARGIN_Y: f64 = 0.05;
const BAND_MARGIN_X: f64 = 0.10;
const BAND_HEIGHT: f64 = 0.45;
const INVERSION_RATIO: f64 = 1.1;

/// Stroke-shape tally for the 90° check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrokeVotes {
    pub horizontal: u32,
    pub vertical: u32,
}

impl StrokeVotes {
    pub fn total(&self) -> u32 {
        self.horizontal + self.vertical
    }

    /// Vertical text wins only with a clear margin, and never on fewer than
    /// three votes.
    pub fn decide(&self) -> Option<Rotation> {
        if self.total() < MIN_TOTAL_VOTES {
            debug!(?self, "too few stroke votes, keeping orientation");
            return None;
        }
        let vertical_wins = self.vertical as f64 > self.horizontal as f64 * VERTICAL_MAJORITY
            || (self.horizontal == 0 && self.vertical > 2);
        vertical_wins.then_some(Rotation::Clockwise90)
    }
}

/// Ink counts for the 180° check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InkDensity {
    pub top: usize,
    pub bottom: usize,
}

impl InkDensity {
    /// Forms carry most of their text near the top, so a clearly heavier
    /// bottom band means the page is upside down.
    pub fn decide(&self) -> Option<Rotation> {
        (self.bottom as f64 > self.top as f64 * INVERSION_RATIO).then_some(Rotation::Half)
    }
}

pub struct OrientationAnalyzer;

impl OrientationAnalyzer {
    /// Whether the page holds sideways text and needs a clockwise quarter turn.
    pub fn analyze_quarter_turn(gray: &GrayImage, mask: &RegionMask) -> Option<Rotation> {
        let binary = Self::stroke_map(gray, mask);
        let votes = Self::count_stroke_votes(&binary);
        info!(
            horizontal = votes.horizontal,
            vertical = votes.vertical,
            "90° stroke votes"
        );
        let decision = votes.decide();
        if decision.is_some() {
            info!("sideways text detected, rotating 90° clockwise");
        }
        decision
    }

    /// Whether the page is upside down.
    pub fn analyze_half_turn(gray: &GrayImage, mask: &RegionMask) -> Option<Rotation> {
        let density = Self::ink_density(gray, mask)?;
        info!(top = density.top, bottom = density.bottom, "180° ink density");
        let decision = density.decide();
        if decision.is_some() {
            info!("page is upside down, rotating 180°");
        }
        decision
    }

    fn stroke_map(gray: &GrayImage, mask: &RegionMask) -> GrayImage {
        let masked = mask.apply(gray);
        let (w, h) = masked.dimensions();
        let scale = ANALYSIS_LONG_SIDE / w.max(h) as f32;
        let nw = ((w as f32 * scale).round() as u32).max(1);
        let nh = ((h as f32 * scale).round() as u32).max(1);
        let small = imageops::resize(&masked, nw, nh, imageops::FilterType::Triangle);
        geometry::adaptive_binarize_inv(&small, ADAPTIVE_BLOCK_RADIUS, ADAPTIVE_OFFSET)
    }

    fn count_stroke_votes(binary: &GrayImage) -> StrokeVotes {
        let (w, h) = binary.dimensions();
        let image_area = w as f64 * h as f64;
        let contours: Vec<Contour<u32>> = find_contours(binary);

        let mut votes = StrokeVotes::default();
        for contour in &contours {
            let Some((cw, ch)) = geometry::bounding_extent(&contour.points) else {
                continue;
            };
            let (cw, ch) = (cw as f64, ch as f64);
            if cw * ch < image_area * MIN_BLOB_FRACTION {
                continue;
            }
            if cw > w as f64 * MAX_BLOB_SIDE_FRACTION || ch > h as f64 * MAX_BLOB_SIDE_FRACTION {
                continue;
            }
            let aspect = cw / ch;
            if aspect > HORIZONTAL_ASPECT {
                votes.horizontal += 1;
            } else if aspect < VERTICAL_ASPECT {
                votes.vertical += 1;
            }
        }
        votes
    }

    /// Ink in the top and bottom bands of the region, or `None` when the mask
    /// is empty.
    fn ink_density(gray: &GrayImage, mask: &RegionMask) -> Option<InkDensity> {
        let (x_min, y_min, x_max, y_max) = mask.bounding_box()?;
        let h = (y_max - y_min) as f64;
        let w = (x_max - x_min) as f64;

        let margin_y = (h * BAND_MARGIN_Y) as u32;
        let margin_x = (w * BAND_MARGIN_X) as u32;
        let band_h = (h * BAND_HEIGHT) as u32;

        let left = x_min + margin_x;
        let right = x_max.saturating_sub(margin_x);
        let band_w = right.saturating_sub(left);

        let top_y = y_min + margin_y;
        let bottom_end = y_max.saturating_sub(margin_y);
        let bottom_y = bottom_end.saturating_sub(band_h);

        let top = band_ink(gray, left, top_y, band_w, band_h);
        let bottom = band_ink(gray, left, bottom_y, band_w, band_h);
        Some(InkDensity { top, bottom })
    }
}

fn band_ink(gray: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    let band = imageops::crop_imm(gray, x, y, width, height).to_image();
    if band.width() == 0 || band.height() == 0 {
        return 0;
    }
    let clean = geometry::remove_shadows(&band);
    geometry::count_foreground(&geometry::otsu_binarize(&clean, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn votes(horizontal: u32, vertical: u32) -> StrokeVotes {
        StrokeVotes { horizontal, vertical }
    }

    #[test]
    fn too_few_votes_abstain() {
        assert_eq!(votes(0, 2).decide(), None);
        assert_eq!(votes(1, 1).decide(), None);
    }

    #[test]
    fn clear_vertical_majority_rotates() {
        assert_eq!(votes(10, 13).decide(), Some(Rotation::Clockwise90));
        assert_eq!(votes(0, 3).decide(), Some(Rotation::Clockwise90));
    }

    #[test]
    fn narrow_vertical_majority_keeps() {
        // 12 is exactly 1.2 × 10, which is not strictly greater.
        assert_eq!(votes(10, 12).decide(), None);
        assert_eq!(votes(20, 5).decide(), None);
    }

    #[test]
    fn heavier_bottom_means_upside_down() {
        assert_eq!(InkDensity { top: 100, bottom: 111 }.decide(), Some(Rotation::Half));
        assert_eq!(InkDensity { top: 100, bottom: 110 }.decide(), None);
        assert_eq!(InkDensity { top: 0, bottom: 0 }.decide(), None);
    }

    /// White page with dark bars laid out as horizontal or vertical strokes.
    fn page_with_strokes(w: u32, h: u32, horizontal: bool) -> GrayImage {
        ImageBuffer::from_fn(w, h, |x, y| {
            let ink = if horizontal {
                (y % 40) < 6 && (x % 100) >= 20 && (x % 100) < 80
            } else {
                (x % 40) < 6 && (y % 100) >= 20 && (y % 100) < 80
            };
            Luma([if ink { 20 } else { 235 }])
        })
    }

    #[test]
    fn horizontal_lines_keep_orientation() {
        let page = page_with_strokes(400, 400, true);
        let mask = RegionMask::full(400, 400);
        assert_eq!(OrientationAnalyzer::analyze_quarter_turn(&page, &mask), None);
    }

    #[test]
    fn vertical_lines_request_quarter_turn() {
        let page = page_with_strokes(400, 400, false);
        let mask = RegionMask::full(400, 400);
        assert_eq!(
            OrientationAnalyzer::analyze_quarter_turn(&page, &mask),
            Some(Rotation::Clockwise90)
        );
    }

    #[test]
    fn blank_page_abstains() {
        let page: GrayImage = ImageBuffer::from_pixel(300, 200, Luma([240]));
        let mask = RegionMask::full(300, 200);
        assert_eq!(OrientationAnalyzer::analyze_quarter_turn(&page, &mask), None);
    }

    /// Text block in the upper or lower part of the page.
    fn page_with_text_block(upper: bool) -> GrayImage {
        ImageBuffer::from_fn(200, 300, |x, y| {
            let in_block = if upper { (30..120).contains(&y) } else { (180..270).contains(&y) };
            let ink = in_block && (y % 12) < 3 && (40..160).contains(&x);
            Luma([if ink { 15 } else { 230 }])
        })
    }

    #[test]
    fn text_at_top_is_upright() {
        let page = page_with_text_block(true);
        let mask = RegionMask::full(200, 300);
        assert_eq!(OrientationAnalyzer::analyze_half_turn(&page, &mask), None);
    }

    #[test]
    fn text_at_bottom_is_flipped() {
        let page = page_with_text_block(false);
        let mask = RegionMask::full(200, 300);
        assert_eq!(
            OrientationAnalyzer::analyze_half_turn(&page, &mask),
            Some(Rotation::Half)
        );
    }

    #[test]
    fn empty_mask_gives_no_decision() {
        let page = page_with_text_block(false);
        let mask = RegionMask::from_image(GrayImage::new(200, 300));
        assert_eq!(OrientationAnalyzer::analyze_half_turn(&page, &mask), None);
    }
}
