use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::erode;
use imageproc::point::Point;
use tracing::debug;

use crate::geometry::{self, Rotation};

/// Smallest share of the frame the paper contour must cover to be trusted.
const MIN_REGION_FRACTION: f64 = 0.05;
/// Sigma equivalent of a 21×21 Gaussian kernel.
const BLUR_SIGMA: f32 = 3.5;
/// Erosion radius per pixel of the image's long side (10 px at 2000 px).
const ERODE_RADIUS_PER_PX: f32 = 0.005;

/// Binary mask of the paper within a photograph; 255 marks the document.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask(GrayImage);

impl RegionMask {
    /// Mask covering the whole frame.
    pub fn full(width: u32, height: u32) -> Self {
        RegionMask(ImageBuffer::from_pixel(width, height, Luma([255])))
    }

    pub fn from_image(mask: GrayImage) -> Self {
        RegionMask(mask)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_full(&self) -> bool {
        self.0.pixels().all(|p| p[0] > 0)
    }

    pub fn rotate(&self, rotation: Rotation) -> Self {
        RegionMask(geometry::rotate_gray(&self.0, rotation))
    }

    /// Pixels outside the region become black.
    pub fn apply(&self, gray: &GrayImage) -> GrayImage {
        ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            if self.0.get_pixel(x, y)[0] > 0 {
                *gray.get_pixel(x, y)
            } else {
                Luma([0])
            }
        })
    }

    /// Inclusive `(x_min, y_min, x_max, y_max)` of the foreground, if any.
    pub fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        self.0
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .fold(None, |acc, (x, y, _)| match acc {
                None => Some((x, y, x, y)),
                Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
            })
    }
}

/// Locates the sheet of paper in a grayscale photograph.
///
/// Always returns a usable mask: when no convincing contour is found the whole
/// frame is treated as the document.
pub struct PaperRegionDetector;

impl PaperRegionDetector {
    pub fn detect(gray: &GrayImage) -> RegionMask {
        let (w, h) = gray.dimensions();
        let image_area = w as f64 * h as f64;

        let blurred = gaussian_blur_f32(gray, BLUR_SIGMA);
        let binary = geometry::otsu_binarize(&blurred, false);

        let contours: Vec<Contour<u32>> = find_contours(&binary);
        let largest = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| (c, geometry::polygon_area(&c.points)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let Some((contour, area)) = largest else {
            debug!("no paper contour found, using full frame");
            return RegionMask::full(w, h);
        };

        if area < image_area * MIN_REGION_FRACTION {
            debug!(area, image_area, "paper contour below 5% of frame, using full frame");
            return RegionMask::full(w, h);
        }

        let mut poly: Vec<Point<i32>> = contour
            .points
            .iter()
            .map(|p| Point::new(p.x as i32, p.y as i32))
            .collect();
        poly.dedup();
        if poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        if poly.len() < 3 {
            return RegionMask::full(w, h);
        }

        let mut mask = GrayImage::new(w, h);
        draw_polygon_mut(&mut mask, &poly, Luma([255]));

        let radius = erode_radius(w, h);
        let eroded = erode(&mask, Norm::LInf, radius);
        debug!(area, radius, "paper region detected");
        RegionMask(eroded)
    }
}

fn erode_radius(width: u32, height: u32) -> u8 {
    let long_side = width.max(height) as f32;
    (long_side * ERODE_RADIUS_PER_PX).round().clamp(1.0, 255.0) as u8
}
