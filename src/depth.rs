//! Depth field to image and point cloud.
//!
//! Both transforms take the 320x160 depth field in row-major order and are
//! stateless: every call builds a complete new artifact.

use crate::protocol::{
    DEPTH_HEIGHT, DEPTH_NORM_RANGE_MM, DEPTH_WIDTH, MAX_VALID_DEPTH_MM, MIN_VALID_DEPTH_MM,
};
use crate::types::{DepthFrame, Point3, PointCloud};
use image::Rgba;

/// Map a millimeter sample to 0..=255, saturating at the normalisation range.
pub fn intensity(depth_mm: u16) -> u8 {
    let scaled = (u32::from(depth_mm) * 255 + DEPTH_NORM_RANGE_MM / 2) / DEPTH_NORM_RANGE_MM;
    scaled.min(255) as u8
}

/// True if a sample is inside the trusted range (both bounds included).
pub fn is_valid_depth(depth_mm: u16) -> bool {
    (MIN_VALID_DEPTH_MM..=MAX_VALID_DEPTH_MM).contains(&depth_mm)
}

/// 256-entry RGB lookup table.
#[derive(Debug, Clone)]
pub struct Colormap {
    lut: [[u8; 3]; 256],
}

impl Colormap {
    /// Blue (near) through cyan, yellow, to red (far).
    pub fn jet() -> Self {
        let mut lut = [[0u8; 3]; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            let v = i as f64 / 255.0;
            *entry = [jet_channel(v, 3.0), jet_channel(v, 2.0), jet_channel(v, 1.0)];
        }
        Self { lut }
    }

    pub fn color(&self, intensity: u8) -> [u8; 3] {
        self.lut[intensity as usize]
    }
}

impl Default for Colormap {
    fn default() -> Self {
        Self::jet()
    }
}

fn jet_channel(v: f64, center: f64) -> u8 {
    let level = (1.5 - (4.0 * v - center).abs()).clamp(0.0, 1.0);
    (level * 255.0).round() as u8
}

/// Colorize the depth field. Samples that normalise to zero (no return)
/// become transparent background.
pub fn depth_image(field: &[u16], colormap: &Colormap) -> DepthFrame {
    DepthFrame::from_fn(DEPTH_WIDTH as u32, DEPTH_HEIGHT as u32, |x, y| {
        let index = y as usize * DEPTH_WIDTH + x as usize;
        let level = intensity(field.get(index).copied().unwrap_or(0));
        if level == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            let [r, g, b] = colormap.color(level);
            Rgba([r, g, b, 255])
        }
    })
}

/// Project valid samples into sensor space.
///
/// A sample `d` at column `x`, row `y` lands at
/// `((x - w/2) * z * scale, -(y - h/2) * z * scale, -z)` with `z = d / 1000`.
pub fn point_cloud(field: &[u16], projection_scale: f64) -> PointCloud {
    let half_w = DEPTH_WIDTH as f64 / 2.0;
    let half_h = DEPTH_HEIGHT as f64 / 2.0;
    let mut points = Vec::new();

    for (y, row) in field.chunks_exact(DEPTH_WIDTH).take(DEPTH_HEIGHT).enumerate() {
        for (x, &depth) in row.iter().enumerate() {
            if !is_valid_depth(depth) {
                continue;
            }
            let z = f64::from(depth) / 1000.0;
            let x_pos = (x as f64 - half_w) * z * projection_scale;
            let y_pos = (y as f64 - half_h) * z * projection_scale;
            points.push(Point3 {
                x: x_pos as f32,
                y: -y_pos as f32,
                z: -z as f32,
            });
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DEFAULT_PROJECTION_SCALE;

    fn field_with(samples: &[(usize, usize, u16)]) -> Vec<u16> {
        let mut field = vec![0u16; DEPTH_WIDTH * DEPTH_HEIGHT];
        for &(x, y, d) in samples {
            field[y * DEPTH_WIDTH + x] = d;
        }
        field
    }

    #[test]
    fn test_intensity_scale() {
        assert_eq!(intensity(0), 0);
        assert_eq!(intensity(15), 0);
        assert_eq!(intensity(16), 1);
        assert_eq!(intensity(4000), 128);
        assert_eq!(intensity(8000), 255);
        assert_eq!(intensity(u16::MAX), 255);
    }

    #[test]
    fn test_validity_bounds_inclusive() {
        assert!(!is_valid_depth(99));
        assert!(is_valid_depth(100));
        assert!(is_valid_depth(8000));
        assert!(!is_valid_depth(8001));
    }

    #[test]
    fn test_point_cloud_boundaries() {
        let field = field_with(&[(0, 0, 99), (1, 0, 100), (2, 0, 8000), (3, 0, 8001)]);
        let points = point_cloud(&field, DEFAULT_PROJECTION_SCALE);
        assert_eq!(points.len(), 2);
        assert!((points[0].z + 0.1).abs() < 1e-6);
        assert!((points[1].z + 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_projection() {
        // Center pixel projects onto the optical axis.
        let field = field_with(&[(160, 80, 2000), (170, 70, 1000)]);
        let points = point_cloud(&field, 0.003);
        assert_eq!(points.len(), 2);

        // Row 70 comes first in scan order.
        let p = points[0];
        assert!((p.x - 0.03).abs() < 1e-6);
        assert!((p.y - 0.03).abs() < 1e-6);
        assert!((p.z + 1.0).abs() < 1e-6);

        let c = points[1];
        assert!(c.x.abs() < 1e-6 && c.y.abs() < 1e-6);
        assert!((c.z + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_depth_image_masks_background() {
        let field = field_with(&[(0, 0, 8), (1, 0, 4000), (2, 0, 8000)]);
        let img = depth_image(&field, &Colormap::jet());
        assert_eq!(img.dimensions(), (320, 160));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(5, 5).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0[3], 255);

        let far = img.get_pixel(2, 0).0;
        assert_eq!(far[3], 255);
        assert!(far[0] > far[2], "far samples should be red-dominant");
    }

    #[test]
    fn test_jet_endpoints() {
        let jet = Colormap::jet();
        let near = jet.color(1);
        assert_eq!(near[0], 0);
        assert!(near[2] > 100);
        assert_eq!(jet.color(255), [128, 0, 0]);
    }
}
