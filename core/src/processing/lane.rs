use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::math::morphology::MorphologyHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::LaneObservation;
use crate::telemetry::log::LogManager;

/// Bottom region of interest shared by lane tracking and hazard measurement.
///
/// Ratios are fractions of the frame: rows from `top` to the bottom edge,
/// columns from `left` to `right`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiGeometry {
    pub top: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for RoiGeometry {
    fn default() -> Self {
        Self {
            top: 0.60,
            left: 0.10,
            right: 0.90,
        }
    }
}

impl RoiGeometry {
    /// Crops `frame` to the ROI and returns it with the ROI's x offset.
    pub fn crop<'a>(&self, frame: ArrayView2<'a, u8>) -> (ArrayView2<'a, u8>, usize) {
        let (height, width) = frame.dim();
        let y1 = scale(height, self.top).min(height);
        let x1 = scale(width, self.left).min(width);
        let x2 = scale(width, self.right).clamp(x1, width);
        (frame.slice_move(s![y1..height, x1..x2]), x1)
    }
}

fn scale(length: usize, ratio: f64) -> usize {
    (length as f64 * ratio.max(0.0)) as usize
}

/// Sliding-window and stop-line parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneTrackerConfig {
    pub num_windows: usize,
    pub margin: usize,
    pub min_pixels: usize,
    /// Bottom fraction of the ROI used to seed the first window.
    pub seed_band: f32,
    /// Horizontal extent, as a fraction of ROI width, above which a blob is a bar.
    pub stop_line_min_width: f32,
    /// Vertical extent, as a fraction of ROI height, below which a blob is a bar.
    pub stop_line_max_height: f32,
    /// Opening kernel size for [`LaneTracker::denoise`]; 0 or 1 disables it.
    pub denoise_kernel: usize,
}

impl Default for LaneTrackerConfig {
    fn default() -> Self {
        Self {
            num_windows: 8,
            margin: 20,
            min_pixels: 30,
            seed_band: 0.25,
            stop_line_min_width: 0.6,
            stop_line_max_height: 0.25,
            denoise_kernel: 3,
        }
    }
}

/// Estimates the lane center and stop-line flag from a binary ROI mask.
pub struct LaneTracker {
    config: LaneTrackerConfig,
    kernel: Option<Array2<bool>>,
    logger: LogManager,
}

impl LaneTracker {
    pub fn new(config: LaneTrackerConfig) -> Self {
        let kernel = (config.denoise_kernel > 1)
            .then(|| MorphologyHelper::ellipse(config.denoise_kernel));
        Self {
            config,
            kernel,
            logger: LogManager::new("lane"),
        }
    }

    pub fn config(&self) -> &LaneTrackerConfig {
        &self.config
    }

    /// Opens the ROI mask so isolated speckle cannot stretch the blob extents.
    pub fn denoise(&self, roi: ArrayView2<u8>) -> Array2<u8> {
        match &self.kernel {
            Some(kernel) => MorphologyHelper::open(roi, kernel),
            None => roi.to_owned(),
        }
    }

    /// Observes an ROI mask whose left edge sits at `offset_x` in the full frame.
    ///
    /// Returns a lost observation only when the mask has no foreground pixel.
    pub fn observe(&self, roi: ArrayView2<u8>, offset_x: usize) -> LaneObservation {
        let (height, width) = roi.dim();
        let pixels: Vec<(usize, usize)> = roi
            .indexed_iter()
            .filter(|(_, &value)| value != 0)
            .map(|(position, _)| position)
            .collect();

        if pixels.is_empty() {
            self.logger.detail("no foreground in ROI");
            return LaneObservation::lost();
        }

        let center = self.sliding_window_center(&pixels, height, width);
        let stop_line = self.is_stop_line(&pixels, height, width);
        LaneObservation {
            center_x: Some((offset_x + center) as i32),
            stop_line,
        }
    }

    fn sliding_window_center(&self, pixels: &[(usize, usize)], height: usize, width: usize) -> usize {
        let all_xs: Vec<usize> = pixels.iter().map(|&(_, x)| x).collect();
        let overall = StatsHelper::mean_floor(&all_xs).unwrap_or(width / 2);

        let band_start = (height as f64 * (1.0 - f64::from(self.config.seed_band))) as usize;
        let seed_xs: Vec<usize> = pixels
            .iter()
            .filter(|&&(y, _)| y >= band_start)
            .map(|&(_, x)| x)
            .collect();
        let mut current_x = StatsHelper::mean_floor(&seed_xs).unwrap_or(overall);

        let windows = self.config.num_windows.max(1);
        let window_height = height / windows;
        let mut centers = Vec::with_capacity(windows);

        if window_height > 0 {
            for i in 0..windows {
                let y_high = height - i * window_height;
                let y_low = y_high - window_height;
                let x_min = current_x.saturating_sub(self.config.margin);
                let x_max = (current_x + self.config.margin).min(width.saturating_sub(1));

                let lane_xs: Vec<usize> = pixels
                    .iter()
                    .filter(|&&(y, x)| y >= y_low && y < y_high && x >= x_min && x <= x_max)
                    .map(|&(_, x)| x)
                    .collect();
                if lane_xs.len() < self.config.min_pixels {
                    continue;
                }
                if let Some(x) = StatsHelper::mean_floor(&lane_xs) {
                    current_x = x;
                    centers.push(x);
                }
            }
        }

        StatsHelper::mean_floor(&centers).unwrap_or(overall)
    }

    fn is_stop_line(&self, pixels: &[(usize, usize)], height: usize, width: usize) -> bool {
        let x_range = StatsHelper::extent(pixels.iter().map(|&(_, x)| x)).unwrap_or(0);
        let y_range = StatsHelper::extent(pixels.iter().map(|&(y, _)| y)).unwrap_or(0);
        (x_range as f64) > width as f64 * f64::from(self.config.stop_line_min_width)
            && (y_range as f64) < height as f64 * f64::from(self.config.stop_line_max_height)
    }
}

impl Default for LaneTracker {
    fn default() -> Self {
        Self::new(LaneTrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn stripe(height: usize, width: usize, center: usize, half_width: usize) -> Array2<u8> {
        Array2::from_shape_fn((height, width), |(_, x)| {
            if x + half_width >= center && x <= center + half_width {
                255
            } else {
                0
            }
        })
    }

    #[test]
    fn centered_stripe_resolves_near_its_column() {
        let mask = stripe(160, 400, 200, 3);
        let tracker = LaneTracker::default();
        let observation = tracker.observe(mask.view(), 0);
        let center = observation.center_x.unwrap();
        assert!((center - 200).abs() <= tracker.config().margin as i32);
        assert!(!observation.stop_line);
    }

    #[test]
    fn empty_mask_is_lost_but_edge_lane_is_not() {
        let tracker = LaneTracker::default();
        let empty = Array2::<u8>::zeros((96, 256));
        assert!(tracker.observe(empty.view(), 32).is_lost());

        let mut edge = Array2::<u8>::zeros((96, 256));
        edge.column_mut(0).fill(255);
        let observation = tracker.observe(edge.view(), 0);
        assert_eq!(observation.center_x, Some(0));
    }

    #[test]
    fn offset_recovers_full_frame_coordinates() {
        let mask = stripe(96, 256, 100, 4);
        let tracker = LaneTracker::default();
        assert_eq!(tracker.observe(mask.view(), 32).center_x, Some(132));
    }

    #[test]
    fn sparse_windows_fall_back_to_overall_mean() {
        let mut mask = Array2::<u8>::zeros((96, 256));
        mask[[90, 40]] = 255;
        mask[[10, 60]] = 255;
        let tracker = LaneTracker::default();
        assert_eq!(tracker.observe(mask.view(), 0).center_x, Some(50));
    }

    #[test]
    fn wide_flat_bar_flags_stop_line() {
        let mut mask = Array2::<u8>::zeros((96, 256));
        mask.slice_mut(s![70..80, 10..240]).fill(255);
        let tracker = LaneTracker::default();
        let observation = tracker.observe(mask.view(), 0);
        assert!(observation.stop_line);
        assert!(observation.center_x.is_some());
    }

    #[test]
    fn denoise_drops_speckle_that_would_hide_a_stop_bar() {
        let mut mask = Array2::<u8>::zeros((96, 256));
        mask.slice_mut(s![36..46, ..]).fill(255);
        mask[[3, 120]] = 255;
        mask[[90, 17]] = 255;
        let tracker = LaneTracker::default();
        assert!(!tracker.observe(mask.view(), 32).stop_line);

        let cleaned = tracker.denoise(mask.view());
        assert_eq!(cleaned[[3, 120]], 0);
        assert_eq!(cleaned[[40, 120]], 255);
        assert!(tracker.observe(cleaned.view(), 32).stop_line);
    }

    #[test]
    fn unit_kernel_leaves_mask_untouched() {
        let tracker = LaneTracker::new(LaneTrackerConfig {
            denoise_kernel: 1,
            ..Default::default()
        });
        let mut mask = Array2::<u8>::zeros((8, 8));
        mask[[4, 4]] = 255;
        assert_eq!(tracker.denoise(mask.view()), mask);
    }

    #[test]
    fn roi_crop_uses_bottom_band_and_reports_offset() {
        let frame = Array2::<u8>::zeros((240, 320));
        let (roi, offset) = RoiGeometry::default().crop(frame.view());
        assert_eq!(roi.dim(), (96, 256));
        assert_eq!(offset, 32);
    }
}
