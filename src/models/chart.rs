//! Chart geometry models

use crate::utils::errors::DashboardError;

/// Canvas-space point, origin top-left
pub type Point = (f64, f64);

/// Padding applied below the lowest sample
pub const SCALE_PAD_LOW: f64 = 0.9995;
/// Padding applied above the highest sample
pub const SCALE_PAD_HIGH: f64 = 1.0005;
/// Fraction of the canvas height kept free at the top and at the bottom
pub const VERTICAL_INSET: f64 = 0.1;
/// Range substituted when every sample is equal
pub const MIN_SCALE_RANGE: f64 = 1e-8;

/// Vertical value range of the chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    /// Pad the true extremes by 0.05% on each side.
    ///
    /// Fails with `DegenerateScale` when the padded range is empty, inverted or not finite.
    pub fn checked(true_min: f64, true_max: f64) -> Result<Self, DashboardError> {
        let min = true_min * SCALE_PAD_LOW;
        let max = true_max * SCALE_PAD_HIGH;
        let range = max - min;
        if !range.is_finite() || range <= 0.0 {
            return Err(DashboardError::DegenerateScale { min, max });
        }
        Ok(ScaleBounds { min, max })
    }

    /// Same as `checked`, but widens a degenerate range around its centre instead of failing.
    pub fn from_extremes(true_min: f64, true_max: f64) -> Self {
        match Self::checked(true_min, true_max) {
            Ok(bounds) => bounds,
            Err(_) => {
                let centre = (true_min * SCALE_PAD_LOW + true_max * SCALE_PAD_HIGH) / 2.0;
                let centre = if centre.is_finite() { centre } else { 0.0 };
                ScaleBounds {
                    min: centre - MIN_SCALE_RANGE / 2.0,
                    max: centre + MIN_SCALE_RANGE / 2.0,
                }
            }
        }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Map a value to a y coordinate: `max` lands on the top inset line, `min` on the bottom one.
    pub fn project_y(&self, value: f64, height: f64) -> f64 {
        let padding = height * VERTICAL_INSET;
        let working_height = height - padding * 2.0;
        let percent = (value - self.min) / self.range();
        height - padding - percent * working_height
    }
}

/// One grid line; every 5th is major
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub from: Point,
    pub to: Point,
    pub major: bool,
}

/// Dashed crosshair through the latest sample, pre-split into dash segments
#[derive(Debug, Clone, PartialEq)]
pub struct Crosshair {
    pub horizontal: Vec<[Point; 2]>,
    pub vertical: Vec<[Point; 2]>,
}

/// Everything drawn above the grid once the series holds two samples
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBody {
    pub bounds: ScaleBounds,
    pub line: Vec<Point>,
    /// Line points closed down to the bottom edge and back to the left edge
    pub area: Vec<Point>,
    pub puck: Point,
    pub crosshair: Crosshair,
}

/// Geometry of one chart frame
#[derive(Debug, Clone, PartialEq)]
pub struct ChartScene {
    pub width: f64,
    pub height: f64,
    pub grid: Vec<GridLine>,
    pub body: Option<ChartBody>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_factors() {
        let bounds = ScaleBounds::checked(100.0, 102.0).unwrap();
        assert!((bounds.min - 99.95).abs() < 1e-9);
        assert!((bounds.max - 102.051).abs() < 1e-9);
    }

    #[test]
    fn test_projection_hits_inset_lines() {
        let bounds = ScaleBounds::from_extremes(100.0, 102.0);
        let height = 500.0;
        assert!((bounds.project_y(bounds.max, height) - 50.0).abs() < 1e-9);
        assert!((bounds.project_y(bounds.min, height) - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_tiny_distinct_prices_keep_their_padding() {
        let bounds = ScaleBounds::checked(1e-17, 3e-17).unwrap();
        assert_eq!(bounds.min, 1e-17 * SCALE_PAD_LOW);
        assert_eq!(bounds.max, 3e-17 * SCALE_PAD_HIGH);
        assert_eq!(ScaleBounds::from_extremes(1e-17, 3e-17), bounds);

        let height = 500.0;
        let ys: Vec<f64> = [1e-17, 2e-17, 3e-17]
            .iter()
            .map(|&p| bounds.project_y(p, height))
            .collect();
        assert!(ys[0] > ys[1] && ys[1] > ys[2]);
        assert!(ys[0] - ys[2] > 300.0, "spread {:?}", ys);
    }

    #[test]
    fn test_zero_prices_are_degenerate() {
        assert!(matches!(
            ScaleBounds::checked(0.0, 0.0),
            Err(DashboardError::DegenerateScale { .. })
        ));

        let bounds = ScaleBounds::from_extremes(0.0, 0.0);
        assert!(bounds.range() > 0.0);
        let y = bounds.project_y(0.0, 200.0);
        assert!(y.is_finite());
        assert!((y - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_equal_positive_prices_center() {
        let bounds = ScaleBounds::from_extremes(50.0, 50.0);
        assert!((bounds.project_y(50.0, 300.0) - 150.0).abs() < 1e-9);
    }
}
