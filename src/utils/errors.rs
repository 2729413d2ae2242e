use thiserror::Error;

use crate::api::binance::ApiError;

/// Errors raised by the dashboard core.
///
/// Only `Config` and `Api` ever leave a component; the render loops handle the
/// rest locally by skipping (part of) the current frame.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Series holds {len} sample(s); at least 2 are needed to scale the chart")]
    EmptySeries { len: usize },
    #[error("Degenerate price scale: min {min} == max {max}")]
    DegenerateScale { min: f64, max: f64 },
    #[error("Drawing surface '{surface}' unavailable ({width}x{height})")]
    SurfaceUnavailable {
        surface: &'static str,
        width: u32,
        height: u32,
    },
    #[error("Invalid price sample: {0}")]
    InvalidSample(f64),
    #[error("Series capacity must be greater than 1, got {0}")]
    InvalidCapacity(usize),
    #[error("Invalid configuration for {key}: {message}")]
    Config { key: &'static str, message: String },
    #[error("Draw failed: {0}")]
    Draw(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DashboardError {
    pub fn config(key: &'static str, message: impl Into<String>) -> Self {
        DashboardError::Config {
            key,
            message: message.into(),
        }
    }

    /// Errors that only cost the current frame.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            DashboardError::EmptySeries { .. }
                | DashboardError::DegenerateScale { .. }
                | DashboardError::Draw(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_local_classification() {
        assert!(DashboardError::EmptySeries { len: 1 }.is_frame_local());
        assert!(DashboardError::Draw("x".to_string()).is_frame_local());
        assert!(!DashboardError::config("OMEGA_SYMBOL", "empty").is_frame_local());
        assert!(!DashboardError::SurfaceUnavailable {
            surface: "chart",
            width: 0,
            height: 10
        }
        .is_frame_local());
    }

    #[test]
    fn test_messages() {
        let err = DashboardError::config("OMEGA_GRID_LINES_H", "must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for OMEGA_GRID_LINES_H: must be > 0"
        );
    }
}
