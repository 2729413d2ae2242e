//! Data models shared by the dashboard services
//!
//! Plain data only; the loops that mutate or draw them live in `services`.

pub mod chart;
pub mod rain;
pub mod readout;
pub mod sample;
pub mod ticker;

// Re-export commonly used types for convenience
pub use chart::{ChartBody, ChartScene, Crosshair, GridLine, Point, ScaleBounds};
pub use rain::RainGlyph;
pub use readout::{ReadoutField, Trend};
pub use sample::PriceSample;
pub use ticker::TickerSnapshot;
