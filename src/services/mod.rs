//! The dashboard loops and the state they share

pub mod chart_service;
pub mod frame_service;
pub mod ingest_service;
pub mod rain_service;
pub mod readout_service;
pub mod resize_service;
pub mod series_service;

pub use chart_service::ChartRenderer;
pub use frame_service::{FrameLoop, FrameTask, StopHandle};
pub use ingest_service::{BinanceTicker, IngestLoop};
pub use rain_service::RainRenderer;
pub use readout_service::{DecryptTask, HexStreamTask, ReadoutBoard, TracingSink};
pub use resize_service::ResizeRouter;
pub use series_service::PriceSeriesBuffer;
