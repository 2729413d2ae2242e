pub mod errors;
pub mod surface;
pub mod table;

pub use errors::DashboardError;
pub use surface::{Canvas, SnapshotWriter, Viewport};
