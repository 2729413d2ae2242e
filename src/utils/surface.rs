//! In-memory drawing surfaces backed by plotters' bitmap backend

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::utils::errors::DashboardError;

/// Pixel dimensions of a drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Viewport { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `1280x720`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .to_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
            .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
        let width: u32 = w.parse().map_err(|_| format!("invalid width '{}'", w))?;
        let height: u32 = h.parse().map_err(|_| format!("invalid height '{}'", h))?;
        let viewport = Viewport::new(width, height);
        if viewport.is_empty() {
            return Err("width and height must be greater than 0".to_string());
        }
        Ok(viewport)
    }
}

/// RGB framebuffer that keeps its contents between frames
pub struct Canvas {
    label: &'static str,
    viewport: Viewport,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Allocate a black canvas. A zero-sized viewport means the surface is unavailable.
    pub fn new(label: &'static str, viewport: Viewport) -> Result<Self, DashboardError> {
        if viewport.is_empty() {
            return Err(DashboardError::SurfaceUnavailable {
                surface: label,
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Canvas {
            label,
            viewport,
            pixels: vec![0; buffer_len(viewport)],
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Reallocate for new dimensions. Contents are not preserved.
    ///
    /// A zero-sized resize is ignored so the owning loop keeps drawing at the old size.
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            warn!("Ignoring resize of '{}' canvas to {}", self.label, viewport);
            return;
        }
        if viewport == self.viewport {
            return;
        }
        debug!("Resizing '{}' canvas {} -> {}", self.label, self.viewport, viewport);
        self.viewport = viewport;
        self.pixels = vec![0; buffer_len(viewport)];
    }

    /// Drawing area over the framebuffer; drawing blends into what is already there
    pub fn area(&mut self) -> DrawingArea<BitMapBackend<'_>, Shift> {
        BitMapBackend::with_buffer(&mut self.pixels, (self.viewport.width, self.viewport.height))
            .into_drawing_area()
    }

    /// RGB value at a pixel, `None` outside the canvas
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.viewport.width || y >= self.viewport.height {
            return None;
        }
        let offset = ((y * self.viewport.width + x) * 3) as usize;
        Some([self.pixels[offset], self.pixels[offset + 1], self.pixels[offset + 2]])
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Encode an RGB framebuffer to an image file (format picked from the extension)
pub fn write_png(label: &str, path: &Path, viewport: Viewport, pixels: &[u8]) -> Result<(), DashboardError> {
    let size = (viewport.width, viewport.height);
    let mut backend = BitMapBackend::new(path, size);
    backend
        .blit_bitmap((0, 0), size, pixels)
        .map_err(|e| DashboardError::Draw(format!("Failed to copy '{}' frame: {}", label, e)))?;
    backend
        .present()
        .map_err(|e| DashboardError::Draw(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

fn buffer_len(viewport: Viewport) -> usize {
    viewport.width as usize * viewport.height as usize * 3
}

/// Writes a canvas to `<dir>/<label>.png` every `every` frames
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
    every: u64,
}

impl SnapshotWriter {
    pub fn new(dir: PathBuf, every: u64) -> Self {
        SnapshotWriter {
            dir,
            every: every.max(1),
        }
    }

    pub fn path_for(&self, canvas: &Canvas) -> PathBuf {
        self.dir.join(format!("{}.png", canvas.label()))
    }

    pub fn is_due(&self, frame: u64) -> bool {
        frame > 0 && frame % self.every == 0
    }

    /// Queue a snapshot if `frame` is due; returns whether one was queued.
    ///
    /// Encoding runs on the blocking pool when a runtime is available, so the
    /// frame loops are not held up by file I/O. Failures are only logged.
    pub fn maybe_write(&self, frame: u64, canvas: &Canvas) -> bool {
        if !self.is_due(frame) {
            return false;
        }

        let label = canvas.label();
        let path = self.path_for(canvas);
        let viewport = canvas.viewport();
        let pixels = canvas.pixels().to_vec();
        let job = move || {
            if let Err(e) = write_png(label, &path, viewport, &pixels) {
                warn!("Snapshot of '{}' failed: {}", label, e);
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
        true
    }
}
