use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rand::Rng;
use tracing::{debug, warn};

use crate::models::RainGlyph;
use crate::services::frame_service::FrameTask;
use crate::utils::errors::DashboardError;
use crate::utils::surface::{Canvas, SnapshotWriter, Viewport};

pub const GLYPHS: &[u8] = b"0123456789ABCDEF@#$%&";
/// Column width and row height in pixels
pub const CHAR_PITCH: u32 = 15;
pub const FONT_SIZE: u32 = 12;
pub const HUE_STEP: u16 = 1;
/// Hue offset between neighbouring columns
pub const COLUMN_HUE_STEP: usize = 5;
/// A column past the bottom edge restarts when a uniform draw exceeds this
pub const RESET_THRESHOLD: f64 = 0.98;
const INITIAL_ROW: u32 = 1;
const TRAIL_ALPHA: f64 = 0.05;

/// State of the character rain: one fall position per column plus the hue cursor
#[derive(Debug, Clone)]
pub struct MatrixRain {
    drops: Vec<u32>,
    hue: u16,
    viewport: Viewport,
}

impl MatrixRain {
    pub fn new(viewport: Viewport) -> Self {
        MatrixRain {
            drops: vec![INITIAL_ROW; Self::column_count(viewport.width)],
            hue: 0,
            viewport,
        }
    }

    pub fn column_count(width: u32) -> usize {
        (width / CHAR_PITCH) as usize
    }

    #[cfg(test)]
    pub fn columns(&self) -> &[u32] {
        &self.drops
    }

    #[cfg(test)]
    pub fn hue(&self) -> u16 {
        self.hue
    }

    /// Keep existing columns, add fresh ones on grow and drop the extras on shrink
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.drops.resize(Self::column_count(viewport.width), INITIAL_ROW);
    }

    /// Colour of a column for the current hue cursor
    pub fn column_hue(hue: u16, column: usize) -> u16 {
        ((hue as usize + column * COLUMN_HUE_STEP) % 360) as u16
    }

    /// Advance one frame and return the glyphs to draw
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Vec<RainGlyph> {
        self.hue = (self.hue + HUE_STEP) % 360;
        let height = self.viewport.height;

        let mut glyphs = Vec::with_capacity(self.drops.len());
        for (column, drop) in self.drops.iter_mut().enumerate() {
            let pick = (rng.gen::<f64>() * GLYPHS.len() as f64) as usize;
            glyphs.push(RainGlyph {
                glyph: GLYPHS[pick.min(GLYPHS.len() - 1)] as char,
                column,
                row: *drop,
                hue: Self::column_hue(self.hue, column),
            });

            if drop.saturating_mul(CHAR_PITCH) > height && rng.gen::<f64>() > RESET_THRESHOLD {
                *drop = 0;
            }
            *drop += 1;
        }
        glyphs
    }
}

/// Draws the rain onto the background canvas
pub struct RainRenderer<R> {
    rain: MatrixRain,
    canvas: Canvas,
    rng: R,
    block_glyphs: bool,
    snapshots: Option<SnapshotWriter>,
    frames: u64,
}

impl<R: Rng> RainRenderer<R> {
    pub fn new(canvas: Canvas, rng: R) -> Self {
        RainRenderer {
            rain: MatrixRain::new(canvas.viewport()),
            canvas,
            rng,
            block_glyphs: false,
            snapshots: None,
            frames: 0,
        }
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotWriter) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    #[cfg(test)]
    pub fn rain(&self) -> &MatrixRain {
        &self.rain
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Draw solid cells instead of text from now on
    #[cfg(test)]
    pub fn use_block_glyphs(&mut self) {
        self.block_glyphs = true;
    }

    /// Blend a translucent black layer over the canvas so older glyphs fade out
    pub fn fade(&mut self) -> Result<(), DashboardError> {
        let Viewport { width, height } = self.canvas.viewport();
        let root = self.canvas.area();
        root.draw(&Rectangle::new(
            [(0, 0), (width as i32, height as i32)],
            RGBAColor(0, 0, 0, TRAIL_ALPHA).filled(),
        ))
        .map_err(|e| DashboardError::Draw(format!("Failed to fade background: {}", e)))?;
        root.present()
            .map_err(|e| DashboardError::Draw(format!("Failed to present background: {}", e)))
    }

    fn draw_glyphs(&mut self, glyphs: &[RainGlyph]) -> Result<(), DashboardError> {
        let root = self.canvas.area();
        let pitch = CHAR_PITCH as i32;

        for glyph in glyphs {
            let color = HSLColor(glyph.hue as f64 / 360.0, 1.0, 0.5);
            let x = glyph.column as i32 * pitch;
            let baseline = glyph.row as i32 * pitch;

            if !self.block_glyphs {
                let style = ("monospace", FONT_SIZE)
                    .into_font()
                    .color(&color)
                    .pos(Pos::new(HPos::Left, VPos::Bottom));
                match root.draw(&Text::new(glyph.glyph.to_string(), (x, baseline), style)) {
                    Ok(()) => continue,
                    Err(e) => {
                        warn!("Glyph font unavailable ({}), falling back to block glyphs", e);
                        self.block_glyphs = true;
                    }
                }
            }

            let size = FONT_SIZE as i32;
            root.draw(&Rectangle::new(
                [(x + 2, baseline - size), (x + 2 + size * 2 / 3, baseline)],
                color.filled(),
            ))
            .map_err(|e| DashboardError::Draw(format!("Failed to draw glyph: {}", e)))?;
        }

        root.present()
            .map_err(|e| DashboardError::Draw(format!("Failed to present background: {}", e)))
    }
}

impl<R: Rng> FrameTask for RainRenderer<R> {
    fn name(&self) -> &'static str {
        "rain"
    }

    fn frame(&mut self) -> Result<(), DashboardError> {
        self.frames += 1;
        self.fade()?;
        let glyphs = self.rain.step(&mut self.rng);
        self.draw_glyphs(&glyphs)?;

        if let Some(snapshots) = &self.snapshots {
            if snapshots.maybe_write(self.frames, &self.canvas) {
                debug!("Background snapshot queued at frame {}", self.frames);
            }
        }
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        self.canvas.resize(viewport);
        self.rain.resize(self.canvas.viewport());
    }
}
