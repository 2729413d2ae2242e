use plotters::prelude::*;
use tracing::{debug, trace};

use crate::config::{Palette, RenderConfig};
use crate::models::{ChartBody, ChartScene, Crosshair, GridLine, Point, ScaleBounds};
use crate::services::frame_service::FrameTask;
use crate::services::series_service::{PriceSeriesBuffer, SharedSeries};
use crate::utils::errors::DashboardError;
use crate::utils::surface::{Canvas, SnapshotWriter, Viewport};

/// Every n-th grid line is drawn in the major colour
pub const MAJOR_GRID_EVERY: u32 = 5;
pub const PUCK_RADIUS: i32 = 5;
/// Crosshair dash pattern: length on, length off
pub const CROSSHAIR_DASH: (f64, f64) = (5.0, 5.0);
const LINE_WIDTH: u32 = 2;
const GLOW_WIDTH: u32 = 6;

/// Evenly spaced vertical then horizontal grid lines, both ends inclusive
pub fn grid_lines(lines_v: u32, lines_h: u32, width: f64, height: f64) -> Vec<GridLine> {
    let mut grid = Vec::with_capacity(lines_v as usize + lines_h as usize + 2);

    for i in 0..=lines_v {
        let x = width / lines_v as f64 * i as f64;
        grid.push(GridLine {
            from: (x, 0.0),
            to: (x, height),
            major: i % MAJOR_GRID_EVERY == 0,
        });
    }

    for i in 0..=lines_h {
        let y = height / lines_h as f64 * i as f64;
        grid.push(GridLine {
            from: (0.0, y),
            to: (width, y),
            major: i % MAJOR_GRID_EVERY == 0,
        });
    }

    grid
}

/// Split a straight line into dash segments
pub fn dash_segments(from: Point, to: Point, dash: f64, gap: f64) -> Vec<[Point; 2]> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length <= 0.0 || dash <= 0.0 {
        return Vec::new();
    }
    let (ux, uy) = (dx / length, dy / length);

    let mut segments = Vec::new();
    let mut t = 0.0;
    while t < length {
        let end = (t + dash).min(length);
        segments.push([
            (from.0 + ux * t, from.1 + uy * t),
            (from.0 + ux * end, from.1 + uy * end),
        ]);
        t += dash + gap.max(0.0);
    }
    segments
}

/// Geometry of the line, fill, puck and crosshair for a series with ≥2 samples
fn layout_body(
    series: &PriceSeriesBuffer,
    bounds: ScaleBounds,
    width: f64,
    height: f64,
) -> Option<ChartBody> {
    // x pitch comes from the capacity, so a partial series stays anchored left
    let step_x = width / (series.capacity() - 1) as f64;

    let line: Vec<Point> = series
        .as_sequence()
        .enumerate()
        .map(|(i, sample)| (i as f64 * step_x, bounds.project_y(sample.price, height)))
        .collect();

    let puck = *line.last()?;

    let mut area = line.clone();
    area.push((puck.0, height));
    area.push((0.0, height));

    let (dash, gap) = CROSSHAIR_DASH;
    let crosshair = Crosshair {
        horizontal: dash_segments((0.0, puck.1), (width, puck.1), dash, gap),
        vertical: dash_segments((puck.0, 0.0), (puck.0, height), dash, gap),
    };

    Some(ChartBody {
        bounds,
        line,
        area,
        puck,
        crosshair,
    })
}

/// Compute one chart frame. With fewer than two samples only the grid is laid out.
pub fn layout_chart(series: &PriceSeriesBuffer, config: &RenderConfig, viewport: Viewport) -> ChartScene {
    let width = viewport.width as f64;
    let height = viewport.height as f64;
    let grid = grid_lines(config.grid_lines_v, config.grid_lines_h, width, height);

    let body = match series.scale_bounds() {
        Ok(bounds) => layout_body(series, bounds, width, height),
        Err(e) => {
            debug!("Chart body skipped: {}", e);
            None
        }
    };

    ChartScene {
        width,
        height,
        grid,
        body,
    }
}

fn px(point: &Point) -> (i32, i32) {
    (point.0.round() as i32, point.1.round() as i32)
}

fn draw_err<E: std::fmt::Display>(what: &'static str) -> impl Fn(E) -> DashboardError {
    move |e| DashboardError::Draw(format!("Failed to {}: {}", what, e))
}

/// Paint a laid-out scene. The canvas is fully cleared first.
pub fn paint_chart(scene: &ChartScene, palette: &Palette, canvas: &mut Canvas) -> Result<(), DashboardError> {
    let viewport = canvas.viewport();
    if scene.width != viewport.width as f64 || scene.height != viewport.height as f64 {
        return Err(DashboardError::Draw(format!(
            "scene laid out for {}x{} but the canvas is {}",
            scene.width, scene.height, viewport
        )));
    }

    let root = canvas.area();
    root.fill(&BLACK).map_err(draw_err("clear canvas"))?;

    // Grid
    for line in &scene.grid {
        let color = if line.major { palette.grid_major } else { palette.grid_minor };
        root.draw(&PathElement::new(
            vec![px(&line.from), px(&line.to)],
            color.to_rgb().stroke_width(1),
        ))
        .map_err(draw_err("draw grid"))?;
    }

    let body = match &scene.body {
        Some(body) => body,
        None => return root.present().map_err(draw_err("present chart")),
    };

    let line: Vec<(i32, i32)> = body.line.iter().map(px).collect();

    // Glow underlay, then the line itself
    root.draw(&PathElement::new(line.clone(), palette.glow.to_rgba().stroke_width(GLOW_WIDTH)))
        .map_err(draw_err("draw glow"))?;
    root.draw(&PathElement::new(line, palette.line.to_rgb().stroke_width(LINE_WIDTH)))
        .map_err(draw_err("draw price line"))?;

    // Filled area under the line
    root.draw(&Polygon::new(
        body.area.iter().map(px).collect::<Vec<_>>(),
        palette.fill.to_rgba().filled(),
    ))
    .map_err(draw_err("fill area"))?;

    // Puck on the latest sample
    root.draw(&Circle::new(px(&body.puck), PUCK_RADIUS, palette.puck.to_rgb().filled()))
        .map_err(draw_err("draw puck"))?;

    // Crosshair
    let crosshair_style = palette.crosshair.to_rgba().stroke_width(1);
    for segment in body.crosshair.horizontal.iter().chain(body.crosshair.vertical.iter()) {
        root.draw(&PathElement::new(
            vec![px(&segment[0]), px(&segment[1])],
            crosshair_style,
        ))
        .map_err(draw_err("draw crosshair"))?;
    }

    root.present().map_err(draw_err("present chart"))
}

/// Redraws the grid and price chart from the shared series every frame
pub struct ChartRenderer {
    series: SharedSeries,
    config: RenderConfig,
    canvas: Canvas,
    snapshots: Option<SnapshotWriter>,
    frames: u64,
}

impl ChartRenderer {
    pub fn new(series: SharedSeries, config: RenderConfig, canvas: Canvas) -> Self {
        ChartRenderer {
            series,
            config,
            canvas,
            snapshots: None,
            frames: 0,
        }
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotWriter) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Lay out and paint one frame, returning the geometry that was drawn
    pub fn render(&mut self) -> Result<ChartScene, DashboardError> {
        // Borrow ends before painting; nothing else may hold it across frames
        let scene = {
            let series = self.series.borrow();
            layout_chart(&series, &self.config, self.canvas.viewport())
        };
        if let Some(body) = &scene.body {
            trace!("chart bounds {}..{}", body.bounds.min, body.bounds.max);
        }
        paint_chart(&scene, &self.config.palette, &mut self.canvas)?;
        Ok(scene)
    }
}

impl FrameTask for ChartRenderer {
    fn name(&self) -> &'static str {
        "chart"
    }

    fn frame(&mut self) -> Result<(), DashboardError> {
        self.frames += 1;
        self.render()?;
        if let Some(snapshots) = &self.snapshots {
            if snapshots.maybe_write(self.frames, &self.canvas) {
                debug!("Chart snapshot queued at frame {}", self.frames);
            }
        }
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        self.canvas.resize(viewport);
    }
}
