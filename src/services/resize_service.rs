use std::fmt;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::services::frame_service::{ResizeSender, StopHandle};
use crate::utils::surface::Viewport;

/// Surfaces that accept resize commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Background,
    Chart,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Background => write!(f, "background"),
            Surface::Chart => write!(f, "chart"),
        }
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "background" | "bg" => Ok(Surface::Background),
            "chart" => Ok(Surface::Chart),
            other => Err(format!("unknown surface '{}' (expected background or chart)", other)),
        }
    }
}

/// Parse `<surface> <WIDTHxHEIGHT>`, e.g. `chart 800x600`
pub fn parse_resize(line: &str) -> Result<(Surface, Viewport), String> {
    let mut parts = line.split_whitespace();
    let surface: Surface = parts.next().ok_or("empty command")?.parse()?;
    let viewport: Viewport = parts.next().ok_or("missing WIDTHxHEIGHT")?.parse()?;
    if parts.next().is_some() {
        return Err("unexpected text after the size".to_string());
    }
    Ok((surface, viewport))
}

/// Reads resize commands line by line and forwards them to the running frame loops
pub struct ResizeRouter {
    background: Option<ResizeSender>,
    chart: Option<ResizeSender>,
    stop: watch::Receiver<bool>,
}

impl ResizeRouter {
    /// `None` marks a surface whose loop is not running
    pub fn new(background: Option<ResizeSender>, chart: Option<ResizeSender>, stop: &StopHandle) -> Self {
        ResizeRouter {
            background,
            chart,
            stop: stop.subscribe(),
        }
    }

    /// Forward one command to its loop
    pub fn route(&self, line: &str) -> Result<(Surface, Viewport), String> {
        let (surface, viewport) = parse_resize(line)?;
        let sender = match surface {
            Surface::Background => self.background.as_ref(),
            Surface::Chart => self.chart.as_ref(),
        }
        .ok_or_else(|| format!("the {} loop is not running", surface))?;

        sender
            .send(viewport)
            .map_err(|_| format!("the {} loop has stopped", surface))?;
        Ok((surface, viewport))
    }

    /// Route commands until the input ends or the stop handle fires; returns how many were applied
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> u64 {
        let mut lines = input.lines();
        let mut routed = 0;

        if *self.stop.borrow() {
            return routed;
        }

        loop {
            tokio::select! {
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        break;
                    }
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => match self.route(&line) {
                        Ok((surface, viewport)) => {
                            routed += 1;
                            info!("Resizing {} to {}", surface, viewport);
                        }
                        Err(e) => warn!("Ignoring resize command '{}': {}", line.trim(), e),
                    },
                    Ok(None) => {
                        debug!("resize input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read resize input: {}", e);
                        break;
                    }
                },
            }
        }
        routed
    }
}
