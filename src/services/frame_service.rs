use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::utils::errors::DashboardError;
use crate::utils::surface::Viewport;

/// One repeating unit of work driven by a `FrameLoop`
pub trait FrameTask {
    fn name(&self) -> &'static str;

    /// Draw or update one frame. Errors skip the rest of this frame only.
    fn frame(&mut self) -> Result<(), DashboardError>;

    /// Surface dimensions changed; applied between frames
    fn resize(&mut self, _viewport: Viewport) {}
}

/// Shared stop signal for every loop started together
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        StopHandle { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Sender half used to push resize notifications into a running loop
pub type ResizeSender = mpsc::UnboundedSender<Viewport>;

/// Runs a task on a fixed period until stopped
pub struct FrameLoop<T> {
    task: T,
    period: Duration,
    stop: watch::Receiver<bool>,
    resizes: Option<mpsc::UnboundedReceiver<Viewport>>,
    frames: u64,
    skipped: u64,
}

impl<T: FrameTask> FrameLoop<T> {
    pub fn new(task: T, period: Duration, stop: &StopHandle) -> Self {
        FrameLoop {
            task,
            period,
            stop: stop.subscribe(),
            resizes: None,
            frames: 0,
            skipped: 0,
        }
    }

    /// Accept resize notifications; returns the sender for them
    pub fn resizable(&mut self) -> ResizeSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.resizes = Some(rx);
        tx
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Run exactly one frame
    pub fn step(&mut self) {
        self.frames += 1;
        if let Err(e) = self.task.frame() {
            self.skipped += 1;
            if e.is_frame_local() {
                debug!("{}: frame {} skipped: {}", self.task.name(), self.frames, e);
            } else {
                warn!("{}: frame {} failed: {}", self.task.name(), self.frames, e);
            }
        }
    }

    /// Run `count` frames back to back, ignoring the period
    #[cfg(test)]
    pub fn run_frames(&mut self, count: u64) {
        for _ in 0..count {
            self.step();
        }
    }

    /// Tick until the stop handle fires, then hand the loop back
    pub async fn run(mut self) -> Self {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("{} loop started ({:?} period)", self.task.name(), self.period);

        if *self.stop.borrow() {
            return self;
        }

        loop {
            tokio::select! {
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        break;
                    }
                }
                resize = next_resize(&mut self.resizes) => {
                    match resize {
                        Some(viewport) => {
                            debug!("{} resized to {}", self.task.name(), viewport);
                            self.task.resize(viewport);
                        }
                        None => self.resizes = None,
                    }
                }
                _ = ticker.tick() => self.step(),
            }
        }

        debug!("{} loop stopping", self.task.name());
        self
    }
}

async fn next_resize(resizes: &mut Option<mpsc::UnboundedReceiver<Viewport>>) -> Option<Viewport> {
    match resizes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
