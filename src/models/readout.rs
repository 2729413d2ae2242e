//! Readout panel models

use std::fmt;

/// Text slots on the readout panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadoutField {
    MainPrice,
    PriceChange,
    Volume,
    High,
    Low,
    ConsoleLog,
    HexStream(usize),
}

impl fmt::Display for ReadoutField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadoutField::MainPrice => write!(f, "main-price"),
            ReadoutField::PriceChange => write!(f, "price-change"),
            ReadoutField::Volume => write!(f, "vol-val"),
            ReadoutField::High => write!(f, "high-val"),
            ReadoutField::Low => write!(f, "low-val"),
            ReadoutField::ConsoleLog => write!(f, "console-log"),
            ReadoutField::HexStream(slot) => write!(f, "hex-stream-{}", slot),
        }
    }
}

/// Direction of the 24h change, drives the change colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trend {
    #[default]
    Up,
    Down,
}

impl Trend {
    pub fn from_change(change_percent: f64) -> Self {
        if change_percent >= 0.0 {
            Trend::Up
        } else {
            Trend::Down
        }
    }

    pub fn color_hex(&self) -> &'static str {
        match self {
            Trend::Up => "#0f0",
            Trend::Down => "#f00",
        }
    }
}
