//! Startup configuration, read once from the environment (after `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use plotters::style::{RGBAColor, RGBColor};

use crate::utils::errors::DashboardError;
use crate::utils::surface::Viewport;

/// Upper limit for either grid line count
pub const MAX_GRID_LINES: u32 = 1000;

/// An sRGB colour with straight alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f64) -> Self {
        Rgba { a, ..self }
    }

    /// Parse `#rgb` or `#rrggbb`
    pub fn parse_hex(input: &str) -> Result<Self, String> {
        let digits = input.trim().trim_start_matches('#');
        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_string(),
            _ => return Err(format!("'{}' is not a #rgb or #rrggbb colour", input)),
        };
        let bytes = hex::decode(&expanded).map_err(|e| format!("'{}': {}", input, e))?;
        Ok(Rgba::opaque(bytes[0], bytes[1], bytes[2]))
    }

    pub fn to_rgb(self) -> RGBColor {
        RGBColor(self.r, self.g, self.b)
    }

    pub fn to_rgba(self) -> RGBAColor {
        RGBAColor(self.r, self.g, self.b, self.a)
    }
}

/// Colours used by the chart
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub grid_major: Rgba,
    pub grid_minor: Rgba,
    pub line: Rgba,
    pub glow: Rgba,
    pub fill: Rgba,
    pub puck: Rgba,
    pub crosshair: Rgba,
}

impl Palette {
    /// Derive glow and fill from a single accent colour
    pub fn with_accent(accent: Rgba) -> Self {
        Palette {
            glow: accent.with_alpha(0.35),
            fill: accent.with_alpha(0.1),
            ..Palette::default()
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            grid_major: Rgba::opaque(0x00, 0x66, 0x00),
            grid_minor: Rgba::opaque(0x00, 0x22, 0x00),
            line: Rgba::opaque(0xff, 0xff, 0xff),
            glow: Rgba::opaque(0x00, 0xff, 0x00).with_alpha(0.35),
            fill: Rgba::opaque(0x00, 0xff, 0x00).with_alpha(0.1),
            puck: Rgba::opaque(0xff, 0xff, 0xff),
            crosshair: Rgba::opaque(0xff, 0xff, 0xff).with_alpha(0.5),
        }
    }
}

/// Immutable settings shared by the chart, the buffer and the ingest loop
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub grid_lines_h: u32,
    pub grid_lines_v: u32,
    pub max_data_points: usize,
    pub update_speed: Duration,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            grid_lines_h: 40,
            grid_lines_v: 60,
            max_data_points: 200,
            update_speed: Duration::from_millis(1500),
            palette: Palette::default(),
        }
    }
}

/// Everything the composition root needs
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub render: RenderConfig,
    pub frame_interval: Duration,
    pub symbol: String,
    pub api_base_url: String,
    pub background: Viewport,
    pub chart: Viewport,
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_every: u64,
}

impl DashboardConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self, DashboardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DashboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let grid_lines_h: u32 = parse_or(&lookup, "OMEGA_GRID_LINES_H", 40)?;
        let grid_lines_v: u32 = parse_or(&lookup, "OMEGA_GRID_LINES_V", 60)?;
        let max_data_points: usize = parse_or(&lookup, "OMEGA_MAX_DATA_POINTS", 200)?;
        let update_ms: u64 = parse_or(&lookup, "OMEGA_UPDATE_MS", 1500)?;
        let frame_ms: u64 = parse_or(&lookup, "OMEGA_FRAME_MS", 16)?;
        let snapshot_every: u64 = parse_or(&lookup, "OMEGA_SNAPSHOT_EVERY", 60)?;

        for (key, lines) in [("OMEGA_GRID_LINES_H", grid_lines_h), ("OMEGA_GRID_LINES_V", grid_lines_v)] {
            require(
                (1..=MAX_GRID_LINES).contains(&lines),
                key,
                &format!("must be between 1 and {}", MAX_GRID_LINES),
            )?;
        }
        require(max_data_points > 1, "OMEGA_MAX_DATA_POINTS", "must be greater than 1")?;
        require(update_ms > 0, "OMEGA_UPDATE_MS", "must be greater than 0")?;
        require(frame_ms > 0, "OMEGA_FRAME_MS", "must be greater than 0")?;
        require(snapshot_every > 0, "OMEGA_SNAPSHOT_EVERY", "must be greater than 0")?;

        let palette = match lookup("OMEGA_CHART_COLOR") {
            Some(raw) => Palette::with_accent(
                Rgba::parse_hex(&raw).map_err(|e| DashboardError::config("OMEGA_CHART_COLOR", e))?,
            ),
            None => Palette::default(),
        };

        let symbol = lookup("OMEGA_SYMBOL")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| "BTCUSDT".to_string());
        require(!symbol.is_empty(), "OMEGA_SYMBOL", "must not be empty")?;

        let api_base_url = lookup("OMEGA_API_BASE")
            .unwrap_or_else(|| crate::api::binance::BinanceClient::DEFAULT_BASE_URL.to_string());

        Ok(DashboardConfig {
            render: RenderConfig {
                grid_lines_h,
                grid_lines_v,
                max_data_points,
                update_speed: Duration::from_millis(update_ms),
                palette,
            },
            frame_interval: Duration::from_millis(frame_ms),
            symbol,
            api_base_url,
            background: parse_or(&lookup, "OMEGA_BG_SIZE", Viewport::new(1280, 720))?,
            chart: parse_or(&lookup, "OMEGA_CHART_SIZE", Viewport::new(960, 540))?,
            snapshot_dir: lookup("OMEGA_SNAPSHOT_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            snapshot_every,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, DashboardError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| DashboardError::config(key, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

fn require(ok: bool, key: &'static str, message: &str) -> Result<(), DashboardError> {
    if ok {
        Ok(())
    } else {
        Err(DashboardError::config(key, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.render, RenderConfig::default());
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.frame_interval, Duration::from_millis(16));
        assert_eq!(config.chart, Viewport::new(960, 540));
        assert!(config.snapshot_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            ("OMEGA_GRID_LINES_H", "10"),
            ("OMEGA_MAX_DATA_POINTS", "5"),
            ("OMEGA_SYMBOL", " ethusdt "),
            ("OMEGA_CHART_SIZE", "640x480"),
            ("OMEGA_CHART_COLOR", "#f80"),
            ("OMEGA_SNAPSHOT_DIR", "/tmp/omega"),
        ]))
        .unwrap();

        assert_eq!(config.render.grid_lines_h, 10);
        assert_eq!(config.render.max_data_points, 5);
        assert_eq!(config.symbol, "ETHUSDT");
        assert_eq!(config.chart, Viewport::new(640, 480));
        assert_eq!(config.render.palette.fill, Rgba::opaque(0xff, 0x88, 0x00).with_alpha(0.1));
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("/tmp/omega")));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = DashboardConfig::from_lookup(lookup_from(&[("OMEGA_MAX_DATA_POINTS", "1")]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::Config { key: "OMEGA_MAX_DATA_POINTS", .. }));

        let err = DashboardConfig::from_lookup(lookup_from(&[("OMEGA_GRID_LINES_V", "many")]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::Config { key: "OMEGA_GRID_LINES_V", .. }));

        assert!(DashboardConfig::from_lookup(lookup_from(&[("OMEGA_CHART_COLOR", "green")])).is_err());
        assert!(DashboardConfig::from_lookup(lookup_from(&[("OMEGA_GRID_LINES_H", "0")])).is_err());
        assert!(DashboardConfig::from_lookup(lookup_from(&[("OMEGA_BG_SIZE", "0x10")])).is_err());
    }

    #[test]
    fn test_grid_line_limit() {
        let at_limit = MAX_GRID_LINES.to_string();
        let config = DashboardConfig::from_lookup(lookup_from(&[("OMEGA_GRID_LINES_V", at_limit.as_str())]))
            .unwrap();
        assert_eq!(config.render.grid_lines_v, MAX_GRID_LINES);

        let huge = u32::MAX.to_string();
        let err = DashboardConfig::from_lookup(lookup_from(&[("OMEGA_GRID_LINES_H", huge.as_str())]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::Config { key: "OMEGA_GRID_LINES_H", .. }));
    }

    #[test]
    fn test_parse_hex_colour() {
        assert_eq!(Rgba::parse_hex("#006600").unwrap(), Rgba::opaque(0, 0x66, 0));
        assert_eq!(Rgba::parse_hex("0f0").unwrap(), Rgba::opaque(0, 0xff, 0));
        assert!(Rgba::parse_hex("#12345").is_err());
        assert!(Rgba::parse_hex("#zzzzzz").is_err());
    }
}
