//! Character rain models

/// One glyph emitted by the rain for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainGlyph {
    pub glyph: char,
    pub column: usize,
    /// Fall position in rows at the time the glyph was drawn
    pub row: u32,
    /// Hue in degrees, always < 360
    pub hue: u16,
}
