use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{info, trace};

use crate::models::{ReadoutField, TickerSnapshot, Trend};
use crate::services::frame_service::FrameTask;
use crate::utils::errors::DashboardError;
use crate::utils::table::{Align, Table};

/// Scramble frames shown before the real value lands
pub const DECRYPT_FRAMES: u32 = 10;
/// Upper bound (exclusive) of the numbers shown while scrambling
const SCRAMBLE_MAX: f64 = 100_000.0;
pub const DECRYPT_INTERVAL: Duration = Duration::from_millis(30);
pub const HEX_STREAM_INTERVAL: Duration = Duration::from_millis(200);

/// Format a price as US dollars, e.g. `$43,250.12`
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

pub fn format_change(change_percent: f64) -> String {
    format!("{:.2}%", change_percent)
}

pub fn format_packet_log(ticker: &TickerSnapshot) -> String {
    format!(
        "> PACKET_RX: {} | BID: {} | ASK: {}",
        ticker.trade_count, ticker.bid_price, ticker.ask_price
    )
}

/// `0x` followed by six random uppercase hex digits
pub fn hex_token<R: Rng>(rng: &mut R) -> String {
    let bytes: [u8; 3] = rng.gen();
    format!("0x{}", hex::encode_upper(bytes))
}

/// One frame of a scramble-reveal animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptFrame {
    Scrambled(String),
    Settled(String),
}

/// Shows random numbers for a few frames, then the real text
#[derive(Debug, Clone)]
pub struct DecryptText {
    target: String,
    iterations: u32,
}

impl DecryptText {
    pub fn new(target: String) -> Self {
        DecryptText { target, iterations: 0 }
    }

    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> DecryptFrame {
        if self.iterations >= DECRYPT_FRAMES {
            return DecryptFrame::Settled(self.target.clone());
        }
        self.iterations += 1;
        let noise = (rng.gen::<f64>() * SCRAMBLE_MAX) as u64;
        DecryptFrame::Scrambled(noise.to_string())
    }
}

/// Output for readout text
pub trait ReadoutSink {
    /// `settled` is false for intermediate scramble frames
    fn publish(&mut self, field: ReadoutField, text: &str, settled: bool);

    fn trend(&mut self, _trend: Trend) {}
}

/// Writes readouts to the log
pub struct TracingSink;

impl ReadoutSink for TracingSink {
    fn publish(&mut self, field: ReadoutField, text: &str, settled: bool) {
        if settled {
            info!(target: "omega_ticker::readout", "{:<14} {}", field.to_string(), text);
        } else {
            trace!(target: "omega_ticker::readout", "{:<14} {}", field.to_string(), text);
        }
    }

    fn trend(&mut self, trend: Trend) {
        trace!(target: "omega_ticker::readout", "trend colour {}", trend.color_hex());
    }
}

pub type SharedReadouts = Rc<RefCell<ReadoutBoard>>;

/// Current readout texts plus the scramble effects still running
pub struct ReadoutBoard {
    fields: BTreeMap<ReadoutField, String>,
    effects: BTreeMap<ReadoutField, DecryptText>,
    trend: Trend,
    hex_slots: usize,
    sink: Box<dyn ReadoutSink>,
    rng: StdRng,
}

impl ReadoutBoard {
    pub fn new(sink: Box<dyn ReadoutSink>, hex_slots: usize, rng: StdRng) -> Self {
        ReadoutBoard {
            fields: BTreeMap::new(),
            effects: BTreeMap::new(),
            trend: Trend::default(),
            hex_slots,
            sink,
            rng,
        }
    }

    pub fn shared(self) -> SharedReadouts {
        Rc::new(RefCell::new(self))
    }

    pub fn field(&self, field: ReadoutField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    #[cfg(test)]
    pub fn trend(&self) -> Trend {
        self.trend
    }

    #[cfg(test)]
    pub fn active_effects(&self) -> usize {
        self.effects.len()
    }

    fn set(&mut self, field: ReadoutField, text: String, settled: bool) {
        self.sink.publish(field, &text, settled);
        self.fields.insert(field, text);
    }

    /// Update every readout from a fresh ticker snapshot.
    ///
    /// Price, change and the packet log change at once; volume, high and low
    /// restart their scramble effect.
    pub fn apply_ticker(&mut self, ticker: &TickerSnapshot) {
        self.set(ReadoutField::MainPrice, format_usd(ticker.last_price), true);

        self.trend = Trend::from_change(ticker.change_percent);
        self.sink.trend(self.trend);
        self.set(ReadoutField::PriceChange, format_change(ticker.change_percent), true);

        let targets = [
            (ReadoutField::Volume, format!("{:.0}", ticker.volume)),
            (ReadoutField::High, format!("{:.2}", ticker.high_price)),
            (ReadoutField::Low, format!("{:.2}", ticker.low_price)),
        ];
        for (field, target) in targets {
            self.effects.insert(field, DecryptText::new(target));
        }

        self.set(ReadoutField::ConsoleLog, format_packet_log(ticker), true);
    }

    /// Advance every running scramble effect by one frame
    pub fn advance_effects(&mut self) {
        let mut settled = Vec::new();
        let mut frames = Vec::with_capacity(self.effects.len());
        for (field, effect) in self.effects.iter_mut() {
            frames.push((*field, effect.advance(&mut self.rng)));
        }

        for (field, frame) in frames {
            match frame {
                DecryptFrame::Scrambled(text) => self.set(field, text, false),
                DecryptFrame::Settled(text) => {
                    self.set(field, text, true);
                    settled.push(field);
                }
            }
        }

        for field in settled {
            self.effects.remove(&field);
        }
    }

    /// Put a new random token in every hex slot
    pub fn refresh_hex(&mut self) {
        for slot in 0..self.hex_slots {
            let token = hex_token(&mut self.rng);
            self.set(ReadoutField::HexStream(slot), token, false);
        }
    }

    /// Settled ticker readouts as a text table
    pub fn render_table(&self) -> String {
        let mut table = Table::new(vec!["FIELD", "VALUE"]).align(1, Align::Right);
        let rows = [
            ("PRICE", ReadoutField::MainPrice),
            ("24H", ReadoutField::PriceChange),
            ("VOL", ReadoutField::Volume),
            ("HIGH", ReadoutField::High),
            ("LOW", ReadoutField::Low),
        ];
        for (label, field) in rows {
            let value = if self.effects.contains_key(&field) {
                "...".to_string()
            } else {
                self.field(field).unwrap_or("-").to_string()
            };
            table.add_row(vec![label.to_string(), value]);
        }
        table.render()
    }
}

/// Drives the scramble effects (30 ms cadence)
pub struct DecryptTask {
    board: SharedReadouts,
}

impl DecryptTask {
    pub fn new(board: SharedReadouts) -> Self {
        DecryptTask { board }
    }
}

impl FrameTask for DecryptTask {
    fn name(&self) -> &'static str {
        "decrypt"
    }

    fn frame(&mut self) -> Result<(), DashboardError> {
        self.board.borrow_mut().advance_effects();
        Ok(())
    }
}

/// Refreshes the hex stream slots (200 ms cadence)
pub struct HexStreamTask {
    board: SharedReadouts,
}

impl HexStreamTask {
    pub fn new(board: SharedReadouts) -> Self {
        HexStreamTask { board }
    }
}

impl FrameTask for HexStreamTask {
    fn name(&self) -> &'static str {
        "hex-stream"
    }

    fn frame(&mut self) -> Result<(), DashboardError> {
        self.board.borrow_mut().refresh_hex();
        Ok(())
    }
}
