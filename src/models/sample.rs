//! Price sample model

use chrono::{DateTime, Utc};

use crate::utils::errors::DashboardError;

/// A single price observation, ordered by arrival
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub price: f64,
    pub received_at: DateTime<Utc>,
}

impl PriceSample {
    /// Stamp a price with the current time. Non-finite prices are rejected.
    pub fn new(price: f64) -> Result<Self, DashboardError> {
        Self::at(price, Utc::now())
    }

    pub fn at(price: f64, received_at: DateTime<Utc>) -> Result<Self, DashboardError> {
        if !price.is_finite() {
            return Err(DashboardError::InvalidSample(price));
        }
        Ok(PriceSample { price, received_at })
    }
}
