use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::models::{PriceSample, ScaleBounds};
use crate::utils::errors::DashboardError;

/// Series handle shared by the ingest loop (writer) and the chart loop (reader).
///
/// Every loop runs on one thread and no borrow is held across an await point.
pub type SharedSeries = Rc<RefCell<PriceSeriesBuffer>>;

/// Samples reserved up front; larger buffers grow as prices arrive
const PREALLOCATE_LIMIT: usize = 1024;

/// Most recent price samples, oldest first, never longer than its capacity
#[derive(Debug, Clone)]
pub struct PriceSeriesBuffer {
    samples: VecDeque<PriceSample>,
    capacity: usize,
}

impl PriceSeriesBuffer {
    pub fn new(capacity: usize) -> Result<Self, DashboardError> {
        if capacity < 2 {
            return Err(DashboardError::InvalidCapacity(capacity));
        }
        Ok(PriceSeriesBuffer {
            samples: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            capacity,
        })
    }

    pub fn shared(capacity: usize) -> Result<SharedSeries, DashboardError> {
        Ok(Rc::new(RefCell::new(Self::new(capacity)?)))
    }

    /// Append a sample, evicting the oldest one if the buffer overflows.
    ///
    /// The bound is enforced after the push, so `len() <= capacity()` holds
    /// after every call.
    pub fn append(&mut self, sample: PriceSample) -> Option<PriceSample> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min(&self) -> Option<f64> {
        self.prices().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.prices().reduce(f64::max)
    }

    /// Samples in arrival order, oldest first
    pub fn as_sequence(&self) -> impl ExactSizeIterator<Item = &PriceSample> + '_ {
        self.samples.iter()
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.price)
    }

    /// Padded vertical bounds for the chart; needs at least two samples
    pub fn scale_bounds(&self) -> Result<ScaleBounds, DashboardError> {
        match (self.len(), self.min(), self.max()) {
            (len, Some(min), Some(max)) if len >= 2 => Ok(ScaleBounds::from_extremes(min, max)),
            (len, _, _) => Err(DashboardError::EmptySeries { len }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, prices: &[f64]) -> PriceSeriesBuffer {
        let mut buffer = PriceSeriesBuffer::new(capacity).unwrap();
        for &p in prices {
            buffer.append(PriceSample::new(p).unwrap());
        }
        buffer
    }

    fn contents(buffer: &PriceSeriesBuffer) -> Vec<f64> {
        buffer.prices().collect()
    }

    #[test]
    fn test_rejects_small_capacity() {
        assert!(matches!(
            PriceSeriesBuffer::new(1),
            Err(DashboardError::InvalidCapacity(1))
        ));
        assert!(PriceSeriesBuffer::new(2).is_ok());
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut buffer = PriceSeriesBuffer::new(usize::MAX).unwrap();
        assert_eq!(buffer.capacity(), usize::MAX);
        for p in [1.0, 2.0, 3.0] {
            assert!(buffer.append(PriceSample::new(p).unwrap()).is_none());
        }
        assert_eq!(contents(&buffer), vec![1.0, 2.0, 3.0]);

        assert!(PriceSeriesBuffer::new(1 << 60).is_ok());
    }

    #[test]
    fn test_length_tracks_min_of_appends_and_capacity() {
        let capacity = 4;
        let mut buffer = PriceSeriesBuffer::new(capacity).unwrap();
        for n in 1..=10 {
            buffer.append(PriceSample::new(n as f64).unwrap());
            assert_eq!(buffer.len(), n.min(capacity));

            let expected: Vec<f64> = ((n.saturating_sub(capacity) + 1)..=n).map(|v| v as f64).collect();
            assert_eq!(contents(&buffer), expected);
        }
    }

    #[test]
    fn test_append_at_capacity_evicts_oldest() {
        let mut buffer = filled(3, &[10.0, 11.0, 12.0]);
        let second = buffer.as_sequence().nth(1).unwrap().price;

        let evicted = buffer.append(PriceSample::new(13.0).unwrap());

        assert_eq!(evicted.map(|s| s.price), Some(10.0));
        assert_eq!(buffer.as_sequence().next().unwrap().price, second);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_six_into_five() {
        let buffer = filled(5, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(contents(&buffer), vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_min_max() {
        let empty = PriceSeriesBuffer::new(5).unwrap();
        assert_eq!(empty.min(), None);
        assert_eq!(empty.max(), None);

        let single = filled(5, &[42.5]);
        assert_eq!(single.min(), Some(42.5));
        assert_eq!(single.max(), Some(42.5));

        let many = filled(5, &[3.0, -1.0, 7.5, 2.0]);
        assert_eq!(many.min(), Some(-1.0));
        assert_eq!(many.max(), Some(7.5));
    }

    #[test]
    fn test_scale_bounds() {
        let buffer = filled(5, &[100.0, 101.0, 102.0]);
        assert_eq!(contents(&buffer), vec![100.0, 101.0, 102.0]);

        let bounds = buffer.scale_bounds().unwrap();
        assert_eq!(bounds.min, 100.0 * 0.9995);
        assert_eq!(bounds.max, 102.0 * 1.0005);
        assert!((bounds.min - 99.95).abs() < 1e-9);
        assert!((bounds.max - 102.051).abs() < 1e-9);
    }

    #[test]
    fn test_scale_bounds_need_two_samples() {
        let buffer = filled(5, &[100.0]);
        assert!(matches!(
            buffer.scale_bounds(),
            Err(DashboardError::EmptySeries { len: 1 })
        ));
    }
}
