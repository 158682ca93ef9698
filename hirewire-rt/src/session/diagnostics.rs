//! Rolling connection-quality window

use std::collections::VecDeque;

/// Samples kept for the jitter average
pub const JITTER_WINDOW: usize = 12;

/// Fixed-size rolling average
#[derive(Debug, Clone)]
pub struct RollingAverage {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingAverage {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Add a sample and return the new average; non-finite samples are ignored
    pub fn push(&mut self, sample: f64) -> Option<f64> {
        if sample.is_finite() && sample >= 0.0 {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
        self.average()
    }

    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for RollingAverage {
    fn default() -> Self {
        Self::new(JITTER_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_window() {
        let mut avg = RollingAverage::new(2);
        assert_eq!(avg.push(10.0), Some(10.0));
        assert_eq!(avg.push(20.0), Some(15.0));
        assert_eq!(avg.push(40.0), Some(30.0));
        assert_eq!(avg.len(), 2);
    }

    #[test]
    fn ignores_invalid_samples() {
        let mut avg = RollingAverage::default();
        assert_eq!(avg.push(f64::NAN), None);
        assert_eq!(avg.push(-1.0), None);
        assert!(avg.is_empty());
    }
}
