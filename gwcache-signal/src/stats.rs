use gwcache_core::models::Statistic;

///
/// Running summary of a step-function signal over one window.
///
/// Segments are added with their length; whatever part of the window no
/// segment covers counts as signal 0 when the statistics are read.
///
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    width: u64,
    covered: u64,
    nonzero: u64,
    sum: f64,
    sum_sq: f64,
    max: f64,
    min: f64,
}

impl WindowAccumulator {
    pub fn new(width: u64) -> Self {
        WindowAccumulator {
            width,
            covered: 0,
            nonzero: 0,
            sum: 0.0,
            sum_sq: 0.0,
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        }
    }

    /// Add `length` bases of constant `value`.
    pub fn add(&mut self, value: f64, length: u64) {
        if length == 0 {
            return;
        }
        let weight = length as f64;
        self.covered += length;
        if value != 0.0 {
            self.nonzero += length;
        }
        self.sum += value * weight;
        self.sum_sq += value * value * weight;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
    }

    fn has_gap(&self) -> bool {
        self.covered < self.width
    }

    pub fn mean(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        self.sum / self.width as f64
    }

    pub fn max(&self) -> f64 {
        match (self.covered, self.has_gap()) {
            (0, _) => 0.0,
            (_, true) => self.max.max(0.0),
            (_, false) => self.max,
        }
    }

    pub fn min(&self) -> f64 {
        match (self.covered, self.has_gap()) {
            (0, _) => 0.0,
            (_, true) => self.min.min(0.0),
            (_, false) => self.min,
        }
    }

    /// Population standard deviation over every base of the window.
    pub fn std(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self.sum_sq / self.width as f64 - mean * mean;
        // rounding can push a zero variance slightly negative
        variance.max(0.0).sqrt()
    }

    /// Fraction of the window's bases with non-zero signal.
    pub fn coverage(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        self.nonzero as f64 / self.width as f64
    }

    pub fn value(&self, statistic: Statistic) -> f64 {
        match statistic {
            Statistic::Mean => self.mean(),
            Statistic::Max => self.max(),
            Statistic::Min => self.min(),
            Statistic::Std => self.std(),
            Statistic::Coverage => self.coverage(),
        }
    }
}
