/// Simple moving average over a ring buffer, O(1) per push.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: Vec<f64>,
    head: usize,
    filled: usize,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be > 0");
        Self {
            period,
            window: vec![0.0; period],
            head: 0,
            filled: 0,
            sum: 0.0,
        }
    }

    /// Push a new price; returns the average once the window is full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.filled == self.period {
            self.sum -= self.window[self.head];
        } else {
            self.filled += 1;
        }
        self.window[self.head] = value;
        self.sum += value;
        self.head = (self.head + 1) % self.period;
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.filled == self.period {
            Some(self.sum / self.period as f64)
        } else {
            None
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}
