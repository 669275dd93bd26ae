//! Rolling Sharpe accumulator.
//!
//! Fixed-size circular buffer with a sliding Welford mean/M2. Each push is
//! O(1); once per full window the moments are recomputed exactly from the
//! buffer so rounding drift cannot accumulate across a long series.

/// Minimum standard deviation for a non-zero Sharpe.
pub const MIN_STD_DEV: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct RollingSharpe {
    window: usize,
    buf: Vec<f64>,
    /// Index of the oldest sample once the buffer is full.
    head: usize,
    mean: f64,
    m2: f64,
}

impl RollingSharpe {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "rolling window must be >= 1");
        Self {
            window,
            buf: Vec::with_capacity(window),
            head: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True once `window` samples have been seen.
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.window
    }

    pub fn push(&mut self, x: f64) {
        if self.buf.len() < self.window {
            self.buf.push(x);
            let n = self.buf.len() as f64;
            let delta = x - self.mean;
            self.mean += delta / n;
            self.m2 += delta * (x - self.mean);
            return;
        }

        let old = self.buf[self.head];
        self.buf[self.head] = x;
        self.head = (self.head + 1) % self.window;

        if self.head == 0 {
            self.recompute();
        } else {
            let old_mean = self.mean;
            self.mean += (x - old) / self.window as f64;
            self.m2 += (x - old) * (x - self.mean + old - old_mean);
            if self.m2 < 0.0 {
                self.m2 = 0.0;
            }
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation of the buffered samples.
    pub fn std_dev(&self) -> f64 {
        if self.buf.is_empty() {
            return 0.0;
        }
        (self.m2 / self.buf.len() as f64).sqrt()
    }

    /// Annualized Sharpe over the window, or 0 until the window is full or
    /// when the deviation is below `MIN_STD_DEV`.
    pub fn sharpe(&self, periods_per_year: f64) -> f64 {
        if !self.is_full() {
            return 0.0;
        }
        let std = self.std_dev();
        if std > MIN_STD_DEV {
            (self.mean / std) * periods_per_year.sqrt()
        } else {
            0.0
        }
    }

    fn recompute(&mut self) {
        let n = self.buf.len() as f64;
        self.mean = self.buf.iter().sum::<f64>() / n;
        self.m2 = self
            .buf
            .iter()
            .map(|x| (x - self.mean) * (x - self.mean))
            .sum();
    }
}
