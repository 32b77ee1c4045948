//! Batch indicators used by the generators.

/// Batch indicator over a price slice.
pub trait Indicator: Send + Sync {
    /// Calculate indicator values for the given data. The first value
    /// corresponds to `data[period() - 1]`; too little data yields an empty vec.
    fn calculate(&self, data: &[f64]) -> Vec<f64>;

    /// Get the minimum data points required.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Latest value, if enough data is available.
    fn latest(&self, data: &[f64]) -> Option<f64> {
        self.calculate(data).last().copied()
    }
}

/// Exponential Moving Average (EMA), seeded with the SMA of the first window.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
}

impl Ema {
    /// Create a new EMA. A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self { period, multiplier }
    }
}

impl Indicator for Ema {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let mut result = Vec::with_capacity(data.len() - self.period + 1);

        let mut ema: f64 = data[..self.period].iter().sum::<f64>() / self.period as f64;
        result.push(ema);

        let one_minus_mult = 1.0 - self.multiplier;
        for &price in &data[self.period..] {
            ema = price * self.multiplier + ema * one_minus_mult;
            result.push(ema);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

/// Relative Strength Index (RSI) with Wilder's smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Create a new RSI. A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
        if values.len() < period {
            return vec![];
        }

        let period_f64 = period as f64;
        let mut avg: f64 = values[..period].iter().sum::<f64>() / period_f64;
        let mut result = Vec::with_capacity(values.len() - period + 1);
        result.push(avg);

        for &value in &values[period..] {
            avg = (avg * (period_f64 - 1.0) + value) / period_f64;
            result.push(avg);
        }

        result
    }
}

impl Indicator for Rsi {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        let avg_gains = Self::wilder_smooth(&gains, self.period);
        let avg_losses = Self::wilder_smooth(&losses, self.period);

        avg_gains
            .iter()
            .zip(avg_losses.iter())
            .map(|(&gain, &loss)| {
                if loss == 0.0 {
                    100.0
                } else {
                    100.0 - (100.0 / (1.0 + gain / loss))
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_constant_series() {
        let ema = Ema::new(3);
        let values = ema.calculate(&[5.0; 6]);
        assert_eq!(values.len(), 4);
        assert!(values.iter().all(|v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_ema_tracks_trend() {
        let data: Vec<f64> = (1..=20).map(f64::from).collect();
        let fast = Ema::new(3).latest(&data).unwrap();
        let slow = Ema::new(10).latest(&data).unwrap();
        assert!(fast > slow);
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(Rsi::new(14).latest(&rising), Some(100.0));

        let falling: Vec<f64> = (1..=20).rev().map(f64::from).collect();
        assert_eq!(Rsi::new(14).latest(&falling), Some(0.0));
    }

    #[test]
    fn test_insufficient_data() {
        assert!(Rsi::new(14).calculate(&[1.0; 14]).is_empty());
        assert!(Ema::new(5).calculate(&[1.0; 4]).is_empty());
    }
}
