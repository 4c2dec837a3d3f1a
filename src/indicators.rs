use ta::Next;
use ta::indicators::SimpleMovingAverage;

pub const MA_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;

/// RSI reported when there is not enough history, or when price never moved.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Simple moving average of the last `period` closes.
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let mut sma_indicator = SimpleMovingAverage::new(period).ok()?;

    let mut last_sma = None;
    for &price in &closes[closes.len() - period..] {
        last_sma = Some(sma_indicator.next(price));
    }
    last_sma
}

/// Wilder-smoothed Relative Strength Index over `closes`, always in `[0, 100]`.
///
/// Short series (fewer than `period + 1` closes) get [`NEUTRAL_RSI`]. A series
/// that never lost goes to 100, except a series that never moved at all, which
/// also reports [`NEUTRAL_RSI`].
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let n = period as f64;
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|&c| c.max(0.0)).sum::<f64>() / n;
    let mut avg_loss = changes[..period].iter().map(|&c| (-c).max(0.0)).sum::<f64>() / n;

    for &c in &changes[period..] {
        avg_gain = (avg_gain * (n - 1.0) + c.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-c).max(0.0)) / n;
    }

    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { NEUTRAL_RSI } else { 100.0 };
    }

    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(from: f64, len: usize, step: f64) -> Vec<f64> {
        (0..len).map(|i| from + i as f64 * step).collect()
    }

    #[test]
    fn sma_of_one_to_twenty() {
        let closes = ramp(1.0, 20, 1.0);
        let value = sma(&closes, MA_PERIOD).unwrap();
        assert!((value - 10.5).abs() < 1e-9);
    }

    #[test]
    fn sma_uses_only_the_trailing_window() {
        let closes = ramp(1.0, 25, 1.0); // last 20 are 6..=25
        let value = sma(&closes, MA_PERIOD).unwrap();
        assert!((value - 15.5).abs() < 1e-9);
    }

    #[test]
    fn sma_needs_a_full_window() {
        assert_eq!(sma(&ramp(1.0, 19, 1.0), MA_PERIOD), None);
        assert_eq!(sma(&[], MA_PERIOD), None);
        assert_eq!(sma(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn rsi_rising_series_is_100() {
        assert_eq!(rsi(&ramp(100.0, 15, 1.0), RSI_PERIOD), 100.0);
        assert_eq!(rsi(&ramp(100.0, 40, 0.5), RSI_PERIOD), 100.0);
    }

    #[test]
    fn rsi_falling_series_is_0() {
        let value = rsi(&ramp(200.0, 30, -1.0), RSI_PERIOD);
        assert!(value.abs() < 1e-9, "expected 0, got {value}");
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        // exactly period + 1 identical closes: no movement, not "no losses"
        assert_eq!(rsi(&[42.0; 15], RSI_PERIOD), NEUTRAL_RSI);
        assert_eq!(rsi(&[42.0; 60], RSI_PERIOD), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_short_series_is_neutral() {
        assert_eq!(rsi(&ramp(1.0, 14, 1.0), RSI_PERIOD), NEUTRAL_RSI);
        assert_eq!(rsi(&[], RSI_PERIOD), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_stays_in_bounds_on_choppy_data() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + ((i * 37) % 11) as f64 - 5.0 + (i as f64 * 0.1).sin() * 3.0)
            .collect();
        for end in 0..closes.len() {
            let value = rsi(&closes[..end], RSI_PERIOD);
            assert!((0.0..=100.0).contains(&value), "rsi out of bounds: {value}");
        }
    }

    #[test]
    fn rsi_matches_hand_computed_wilder_value() {
        // 14 deltas of +1 and -1 alternating give avg gain 0.5 and avg loss 0.5,
        // then one more +2 delta: gain = (0.5*13+2)/14, loss = 0.5*13/14
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
        }
        let last = *closes.last().unwrap();
        closes.push(last + 2.0);

        let gain = (0.5 * 13.0 + 2.0) / 14.0;
        let loss = 0.5 * 13.0 / 14.0;
        let expected = 100.0 - 100.0 / (1.0 + gain / loss);
        assert!((rsi(&closes, RSI_PERIOD) - expected).abs() < 1e-9);
    }
}
