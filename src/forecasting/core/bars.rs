//! Price bars and their normalized observation encoding.
//!
//! Purpose
//! -------
//! Turn raw daily OHLC bars into the scale-free triples the sequence model is
//! trained and scored on, and convert a chosen triple back into prices.
//!
//! Key behaviors
//! -------------
//! - [`encode_bars`] validates every bar and applies, relative to the bar's
//!   own open:
//!   `frac_change = (close − open)/open`, `frac_high = (high − open)/open`,
//!   `frac_low = (open − low)/open`.
//! - [`Observation::implied_close`] maps a fractional change back to a price,
//!   and [`Observation::decode`] rebuilds a whole bar from an open.
//!
//! Invariants & assumptions
//! ------------------------
//! - `open > 0` and all fields finite; violations are reported with the
//!   offending index instead of leaking NaN/∞ downstream.
//! - `frac_high ≥ 0` and `frac_low ≥ 0` hold for well-formed bars
//!   (`high ≥ open ≥ low`) but are not enforced, matching the data as
//!   delivered by the source.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the formulas, the decode round-trip, and each
//!   validation failure.
use crate::forecasting::errors::{ForecastError, ForecastResult};

/// One trading period of prices, in chronological order within a series.
///
/// `date` is carried through from sources that provide one (ISO
/// `YYYY-MM-DD`) and is not used by the forecasting math.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: Option<String>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        PriceBar { date: None, open, high, low, close }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// Normalized observation `(frac_change, frac_high, frac_low)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub frac_change: f64,
    pub frac_high: f64,
    pub frac_low: f64,
}

impl Observation {
    pub const DIM: usize = 3;

    pub fn new(frac_change: f64, frac_high: f64, frac_low: f64) -> Self {
        Observation { frac_change, frac_high, frac_low }
    }

    /// Components in model order `[change, high, low]`.
    #[inline]
    pub fn as_array(&self) -> [f64; Observation::DIM] {
        [self.frac_change, self.frac_high, self.frac_low]
    }

    /// `frac_change · open + open`.
    #[inline]
    pub fn implied_close(&self, open: f64) -> f64 {
        self.frac_change * open + open
    }

    /// Rebuild the bar this observation was encoded from, given its open.
    pub fn decode(&self, open: f64) -> PriceBar {
        PriceBar::new(
            open,
            open + self.frac_high * open,
            open - self.frac_low * open,
            self.implied_close(open),
        )
    }
}

/// Encode a chronological series of bars into observations.
///
/// # Errors
/// - [`ForecastError::EmptySeries`] if `bars` is empty.
/// - [`ForecastError::NonFiniteBar`] for the first NaN/±inf field.
/// - [`ForecastError::NonPositiveOpen`] for the first bar with `open ≤ 0`.
pub fn encode_bars(bars: &[PriceBar]) -> ForecastResult<Vec<Observation>> {
    if bars.is_empty() {
        return Err(ForecastError::EmptySeries);
    }
    bars.iter().enumerate().map(|(index, bar)| encode_bar(index, bar)).collect()
}

fn encode_bar(index: usize, bar: &PriceBar) -> ForecastResult<Observation> {
    for (field, value) in
        [("open", bar.open), ("high", bar.high), ("low", bar.low), ("close", bar.close)]
    {
        if !value.is_finite() {
            return Err(ForecastError::NonFiniteBar { index, field, value });
        }
    }
    if bar.open <= 0.0 {
        return Err(ForecastError::NonPositiveOpen { index, value: bar.open });
    }
    let open = bar.open;
    Ok(Observation {
        frac_change: (bar.close - open) / open,
        frac_high: (bar.high - open) / open,
        frac_low: (open - bar.low) / open,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // Check the three fractional formulas on a hand-computed bar.
    //
    // Given
    // -----
    // - open 100, high 104, low 97, close 102.
    //
    // Expect
    // ------
    // - (0.02, 0.04, 0.03).
    fn encode_bars_applies_fractional_formulas() {
        let bars = vec![PriceBar::new(100.0, 104.0, 97.0, 102.0)];

        let obs = encode_bars(&bars).expect("valid bars");

        assert_eq!(obs.len(), 1);
        assert_relative_eq!(obs[0].frac_change, 0.02, epsilon = 1e-12);
        assert_relative_eq!(obs[0].frac_high, 0.04, epsilon = 1e-12);
        assert_relative_eq!(obs[0].frac_low, 0.03, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Decoding an encoded bar with its own open reproduces high/low/close.
    fn decode_round_trips_encoded_bar() {
        let bars = vec![
            PriceBar::new(52.3, 53.9, 51.0, 53.1),
            PriceBar::new(210.0, 212.5, 199.25, 200.0),
        ];

        let obs = encode_bars(&bars).expect("valid bars");

        for (bar, o) in bars.iter().zip(&obs) {
            let back = o.decode(bar.open);
            assert_relative_eq!(back.high, bar.high, epsilon = 1e-9);
            assert_relative_eq!(back.low, bar.low, epsilon = 1e-9);
            assert_relative_eq!(back.close, bar.close, epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // A zero open must be reported, not turned into ±inf.
    //
    // Expect
    // ------
    // - `NonPositiveOpen` at the offending index.
    fn encode_bars_rejects_non_positive_open() {
        let bars = vec![PriceBar::new(10.0, 11.0, 9.0, 10.5), PriceBar::new(0.0, 1.0, 0.0, 0.5)];

        let err = encode_bars(&bars).unwrap_err();

        assert_eq!(err, ForecastError::NonPositiveOpen { index: 1, value: 0.0 });
    }

    #[test]
    fn encode_bars_rejects_non_finite_field_and_empty_input() {
        let bars = vec![PriceBar::new(10.0, f64::NAN, 9.0, 10.5)];

        let err = encode_bars(&bars).unwrap_err();

        assert!(matches!(err, ForecastError::NonFiniteBar { index: 0, field: "high", .. }));
        assert_eq!(encode_bars(&[]).unwrap_err(), ForecastError::EmptySeries);
    }

    #[test]
    fn implied_close_scales_reference_price() {
        let o = Observation::new(0.048, 0.03, 0.0);

        assert_relative_eq!(o.implied_close(100.0), 104.8, epsilon = 1e-12);
    }
}
