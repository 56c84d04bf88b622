//! Quote and conversion record types plus the conversion calculator.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single currency's exchange rate against the base, as fetched from the
/// rate source. Becomes a [`ConversionRecord`] once an amount is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    /// Seconds since epoch, assigned at fetch time.
    pub timestamp: i64,
    pub base: String,
    pub currency: String,
    /// Units of `base` per unit of `currency`.
    pub rate: f64,
}

/// A completed conversion, ready for persistence. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversionRecord {
    pub timestamp: i64,
    pub base: String,
    pub currency: String,
    pub rate: f64,
    pub original_amount: f64,
    pub converted_amount: f64,
}

impl RateQuote {
    /// Converts `original_amount` (denominated in `base`) at this quote's
    /// rate, rounding the result to `round_digits` decimal digits.
    ///
    /// `converted_amount` is always derived here; nothing else sets it.
    pub fn convert(
        self,
        original_amount: f64,
        round_digits: u32,
    ) -> Result<ConversionRecord, Error> {
        if !(self.rate > 0.0) || !self.rate.is_finite() {
            return Err(Error::InvalidRate {
                currency: self.currency,
                rate: self.rate,
            });
        }
        if !original_amount.is_finite() || original_amount < 0.0 {
            return Err(Error::InvalidAmount(original_amount));
        }

        let converted_amount = round_to(original_amount / self.rate, round_digits);
        Ok(ConversionRecord {
            timestamp: self.timestamp,
            base: self.base,
            currency: self.currency,
            rate: self.rate,
            original_amount,
            converted_amount,
        })
    }
}

impl ConversionRecord {
    /// Cache key for this record. Descending lexicographic order over these
    /// keys matches reverse chronological order while the epoch-seconds
    /// prefix stays fixed-width.
    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.timestamp, self.currency)
    }
}

/// Rounds half away from zero to `digits` decimal digits.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(rate: f64) -> RateQuote {
        RateQuote {
            timestamp: 1549705945,
            base: "USD".to_string(),
            currency: "RUB".to_string(),
            rate,
        }
    }

    #[test]
    fn test_convert_rub_scenario() {
        let record = quote(65.4583).convert(66.1598, 5).unwrap();
        assert_eq!(record.converted_amount, 1.01072);
        assert_eq!(record.original_amount, 66.1598);
        assert_eq!(record.rate, 65.4583);
        assert_eq!(record.base, "USD");
        assert_eq!(record.currency, "RUB");
        assert_eq!(record.timestamp, 1549705945);
    }

    #[test]
    fn test_converted_amount_has_fixed_digit_count() {
        for (rate, amount) in [
            (65.4583, 66.1598),
            (0.886964, 100.0),
            (3.0, 1.0),
            (1.0, 0.0),
            (123.456, 0.00001),
        ] {
            let record = quote(rate).convert(amount, 5).unwrap();
            // Rounding is idempotent at the configured precision
            assert_eq!(
                round_to(record.converted_amount, 5),
                record.converted_amount,
                "rate {rate}, amount {amount}"
            );
            // No stray digits past the fifth decimal place
            let rendered = format!("{:.7}", record.converted_amount);
            assert!(
                rendered.ends_with("00"),
                "rate {rate}, amount {amount} -> {rendered}"
            );
        }
    }

    #[test]
    fn test_zero_rate_is_invalid() {
        let err = quote(0.0).convert(10.0, 5).unwrap_err();
        assert!(matches!(err, Error::InvalidRate { rate, .. } if rate == 0.0));
    }

    #[test]
    fn test_negative_and_nan_rates_are_invalid() {
        assert!(matches!(
            quote(-1.5).convert(10.0, 5),
            Err(Error::InvalidRate { .. })
        ));
        assert!(matches!(
            quote(f64::NAN).convert(10.0, 5),
            Err(Error::InvalidRate { .. })
        ));
        assert!(matches!(
            quote(f64::INFINITY).convert(10.0, 5),
            Err(Error::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_non_finite_or_negative_amounts_are_invalid() {
        assert!(matches!(
            quote(1.2).convert(-0.01, 5),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            quote(1.2).convert(f64::NAN, 5),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            quote(1.2).convert(f64::INFINITY, 5),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_zero_amount_converts_to_zero() {
        let record = quote(65.4583).convert(0.0, 5).unwrap();
        assert_eq!(record.converted_amount, 0.0);
    }

    #[test]
    fn test_cache_key_layout() {
        let record = quote(65.4583).convert(66.1598, 5).unwrap();
        assert_eq!(record.cache_key(), "1549705945-RUB");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.0107166, 5), 1.01072);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(1.23456789, 2), 1.23);
    }
}
