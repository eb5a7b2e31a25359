//! Fixed-point number parsing
//!
//! Matched tokens are parsed straight into `Decimal`; binary floating point is
//! never involved. A token that is not a plain decimal (`9.9.5`, `9,95`) is an
//! error, never a zero.

use efl_common::money::cents_to_dollars;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Regex fragment for a numeric token, including malformed ones the parser
/// should reject (`9.9.5`, `9,95`) rather than truncate.
pub const NUMBER: &str = r"(?:\d[\d.,]*\d|\d|\.\d+)";

/// Regex fragment for a kWh quantity
pub const KWH: &str = r"\d+(?:\.\d+)?";

/// A matched token that is not a valid number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberError {
    pub token: String,
}

/// Parse a plain decimal token
pub fn parse_decimal(token: &str) -> Result<Decimal, NumberError> {
    let malformed = token.is_empty()
        || token.matches('.').count() > 1
        || !token.chars().all(|c| c.is_ascii_digit() || c == '.');
    if malformed {
        return Err(NumberError {
            token: token.to_string(),
        });
    }

    let padded;
    let digits = if token.starts_with('.') {
        padded = format!("0{}", token);
        padded.as_str()
    } else {
        token
    };

    Decimal::from_str(digits).map_err(|_| NumberError {
        token: token.to_string(),
    })
}

/// Parse a dollar amount; a cents token is divided by 100
pub fn parse_amount(token: &str, in_cents: bool) -> Result<Decimal, NumberError> {
    let value = parse_decimal(token)?;
    Ok(if in_cents {
        cents_to_dollars(value)
    } else {
        value
    })
}

/// How a per-kWh rate was written next to its number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Dollars,
    Cents,
    /// Neither `$` nor `¢`, as when PDF text extraction drops the glyph
    Bare,
}

/// Parse a per-kWh rate
///
/// A bare rate above $1/kWh is not a plausible retail price, so it is read
/// as cents.
pub fn parse_rate(token: &str, unit: RateUnit) -> Result<Decimal, NumberError> {
    let value = parse_decimal(token)?;
    let in_cents = match unit {
        RateUnit::Dollars => false,
        RateUnit::Cents => true,
        RateUnit::Bare => value > Decimal::ONE,
    };
    Ok(if in_cents {
        cents_to_dollars(value)
    } else {
        value
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_plain() {
        assert_eq!(parse_decimal("9.95").unwrap(), dec!(9.95));
        assert_eq!(parse_decimal(".0389").unwrap(), dec!(0.0389));
        assert_eq!(parse_decimal("1000").unwrap(), dec!(1000));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(
            parse_decimal("9.9.5").unwrap_err().token,
            "9.9.5".to_string()
        );
        assert!(parse_decimal("9,95").is_err());
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("-3").is_err());
    }

    #[test]
    fn test_cents() {
        assert_eq!(parse_amount("9.5", true).unwrap(), dec!(0.095));
        assert_eq!(parse_amount("9.5", false).unwrap(), dec!(9.5));
    }

    #[test]
    fn test_bare_rate_above_one_is_cents() {
        assert_eq!(parse_rate("12.5", RateUnit::Bare).unwrap(), dec!(0.125));
        assert_eq!(parse_rate("0.125", RateUnit::Bare).unwrap(), dec!(0.125));
        assert_eq!(parse_rate("1", RateUnit::Bare).unwrap(), dec!(1));
        assert_eq!(parse_rate("12.5", RateUnit::Dollars).unwrap(), dec!(12.5));
        assert_eq!(parse_rate("0.5", RateUnit::Cents).unwrap(), dec!(0.005));
    }
}
