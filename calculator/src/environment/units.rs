/*
 * Copyright (c) 2022-2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum::{EnumIter, IntoEnumIterator};

use crate::common::*;
use crate::environment::currencies::{Currencies, CURRENCY_UNITS};
use crate::error;
use crate::settings::ParseOptionError;

/// Significant digits kept for conversion results
pub const CONVERSION_PRECISION: usize = 12;

// Factors relative to the first (base) unit of each category
const LENGTH_FACTORS: [(&str, f64); 5] = [
    ("Meter", 1.0), ("Kilometer", 0.001), ("Mile", 0.000621371), ("Foot", 3.28084), ("Inch", 39.3701),
];
const MASS_FACTORS: [(&str, f64); 4] = [
    ("Kilogram", 1.0), ("Gram", 1000.0), ("Pound", 2.20462), ("Ounce", 35.274),
];

const LENGTH_UNITS: [&str; 5] = ["Meter", "Kilometer", "Mile", "Foot", "Inch"];
const MASS_UNITS: [&str; 4] = ["Kilogram", "Gram", "Pound", "Ounce"];
const TEMPERATURE_UNITS: [&str; 3] = ["Celsius", "Fahrenheit", "Kelvin"];

const CURRENCY_SYMBOLS: [(&str, &str); 7] = [
    ("USD", "$"), ("EUR", "€"), ("JPY", "¥"), ("GBP", "£"), ("CAD", "CA$"), ("AUD", "AU$"), ("INR", "₹"),
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIter, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Currency,
    Length,
    Mass,
    Temperature,
}

impl Category {
    /// The units of this category in display order. The first unit is the base unit
    /// for factor based categories.
    pub fn units(&self) -> &'static [&'static str] {
        match self {
            Self::Currency => &CURRENCY_UNITS,
            Self::Length => &LENGTH_UNITS,
            Self::Mass => &MASS_UNITS,
            Self::Temperature => &TEMPERATURE_UNITS,
        }
    }

    pub fn contains(&self, unit: &str) -> bool { self.units().contains(&unit) }

    /// The default `(from, to)` pair selected when switching to this category
    pub fn default_units(&self) -> (&'static str, &'static str) {
        let units = self.units();
        (units[0], *units.get(1).unwrap_or(&units[0]))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Currency => write!(f, "currency"),
            Self::Length => write!(f, "length"),
            Self::Mass => write!(f, "mass"),
            Self::Temperature => write!(f, "temperature"),
        }
    }
}

impl FromStr for Category {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Self::iter()
            .find(|category| category.to_string() == s)
            .ok_or(ParseOptionError(&["currency", "length", "mass", "temperature"]))
    }
}

/// Label shown for a unit in a selector, e.g. `EUR (€)` for currencies
pub fn unit_label(category: Category, unit: &str) -> String {
    if category != Category::Currency { return unit.to_owned(); }
    match CURRENCY_SYMBOLS.iter().find(|(code, _)| *code == unit) {
        Some((code, symbol)) => format!("{code} ({symbol})"),
        None => unit.to_owned(),
    }
}

fn factor(factors: &[(&str, f64)], unit: &str) -> Option<f64> {
    factors.iter().find(|(name, _)| *name == unit).map(|(_, f)| *f)
}

fn to_celsius(unit: &str, n: f64) -> Option<f64> {
    match unit {
        "Celsius" => Some(n),
        "Fahrenheit" => Some((n - 32.0) * 5.0 / 9.0),
        "Kelvin" => Some(n - 273.15),
        _ => None,
    }
}

fn from_celsius(unit: &str, n: f64) -> Option<f64> {
    match unit {
        "Celsius" => Some(n),
        "Fahrenheit" => Some(n * 9.0 / 5.0 + 32.0),
        "Kelvin" => Some(n + 273.15),
        _ => None,
    }
}

/// Converts `n` from `src_unit` to `dst_unit` within `category`.
///
/// Factor based categories go through the base unit (`n / src_factor * dst_factor`),
/// temperatures through Celsius. Currency factors are looked up in `currencies`.
/// The result is rounded to [`CONVERSION_PRECISION`] significant digits.
pub fn convert(category: Category, src_unit: &str, dst_unit: &str, n: f64, currencies: &Currencies) -> Result<f64> {
    if src_unit == dst_unit { return Ok(n); }

    let unknown = || ErrorType::ConversionError(src_unit.to_owned(), dst_unit.to_owned());

    let result = match category {
        Category::Temperature => {
            let celsius = to_celsius(src_unit, n).ok_or_else(unknown)?;
            from_celsius(dst_unit, celsius).ok_or_else(unknown)?
        }
        Category::Currency => currencies.convert(src_unit, dst_unit, n)?,
        Category::Length | Category::Mass => {
            let factors: &[(&str, f64)] = if category == Category::Length { &LENGTH_FACTORS } else { &MASS_FACTORS };
            let src_factor = factor(factors, src_unit).ok_or_else(unknown)?;
            let dst_factor = factor(factors, dst_unit).ok_or_else(unknown)?;
            n / src_factor * dst_factor
        }
    };

    if !result.is_finite() { error!(CalculationError); }
    Ok(round_significant(result, CONVERSION_PRECISION))
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! expect {
        ($category:ident: $n:literal $src:literal -> $dst:literal, $res:expr) => {
            assert_eq!(convert(Category::$category, $src, $dst, $n, &Currencies::none())?, $res)
        };
    }

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = expected.abs().max(1.0) * 1e-9;
        assert!((actual - expected).abs() <= tolerance, "{actual} is not close to {expected}");
    }

    #[test]
    fn temperatures() -> Result<()> {
        expect!(Temperature: 0.0 "Celsius" -> "Fahrenheit", 32.0);
        expect!(Temperature: 100.0 "Celsius" -> "Kelvin", 373.15);
        expect!(Temperature: 212.0 "Fahrenheit" -> "Celsius", 100.0);
        expect!(Temperature: 0.0 "Kelvin" -> "Celsius", -273.15);
        expect!(Temperature: -40.0 "Fahrenheit" -> "Celsius", -40.0);
        Ok(())
    }

    #[test]
    fn scale_factors() -> Result<()> {
        expect!(Length: 1.0 "Kilometer" -> "Meter", 1000.0);
        expect!(Length: 1.0 "Meter" -> "Foot", 3.28084);
        expect!(Mass: 1.0 "Kilogram" -> "Gram", 1000.0);
        expect!(Mass: 500.0 "Gram" -> "Kilogram", 0.5);
        Ok(())
    }

    #[test]
    fn currencies() -> Result<()> {
        expect!(Currency: 1.0 "USD" -> "EUR", 0.93);
        expect!(Currency: 157.0 "JPY" -> "USD", 1.0);
        expect!(Currency: 93.0 "EUR" -> "GBP", 79.0);
        Ok(())
    }

    #[test]
    fn same_unit() -> Result<()> {
        expect!(Length: 12.345678901234567 "Mile" -> "Mile", 12.345678901234567);
        // even an unknown unit converts to itself
        expect!(Mass: 3.0 "Stone" -> "Stone", 3.0);
        Ok(())
    }

    #[test]
    fn unknown_units() {
        let currencies = Currencies::none();
        for category in Category::iter() {
            match convert(category, "Furlong", category.units()[0], 1.0, &currencies) {
                Err(ErrorType::ConversionError(src, dst)) => {
                    assert_eq!(src, "Furlong");
                    assert_eq!(dst, category.units()[0]);
                }
                res => panic!("Expected a conversion error for {category}, got {res:?}"),
            }
        }
    }

    #[test]
    fn round_trips() -> Result<()> {
        let currencies = Currencies::none();
        for category in Category::iter() {
            for src in category.units() {
                for dst in category.units() {
                    for x in [0.0, 1.0, 42.5, -17.25, 1234.5678] {
                        let there = convert(category, src, dst, x, &currencies)?;
                        let back = convert(category, dst, src, there, &currencies)?;
                        assert_close(back, x);
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn labels() {
        assert_eq!(unit_label(Category::Currency, "EUR"), "EUR (€)");
        assert_eq!(unit_label(Category::Currency, "CAD"), "CAD (CA$)");
        assert_eq!(unit_label(Category::Length, "Foot"), "Foot");
    }

    #[test]
    fn categories() {
        assert_eq!(Category::Temperature.default_units(), ("Celsius", "Fahrenheit"));
        assert_eq!("Mass".parse::<Category>().ok(), Some(Category::Mass));
        assert_eq!(Category::Temperature.to_string(), "temperature");
        for category in Category::iter() {
            assert_eq!(category.to_string().parse::<Category>().ok(), Some(category));
        }
        assert!("volume".parse::<Category>().is_err());
        assert!(Category::Currency.contains("INR"));
    }
}
