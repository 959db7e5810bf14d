/*
 * Copyright (c) 2022-2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::PathBuf;
use thiserror::Error;

const CRATE_NAME: &str = "tricalc";

/// Maximum number of characters an operand (or converter input) may hold
pub const MAX_OPERAND_LEN: usize = 16;

#[macro_export]
macro_rules! error {
    ($ty:ident) => {
        return Err(ErrorType::$ty)
    };
    ($ty:ident($($arg:expr),+)) => {
        return Err(ErrorType::$ty($($arg),+))
    };
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    // arithmetic
    #[error("Cannot divide by zero")]
    DivideByZero,

    // scientific functions
    #[error("Invalid input for {0}")]
    DomainError(&'static str),
    #[error("Calculation error")]
    CalculationError,

    // converter
    #[error("Cannot convert {0} to {1}")]
    ConversionError(String, String),

    // keypad
    #[error("Invalid input")]
    InvalidInput,

    // currency rates
    #[error("Could not fetch rates: {0}")]
    RateFetch(String),
}

pub type Result<T> = std::result::Result<T, ErrorType>;

/// Rounds `n` to `digits` significant digits, dropping floating point noise
/// such as `0.1 + 0.2 = 0.30000000000000004`.
pub fn round_significant(n: f64, digits: usize) -> f64 {
    if !n.is_finite() || n == 0.0 { return n; }
    format!("{:.*e}", digits.saturating_sub(1), n)
        .parse()
        .unwrap_or(n)
}

/// Formats a number the way it is shown on the display: the shortest
/// representation that reads back to the same value, switching to exponent
/// notation for very large and very small magnitudes.
pub fn format_number(n: f64) -> String {
    if n.is_nan() { return "NaN".to_owned(); }
    if n.is_infinite() {
        return if n.is_sign_positive() { "Infinity" } else { "-Infinity" }.to_owned();
    }
    // also covers -0
    if n == 0.0 { return "0".to_owned(); }

    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let str = format!("{n:e}");
        return match str.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
            _ => str,
        };
    }

    n.to_string()
}

/// Parses an operand string into a finite number
pub fn parse_operand(operand: &str) -> Result<f64> {
    match operand.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => error!(InvalidInput),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn cache_dir() -> Option<PathBuf> { dirs::cache_dir().map(|dir| dir.join(CRATE_NAME)) }

pub fn data_dir() -> Option<PathBuf> { dirs::data_local_dir().map(|dir| dir.join(CRATE_NAME)) }

pub mod math {
    /// Largest integer whose factorial is still a finite `f64`
    pub const MAX_FACTORIAL: u32 = 170;

    /// Iterative factorial over `f64`. `num` must not exceed [`MAX_FACTORIAL`]
    /// for the result to be finite.
    pub fn factorial(num: u32) -> f64 {
        (2..=num).fold(1.0, |acc, i| acc * i as f64)
    }
}
