/*
 * Copyright (c) 2022, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::common::*;
use crate::error;

/// Significant digits kept for arithmetic and scientific results
pub const RESULT_PRECISION: usize = 15;

#[derive(PartialEq, Eq, Debug, Copy, Clone, serde::Serialize, serde::Deserialize)]
pub enum Operator { Plus, Minus, Multiply, Divide }

impl Operator {
    pub fn symbol(&self) -> char {
        match self {
            Operator::Plus => '+',
            Operator::Minus => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }

    pub fn apply(&self, lhs: f64, rhs: f64) -> Result<f64> {
        Ok(match self {
            Operator::Plus => lhs + rhs,
            Operator::Minus => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => {
                if rhs == 0.0 { error!(DivideByZero); }
                lhs / rhs
            }
        })
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operator::Plus),
            "-" => Ok(Operator::Minus),
            "*" | "x" | "×" => Ok(Operator::Multiply),
            "/" | "÷" => Ok(Operator::Divide),
            _ => Err(()),
        }
    }
}

/// Applies the pending `operator` to `previous` and `current`.
///
/// A missing previous operand counts as zero; without an operator the current
/// operand is returned unchanged. Results are rounded to
/// [`RESULT_PRECISION`] significant digits.
pub fn evaluate(previous: Option<&str>, operator: Option<Operator>, current: &str) -> Result<String> {
    let Some(operator) = operator else { return Ok(current.to_owned()); };

    let lhs = parse_operand(previous.unwrap_or("0"))?;
    let rhs = parse_operand(current)?;

    let result = operator.apply(lhs, rhs)?;
    if !result.is_finite() { error!(CalculationError); }

    Ok(format_number(round_significant(result, RESULT_PRECISION)))
}
