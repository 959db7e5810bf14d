/*
 * Copyright (c) 2022-2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::f64::consts::{E, PI};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum::{EnumIter, IntoEnumIterator};

use crate::common::{*, math::{factorial, MAX_FACTORIAL}};
use crate::engine::RESULT_PRECISION;
use crate::error;
use crate::settings::ParseOptionError;

/// Below this magnitude the cosine is treated as zero, i.e. `tan` is at an asymptote
const TAN_ASYMPTOTE_EPSILON: f64 = 1e-15;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleMode {
    #[default]
    Deg,
    Rad,
}

impl AngleMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Deg => Self::Rad,
            Self::Rad => Self::Deg,
        }
    }

    fn to_radians(self, value: f64) -> f64 {
        match self {
            Self::Deg => value.to_radians(),
            Self::Rad => value,
        }
    }

    fn from_radians(self, value: f64) -> f64 {
        match self {
            Self::Deg => value.to_degrees(),
            Self::Rad => value,
        }
    }
}

impl Display for AngleMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deg => write!(f, "DEG"),
            Self::Rad => write!(f, "RAD"),
        }
    }
}

impl FromStr for AngleMode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deg" => Ok(Self::Deg),
            "rad" => Ok(Self::Rad),
            _ => Err(ParseOptionError(&["deg", "rad"])),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, serde::Serialize, serde::Deserialize)]
pub enum ScientificFunction {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    CubeRoot,
    Log,
    Ln,
    Square,
    Cube,
    Factorial,
    TenPow,
    ExpPow,
}

impl ScientificFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sqrt => "sqrt",
            Self::CubeRoot => "cube-root",
            Self::Log => "log",
            Self::Ln => "ln",
            Self::Square => "x-squared",
            Self::Cube => "x-cubed",
            Self::Factorial => "factorial",
            Self::TenPow => "10-pow-x",
            Self::ExpPow => "e-pow-x",
        }
    }

    /// The function on the same key when the 2nd-function shift is active.
    /// Keys without a second function return themselves.
    pub fn shifted(self) -> Self {
        match self {
            Self::Square => Self::Cube,
            Self::Sqrt => Self::CubeRoot,
            Self::Ln => Self::ExpPow,
            Self::Log => Self::TenPow,
            Self::Sin => Self::Asin,
            Self::Cos => Self::Acos,
            Self::Tan => Self::Atan,
            other => other,
        }
    }

    /// Applies the function to `value`. Trigonometric inputs and inverse
    /// trigonometric outputs are interpreted according to `angle_mode`.
    pub fn apply(self, value: f64, angle_mode: AngleMode) -> Result<f64> {
        let result = match self {
            Self::Sqrt => {
                if value < 0.0 { error!(DomainError(self.name())); }
                value.sqrt()
            }
            Self::Log => {
                if value <= 0.0 { error!(DomainError(self.name())); }
                value.log10()
            }
            Self::Ln => {
                if value <= 0.0 { error!(DomainError(self.name())); }
                value.ln()
            }
            Self::Square => value.powi(2),
            Self::Cube => value.powi(3),
            Self::CubeRoot => value.cbrt(),
            Self::TenPow => 10f64.powf(value),
            Self::ExpPow => value.exp(),
            Self::Factorial => {
                if value < 0.0 || value.fract() != 0.0 || value > MAX_FACTORIAL as f64 {
                    error!(DomainError(self.name()));
                }
                factorial(value as u32)
            }
            Self::Sin => angle_mode.to_radians(value).sin(),
            Self::Cos => angle_mode.to_radians(value).cos(),
            Self::Tan => {
                let rad = angle_mode.to_radians(value);
                if rad.cos().abs() < TAN_ASYMPTOTE_EPSILON { error!(DomainError(self.name())); }
                rad.tan()
            }
            Self::Asin | Self::Acos => {
                if !(-1.0..=1.0).contains(&value) { error!(DomainError(self.name())); }
                let rad = if self == Self::Asin { value.asin() } else { value.acos() };
                angle_mode.from_radians(rad)
            }
            Self::Atan => angle_mode.from_radians(value.atan()),
        };

        if !result.is_finite() { error!(CalculationError); }
        Ok(round_significant(result, RESULT_PRECISION))
    }
}

impl Display for ScientificFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScientificFunction {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let alias = match s {
            "cbrt" => Some(Self::CubeRoot),
            "sq" => Some(Self::Square),
            "cube" => Some(Self::Cube),
            "fact" | "!" => Some(Self::Factorial),
            "exp10" => Some(Self::TenPow),
            "exp" => Some(Self::ExpPow),
            _ => None,
        };
        alias.or_else(|| Self::iter().find(|f| f.name() == s)).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Constant { Pi, E }

impl Constant {
    pub fn value(&self) -> f64 {
        match self {
            Self::Pi => PI,
            Self::E => E,
        }
    }
}
