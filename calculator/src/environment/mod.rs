/*
 * Copyright (c) 2022-2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

//! Everything the keypad can compute with: scientific functions and
//! constants, conversion categories and their units, and currency rates.

pub mod currencies;
pub mod functions;
pub mod units;

mod default_currencies;
