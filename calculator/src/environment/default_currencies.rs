/*
 * Copyright (c) 2022-2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

// Rates bundled with the binary, used until (or unless) fresh rates are fetched

use phf::{Map, phf_map};

pub const BASE_CURRENCY: &str = "USD";

pub static CURRENCIES: Map<&'static str, f64> = phf_map! {
    "USD" => 1.0,
    "EUR" => 0.93,
    "JPY" => 157.0,
    "GBP" => 0.79,
    "CAD" => 1.37,
    "AUD" => 1.51,
    "INR" => 83.5,
};
