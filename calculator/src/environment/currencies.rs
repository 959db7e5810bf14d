/*
 * Copyright (c) 2022, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::common::{Result, ErrorType};
use crate::environment::default_currencies;

pub use default_currencies::BASE_CURRENCY;

/// Rate feed queried by [`HttpRatesProvider`] unless configured otherwise
pub const DEFAULT_RATES_URL: &str = "https://api.frankfurter.app/latest";

/// Currencies offered by the converter, in display order
pub const CURRENCY_UNITS: [&str; 7] = ["USD", "EUR", "JPY", "GBP", "CAD", "AUD", "INR"];

/// Freshness of the rate table, shown next to the currency converter
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RateStatus {
    /// Using the last-known (or bundled) rates, nothing in flight
    #[default]
    Idle,
    Loading,
    /// The last fetch failed, the fallback rates are in use
    Failed,
}

impl Display for RateStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::Loading => write!(f, "Fetching latest rates..."),
            Self::Failed => write!(f, "Could not fetch latest rates. Using fallback data."),
        }
    }
}

/// Source of currency exchange rates relative to a base currency
pub trait RatesProvider: Send + Sync {
    /// Returns a mapping from currency code to units per one `base`
    fn fetch(&self, base: &str) -> Result<HashMap<String, f64>>;
}

/// Rates of zero, below zero or non-finite cannot be converted with
fn is_usable_rate(rate: f64) -> bool { rate.is_finite() && rate > 0.0 }

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The currency rate table used by the converter.
///
/// Without any loaded rates the bundled defaults are used. A successful
/// refresh replaces the whole table at once.
pub struct Currencies {
    rates: Mutex<Option<HashMap<String, f64>>>,
    status: Mutex<RateStatus>,
    cache_file: Option<PathBuf>,
}

impl Currencies {
    /// Bundled default rates only, nothing is cached
    pub fn none() -> Currencies {
        Currencies {
            rates: Mutex::new(None),
            status: Mutex::new(RateStatus::Idle),
            cache_file: None,
        }
    }

    pub fn with_rates(mut rates: HashMap<String, f64>) -> Currencies {
        rates.entry(BASE_CURRENCY.to_owned()).or_insert(1.0);
        Currencies {
            rates: Mutex::new(Some(rates)),
            ..Currencies::none()
        }
    }

    /// Loads the last-known rates from `cache_file` (if present), and writes
    /// successfully refreshed rates back to it.
    pub fn with_cache(cache_file: PathBuf) -> Currencies {
        let rates = caching::load(&cache_file);
        if rates.is_some() { debug!("Loaded cached currency rates from {}", cache_file.display()); }

        Currencies {
            rates: Mutex::new(rates),
            status: Mutex::new(RateStatus::Idle),
            cache_file: Some(cache_file),
        }
    }

    /// Uses the default cache location, falling back to [`Currencies::none`]
    /// when there is no cache directory on this platform.
    pub fn load_cached() -> Currencies {
        match caching::default_cache_file() {
            Some(file) => Currencies::with_cache(file),
            None => Currencies::none(),
        }
    }

    /// Loads the cached rates and starts a background refresh using `provider`
    pub fn new_with_update(provider: Arc<dyn RatesProvider>) -> Arc<Currencies> {
        let currencies = Arc::new(Currencies::load_cached());
        Currencies::update(&currencies, provider);
        currencies
    }

    /// Refreshes the rates on a background thread. The status switches to
    /// [`RateStatus::Loading`] before this returns.
    pub fn update(currencies: &Arc<Currencies>, provider: Arc<dyn RatesProvider>) -> std::thread::JoinHandle<()> {
        *lock(&currencies.status) = RateStatus::Loading;

        let currencies = currencies.clone();
        std::thread::spawn(move || {
            if let Err(e) = currencies.refresh(provider.as_ref()) {
                warn!("Failed to fetch currency rates: {e}");
            }
        })
    }

    /// Fetches new rates and replaces the table. On failure the current table
    /// stays in place and the status becomes [`RateStatus::Failed`].
    pub fn refresh(&self, provider: &dyn RatesProvider) -> Result<()> {
        *lock(&self.status) = RateStatus::Loading;

        let fetched = provider.fetch(BASE_CURRENCY)
            .map(|rates| rates.into_iter().filter(|(_, rate)| is_usable_rate(*rate)).collect::<HashMap<_, _>>());
        let mut rates = match fetched {
            Ok(rates) if !rates.is_empty() => rates,
            Ok(_) => {
                *lock(&self.status) = RateStatus::Failed;
                return Err(ErrorType::RateFetch("empty rate table".to_owned()));
            }
            Err(e) => {
                *lock(&self.status) = RateStatus::Failed;
                return Err(e);
            }
        };
        rates.insert(BASE_CURRENCY.to_owned(), 1.0);
        info!("Fetched {} currency rates", rates.len());

        if let Some(file) = &self.cache_file {
            if let Err(e) = caching::save(file, &rates) {
                warn!("Could not cache currency rates: {e}");
            }
        }

        *lock(&self.rates) = Some(rates);
        *lock(&self.status) = RateStatus::Idle;
        Ok(())
    }

    pub fn status(&self) -> RateStatus { *lock(&self.status) }

    /// Units of `code` per one base currency
    pub fn rate(&self, code: &str) -> Option<f64> {
        match &*lock(&self.rates) {
            Some(rates) => rates.get(code).copied(),
            None => default_currencies::CURRENCIES.get(code).copied(),
        }
    }

    pub fn convert(&self, src_curr: &str, dst_curr: &str, n: f64) -> Result<f64> {
        if src_curr == dst_curr { return Ok(n); }

        let unknown = || ErrorType::ConversionError(src_curr.to_owned(), dst_curr.to_owned());
        let src_rate = self.rate(src_curr).ok_or_else(unknown)?;
        let dst_rate = self.rate(dst_curr).ok_or_else(unknown)?;

        Ok(n / src_rate * dst_rate)
    }
}

mod caching {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use super::BASE_CURRENCY;

    const CURRENCIES_FILE_NAME: &str = "currencies.txt";

    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_cache_file() -> Option<PathBuf> {
        crate::common::cache_dir().map(|dir| dir.join(CURRENCIES_FILE_NAME))
    }

    #[cfg(target_arch = "wasm32")]
    pub fn default_cache_file() -> Option<PathBuf> { None }

    /// The first line holds the base currency, followed by one `CODE:rate` line per currency
    pub fn save(file: &Path, rates: &HashMap<String, f64>) -> std::io::Result<()> {
        let mut file_content = BASE_CURRENCY.to_owned();
        let mut codes = rates.keys().collect::<Vec<_>>();
        codes.sort();

        for code in codes {
            file_content.push('\n');
            file_content += code;
            file_content.push(':');
            file_content += &rates[code].to_string();
        }

        if let Some(dir) = file.parent() { std::fs::create_dir_all(dir)?; }
        std::fs::write(file, file_content)
    }

    /// Returns `None` if the file is missing, empty, or was written for another base currency
    pub fn load(file: &Path) -> Option<HashMap<String, f64>> {
        let file_contents = std::fs::read_to_string(file).ok()?;

        let mut lines = file_contents.lines();
        if lines.next()? != BASE_CURRENCY { return None; }

        let mut result = HashMap::new();
        for line in lines {
            let Some((name, num)) = line.split_once(':') else { continue; };
            let Ok(num) = num.parse::<f64>() else { continue; };
            if !super::is_usable_rate(num) { continue; }
            result.insert(name.to_owned(), num);
        }

        if result.is_empty() { None } else { Some(result) }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpRatesProvider;

#[cfg(not(target_arch = "wasm32"))]
mod http {
    use std::collections::HashMap;

    use super::{RatesProvider, DEFAULT_RATES_URL};
    use crate::common::{ErrorType, Result};

    #[derive(serde::Deserialize, Debug)]
    struct ApiResponse {
        rates: HashMap<String, f64>,
    }

    /// Fetches rates with a single `GET <url>?from=<base>`
    pub struct HttpRatesProvider {
        url: String,
    }

    impl HttpRatesProvider {
        pub fn new(url: impl Into<String>) -> HttpRatesProvider {
            HttpRatesProvider { url: url.into() }
        }
    }

    impl Default for HttpRatesProvider {
        fn default() -> Self { HttpRatesProvider::new(DEFAULT_RATES_URL) }
    }

    impl RatesProvider for HttpRatesProvider {
        fn fetch(&self, base: &str) -> Result<HashMap<String, f64>> {
            let fetch_error = |e: reqwest::Error| ErrorType::RateFetch(e.to_string());

            let ApiResponse { rates } = reqwest::blocking::Client::new()
                .get(&self.url)
                .query(&[("from", base)])
                .send()
                .and_then(|response| response.error_for_status())
                .map_err(fetch_error)?
                .json::<ApiResponse>()
                .map_err(fetch_error)?;

            Ok(rates)
        }
    }
}
