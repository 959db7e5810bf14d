/*
 * Copyright (c) 2022-2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tracing::{debug, warn};

pub use common::{data_dir, format_number, ErrorType, Result};
pub use engine::{evaluate, Operator};
pub use environment::currencies::{Currencies, RateStatus, RatesProvider, BASE_CURRENCY, CURRENCY_UNITS};
#[cfg(not(target_arch = "wasm32"))]
pub use environment::currencies::HttpRatesProvider;
pub use environment::functions::{AngleMode, Constant, ScientificFunction};
pub use environment::units::{convert, unit_label, Category};
pub use keypad::{Action, ConverterState, MemoryOp, Mode, Phase, State, Theme, HISTORY_LIMIT};
pub use settings::*;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

mod common;
mod engine;
mod environment;
mod keypad;
mod settings;
pub mod storage;

const CRASH_REPORTS_DIR: &str = "crash_reports";

/// Sets a panic hook, writing stack trace + PanicInfo to a file
pub fn install_crash_reporter() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        let current_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let contents = format!("{}\n\n{}", info, backtrace);
        eprintln!("{contents}");

        let Some(path) = data_dir().map(|dir| dir.join(CRASH_REPORTS_DIR)) else { return; };
        if std::fs::create_dir_all(&path).is_err() { return; }

        let path = path.join(format!("report_{}.txt", current_secs));
        let _ = std::fs::write(path, contents);
    }));
}

/// The keypad state together with its side-effecting collaborators:
/// the persistent [`Storage`] and the shared currency rates.
///
/// Persisted values are read once in [`Calculator::new`], every
/// [`Calculator::dispatch`] rewrites the values that changed.
pub struct Calculator {
    state: State,
    pub currencies: Arc<Currencies>,
    pub settings: Settings,
    storage: Box<dyn Storage>,
}

impl Calculator {
    pub fn new(settings: Settings, storage: Box<dyn Storage>, currencies: Arc<Currencies>) -> Calculator {
        let persisted = storage::load(storage.as_ref());

        let state = State {
            history: persisted.history,
            memory: persisted.memory,
            theme: persisted.theme.unwrap_or(settings.theme),
            angle_mode: settings.angle,
            ..State::default()
        };

        Calculator { state, currencies, settings, storage }
    }

    pub fn state(&self) -> &State { &self.state }

    pub fn dispatch(&mut self, action: Action) -> &State {
        let next = self.state.clone().reduce(&action);

        if next.history != self.state.history {
            self.persist(storage::HISTORY_KEY, &next.history);
        }
        if next.memory != self.state.memory {
            self.persist(storage::MEMORY_KEY, &next.memory);
        }
        if next.theme != self.state.theme {
            self.persist(storage::THEME_KEY, &next.theme);
        }

        self.state = next;
        &self.state
    }

    fn persist<T: serde::Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        match storage::write(self.storage.as_mut(), key, value) {
            Ok(()) => debug!("Persisted {key}"),
            Err(e) => warn!("Failed to save {key}: {e}"),
        }
    }

    /// The converted value of the converter input using the current rates
    pub fn converter_output(&self) -> Result<Option<String>> {
        self.state.converter.output(&self.currencies)
    }

    pub fn rate_status(&self) -> RateStatus { self.currencies.status() }
}
