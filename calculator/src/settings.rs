/*
 * Copyright (c) 2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::common::data_dir;
use crate::environment::currencies::DEFAULT_RATES_URL;
use crate::environment::functions::AngleMode;
use crate::keypad::Theme;

const SETTINGS_FILE_NAME: &str = "settings.ron";

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Invalid setting. Options: {0:?}")]
    InvalidPath(&'static [&'static str]),
    #[error("Error: {0}")]
    Error(Box<dyn Error + Send + Sync>),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not access the settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not write the settings: {0}")]
    Serialize(#[from] ron::Error),
    #[error("There is no data directory on this platform")]
    NoDataDir,
}

/// Error returned when parsing one of a fixed set of options fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptionError(pub &'static [&'static str]);

impl Error for ParseOptionError {}

impl Display for ParseOptionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid input. Options: {:?}", self.0)
    }
}

/// Parses the value of a leaf setting. A leaf has no sub-settings, so `rest` must be empty.
fn parse_leaf<T>(rest: &[&str], value: &str, keys: &'static [&'static str]) -> Result<T, AccessError>
    where T: FromStr, T::Err: Error + Send + Sync + 'static {
    if !rest.is_empty() { return Err(AccessError::InvalidPath(keys)); }
    value.parse::<T>().map_err(|e| AccessError::Error(Box::new(e)))
}

/// Declares a settings struct readable and writable by dotted path, e.g. `rates.fetch`.
/// `[group]` fields are nested settings structs, every other field is a leaf
/// read with `Display` and written with `FromStr`.
macro_rules! settable {
    ($name:ident {
        $([group] $group:ident: $group_ty:ty,)*
        $($leaf:ident: $leaf_ty:ty,)+
    }) => {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(pub $group: $group_ty,)*
            $(pub $leaf: $leaf_ty,)+
        }

        impl $name {
            const KEYS: &'static [&'static str] = &[$(stringify!($group),)* $(stringify!($leaf),)+];

            pub fn set(&mut self, path: &[&str], value: &str) -> Result<(), AccessError> {
                let (key, rest) = path.split_first().ok_or(AccessError::InvalidPath(Self::KEYS))?;
                $(if *key == stringify!($group) { return self.$group.set(rest, value); })*
                $(if *key == stringify!($leaf) {
                    self.$leaf = parse_leaf(rest, value, Self::KEYS)?;
                    return Ok(());
                })+
                Err(AccessError::InvalidPath(Self::KEYS))
            }

            pub fn get(&self, path: &[&str]) -> Result<String, AccessError> {
                let (key, rest) = path.split_first().ok_or(AccessError::InvalidPath(Self::KEYS))?;
                $(if *key == stringify!($group) { return self.$group.get(rest); })*
                $(if *key == stringify!($leaf) {
                    if !rest.is_empty() { return Err(AccessError::InvalidPath(Self::KEYS)); }
                    return Ok(self.$leaf.to_string());
                })+
                Err(AccessError::InvalidPath(Self::KEYS))
            }
        }
    };
}

settable!(
    RateSettings {
        fetch: bool,
        url: String,
    }
);

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            fetch: true,
            url: DEFAULT_RATES_URL.to_owned(),
        }
    }
}

settable!(
    Settings {
        [group] rates: RateSettings,
        angle: AngleMode,
        theme: Theme,
    }
);

impl Default for Settings {
    fn default() -> Self {
        Self {
            rates: RateSettings::default(),
            angle: AngleMode::default(),
            theme: Theme::default(),
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> { data_dir().map(|dir| dir.join(SETTINGS_FILE_NAME)) }

    /// Sets a value by its dotted path, e.g. `set_path("rates.fetch", "false")`
    pub fn set_path(&mut self, path: &str, value: &str) -> Result<(), AccessError> {
        self.set(&path.split('.').collect::<Vec<_>>(), value)
    }

    pub fn get_path(&self, path: &str) -> Result<String, AccessError> {
        self.get(&path.split('.').collect::<Vec<_>>())
    }

    /// Reads the settings from `path`. A missing or unreadable file yields the defaults.
    pub fn load(path: &Path) -> Settings {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No settings loaded from {}: {e}", path.display());
                return Settings::default();
            }
        };

        ron::from_str(&contents).unwrap_or_else(|e| {
            warn!("Ignoring invalid settings file {}: {e}", path.display());
            Settings::default()
        })
    }

    pub fn load_default() -> Settings {
        match Settings::default_path() {
            Some(path) => Settings::load(&path),
            None => Settings::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        if let Some(dir) = path.parent() { std::fs::create_dir_all(dir)?; }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn save_default(&self) -> Result<(), SettingsError> {
        let path = Settings::default_path().ok_or(SettingsError::NoDataDir)?;
        self.save(&path)
    }
}
