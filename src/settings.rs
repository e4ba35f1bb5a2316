use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::catalog::{cycle, Difficulty};
use crate::error::{Error, Result};

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// fixed countdown, whatever has been typed when it runs out is scored
    #[default]
    Time,
    /// snippet repeated up to a word target, done when fully typed
    Count,
    /// untimed, ends when the typist says so
    Zen,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Time, Mode::Count, Mode::Zen];

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self)
    }
}

/// Countdown length for time mode
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeDuration {
    Secs15,
    #[default]
    Secs30,
    Secs60,
    Secs120,
}

impl TimeDuration {
    pub const ALL: [TimeDuration; 4] = [
        TimeDuration::Secs15,
        TimeDuration::Secs30,
        TimeDuration::Secs60,
        TimeDuration::Secs120,
    ];

    pub fn secs(self) -> u32 {
        match self {
            TimeDuration::Secs15 => 15,
            TimeDuration::Secs30 => 30,
            TimeDuration::Secs60 => 60,
            TimeDuration::Secs120 => 120,
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self)
    }
}

impl TryFrom<u32> for TimeDuration {
    type Error = Error;

    fn try_from(secs: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.secs() == secs)
            .ok_or_else(|| Error::InvalidOption {
                name: "time duration",
                value: secs.to_string(),
            })
    }
}

impl From<TimeDuration> for u32 {
    fn from(d: TimeDuration) -> Self {
        d.secs()
    }
}

impl FromStr for TimeDuration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let secs = s
            .trim_end_matches('s')
            .parse::<u32>()
            .map_err(|_| Error::InvalidOption {
                name: "time duration",
                value: s.to_string(),
            })?;
        Self::try_from(secs)
    }
}

impl fmt::Display for TimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.secs())
    }
}

/// Word target for count mode
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CountAmount {
    Words10,
    #[default]
    Words25,
    Words50,
    Words100,
}

impl CountAmount {
    pub const ALL: [CountAmount; 4] = [
        CountAmount::Words10,
        CountAmount::Words25,
        CountAmount::Words50,
        CountAmount::Words100,
    ];

    pub fn words(self) -> usize {
        match self {
            CountAmount::Words10 => 10,
            CountAmount::Words25 => 25,
            CountAmount::Words50 => 50,
            CountAmount::Words100 => 100,
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self)
    }
}

impl TryFrom<u32> for CountAmount {
    type Error = Error;

    fn try_from(words: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.words() == words as usize)
            .ok_or_else(|| Error::InvalidOption {
                name: "word count",
                value: words.to_string(),
            })
    }
}

impl From<CountAmount> for u32 {
    fn from(c: CountAmount) -> Self {
        c.words() as u32
    }
}

impl FromStr for CountAmount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let words = s.parse::<u32>().map_err(|_| Error::InvalidOption {
            name: "word count",
            value: s.to_string(),
        })?;
        Self::try_from(words)
    }
}

impl fmt::Display for CountAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words())
    }
}

/// Snapshot of the user's choices, used to derive one session's target text.
///
/// Stored as flat camelCase JSON. Missing keys take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub mode: Mode,
    pub time_duration: TimeDuration,
    pub count_amount: CountAmount,
    pub allow_punctuation: bool,
    pub allow_numbers: bool,
    pub difficulty: Difficulty,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Time,
            time_duration: TimeDuration::Secs30,
            count_amount: CountAmount::Words25,
            allow_punctuation: false,
            allow_numbers: false,
            difficulty: Difficulty::Easy,
        }
    }
}

impl Settings {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(Error::Settings)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(Error::Settings)
    }
}

/// Persistence port for settings
pub trait SettingsStore {
    /// Load the stored settings. Missing or unreadable data yields defaults.
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = crate::app_dirs::AppDirs::settings_path()
            .unwrap_or_else(|| PathBuf::from("zentype_settings.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            // first run
            Err(_) => return Settings::default(),
        };

        match Settings::from_json(&bytes) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to load settings, using defaults");
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, settings.to_json()?)?;
        Ok(())
    }
}

/// Store that keeps settings only for the life of the process
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    saved: std::cell::RefCell<Option<Settings>>,
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.saved.borrow().unwrap_or_default()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.saved.borrow_mut() = Some(*settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = FileSettingsStore::with_path(&path);
        let settings = Settings::default();
        store.save(&settings).unwrap();
        let loaded = store.load();
        assert_eq!(settings, loaded);
    }

    #[test]
    fn save_and_load_custom_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = FileSettingsStore::with_path(&path);
        let settings = Settings {
            mode: Mode::Count,
            time_duration: TimeDuration::Secs120,
            count_amount: CountAmount::Words100,
            allow_punctuation: true,
            allow_numbers: true,
            difficulty: Difficulty::Hard,
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = FileSettingsStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, b"{ this is not json").unwrap();
        let store = FileSettingsStore::with_path(&path);
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn out_of_range_duration_is_malformed() {
        let err = Settings::from_json(br#"{"timeDuration": 45}"#).unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let settings = Settings::from_json(br#"{"mode": "zen", "allowNumbers": true}"#).unwrap();
        assert_eq!(settings.mode, Mode::Zen);
        assert!(settings.allow_numbers);
        assert_eq!(settings.time_duration, TimeDuration::Secs30);
        assert_eq!(settings.count_amount, CountAmount::Words25);
    }

    #[test]
    fn json_uses_flat_camel_case_keys() {
        let json = String::from_utf8(Settings::default().to_json().unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mode"], "time");
        assert_eq!(value["timeDuration"], 30);
        assert_eq!(value["countAmount"], 25);
        assert_eq!(value["allowPunctuation"], false);
        assert_eq!(value["difficulty"], "easy");
    }

    #[test]
    fn enumerated_values_parse_from_cli_strings() {
        assert_eq!("60".parse::<TimeDuration>().unwrap(), TimeDuration::Secs60);
        assert_eq!("15s".parse::<TimeDuration>().unwrap(), TimeDuration::Secs15);
        assert!("45".parse::<TimeDuration>().is_err());
        assert_eq!("50".parse::<CountAmount>().unwrap(), CountAmount::Words50);
        assert!("many".parse::<CountAmount>().is_err());
    }

    #[test]
    fn cycling_through_options() {
        assert_eq!(Mode::Zen.next(), Mode::Time);
        assert_eq!(TimeDuration::Secs120.next(), TimeDuration::Secs15);
        assert_eq!(CountAmount::Words10.next(), CountAmount::Words25);
    }

    #[test]
    fn memory_store_keeps_last_save() {
        let store = MemorySettingsStore::default();
        assert_eq!(store.load(), Settings::default());
        let settings = Settings {
            mode: Mode::Zen,
            ..Settings::default()
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);
    }
}
