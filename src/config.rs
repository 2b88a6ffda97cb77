//! Configuration management

use crate::{MsgReaderError, Result};
use ini::Ini;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default pause before an utterance is submitted, in milliseconds
pub const DEFAULT_GRACE_DELAY_MS: u64 = 1500;

/// Which speech engine backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Pick the best available backend for the platform
    Auto,
    /// The `tts` crate (Speech Dispatcher, AVFoundation, ...)
    Native,
    /// espeak-ng subprocess
    Espeak,
}

/// Where alerts are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTarget {
    Desktop,
    Log,
}

/// Snapshot of the options one pipeline run needs
///
/// Read once per invocation and moved into the worker, so a config change
/// mid-run is never observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub enabled: bool,
    pub require_output_device: bool,
    pub announce_sender_only: bool,
    pub language: String,
    pub grace_delay: Duration,
    /// None waits for the engine forever
    pub init_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            require_output_device: true,
            announce_sender_only: false,
            language: "en".to_string(),
            grace_delay: Duration::from_millis(DEFAULT_GRACE_DELAY_MS),
            init_timeout: None,
        }
    }
}

/// Application configuration
///
/// Backed by an INI file (~/.msgreader.cfg by default).
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,

    /// Phone number -> contact name
    pub contacts: HashMap<String, String>,
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(path)
                .map_err(|e| MsgReaderError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(path)
                .map_err(|e| MsgReaderError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self::from_ini(ini, path.to_path_buf()))
    }

    /// Build a configuration from INI text without touching the disk
    pub fn parse(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| MsgReaderError::IniParse(format!("Failed to parse config: {}", e)))?;
        Ok(Self::from_ini(ini, PathBuf::new()))
    }

    fn from_ini(ini: Ini, path: PathBuf) -> Self {
        let mut config = Self {
            ini,
            path,
            contacts: HashMap::new(),
        };
        config.parse_contacts();
        config
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| MsgReaderError::Config(format!("Failed to save config: {}", e)))
    }

    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".msgreader.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("reader"))
            .set("enabled", "true")
            .set("require_output_device", "true")
            .set("announce_sender_only", "false")
            .set("language", "en");

        ini.with_section(Some("engine"))
            .set("backend", "auto")
            .set("grace_delay_ms", DEFAULT_GRACE_DELAY_MS.to_string())
            .set("init_timeout_ms", "0");

        ini.with_section(Some("alerts")).set("sink", "desktop");

        ini.with_section(Some("contacts"));

        ini
    }

    fn parse_contacts(&mut self) {
        if let Some(section) = self.ini.section(Some("contacts")) {
            for (number, name) in section.iter() {
                self.contacts.insert(number.to_string(), name.to_string());
            }
        }
        debug!("Loaded {} contacts", self.contacts.len());
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an unsigned integer value from config
    pub fn get_u64(&self, section: &str, key: &str, default: u64) -> u64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Is reading messages aloud switched on at all?
    pub fn enabled(&self) -> bool {
        self.get_bool("reader", "enabled", true)
    }

    /// Only speak when headphones or a headset are connected
    pub fn require_output_device(&self) -> bool {
        self.get_bool("reader", "require_output_device", true)
    }

    /// Speak who sent the message but not its body
    pub fn announce_sender_only(&self) -> bool {
        self.get_bool("reader", "announce_sender_only", false)
    }

    /// Language code for speech (e.g. "en", "de", "pt-BR")
    pub fn language(&self) -> String {
        self.get_string("reader", "language", "en")
    }

    pub fn backend(&self) -> Backend {
        match self.get_string("engine", "backend", "auto").as_str() {
            "native" => Backend::Native,
            "espeak" => Backend::Espeak,
            _ => Backend::Auto,
        }
    }

    pub fn alert_target(&self) -> AlertTarget {
        match self.get_string("alerts", "sink", "desktop").as_str() {
            "log" => AlertTarget::Log,
            _ => AlertTarget::Desktop,
        }
    }

    /// Pause before submitting speech so the incoming-message chime can finish
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.get_u64("engine", "grace_delay_ms", DEFAULT_GRACE_DELAY_MS))
    }

    /// How long to wait for the engine to come up; 0 means forever
    pub fn init_timeout(&self) -> Option<Duration> {
        match self.get_u64("engine", "init_timeout_ms", 0) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Take the snapshot used by one pipeline run
    pub fn settings(&self) -> Settings {
        Settings {
            enabled: self.enabled(),
            require_output_device: self.require_output_device(),
            announce_sender_only: self.announce_sender_only(),
            language: self.language(),
            grace_delay: self.grace_delay(),
            init_timeout: self.init_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.settings(), Settings::default());
        assert_eq!(config.backend(), Backend::Auto);
        assert_eq!(config.alert_target(), AlertTarget::Desktop);
    }

    #[test]
    fn test_default_config_matches_settings_default() {
        let config = Config::from_ini(Config::default_config(), PathBuf::new());
        assert_eq!(config.settings(), Settings::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::parse(
            "[reader]\nenabled=false\nlanguage=de\nannounce_sender_only=true\n\
             [engine]\nbackend=espeak\ngrace_delay_ms=0\ninit_timeout_ms=2500\n\
             [alerts]\nsink=log\n",
        )
        .unwrap();

        let settings = config.settings();
        assert!(!settings.enabled);
        assert!(settings.require_output_device);
        assert!(settings.announce_sender_only);
        assert_eq!(settings.language, "de");
        assert_eq!(settings.grace_delay, Duration::ZERO);
        assert_eq!(settings.init_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.backend(), Backend::Espeak);
        assert_eq!(config.alert_target(), AlertTarget::Log);
    }

    #[test]
    fn test_garbage_values_fall_back() {
        let config = Config::parse("[reader]\nenabled=maybe\n[engine]\ngrace_delay_ms=soon\n").unwrap();
        assert!(config.enabled());
        assert_eq!(
            config.grace_delay(),
            Duration::from_millis(DEFAULT_GRACE_DELAY_MS)
        );
    }

    #[test]
    fn test_contacts() {
        let config = Config::parse("[contacts]\n+15550001=Alice\n+15550002=Bob\n").unwrap();
        assert_eq!(config.contacts.len(), 2);
        assert_eq!(config.contacts.get("+15550001").map(String::as_str), Some("Alice"));
    }
}
