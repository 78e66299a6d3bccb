//! Configuration types for sktop.
//!
//! Settings come from `/etc/sktop/config.toml`, then the user config file,
//! then `SKTOP_*` environment variables. A file only overrides the keys it sets.
//! CLI flags are applied last by `main`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub system: SystemConfig,

    pub refresh: RefreshConfig,

    pub display: DisplayConfig,

    pub behavior: BehaviorConfig,
}

/// System configuration for paths and command execution
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Path to directory containing Slurm binaries (squeue, scancel, scontrol)
    /// If empty or not set, auto-detected via PATH
    pub slurm_bin_path: Option<PathBuf>,

    /// Seconds before a Slurm command is killed and reported as unavailable
    pub command_timeout_secs: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            slurm_bin_path: None,
            command_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Poll interval in seconds
    pub interval_secs: f64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 1.0 }
    }
}

/// Minimum allowed poll interval in seconds (prevents tight polling loops)
pub const MIN_REFRESH_INTERVAL: f64 = 0.1;

/// Maximum allowed poll interval in seconds (one day)
pub const MAX_REFRESH_INTERVAL: f64 = 86_400.0;

/// Whether `secs` is a usable poll interval
#[must_use]
pub fn is_valid_refresh_interval(secs: f64) -> bool {
    secs.is_finite() && (MIN_REFRESH_INTERVAL..=MAX_REFRESH_INTERVAL).contains(&secs)
}

/// Minimum command timeout in seconds
const MIN_COMMAND_TIMEOUT: u64 = 1;

impl RefreshConfig {
    /// Validate refresh configuration values.
    /// Returns a list of warnings for invalid values that were corrected to defaults.
    /// If `strict` is true, returns Err instead of correcting values.
    pub fn validate(&mut self, strict: bool) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        let default = Self::default().interval_secs;

        if !is_valid_refresh_interval(self.interval_secs) {
            let msg = format!(
                "refresh.interval_secs must be between {MIN_REFRESH_INTERVAL} and \
                 {MAX_REFRESH_INTERVAL} seconds, got {}",
                self.interval_secs
            );
            if strict {
                return Err(msg);
            }
            warnings.push(format!("{msg} - using default ({default})"));
            self.interval_secs = default;
        }

        Ok(warnings)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Theme name ("dark" or "light")
    pub theme: String,

    /// Hide jobs that have finished, cancelled ones included
    pub hide_finished: bool,

    /// Maximum length for job names before truncation
    pub name_max_length: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            hide_finished: true,
            name_max_length: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Require confirmation before cancelling jobs
    pub confirm_kill: bool,

    /// Number of trailing log lines shown in the log viewer
    pub log_tail_lines: usize,

    /// Seconds an action result stays on screen unless acknowledged
    pub feedback_timeout_secs: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            confirm_kill: true,
            log_tail_lines: 200,
            feedback_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    /// Get the user config file path, respecting XDG_CONFIG_HOME
    ///
    /// Resolution order:
    /// 1. $XDG_CONFIG_HOME/sktop/config.toml (if XDG_CONFIG_HOME is set)
    /// 2. $HOME/.config/sktop/config.toml (if HOME is set)
    /// 3. dirs::config_dir()/sktop/config.toml
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
            && !xdg_config.is_empty()
        {
            return Some(PathBuf::from(xdg_config).join("sktop/config.toml"));
        }

        if let Some(home) = std::env::var_os("HOME") {
            return Some(PathBuf::from(home).join(".config/sktop/config.toml"));
        }

        dirs::config_dir().map(|dir| dir.join("sktop/config.toml"))
    }

    /// Load configuration from files and environment.
    ///
    /// With an explicit path only that file is read, and it must exist.
    /// Returns the config and any warnings encountered during loading.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Vec<String>), String> {
        let mut warnings = Vec::new();
        let strict = Self::is_strict_mode();

        let mut config = match explicit {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    format!("Could not read config file '{}': {}", path.display(), e)
                })?;
                let layer = parse_layer(&content).map_err(|e| {
                    format!("Failed to parse config file '{}': {}", path.display(), e)
                })?;
                Self::from_layers(vec![layer])?
            }
            None => {
                let paths = std::iter::once(PathBuf::from("/etc/sktop/config.toml"))
                    .chain(Self::user_config_path());
                let mut layers = Vec::new();
                for path in paths {
                    if let Some(layer) = read_layer(&path, strict, &mut warnings)? {
                        layers.push(layer);
                    }
                }
                Self::from_layers(layers)?
            }
        };

        config.apply_env_overrides(strict, &mut warnings)?;
        warnings.extend(config.validate(strict)?);

        Ok((config, warnings))
    }

    /// Build a config from file layers, later layers overriding earlier ones key by key
    fn from_layers(layers: Vec<toml::Table>) -> Result<Self, String> {
        let mut merged = toml::Table::new();
        for layer in layers {
            merge_tables(&mut merged, layer);
        }
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| format!("Invalid configuration: {}", e))
    }

    /// Validate every section, correcting invalid values unless `strict`
    pub fn validate(&mut self, strict: bool) -> Result<Vec<String>, String> {
        let mut warnings = self.refresh.validate(strict)?;

        if self.system.command_timeout_secs < MIN_COMMAND_TIMEOUT {
            let default = SystemConfig::default().command_timeout_secs;
            let msg = format!(
                "system.command_timeout_secs must be at least {MIN_COMMAND_TIMEOUT}, got {}",
                self.system.command_timeout_secs
            );
            if strict {
                return Err(msg);
            }
            warnings.push(format!("{msg} - using default ({default})"));
            self.system.command_timeout_secs = default;
        }

        if self.behavior.log_tail_lines == 0 {
            let default = BehaviorConfig::default().log_tail_lines;
            let msg = "behavior.log_tail_lines must be at least 1".to_string();
            if strict {
                return Err(msg);
            }
            warnings.push(format!("{msg} - using default ({default})"));
            self.behavior.log_tail_lines = default;
        }

        if !matches!(self.display.theme.as_str(), "dark" | "light") {
            let msg = format!("display.theme '{}' is not 'dark' or 'light'", self.display.theme);
            if strict {
                return Err(msg);
            }
            warnings.push(format!("{msg} - using dark"));
            self.display.theme = "dark".to_string();
        }

        Ok(warnings)
    }

    /// Check if strict config mode is enabled via SKTOP_STRICT_CONFIG
    pub fn is_strict_mode() -> bool {
        std::env::var("SKTOP_STRICT_CONFIG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    fn apply_env_overrides(
        &mut self,
        strict: bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), String> {
        if let Ok(val) = std::env::var("SKTOP_SLURM_PATH")
            && !val.is_empty()
        {
            let path = PathBuf::from(&val);
            if path.is_dir() {
                self.system.slurm_bin_path = Some(path);
            } else {
                Self::report_env_error(
                    strict,
                    warnings,
                    "SKTOP_SLURM_PATH",
                    &val,
                    "not a valid directory",
                )?;
            }
        }

        if let Ok(val) = std::env::var("SKTOP_REFRESH") {
            match val.parse::<f64>() {
                Ok(secs) if is_valid_refresh_interval(secs) => {
                    self.refresh.interval_secs = secs;
                }
                Ok(_) => Self::report_env_error(
                    strict,
                    warnings,
                    "SKTOP_REFRESH",
                    &val,
                    &format!(
                        "must be between {} and {} seconds",
                        MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL
                    ),
                )?,
                Err(_) => Self::report_env_error(
                    strict,
                    warnings,
                    "SKTOP_REFRESH",
                    &val,
                    "expected a number of seconds",
                )?,
            }
        }

        if let Ok(val) = std::env::var("SKTOP_THEME") {
            self.display.theme = val;
        }

        Ok(())
    }

    fn report_env_error(
        strict: bool,
        warnings: &mut Vec<String>,
        var_name: &str,
        value: &str,
        reason: &str,
    ) -> Result<(), String> {
        if strict {
            return Err(format!("Invalid value '{}' for {}: {}", value, var_name, reason));
        }
        warnings.push(format!(
            "Invalid value '{}' for {}, {} - ignored",
            value, var_name, reason
        ));
        Ok(())
    }
}

/// Parse one config file into a table, rejecting content that does not fit `AppConfig`
fn parse_layer(content: &str) -> Result<toml::Table, toml::de::Error> {
    toml::from_str::<AppConfig>(content)?;
    toml::from_str::<toml::Table>(content)
}

/// Read a config file layer, collecting warnings on parse errors but not on missing files.
fn read_layer(
    path: &Path,
    strict: bool,
    warnings: &mut Vec<String>,
) -> Result<Option<toml::Table>, String> {
    let msg = match std::fs::read_to_string(path) {
        Ok(content) => match parse_layer(&content) {
            Ok(layer) => return Ok(Some(layer)),
            Err(e) => format!("Config parse error in '{}': {}", path.display(), e),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => format!("Could not read config '{}': {}", path.display(), e),
    };
    if strict {
        return Err(msg);
    }
    warnings.push(msg);
    Ok(None)
}

/// Overlay `overlay` onto `base`, recursing into tables so unset keys keep their value
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (Some(slot), value) => *slot = value,
            (None, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.refresh.interval_secs, 1.0);
        assert_eq!(config.system.command_timeout_secs, 30);
        assert!(config.behavior.confirm_kill);
        assert!(config.display.hide_finished);
        assert_eq!(config.behavior.feedback_timeout_secs, 5);
    }

    #[test]
    fn test_refresh_validate_valid_values() {
        let mut config = RefreshConfig { interval_secs: 0.1 };
        let warnings = config.validate(false).unwrap();
        assert!(warnings.is_empty(), "No warnings expected for minimum valid value");
    }

    #[test]
    fn test_refresh_validate_corrects_too_small() {
        let mut config = RefreshConfig { interval_secs: 0.0 };
        let warnings = config.validate(false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("interval_secs"));
        assert_eq!(config.interval_secs, RefreshConfig::default().interval_secs);
    }

    #[test]
    fn test_refresh_validate_rejects_nan() {
        let mut config = RefreshConfig {
            interval_secs: f64::NAN,
        };
        let warnings = config.validate(false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.interval_secs, 1.0);
    }

    #[test]
    fn test_refresh_validate_strict_mode_error() {
        let mut config = RefreshConfig { interval_secs: 0.01 };
        let err = config.validate(true).unwrap_err();
        assert!(err.contains("interval_secs"));
    }

    #[test]
    fn test_validate_multiple_invalid_values() {
        let mut config = AppConfig::default();
        config.refresh.interval_secs = -1.0;
        config.system.command_timeout_secs = 0;
        config.behavior.log_tail_lines = 0;
        config.display.theme = "solarized".to_string();

        let warnings = config.validate(false).unwrap();
        assert_eq!(warnings.len(), 4);
        assert_eq!(config.refresh.interval_secs, 1.0);
        assert_eq!(config.system.command_timeout_secs, 30);
        assert_eq!(config.behavior.log_tail_lines, 200);
        assert_eq!(config.display.theme, "dark");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [refresh]
            interval_secs = 2.5

            [behavior]
            confirm_kill = false
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.refresh.interval_secs, 2.5);
        assert!(!config.behavior.confirm_kill);
        // Untouched sections keep their defaults
        assert_eq!(config.behavior.log_tail_lines, 200);
        assert_eq!(config.display.theme, "dark");
    }

    #[test]
    fn test_layers_merge_key_by_key() {
        let system = parse_layer(
            r#"
            [system]
            slurm_bin_path = "/opt/slurm/bin"

            [refresh]
            interval_secs = 5.0

            [display]
            theme = "light"
            name_max_length = 40
        "#,
        )
        .unwrap();
        let user = parse_layer(
            r#"
            [display]
            theme = "dark"
        "#,
        )
        .unwrap();

        let config = AppConfig::from_layers(vec![system, user]).unwrap();
        assert_eq!(config.system.slurm_bin_path, Some(PathBuf::from("/opt/slurm/bin")));
        assert_eq!(config.refresh.interval_secs, 5.0);
        assert_eq!(config.display.theme, "dark");
        // Keys the user file leaves out keep the system value, not the default
        assert_eq!(config.display.name_max_length, 40);
        assert_eq!(config.behavior.log_tail_lines, 200);
    }

    #[test]
    fn test_no_layers_gives_defaults() {
        let config = AppConfig::from_layers(Vec::new()).unwrap();
        assert_eq!(config.refresh.interval_secs, 1.0);
        assert!(config.system.slurm_bin_path.is_none());
    }

    #[test]
    fn test_parse_layer_rejects_wrong_types() {
        assert!(parse_layer("[refresh]\ninterval_secs = \"fast\"\n").is_err());
        assert!(parse_layer("not toml at all [").is_err());
    }

    #[test]
    fn test_read_layer_missing_file_is_silent() {
        let mut warnings = Vec::new();
        let layer = read_layer(Path::new("/nonexistent/sktop.toml"), true, &mut warnings).unwrap();
        assert!(layer.is_none());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_read_layer_parse_error_warns_or_fails() {
        let path = std::env::temp_dir().join(format!("sktop-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[refresh]\ninterval_secs = [1, 2]\n").unwrap();

        let mut warnings = Vec::new();
        assert!(read_layer(&path, false, &mut warnings).unwrap().is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("parse error"));
        assert!(read_layer(&path, true, &mut Vec::new()).is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_refresh_validate_corrects_too_large() {
        let mut config = RefreshConfig { interval_secs: 1e300 };
        let warnings = config.validate(false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.interval_secs, 1.0);

        let mut strict = RefreshConfig { interval_secs: 1e300 };
        assert!(strict.validate(true).is_err());

        let mut ceiling = RefreshConfig {
            interval_secs: MAX_REFRESH_INTERVAL,
        };
        assert!(ceiling.validate(true).unwrap().is_empty());
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/sktop/config.toml")));
        assert!(result.is_err());
    }
}
