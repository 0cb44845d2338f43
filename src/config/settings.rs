use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SecretKeeperError};

/// Project-level configuration, loaded from `.secret-keeper.toml`.
///
/// Every field has a sensible default so secret-keeper works
/// out-of-the-box without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Rotation scheduler tick interval in seconds (default: 1 hour).
    #[serde(default = "default_rotation_tick_secs")]
    pub rotation_tick_secs: u64,

    /// Default `exec` timeout in seconds when a request omits one.
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,

    /// Random-overwrite passes for secure file erasure.
    #[serde(default = "default_erase_passes")]
    pub erase_passes: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_rotation_tick_secs() -> u64 {
    3600
}

fn default_exec_timeout_secs() -> u64 {
    300
}

fn default_erase_passes() -> u32 {
    3
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            rotation_tick_secs: default_rotation_tick_secs(),
            exec_timeout_secs: default_exec_timeout_secs(),
            erase_passes: default_erase_passes(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for next to a vault's base dir.
    const FILE_NAME: &'static str = ".secret-keeper.toml";

    /// Load settings from `<base_dir>/.secret-keeper.toml`.
    ///
    /// If the file does not exist, defaults are returned.  If the file
    /// exists but cannot be parsed, an error is returned.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        toml::from_str(&contents).map_err(|e| {
            SecretKeeperError::ConfigError(format!(
                "failed to parse {}: {e}",
                config_path.display()
            ))
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.rotation_tick_secs, 3600);
        assert_eq!(s.exec_timeout_secs, 300);
        assert_eq!(s.erase_passes, 3);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.rotation_tick_secs, 3600);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = "rotation_tick_secs = 600\nexec_timeout_secs = 30\nerase_passes = 1\n";
        fs::write(tmp.path().join(".secret-keeper.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.rotation_tick_secs, 600);
        assert_eq!(settings.exec_timeout_secs, 30);
        assert_eq!(settings.erase_passes, 1);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".secret-keeper.toml"), "erase_passes = 7\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.erase_passes, 7);
        assert_eq!(settings.exec_timeout_secs, 300);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".secret-keeper.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }
}
