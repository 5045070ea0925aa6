use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::currency::{CurrencyCode, LocaleConfig};
use crate::errors::{Result, WishError};
use crate::storage::json_backend::write_atomic;
use crate::utils::paths::{app_data_dir, config_file_in, ensure_dir};
use crate::wizard::session::{WizardOptions, DEFAULT_AUTO_SAVE_DELAY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: DEFAULT_AUTO_SAVE_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub allow_skip_steps: bool,
    pub allow_step_reset: bool,
    pub show_progress_bar: bool,
    pub show_step_indicator: bool,
    pub show_step_title: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            allow_skip_steps: false,
            allow_step_reset: false,
            show_progress_bar: true,
            show_step_indicator: true,
            show_step_title: true,
        }
    }
}

/// User preferences stored in `config/config.json`. Missing keys fall back
/// to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    pub autosave: AutosaveConfig,
    pub wizard: WizardConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            autosave: AutosaveConfig::default(),
            wizard: WizardConfig::default(),
            submit_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn locale_config(&self) -> LocaleConfig {
        LocaleConfig::from_tag(&self.locale)
    }

    pub fn currency_code(&self) -> CurrencyCode {
        CurrencyCode::new(self.currency.as_str())
    }

    pub fn wizard_options(&self) -> WizardOptions {
        WizardOptions {
            allow_skip_steps: self.wizard.allow_skip_steps,
            allow_step_reset: self.wizard.allow_step_reset,
            auto_save: self.autosave.enabled,
            auto_save_delay: Duration::from_millis(self.autosave.delay_ms),
            show_progress_bar: self.wizard.show_progress_bar,
            show_step_indicator: self.wizard.show_step_indicator,
            show_step_title: self.wizard.show_step_title,
            submit_timeout: self
                .submit_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: config_file_in(&base),
        })
    }

    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| {
            WishError::ConfigError(format!("{}: {}", self.path.display(), err))
        })
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
