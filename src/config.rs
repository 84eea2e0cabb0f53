//! Configuration management
//!
//! Hosts embed the flow in different shells: a kiosk wants a short sensor
//! latency and a quick auto-close, a phone sheet wants the success screen to
//! linger. Settings arrive as JSON, either a full document, a document nested
//! under a `palm` key, or a partial object whose sections are merged onto the
//! defaults.
//!
//! Separate structs per section let a malformed section be skipped without
//! discarding the rest of the configuration.

use crate::outcome::PlaceholderIdentity;
use crate::palm_scanner::{
    ColorToken, PalmScanner, ScannerConfig, DEFAULT_PLACEHOLDER_NAME, DEFAULT_SCAN_LATENCY,
};
use crate::state::ScanMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalmConfig {
    pub scanner: ScannerSettings,

    pub timing: TimingConfig,

    pub enrollment: EnrollmentConfig,

    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerSettings {
    pub scan_area_size: f32,

    pub scan_area_color: ColorToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub scan_latency_ms: u64,

    pub dismiss_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentConfig {
    pub code_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub placeholder_name: String,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            scan_area_size: 200.0,
            scan_area_color: ColorToken::default(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scan_latency_ms: DEFAULT_SCAN_LATENCY.as_millis() as u64,
            dismiss_delay_ms: 3000,
        }
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            code_url: "https://example.com/palm-register".to_string(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
        }
    }
}

impl Default for PalmConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerSettings::default(),
            timing: TimingConfig::default(),
            enrollment: EnrollmentConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl PalmConfig {
    pub fn from_value(value: serde_json::Value) -> Self {
        if let Ok(config) = serde_json::from_value::<PalmConfig>(value.clone()) {
            debug!("Deserialized full configuration directly");
            return config;
        }

        if let Some(palm_settings) = value.get("palm") {
            if let Ok(config) = serde_json::from_value::<PalmConfig>(palm_settings.clone()) {
                debug!("Deserialized configuration from 'palm' key");
                return config;
            }
        }

        let mut config = PalmConfig::default();
        let sections = value.get("palm").cloned().unwrap_or(value);
        config.update_from_value(&sections);
        config
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Config file is not valid JSON: {}", path.display()))?;

        let config = Self::from_value(value);
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Merges every recognised section of `value` onto `self`. Sections that
    /// fail to deserialize are skipped and leave the current settings intact.
    pub fn update_from_value(&mut self, value: &serde_json::Value) {
        if let Some(scanner_settings) = value.get("scanner") {
            match serde_json::from_value::<ScannerSettings>(scanner_settings.clone()) {
                Ok(scanner) => {
                    self.scanner = scanner;
                    debug!("Updated scanner configuration");
                }
                Err(e) => warn!("Ignoring invalid scanner section: {}", e),
            }
        }

        if let Some(timing_settings) = value.get("timing") {
            match serde_json::from_value::<TimingConfig>(timing_settings.clone()) {
                Ok(timing) => {
                    self.timing = timing;
                    debug!("Updated timing configuration");
                }
                Err(e) => warn!("Ignoring invalid timing section: {}", e),
            }
        }

        if let Some(code_url) = value
            .get("enrollment")
            .and_then(|v| v.get("code_url"))
            .and_then(|v| v.as_str())
        {
            self.enrollment.code_url = code_url.to_string();
            debug!("Updated enrollment code");
        }

        if let Some(name) = value
            .get("identity")
            .and_then(|v| v.get("placeholder_name"))
            .and_then(|v| v.as_str())
        {
            self.identity.placeholder_name = name.to_string();
            debug!("Updated placeholder identity");
        }
    }

    pub fn scan_latency(&self) -> Duration {
        Duration::from_millis(self.timing.scan_latency_ms)
    }

    pub fn dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.timing.dismiss_delay_ms)
    }

    pub fn scanner_config(&self, mode: ScanMode) -> ScannerConfig {
        ScannerConfig::new(
            mode,
            self.scanner.scan_area_size,
            self.scanner.scan_area_color,
        )
    }

    /// Simulated scanner wired with this configuration's latency and identity.
    pub fn build_scanner(&self, mode: ScanMode) -> PalmScanner {
        PalmScanner::new(self.scanner_config(mode))
            .with_latency(self.scan_latency())
            .with_identity(PlaceholderIdentity::new(
                self.identity.placeholder_name.clone(),
            ))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timing.scan_latency_ms == 0 {
            return Err("Scan latency must be greater than 0".to_string());
        }

        if self.scanner.scan_area_size <= 0.0 {
            return Err("Scan area size must be greater than 0".to_string());
        }

        let opacity = self.scanner.scan_area_color.opacity;
        if !(0.0..=1.0).contains(&opacity) {
            return Err(format!("Scan area opacity out of range: {}", opacity));
        }

        if self.enrollment.code_url.trim().is_empty() {
            return Err("Enrollment code must not be empty".to_string());
        }

        Ok(())
    }
}
