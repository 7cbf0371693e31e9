//! Runtime configuration loaded from `fogchart.toml`.
//! This module exists so every tunable has one typed home with the documented defaults.
//! It does not own command-line parsing; flags are layered on top by `main`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use fogchart_core::{ClassifierRules, GridGeometry, JitterRange, SearchPolicy};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::APP_NAME;

pub const CONFIG_FILE_NAME: &str = "fogchart.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub grid: GridGeometry,
    pub classifier: ClassifierRules,
    pub search: SearchPolicy,
    pub timing: TimingConfig,
    pub capture: CaptureConfig,
    pub locator: LocatorConfig,
    pub actuator: ActuatorConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub jitter: JitterRange,
    /// Pause between planning a step and actuating it.
    pub settle_ms: u64,
    /// Pointer motion time handed to the actuator.
    pub transition_ms: u64,
    /// Period of the presentation refresh, which never actuates.
    pub refresh_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            jitter: JitterRange::default(),
            settle_ms: 2_000,
            transition_ms: 300,
            refresh_secs: 10,
        }
    }
}

impl TimingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn transition(&self) -> Option<Duration> {
        (self.transition_ms > 0).then(|| Duration::from_millis(self.transition_ms))
    }

    pub fn refresh_every(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

/// Pixel rectangle of the capture to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// PNG read on every capture.
    pub path: PathBuf,
    /// Run before reading `path`, e.g. a screenshot tool writing to it.
    pub command: Option<Vec<String>>,
    pub region: Option<CaptureRegion>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("capture.png"), command: None, region: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocatorConfig {
    pub template: PathBuf,
    pub confidence: f32,
    /// Downscale factor of the first, coarse matching pass. 1 disables it.
    pub coarse_factor: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self { template: PathBuf::from("player_icon.png"), confidence: 0.7, coarse_factor: 4 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorConfig {
    /// Argument vector with `{x}`, `{y}` and `{duration_ms}` placeholders. Without one,
    /// clicks are only logged.
    pub command: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Annotated copy of every observed frame is written here.
    pub overlay: Option<PathBuf>,
}

impl AppConfig {
    pub fn get_default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME)
            .map(|proj_dirs| proj_dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in config file {}", path.display()))
    }

    /// An explicit path must exist. Otherwise the per-user file is used when present,
    /// and built-in defaults when not.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "loading configuration");
            return Self::load(path);
        }
        match Self::get_default_path() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            _ => {
                info!("no configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.grid.tile_width > 0 && self.grid.tile_height > 0,
            "grid tile size must be non-zero"
        );
        let jitter = self.timing.jitter;
        ensure!(
            jitter.min_secs <= jitter.max_secs,
            "jitter min_secs ({}) exceeds max_secs ({})",
            jitter.min_secs,
            jitter.max_secs
        );
        ensure!(self.timing.refresh_secs > 0, "refresh_secs must be positive");
        ensure!(
            self.locator.confidence > 0.0 && self.locator.confidence <= 1.0,
            "locator confidence must be in (0, 1]"
        );
        ensure!(self.locator.coarse_factor > 0, "locator coarse_factor must be at least 1");
        for (name, command) in
            [("capture", &self.capture.command), ("actuator", &self.actuator.command)]
        {
            ensure!(
                command.as_ref().is_none_or(|argv| !argv.is_empty()),
                "{name} command must not be empty"
            );
        }
        if let Some(region) = self.capture.region {
            ensure!(region.width > 0 && region.height > 0, "capture region must be non-empty");
        }
        Ok(())
    }
}
