use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::FillOptions;
use crate::site::is_job_site;

/// Used when `autoFillDelay` is zero.
const DEFAULT_AUTO_DETECT_DELAY: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_detect: bool,
    pub smart_suggestions: bool,
    /// Delay before auto-detecting after a page loads, in milliseconds.
    pub auto_fill_delay: u64,
    pub confirm_before_fill: bool,
    pub debug_mode: bool,
    /// Pause after each field write, in milliseconds.
    pub settle_delay: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_detect: true,
            smart_suggestions: true,
            auto_fill_delay: 1000,
            confirm_before_fill: false,
            debug_mode: false,
            settle_delay: 100,
        }
    }
}

impl Settings {
    /// Overlay the keys of `patch` onto these settings. Keys not in `patch`
    /// keep their current value.
    pub fn merge(&self, patch: &Value) -> Result<Settings> {
        let Some(patch) = patch.as_object() else {
            bail!("settings must be an object");
        };
        let mut current = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut current {
            for (k, v) in patch {
                map.insert(k.clone(), v.clone());
            }
        }
        Ok(serde_json::from_value(current)?)
    }

    pub fn fill_options(&self) -> FillOptions {
        FillOptions {
            settle: Duration::from_millis(self.settle_delay),
        }
    }

    /// Whether a page at `url` gets scanned without being asked.
    pub fn auto_detects(&self, url: &str) -> bool {
        self.auto_detect && is_job_site(url)
    }

    /// How long to wait after a page loads before auto-detecting.
    pub fn auto_detect_delay(&self) -> Duration {
        match self.auto_fill_delay {
            0 => Duration::from_millis(DEFAULT_AUTO_DETECT_DELAY),
            ms => Duration::from_millis(ms),
        }
    }
}

// ── Tests ──
