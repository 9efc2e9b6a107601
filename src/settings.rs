use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::meter::VisibilityPolicy;

/// User-adjustable meter preferences. Tariff values are deliberately not
/// part of this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterSettings {
    pub keep_alive_while_active: bool,
    pub notifications_enabled: bool,
}

impl Default for MeterSettings {
    fn default() -> Self {
        Self {
            keep_alive_while_active: true,
            notifications_enabled: true,
        }
    }
}

impl MeterSettings {
    pub fn visibility_policy(&self) -> VisibilityPolicy {
        VisibilityPolicy {
            keep_alive_while_active: self.keep_alive_while_active,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MeterSettings>,
}

impl SettingsStore {
    /// Load from `path`. A missing or unreadable file yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings at {}: {err}", path.display());
                MeterSettings::default()
            })
        } else {
            MeterSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> MeterSettings {
        match self.data.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn update(&self, settings: MeterSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &MeterSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
