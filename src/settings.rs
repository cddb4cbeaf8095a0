use anyhow::{anyhow, Context, Result};
use dlaa_core::ConfigStore;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Directory holding the add-on's settings, shaders and logs.
pub fn addon_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not find config directory"))?;
    let dir = config_dir.join("ffxv_dlaa");

    // Create directory if it doesn't exist
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

/// On-disk layout: section -> key -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
struct SettingsFile {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

/// `ConfigStore` persisted as JSON; every write rewrites the file.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    contents: SettingsFile,
}

impl JsonConfigStore {
    /// Settings file inside [`addon_dir`].
    pub fn settings_file() -> Result<PathBuf> {
        Ok(addon_dir()?.join("settings.json"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::settings_file()?)
    }

    /// Load from `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = if path.exists() {
            let json = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            SettingsFile::default()
        };
        debug!("Loaded settings from {}", path.display());
        Ok(Self { path, contents })
    }

    /// Write the current contents to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.contents)?;
        fs::write(&self.path, json).with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn get_value(&self, section: &str, key: &str) -> Option<String> {
        self.contents.sections.get(section)?.get(key).cloned()
    }

    fn set_value(&mut self, section: &str, key: &str, value: &str) {
        self.contents
            .sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        if let Err(e) = self.save() {
            warn!("Failed to persist {}.{}: {:#}", section, key, e);
        }
    }
}
