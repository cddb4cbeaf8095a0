//! User settings and the persisted key-value store they live in.

use log::{debug, warn};

/// Section all settings are stored under.
pub const CONFIG_SECTION: &str = "DLAA";
pub const SHARPEN_AMOUNT_KEY: &str = "SharpenAmount";
pub const PRESET_KEY: &str = "Preset";

pub const SHARPEN_INTENSITY_MIN: f32 = 0.0;
pub const SHARPEN_INTENSITY_MAX: f32 = 2.0;
pub const DEFAULT_SHARPEN_INTENSITY: f32 = 1.0;

/// Persisted key-value configuration owned by the host.
pub trait ConfigStore {
    fn get_value(&self, section: &str, key: &str) -> Option<String>;
    fn set_value(&mut self, section: &str, key: &str, value: &str);
}

/// DLSS render preset hint. Discriminants are the NGX hint values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum RenderPreset {
    #[default]
    K = 11,
    M = 13,
}

impl RenderPreset {
    pub const ALL: [RenderPreset; 2] = [RenderPreset::K, RenderPreset::M];

    pub const fn hint_value(self) -> u32 {
        self as u32
    }

    pub fn from_hint_value(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| i64::from(p.hint_value()) == value)
    }

    pub const fn label(self) -> &'static str {
        match self {
            RenderPreset::K => "Preset K(DLSS 4.0)",
            RenderPreset::M => "Preset M(DLSS 4.5)",
        }
    }
}

/// Settings read once at device init and changed by the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HookSettings {
    pub sharpen_intensity: f32,
    pub preset: RenderPreset,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            sharpen_intensity: DEFAULT_SHARPEN_INTENSITY,
            preset: RenderPreset::default(),
        }
    }
}

impl HookSettings {
    /// Load from `store`, replacing missing or invalid values with defaults.
    pub fn load(store: &dyn ConfigStore) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = store.get_value(CONFIG_SECTION, SHARPEN_AMOUNT_KEY) {
            match raw.trim().parse::<f32>() {
                Ok(v) if (SHARPEN_INTENSITY_MIN..=SHARPEN_INTENSITY_MAX).contains(&v) => {
                    settings.sharpen_intensity = v;
                }
                _ => warn!("Ignoring invalid {}={:?}, using {}", SHARPEN_AMOUNT_KEY, raw, DEFAULT_SHARPEN_INTENSITY),
            }
        }

        if let Some(raw) = store.get_value(CONFIG_SECTION, PRESET_KEY) {
            match raw.trim().parse::<i64>().ok().and_then(RenderPreset::from_hint_value) {
                Some(preset) => settings.preset = preset,
                None => warn!("Ignoring invalid {}={:?}, using {:?}", PRESET_KEY, raw, settings.preset),
            }
        }

        debug!("Loaded settings: {:?}", settings);
        settings
    }

    pub fn store_sharpen_intensity(&self, store: &mut dyn ConfigStore) {
        store.set_value(CONFIG_SECTION, SHARPEN_AMOUNT_KEY, &self.sharpen_intensity.to_string());
    }

    pub fn store_preset(&self, store: &mut dyn ConfigStore) {
        store.set_value(CONFIG_SECTION, PRESET_KEY, &self.preset.hint_value().to_string());
    }
}

/// Clamp an overlay-provided intensity into the supported range.
pub fn clamp_sharpen_intensity(value: f32) -> f32 {
    if value.is_nan() {
        return DEFAULT_SHARPEN_INTENSITY;
    }
    value.clamp(SHARPEN_INTENSITY_MIN, SHARPEN_INTENSITY_MAX)
}
