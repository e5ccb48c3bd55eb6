//! Shared CLI helpers used across multiple commands.

use strom_config::{ConfigError, Preset, resolve_preset};

/// Load a preset by path, falling back to the factory preset of that name.
pub fn load_preset(name: &str) -> anyhow::Result<Preset> {
    match resolve_preset(name) {
        Ok(preset) => Ok(preset),
        Err(ConfigError::PresetNotFound(_)) => anyhow::bail!(
            "Preset '{}' not found. Use 'strom presets' to see the factory presets.",
            name
        ),
        Err(e) => Err(e.into()),
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
