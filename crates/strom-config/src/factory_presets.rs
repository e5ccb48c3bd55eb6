//! Presets bundled with the library.
//!
//! Factory presets are embedded at compile time and resolve by name wherever
//! a preset file is accepted.

use std::path::Path;

use crate::Preset;
use crate::error::{ConfigError, Result};

/// Factory preset ids and their TOML.
static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("telephone", TELEPHONE_PRESET),
    ("broadcast", BROADCAST_PRESET),
    ("cd", CD_PRESET),
    ("voice_memo", VOICE_MEMO_PRESET),
    ("slapback", SLAPBACK_PRESET),
    ("analyze", ANALYZE_PRESET),
];

const TELEPHONE_PRESET: &str = r#"
name = "telephone"
description = "Narrow band voice at 8 kHz mono"

[output]
rate = 8000
channels = 1
bits = 16

[[effects]]
type = "highpass"
args = ["300"]

[[effects]]
type = "lowpass"
args = ["3400"]
"#;

const BROADCAST_PRESET: &str = r#"
name = "broadcast"
description = "Rumble filter and gentle levelling"

[[effects]]
type = "highpass"
args = ["80"]

[[effects]]
type = "compressor"
args = ["-18", "3", "5", "150", "3"]

[[effects]]
type = "gain"
args = ["-1"]
"#;

const CD_PRESET: &str = r#"
name = "cd"
description = "Red Book output: 44.1 kHz, 16-bit stereo"

[output]
rate = 44100
channels = 2
bits = 16
"#;

const VOICE_MEMO_PRESET: &str = r#"
name = "voice_memo"
description = "Compact mono speech at 16 kHz"

[output]
rate = 16000
channels = 1
bits = 16

[[effects]]
type = "highpass"
args = ["100"]

[[effects]]
type = "compressor"
args = ["-24", "4"]
"#;

const SLAPBACK_PRESET: &str = r#"
name = "slapback"
description = "Short single repeat"

[[effects]]
type = "echo"
args = ["110", "0.35"]
"#;

const ANALYZE_PRESET: &str = r#"
name = "analyze"
description = "Report peak and RMS levels without changing the signal"

[[effects]]
type = "stat"
"#;

/// All factory presets.
pub fn factory_presets() -> Vec<Preset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| Preset::from_toml(toml).ok())
        .collect()
}

/// Get a factory preset by name, case-insensitively.
///
/// # Example
///
/// ```rust
/// use strom_config::get_factory_preset;
///
/// let preset = get_factory_preset("Telephone").unwrap();
/// assert_eq!(preset.output.rate, Some(8000));
/// ```
pub fn get_factory_preset(name: &str) -> Option<Preset> {
    FACTORY_PRESETS_TOML
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(name))
        .and_then(|(_, toml)| Preset::from_toml(toml).ok())
}

/// Names of all factory presets.
pub fn factory_preset_names() -> Vec<&'static str> {
    FACTORY_PRESETS_TOML.iter().map(|(name, _)| *name).collect()
}

/// True if `name` is a factory preset.
pub fn is_factory_preset(name: &str) -> bool {
    FACTORY_PRESETS_TOML
        .iter()
        .any(|(id, _)| id.eq_ignore_ascii_case(name))
}

/// Loads `name` as a file if one exists there, else as a factory preset.
pub fn resolve_preset(name: &str) -> Result<Preset> {
    let path = Path::new(name);
    if path.is_file() {
        return Preset::load(path);
    }
    get_factory_preset(name).ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
}
