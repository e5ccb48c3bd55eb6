//! Factory preset listing command.

use clap::Args;
use strom_config::factory_presets;

use super::common::load_preset;

#[derive(Args)]
pub struct PresetsArgs {
    /// Preset name or file to print as TOML
    #[arg(value_name = "PRESET")]
    preset: Option<String>,
}

pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.preset {
        let preset = load_preset(name)?;
        print!("{}", preset.to_toml()?);
        return Ok(());
    }

    println!("Factory Presets");
    println!("===============");
    println!();
    for preset in factory_presets() {
        println!(
            "  {:12} {}",
            preset.name,
            preset.description.as_deref().unwrap_or("")
        );
        if !preset.is_empty() {
            println!("  {:12} {}", "", preset.to_chain_string());
        }
    }
    println!();
    println!("Use 'strom process IN OUT --preset <name>' to apply one.");

    Ok(())
}
