//! Stage listing and information command.

use clap::Args;
use serde_json::json;
use strom_registry::{StageCategory, StageDescriptor, StageRegistry};

const CATEGORIES: [StageCategory; 6] = [
    StageCategory::Conversion,
    StageCategory::Utility,
    StageCategory::Filter,
    StageCategory::Dynamics,
    StageCategory::TimeBased,
    StageCategory::Analysis,
];

#[derive(Args)]
pub struct EffectsArgs {
    /// Show details for a specific stage
    #[arg(value_name = "ID")]
    stage: Option<String>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: EffectsArgs) -> anyhow::Result<()> {
    let registry = StageRegistry::new();

    if let Some(id) = &args.stage {
        let descriptor = registry
            .all_stages()
            .into_iter()
            .find(|d| d.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| anyhow::anyhow!("Unknown stage: {}", id))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&to_json(descriptor))?);
            return Ok(());
        }

        println!("{}", descriptor.name);
        println!("{}", "=".repeat(descriptor.name.len()));
        println!();
        println!("{}", descriptor.description);
        println!();
        println!("  Usage:    {} {}", descriptor.id, descriptor.usage);
        println!("  Category: {}", descriptor.category.name());
        let flags = descriptor.flags.labels();
        if !flags.is_empty() {
            println!("  Flags:    {}", flags.join(", "));
        }
        println!();
        println!("Example:");
        println!();
        println!(
            "  strom process input.wav output.wav --chain \"{}\"",
            example(descriptor)
        );
        return Ok(());
    }

    if args.json {
        let all: Vec<_> = registry.all_stages().into_iter().map(to_json).collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    println!("Available Stages");
    println!("================");
    for category in CATEGORIES {
        let stages = registry.stages_in_category(category);
        if stages.is_empty() {
            continue;
        }
        println!();
        println!("{}:", category.name());
        for d in stages {
            println!("  {:12} {:40} {}", d.id, d.usage, d.description);
        }
    }
    println!();
    println!("Use 'strom effects <id>' for details.");

    Ok(())
}

fn to_json(d: &StageDescriptor) -> serde_json::Value {
    json!({
        "id": d.id,
        "name": d.name,
        "description": d.description,
        "category": d.category.name(),
        "usage": d.usage,
        "flags": d.flags.labels(),
    })
}

/// A plausible invocation for the help text.
fn example(d: &StageDescriptor) -> String {
    let args = match d.id {
        "gain" => "-3",
        "lowpass" => "3000",
        "highpass" => "80",
        "compressor" => "-18 3",
        "echo" => "250 0.4",
        "trim" => "0 10",
        "remix" => "1,2",
        _ => "",
    };
    if args.is_empty() {
        d.id.to_string()
    } else {
        format!("{} {}", d.id, args)
    }
}
