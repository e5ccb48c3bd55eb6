//! Chain descriptions.
//!
//! A chain description lists stages separated by `|`; each stage is a
//! registry id followed by whitespace-separated arguments:
//!
//! ```text
//! highpass 80 | compressor -18 3 | !echo 250 0.3 | gain -1
//! ```
//!
//! A `!` before the id keeps the stage in the description but leaves it out
//! of the built chain.

use strom_core::Stage;
use strom_registry::StageRegistry;

use crate::error::{ConfigError, Result};
use crate::stage_config::StageConfig;
use crate::validation::ValidationError;

/// Parses a chain description into stage configurations.
///
/// Empty segments are skipped. Ids are not checked here; see
/// [`validate_chain`](crate::validate_chain).
///
/// # Example
///
/// ```rust
/// use strom_config::parse_chain;
///
/// let stages = parse_chain("gain -3 | lowpass 1000").unwrap();
/// assert_eq!(stages.len(), 2);
/// assert_eq!(stages[0].stage_type, "gain");
/// assert_eq!(stages[0].args, ["-3"]);
/// assert_eq!(stages[1].args, ["1000"]);
/// ```
pub fn parse_chain(chain: &str) -> Result<Vec<StageConfig>> {
    let mut stages = Vec::new();

    for segment in chain.split('|') {
        let mut tokens = segment.split_whitespace();
        let Some(id) = tokens.next() else {
            continue;
        };

        let config = StageConfig::new(id).with_args(tokens);
        if config.stage_type.is_empty() {
            return Err(ConfigError::invalid_chain(chain, "'!' must precede a stage id"));
        }
        stages.push(config);
    }

    if stages.is_empty() {
        return Err(ConfigError::invalid_chain(chain, "no stages"));
    }
    Ok(stages)
}

/// Formats stage configurations as a chain description.
pub fn format_chain(stages: &[StageConfig]) -> String {
    stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Instantiates and configures every stage that is not bypassed.
pub fn build_stages(
    stages: &[StageConfig],
    registry: &StageRegistry,
) -> Result<Vec<Box<dyn Stage>>> {
    stages
        .iter()
        .filter(|config| !config.bypassed)
        .map(|config| {
            registry
                .create_configured(&config.stage_type, &config.args)
                .map_err(|e| ConfigError::from(ValidationError::from(e)))
        })
        .collect()
}
