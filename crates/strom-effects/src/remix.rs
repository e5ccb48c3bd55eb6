//! User-specified channel remapping.

use strom_core::{
    Drained, Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome, UsageError,
};

use crate::channels::{ChannelMap, FrameMixer};

/// Rebuilds the channel layout from explicit source lists.
///
/// One argument per output channel, each a comma-separated list of 1-based
/// input channels to average (`1,2`), or `0` for silence. `remix 1,2` folds
/// stereo to mono; `remix 2 1` swaps left and right.
///
/// The chain builder sets this stage's output to the sink channel count, so
/// the number of arguments must match it.
#[derive(Debug, Clone, Default)]
pub struct Remix {
    sources: Vec<Vec<usize>>,
    mixer: Option<FrameMixer>,
}

impl Remix {
    /// Create an unconfigured remix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured 0-based source lists, one per output channel.
    pub fn sources(&self) -> &[Vec<usize>] {
        &self.sources
    }
}

fn parse_list(stage: &str, position: usize, value: &str) -> Result<Vec<usize>, UsageError> {
    let param = format!("output {position}");
    if value.trim() == "0" {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|field| match field.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n - 1),
            _ => Err(UsageError::invalid(
                stage,
                &param,
                value,
                "expected 1-based channel numbers like 1,2",
            )),
        })
        .collect()
}

impl Stage for Remix {
    fn name(&self) -> &str {
        "remix"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL)
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(Self {
            sources: self.sources.clone(),
            mixer: None,
        })
    }

    fn configure(&mut self, args: &[String]) -> Result<(), UsageError> {
        if args.is_empty() {
            return Err(UsageError::count(self.name(), "one list per output channel", 0));
        }
        self.sources = args
            .iter()
            .enumerate()
            .map(|(i, arg)| parse_list("remix", i + 1, arg))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        if self.sources.len() != usize::from(output.channels) {
            return Err(StageError::Invalid(format!(
                "remix lists {} output channel(s) but the output has {}",
                self.sources.len(),
                output.channels
            )));
        }
        let map = ChannelMap::new(usize::from(input.channels), self.sources.clone())?;
        self.mixer = Some(FrameMixer::new(map));
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        match self.mixer.as_mut() {
            Some(mixer) => mixer.process(input, output),
            None => Flow::default(),
        }
    }

    fn drain(&mut self, output: &mut [Sample]) -> Drained {
        match self.mixer.as_mut() {
            Some(mixer) => mixer.drain(output),
            None => Drained::done(0),
        }
    }

    fn stop(&mut self) {
        self.mixer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(args: &[&str]) -> Remix {
        let mut remix = Remix::new();
        let args: Vec<String> = args.iter().map(|s| (*s).to_string()).collect();
        remix.configure(&args).unwrap();
        remix
    }

    #[test]
    fn parses_lists() {
        let remix = configured(&["1,2", "0", "2"]);
        assert_eq!(remix.sources(), &[vec![0, 1], vec![], vec![1]]);

        let mut remix = Remix::new();
        assert!(remix.configure(&[]).is_err());
        assert!(remix.configure(&["x".into()]).is_err());
        assert!(remix.configure(&["1,0".into()]).is_err());
    }

    #[test]
    fn swaps_channels() {
        let spec = SignalSpec::new(8000, 2);
        let mut remix = configured(&["2", "1"]);
        remix.start(&spec, &spec).unwrap();
        let mut out = [0.0; 4];
        assert_eq!(remix.process(&[1.0, 2.0, 3.0, 4.0], &mut out), Flow::new(4, 4));
        assert_eq!(out, [2.0, 1.0, 4.0, 3.0]);
    }

    #[test]
    fn output_count_must_match() {
        let mut remix = configured(&["1,2"]);
        let err = remix
            .start(&SignalSpec::new(8000, 2), &SignalSpec::new(8000, 2))
            .unwrap_err();
        assert!(matches!(err, StageError::Invalid(_)));
    }

    #[test]
    fn missing_input_channel_fails_start() {
        let mut remix = configured(&["3"]);
        assert!(
            remix
                .start(&SignalSpec::new(8000, 2), &SignalSpec::new(8000, 1))
                .is_err()
        );
    }

    #[test]
    fn duplicate_keeps_configuration() {
        let remix = configured(&["1,2"]);
        let mut copy = remix.duplicate();
        let out_spec = SignalSpec::new(8000, 1);
        copy.start(&SignalSpec::new(8000, 2), &out_spec).unwrap();
        let mut out = [0.0; 1];
        assert_eq!(copy.process(&[2.0, 4.0], &mut out), Flow::new(2, 1));
        assert_eq!(out, [3.0]);
    }
}
