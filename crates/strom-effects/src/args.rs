//! Argument parsing shared by the stage `configure` implementations.

use core::ops::RangeInclusive;

use strom_core::UsageError;

/// Checks that `args.len()` lies in `min..=max`.
pub(crate) fn arity(
    stage: &str,
    args: &[String],
    min: usize,
    max: usize,
    expected: &str,
) -> Result<(), UsageError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(UsageError::count(stage, expected, args.len()))
    }
}

/// Parses a finite number.
pub(crate) fn number(stage: &str, param: &str, value: &str) -> Result<f32, UsageError> {
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_suffix("dB")
        .or_else(|| trimmed.strip_suffix("db"))
        .unwrap_or(trimmed);
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(UsageError::invalid(stage, param, value, "expected a number")),
    }
}

/// Parses a number and checks it against an inclusive range.
pub(crate) fn number_in(
    stage: &str,
    param: &str,
    value: &str,
    range: RangeInclusive<f32>,
) -> Result<f32, UsageError> {
    let v = number(stage, param, value)?;
    if range.contains(&v) {
        Ok(v)
    } else {
        Err(UsageError::invalid(
            stage,
            param,
            value,
            format!("must be between {} and {}", range.start(), range.end()),
        ))
    }
}

/// Parses a time position as `[[hh:]mm:]ss[.frac]`, in seconds.
pub(crate) fn seconds(stage: &str, param: &str, value: &str) -> Result<f64, UsageError> {
    let invalid = || UsageError::invalid(stage, param, value, "expected [[hh:]mm:]ss[.frac]");
    let fields: Vec<&str> = value.trim().split(':').collect();
    if fields.len() > 3 {
        return Err(invalid());
    }

    let mut total = 0.0f64;
    for (i, field) in fields.iter().enumerate() {
        let last = i + 1 == fields.len();
        let part: f64 = field.parse().map_err(|_| invalid())?;
        if !part.is_finite() || part < 0.0 || (!last && part.fract() != 0.0) {
            return Err(invalid());
        }
        total = total * 60.0 + part;
    }
    Ok(total)
}
