//! Ramping virtual-user profiles
//!
//! A profile is an ordered list of stages. Starting from zero VUs, each stage
//! ramps linearly from the previous stage's target to its own target over its
//! duration.

use crate::error::{LoadgenError, Result};
use std::fmt;
use std::time::Duration;

/// A time-boxed target concurrency level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    pub const fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }

    /// Parse a `<duration>:<target>` pair such as `1m30s:100`
    pub fn parse(s: &str) -> Result<Self> {
        let (duration, target) = s.trim().split_once(':').ok_or_else(|| {
            LoadgenError::InvalidStage(format!("'{}' is not <duration>:<target>", s))
        })?;

        let duration = parse_duration(duration)?;
        let target = target
            .trim()
            .parse::<u64>()
            .map_err(|_| LoadgenError::InvalidStage(format!("invalid target in '{}'", s)))?;

        Ok(Self { duration, target })
    }
}

/// Piecewise-linear VU ramp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProfile {
    stages: Vec<Stage>,
}

impl LoadProfile {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Parse a comma-separated stage list, e.g. `10s:5,20s:10,10s:0`
    pub fn parse(s: &str) -> Result<Self> {
        let stages = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Stage::parse)
            .collect::<Result<Vec<_>>>()?;
        if stages.is_empty() {
            return Err(LoadgenError::InvalidStage(
                "a profile needs at least one stage".to_string(),
            ));
        }
        stages
            .iter()
            .try_fold(Duration::ZERO, |total, stage| total.checked_add(stage.duration))
            .ok_or_else(|| {
                LoadgenError::InvalidStage(format!("total duration of '{}' is too long", s))
            })?;
        Ok(Self::new(stages))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Sum of the stage durations, saturating at `Duration::MAX`
    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |total, s| total.saturating_add(s.duration))
    }

    pub fn max_target(&self) -> u64 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Target VU count `elapsed` into the run.
    ///
    /// Interpolated values are truncated toward zero, so a ramp up reaches
    /// each whole VU slightly late and a ramp down releases it slightly late.
    pub fn target_at(&self, elapsed: Duration) -> u64 {
        let mut from = 0u64;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start.saturating_add(stage.duration);
            if elapsed < stage_end {
                let into = (elapsed - stage_start).as_nanos() as i128;
                let len = stage.duration.as_nanos() as i128;
                let delta = stage.target as i128 - from as i128;
                return (from as i128 + delta * into / len) as u64;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        from
    }
}

impl fmt::Display for LoadProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}->{}", stage.duration, stage.target)?;
        }
        Ok(())
    }
}

/// Parse a duration string with `ms`, `s`, `m` or `h` units.
///
/// Components can be chained (`1m30s`). A bare number is rejected.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(LoadgenError::InvalidDuration(
            "duration cannot be empty".to_string(),
        ));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(LoadgenError::InvalidDuration(format!(
                "expected a number in '{}'",
                input
            )));
        }
        let value: u64 = rest[..digits].parse().map_err(|_| {
            LoadgenError::InvalidDuration(format!("number too large in '{}'", input))
        })?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let secs_per_unit = match unit {
            "ms" => None,
            "s" => Some(1),
            "m" => Some(60),
            "h" => Some(60 * 60),
            "" => {
                return Err(LoadgenError::InvalidDuration(format!(
                    "missing unit in '{}'",
                    input
                )));
            }
            other => {
                return Err(LoadgenError::InvalidDuration(format!(
                    "unknown unit '{}' in '{}'. Use 'ms', 's', 'm' or 'h'",
                    other, input
                )));
            }
        };
        let part = match secs_per_unit {
            None => Some(Duration::from_millis(value)),
            Some(n) => value.checked_mul(n).map(Duration::from_secs),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| LoadgenError::InvalidDuration(format!("'{}' is too long", input)))?;
    }

    Ok(total)
}
