//! Rule — a target snapshot to apply at (or after) a given time.
//!
//! A rule is either one-shot (`repeat` is zero) or repeating with a period of
//! at least [`MIN_REPEAT_INTERVAL`]. The scheduler calls [`Rule::tick`] once
//! per evaluation pass; the rule decides whether it fires and moves itself to
//! its next state (trigger time advanced past `now`, or disabled).

use std::collections::HashSet;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{PlugHubError, ValidationError};
use crate::id::DeviceId;
use crate::state::{DeviceState, StateSnapshot};
use crate::time::Timestamp;

/// Smallest accepted non-zero repeat period, bounding request frequency
/// against the remote controller.
pub const MIN_REPEAT_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Largest accepted repeat period (one hundred 365-day years).
pub const MAX_REPEAT_INTERVAL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A stored instruction to apply `target_state` at `trigger_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    pub target_state: StateSnapshot,
    /// Next time the rule is due. Always UTC; offsets are normalized on decode.
    pub trigger_time: Timestamp,
    /// Zero for one-shot rules.
    #[serde(rename = "repeatSecs", with = "crate::time::duration_secs", default)]
    pub repeat: Duration,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// What a single evaluation pass did with a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Disabled or not yet due; nothing changed.
    Idle,
    /// Due and fresh: its target state must be pushed.
    Fire,
    /// Due but older than the maximum age: advanced without pushing.
    Stale,
}

impl Tick {
    /// Whether the rule was mutated by this pass.
    #[must_use]
    pub fn changed(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    #[must_use]
    pub fn is_repeating(&self) -> bool {
        !self.repeat.is_zero()
    }

    /// Enabled and `trigger_time <= now`.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.enabled && self.trigger_time <= now
    }

    /// More than `max_age` has elapsed since `trigger_time`.
    #[must_use]
    pub fn is_stale(&self, now: Timestamp, max_age: TimeDelta) -> bool {
        now - self.trigger_time > max_age
    }

    /// Evaluate the rule at `now`, moving it to its next state when due.
    pub fn tick(&mut self, now: Timestamp, max_age: TimeDelta) -> Tick {
        if !self.is_due(now) {
            return Tick::Idle;
        }
        let stale = self.is_stale(now, max_age);
        self.advance(now);
        if stale { Tick::Stale } else { Tick::Fire }
    }

    /// Move a due rule past `now`: repeating rules get their trigger time
    /// advanced by whole periods until strictly after `now`, one-shot rules
    /// are disabled. A repeating rule whose next trigger cannot be
    /// represented is disabled as well.
    pub fn advance(&mut self, now: Timestamp) {
        let next = TimeDelta::from_std(self.repeat)
            .ok()
            .filter(|step| *step > TimeDelta::zero())
            .and_then(|step| next_trigger(self.trigger_time, step, now));
        match next {
            Some(next) => self.trigger_time = next,
            None => self.enabled = false,
        }
    }

    /// Intrinsic invariants: non-empty name, valid target values, and a
    /// repeat period that is zero or within
    /// [`MIN_REPEAT_INTERVAL`]..=[`MAX_REPEAT_INTERVAL`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.is_repeating() && self.repeat < MIN_REPEAT_INTERVAL {
            return Err(ValidationError::RepeatTooShort {
                actual: self.repeat,
                minimum: MIN_REPEAT_INTERVAL,
            });
        }
        if self.repeat > MAX_REPEAT_INTERVAL {
            return Err(ValidationError::RepeatTooLong {
                actual: self.repeat,
                maximum: MAX_REPEAT_INTERVAL,
            });
        }
        for (device, state) in self.target_state.iter() {
            if !state.is_valid() {
                return Err(ValidationError::InvalidStateValue {
                    device: device.clone(),
                    value: state.value(),
                });
            }
        }
        Ok(())
    }

    /// Full boundary validation: [`check`](Self::check) plus every target
    /// device must be in `known`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self, known: &HashSet<DeviceId>) -> Result<(), ValidationError> {
        self.check()?;
        self.target_state.validate(known)
    }
}

/// First `trigger + k * step` strictly after `now`, with `k >= 0` computed in
/// one division. `None` when the result falls outside the calendar range.
fn next_trigger(trigger: Timestamp, step: TimeDelta, now: Timestamp) -> Option<Timestamp> {
    let behind = as_nanos(now - trigger);
    let period = as_nanos(step);
    let periods = if behind < 0 { 0 } else { behind / period + 1 };
    let jump = from_nanos(periods.checked_mul(period)?)?;
    trigger.checked_add_signed(jump)
}

fn as_nanos(delta: TimeDelta) -> i128 {
    i128::from(delta.num_seconds()) * NANOS_PER_SEC + i128::from(delta.subsec_nanos())
}

fn from_nanos(nanos: i128) -> Option<TimeDelta> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SEC)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SEC)).ok()?;
    TimeDelta::new(secs, subsec)
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    name: Option<String>,
    target_state: StateSnapshot,
    trigger_time: Option<Timestamp>,
    repeat: Duration,
    enabled: Option<bool>,
}

impl RuleBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn target(mut self, device: impl Into<DeviceId>, state: DeviceState) -> Self {
        self.target_state.insert(device.into(), state);
        self
    }

    #[must_use]
    pub fn target_state(mut self, target_state: StateSnapshot) -> Self {
        self.target_state = target_state;
        self
    }

    #[must_use]
    pub fn trigger_time(mut self, trigger_time: Timestamp) -> Self {
        self.trigger_time = Some(trigger_time);
        self
    }

    #[must_use]
    pub fn repeat(mut self, repeat: Duration) -> Self {
        self.repeat = repeat;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Consume the builder, check invariants, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`PlugHubError::Validation`] if [`Rule::check`] fails.
    pub fn build(self) -> Result<Rule, PlugHubError> {
        let rule = Rule {
            name: self.name.unwrap_or_default(),
            target_state: self.target_state,
            trigger_time: self.trigger_time.unwrap_or_else(crate::time::now),
            repeat: self.repeat,
            enabled: self.enabled.unwrap_or(true),
        };
        rule.check().map_err(PlugHubError::from)?;
        Ok(rule)
    }
}
