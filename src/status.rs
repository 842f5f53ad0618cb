//! Reduction of raw container states into the pod level summary.

use crate::model::{ContainerState, DataShapeError, Phase, RawContainerStatus};
use k8s_openapi::chrono::{DateTime, Utc};
use podglance_api::data::NormalizedStatus;
use std::fmt;
use tracing::warn;

/// The reason a waiting container reports while it is being restarted over and over.
pub const CRASH_LOOP_BACK_OFF: &str = "CrashLoopBackOff";

/// Container count shown for a pod which doesn't report any container statuses (yet).
pub const IMPLICIT_CONTAINER_COUNT: usize = 1;

/// A classification rule. Returns `None` if it doesn't apply.
type Rule = fn(Phase, &[RawContainerStatus]) -> Option<NormalizedStatus>;

/// Classification rules, evaluated in order. The first match wins.
const RULES: &[Rule] = &[crash_looping, running, terminal];

fn crash_looping(phase: Phase, statuses: &[RawContainerStatus]) -> Option<NormalizedStatus> {
    let crashing = statuses.iter().any(|status| {
        matches!(&status.state, ContainerState::Waiting { reason } if reason == CRASH_LOOP_BACK_OFF)
    });

    (phase == Phase::Running && crashing).then_some(NormalizedStatus::CrashLoopBackOff)
}

fn running(phase: Phase, _: &[RawContainerStatus]) -> Option<NormalizedStatus> {
    (phase == Phase::Running).then_some(NormalizedStatus::Running)
}

fn terminal(phase: Phase, _: &[RawContainerStatus]) -> Option<NormalizedStatus> {
    match phase {
        Phase::Succeeded => Some(NormalizedStatus::Succeeded),
        Phase::Failed => Some(NormalizedStatus::Failed),
        _ => None,
    }
}

/// Classify a pod from its phase and container statuses.
///
/// Anything not matched by a rule (`Pending`, `Unknown`) is reported as
/// [`NormalizedStatus::Unknown`].
pub fn classify(phase: Phase, statuses: &[RawContainerStatus]) -> NormalizedStatus {
    RULES
        .iter()
        .find_map(|rule| rule(phase, statuses))
        .unwrap_or(NormalizedStatus::Unknown)
}

/// Ready containers over total containers
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Readiness {
    pub ready: usize,
    pub total: usize,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ready, self.total)
    }
}

pub fn aggregate_readiness(statuses: &[RawContainerStatus]) -> Readiness {
    if statuses.is_empty() {
        return Readiness {
            ready: 0,
            total: IMPLICIT_CONTAINER_COUNT,
        };
    }

    Readiness {
        ready: statuses.iter().filter(|status| status.ready).count(),
        total: statuses.len(),
    }
}

/// Sum up the restart counts of all containers.
///
/// Negative counts are invalid data, they get logged and counted as zero.
pub fn aggregate_restarts(statuses: &[RawContainerStatus]) -> u64 {
    statuses
        .iter()
        .map(|status| match u64::try_from(status.restart_count) {
            Ok(count) => count,
            Err(_) => {
                let err = DataShapeError::NegativeRestartCount {
                    container: status.name.clone(),
                    count: status.restart_count,
                };
                warn!("Ignoring restart count: {err}");
                0
            }
        })
        .sum()
}

pub fn describe_container_state(status: &RawContainerStatus) -> String {
    match &status.state {
        ContainerState::Waiting { reason } => format!("Waiting: {reason}"),
        ContainerState::Terminated { reason, exit_code } => {
            format!("Terminated: {reason}, Exit Code: {exit_code}")
        }
        ContainerState::Running => "Running".to_string(),
        ContainerState::Unknown => "Unknown".to_string(),
    }
}

const MILLIS_PER_SECOND: f64 = 1_000.0;
const MILLIS_PER_MINUTE: f64 = 60.0 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: f64 = 60.0 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;
/// Months per day, averaged over the 400 year gregorian cycle
const MONTHS_PER_DAY: f64 = 4_800.0 / 146_097.0;

/// Render the time between `created` and `now` as a coarse, human friendly string.
///
/// The result reads like "3 hours ago" or "2 days ago". A creation time after `now` (clock skew)
/// reads like "in a few seconds". Each unit is rounded, and a unit is only used up to a
/// threshold before switching to the next larger one:
///
/// | range            | output           |
/// |------------------|------------------|
/// | up to 44 seconds | a few seconds    |
/// | up to 44 minutes | a minute, N minutes |
/// | up to 21 hours   | an hour, N hours |
/// | up to 25 days    | a day, N days    |
/// | up to 10 months  | a month, N months |
/// | beyond           | a year, N years  |
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let millis = now.signed_duration_since(created).num_milliseconds();
    let future = millis < 0;
    let millis = millis.unsigned_abs() as f64;

    let seconds = round(millis / MILLIS_PER_SECOND);
    let minutes = round(millis / MILLIS_PER_MINUTE);
    let hours = round(millis / MILLIS_PER_HOUR);
    let days = round(millis / MILLIS_PER_DAY);
    let months_exact = millis / MILLIS_PER_DAY * MONTHS_PER_DAY;
    let months = round(months_exact);
    let years = round(months_exact / 12.0);

    let amount = if seconds <= 44 {
        "a few seconds".to_string()
    } else if minutes <= 1 {
        "a minute".to_string()
    } else if minutes < 45 {
        format!("{minutes} minutes")
    } else if hours <= 1 {
        "an hour".to_string()
    } else if hours < 22 {
        format!("{hours} hours")
    } else if days <= 1 {
        "a day".to_string()
    } else if days < 26 {
        format!("{days} days")
    } else if months <= 1 {
        "a month".to_string()
    } else if months < 11 {
        format!("{months} months")
    } else if years <= 1 {
        "a year".to_string()
    } else {
        format!("{years} years")
    };

    if future {
        format!("in {amount}")
    } else {
        format!("{amount} ago")
    }
}

fn round(value: f64) -> u64 {
    value.round() as u64
}
