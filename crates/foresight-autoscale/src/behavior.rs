//! Scaling behavior — stabilization windows, rate policies and bounds.
//!
//! Follows the stock horizontal autoscaler rules:
//!
//! ```text
//! upMin    = min(target, scale-up recommendations in window)
//! downMax  = max(target, scale-down recommendations in window)
//! S        = clamp(current, upMin, downMax)
//!
//! scale up:    S = min(S, max(select(policies, periodStart + allowance), current))
//! scale down:  S = max(S, min(select(policies, periodStart - allowance), current))
//!
//! desired  = clamp(S, minReplicas, maxReplicas)
//! ```
//!
//! `periodStart` is the replica count at the start of a policy's period,
//! reconstructed from the recorded scale events.

use chrono::{DateTime, Duration, Utc};
use foresight_state::{
    PolicyType, ScalingBehavior, ScalingPolicy, ScalingRules, SelectPolicy, TimestampedReplicas,
};

pub const DEFAULT_SCALE_UP_STABILIZATION_SECS: i32 = 0;
pub const DEFAULT_SCALE_DOWN_STABILIZATION_SECS: i32 = 300;

/// Rules for one direction with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    pub stabilization_window_seconds: i32,
    pub select_policy: SelectPolicy,
    pub policies: Vec<ScalingPolicy>,
}

impl Rules {
    /// Scale-up defaults: double or add four pods per minute, whichever is more.
    pub fn default_scale_up() -> Self {
        Self {
            stabilization_window_seconds: DEFAULT_SCALE_UP_STABILIZATION_SECS,
            select_policy: SelectPolicy::Max,
            policies: vec![
                ScalingPolicy {
                    kind: PolicyType::Percent,
                    value: 100,
                    period_seconds: 60,
                },
                ScalingPolicy {
                    kind: PolicyType::Pods,
                    value: 4,
                    period_seconds: 60,
                },
            ],
        }
    }

    /// Scale-down defaults: anything down to zero per minute, after five
    /// minutes of stabilization.
    pub fn default_scale_down() -> Self {
        Self {
            stabilization_window_seconds: DEFAULT_SCALE_DOWN_STABILIZATION_SECS,
            select_policy: SelectPolicy::Max,
            policies: vec![ScalingPolicy {
                kind: PolicyType::Percent,
                value: 100,
                period_seconds: 60,
            }],
        }
    }

    /// Overlay the fields set in `rules` onto `self`.
    fn overlay(mut self, rules: Option<&ScalingRules>) -> Self {
        let Some(rules) = rules else {
            return self;
        };
        if let Some(window) = rules.stabilization_window_seconds {
            self.stabilization_window_seconds = window;
        }
        if let Some(select) = rules.select_policy {
            self.select_policy = select;
        }
        if let Some(policies) = &rules.policies {
            self.policies = policies.clone();
        }
        self
    }

    /// Longest look-back of any policy, in seconds.
    pub fn longest_policy_period(&self) -> i32 {
        self.policies
            .iter()
            .map(|p| p.period_seconds)
            .max()
            .unwrap_or(0)
            .max(0)
    }
}

/// Behavior for both directions with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Behavior {
    pub scale_up: Rules,
    pub scale_down: Rules,
}

impl Behavior {
    pub fn with_defaults(behavior: Option<&ScalingBehavior>) -> Self {
        Self {
            scale_up: Rules::default_scale_up()
                .overlay(behavior.and_then(|b| b.scale_up.as_ref())),
            scale_down: Rules::default_scale_down()
                .overlay(behavior.and_then(|b| b.scale_down.as_ref())),
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self::with_defaults(None)
    }
}

/// Recommendation and event histories a decision is made against.
#[derive(Debug, Clone, Copy)]
pub struct Histories<'a> {
    pub scale_up_replicas: &'a [TimestampedReplicas],
    pub scale_down_replicas: &'a [TimestampedReplicas],
    pub scale_up_events: &'a [TimestampedReplicas],
    pub scale_down_events: &'a [TimestampedReplicas],
}

/// Keep only entries strictly newer than `now - window_seconds`.
pub fn prune_to_window(
    history: &[TimestampedReplicas],
    window_seconds: i32,
    now: DateTime<Utc>,
) -> Vec<TimestampedReplicas> {
    let cutoff = now - Duration::seconds(i64::from(window_seconds));
    history
        .iter()
        .filter(|entry| entry.time > cutoff)
        .cloned()
        .collect()
}

/// Decide the replica count to scale to.
pub fn decide(
    behavior: &Behavior,
    current: i32,
    target: i32,
    min_replicas: i32,
    max_replicas: i32,
    histories: Histories<'_>,
    now: DateTime<Utc>,
) -> i32 {
    let stabilized = stabilize(behavior, current, target, histories, now);

    let limited = if stabilized > current {
        let ceiling = scale_up_limit(&behavior.scale_up, current, histories, now);
        stabilized.min(ceiling)
    } else if stabilized < current {
        let floor = scale_down_limit(&behavior.scale_down, current, histories, now);
        stabilized.max(floor)
    } else {
        stabilized
    };

    limited.clamp(min_replicas, max_replicas.max(min_replicas))
}

/// Hold the current count between the lowest recent scale-up
/// recommendation and the highest recent scale-down recommendation.
pub fn stabilize(
    behavior: &Behavior,
    current: i32,
    target: i32,
    histories: Histories<'_>,
    now: DateTime<Utc>,
) -> i32 {
    let up_cutoff = now - Duration::seconds(i64::from(behavior.scale_up.stabilization_window_seconds));
    let down_cutoff =
        now - Duration::seconds(i64::from(behavior.scale_down.stabilization_window_seconds));

    let up_min = histories
        .scale_up_replicas
        .iter()
        .filter(|r| r.time > up_cutoff)
        .map(|r| r.replicas)
        .fold(target, i32::min);
    let down_max = histories
        .scale_down_replicas
        .iter()
        .filter(|r| r.time > down_cutoff)
        .map(|r| r.replicas)
        .fold(target, i32::max);

    let mut stabilized = current;
    if stabilized < up_min {
        stabilized = up_min;
    }
    if stabilized > down_max {
        stabilized = down_max;
    }
    stabilized
}

fn events_in_period(events: &[TimestampedReplicas], period_seconds: i32, now: DateTime<Utc>) -> i32 {
    let cutoff = now - Duration::seconds(i64::from(period_seconds));
    events
        .iter()
        .filter(|e| e.time > cutoff)
        .map(|e| e.replicas)
        .sum()
}

/// Highest count the scale-up policies allow from `current`.
pub fn scale_up_limit(
    rules: &Rules,
    current: i32,
    histories: Histories<'_>,
    now: DateTime<Utc>,
) -> i32 {
    if rules.select_policy == SelectPolicy::Disabled {
        return current;
    }

    let proposals = rules.policies.iter().map(|policy| {
        let period_start = current
            - events_in_period(histories.scale_up_events, policy.period_seconds, now)
            + events_in_period(histories.scale_down_events, policy.period_seconds, now);
        match policy.kind {
            PolicyType::Pods => period_start.saturating_add(policy.value),
            PolicyType::Percent => {
                let factor = 1.0 + f64::from(policy.value) / 100.0;
                (f64::from(period_start) * factor).ceil() as i32
            }
        }
    });

    let selected = match rules.select_policy {
        SelectPolicy::Min => proposals.min(),
        _ => proposals.max(),
    };
    selected.unwrap_or(current).max(current)
}

/// Lowest count the scale-down policies allow from `current`.
pub fn scale_down_limit(
    rules: &Rules,
    current: i32,
    histories: Histories<'_>,
    now: DateTime<Utc>,
) -> i32 {
    if rules.select_policy == SelectPolicy::Disabled {
        return current;
    }

    let proposals = rules.policies.iter().map(|policy| {
        let period_start = current
            - events_in_period(histories.scale_up_events, policy.period_seconds, now)
            + events_in_period(histories.scale_down_events, policy.period_seconds, now);
        match policy.kind {
            PolicyType::Pods => period_start.saturating_sub(policy.value),
            PolicyType::Percent => {
                let factor = 1.0 - f64::from(policy.value) / 100.0;
                (f64::from(period_start) * factor).floor() as i32
            }
        }
    });

    // The most permissive scale-down is the lowest proposal.
    let selected = match rules.select_policy {
        SelectPolicy::Min => proposals.max(),
        _ => proposals.min(),
    };
    selected.unwrap_or(current).min(current)
}
