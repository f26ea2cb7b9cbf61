//! Resource types for the Foresight state store.
//!
//! These mirror the predictive autoscaler resource: the user-authored
//! spec, the controller-owned status, the per-autoscaler state document
//! holding model histories, and the scale subresource of a target
//! workload. Field names serialize in camelCase.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

pub const DEFAULT_MIN_REPLICAS: i32 = 1;
pub const DEFAULT_SYNC_PERIOD_MS: u64 = 15_000;
pub const DEFAULT_CPU_INITIALIZATION_PERIOD_SECS: u64 = 300;
pub const DEFAULT_INITIAL_READINESS_DELAY_SECS: u64 = 30;
pub const DEFAULT_TOLERANCE: f64 = 0.1;
pub const DEFAULT_PER_SYNC_PERIOD: i32 = 1;
pub const DEFAULT_CALCULATION_TIMEOUT_MS: u64 = 30_000;

/// Key under which a state document stores its JSON payload.
pub const STATE_DATA_KEY: &str = "data";

// ── Identity ───────────────────────────────────────────────────────

/// Namespaced identity of an autoscaler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Composite table key: `{namespace}/{name}`.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Parse a `{namespace}/{name}` key.
    pub fn parse(key: &str) -> Option<Self> {
        let (namespace, name) = key.split_once('/')?;
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(namespace, name))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object metadata carried by every stored resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub generation: i64,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Reference from a dependent object to the object owning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

/// Identity of the workload a scale subresource belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossVersionObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub kind: String,
    pub name: String,
}

impl fmt::Display for CrossVersionObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

// ── Durations ──────────────────────────────────────────────────────

/// A wall-clock duration written as a string such as `90s`, `500ms`,
/// `5m` or `1h30m`. A bare number is read as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallDuration(pub Duration);

impl WallDuration {
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.0).unwrap_or(chrono::Duration::MAX)
    }
}

impl TryFrom<String> for WallDuration {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_duration(&value)
            .map(WallDuration)
            .ok_or_else(|| format!("invalid duration '{value}'"))
    }
}

impl From<WallDuration> for String {
    fn from(value: WallDuration) -> Self {
        value.to_string()
    }
}

impl fmt::Display for WallDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.subsec_millis() == 0 {
            write!(f, "{}s", self.0.as_secs())
        } else {
            write!(f, "{}ms", self.0.as_millis())
        }
    }
}

/// Parse a duration string made of `<number><unit>` groups.
///
/// Units are `h`, `m`, `s` and `ms`; a bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let (unit, len) = if rest.starts_with("ms") {
            (Duration::from_millis(1), 2)
        } else if rest.starts_with('h') {
            (Duration::from_secs(3600), 1)
        } else if rest.starts_with('m') {
            (Duration::from_secs(60), 1)
        } else if rest.starts_with('s') {
            (Duration::from_secs(1), 1)
        } else {
            return None;
        };
        total = total.checked_add(unit.checked_mul(u32::try_from(value).ok()?)?)?;
        rest = &rest[len..];
    }
    Some(total)
}

// ── Metrics ────────────────────────────────────────────────────────

/// Where a metric comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricSourceType {
    Resource,
    Pods,
    Object,
    External,
}

/// How the measured value is compared against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricTargetType {
    Utilization,
    Value,
    AverageValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTarget {
    #[serde(rename = "type")]
    pub kind: MetricTargetType,
    pub value: f64,
}

/// A metric the autoscaler scales on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    #[serde(rename = "type")]
    pub source: MetricSourceType,
    pub name: String,
    pub target: MetricTarget,
}

/// Current value of a metric as last observed by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatus {
    pub name: String,
    pub current: f64,
}

// ── Scaling behavior ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectPolicy {
    Max,
    Min,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyType {
    Pods,
    Percent,
}

/// A single rate policy: at most `value` pods (or percent) per `periodSeconds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingPolicy {
    #[serde(rename = "type")]
    pub kind: PolicyType,
    pub value: i32,
    pub period_seconds: i32,
}

/// Rules for one scaling direction. Unset fields take the direction's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilization_window_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_policy: Option<SelectPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<ScalingPolicy>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingBehavior {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_up: Option<ScalingRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_down: Option<ScalingRules>,
}

// ── Hooks ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookType {
    Http,
    Shell,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::Http => "http",
            HookType::Shell => "shell",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    Body,
    Query,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpHook {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub success_codes: Vec<u16>,
    pub parameter_mode: ParameterMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellHook {
    pub entrypoint: String,
    #[serde(default)]
    pub command: Vec<String>,
}

/// An outbound call that supplies values at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDefinition {
    #[serde(rename = "type")]
    pub kind: HookType,
    /// Timeout in milliseconds.
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<ShellHook>,
}

impl HookDefinition {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

// ── Models ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    Linear,
    HoltWinters,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Linear => "Linear",
            ModelType::HoltWinters => "HoltWinters",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearConfig {
    /// Number of newest history points fed to the regression.
    pub history_size: usize,
    /// Seconds ahead of now to evaluate the fit at.
    pub look_ahead: i64,
}

/// Trend or seasonal component form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    #[serde(rename = "additive", alias = "add")]
    Additive,
    #[serde(rename = "multiplicative", alias = "mul")]
    Multiplicative,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitializationMethod {
    #[default]
    Estimated,
    Heuristic,
    Known,
    LegacyHeuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoltWintersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    pub trend: Component,
    pub seasonal: Component,
    pub seasonal_periods: usize,
    pub stored_seasons: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damped_trend: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialization_method: Option<InitializationMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_trend: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_seasonal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_tuning_fetch_hook: Option<HookDefinition>,
}

/// A prediction model declared on an autoscaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(rename = "type")]
    pub kind: ModelType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_sync_period: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_interval: Option<WallDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_duration: Option<WallDuration>,
    /// Milliseconds allowed for one prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear: Option<LinearConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holt_winters: Option<HoltWintersConfig>,
}

impl Model {
    pub fn per_sync_period(&self) -> i32 {
        self.per_sync_period.unwrap_or(DEFAULT_PER_SYNC_PERIOD)
    }

    pub fn calculation_timeout(&self) -> Duration {
        Duration::from_millis(
            self.calculation_timeout
                .unwrap_or(DEFAULT_CALCULATION_TIMEOUT_MS),
        )
    }
}

// ── Autoscaler ─────────────────────────────────────────────────────

/// How model forecasts and the current demand are reduced to one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionType {
    #[default]
    Maximum,
    Minimum,
    Mean,
    Median,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerSpec {
    pub scale_target_ref: CrossVersionObjectReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
    pub max_replicas: i32,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<ScalingBehavior>,
    /// Milliseconds between reconciliations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_period: Option<u64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_initialization_period: Option<u64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_readiness_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_type: Option<DecisionType>,
}

impl AutoscalerSpec {
    pub fn min_replicas(&self) -> i32 {
        self.min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS)
    }

    pub fn sync_period(&self) -> Duration {
        Duration::from_millis(self.sync_period.unwrap_or(DEFAULT_SYNC_PERIOD_MS))
    }

    pub fn cpu_initialization_period(&self) -> Duration {
        Duration::from_secs(
            self.cpu_initialization_period
                .unwrap_or(DEFAULT_CPU_INITIALIZATION_PERIOD_SECS),
        )
    }

    pub fn initial_readiness_delay(&self) -> Duration {
        Duration::from_secs(
            self.initial_readiness_delay
                .unwrap_or(DEFAULT_INITIAL_READINESS_DELAY_SECS),
        )
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }

    pub fn decision_type(&self) -> DecisionType {
        self.decision_type.unwrap_or_default()
    }
}

/// A replica count observed or decided at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedReplicas {
    pub time: DateTime<Utc>,
    pub replicas: i32,
}

impl TimestampedReplicas {
    pub fn new(time: DateTime<Utc>, replicas: i32) -> Self {
        Self { time, replicas }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerStatus {
    #[serde(default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scale_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_replicas: i32,
    #[serde(default)]
    pub desired_replicas: i32,
    #[serde(default)]
    pub scale_up_replica_history: Vec<TimestampedReplicas>,
    #[serde(default)]
    pub scale_down_replica_history: Vec<TimestampedReplicas>,
    #[serde(default)]
    pub scale_up_event_history: Vec<TimestampedReplicas>,
    #[serde(default)]
    pub scale_down_event_history: Vec<TimestampedReplicas>,
    #[serde(default)]
    pub current_metrics: Vec<MetricStatus>,
}

/// The predictive autoscaler resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveAutoscaler {
    pub metadata: ObjectMeta,
    pub spec: AutoscalerSpec,
    #[serde(default)]
    pub status: AutoscalerStatus,
}

impl PredictiveAutoscaler {
    pub const KIND: &'static str = "PredictiveHorizontalPodAutoscaler";

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    pub fn table_key(&self) -> String {
        self.key().table_key()
    }
}

// ── State document ─────────────────────────────────────────────────

/// Persisted history for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelHistory {
    #[serde(rename = "type")]
    pub kind: ModelType,
    pub sync_periods_passed: i32,
    #[serde(default)]
    pub replica_history: Vec<TimestampedReplicas>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

impl ModelHistory {
    /// A fresh history; the first tick is always eligible to predict.
    pub fn new(kind: ModelType) -> Self {
        Self {
            kind,
            sync_periods_passed: 1,
            replica_history: Vec::new(),
            start_time: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictiveAutoscalerData {
    #[serde(default)]
    pub model_histories: BTreeMap<String, ModelHistory>,
}

/// Side document co-located with an autoscaler, owned by it and
/// removed along with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub name: String,
    pub namespace: String,
    pub owner: OwnerReference,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl StateDocument {
    /// Name of the document belonging to the named autoscaler.
    pub fn document_name(autoscaler: &str) -> String {
        format!("{autoscaler}-foresight-data")
    }

    /// Table key of the document belonging to the given autoscaler.
    pub fn key_for(autoscaler: &ObjectKey) -> String {
        format!(
            "{}/{}",
            autoscaler.namespace,
            Self::document_name(&autoscaler.name)
        )
    }

    /// An empty document owned by the given autoscaler.
    pub fn for_autoscaler(autoscaler: &PredictiveAutoscaler) -> StateResult<Self> {
        let mut doc = Self {
            name: Self::document_name(&autoscaler.metadata.name),
            namespace: autoscaler.metadata.namespace.clone(),
            owner: OwnerReference {
                kind: PredictiveAutoscaler::KIND.to_string(),
                name: autoscaler.metadata.name.clone(),
                uid: autoscaler.metadata.uid.clone(),
            },
            data: BTreeMap::new(),
        };
        doc.store_data(&PredictiveAutoscalerData::default())?;
        Ok(doc)
    }

    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Whether this document is owned by the given autoscaler.
    pub fn is_owned_by(&self, autoscaler: &ObjectKey) -> bool {
        self.namespace == autoscaler.namespace
            && self.owner.kind == PredictiveAutoscaler::KIND
            && self.owner.name == autoscaler.name
    }

    /// Decode the model histories. A missing payload decodes as empty.
    pub fn load_data(&self) -> StateResult<PredictiveAutoscalerData> {
        match self.data.get(STATE_DATA_KEY) {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| StateError::Deserialize(e.to_string())),
            None => Ok(PredictiveAutoscalerData::default()),
        }
    }

    /// Replace the payload with the given model histories.
    pub fn store_data(&mut self, data: &PredictiveAutoscalerData) -> StateResult<()> {
        let raw = serde_json::to_string(data).map_err(|e| StateError::Serialize(e.to_string()))?;
        self.data.insert(STATE_DATA_KEY.to_string(), raw);
        Ok(())
    }
}

// ── Scale ──────────────────────────────────────────────────────────

/// Scale subresource of a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub namespace: String,
    pub target: CrossVersionObjectReference,
    pub replicas: i32,
    /// Label selector matching the workload's pods.
    #[serde(default)]
    pub selector: String,
}

impl Scale {
    pub fn key_for(namespace: &str, target: &CrossVersionObjectReference) -> String {
        format!("{namespace}/{}/{}", target.kind, target.name)
    }

    pub fn table_key(&self) -> String {
        Self::key_for(&self.namespace, &self.target)
    }
}

// ── Metric readings ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReading {
    pub name: String,
    pub value: f64,
    /// Pods contributing to the reading, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_pods: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

/// The latest readings for the pods matched by one selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReadings {
    pub namespace: String,
    pub selector: String,
    pub readings: Vec<MetricReading>,
}

impl MetricReadings {
    pub fn key_for(namespace: &str, selector: &str) -> String {
        format!("{namespace}/{selector}")
    }

    pub fn table_key(&self) -> String {
        Self::key_for(&self.namespace, &self.selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_round_trips_through_table_key() {
        let key = ObjectKey::new("prod", "web");
        assert_eq!(key.table_key(), "prod/web");
        assert_eq!(ObjectKey::parse("prod/web"), Some(key));
        assert_eq!(ObjectKey::parse("no-slash"), None);
        assert_eq!(ObjectKey::parse("a/b/c"), None);
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("5d"), None);
        assert_eq!(parse_duration("m5"), None);
    }

    #[test]
    fn component_accepts_short_aliases() {
        let add: Component = serde_json::from_str("\"add\"").unwrap();
        let mul: Component = serde_json::from_str("\"mul\"").unwrap();
        assert_eq!(add, Component::Additive);
        assert_eq!(mul, Component::Multiplicative);
        assert_eq!(serde_json::to_string(&add).unwrap(), "\"additive\"");
    }

    #[test]
    fn autoscaler_defaults_apply() {
        let json = r#"{
            "metadata": {"name": "web"},
            "spec": {
                "scaleTargetRef": {"kind": "Deployment", "name": "web"},
                "maxReplicas": 10,
                "models": [{
                    "type": "Linear",
                    "name": "lin",
                    "startInterval": "60s",
                    "linear": {"historySize": 6, "lookAhead": 10}
                }]
            }
        }"#;
        let autoscaler: PredictiveAutoscaler = serde_json::from_str(json).unwrap();
        let spec = &autoscaler.spec;

        assert_eq!(autoscaler.metadata.namespace, "default");
        assert_eq!(spec.min_replicas(), 1);
        assert_eq!(spec.sync_period(), Duration::from_millis(15_000));
        assert_eq!(spec.cpu_initialization_period(), Duration::from_secs(300));
        assert_eq!(spec.initial_readiness_delay(), Duration::from_secs(30));
        assert_eq!(spec.tolerance(), 0.1);
        assert_eq!(spec.decision_type(), DecisionType::Maximum);

        let model = &spec.models[0];
        assert_eq!(model.per_sync_period(), 1);
        assert_eq!(model.calculation_timeout(), Duration::from_millis(30_000));
        assert_eq!(
            model.start_interval.map(|d| d.as_duration()),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let json = r#"{"type": "Linear", "name": "m", "resetDuration": "soon"}"#;
        assert!(serde_json::from_str::<Model>(json).is_err());
    }

    #[test]
    fn state_document_data_layout() {
        let autoscaler: PredictiveAutoscaler = serde_json::from_str(
            r#"{"metadata": {"name": "web", "namespace": "prod"},
                "spec": {"scaleTargetRef": {"kind": "Deployment", "name": "web"}, "maxReplicas": 3}}"#,
        )
        .unwrap();

        let mut doc = StateDocument::for_autoscaler(&autoscaler).unwrap();
        assert_eq!(doc.name, "web-foresight-data");
        assert_eq!(doc.table_key(), StateDocument::key_for(&autoscaler.key()));
        assert!(doc.is_owned_by(&autoscaler.key()));
        assert!(doc.load_data().unwrap().model_histories.is_empty());

        let mut data = PredictiveAutoscalerData::default();
        let time = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut history = ModelHistory::new(ModelType::Linear);
        history.replica_history.push(TimestampedReplicas::new(time, 3));
        data.model_histories.insert("lin".to_string(), history);
        doc.store_data(&data).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&doc.data[STATE_DATA_KEY]).unwrap();
        let entry = &raw["modelHistories"]["lin"];
        assert_eq!(entry["type"], "Linear");
        assert_eq!(entry["syncPeriodsPassed"], 1);
        assert_eq!(entry["replicaHistory"][0]["replicas"], 3);
        assert_eq!(entry["replicaHistory"][0]["time"], "2024-01-01T00:00:00Z");
        assert!(entry.get("startTime").is_none());

        assert_eq!(doc.load_data().unwrap(), data);
    }
}
