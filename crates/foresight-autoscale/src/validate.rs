//! Autoscaler validation — rejects ill-formed autoscalers before any side effect.

use foresight_state::{
    AutoscalerSpec, HookType, MetricSourceType, Model, ModelType, PredictiveAutoscaler,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("spec.maxReplicas ({max}) cannot be less than spec.minReplicas ({min})")]
    MaxBelowMin { max: i32, min: i32 },

    #[error(
        "spec.minReplicas can only be 0 if you have at least 1 object or external metric configured"
    )]
    ZeroMinWithoutObjectMetric,

    #[error("spec.syncPeriod must be greater than 0")]
    ZeroSyncPeriod,

    #[error("invalid model '{model}', type is '{kind}' but no Holt Winters configuration provided")]
    MissingHoltWinters { model: String, kind: ModelType },

    #[error("invalid model '{model}', type is '{kind}' but no Linear Regression configuration provided")]
    MissingLinear { model: String, kind: ModelType },

    #[error(
        "invalid model '{model}', runtimeTuningFetchHook is type '{hook}' but no {block} hook configuration provided"
    )]
    MissingHookConfig {
        model: String,
        hook: HookType,
        block: &'static str,
    },
}

/// Validate an autoscaler's spec.
pub fn validate(autoscaler: &PredictiveAutoscaler) -> Result<(), ValidationError> {
    validate_spec(&autoscaler.spec)
}

pub fn validate_spec(spec: &AutoscalerSpec) -> Result<(), ValidationError> {
    validate_min_max(spec)?;
    if spec.sync_period == Some(0) {
        return Err(ValidationError::ZeroSyncPeriod);
    }
    spec.models.iter().try_for_each(validate_model)
}

fn validate_min_max(spec: &AutoscalerSpec) -> Result<(), ValidationError> {
    let min = spec.min_replicas();
    if spec.max_replicas < min {
        return Err(ValidationError::MaxBelowMin {
            max: spec.max_replicas,
            min,
        });
    }

    if min == 0
        && !spec.metrics.iter().any(|m| {
            matches!(
                m.source,
                MetricSourceType::Object | MetricSourceType::External
            )
        })
    {
        return Err(ValidationError::ZeroMinWithoutObjectMetric);
    }
    Ok(())
}

fn validate_model(model: &Model) -> Result<(), ValidationError> {
    match model.kind {
        ModelType::HoltWinters => {
            let hw = model
                .holt_winters
                .as_ref()
                .ok_or_else(|| ValidationError::MissingHoltWinters {
                    model: model.name.clone(),
                    kind: model.kind,
                })?;

            if let Some(hook) = &hw.runtime_tuning_fetch_hook {
                let missing = match hook.kind {
                    HookType::Http if hook.http.is_none() => Some("HTTP"),
                    HookType::Shell if hook.shell.is_none() => Some("Shell"),
                    _ => None,
                };
                if let Some(block) = missing {
                    return Err(ValidationError::MissingHookConfig {
                        model: model.name.clone(),
                        hook: hook.kind,
                        block,
                    });
                }
            }
        }
        ModelType::Linear => {
            if model.linear.is_none() {
                return Err(ValidationError::MissingLinear {
                    model: model.name.clone(),
                    kind: model.kind,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use foresight_state::{
        Component, CrossVersionObjectReference, HoltWintersConfig, HookDefinition, LinearConfig,
        MetricSpec, MetricTarget, MetricTargetType,
    };

    fn spec() -> AutoscalerSpec {
        serde_json::from_value(serde_json::json!({
            "scaleTargetRef": {"kind": "Deployment", "name": "web"},
            "maxReplicas": 10,
            "metrics": [{"type": "Resource", "name": "cpu",
                         "target": {"type": "Utilization", "value": 50.0}}]
        }))
        .unwrap()
    }

    fn model(kind: ModelType) -> Model {
        Model {
            kind,
            name: "m".to_string(),
            per_sync_period: None,
            start_interval: None,
            reset_duration: None,
            calculation_timeout: None,
            linear: None,
            holt_winters: None,
        }
    }

    fn hw_config(hook: Option<HookDefinition>) -> HoltWintersConfig {
        HoltWintersConfig {
            alpha: Some(0.5),
            beta: Some(0.5),
            gamma: Some(0.5),
            trend: Component::Additive,
            seasonal: Component::Additive,
            seasonal_periods: 4,
            stored_seasons: 2,
            damped_trend: None,
            initialization_method: None,
            initial_level: None,
            initial_trend: None,
            initial_seasonal: None,
            runtime_tuning_fetch_hook: hook,
        }
    }

    #[test]
    fn accepts_minimal_spec() {
        let s = spec();
        assert_eq!(s.scale_target_ref, CrossVersionObjectReference {
            api_version: None,
            kind: "Deployment".to_string(),
            name: "web".to_string(),
        });
        assert!(validate_spec(&s).is_ok());
    }

    #[test]
    fn rejects_max_below_min() {
        let mut s = spec();
        s.min_replicas = Some(5);
        s.max_replicas = 3;
        let err = validate_spec(&s).unwrap_err();
        assert_eq!(
            err.to_string(),
            "spec.maxReplicas (3) cannot be less than spec.minReplicas (5)"
        );
    }

    #[test]
    fn zero_min_requires_object_or_external_metric() {
        let mut s = spec();
        s.min_replicas = Some(0);
        assert_eq!(
            validate_spec(&s).unwrap_err(),
            ValidationError::ZeroMinWithoutObjectMetric
        );

        s.metrics.push(MetricSpec {
            source: MetricSourceType::External,
            name: "queue_depth".to_string(),
            target: MetricTarget {
                kind: MetricTargetType::AverageValue,
                value: 30.0,
            },
        });
        assert!(validate_spec(&s).is_ok());
    }

    #[test]
    fn rejects_zero_sync_period() {
        let mut s = spec();
        s.sync_period = Some(0);
        assert_eq!(validate_spec(&s).unwrap_err(), ValidationError::ZeroSyncPeriod);

        s.sync_period = Some(1);
        assert!(validate_spec(&s).is_ok());
    }

    #[test]
    fn rejects_models_without_config() {
        let mut s = spec();
        s.models.push(model(ModelType::HoltWinters));
        assert_eq!(
            validate_spec(&s).unwrap_err().to_string(),
            "invalid model 'm', type is 'HoltWinters' but no Holt Winters configuration provided"
        );

        let mut s = spec();
        s.models.push(model(ModelType::Linear));
        assert_eq!(
            validate_spec(&s).unwrap_err().to_string(),
            "invalid model 'm', type is 'Linear' but no Linear Regression configuration provided"
        );

        let mut linear = model(ModelType::Linear);
        linear.linear = Some(LinearConfig {
            history_size: 6,
            look_ahead: 10,
        });
        let mut s = spec();
        s.models.push(linear);
        assert!(validate_spec(&s).is_ok());
    }

    #[test]
    fn rejects_hooks_without_matching_block() {
        let mut hw = model(ModelType::HoltWinters);
        hw.holt_winters = Some(hw_config(Some(HookDefinition {
            kind: HookType::Http,
            timeout: 1000,
            http: None,
            shell: None,
        })));
        let mut s = spec();
        s.models.push(hw.clone());
        assert_eq!(
            validate_spec(&s).unwrap_err().to_string(),
            "invalid model 'm', runtimeTuningFetchHook is type 'http' but no HTTP hook configuration provided"
        );

        if let Some(config) = hw.holt_winters.as_mut()
            && let Some(hook) = config.runtime_tuning_fetch_hook.as_mut()
        {
            hook.kind = HookType::Shell;
        }
        let mut s = spec();
        s.models.push(hw);
        assert!(matches!(
            validate_spec(&s).unwrap_err(),
            ValidationError::MissingHookConfig { block: "Shell", .. }
        ));
    }

    #[test]
    fn holt_winters_without_hook_is_valid() {
        let mut hw = model(ModelType::HoltWinters);
        hw.holt_winters = Some(hw_config(None));
        let mut s = spec();
        s.models.push(hw);
        assert!(validate_spec(&s).is_ok());
    }
}
