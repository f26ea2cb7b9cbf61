//! Least-squares linear regression over a replica history.
//!
//! Each point is placed at `x = (now + lookAhead) - time` in seconds, so
//! the forecast is the fitted intercept at `x = 0`.

use chrono::{DateTime, Utc};
use foresight_state::TimestampedReplicas;
use serde::{Deserialize, Serialize};

use super::{KernelError, ceil_to_replicas};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// Seconds ahead of now to forecast.
    pub look_ahead: i64,
    pub replica_history: Vec<TimestampedReplicas>,
}

/// Forecast the replica count `lookAhead` seconds after `now`.
pub fn predict(params: &Parameters, now: DateTime<Utc>) -> Result<i32, KernelError> {
    if params.replica_history.is_empty() {
        return Err(KernelError::InvalidData("no replica history provided".to_string()));
    }

    let search_time = now + chrono::Duration::seconds(params.look_ahead);
    let points: Vec<(f64, f64)> = params
        .replica_history
        .iter()
        .map(|point| {
            let x = (search_time - point.time).num_milliseconds() as f64 / 1000.0;
            (x, f64::from(point.replicas))
        })
        .collect();

    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - x_mean;
        (sxx + dx * dx, sxy + dx * (y - y_mean))
    });

    // All points at the same instant: the best fit is the mean.
    let intercept = if sxx <= f64::EPSILON {
        y_mean
    } else {
        y_mean - (sxy / sxx) * x_mean
    };

    Ok(ceil_to_replicas(intercept)?.max(0))
}
