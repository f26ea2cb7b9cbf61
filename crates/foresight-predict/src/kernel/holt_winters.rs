//! Holt-Winters triple exponential smoothing.
//!
//! Smoothing parameters are taken as given (no fitting). The initial
//! level, trend and seasonal indices come from the configured
//! initialization method:
//!
//! ```text
//! heuristic / estimated   centered moving-average decomposition of the
//!                         first few cycles, level and trend from an OLS
//!                         over the first ten trend points
//! legacy-heuristic        level = mean of season one, trend from season
//!                         two's differences, seasonals from season one
//! known                   caller-supplied values
//! ```
//!
//! Recurrences for observation `y` against season index `s`:
//!
//! ```text
//! level  = alpha * deseason(y, s) + (1 - alpha) * trended(level', damp(trend'))
//! trend  = beta * detrend(level, level') + (1 - beta) * damp(trend')
//! season = gamma * deseason(y, trended(level', damp(trend'))) + (1 - gamma) * s
//! ```

use foresight_state::{Component, InitializationMethod};
use serde::{Deserialize, Serialize};

use super::{KernelError, ceil_to_replicas};

/// Damping factor applied to the trend when `dampedTrend` is set.
pub const DAMPING: f64 = 0.98;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub series: Vec<f64>,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub trend: Component,
    pub seasonal: Component,
    pub seasonal_periods: usize,
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
}

/// Minimum observations the kernel accepts for a season length.
pub fn minimum_observations(seasonal_periods: usize) -> usize {
    10 + 2 * (seasonal_periods / 2)
}

#[derive(Debug, Clone, PartialEq)]
struct InitialState {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
}

/// One-step-ahead forecast, rounded up to a replica count.
pub fn forecast(params: &Parameters) -> Result<i32, KernelError> {
    let y = &params.series;
    let m = params.seasonal_periods;

    if m == 0 {
        return Err(KernelError::InvalidData(
            "seasonalPeriods must be at least 1".to_string(),
        ));
    }
    if y.len() < minimum_observations(m) {
        return Err(KernelError::InvalidData(format!(
            "must be at least 10 + 2 * (seasonal_periods // 2) = {} observations, got {}",
            minimum_observations(m),
            y.len()
        )));
    }
    let multiplicative =
        params.trend == Component::Multiplicative || params.seasonal == Component::Multiplicative;
    if multiplicative && y.iter().any(|v| *v <= 0.0) {
        return Err(KernelError::InvalidData(
            "multiplicative components require strictly positive data".to_string(),
        ));
    }

    let init = match params.initialization_method.unwrap_or_default() {
        InitializationMethod::Estimated | InitializationMethod::Heuristic => {
            heuristic(y, params.trend, params.seasonal, m)?
        }
        InitializationMethod::LegacyHeuristic => legacy_heuristic(y, params.trend, params.seasonal, m)?,
        InitializationMethod::Known => known(params, m)?,
    };

    let phi = if params.damped_trend.unwrap_or(false) {
        DAMPING
    } else {
        1.0
    };
    let smoothing = Smoothing {
        trend: params.trend,
        seasonal: params.seasonal,
        phi,
    };

    let mut level = init.level;
    let mut trend = init.trend;
    let mut season = init.seasonal;
    season.reserve(y.len());

    for (i, &obs) in y.iter().enumerate() {
        let s = season[i];
        let prev_level = level;
        let prev_trend = smoothing.damp(trend);
        let expected = smoothing.trended(prev_level, prev_trend);

        level = params.alpha * smoothing.deseason(obs, s) + (1.0 - params.alpha) * expected;
        trend = params.beta * smoothing.detrend(level, prev_level) + (1.0 - params.beta) * prev_trend;
        season.push(params.gamma * smoothing.deseason(obs, expected) + (1.0 - params.gamma) * s);
    }

    let next = smoothing.trended(level, smoothing.damp(trend));
    let value = smoothing.reseason(next, season[y.len()]);
    ceil_to_replicas(value)
}

struct Smoothing {
    trend: Component,
    seasonal: Component,
    phi: f64,
}

impl Smoothing {
    fn trended(&self, level: f64, trend: f64) -> f64 {
        match self.trend {
            Component::Additive => level + trend,
            Component::Multiplicative => level * trend,
        }
    }

    fn damp(&self, trend: f64) -> f64 {
        match self.trend {
            Component::Additive => self.phi * trend,
            Component::Multiplicative => trend.powf(self.phi),
        }
    }

    fn detrend(&self, level: f64, prev_level: f64) -> f64 {
        match self.trend {
            Component::Additive => level - prev_level,
            Component::Multiplicative => level / prev_level,
        }
    }

    fn deseason(&self, value: f64, season: f64) -> f64 {
        match self.seasonal {
            Component::Additive => value - season,
            Component::Multiplicative => value / season,
        }
    }

    fn reseason(&self, value: f64, season: f64) -> f64 {
        match self.seasonal {
            Component::Additive => value + season,
            Component::Multiplicative => value * season,
        }
    }
}

fn heuristic(
    y: &[f64],
    trend: Component,
    seasonal: Component,
    m: usize,
) -> Result<InitialState, KernelError> {
    let n = y.len();
    let min_obs = minimum_observations(m);
    if n < 10 {
        return Err(KernelError::InvalidData(
            "cannot use heuristic initialization with less than 10 observations".to_string(),
        ));
    }
    if n < 2 * m {
        return Err(KernelError::InvalidData(
            "cannot compute initial seasonals with less than two full seasonal cycles".to_string(),
        ));
    }
    if n < min_obs {
        return Err(KernelError::InvalidData(format!(
            "cannot use heuristic initialization with less than {min_obs} observations"
        )));
    }

    let k_cycles = (n / m).min(5).max(min_obs.div_ceil(m));
    let window = &y[..(k_cycles * m).min(n)];
    let moving = centered_moving_average(window, m);

    let mut sums = vec![0.0; m];
    let mut counts = vec![0usize; m];
    for (i, (value, average)) in window.iter().zip(&moving).enumerate() {
        if let Some(average) = average {
            let detrended = match seasonal {
                Component::Additive => value - average,
                Component::Multiplicative => value / average,
            };
            sums[i % m] += detrended;
            counts[i % m] += 1;
        }
    }
    if counts.contains(&0) {
        return Err(KernelError::InvalidData(
            "not enough observations to estimate every seasonal index".to_string(),
        ));
    }
    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, count)| sum / *count as f64)
        .collect();
    let mean = indices.iter().sum::<f64>() / m as f64;
    for index in &mut indices {
        match seasonal {
            Component::Additive => *index -= mean,
            Component::Multiplicative => *index /= mean,
        }
    }

    let trend_points: Vec<f64> = moving.iter().flatten().copied().take(10).collect();
    if trend_points.len() < 10 {
        return Err(KernelError::InvalidData(
            "not enough observations to estimate the initial level".to_string(),
        ));
    }
    let (intercept, slope) = fit_against_index(&trend_points);

    Ok(InitialState {
        level: intercept,
        trend: match trend {
            Component::Additive => slope,
            Component::Multiplicative => 1.0 + slope / intercept,
        },
        seasonal: indices,
    })
}

/// Centered moving average of width `m`; even widths use the 2×m form.
fn centered_moving_average(values: &[f64], m: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for value in values {
        prefix.push(prefix[prefix.len() - 1] + value);
    }
    let mean_of = |start: usize| (prefix[start + m] - prefix[start]) / m as f64;
    let half = m / 2;

    (0..n)
        .map(|i| {
            if i < half {
                return None;
            }
            let start = i - half;
            if m % 2 == 1 {
                (start + m <= n).then(|| mean_of(start))
            } else {
                (start + m < n).then(|| (mean_of(start) + mean_of(start + 1)) / 2.0)
            }
        })
        .collect()
}

/// Ordinary least squares of `points` against t = 1, 2, ..., returning
/// the intercept at t = 0 and the slope.
fn fit_against_index(points: &[f64]) -> (f64, f64) {
    let n = points.len() as f64;
    let t_mean = (n + 1.0) / 2.0;
    let y_mean = points.iter().sum::<f64>() / n;
    let (stt, sty) = points
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(stt, sty), (i, y)| {
            let dt = (i + 1) as f64 - t_mean;
            (stt + dt * dt, sty + dt * (y - y_mean))
        });
    let slope = sty / stt;
    (y_mean - slope * t_mean, slope)
}

fn legacy_heuristic(
    y: &[f64],
    trend: Component,
    seasonal: Component,
    m: usize,
) -> Result<InitialState, KernelError> {
    if y.len() < 2 * m {
        return Err(KernelError::InvalidData(
            "cannot compute initial seasonals with less than two full seasonal cycles".to_string(),
        ));
    }
    let first = &y[..m];
    let second = &y[m..2 * m];
    let level = first.iter().sum::<f64>() / m as f64;

    let initial_trend = match trend {
        Component::Additive => {
            second
                .iter()
                .zip(first)
                .map(|(later, earlier)| (later - earlier) / m as f64)
                .sum::<f64>()
                / m as f64
        }
        Component::Multiplicative => {
            second
                .iter()
                .zip(first)
                .map(|(later, earlier)| (later / earlier).powf(1.0 / m as f64))
                .sum::<f64>()
                / m as f64
        }
    };

    let indices = first
        .iter()
        .map(|value| match seasonal {
            Component::Additive => value - level,
            Component::Multiplicative => value / level,
        })
        .collect();

    Ok(InitialState {
        level,
        trend: initial_trend,
        seasonal: indices,
    })
}

fn known(params: &Parameters, m: usize) -> Result<InitialState, KernelError> {
    let missing = |field: &str| {
        KernelError::InvalidData(format!("{field} is required for known initialization"))
    };
    let level = params.initial_level.ok_or_else(|| missing("initialLevel"))?;
    let trend = params.initial_trend.ok_or_else(|| missing("initialTrend"))?;
    let seasonal = params.initial_seasonal.ok_or_else(|| missing("initialSeasonal"))?;
    Ok(InitialState {
        level,
        trend,
        seasonal: vec![seasonal; m],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(series: Vec<f64>, seasonal_periods: usize) -> Parameters {
        Parameters {
            series,
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.5,
            trend: Component::Additive,
            seasonal: Component::Additive,
            seasonal_periods,
            damped_trend: None,
            initialization_method: None,
            initial_level: None,
            initial_trend: None,
            initial_seasonal: None,
        }
    }

    #[test]
    fn minimum_observations_grows_with_season_length() {
        assert_eq!(minimum_observations(1), 10);
        assert_eq!(minimum_observations(3), 12);
        assert_eq!(minimum_observations(6), 16);
    }

    #[test]
    fn constant_series_forecasts_constant() {
        let p = params(vec![5.0; 12], 2);
        assert_eq!(forecast(&p).unwrap(), 5);
    }

    #[test]
    fn heuristic_recovers_alternating_season() {
        let series = [1.0, 3.0].repeat(6);
        let p = params(series, 2);
        // Next observation falls on the low phase: level 2, index -1.
        assert_eq!(forecast(&p).unwrap(), 1);
    }

    #[test]
    fn known_initialization_tracks_exact_trend() {
        let series: Vec<f64> = (1..=12).map(f64::from).collect();
        let mut p = params(series, 2);
        p.initialization_method = Some(InitializationMethod::Known);
        p.initial_level = Some(0.0);
        p.initial_trend = Some(1.0);
        p.initial_seasonal = Some(0.0);
        assert_eq!(forecast(&p).unwrap(), 13);
    }

    #[test]
    fn known_initialization_requires_values() {
        let mut p = params(vec![5.0; 12], 2);
        p.initialization_method = Some(InitializationMethod::Known);
        p.initial_level = Some(5.0);
        let err = forecast(&p).unwrap_err();
        assert!(err.to_string().contains("initialTrend"));
    }

    #[test]
    fn multiplicative_season_on_flat_data() {
        let mut p = params(vec![10.0; 12], 3);
        p.seasonal = Component::Multiplicative;
        p.initialization_method = Some(InitializationMethod::Known);
        p.initial_level = Some(10.0);
        p.initial_trend = Some(0.0);
        p.initial_seasonal = Some(1.0);
        assert_eq!(forecast(&p).unwrap(), 10);
    }

    #[test]
    fn multiplicative_rejects_non_positive_data() {
        let mut series = vec![10.0; 12];
        series[3] = 0.0;
        let mut p = params(series, 3);
        p.seasonal = Component::Multiplicative;
        assert!(forecast(&p).is_err());
    }

    #[test]
    fn damping_slows_the_trend() {
        let series: Vec<f64> = (1..=12).map(|v| f64::from(v) * 1000.0).collect();
        let mut p = params(series, 2);
        p.initialization_method = Some(InitializationMethod::Known);
        p.initial_level = Some(0.0);
        p.initial_trend = Some(1000.0);
        p.initial_seasonal = Some(0.0);

        let undamped = forecast(&p).unwrap();
        p.damped_trend = Some(true);
        let damped = forecast(&p).unwrap();

        assert_eq!(undamped, 13_000);
        assert!(damped < undamped);
    }

    #[test]
    fn legacy_heuristic_uses_first_seasons() {
        let init = legacy_heuristic(
            &[1.0, 3.0, 3.0, 5.0],
            Component::Additive,
            Component::Additive,
            2,
        )
        .unwrap();
        assert_eq!(init.level, 2.0);
        assert_eq!(init.trend, 1.0);
        assert_eq!(init.seasonal, vec![-1.0, 1.0]);
    }

    #[test]
    fn moving_average_even_width() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        let averaged = centered_moving_average(&values, 4);
        assert_eq!(averaged[0], None);
        assert_eq!(averaged[1], None);
        assert_eq!(averaged[2], Some(3.0));
        assert_eq!(averaged[5], Some(6.0));
        assert_eq!(averaged[6], None);
        assert_eq!(averaged[7], None);
    }

    #[test]
    fn moving_average_odd_width() {
        let values: Vec<f64> = (1..=5).map(f64::from).collect();
        let averaged = centered_moving_average(&values, 3);
        assert_eq!(averaged, vec![None, Some(2.0), Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn too_few_observations_is_an_error() {
        let p = params(vec![5.0; 11], 3);
        assert!(forecast(&p).is_err());
    }
}
