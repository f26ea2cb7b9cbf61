//! Strategy selection — reduces the candidate replica counts to one.
//!
//! Candidates are the current demand followed by each model's forecast.

use foresight_state::DecisionType;

/// Reduce `candidates` to a single replica count. Empty input yields 0.
pub fn decide(decision: DecisionType, candidates: &[i32]) -> i32 {
    let mut sorted = candidates.to_vec();
    sorted.sort();

    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return 0;
    };

    match decision {
        DecisionType::Maximum => last,
        DecisionType::Minimum => first,
        DecisionType::Mean => {
            let total: i64 = sorted.iter().map(|&r| i64::from(r)).sum();
            (total as f64 / sorted.len() as f64).round() as i32
        }
        DecisionType::Median => {
            let half = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                ((i64::from(sorted[half - 1]) + i64::from(sorted[half])) / 2) as i32
            } else {
                sorted[half]
            }
        }
    }
}
