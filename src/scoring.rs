//! Value and selection policy
//!
//! Pure functions behind split selection: the stop value of a subset, the
//! RAVE mixing coefficient, and the UCB1 score of each candidate split.
use crate::constants::UNTRIED_SPLIT_SCORE;

/// Value of predicting the majority class of a subset without splitting
/// further. `label_counts` are the subset's (negative, positive) counts;
/// the totals are the whole dataset's class counts and must be non-zero.
pub fn stop_value(label_counts: (usize, usize), total_negative: usize, total_positive: usize) -> f64 {
    let (negative, positive) = label_counts;
    f64::max(
        negative as f64 / (2 * total_negative) as f64,
        positive as f64 / (2 * total_positive) as f64,
    )
}

/// RAVE mixing coefficient. Decays toward zero as a node accumulates
/// visits, shifting scoring from the RAVE bias to the per-split
/// statistics.
pub fn beta(num_visits: usize, k: f64) -> f64 {
    (k / (3.0 * num_visits as f64 + k)).sqrt()
}

/// UCB1 score for each candidate split.
///
/// * `num_visits` - visits to the node being scored.
/// * `split_visits` - accumulated visits to each candidate's expanded sides.
/// * `split_values` - actual average value of each candidate's expanded sides.
/// * `rave_values` - RAVE average for each candidate.
///
/// A candidate with no recorded visits scores [`UNTRIED_SPLIT_SCORE`], so
/// untried splits are explored before any scored one.
pub fn ucb1_scores(
    num_visits: usize,
    split_visits: &[usize],
    split_values: &[f64],
    rave_values: &[f64],
    beta: f64,
    exploration: f64,
) -> Vec<f64> {
    split_visits
        .iter()
        .zip(split_values.iter())
        .zip(rave_values.iter())
        .map(|((&na, &va), &ra)| {
            if na == 0 {
                UNTRIED_SPLIT_SCORE
            } else {
                beta * ra + (1.0 - beta) * va + exploration * ((num_visits as f64).ln() / na as f64).sqrt()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_value_majority_class() {
        // 3 of 4 negatives and 1 of 6 positives in the subset
        let v = stop_value((3, 1), 4, 6);
        assert!((v - 0.375).abs() < 1e-12);
        // majority flips to the positive class
        let v = stop_value((0, 6), 4, 6);
        assert!((v - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_beta_decays_with_visits() {
        let k = 1.0;
        assert!((beta(0, k) - 1.0).abs() < 1e-12);
        let mut prev = beta(1, k);
        for n in [10, 100, 1000] {
            let b = beta(n, k);
            assert!(b < prev);
            prev = b;
        }
        assert!(beta(1_000_000, k) < 1e-2);
    }

    #[test]
    fn test_ucb1_untried_split_sentinel() {
        let scores = ucb1_scores(5, &[0, 3], &[0.0, 0.4], &[0.0, 0.6], 0.5, 1.0);
        assert_eq!(scores[0], UNTRIED_SPLIT_SCORE);
        assert!(scores[1] < UNTRIED_SPLIT_SCORE);
    }

    #[test]
    fn test_ucb1_mixing() {
        // beta = 1 scores pure RAVE, beta = 0 pure split value
        let scores = ucb1_scores(2, &[2], &[0.4], &[0.8], 1.0, 0.0);
        assert!((scores[0] - 0.8).abs() < 1e-12);
        let scores = ucb1_scores(2, &[2], &[0.4], &[0.8], 0.0, 0.0);
        assert!((scores[0] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_ucb1_exploration_bonus() {
        let low = ucb1_scores(8, &[4], &[0.4], &[0.4], 0.0, 0.0)[0];
        let high = ucb1_scores(8, &[4], &[0.4], &[0.4], 0.0, 1.0)[0];
        assert!(high > low);
        let expected = 0.4 + (8.0_f64.ln() / 4.0).sqrt();
        assert!((high - expected).abs() < 1e-12);
    }
}
