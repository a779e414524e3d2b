//! Smallest displacement radius a channel can be legalized within.
//!
//! Every radius that changes the allowed choice ranges is a distance
//! `|value − choice|`, so the search bisects over those breakpoints instead
//! of a continuous interval.

use tdm_db::XdrChoices;

use super::dp::{ChannelDp, ChoiceRange};

const RADIUS_SLACK: f64 = 1e-9;

/// Choice ranges within `radius` of each value.
pub(crate) fn choice_ranges(values: &[f64], choices: &XdrChoices, radius: f64) -> Vec<ChoiceRange> {
    values
        .iter()
        .map(|&v| {
            (
                choices.ceil_idx(v - radius - RADIUS_SLACK),
                choices.floor_idx(v + radius + RADIUS_SLACK),
            )
        })
        .collect()
}

/// Largest distance from a value to its nearest choice. No radius below
/// this admits every variable.
pub(crate) fn max_min_disp(values: &[f64], choices: &XdrChoices) -> f64 {
    values
        .iter()
        .map(|&v| (v - choices.closest(v)).abs())
        .fold(0.0, f64::max)
}

fn feasible(
    values: &[f64],
    num_forward: usize,
    limit: usize,
    choices: &XdrChoices,
    radius: f64,
) -> bool {
    let ranges = choice_ranges(values, choices, radius);
    let dp = ChannelDp::new(values, num_forward, limit, choices, Some(&ranges));
    dp.min_wire(0) <= limit
}

/// The smallest radius under which the channel fits `limit` slots, or
/// `None` if even unrestricted choices do not fit.
pub(crate) fn min_radius(
    values: &[f64],
    num_forward: usize,
    limit: usize,
    choices: &XdrChoices,
) -> Option<f64> {
    let floor = max_min_disp(values, choices);
    let mut candidates: Vec<f64> = values
        .iter()
        .flat_map(|&v| choices.values().iter().map(move |&c| (v - f64::from(c)).abs()))
        .filter(|&r| r >= floor)
        .collect();
    candidates.push(floor);
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();

    let (mut lo, mut hi) = (0, candidates.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if feasible(values, num_forward, limit, choices, candidates[mid]) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    candidates.get(lo).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_radius() {
        let choices = XdrChoices::new(64);
        let ranges = choice_ranges(&[9.0, 1.0, 30.0], &choices, 7.0);
        // 9 ± 7 covers {8, 16}; 1 + 7 covers {1, 8}; 30 ± 7 covers {24, 32}
        assert_eq!(ranges, vec![(1, 2), (0, 1), (3, 4)]);
    }

    #[test]
    fn floor_is_nearest_choice_distance() {
        let choices = XdrChoices::new(64);
        assert_eq!(max_min_disp(&[2.5, 9.0, 16.0], &choices), 1.5);
    }

    #[test]
    fn roomy_channel_needs_only_rounding() {
        let choices = XdrChoices::new(64);
        let r = min_radius(&[2.5, 2.5, 9.0], 3, 3, &choices).unwrap();
        assert_eq!(r, 1.5);
    }

    #[test]
    fn tight_channel_radius_is_tight() {
        let choices = XdrChoices::new(64);
        let values = [2.5, 2.5, 9.0];
        let r = min_radius(&values, 3, 1, &choices).unwrap();
        // one slot: all three share ratio 8, farthest is 2.5 -> 8
        assert_eq!(r, 5.5);
        assert!(feasible(&values, 3, 1, &choices, r));
        assert!(!feasible(&values, 3, 1, &choices, r - 1e-3));
    }

    #[test]
    fn unfittable_channel_has_no_radius() {
        let choices = XdrChoices::new(7);
        assert_eq!(min_radius(&[1.0; 4], 4, 2, &choices), None);
    }
}
