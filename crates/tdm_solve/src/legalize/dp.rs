//! Interval-partition dynamic program over one channel.
//!
//! The channel's variables are sorted forward first, then by value, and cut
//! into at most `limit` contiguous groups. Each group takes one discrete
//! choice `c`, holds at most `c` variables and never spans both directions.
//! `cost(idx, p)` is the least displacement `Σ |value − choice|` of the
//! suffix starting at `idx` with `p` slots left.
//!
//! Optional per-variable choice ranges restrict which choices a variable
//! may take; max-displacement legalization uses them to impose a radius.

use tdm_common::{InternalError, TdmResult};
use tdm_db::XdrChoices;

const INFEASIBLE: f64 = f64::INFINITY;

/// Inclusive range of choice indices a variable may take.
pub(crate) type ChoiceRange = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct Memo {
    cost: f64,
    /// `(choice index, group end)` of the best first group.
    best: Option<(usize, usize)>,
}

pub(crate) struct ChannelDp<'a> {
    values: &'a [f64],
    num_forward: usize,
    limit: usize,
    choices: &'a XdrChoices,
    ranges: Option<&'a [ChoiceRange]>,
    min_wire: Vec<usize>,
    memo: Vec<Option<Memo>>,
}

impl<'a> ChannelDp<'a> {
    /// `values` must be sorted with the `num_forward` forward variables
    /// first, each direction by ascending value.
    pub(crate) fn new(
        values: &'a [f64],
        num_forward: usize,
        limit: usize,
        choices: &'a XdrChoices,
        ranges: Option<&'a [ChoiceRange]>,
    ) -> Self {
        let mut dp = Self {
            values,
            num_forward,
            limit,
            choices,
            ranges,
            min_wire: Vec::new(),
            memo: vec![None; values.len() * limit],
        };
        dp.min_wire = dp.compute_min_wire();
        dp
    }

    /// Least number of groups needed for the suffix starting at `idx`.
    pub(crate) fn min_wire(&self, idx: usize) -> usize {
        self.min_wire.get(idx).copied().unwrap_or(0)
    }

    fn compute_min_wire(&self) -> Vec<usize> {
        let n = self.values.len();
        match self.ranges {
            None => {
                let max = self.choices.max() as usize;
                let backward = (n - self.num_forward).div_ceil(max);
                (0..n)
                    .map(|idx| {
                        if idx < self.num_forward {
                            (self.num_forward - idx).div_ceil(max) + backward
                        } else {
                            (n - idx).div_ceil(max)
                        }
                    })
                    .collect()
            }
            Some(ranges) => {
                // greedy chain: every group takes the largest allowed choice
                let mut wire = vec![0; n + 1];
                for idx in (0..n).rev() {
                    wire[idx] = 1 + wire[self.calc_end(idx, ranges[idx].1)];
                }
                wire.truncate(n);
                wire
            }
        }
    }

    /// One past the last variable a group starting at `idx` with choice
    /// index `c` can hold.
    fn calc_end(&self, idx: usize, c: usize) -> usize {
        let boundary = if idx < self.num_forward {
            self.num_forward
        } else {
            self.values.len()
        };
        let max_end = boundary.min(idx + self.choices.get(c) as usize);
        if let Some(ranges) = self.ranges {
            for i in idx + 1..max_end {
                let (lo, hi) = ranges[i];
                if c < lo || c > hi {
                    return i;
                }
            }
        }
        max_end
    }

    /// Least displacement of the whole channel within `limit` groups;
    /// infinite when no assignment fits.
    pub(crate) fn solve(&mut self) -> f64 {
        self.cost(0, self.limit)
    }

    fn cost(&mut self, idx: usize, p: usize) -> f64 {
        let n = self.values.len();
        if idx >= n {
            return 0.0;
        }
        if p == 0 {
            return INFEASIBLE;
        }
        let key = idx * self.limit + (p - 1);
        if let Some(memo) = self.memo[key] {
            return memo.cost;
        }

        let mut best = Memo {
            cost: INFEASIBLE,
            best: None,
        };
        if self.min_wire[idx] > p {
            self.memo[key] = Some(best);
            return best.cost;
        }

        let closest = self.choices.closest_idx(self.values[idx]);
        let (first, last) = match self.ranges {
            None => (closest, self.choices.len() - 1),
            Some(ranges) => (ranges[idx].0.max(closest), ranges[idx].1),
        };

        let mut prev_end = idx;
        for c in first..=last {
            let choice = self.choices.value(c);
            let mut min_end = prev_end + 1;
            let end = self.calc_end(idx, c);
            if min_end > end {
                break;
            }

            // variables already nearest to this choice always join the group
            while min_end < end && self.choices.closest(self.values[min_end]) == choice {
                min_end += 1;
            }

            // the next choice only needs to cover what this one cannot
            prev_end = min_end - 1;
            for cur in min_end..end {
                if self.values[cur] <= choice {
                    prev_end = cur;
                } else if self.ranges.is_some() {
                    break;
                }
            }

            let mut disp: f64 = self.values[idx..min_end]
                .iter()
                .map(|v| (v - choice).abs())
                .sum();
            let mut cur_best = INFEASIBLE;
            for cur_end in min_end..=end {
                if cur_end > min_end {
                    disp += (self.values[cur_end - 1] - choice).abs();
                }
                let ret = disp + self.cost(cur_end, p - 1);
                if disp > cur_best {
                    break;
                }
                if ret < cur_best {
                    cur_best = ret;
                    if ret < best.cost {
                        best = Memo {
                            cost: ret,
                            best: Some((c, cur_end)),
                        };
                    }
                }
            }
        }

        self.memo[key] = Some(best);
        best.cost
    }

    /// The chosen ratio of every variable, in input order, following the
    /// best decisions from `(0, limit)`.
    ///
    /// Only valid after [`solve`](Self::solve) returned a finite cost; every
    /// step of the walk then has a recorded decision.
    pub(crate) fn assignment(&self) -> TdmResult<Vec<f64>> {
        let n = self.values.len();
        let mut out = vec![0.0; n];
        let mut idx = 0;
        let mut p = self.limit;
        while idx < n {
            let decision = p
                .checked_sub(1)
                .and_then(|slot| self.memo[idx * self.limit + slot])
                .and_then(|memo| memo.best);
            let (c, end) = decision.ok_or_else(|| {
                InternalError::new(format!(
                    "no legalization decision for position {idx} with {p} slots left"
                ))
            })?;
            out[idx..end].fill(self.choices.value(c));
            idx = end;
            p -= 1;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn solve(
        values: &[f64],
        num_forward: usize,
        limit: usize,
        max: u32,
    ) -> (f64, Option<Vec<f64>>) {
        let choices = XdrChoices::new(max);
        let mut dp = ChannelDp::new(values, num_forward, limit, &choices, None);
        let cost = dp.solve();
        (cost, dp.assignment().ok())
    }

    /// Slots used when nets sharing a ratio in one direction are packed
    /// `ratio` to a slot.
    fn usage(values: &[f64], num_forward: usize) -> usize {
        let mut slots = 0;
        for part in [&values[..num_forward], &values[num_forward..]] {
            let mut sorted = part.to_vec();
            sorted.sort_by(f64::total_cmp);
            sorted.dedup();
            for r in sorted {
                let count = part.iter().filter(|&&v| v == r).count();
                slots += (count as f64 / r).ceil() as usize;
            }
        }
        slots
    }

    fn brute_force(values: &[f64], num_forward: usize, limit: usize, choices: &XdrChoices) -> f64 {
        let n = values.len();
        let k = choices.len();
        let mut best = INFEASIBLE;
        let mut digits = vec![0usize; n];
        loop {
            let assigned: Vec<f64> = digits.iter().map(|&d| choices.value(d)).collect();
            if usage(&assigned, num_forward) <= limit {
                let disp: f64 = values
                    .iter()
                    .zip(&assigned)
                    .map(|(v, c)| (v - c).abs())
                    .sum();
                best = best.min(disp);
            }
            let mut i = 0;
            while i < n {
                digits[i] += 1;
                if digits[i] < k {
                    break;
                }
                digits[i] = 0;
                i += 1;
            }
            if i == n {
                return best;
            }
        }
    }

    #[test]
    fn roomy_channel_rounds_to_nearest() {
        let (cost, out) = solve(&[2.5, 2.5, 9.0], 3, 3, 1600);
        assert!((cost - 4.0).abs() < 1e-12);
        assert_eq!(out.unwrap(), vec![1.0, 1.0, 8.0]);
    }

    #[test]
    fn tight_channel_groups_upwards() {
        let (cost, out) = solve(&[2.5, 2.5, 9.0], 3, 2, 1600);
        assert!((cost - 8.0).abs() < 1e-12);
        let out = out.unwrap();
        assert_eq!(out, vec![1.0, 8.0, 8.0]);
        assert!(usage(&out, 3) <= 2);
    }

    #[test]
    fn groups_never_span_directions() {
        // two forward and two backward nets, both near 8
        let (cost, out) = solve(&[7.0, 9.0, 7.5, 8.5], 2, 2, 64);
        assert!((cost - 3.0).abs() < 1e-12);
        assert_eq!(out.unwrap(), vec![8.0; 4]);
    }

    #[test]
    fn infeasible_channel_reports_infinity() {
        // five forward nets, largest choice 1, two slots
        let (cost, out) = solve(&[1.0; 5], 5, 2, 7);
        assert!(cost.is_infinite());
        assert!(out.is_none());
    }

    #[test]
    fn assignment_without_solve_is_internal_error() {
        let choices = XdrChoices::new(64);
        let values = [2.0, 9.0];
        let dp = ChannelDp::new(&values, 2, 2, &choices, None);
        let err = dp.assignment().unwrap_err();
        assert_eq!(
            err.message,
            "no legalization decision for position 0 with 2 slots left"
        );
    }

    #[test]
    fn min_wire_without_ranges() {
        let choices = XdrChoices::new(16);
        let values = [1.0; 40];
        let dp = ChannelDp::new(&values, 20, 10, &choices, None);
        // 20 forward + 20 backward at 16 per slot
        assert_eq!(dp.min_wire(0), 4);
        assert_eq!(dp.min_wire(19), 1 + 2);
        assert_eq!(dp.min_wire(20), 2);
        assert_eq!(dp.min_wire(39), 1);
    }

    #[test]
    fn min_wire_with_ranges_follows_chain() {
        let choices = XdrChoices::new(64);
        let values = [1.0, 1.0, 8.0, 8.0];
        // first two may only take ratio 1, the rest up to 8
        let ranges = [(0, 0), (0, 0), (0, 1), (0, 1)];
        let dp = ChannelDp::new(&values, 4, 4, &choices, Some(&ranges));
        assert_eq!(dp.min_wire(0), 3);
        assert_eq!(dp.min_wire(2), 1);
    }

    #[test]
    fn ranges_restrict_choices() {
        let choices = XdrChoices::new(64);
        let values = [3.0, 3.0, 3.0];
        // without ranges, one group of 8 would do
        let ranges = [(0, 0), (0, 1), (0, 1)];
        let mut dp = ChannelDp::new(&values, 3, 2, &choices, Some(&ranges));
        let cost = dp.solve();
        assert!((cost - (2.0 + 5.0 + 5.0)).abs() < 1e-12);
        assert_eq!(dp.assignment().unwrap(), vec![1.0, 8.0, 8.0]);
    }

    #[test]
    fn matches_brute_force_on_small_channels() {
        let choices = XdrChoices::new(32);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let n = rng.gen_range(1..=6);
            let num_forward = rng.gen_range(0..=n);
            let mut values: Vec<f64> = (0..n).map(|_| rng.gen_range(1.0..40.0)).collect();
            values[..num_forward].sort_by(f64::total_cmp);
            values[num_forward..].sort_by(f64::total_cmp);

            let mut dp = ChannelDp::new(&values, num_forward, 2, &choices, None);
            let cost = dp.solve();
            let expected = brute_force(&values, num_forward, 2, &choices);
            assert!(
                (cost - expected).abs() < 1e-9,
                "values {values:?} fwd {num_forward}: dp {cost} brute {expected}"
            );
            let out = dp.assignment().unwrap();
            assert!(usage(&out, num_forward) <= 2);
            let disp: f64 = values.iter().zip(&out).map(|(v, c)| (v - c).abs()).sum();
            assert!((disp - cost).abs() < 1e-9);
        }
    }
}
