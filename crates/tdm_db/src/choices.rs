//! The discrete TDM ratio choice set `{1, 8, 16, ..., max}`.
//!
//! Index 0 is ratio 1 and index `i >= 1` is ratio `8 * i`, so every
//! nearest/ceil/floor query is a constant-time division by the step.

/// Spacing between consecutive choices above 1.
pub const CHOICE_STEP: u32 = 8;

/// An ordered set of legal TDM ratios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XdrChoices {
    values: Vec<u32>,
}

impl XdrChoices {
    /// Builds `{1, 8, 16, ..., max}`. `max` is rounded down to a multiple of
    /// the step; a `max` below the step yields the single choice `{1}`.
    pub fn new(max: u32) -> Self {
        let mut values = vec![1];
        values.extend((1..=max / CHOICE_STEP).map(|i| i * CHOICE_STEP));
        Self { values }
    }

    /// Number of choices.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; the set contains at least ratio 1.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All choices in ascending order.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// The choice at `idx`.
    pub fn get(&self, idx: usize) -> u32 {
        self.values[idx]
    }

    /// The choice at `idx`, as a float.
    pub fn value(&self, idx: usize) -> f64 {
        f64::from(self.values[idx])
    }

    /// The largest choice.
    pub fn max(&self) -> u32 {
        self.values[self.values.len() - 1]
    }

    fn last_idx(&self) -> usize {
        self.values.len() - 1
    }

    /// Appends the next multiple of the step. Used when widening the set for
    /// an infeasible channel.
    pub fn push_next(&mut self) -> u32 {
        let next = if self.max() == 1 {
            CHOICE_STEP
        } else {
            self.max() + CHOICE_STEP
        };
        self.values.push(next);
        next
    }

    /// Index of the choice nearest to `val`; ties go to the larger choice.
    pub fn closest_idx(&self, val: f64) -> usize {
        if val <= 1.0 {
            return 0;
        }
        if val >= f64::from(self.max()) {
            return self.last_idx();
        }
        let step = f64::from(CHOICE_STEP);
        let lb = (val / step).floor() as usize;
        let ub = ((val / step).ceil() as usize).min(self.last_idx());
        if val - self.value(lb) < self.value(ub) - val {
            lb
        } else {
            ub
        }
    }

    /// The choice nearest to `val`.
    pub fn closest(&self, val: f64) -> f64 {
        self.value(self.closest_idx(val))
    }

    /// Index of the smallest choice `>= val` (clamped to the last choice).
    pub fn ceil_idx(&self, val: f64) -> usize {
        if val <= 1.0 {
            return 0;
        }
        ((val / f64::from(CHOICE_STEP)).ceil() as usize).min(self.last_idx())
    }

    /// The smallest choice `>= val`.
    pub fn ceil(&self, val: f64) -> f64 {
        self.value(self.ceil_idx(val))
    }

    /// Index of the largest choice `<= val` (clamped to the first choice).
    pub fn floor_idx(&self, val: f64) -> usize {
        let val = val.min(f64::from(self.max()));
        if val <= 1.0 {
            return 0;
        }
        (val / f64::from(CHOICE_STEP)).floor() as usize
    }

    /// The largest choice `<= val`.
    pub fn floor(&self, val: f64) -> f64 {
        self.value(self.floor_idx(val))
    }

    /// Whether `val` is exactly one of the choices.
    pub fn is_legal(&self, val: f64) -> bool {
        if val == 1.0 {
            return true;
        }
        val >= f64::from(CHOICE_STEP)
            && val <= f64::from(self.max())
            && val.fract() == 0.0
            && (val as u64) % u64::from(CHOICE_STEP) == 0
    }
}
