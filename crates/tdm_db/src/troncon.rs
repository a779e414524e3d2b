//! Inter-device channels and the ratio variables multiplexed on them.

use std::collections::BTreeMap;

use crate::choices::XdrChoices;
use crate::ids::{TdmNetId, TronconId, XdrVarId};

/// The TDM ratio of one inter-device TdmNet.
#[derive(Debug, Clone, PartialEq)]
pub struct XdrVar {
    /// This variable's ID.
    pub id: XdrVarId,
    /// The TdmNet it belongs to.
    pub net: TdmNetId,
    /// The channel it travels on.
    pub troncon: TronconId,
    /// `true` when the signal flows from the lower to the higher device.
    pub forward: bool,
    /// Current ratio.
    pub value: f64,
}

/// A channel between an unordered device pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Troncon {
    /// This troncon's ID.
    pub id: TronconId,
    /// `(min_device, max_device)`.
    pub devices: (usize, usize),
    /// Time-slot capacity.
    pub limit: usize,
    /// Variables in ID order.
    pub vars: Vec<XdrVarId>,
}

impl Troncon {
    /// Whether the channel carries more nets than it has slots, so its
    /// ratios must be optimized.
    pub fn is_active(&self) -> bool {
        self.vars.len() > self.limit
    }

    /// `(forward, backward)` variable counts.
    pub fn direction_counts(&self, vars: &[XdrVar]) -> (usize, usize) {
        let forward = self
            .vars
            .iter()
            .filter(|v| vars[v.index()].forward)
            .count();
        (forward, self.vars.len() - forward)
    }

    /// Continuous usage `Σ 1/value`.
    pub fn cont_usage(&self, vars: &[XdrVar]) -> f64 {
        self.vars.iter().map(|v| 1.0 / vars[v.index()].value).sum()
    }

    /// Discrete usage: per direction, nets sharing a ratio `r` are packed
    /// `r` to a slot, so each distinct ratio uses `⌈count / r⌉` slots.
    pub fn usage(&self, vars: &[XdrVar]) -> usize {
        let mut groups: [BTreeMap<u64, usize>; 2] = [BTreeMap::new(), BTreeMap::new()];
        for v in &self.vars {
            let var = &vars[v.index()];
            *groups[usize::from(var.forward)]
                .entry(var.value.to_bits())
                .or_default() += 1;
        }
        groups
            .iter()
            .flat_map(|g| g.iter())
            .map(|(bits, count)| {
                let ratio = f64::from_bits(*bits).max(1.0);
                (*count as f64 / ratio).ceil() as usize
            })
            .sum()
    }

    /// `max(0, cont_usage − limit)`.
    pub fn cont_limit_vio(&self, vars: &[XdrVar]) -> f64 {
        (self.cont_usage(vars) - self.limit as f64).max(0.0)
    }

    /// `max(0, usage − limit)`.
    pub fn limit_vio(&self, vars: &[XdrVar]) -> usize {
        self.usage(vars).saturating_sub(self.limit)
    }

    /// `Σ |value − closest(value)|`.
    pub fn choice_vio(&self, vars: &[XdrVar], choices: &XdrChoices) -> f64 {
        self.vars
            .iter()
            .map(|v| {
                let val = vars[v.index()].value;
                (val - choices.closest(val)).abs()
            })
            .sum()
    }

    /// Slots needed if every variable took the largest choice.
    pub fn min_usage(&self, vars: &[XdrVar], max_choice: u32) -> usize {
        let (nf, nb) = self.direction_counts(vars);
        let max = max_choice.max(1) as usize;
        nf.div_ceil(max) + nb.div_ceil(max)
    }
}
