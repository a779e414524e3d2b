//! The central registry of the resource model.
//!
//! [`TdmDb`] owns the design, its device assignment and placement, the
//! decomposed [`TdmNet`]s, every [`XdrVar`], every [`Troncon`], and the
//! shared [`XdrChoices`]. Solver phases read and write ratios through it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tdm_config::ChannelConfig;
use tdm_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tracing::{debug, info};

use crate::choices::{XdrChoices, CHOICE_STEP};
use crate::design::Design;
use crate::error::DbError;
use crate::files::{read_values, write_values, Placement};
use crate::ids::{InstanceId, TdmNetId, TronconId, XdrVarId};
use crate::net::{decompose_nets, TdmNet};
use crate::troncon::{Troncon, XdrVar};

/// Counts describing the channel structure of a design.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TronconSummary {
    /// Number of troncons.
    pub troncons: usize,
    /// Mean number of nets per troncon.
    pub avg_nets: f64,
    /// Largest number of nets on a troncon.
    pub max_nets: usize,
    /// Smallest number of nets on a troncon.
    pub min_nets: usize,
    /// Troncons carrying more nets than their limit.
    pub active: usize,
    /// Variables on active troncons.
    pub opt_vars: usize,
}

/// Outcome of [`TdmDb::check_feasibility`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeasibilityReport {
    /// Choices appended to the set while widening.
    pub widened: usize,
    /// Active troncons that still cannot fit at the ceiling.
    pub infeasible: Vec<TronconId>,
}

/// The resource model: nets, channels, ratio variables and the choice set.
#[derive(Debug, Clone)]
pub struct TdmDb {
    design: Design,
    device_of: Vec<usize>,
    placement: Vec<Placement>,
    nets: Vec<TdmNet>,
    vars: Vec<XdrVar>,
    troncons: Vec<Troncon>,
    choices: XdrChoices,
    opt_vars: Vec<XdrVarId>,
    is_opt: Vec<bool>,
    saved: Option<Vec<f64>>,
}

impl TdmDb {
    /// Decomposes the design into TdmNets, creates one troncon per device
    /// pair crossed by an inter-device net, and one variable per inter-device
    /// net. Variables on troncons that fit their limit are pinned to 1.
    pub fn build(
        design: Design,
        device_of: Vec<usize>,
        placement: Vec<Placement>,
        channel: &ChannelConfig,
        sink: &DiagnosticSink,
    ) -> Result<Self, DbError> {
        for (what, len) in [("device", device_of.len()), ("placement", placement.len())] {
            if len < design.instances.len() {
                return Err(DbError::MissingInstance {
                    what,
                    name: design.instances[len].name.clone(),
                });
            }
        }

        let mut nets = decompose_nets(&design, &device_of, sink);

        let mut pairs: BTreeMap<(usize, usize), Vec<TdmNetId>> = BTreeMap::new();
        for net in nets.iter().filter(|n| n.is_inter()) {
            let key = (
                net.from_device.min(net.to_device),
                net.from_device.max(net.to_device),
            );
            pairs.entry(key).or_default().push(net.id);
        }
        let mut troncons = Vec::with_capacity(pairs.len());
        let mut troncon_of: BTreeMap<(usize, usize), TronconId> = BTreeMap::new();
        for key in pairs.keys() {
            let id = TronconId::from_raw(troncons.len() as u32);
            troncon_of.insert(*key, id);
            troncons.push(Troncon {
                id,
                devices: *key,
                limit: channel.limit,
                vars: Vec::new(),
            });
        }

        let mut vars = Vec::new();
        for net in nets.iter_mut().filter(|n| n.is_inter()) {
            let key = (
                net.from_device.min(net.to_device),
                net.from_device.max(net.to_device),
            );
            let troncon = troncon_of[&key];
            let id = XdrVarId::from_raw(vars.len() as u32);
            vars.push(XdrVar {
                id,
                net: net.id,
                troncon,
                forward: net.from_device < net.to_device,
                value: 1.0,
            });
            troncons[troncon.index()].vars.push(id);
            net.xdr = Some(id);
        }

        let mut is_opt = vec![false; vars.len()];
        for t in troncons.iter().filter(|t| t.is_active()) {
            for v in &t.vars {
                is_opt[v.index()] = true;
            }
        }
        let opt_vars = (0..vars.len())
            .filter(|&i| is_opt[i])
            .map(|i| XdrVarId::from_raw(i as u32))
            .collect();

        Ok(Self {
            design,
            device_of,
            placement,
            nets,
            vars,
            troncons,
            choices: XdrChoices::new(channel.max_choice),
            opt_vars,
            is_opt,
            saved: None,
        })
    }

    /// The input design.
    pub fn design(&self) -> &Design {
        &self.design
    }

    /// Device of an instance.
    pub fn device_of(&self, inst: InstanceId) -> usize {
        self.device_of[inst.index()]
    }

    /// Placement of an instance.
    pub fn placement(&self, inst: InstanceId) -> &Placement {
        &self.placement[inst.index()]
    }

    /// All TdmNets.
    pub fn nets(&self) -> &[TdmNet] {
        &self.nets
    }

    /// One TdmNet.
    pub fn net(&self, id: TdmNetId) -> &TdmNet {
        &self.nets[id.index()]
    }

    /// All ratio variables.
    pub fn vars(&self) -> &[XdrVar] {
        &self.vars
    }

    /// One ratio variable.
    pub fn var(&self, id: XdrVarId) -> &XdrVar {
        &self.vars[id.index()]
    }

    /// All troncons.
    pub fn troncons(&self) -> &[Troncon] {
        &self.troncons
    }

    /// One troncon.
    pub fn troncon(&self, id: TronconId) -> &Troncon {
        &self.troncons[id.index()]
    }

    /// Troncons whose variables are optimized, in ID order.
    pub fn active_troncons(&self) -> impl Iterator<Item = &Troncon> {
        self.troncons.iter().filter(|t| t.is_active())
    }

    /// The discrete choice set.
    pub fn choices(&self) -> &XdrChoices {
        &self.choices
    }

    /// Variables on active troncons, in ID order.
    pub fn opt_vars(&self) -> &[XdrVarId] {
        &self.opt_vars
    }

    /// Whether a variable is optimized.
    pub fn is_opt(&self, id: XdrVarId) -> bool {
        self.is_opt[id.index()]
    }

    /// Current ratio of a variable.
    pub fn value(&self, id: XdrVarId) -> f64 {
        self.vars[id.index()].value
    }

    /// Sets the ratio of a variable.
    pub fn set_value(&mut self, id: XdrVarId, value: f64) {
        self.vars[id.index()].value = value;
    }

    /// Current ratios in variable-ID order.
    pub fn values(&self) -> Vec<f64> {
        self.vars.iter().map(|v| v.value).collect()
    }

    /// Replaces every ratio.
    pub fn set_values(&mut self, values: &[f64]) -> Result<(), DbError> {
        if values.len() != self.vars.len() {
            return Err(DbError::SolutionLength {
                expected: self.vars.len(),
                found: values.len(),
            });
        }
        for (var, v) in self.vars.iter_mut().zip(values) {
            var.value = *v;
        }
        Ok(())
    }

    /// Snapshots the current ratios.
    pub fn save_solution(&mut self) {
        self.saved = Some(self.values());
    }

    /// Restores the last snapshot. Returns `false` if none was taken.
    pub fn recover_solution(&mut self) -> bool {
        match self.saved.take() {
            Some(values) => {
                for (var, v) in self.vars.iter_mut().zip(&values) {
                    var.value = *v;
                }
                self.saved = Some(values);
                true
            }
            None => false,
        }
    }

    /// Writes the current ratios as a checkpoint.
    pub fn write_solution(&self, path: &Path) -> Result<(), DbError> {
        write_values(path, &self.values())?;
        debug!(path = %path.display(), vars = self.vars.len(), "solution written");
        Ok(())
    }

    /// Loads ratios from a checkpoint.
    pub fn read_solution(&mut self, path: &Path) -> Result<(), DbError> {
        let values = read_values(path)?;
        self.set_values(&values)
    }

    /// Summed continuous-limit violation over all troncons.
    pub fn cont_limit_vio(&self) -> f64 {
        self.troncons
            .iter()
            .map(|t| t.cont_limit_vio(&self.vars))
            .sum()
    }

    /// Summed discrete-limit violation over all troncons.
    pub fn limit_vio(&self) -> usize {
        self.troncons.iter().map(|t| t.limit_vio(&self.vars)).sum()
    }

    /// Summed choice violation over all troncons.
    pub fn choice_vio(&self) -> f64 {
        self.troncons
            .iter()
            .map(|t| t.choice_vio(&self.vars, &self.choices))
            .sum()
    }

    /// Whether every ratio is a legal choice.
    pub fn is_legal(&self) -> bool {
        self.vars.iter().all(|v| self.choices.is_legal(v.value))
    }

    /// Makes sure every active troncon can fit its limit when all its
    /// variables take the largest choice, widening the choice set up to
    /// `ceiling` if needed.
    pub fn check_feasibility(&mut self, ceiling: u32, sink: &DiagnosticSink) -> FeasibilityReport {
        let mut report = FeasibilityReport::default();
        for t in self.troncons.iter().filter(|t| t.is_active()) {
            let needed = t.min_usage(&self.vars, self.choices.max());
            if needed <= t.limit {
                continue;
            }
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::new(Category::Channel, 1),
                    format!(
                        "troncon needs {needed} slots at max choice {}, limit is {}",
                        self.choices.max(),
                        t.limit
                    ),
                )
                .with_subject(format!("troncon {} ({}, {})", t.id, t.devices.0, t.devices.1)),
            );
            while t.min_usage(&self.vars, self.choices.max()) > t.limit
                && self.choices.max() + CHOICE_STEP <= ceiling
            {
                let next = self.choices.push_next();
                report.widened += 1;
                sink.emit(
                    Diagnostic::warning(
                        DiagnosticCode::new(Category::Channel, 2),
                        format!("max choice increased to {next}"),
                    )
                    .with_subject(format!("troncon {}", t.id)),
                );
            }
            if t.min_usage(&self.vars, self.choices.max()) > t.limit {
                sink.emit(
                    Diagnostic::error(
                        DiagnosticCode::new(Category::Channel, 3),
                        format!("troncon cannot fit its limit even at max choice {ceiling}"),
                    )
                    .with_subject(format!("troncon {}", t.id))
                    .with_help("raise `channel.choice_ceiling` or `channel.limit`"),
                );
                report.infeasible.push(t.id);
            }
        }
        report
    }

    /// Computes the channel structure summary.
    pub fn troncon_summary(&self) -> TronconSummary {
        let sizes: Vec<usize> = self.troncons.iter().map(|t| t.vars.len()).collect();
        let total: usize = sizes.iter().sum();
        TronconSummary {
            troncons: sizes.len(),
            avg_nets: if sizes.is_empty() {
                0.0
            } else {
                total as f64 / sizes.len() as f64
            },
            max_nets: sizes.iter().copied().max().unwrap_or(0),
            min_nets: sizes.iter().copied().min().unwrap_or(0),
            active: self.active_troncons().count(),
            opt_vars: self.opt_vars.len(),
        }
    }

    /// Logs the channel summary and per-troncon direction counts.
    pub fn report_troncons(&self) {
        let s = self.troncon_summary();
        info!(
            troncons = s.troncons,
            avg_nets = s.avg_nets,
            max_nets = s.max_nets,
            min_nets = s.min_nets,
            active = s.active,
            opt_vars = s.opt_vars,
            "troncon summary"
        );
        for t in &self.troncons {
            let (forward, backward) = t.direction_counts(&self.vars);
            debug!(
                troncon = %t.id,
                devices = ?t.devices,
                forward,
                backward,
                active = t.is_active(),
                "troncon usage"
            );
        }
    }

    /// Logs the solution quality line for the given arrival time. Discrete
    /// usage is reported once every ratio sits on a choice.
    pub fn report_solution(&self, stage: &str, at: f64) {
        let choice_vio = self.choice_vio();
        if choice_vio == 0.0 {
            info!(
                stage,
                at,
                limit_vio = self.limit_vio(),
                choice_vio,
                "solution"
            );
        } else {
            info!(
                stage,
                at,
                cont_limit_vio = self.cont_limit_vio(),
                choice_vio,
                "solution"
            );
        }
    }
}
