//! Legalization: snapping continuous ratios to discrete choices.
//!
//! Each active troncon is legalized on its own by the interval-partition
//! program in [`dp`], so troncons are processed in parallel, largest first.
//! Troncons whose ratios already sit on choices and fit their limit are left
//! alone.

mod dp;
mod maxdisp;

use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tdm_common::TdmResult;
use tdm_config::LegalizeMethod;
use tdm_db::{TdmDb, Troncon, TronconId, XdrChoices, XdrVarId};
use tdm_diagnostics::{Category, Diagnostic, DiagnosticCode};
use tracing::{debug, info};

use crate::context::TdmContext;
use crate::error::SolveError;

use self::dp::ChannelDp;
use self::maxdisp::{choice_ranges, min_radius};

/// Summary of a legalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegalizeReport {
    /// Troncons whose ratios were rewritten.
    pub legalized: usize,
    /// Troncons that were already legal.
    pub skipped: usize,
    /// Troncons that cannot fit their limit with the current choices.
    pub infeasible: Vec<TronconId>,
    /// Mean displacement over all optimized variables.
    pub avg_disp: f64,
    /// Largest displacement of any variable.
    pub max_max_disp: f64,
    /// Per-troncon worst displacement, averaged over optimized variables.
    pub avg_max_disp: f64,
    /// Critical delay before legalization.
    pub at_before: f64,
    /// Critical delay after legalization.
    pub at_after: f64,
}

/// The optimized variables of one troncon, forward first, each direction by
/// ascending value.
struct Channel {
    troncon: TronconId,
    limit: usize,
    vars: Vec<XdrVarId>,
    values: Vec<f64>,
    num_forward: usize,
}

impl Channel {
    fn new(db: &TdmDb, troncon: &Troncon) -> Self {
        let mut vars: Vec<XdrVarId> = troncon
            .vars
            .iter()
            .copied()
            .filter(|&v| db.is_opt(v))
            .collect();
        vars.sort_by(|&a, &b| {
            let (va, vb) = (db.var(a), db.var(b));
            vb.forward
                .cmp(&va.forward)
                .then(va.value.total_cmp(&vb.value))
        });
        let values = vars.iter().map(|&v| db.value(v)).collect();
        let num_forward = vars.iter().filter(|&&v| db.var(v).forward).count();
        Self {
            troncon: troncon.id,
            limit: troncon.limit,
            vars,
            values,
            num_forward,
        }
    }

    fn legalize(&self, method: LegalizeMethod, choices: &XdrChoices) -> TdmResult<ChannelOutcome> {
        let ranges = match method {
            LegalizeMethod::Disp => None,
            LegalizeMethod::MaxDisp => {
                match min_radius(&self.values, self.num_forward, self.limit, choices) {
                    Some(radius) => Some(choice_ranges(&self.values, choices, radius)),
                    None => return Ok(ChannelOutcome::Infeasible),
                }
            }
            LegalizeMethod::None => return Ok(ChannelOutcome::Infeasible),
        };
        let mut dp = ChannelDp::new(
            &self.values,
            self.num_forward,
            self.limit,
            choices,
            ranges.as_deref(),
        );
        if !dp.solve().is_finite() {
            return Ok(ChannelOutcome::Infeasible);
        }
        let assigned = dp.assignment()?;

        let mut tot_disp = 0.0;
        let mut max_disp = 0.0_f64;
        for (v, c) in self.values.iter().zip(&assigned) {
            let disp = (v - c).abs();
            tot_disp += disp;
            max_disp = max_disp.max(disp);
        }
        Ok(ChannelOutcome::Legalized {
            values: self.vars.iter().copied().zip(assigned).collect(),
            tot_disp,
            max_disp,
        })
    }
}

enum ChannelOutcome {
    Legalized {
        values: Vec<(XdrVarId, f64)>,
        tot_disp: f64,
        max_disp: f64,
    },
    Infeasible,
}

/// Legalizes every active troncon with `method` on the context's worker
/// pool, then refreshes timing.
///
/// Troncons that cannot fit are reported (`C004`) and keep their values. An
/// error is returned only when the dynamic program breaks its own invariant.
pub fn legalize(
    ctx: &mut TdmContext,
    method: LegalizeMethod,
) -> Result<LegalizeReport, SolveError> {
    ctx.install(|ctx| legalize_in_pool(ctx, method))
}

fn legalize_in_pool(
    ctx: &mut TdmContext,
    method: LegalizeMethod,
) -> Result<LegalizeReport, SolveError> {
    if method == LegalizeMethod::None {
        return Ok(LegalizeReport::default());
    }
    let start = Instant::now();
    info!(method = ?method, "begin legalization");
    ctx.update_timing();
    let at_before = ctx.arrival_time();

    let db = &ctx.db;
    let mut channels: Vec<Channel> = db
        .active_troncons()
        .map(|t| Channel::new(db, t))
        .filter(|c| !c.vars.is_empty())
        .collect();
    channels.sort_by(|a, b| b.vars.len().cmp(&a.vars.len()));

    let mut report = LegalizeReport {
        at_before,
        ..LegalizeReport::default()
    };
    let (jobs, skipped): (Vec<Channel>, Vec<Channel>) = channels.into_iter().partition(|c| {
        let t = db.troncon(c.troncon);
        t.choice_vio(db.vars(), db.choices()) != 0.0 || t.limit_vio(db.vars()) != 0
    });
    report.skipped = skipped.len();

    let choices = db.choices();
    let outcomes: Vec<(TronconId, usize, ChannelOutcome)> = jobs
        .par_iter()
        .map(|c| -> TdmResult<_> {
            Ok((c.troncon, c.vars.len(), c.legalize(method, choices)?))
        })
        .collect::<TdmResult<_>>()?;

    let mut tot_disp = 0.0;
    let mut avg_max_disp = 0.0;
    for (troncon, size, outcome) in outcomes {
        match outcome {
            ChannelOutcome::Legalized {
                values,
                tot_disp: disp,
                max_disp,
            } => {
                debug!(
                    troncon = %troncon,
                    vars = size,
                    tot_disp = disp,
                    max_disp,
                    "troncon legalized"
                );
                for (v, value) in values {
                    ctx.db.set_value(v, value);
                }
                tot_disp += disp;
                report.max_max_disp = report.max_max_disp.max(max_disp);
                avg_max_disp += max_disp * size as f64;
                report.legalized += 1;
            }
            ChannelOutcome::Infeasible => {
                let limit = ctx.db.troncon(troncon).limit;
                ctx.sink.emit(
                    Diagnostic::warning(
                        DiagnosticCode::new(Category::Channel, 4),
                        format!("no discrete assignment fits the limit of {limit} slots"),
                    )
                    .with_subject(format!("troncon {troncon}"))
                    .with_note("ratios on this troncon are left unchanged"),
                );
                report.infeasible.push(troncon);
            }
        }
    }

    let opt_vars = ctx.db.opt_vars().len().max(1) as f64;
    report.avg_disp = tot_disp / opt_vars;
    report.avg_max_disp = avg_max_disp / opt_vars;

    ctx.update_timing();
    report.at_after = ctx.arrival_time();
    info!(
        avg_disp = report.avg_disp,
        max_max_disp = report.max_max_disp,
        avg_max_disp = report.avg_max_disp,
        at_before = report.at_before,
        at_after = report.at_after,
        legalized = report.legalized,
        skipped = report.skipped,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "legalization finished"
    );
    Ok(report)
}
