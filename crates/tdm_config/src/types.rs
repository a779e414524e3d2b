//! Configuration types deserialized from `tdm.toml`.

use serde::Deserialize;

/// The top-level optimizer configuration parsed from `tdm.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FlowConfig {
    /// Phase selection and solver budgets.
    #[serde(default)]
    pub flow: FlowSection,
    /// Channel capacity and discrete choice set.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Delay model coefficients.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Which phases run and how.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FlowSection {
    /// Continuous solving strategy.
    pub cont: ContMethod,
    /// Legalization objective.
    pub legalize: LegalizeMethod,
    /// Whether greedy refinement runs after legalization.
    pub refine: bool,
    /// Worker threads used by every parallel phase.
    pub threads: usize,
    /// Iteration budget of the Lagrangian solver.
    pub lag_iter: usize,
    /// Whether the dual objective is evaluated at every iteration.
    pub compute_dual: bool,
}

impl Default for FlowSection {
    fn default() -> Self {
        Self {
            cont: ContMethod::Lag,
            legalize: LegalizeMethod::MaxDisp,
            refine: true,
            threads: 8,
            lag_iter: 1000,
            compute_dual: false,
        }
    }
}

/// Continuous solving strategy.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContMethod {
    /// Lagrangian relaxation (default).
    #[default]
    Lag,
    /// Skip solving and reuse the `<bench>_cont.tdm` checkpoint.
    None,
}

/// Legalization objective.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LegalizeMethod {
    /// Minimize the total displacement of each channel.
    Disp,
    /// Minimize the worst displacement of each channel, then the total (default).
    #[default]
    MaxDisp,
    /// Keep the continuous values.
    None,
}

/// Channel capacity and discrete ratio choices.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Time-slot capacity of every troncon.
    pub limit: usize,
    /// Largest discrete ratio offered initially.
    pub max_choice: u32,
    /// Largest discrete ratio feasibility widening may add.
    pub choice_ceiling: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            max_choice: 1600,
            choice_ceiling: 1600,
        }
    }
}

/// Delay model coefficients.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Delay added per unit of TDM ratio on inter-device edges.
    pub tdm_coef: f64,
    /// Combinational delay of a LUT.
    pub lut_delay: f64,
    /// Delay per unit of Manhattan distance on intra-device edges.
    pub wire_delay_coef: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tdm_coef: 5.0,
            lut_delay: 2.0,
            wire_delay_coef: 1.0,
        }
    }
}
