//! Resource model of the TDM ratio optimizer.
//!
//! This crate turns a placed, partitioned design into the objects the
//! solvers work on:
//!
//! - [`Design`]: the input netlist, read from JSON.
//! - [`TdmNet`]: a design net cut down to one destination device.
//! - [`XdrVar`]: the TDM ratio of one inter-device TdmNet.
//! - [`Troncon`]: the channel between a device pair, with a slot limit.
//! - [`XdrChoices`]: the legal ratios `{1, 8, 16, ..., max}`.
//! - [`TdmDb`]: the registry owning all of the above.
//!
//! # Usage
//!
//! ```ignore
//! use tdm_db::{read_device_map, read_placement, Design, TdmDb};
//!
//! let design = Design::load(Path::new("bench.json"))?;
//! let devices = read_device_map(&design, Path::new("bench.device"))?;
//! let placement = read_placement(&design, Path::new("bench.pos"))?;
//! let db = TdmDb::build(design, devices, placement, &config.channel, &sink)?;
//! db.report_troncons();
//! ```

#![warn(missing_docs)]

pub mod choices;
pub mod db;
pub mod design;
pub mod error;
pub mod files;
pub mod ids;
pub mod net;
pub mod troncon;

pub use choices::{XdrChoices, CHOICE_STEP};
pub use db::{FeasibilityReport, TdmDb, TronconSummary};
pub use design::{Design, Instance, InstanceKind, Net, Pin, PinDir};
pub use error::DbError;
pub use files::{
    parse_device_map, parse_placement, read_device_map, read_placement, read_values,
    write_values, Placement,
};
pub use ids::{InstanceId, NetId, TdmNetId, TronconId, XdrVarId};
pub use net::{decompose_nets, TdmNet};
pub use troncon::{Troncon, XdrVar};
