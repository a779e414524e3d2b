//! The input netlist: instances with a kind, and nets with driver/sink pins.
//!
//! Designs are read from a serde JSON file whose pins refer to instances by
//! name. Loading resolves every name to an [`InstanceId`] and rejects
//! duplicate or unknown instances.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::ids::{InstanceId, NetId};

/// The functional class of an instance, which decides its gate delay and
/// whether it is split when breaking timing cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    /// A look-up table.
    Lut,
    /// A flip-flop.
    Ff,
    /// An I/O buffer.
    Io,
    /// Anything else (RAM, DSP, ...).
    Other,
}

impl InstanceKind {
    /// Returns `true` for LUTs and flip-flops.
    pub fn is_lut_or_ff(self) -> bool {
        matches!(self, InstanceKind::Lut | InstanceKind::Ff)
    }
}

/// Direction of a pin relative to its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDir {
    /// The pin drives the net.
    Out,
    /// The pin is driven by the net.
    In,
}

/// A named design instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name, unique within the design.
    pub name: String,
    /// Functional class.
    pub kind: InstanceKind,
}

/// A resolved pin: an instance and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    /// The instance the pin belongs to.
    pub instance: InstanceId,
    /// Whether the pin drives or receives.
    pub dir: PinDir,
}

/// A resolved design net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    /// Net name.
    pub name: String,
    /// Clock nets never cross the TDM channels.
    pub clock: bool,
    /// Pins in file order.
    pub pins: Vec<Pin>,
}

impl Net {
    /// Index into `pins` of the first output pin, if any.
    pub fn driver_index(&self) -> Option<usize> {
        self.pins.iter().position(|p| p.dir == PinDir::Out)
    }
}

/// A complete design netlist with resolved instance references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Design {
    /// Design name, used in reports.
    pub name: String,
    /// All instances, indexed by [`InstanceId`].
    pub instances: Vec<Instance>,
    /// All nets, indexed by [`NetId`].
    pub nets: Vec<Net>,
    names: HashMap<String, InstanceId>,
}

#[derive(Deserialize)]
struct DesignFile {
    #[serde(default)]
    name: String,
    instances: Vec<Instance>,
    #[serde(default)]
    nets: Vec<NetFile>,
}

#[derive(Deserialize)]
struct NetFile {
    name: String,
    #[serde(default)]
    clock: bool,
    pins: Vec<PinFile>,
}

#[derive(Deserialize)]
struct PinFile {
    instance: String,
    dir: PinDir,
}

impl Design {
    /// Creates an empty design with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an instance and returns its ID.
    pub fn add_instance(
        &mut self,
        name: impl Into<String>,
        kind: InstanceKind,
    ) -> Result<InstanceId, DbError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(DbError::DuplicateInstance(name));
        }
        let id = InstanceId::from_raw(self.instances.len() as u32);
        self.names.insert(name.clone(), id);
        self.instances.push(Instance { name, kind });
        Ok(id)
    }

    /// Adds a net and returns its ID.
    pub fn add_net(&mut self, name: impl Into<String>, clock: bool, pins: Vec<Pin>) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.push(Net {
            name: name.into(),
            clock,
            pins,
        });
        id
    }

    /// Looks up an instance by name.
    pub fn instance_id(&self, name: &str) -> Option<InstanceId> {
        self.names.get(name).copied()
    }

    /// Returns the instance with the given ID.
    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    /// Parses a design from its JSON representation.
    pub fn from_json(source: &str) -> Result<Self, DbError> {
        let file: DesignFile =
            serde_json::from_str(source).map_err(|e| DbError::Design(e.to_string()))?;
        let mut design = Design::new(file.name);
        for inst in file.instances {
            design.add_instance(inst.name, inst.kind)?;
        }
        for net in file.nets {
            let mut pins = Vec::with_capacity(net.pins.len());
            for pin in net.pins {
                let instance = design
                    .instance_id(&pin.instance)
                    .ok_or_else(|| DbError::UnknownInstance(pin.instance.clone()))?;
                pins.push(Pin {
                    instance,
                    dir: pin.dir,
                });
            }
            design.add_net(net.name, net.clock, pins);
        }
        Ok(design)
    }

    /// Reads a design from a JSON file.
    pub fn load(path: &Path) -> Result<Self, DbError> {
        let source = std::fs::read_to_string(path).map_err(|source| DbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source)
    }
}
