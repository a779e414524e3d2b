//! Small resource models for unit tests.

use tdm_config::ChannelConfig;
use tdm_db::{Design, InstanceId, InstanceKind, Pin, PinDir, Placement, TdmDb};
use tdm_diagnostics::DiagnosticSink;

pub(crate) struct DbBuilder {
    design: Design,
    devices: Vec<usize>,
    placement: Vec<Placement>,
}

impl DbBuilder {
    pub(crate) fn new() -> Self {
        Self {
            design: Design::new("test"),
            devices: Vec::new(),
            placement: Vec::new(),
        }
    }

    pub(crate) fn inst(
        &mut self,
        name: &str,
        kind: InstanceKind,
        device: usize,
        (x, y): (f64, f64),
    ) -> InstanceId {
        let id = self.design.add_instance(name, kind).unwrap();
        self.devices.push(device);
        self.placement.push(Placement { x, y });
        id
    }

    pub(crate) fn net(&mut self, driver: InstanceId, sinks: &[InstanceId]) {
        let mut pins = vec![Pin {
            instance: driver,
            dir: PinDir::Out,
        }];
        pins.extend(sinks.iter().map(|&instance| Pin {
            instance,
            dir: PinDir::In,
        }));
        let name = format!("n{}", self.design.nets.len());
        self.design.add_net(name, false, pins);
    }

    pub(crate) fn build(self, limit: usize) -> TdmDb {
        let channel = ChannelConfig {
            limit,
            ..ChannelConfig::default()
        };
        TdmDb::build(
            self.design,
            self.devices,
            self.placement,
            &channel,
            &DiagnosticSink::new(),
        )
        .unwrap()
    }
}

/// `lut0 -> lut1 -> ff2` on one device, ten units apart.
pub(crate) fn chain_db() -> TdmDb {
    let mut b = DbBuilder::new();
    let l0 = b.inst("lut0", InstanceKind::Lut, 0, (0.0, 0.0));
    let l1 = b.inst("lut1", InstanceKind::Lut, 0, (10.0, 0.0));
    let f2 = b.inst("ff2", InstanceKind::Ff, 0, (20.0, 0.0));
    b.net(l0, &[l1]);
    b.net(l1, &[f2]);
    b.build(20)
}
