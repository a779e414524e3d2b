//! Small contexts for unit tests.

use tdm_config::{ChannelConfig, FlowConfig};
use tdm_db::{Design, InstanceId, InstanceKind, Pin, PinDir, Placement, TdmDb};
use tdm_diagnostics::DiagnosticSink;

use crate::context::TdmContext;

pub(crate) struct CtxBuilder {
    design: Design,
    devices: Vec<usize>,
    placement: Vec<Placement>,
}

impl CtxBuilder {
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

    pub(crate) fn build(self, config: FlowConfig) -> TdmContext {
        let sink = DiagnosticSink::new();
        let db = TdmDb::build(
            self.design,
            self.devices,
            self.placement,
            &config.channel,
            &sink,
        )
        .unwrap();
        TdmContext::new(db, config, sink).unwrap()
    }
}

pub(crate) fn test_config(limit: usize) -> FlowConfig {
    let mut config = FlowConfig::default();
    config.flow.threads = 2;
    config.flow.lag_iter = 60;
    config.channel = ChannelConfig {
        limit,
        max_choice: 64,
        choice_ceiling: 256,
    };
    config
}

/// `nets` paths `a_k -> b_k -> f_k`, where `a_k` sits on device 0 and the
/// other two on device 1. Path `k` has `4k` units of wire after the
/// crossing, so later paths are more critical.
pub(crate) fn two_device_ctx(nets: usize, limit: usize) -> TdmContext {
    two_device_ctx_with(nets, test_config(limit))
}

pub(crate) fn two_device_ctx_with(nets: usize, config: FlowConfig) -> TdmContext {
    let mut b = CtxBuilder::new();
    for k in 0..nets {
        let a = b.inst(&format!("a{k}"), InstanceKind::Lut, 0, (k as f64, 0.0));
        let m = b.inst(&format!("b{k}"), InstanceKind::Lut, 1, (0.0, 0.0));
        let f = b.inst(&format!("f{k}"), InstanceKind::Ff, 1, (4.0 * k as f64, 0.0));
        b.net(a, &[m]);
        b.net(m, &[f]);
    }
    b.build(config)
}

/// `nets` fanout paths over three devices: `a_k` (device 0) drives `b_k`
/// (device 1) and `c_k` (device 2), and `b_k` drives `f_k` on device 1.
pub(crate) fn three_device_ctx(nets: usize, limit: usize) -> TdmContext {
    let mut b = CtxBuilder::new();
    for k in 0..nets {
        let x = k as f64;
        let a = b.inst(&format!("a{k}"), InstanceKind::Lut, 0, (x, 0.0));
        let m = b.inst(&format!("b{k}"), InstanceKind::Lut, 1, (0.0, 0.0));
        let c = b.inst(&format!("c{k}"), InstanceKind::Ff, 2, (x, x));
        let f = b.inst(&format!("f{k}"), InstanceKind::Ff, 1, (4.0 * x, 0.0));
        b.net(a, &[m, c]);
        b.net(m, &[f]);
    }
    b.build(test_config(limit))
}
