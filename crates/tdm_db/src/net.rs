//! Decomposition of design nets into per-device TDM nets.

use std::collections::BTreeMap;

use tdm_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::design::{Design, Pin};
use crate::ids::{NetId, TdmNetId, XdrVarId};

/// A net restricted to one destination device.
///
/// Intra-device TdmNets have `from_device == to_device`. Inter-device ones
/// carry the driver pin plus the sinks on `to_device`, and own exactly one
/// [`XdrVar`](crate::XdrVar).
#[derive(Debug, Clone, PartialEq)]
pub struct TdmNet {
    /// This net's ID.
    pub id: TdmNetId,
    /// The design net it was cut from.
    pub parent: NetId,
    /// Pins, driver included.
    pub pins: Vec<Pin>,
    /// Index of the driver in `pins`.
    pub driver: usize,
    /// Device of the driver.
    pub from_device: usize,
    /// Device of the sinks.
    pub to_device: usize,
    /// The ratio variable of an inter-device net.
    pub xdr: Option<XdrVarId>,
}

impl TdmNet {
    /// Whether the net crosses a device boundary.
    pub fn is_inter(&self) -> bool {
        self.from_device != self.to_device
    }

    /// The driving pin.
    pub fn driver_pin(&self) -> Pin {
        self.pins[self.driver]
    }

    /// Sink pins in pin order.
    pub fn sinks(&self) -> impl Iterator<Item = Pin> + '_ {
        self.pins
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.driver)
            .map(|(_, p)| *p)
    }
}

/// Splits every non-clock design net into TdmNets, one per device it touches.
///
/// Subnets are emitted in design-net order, then ascending device order.
/// Nets without an output pin are skipped with a `W001` warning.
pub fn decompose_nets(
    design: &Design,
    device_of: &[usize],
    sink: &DiagnosticSink,
) -> Vec<TdmNet> {
    let mut out: Vec<TdmNet> = Vec::new();
    for (ni, net) in design.nets.iter().enumerate() {
        if net.clock {
            continue;
        }
        let Some(driver_idx) = net.driver_index() else {
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::new(Category::Warning, 1),
                    "net has no driver and is ignored",
                )
                .with_subject(net.name.clone()),
            );
            continue;
        };
        let parent = NetId::from_raw(ni as u32);
        let driver = net.pins[driver_idx];
        let from_device = device_of[driver.instance.index()];

        let mut by_device: BTreeMap<usize, Vec<Pin>> = BTreeMap::new();
        for pin in &net.pins {
            by_device
                .entry(device_of[pin.instance.index()])
                .or_default()
                .push(*pin);
        }

        if by_device.len() == 1 {
            out.push(TdmNet {
                id: TdmNetId::from_raw(out.len() as u32),
                parent,
                pins: net.pins.clone(),
                driver: driver_idx,
                from_device,
                to_device: from_device,
                xdr: None,
            });
            continue;
        }

        for (device, mut pins) in by_device {
            let driver_pos = if device == from_device {
                match pins.iter().position(|p| *p == driver) {
                    Some(pos) => pos,
                    None => continue,
                }
            } else {
                pins.insert(0, driver);
                0
            };
            if pins.len() < 2 {
                continue;
            }
            out.push(TdmNet {
                id: TdmNetId::from_raw(out.len() as u32),
                parent,
                pins,
                driver: driver_pos,
                from_device,
                to_device: device,
                xdr: None,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{InstanceKind, PinDir};
    use crate::ids::InstanceId;

    fn pin(i: u32, dir: PinDir) -> Pin {
        Pin {
            instance: InstanceId::from_raw(i),
            dir,
        }
    }

    fn design_with(nets: Vec<(bool, Vec<Pin>)>, n_inst: usize) -> Design {
        let mut d = Design::new("t");
        for i in 0..n_inst {
            d.add_instance(format!("i{i}"), InstanceKind::Lut).unwrap();
        }
        for (k, (clock, pins)) in nets.into_iter().enumerate() {
            d.add_net(format!("n{k}"), clock, pins);
        }
        d
    }

    #[test]
    fn single_device_net_is_intra() {
        let d = design_with(
            vec![(false, vec![pin(0, PinDir::Out), pin(1, PinDir::In)])],
            2,
        );
        let sink = DiagnosticSink::new();
        let nets = decompose_nets(&d, &[0, 0], &sink);
        assert_eq!(nets.len(), 1);
        assert!(!nets[0].is_inter());
        assert_eq!(nets[0].from_device, 0);
    }

    #[test]
    fn spanning_net_splits_per_device() {
        // driver on device 1, sinks on devices 0, 1, 2
        let d = design_with(
            vec![(
                false,
                vec![
                    pin(0, PinDir::In),
                    pin(1, PinDir::Out),
                    pin(2, PinDir::In),
                    pin(3, PinDir::In),
                ],
            )],
            4,
        );
        let sink = DiagnosticSink::new();
        let nets = decompose_nets(&d, &[0, 1, 1, 2], &sink);
        assert_eq!(nets.len(), 3);
        assert_eq!((nets[0].from_device, nets[0].to_device), (1, 0));
        assert_eq!((nets[1].from_device, nets[1].to_device), (1, 1));
        assert_eq!((nets[2].from_device, nets[2].to_device), (1, 2));
        assert!(nets[0].is_inter());
        assert!(!nets[1].is_inter());
        assert_eq!(nets[0].driver_pin().instance, InstanceId::from_raw(1));
        assert_eq!(nets[1].driver_pin().instance, InstanceId::from_raw(1));
        assert_eq!(nets[0].pins.len(), 2);
        assert_eq!(nets[1].sinks().count(), 1);
    }

    #[test]
    fn lonely_driver_subnet_dropped() {
        // driver alone on device 0, sink on device 1
        let d = design_with(
            vec![(false, vec![pin(0, PinDir::Out), pin(1, PinDir::In)])],
            2,
        );
        let sink = DiagnosticSink::new();
        let nets = decompose_nets(&d, &[0, 1], &sink);
        assert_eq!(nets.len(), 1);
        assert!(nets[0].is_inter());
        assert_eq!(nets[0].to_device, 1);
    }

    #[test]
    fn clock_and_driverless_nets_skipped() {
        let d = design_with(
            vec![
                (true, vec![pin(0, PinDir::Out), pin(1, PinDir::In)]),
                (false, vec![pin(0, PinDir::In), pin(1, PinDir::In)]),
            ],
            2,
        );
        let sink = DiagnosticSink::new();
        let nets = decompose_nets(&d, &[0, 1], &sink);
        assert!(nets.is_empty());
        assert_eq!(
            sink.count_code(DiagnosticCode::new(Category::Warning, 1)),
            1
        );
    }

    #[test]
    fn ids_are_sequential() {
        let d = design_with(
            vec![
                (false, vec![pin(0, PinDir::Out), pin(1, PinDir::In)]),
                (false, vec![pin(1, PinDir::Out), pin(0, PinDir::In)]),
            ],
            2,
        );
        let sink = DiagnosticSink::new();
        let nets = decompose_nets(&d, &[0, 1], &sink);
        let ids: Vec<u32> = nets.iter().map(|n| n.id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
