//! Benchmarks written to disk for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tdm_config::{ChannelConfig, FlowConfig};
use tdm_diagnostics::DiagnosticSink;
use tdm_solve::{load_context, FlowInputs, TdmContext};
use tempfile::TempDir;

/// A benchmark's input files inside a temporary directory.
pub struct Bench {
    pub dir: TempDir,
    pub inputs: FlowInputs,
}

impl Bench {
    pub fn out(&self) -> PathBuf {
        self.dir.path().join("bench.tdm")
    }

    pub fn context(&self, config: FlowConfig) -> TdmContext {
        load_context(&self.inputs, config, DiagnosticSink::new()).unwrap()
    }
}

struct Inst {
    name: String,
    kind: &'static str,
    device: usize,
    pos: (f64, f64),
}

/// Collects instances and nets, then writes the three input files.
#[derive(Default)]
pub struct BenchBuilder {
    instances: Vec<Inst>,
    nets: Vec<(String, Vec<String>)>,
}

impl BenchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inst(&mut self, name: &str, kind: &'static str, device: usize, pos: (f64, f64)) {
        self.instances.push(Inst {
            name: name.to_string(),
            kind,
            device,
            pos,
        });
    }

    pub fn net(&mut self, driver: &str, sinks: &[&str]) {
        self.nets.push((
            driver.to_string(),
            sinks.iter().map(|s| s.to_string()).collect(),
        ));
    }

    pub fn write(self) -> Bench {
        let dir = tempfile::tempdir().unwrap();
        let instances: Vec<_> = self
            .instances
            .iter()
            .map(|i| json!({ "name": i.name, "kind": i.kind }))
            .collect();
        let nets: Vec<_> = self
            .nets
            .iter()
            .enumerate()
            .map(|(k, (driver, sinks))| {
                let mut pins = vec![json!({ "instance": driver, "dir": "out" })];
                pins.extend(sinks.iter().map(|s| json!({ "instance": s, "dir": "in" })));
                json!({ "name": format!("n{k}"), "pins": pins })
            })
            .collect();
        let design = json!({ "name": "bench", "instances": instances, "nets": nets });

        let mut devices = String::from("# instance device\n");
        let mut placement = String::from("# instance x y\n");
        for i in &self.instances {
            devices.push_str(&format!("{} {}\n", i.name, i.device));
            placement.push_str(&format!("{} {} {}\n", i.name, i.pos.0, i.pos.1));
        }

        let inputs = FlowInputs {
            design: dir.path().join("bench.json"),
            devices: dir.path().join("bench.device"),
            placement: dir.path().join("bench.pos"),
        };
        fs::write(&inputs.design, design.to_string()).unwrap();
        fs::write(&inputs.devices, devices).unwrap();
        fs::write(&inputs.placement, placement).unwrap();
        Bench { dir, inputs }
    }
}

/// `n` nets from device 0 fanning out to devices 1 and 2, with more wire
/// after the crossing on later nets, plus one net between devices 1 and 2
/// that fits its channel.
pub fn three_device_bench(n: usize) -> Bench {
    let mut b = BenchBuilder::new();
    for k in 0..n {
        let kf = k as f64;
        b.inst(&format!("a{k}"), "lut", 0, (kf, 0.0));
        b.inst(&format!("b{k}"), "lut", 1, (0.0, 0.0));
        b.inst(&format!("c{k}"), "ff", 2, (kf, kf));
        b.inst(&format!("f{k}"), "ff", 1, (4.0 * kf, 0.0));
        b.net(&format!("a{k}"), &[&format!("b{k}"), &format!("c{k}")]);
        b.net(&format!("b{k}"), &[&format!("f{k}")]);
    }
    b.inst("g", "lut", 1, (0.0, 0.0));
    b.inst("h", "ff", 2, (0.0, 0.0));
    b.net("g", &["h"]);
    b.write()
}

pub fn config(limit: usize, threads: usize) -> FlowConfig {
    let mut config = FlowConfig::default();
    config.flow.threads = threads;
    config.flow.lag_iter = 80;
    config.channel = ChannelConfig {
        limit,
        max_choice: 64,
        choice_ceiling: 256,
    };
    config
}
