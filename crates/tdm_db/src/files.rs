//! Whitespace-separated input files and solution checkpoints.
//!
//! Device-assignment lines are `<instance> <device>`, placement lines are
//! `<instance> <x> <y>`. Blank lines and `#` comments are ignored. Every
//! design instance must appear exactly once; later duplicates overwrite
//! earlier ones.
//!
//! Checkpoints hold one ratio per line in variable-index order, written with
//! Rust's shortest round-trip float formatting so that reading a checkpoint
//! back reproduces the values bit for bit.

use std::fmt::Write as _;
use std::path::Path;

use crate::design::Design;
use crate::error::DbError;

/// The placed location of an instance inside its device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Placement {
    /// The integer site the location falls in (coordinates truncated).
    pub fn site(&self) -> (i64, i64) {
        (self.x as i64, self.y as i64)
    }

    /// Manhattan distance to another location.
    pub fn manhattan(&self, other: &Placement) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

fn read_file(path: &Path) -> Result<String, DbError> {
    std::fs::read_to_string(path).map_err(|source| DbError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_label(path: &Path) -> String {
    path.display().to_string()
}

/// Yields `(line_number, fields)` for every non-empty, non-comment line.
fn records(source: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    source.lines().enumerate().filter_map(|(i, line)| {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        (!fields.is_empty()).then_some((i + 1, fields))
    })
}

/// Collects one entry per instance, failing on the first uncovered instance.
fn complete<T>(
    design: &Design,
    slots: Vec<Option<T>>,
    what: &'static str,
) -> Result<Vec<T>, DbError> {
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| DbError::MissingInstance {
                what,
                name: design.instances[i].name.clone(),
            })
        })
        .collect()
}

/// Parses a device assignment from in-memory text.
pub fn parse_device_map(design: &Design, source: &str, file: &str) -> Result<Vec<usize>, DbError> {
    let mut slots = vec![None; design.instances.len()];
    for (line, fields) in records(source) {
        let parse_err = |message: &str| DbError::Parse {
            file: file.to_string(),
            line,
            message: message.to_string(),
        };
        if fields.len() != 2 {
            return Err(parse_err("expected '<instance> <device>'"));
        }
        let inst = design
            .instance_id(fields[0])
            .ok_or_else(|| DbError::UnknownInstance(fields[0].to_string()))?;
        let device: usize = fields[1]
            .parse()
            .map_err(|_| parse_err("device must be a non-negative integer"))?;
        slots[inst.index()] = Some(device);
    }
    complete(design, slots, "device")
}

/// Reads the instance-to-device assignment.
pub fn read_device_map(design: &Design, path: &Path) -> Result<Vec<usize>, DbError> {
    parse_device_map(design, &read_file(path)?, &file_label(path))
}

/// Parses a placement from in-memory text.
pub fn parse_placement(
    design: &Design,
    source: &str,
    file: &str,
) -> Result<Vec<Placement>, DbError> {
    let mut slots = vec![None; design.instances.len()];
    for (line, fields) in records(source) {
        let parse_err = |message: &str| DbError::Parse {
            file: file.to_string(),
            line,
            message: message.to_string(),
        };
        if fields.len() != 3 {
            return Err(parse_err("expected '<instance> <x> <y>'"));
        }
        let inst = design
            .instance_id(fields[0])
            .ok_or_else(|| DbError::UnknownInstance(fields[0].to_string()))?;
        let x: f64 = fields[1]
            .parse()
            .map_err(|_| parse_err("x must be a number"))?;
        let y: f64 = fields[2]
            .parse()
            .map_err(|_| parse_err("y must be a number"))?;
        slots[inst.index()] = Some(Placement { x, y });
    }
    complete(design, slots, "placement")
}

/// Reads the placement of every instance.
pub fn read_placement(design: &Design, path: &Path) -> Result<Vec<Placement>, DbError> {
    parse_placement(design, &read_file(path)?, &file_label(path))
}

/// Formats ratio values one per line.
pub fn format_values(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 8);
    for v in values {
        let _ = writeln!(out, "{v}");
    }
    out
}

/// Parses ratio values, one per non-empty line.
pub fn parse_values(source: &str, file: &str) -> Result<Vec<f64>, DbError> {
    records(source)
        .map(|(line, fields)| {
            if fields.len() != 1 {
                return Err(DbError::Parse {
                    file: file.to_string(),
                    line,
                    message: "expected one value per line".to_string(),
                });
            }
            fields[0].parse().map_err(|_| DbError::Parse {
                file: file.to_string(),
                line,
                message: format!("'{}' is not a number", fields[0]),
            })
        })
        .collect()
}

/// Writes ratio values to a checkpoint file.
pub fn write_values(path: &Path, values: &[f64]) -> Result<(), DbError> {
    std::fs::write(path, format_values(values)).map_err(|source| DbError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads ratio values from a checkpoint file.
pub fn read_values(path: &Path) -> Result<Vec<f64>, DbError> {
    parse_values(&read_file(path)?, &file_label(path))
}
