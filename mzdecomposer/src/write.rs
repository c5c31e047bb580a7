use std::io::{self, prelude::*};

use itertools::Itertools;
use serde::Serialize;

use mzdecompose::{get_parent_mass, Alphabet, Composition, Weights};

use crate::args::OutputFormat;

/// A single composition found for a query
#[derive(Debug, Clone, Serialize)]
pub struct DecompositionRecord {
    pub query: usize,
    pub target: f64,
    pub formula: String,
    pub composition: Composition,
    pub mass: f64,
    pub error: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dual_target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dual_mass: Option<f64>,
}

impl DecompositionRecord {
    pub fn new(
        query: usize,
        target: f64,
        composition: Composition,
        alphabet: &Alphabet,
        weights: &Weights,
    ) -> Self {
        let mass = get_parent_mass(weights, &composition);
        Self {
            query,
            target,
            formula: alphabet.format_composition(&composition),
            composition,
            mass,
            error: mass - target,
            dual_target: None,
            dual_mass: None,
        }
    }

    pub fn with_dual(mut self, dual_target: f64, dual_weights: &Weights) -> Self {
        self.dual_mass = Some(get_parent_mass(dual_weights, &self.composition));
        self.dual_target = Some(dual_target);
        self
    }
}

/// The number of compositions found for a query
#[derive(Debug, Clone, Serialize)]
pub struct CountRecord {
    pub query: usize,
    pub target: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dual_target: Option<f64>,
    pub count: usize,
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub struct ResultWriter<W: Write> {
    handle: W,
    format: OutputFormat,
    dual: bool,
    header_written: bool,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(handle: W, format: OutputFormat, dual: bool) -> Self {
        Self {
            handle,
            format,
            dual,
            header_written: false,
        }
    }

    fn write_header(&mut self, columns: &[&str]) -> io::Result<()> {
        if self.header_written || self.format != OutputFormat::Tsv {
            return Ok(());
        }
        self.header_written = true;
        let mut columns = columns.to_vec();
        if self.dual {
            columns.push("dual_target");
            if columns.contains(&"mass") {
                columns.push("dual_mass");
            }
        }
        writeln!(self.handle, "{}", columns.join("\t"))
    }

    pub fn write_decomposition(&mut self, record: &DecompositionRecord) -> io::Result<()> {
        self.write_header(&["query", "target", "composition", "mass", "error"])?;
        match self.format {
            OutputFormat::Tsv => {
                write!(
                    self.handle,
                    "{}\t{}\t{}\t{:.6}\t{:.6}",
                    record.query, record.target, record.formula, record.mass, record.error
                )?;
                if self.dual {
                    write!(
                        self.handle,
                        "\t{}\t{}",
                        fmt_opt(record.dual_target),
                        record
                            .dual_mass
                            .map(|m| format!("{m:.6}"))
                            .unwrap_or_default()
                    )?;
                }
                writeln!(self.handle)
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.handle, record)?;
                writeln!(self.handle)
            }
        }
    }

    pub fn write_count(&mut self, record: &CountRecord) -> io::Result<()> {
        self.write_header(&["query", "target", "count"])?;
        match self.format {
            OutputFormat::Tsv => {
                let mut fields = vec![record.query.to_string(), record.target.to_string()];
                if self.dual {
                    fields.push(fmt_opt(record.dual_target));
                }
                fields.push(record.count.to_string());
                writeln!(self.handle, "{}", fields.iter().join("\t"))
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.handle, record)?;
                writeln!(self.handle)
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }

    pub fn into_inner(self) -> W {
        self.handle
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tsv_output() {
        let alphabet = Alphabet::amino_acids();
        let weights = alphabet.to_weights(0.01).unwrap();
        let mut comp = Composition::zeros(alphabet.len());
        comp[0] = 2;
        let record = DecompositionRecord::new(0, 114.04, comp, &alphabet, &weights);
        let mut writer = ResultWriter::new(Vec::new(), OutputFormat::Tsv, false);
        writer.write_decomposition(&record).unwrap();
        writer.write_decomposition(&record).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "query\ttarget\tcomposition\tmass\terror");
        assert!(lines[1].starts_with("0\t114.04\tG2\t114.042920"));
    }

    #[test]
    fn test_json_output() {
        let alphabet = Alphabet::amino_acids();
        let weights = alphabet.to_weights(0.01).unwrap();
        let mut comp = Composition::zeros(alphabet.len());
        comp[12] = 1;
        let record = DecompositionRecord::new(3, 128.09496, comp, &alphabet, &weights)
            .with_dual(130.0, &weights);
        let mut writer = ResultWriter::new(Vec::new(), OutputFormat::Json, true);
        writer.write_decomposition(&record).unwrap();
        writer
            .write_count(&CountRecord {
                query: 3,
                target: 128.09496,
                dual_target: None,
                count: 1,
            })
            .unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let mut lines = text.lines();
        let value: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(value["query"], 3);
        assert_eq!(value["formula"], "K1");
        assert_eq!(value["dual_target"], 130.0);
        let value: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(value["count"], 1);
        assert!(value.get("dual_target").is_none());
    }
}
