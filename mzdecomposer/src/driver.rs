use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::Parser;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mzdecompose::{
    Alphabet, DecompositionError, Decompositions, DualMassDecomposer, MassDecomposer, Weights,
};
use mzpeaks::Tolerance;

use crate::alphabet_file::{load_alphabet, AlphabetFileError};
use crate::args::{
    non_negative_float, positive_float, ArgAlphabet, ArgMethod, Engine, OutputFormat,
};
use crate::write::{CountRecord, DecompositionRecord, ResultWriter};

#[derive(Debug, Error)]
pub enum MZDecomposerError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to load alphabet from {0}: {1}")]
    AlphabetFileError(PathBuf, #[source] AlphabetFileError),
    #[error(transparent)]
    DecompositionError(#[from] DecompositionError),
    #[error("Failed to read configuration: {0}")]
    ConfigurationError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("Failed to build thread pool: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
    #[error("No target masses were given")]
    NoMasses,
    #[error("{0} target masses were given but {1} dual masses")]
    DualMassCountMismatch(usize, usize),
    #[error("Dual masses were given without a dual alphabet file")]
    MissingDualAlphabet,
}

/// Decompose masses into combinations of alphabet building blocks.
///
/// Every combination of the alphabet whose summed mass lies within the error
/// tolerance of a target mass is written out, one per line.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MZDecomposer {
    /// The masses to decompose
    #[arg()]
    pub masses: Vec<f64>,

    /// The path to write the output file to, or if '-' is passed, write to STDOUT.
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The format to write results in
    #[arg(long = "format", default_value = "tsv")]
    pub format: OutputFormat,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzdecomposer.toml` in the working directory.
    /// Environment variables prefixed with `MZDECOMPOSER_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// The absolute mass error tolerance in Daltons
    #[arg(short = 'e', long = "error", default_value_t = 0.05, value_parser = non_negative_float)]
    pub error: f64,

    /// A relative mass error tolerance in parts-per-million, used instead of `--error`
    #[arg(short = 'p', long = "ppm", value_parser = non_negative_float)]
    pub ppm: Option<f64>,

    /// The precision masses are discretized at. Smaller values are more selective
    /// but build larger tables.
    #[arg(short = 'P', long = "precision", default_value_t = 1e-3, value_parser = positive_float)]
    pub precision: f64,

    /// The built-in alphabet to decompose over
    #[arg(short = 'a', long = "alphabet", default_value = "peptide")]
    pub alphabet: ArgAlphabet,

    /// Read the alphabet from a file instead, either TOML with `[[residues]]` tables or
    /// plain text with one `name mass` pair per line
    #[arg(short = 'f', long = "alphabet-file")]
    pub alphabet_file: Option<PathBuf>,

    /// Divide the discretized weights by their greatest common divisor
    #[arg(long = "gcd")]
    pub gcd: bool,

    /// A second mass for each target mass, measured against the dual alphabet
    #[arg(short = 'd', long = "dual-mass")]
    pub dual_masses: Vec<f64>,

    /// The alphabet the dual masses are measured against, index-aligned with the
    /// primary alphabet
    #[arg(long = "dual-alphabet-file")]
    pub dual_alphabet_file: Option<PathBuf>,

    /// The absolute mass error tolerance for dual masses in Daltons
    #[arg(long = "dual-error", default_value_t = 0.05, value_parser = non_negative_float)]
    pub dual_error: f64,

    /// The search algorithm to use
    #[arg(short = 'm', long = "method", default_value = "residue")]
    pub method: ArgMethod,

    /// Only report how many compositions each mass has
    #[arg(short = 'c', long = "count")]
    pub count_only: bool,
}

impl Default for MZDecomposer {
    fn default() -> Self {
        Self {
            masses: Vec::new(),
            output_file: PathBuf::from("-"),
            format: OutputFormat::default(),
            log_file: None,
            config_file: None,
            threads: -1,
            error: 0.05,
            ppm: None,
            precision: 1e-3,
            alphabet: ArgAlphabet::default(),
            alphabet_file: None,
            gcd: false,
            dual_masses: Vec::new(),
            dual_alphabet_file: None,
            dual_error: 0.05,
            method: ArgMethod::default(),
            count_only: false,
        }
    }
}

type QueryResult = Result<Decompositions, DecompositionError>;

impl MZDecomposer {
    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MZDecomposerError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    pub fn tolerance(&self) -> Tolerance {
        match self.ppm {
            Some(ppm) => Tolerance::PPM(ppm),
            None => Tolerance::Da(self.error),
        }
    }

    pub fn load_alphabet(&self) -> Result<Alphabet, MZDecomposerError> {
        match self.alphabet_file.as_ref() {
            Some(path) => load_alphabet(path)
                .map_err(|e| MZDecomposerError::AlphabetFileError(path.clone(), e)),
            None => Ok(self.alphabet.into()),
        }
    }

    pub fn make_weights(&self, alphabet: &Alphabet) -> Result<Weights, MZDecomposerError> {
        let mut weights = alphabet.to_weights(self.precision)?;
        if self.gcd {
            if weights.divide_by_gcd() {
                info!("Reduced weights to precision {}", weights.precision());
            } else {
                debug!("Weights were already coprime");
            }
        }
        Ok(weights)
    }

    fn open_output(&self) -> Result<ResultWriter<io::BufWriter<Box<dyn io::Write>>>, MZDecomposerError> {
        let handle: Box<dyn io::Write> = if self.output_file == PathBuf::from("-") {
            Box::new(io::stdout().lock())
        } else {
            Box::new(fs::File::create(&self.output_file)?)
        };
        Ok(ResultWriter::new(
            io::BufWriter::new(handle),
            self.format,
            !self.dual_masses.is_empty(),
        ))
    }

    pub fn main(&self) -> Result<(), MZDecomposerError> {
        info!(
            "mzdecomposer v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Output: {}", self.output_file.display());
        self.create_threadpool()?.install(|| self.run())
    }

    fn run(&self) -> Result<(), MZDecomposerError> {
        if self.masses.is_empty() {
            return Err(MZDecomposerError::NoMasses);
        }
        let start = Instant::now();
        let alphabet = self.load_alphabet()?;
        let weights = self.make_weights(&alphabet)?;
        info!(
            "Decomposing {} masses over {} alphabet entries at precision {}",
            self.masses.len(),
            alphabet.len(),
            weights.precision()
        );
        if alphabet.is_empty() {
            warn!("The alphabet is empty, only a zero mass can be decomposed");
        }
        let mut writer = self.open_output()?;
        let n_found = if self.dual_masses.is_empty() {
            self.run_single(&alphabet, &weights, &mut writer)?
        } else {
            self.run_dual(&alphabet, &weights, &mut writer)?
        };
        writer.flush()?;
        info!("Compositions Found: {n_found}");
        info!("Elapsed Time: {:0.3?}", start.elapsed());
        Ok(())
    }

    fn run_single<W: io::Write>(
        &self,
        alphabet: &Alphabet,
        weights: &Weights,
        writer: &mut ResultWriter<W>,
    ) -> Result<usize, MZDecomposerError> {
        let tolerance = self.tolerance();
        let engine = Engine::new(self.method, weights);
        let mut n_found = 0;

        if self.count_only {
            let counts: Vec<Result<usize, DecompositionError>> = self
                .masses
                .par_iter()
                .map_init(
                    || engine.clone(),
                    |engine, mass| engine.count_decompositions(*mass, tolerance),
                )
                .collect();
            for (query, (target, count)) in self.masses.iter().zip(counts).enumerate() {
                let count = count?;
                n_found += count;
                writer.write_count(&CountRecord {
                    query,
                    target: *target,
                    dual_target: None,
                    count,
                })?;
            }
            return Ok(n_found);
        }

        let results: Vec<QueryResult> = match &engine {
            Engine::Residue(decomposer) if self.masses.len() == 1 => {
                vec![decomposer.decompose_parallel(self.masses[0], tolerance)]
            }
            _ => self
                .masses
                .par_iter()
                .map_init(
                    || engine.clone(),
                    |engine, mass| engine.decompose(*mass, tolerance),
                )
                .collect(),
        };

        for (query, (target, found)) in self.masses.iter().zip(results).enumerate() {
            let found = found?;
            debug!("Mass {target} has {} compositions", found.len());
            n_found += found.len();
            for comp in found {
                writer.write_decomposition(&DecompositionRecord::new(
                    query, *target, comp, alphabet, weights,
                ))?;
            }
        }
        Ok(n_found)
    }

    fn run_dual<W: io::Write>(
        &self,
        alphabet: &Alphabet,
        weights: &Weights,
        writer: &mut ResultWriter<W>,
    ) -> Result<usize, MZDecomposerError> {
        if self.dual_masses.len() != self.masses.len() {
            return Err(MZDecomposerError::DualMassCountMismatch(
                self.masses.len(),
                self.dual_masses.len(),
            ));
        }
        let dual_path = self
            .dual_alphabet_file
            .as_ref()
            .ok_or(MZDecomposerError::MissingDualAlphabet)?;
        let dual_alphabet = load_alphabet(dual_path)
            .map_err(|e| MZDecomposerError::AlphabetFileError(dual_path.clone(), e))?;
        let dual_weights = self.make_weights(&dual_alphabet)?;
        let decomposer = DualMassDecomposer::new(weights, &dual_weights)?;
        let tolerance = self.tolerance();
        let dual_tolerance = Tolerance::Da(self.dual_error);

        let queries: Vec<(f64, f64)> = self
            .masses
            .iter()
            .copied()
            .zip(self.dual_masses.iter().copied())
            .collect();
        let mut n_found = 0;

        if self.count_only {
            let counts: Vec<Result<usize, DecompositionError>> = queries
                .par_iter()
                .map(|(mass, dual_mass)| {
                    decomposer.count_decompositions(*mass, tolerance, *dual_mass, dual_tolerance)
                })
                .collect();
            for (query, ((target, dual_target), count)) in
                queries.iter().zip(counts).enumerate()
            {
                let count = count?;
                n_found += count;
                writer.write_count(&CountRecord {
                    query,
                    target: *target,
                    dual_target: Some(*dual_target),
                    count,
                })?;
            }
            return Ok(n_found);
        }

        let results: Vec<QueryResult> = queries
            .par_iter()
            .map(|(mass, dual_mass)| {
                decomposer.decompose(*mass, tolerance, *dual_mass, dual_tolerance)
            })
            .collect();
        for (query, ((target, dual_target), found)) in queries.iter().zip(results).enumerate() {
            let found = found?;
            n_found += found.len();
            for comp in found {
                let record = DecompositionRecord::new(query, *target, comp, alphabet, weights)
                    .with_dual(*dual_target, &dual_weights);
                writer.write_decomposition(&record)?;
            }
        }
        Ok(n_found)
    }
}
