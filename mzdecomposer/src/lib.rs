mod alphabet_file;
mod args;
mod driver;
mod write;

pub use alphabet_file::{load_alphabet, parse_toml_alphabet, read_text_alphabet, AlphabetFileError};
pub use args::*;
pub use driver::{MZDecomposer, MZDecomposerError};
pub use write::{CountRecord, DecompositionRecord, ResultWriter};
